use anyhow::Result;
use clap::Parser;
use rt_cli::tunnel_cli::TunnelArgs;
use rt_types::TunnelSpec;

fn specs(argv: &[&str]) -> Result<Vec<TunnelSpec>> {
    let mut full = vec!["rt"];
    full.extend_from_slice(argv);
    TunnelArgs::try_parse_from(full)?.tunnel_specs()
}

#[test]
fn parses_local_remote_pairs() -> Result<()> {
    let specs = specs(&["jump", "-L", "8080:80", "-L", "5433:5432"])?;
    assert_eq!(
        specs,
        vec![TunnelSpec::new("jump", 8080, 80), TunnelSpec::new("jump", 5433, 5432)]
    );
    Ok(())
}

#[test]
fn bare_port_forwards_to_same_port() -> Result<()> {
    let specs = specs(&["db.internal", "--tunnel", "5432"])?;
    assert_eq!(specs, vec![TunnelSpec::new("db.internal", 5432, 5432)]);
    Ok(())
}

#[test]
fn at_least_one_tunnel_is_required() {
    assert!(TunnelArgs::try_parse_from(["rt", "jump"]).is_err());
}

#[test]
fn invalid_specs_are_rejected() {
    for spec in ["0:80", "8080:0", "eighty:80", "1:2:3", ":", ""] {
        let result = specs(&["jump", "-L", spec]);
        assert!(result.is_err(), "{spec:?} should be rejected");
    }
}

#[test]
fn blank_hostname_is_rejected() {
    assert!(specs(&[" ", "-L", "8080:80"]).is_err());
}
