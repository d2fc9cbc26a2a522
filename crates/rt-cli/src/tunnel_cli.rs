use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use rt_types::{TunnelSpec, validation};

#[derive(Debug, Parser)]
#[command(name = "rt", about = "Local TCP port forwarding over SSH sessions")]
pub struct TunnelArgs {
    /// Target host; an alias from the host configuration or a literal hostname
    #[arg(value_name = "HOST")]
    pub host: String,
    /// Tunnel to open, as LOCAL_PORT:REMOTE_PORT; a bare port forwards to the
    /// same port on the remote side (repeatable)
    #[arg(
        short = 'L',
        long = "tunnel",
        value_name = "LOCAL:REMOTE",
        action = ArgAction::Append,
        required = true
    )]
    pub tunnels: Vec<String>,
    /// Host alias configuration file (defaults to ~/.ssh/config)
    #[arg(long = "host-config", value_name = "FILE")]
    pub host_config: Option<PathBuf>,
}

impl TunnelArgs {
    /// Expand the repeated `-L` arguments into tunnel specifications.
    pub fn tunnel_specs(&self) -> Result<Vec<TunnelSpec>> {
        validation::validate_hostname(&self.host)?;
        self.tunnels.iter().map(|spec| parse_tunnel_spec(&self.host, spec)).collect()
    }
}

/// Parse a `LOCAL_PORT:REMOTE_PORT` pair.
pub fn parse_tunnel_spec(host: &str, spec: &str) -> Result<TunnelSpec> {
    let mut fields = spec.split(':');
    match (fields.next(), fields.next(), fields.next()) {
        (Some(local), None, _) => {
            let port = validation::parse_port(local).with_context(|| format!("invalid tunnel spec {spec:?}"))?;
            Ok(TunnelSpec::new(host, port, port))
        }
        (Some(local), Some(remote), None) => {
            let local = validation::parse_port(local).with_context(|| format!("invalid tunnel spec {spec:?}"))?;
            let remote = validation::parse_port(remote).with_context(|| format!("invalid tunnel spec {spec:?}"))?;
            Ok(TunnelSpec::new(host, local, remote))
        }
        _ => bail!("tunnel spec must be LOCAL_PORT:REMOTE_PORT, got {spec:?}"),
    }
}
