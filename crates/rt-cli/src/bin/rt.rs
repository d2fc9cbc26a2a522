use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{HostAliasConfig, PromptResolver, SshEstablisher, default_alias_path};
use rt_cli::{init_tracing, tunnel_cli::TunnelArgs};
use rt_types::TunnelEvent;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tunnel_core::TunnelManager;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = TunnelArgs::parse();
    let specs = args.tunnel_specs()?;

    let alias_path = args.host_config.clone().unwrap_or_else(default_alias_path);
    let aliases = HostAliasConfig::load(&alias_path)?;
    let manager = TunnelManager::new(SshEstablisher::new(aliases, Arc::new(PromptResolver)));

    let mut events = manager.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => report(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    for spec in specs {
        if let Err(err) = manager.add(spec.clone()).await {
            manager.stop_all().await;
            return Err(err).with_context(|| format!("failed to start tunnel {spec}"));
        }
    }

    info!("tunnels up; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    manager.stop_all().await;
    Ok(())
}

fn report(event: TunnelEvent) {
    match event {
        TunnelEvent::StatusChanged { spec, status } => info!(tunnel = %spec, ?status, "status changed"),
        TunnelEvent::ConnectionAccepted { spec, peer } => info!(tunnel = %spec, %peer, "connection accepted"),
        TunnelEvent::ChannelFailed { spec, error } => warn!(tunnel = %spec, %error, "forwarding channel failed"),
        TunnelEvent::RelayClosed { spec, error: Some(error) } => warn!(tunnel = %spec, %error, "relay closed on error"),
        TunnelEvent::RelayClosed { .. } => {}
        TunnelEvent::KeepAliveFailed { spec, error } => warn!(tunnel = %spec, %error, "keep-alive failed"),
    }
}
