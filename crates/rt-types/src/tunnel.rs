use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a forwarding tunnel: where it listens and where it relays to.
///
/// Every accepted connection on `127.0.0.1:local_port` is relayed to
/// `127.0.0.1:remote_port` as seen from `hostname`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelSpec {
    /// Host identifier: an alias from the host configuration or a literal hostname.
    pub hostname: String,
    /// Local port to listen on.
    pub local_port: u16,
    /// Remote port to relay to, as reachable from the remote host.
    pub remote_port: u16,
}

impl TunnelSpec {
    pub fn new(hostname: impl Into<String>, local_port: u16, remote_port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            local_port,
            remote_port,
        }
    }
}

impl std::fmt::Display for TunnelSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} -> {}", self.local_port, self.hostname, self.remote_port)
    }
}

/// Lifecycle state of a tunnel.
///
/// `Stopped` and `Failed` are terminal; a tunnel is never revived, a new
/// start always creates a new instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TunnelStatus {
    /// Created but not yet started.
    #[default]
    Idle,
    /// Session establishment and listener bind in progress.
    Starting,
    /// Accept loop and keep-alive loop are live.
    Running,
    /// Shutdown requested, background tasks draining.
    Stopping,
    /// Shut down cleanly.
    Stopped,
    /// Establishment failed or the session died under the tunnel.
    Failed,
}

impl TunnelStatus {
    /// Returns true for states a tunnel can never leave.
    pub fn is_terminal(self) -> bool {
        matches!(self, TunnelStatus::Stopped | TunnelStatus::Failed)
    }
}

/// Immutable record of a successfully started tunnel, kept for reconnection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub spec: TunnelSpec,
    pub created_at: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn new(spec: TunnelSpec) -> Self {
        Self {
            spec,
            created_at: Utc::now(),
        }
    }
}

/// Notifications emitted by the tunnel engine for the presentation layer.
///
/// Emission never blocks; a slow or absent consumer loses events rather
/// than stalling the engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum TunnelEvent {
    /// A tunnel moved to a new lifecycle state.
    StatusChanged { spec: TunnelSpec, status: TunnelStatus },
    /// The accept loop took a new client connection.
    ConnectionAccepted { spec: TunnelSpec, peer: String },
    /// A forwarding channel could not be opened for one accepted connection.
    ChannelFailed { spec: TunnelSpec, error: String },
    /// A relay terminated; `error` is set when it died on an I/O failure.
    RelayClosed { spec: TunnelSpec, error: Option<String> },
    /// The keep-alive probe failed and the tunnel is going down.
    KeepAliveFailed { spec: TunnelSpec, error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_stopped_and_failed() {
        assert!(TunnelStatus::Stopped.is_terminal());
        assert!(TunnelStatus::Failed.is_terminal());
        for status in [
            TunnelStatus::Idle,
            TunnelStatus::Starting,
            TunnelStatus::Running,
            TunnelStatus::Stopping,
        ] {
            assert!(!status.is_terminal(), "{status:?} must not be terminal");
        }
    }

    #[test]
    fn spec_display_reads_local_to_remote() {
        let spec = TunnelSpec::new("db.internal", 5432, 5432);
        assert_eq!(spec.to_string(), "5432:db.internal -> 5432");
    }
}
