use thiserror::Error;

/// Errors that can occur while establishing and running tunnels.
///
/// The first five variants abort `start()` and surface synchronously to the
/// caller. `Channel` is local to one connection attempt, `Relay` to one live
/// connection, and `KeepAlive` is handled inside the tunnel by transitioning
/// it to `Failed`.
#[derive(Error, Debug)]
pub enum TunnelError {
    /// Malformed host alias configuration
    #[error("invalid host configuration: {0}")]
    Config(String),

    /// Credentials rejected by the server
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Transport could not be established
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: russh::Error,
    },

    /// Operator aborted credential entry
    #[error("credential entry cancelled")]
    Cancelled,

    /// Local listener bind failed
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Forwarding channel could not be opened for one connection
    #[error("failed to open forwarding channel: {0}")]
    Channel(String),

    /// I/O failure mid-forward
    #[error("relay I/O error: {0}")]
    Relay(#[from] std::io::Error),

    /// Keep-alive probe failed or the transport went inactive
    #[error("keep-alive failed: {0}")]
    KeepAlive(String),

    /// SSH protocol error outside the cases above
    #[error("SSH protocol error: {0}")]
    Ssh(#[from] russh::Error),

    /// Tunnel was started from a state other than idle
    #[error("tunnel already started")]
    AlreadyStarted,
}

/// Result type alias for tunnel operations
pub type TunnelResult<T> = Result<T, TunnelError>;

impl TunnelError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }
}
