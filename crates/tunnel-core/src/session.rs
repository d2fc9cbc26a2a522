use std::sync::Arc;

use async_trait::async_trait;
use russh::{Disconnect, client};
use rt_types::Credentials;
use tokio::io::{AsyncRead, AsyncWrite};

// Internal Result type alias for convenience
type Result<T> = crate::TunnelResult<T>;

/// Trait for streams that can carry one forwarded connection.
pub trait ForwardStreamIo: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> ForwardStreamIo for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Type alias for boxed forwarding channel streams.
pub type ForwardStream = Box<dyn ForwardStreamIo>;

/// An authenticated session that tunnels can open forwarding channels on.
///
/// Implementations must be cheaply cloneable: the accept loop, the
/// keep-alive loop, and the stop path each hold their own handle.
#[async_trait]
pub trait TunnelSession: Clone + Send + Sync + 'static {
    /// Open a forwarding channel to `(dest_host, dest_port)`, tagged with
    /// the `(origin_host, origin_port)` the remote side reports as the
    /// connecting endpoint.
    async fn open_forward_channel(
        &self,
        dest_host: String,
        dest_port: u16,
        origin_host: String,
        origin_port: u16,
    ) -> Result<ForwardStream>;

    /// Send a no-op keep-alive probe.
    async fn send_keepalive(&self) -> Result<()>;

    /// Whether the underlying transport is still live.
    fn is_active(&self) -> bool;

    /// Disconnect the session. Idempotent; errors are swallowed because the
    /// session is already being torn down.
    async fn close(&self);
}

/// Opens and authenticates one session to the endpoint a hostname resolves to.
#[async_trait]
pub trait SessionEstablisher: Send + Sync + 'static {
    type Session: TunnelSession;

    async fn establish(&self, hostname: &str) -> Result<Self::Session>;
}

/// Produces interactive connection credentials for hosts without an alias
/// entry. May block on an operator-facing prompt; a cancelled prompt yields
/// [`TunnelError::Cancelled`](crate::TunnelError::Cancelled) and is never
/// retried by the engine.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn resolve(&self, hostname: &str) -> Result<Credentials>;
}

// Trait implementations for russh types

/// Shared handle to an authenticated russh client session.
pub type SharedSessionHandle<H> = Arc<client::Handle<H>>;

#[async_trait]
impl<H> TunnelSession for SharedSessionHandle<H>
where
    H: client::Handler + Send + Sync + 'static,
{
    async fn open_forward_channel(
        &self,
        dest_host: String,
        dest_port: u16,
        origin_host: String,
        origin_port: u16,
    ) -> Result<ForwardStream> {
        let channel = self
            .as_ref()
            .channel_open_direct_tcpip(dest_host, dest_port.into(), origin_host, origin_port.into())
            .await
            .map_err(|err| crate::TunnelError::Channel(err.to_string()))?;
        Ok(Box::new(channel.into_stream()))
    }

    async fn send_keepalive(&self) -> Result<()> {
        self.as_ref()
            .send_keepalive(false)
            .await
            .map_err(|err| crate::TunnelError::KeepAlive(err.to_string()))
    }

    fn is_active(&self) -> bool {
        !self.as_ref().is_closed()
    }

    async fn close(&self) {
        let _ = self.as_ref().disconnect(Disconnect::ByApplication, "", "").await;
    }
}
