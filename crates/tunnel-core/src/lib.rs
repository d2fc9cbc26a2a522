//! Local TCP port forwarding over authenticated SSH sessions.
//!
//! This crate is the tunnel engine: it owns the tunnel lifecycle state
//! machine, the per-tunnel accept and keep-alive loops, the per-connection
//! bidirectional relay, and the manager that tracks live tunnels and their
//! history.
//!
//! The SSH transport itself is abstracted behind [`TunnelSession`] and
//! [`SessionEstablisher`] so the engine can be driven against a real russh
//! session or an in-memory mock. The russh implementations live here; the
//! code that decides *how* to establish and authenticate a session (host
//! aliases, credential prompts) lives in `client-core`.

pub mod error;
pub mod events;
pub mod manager;
pub mod relay;
pub mod session;
pub mod tunnel;

pub use error::{TunnelError, TunnelResult};
pub use events::EventSink;
pub use manager::TunnelManager;
pub use session::{
    CredentialResolver,
    ForwardStream,
    ForwardStreamIo,
    SessionEstablisher,
    SharedSessionHandle,
    TunnelSession,
};
pub use tunnel::{Tunnel, TunnelOptions};
