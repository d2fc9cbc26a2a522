//! Shared type definitions for RustyTunnel
//!
//! This crate contains lightweight type definitions that are shared across
//! the tunnel engine, the SSH client layer, and the presentation front ends.
//! They are intentionally dependency-light so config loaders and UIs can
//! reuse them without pulling in protocol implementations.

pub mod alias;
pub mod credentials;
pub mod tunnel;
pub mod validation;

pub use alias::HostAlias;
pub use credentials::Credentials;
pub use tunnel::{HistoryRecord, TunnelEvent, TunnelSpec, TunnelStatus};
