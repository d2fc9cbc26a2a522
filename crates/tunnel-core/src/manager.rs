use std::sync::Arc;

use rt_types::{HistoryRecord, TunnelEvent, TunnelSpec, TunnelStatus};
use tokio::sync::{RwLock, broadcast};
use tracing::info;

use crate::{
    events::EventSink,
    session::SessionEstablisher,
    tunnel::{Tunnel, TunnelOptions},
};

// Internal Result type alias for convenience
type Result<T> = crate::TunnelResult<T>;

struct ManagerState<E: SessionEstablisher> {
    tunnels: Vec<Tunnel<E::Session>>,
    history: Vec<HistoryRecord>,
}

/// Owns the live tunnels and the append-only history of started tunnels.
///
/// The collections live behind one `RwLock`, so adds and removals are atomic
/// with respect to concurrent snapshots. History records are only ever
/// appended; `reconnect` re-issues a start from a record without touching it.
pub struct TunnelManager<E: SessionEstablisher> {
    establisher: Arc<E>,
    options: TunnelOptions,
    events: EventSink,
    state: Arc<RwLock<ManagerState<E>>>,
}

impl<E: SessionEstablisher> Clone for TunnelManager<E> {
    fn clone(&self) -> Self {
        Self {
            establisher: self.establisher.clone(),
            options: self.options,
            events: self.events.clone(),
            state: self.state.clone(),
        }
    }
}

impl<E: SessionEstablisher> TunnelManager<E> {
    pub fn new(establisher: E) -> Self {
        Self::with_options(establisher, TunnelOptions::default())
    }

    pub fn with_options(establisher: E, options: TunnelOptions) -> Self {
        Self {
            establisher: Arc::new(establisher),
            options,
            events: EventSink::new(),
            state: Arc::new(RwLock::new(ManagerState {
                tunnels: Vec::new(),
                history: Vec::new(),
            })),
        }
    }

    /// Subscribe to engine notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<TunnelEvent> {
        self.events.subscribe()
    }

    /// Start a new tunnel. On success it joins the live collection and a
    /// history record is appended; on failure nothing is retained.
    pub async fn add(&self, spec: TunnelSpec) -> Result<Tunnel<E::Session>> {
        let tunnel = Tunnel::with_options(spec.clone(), self.events.clone(), self.options);
        tunnel.start(self.establisher.as_ref()).await?;

        let mut state = self.state.write().await;
        state.tunnels.push(tunnel.clone());
        state.history.push(HistoryRecord::new(spec.clone()));
        info!(tunnel = %spec, "tunnel added");
        Ok(tunnel)
    }

    /// Stop the live tunnel with this identity and remove it from the
    /// collection. Returns false when no such tunnel is live.
    pub async fn stop(&self, spec: &TunnelSpec) -> bool {
        let tunnel = {
            let mut state = self.state.write().await;
            match state.tunnels.iter().position(|tunnel| tunnel.spec() == spec) {
                Some(index) => state.tunnels.remove(index),
                None => return false,
            }
        };
        tunnel.stop().await;
        true
    }

    /// Stop every live tunnel, in insertion order.
    pub async fn stop_all(&self) {
        let tunnels: Vec<_> = {
            let mut state = self.state.write().await;
            state.tunnels.drain(..).collect()
        };
        for tunnel in tunnels {
            tunnel.stop().await;
        }
    }

    /// Start a fresh tunnel from a history record. The record itself is
    /// never mutated or removed, whatever the outcome.
    pub async fn reconnect(&self, record: &HistoryRecord) -> Result<Tunnel<E::Session>> {
        self.add(record.spec.clone()).await
    }

    /// Snapshot of the live tunnels and their current status.
    pub async fn tunnels(&self) -> Vec<(TunnelSpec, TunnelStatus)> {
        self.state
            .read()
            .await
            .tunnels
            .iter()
            .map(|tunnel| (tunnel.spec().clone(), tunnel.status()))
            .collect()
    }

    /// Snapshot of the history, oldest first.
    pub async fn history(&self) -> Vec<HistoryRecord> {
        self.state.read().await.history.clone()
    }
}
