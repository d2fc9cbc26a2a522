use rt_types::TunnelEvent;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 256;

/// Fan-out notification sink for tunnel events.
///
/// Backed by a broadcast channel: sends never block, and events are dropped
/// when no receiver keeps up. The engine emits through this sink; the
/// presentation layer subscribes.
#[derive(Clone)]
pub struct EventSink {
    tx: broadcast::Sender<TunnelEvent>,
}

impl EventSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Subscribe to tunnel events from this point onward.
    pub fn subscribe(&self) -> broadcast::Receiver<TunnelEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn emit(&self, event: TunnelEvent) {
        // A send error just means nobody is listening.
        let _ = self.tx.send(event);
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new()
    }
}
