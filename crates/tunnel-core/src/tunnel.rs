use std::{
    net::SocketAddr,
    sync::atomic::{AtomicBool, Ordering},
    sync::Arc,
    time::Duration,
};

use rt_types::{TunnelEvent, TunnelSpec, TunnelStatus};
use tokio::{
    net::{TcpListener, TcpSocket, TcpStream},
    sync::{Mutex, watch},
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, info, warn};

use crate::{
    events::EventSink,
    relay::relay_streams,
    session::{SessionEstablisher, TunnelSession},
};

// Internal Result type alias for convenience
type Result<T> = crate::TunnelResult<T>;

const LISTEN_BACKLOG: u32 = 128;

/// Timing knobs for a tunnel's background loops.
#[derive(Clone, Copy, Debug)]
pub struct TunnelOptions {
    /// Interval between keep-alive probes.
    pub keepalive_interval: Duration,
    /// How long `stop()` waits for each background loop before detaching it.
    pub stop_timeout: Duration,
}

impl Default for TunnelOptions {
    fn default() -> Self {
        Self {
            keepalive_interval: Duration::from_secs(30),
            stop_timeout: Duration::from_secs(1),
        }
    }
}

struct TunnelState<S> {
    spec: TunnelSpec,
    options: TunnelOptions,
    events: EventSink,
    status: watch::Sender<TunnelStatus>,
    running: AtomicBool,
    shutdown: watch::Sender<bool>,
    session: Mutex<Option<S>>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    keepalive_task: Mutex<Option<JoinHandle<()>>>,
    relays: Mutex<Vec<JoinHandle<()>>>,
}

/// One local listener relayed over one SSH session.
///
/// While `Running`, the tunnel owns an accept loop and a keep-alive loop;
/// each accepted connection gets its own relay task. `stop()` is idempotent
/// and bounded: loops that fail to drain within
/// [`TunnelOptions::stop_timeout`] are detached and left to finish on their
/// own. A tunnel instance is single-use; terminal states are never left.
pub struct Tunnel<S: TunnelSession> {
    state: Arc<TunnelState<S>>,
}

impl<S: TunnelSession> Clone for Tunnel<S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<S: TunnelSession> std::fmt::Debug for Tunnel<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tunnel")
            .field("spec", &self.state.spec)
            .field("status", &self.status())
            .finish()
    }
}

impl<S: TunnelSession> Tunnel<S> {
    pub fn new(spec: TunnelSpec, events: EventSink) -> Self {
        Self::with_options(spec, events, TunnelOptions::default())
    }

    pub fn with_options(spec: TunnelSpec, events: EventSink, options: TunnelOptions) -> Self {
        let (status, _) = watch::channel(TunnelStatus::Idle);
        let (shutdown, _) = watch::channel(false);
        Self {
            state: Arc::new(TunnelState {
                spec,
                options,
                events,
                status,
                running: AtomicBool::new(false),
                shutdown,
                session: Mutex::new(None),
                accept_task: Mutex::new(None),
                keepalive_task: Mutex::new(None),
                relays: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn spec(&self) -> &TunnelSpec {
        &self.state.spec
    }

    pub fn status(&self) -> TunnelStatus {
        *self.state.status.borrow()
    }

    /// Establish the session, bind the listener, and launch the accept and
    /// keep-alive loops. Returns synchronously once both loops are running;
    /// on any failure every partially-acquired resource is released and the
    /// tunnel lands in `Failed`.
    pub async fn start<E>(&self, establisher: &E) -> Result<()>
    where
        E: SessionEstablisher<Session = S>,
    {
        let started = self.state.status.send_if_modified(|current| {
            if *current == TunnelStatus::Idle {
                *current = TunnelStatus::Starting;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(crate::TunnelError::AlreadyStarted);
        }
        self.emit_status(TunnelStatus::Starting);

        let session = match establisher.establish(&self.state.spec.hostname).await {
            Ok(session) => session,
            Err(err) => {
                warn!(tunnel = %self.state.spec, error = %err, "session establishment failed");
                self.transition(TunnelStatus::Failed);
                return Err(err);
            }
        };

        let listener = match bind_listener(self.state.spec.local_port) {
            Ok(listener) => listener,
            Err(err) => {
                warn!(tunnel = %self.state.spec, error = %err, "local bind failed");
                session.close().await;
                self.transition(TunnelStatus::Failed);
                return Err(err);
            }
        };

        info!(tunnel = %self.state.spec, "tunnel listening");
        *self.state.session.lock().await = Some(session.clone());
        self.state.running.store(true, Ordering::SeqCst);
        if !self.transition(TunnelStatus::Running) {
            // stop() raced the start; release what was just acquired.
            self.state.running.store(false, Ordering::SeqCst);
            if let Some(session) = self.state.session.lock().await.take() {
                session.close().await;
            }
            return Err(crate::TunnelError::AlreadyStarted);
        }

        let accept = tokio::spawn(run_accept_loop(self.clone(), listener, session.clone()));
        let keepalive = tokio::spawn(run_keepalive_loop(self.clone(), session));
        *self.state.accept_task.lock().await = Some(accept);
        *self.state.keepalive_task.lock().await = Some(keepalive);
        Ok(())
    }

    /// Shut the tunnel down. Safe to call from any state and any number of
    /// times; a later call finds a terminal status and returns immediately.
    pub async fn stop(&self) {
        if !self.transition(TunnelStatus::Stopping) {
            return;
        }
        self.state.running.store(false, Ordering::SeqCst);
        let _ = self.state.shutdown.send(true);

        if let Some(session) = self.state.session.lock().await.take() {
            session.close().await;
        }

        let accept = self.state.accept_task.lock().await.take();
        let keepalive = self.state.keepalive_task.lock().await.take();
        for task in [accept, keepalive].into_iter().flatten() {
            if timeout(self.state.options.stop_timeout, task).await.is_err() {
                // Non-fatal: the loop observes the flag eventually and
                // finishes detached.
                warn!(tunnel = %self.state.spec, "background loop did not exit within stop timeout");
            }
        }

        self.abort_relays().await;
        self.transition(TunnelStatus::Stopped);
        info!(tunnel = %self.state.spec, "tunnel stopped");
    }

    /// Keep-alive failure path: the only way a tunnel leaves `Running`
    /// without an explicit `stop()`.
    async fn fail(&self, err: crate::TunnelError) {
        warn!(tunnel = %self.state.spec, error = %err, "tunnel failed");
        self.state.running.store(false, Ordering::SeqCst);
        let _ = self.state.shutdown.send(true);

        if let Some(session) = self.state.session.lock().await.take() {
            session.close().await;
        }
        self.abort_relays().await;

        if self.transition(TunnelStatus::Failed) {
            self.state.events.emit(TunnelEvent::KeepAliveFailed {
                spec: self.state.spec.clone(),
                error: err.to_string(),
            });
        }
    }

    async fn handle_connection(&self, stream: TcpStream, peer: SocketAddr, session: &S) {
        let spec = &self.state.spec;
        debug!(%peer, tunnel = %spec, "accepted connection");
        self.state.events.emit(TunnelEvent::ConnectionAccepted {
            spec: spec.clone(),
            peer: peer.to_string(),
        });
        stream.set_nodelay(true).ok();

        let channel = match session
            .open_forward_channel(
                "127.0.0.1".to_string(),
                spec.remote_port,
                "127.0.0.1".to_string(),
                spec.local_port,
            )
            .await
        {
            Ok(channel) => channel,
            Err(err) => {
                warn!(%peer, tunnel = %spec, error = %err, "failed to open forwarding channel");
                self.state.events.emit(TunnelEvent::ChannelFailed {
                    spec: spec.clone(),
                    error: err.to_string(),
                });
                // Dropping the stream closes the client side.
                return;
            }
        };

        let events = self.state.events.clone();
        let spec = spec.clone();
        let relay = tokio::spawn(async move {
            let result = relay_streams(stream, channel).await;
            if let Err(err) = &result {
                debug!(tunnel = %spec, error = %err, "relay terminated on I/O error");
            }
            events.emit(TunnelEvent::RelayClosed {
                spec,
                error: result.err().map(|err| err.to_string()),
            });
        });
        let mut relays = self.state.relays.lock().await;
        relays.retain(|handle| !handle.is_finished());
        relays.push(relay);
    }

    async fn abort_relays(&self) {
        let mut relays = self.state.relays.lock().await;
        for relay in relays.drain(..) {
            relay.abort();
        }
    }

    /// Move to `status` unless the tunnel is already terminal. Returns
    /// whether the transition happened.
    fn transition(&self, status: TunnelStatus) -> bool {
        let changed = self.state.status.send_if_modified(|current| {
            if current.is_terminal() {
                false
            } else {
                *current = status;
                true
            }
        });
        if changed {
            self.emit_status(status);
        }
        changed
    }

    fn emit_status(&self, status: TunnelStatus) {
        self.state.events.emit(TunnelEvent::StatusChanged {
            spec: self.state.spec.clone(),
            status,
        });
    }
}

fn bind_listener(port: u16) -> Result<TcpListener> {
    let address = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = (|| {
        let socket = TcpSocket::new_v4()?;
        socket.set_reuseaddr(true)?;
        socket.bind(address)?;
        socket.listen(LISTEN_BACKLOG)
    })();
    listener.map_err(|source| crate::TunnelError::Bind {
        address: address.to_string(),
        source,
    })
}

async fn run_accept_loop<S: TunnelSession>(tunnel: Tunnel<S>, listener: TcpListener, session: S) {
    let mut shutdown = tunnel.state.shutdown.subscribe();
    loop {
        let accepted = tokio::select! {
            _ = shutdown.wait_for(|&stop| stop) => break,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok((stream, peer)) => tunnel.handle_connection(stream, peer, &session).await,
            Err(err) => {
                if tunnel.state.running.load(Ordering::SeqCst) {
                    warn!(tunnel = %tunnel.state.spec, error = %err, "listener accept error");
                }
                break;
            }
        }
    }
    debug!(tunnel = %tunnel.state.spec, "accept loop exited");
}

async fn run_keepalive_loop<S: TunnelSession>(tunnel: Tunnel<S>, session: S) {
    let mut shutdown = tunnel.state.shutdown.subscribe();
    let interval = tunnel.state.options.keepalive_interval;
    loop {
        if !tunnel.state.running.load(Ordering::SeqCst) {
            break;
        }
        let probe = if session.is_active() {
            session.send_keepalive().await
        } else {
            Err(crate::TunnelError::KeepAlive("transport inactive".to_string()))
        };
        if let Err(err) = probe {
            if tunnel.state.running.load(Ordering::SeqCst) {
                tunnel.fail(err).await;
            }
            break;
        }
        tokio::select! {
            _ = shutdown.wait_for(|&stop| stop) => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    debug!(tunnel = %tunnel.state.spec, "keep-alive loop exited");
}
