//! Session state machine and receive loop.

use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn};

use stepline_common::{ContentKind, MotionCommand};
use stepline_wire as wire;

use crate::error::TransportError;

/// Poll interval while waiting to accept the single peer, so a local
/// `shutdown()` can interrupt the wait.
const ACCEPT_POLL: Duration = Duration::from_millis(25);

// ─── States and roles ───────────────────────────────────────────────

/// Connection lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Constructed, nothing started yet.
    Idle = 0,
    /// Client: socket establishment in progress. Server: listening.
    Connecting = 1,
    /// Socket established, receive loop running.
    Connected = 2,
    /// Local shutdown in progress.
    Closing = 3,
    /// Session over; `send()` fails from here on.
    Closed = 4,
}

impl SessionState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Which end of the fixed endpoint this transport plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    /// Always connects out to the deployment endpoint (device node).
    Connect,
    /// Always listens on the deployment endpoint (operator console).
    Listen,
}

/// Events delivered on the channel supplied at construction.
///
/// Delivery order of `Message` events matches wire arrival order. Exactly
/// one `Ended` event terminates the stream of events for a session.
#[derive(Debug)]
pub enum SessionEvent {
    /// One decoded inbound message.
    Message(MotionCommand),
    /// The receive loop has terminated. `error` is `None` for a locally
    /// requested shutdown, `Some` when the stream failed.
    Ended {
        /// Terminal failure, if any.
        error: Option<TransportError>,
    },
}

// ─── Shared innards ─────────────────────────────────────────────────

#[derive(Debug)]
struct Shared {
    state: AtomicU8,
    shutting_down: AtomicBool,
    /// Writer half of the socket. The receive thread reads from its own
    /// clone so `send()` never contends with a blocking read.
    stream: Mutex<Option<TcpStream>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(SessionState::Idle as u8),
            shutting_down: AtomicBool::new(false),
            stream: Mutex::new(None),
        }
    }

    fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }
}

// ─── Transport ──────────────────────────────────────────────────────

/// One session endpoint: a socket, a receive thread, and a state machine.
///
/// The socket is owned exclusively by this instance. `send()` is
/// synchronous and may be called from any thread, but concurrent callers
/// are not ordered relative to each other; a single logical producer is
/// assumed.
#[derive(Debug)]
pub struct SessionTransport {
    shared: Arc<Shared>,
    role: SessionRole,
    local_addr: Option<SocketAddr>,
}

impl SessionTransport {
    /// Client role: connect out to `addr` ("host:port").
    ///
    /// Returns immediately; establishment runs on the receive thread. On
    /// success a `RemoteConnect` greeting is sent to the peer and the state
    /// becomes `Connected`. On failure the state becomes `Closed` and a
    /// terminal `Ended` event is posted. No automatic retry, no intrinsic
    /// timeout beyond the socket's own.
    pub fn connect(addr: impl Into<String>, events: Sender<SessionEvent>) -> Self {
        let addr = addr.into();
        let shared = Arc::new(Shared::new());
        shared.set_state(SessionState::Connecting);

        let thread_shared = Arc::clone(&shared);
        thread::Builder::new()
            .name("session-rx".into())
            .spawn(move || {
                info!(target: "stepline_transport", %addr, "connecting");
                match TcpStream::connect(&addr) {
                    Ok(stream) => establish(&thread_shared, &events, stream),
                    Err(source) => {
                        if thread_shared.is_shutting_down() {
                            finish_quietly(&thread_shared, &events);
                            return;
                        }
                        error!(target: "stepline_transport", %addr, %source, "connect failed");
                        thread_shared.set_state(SessionState::Closed);
                        let _ = events.send(SessionEvent::Ended {
                            error: Some(TransportError::Connect { addr, source }),
                        });
                    }
                }
            })
            .expect("spawning session-rx thread");

        Self {
            shared,
            role: SessionRole::Connect,
            local_addr: None,
        }
    }

    /// Server role: listen on `addr`, accept exactly one peer, then tear
    /// the listener down and behave like a connected client.
    ///
    /// Binding happens synchronously so a dead endpoint fails fast; the
    /// accept wait runs on the receive thread.
    pub fn listen(addr: impl Into<String>, events: Sender<SessionEvent>) -> Result<Self, TransportError> {
        let addr = addr.into();
        let listener = TcpListener::bind(&addr)
            .map_err(|source| TransportError::Bind { addr: addr.clone(), source })?;
        let local_addr = listener.local_addr().ok();

        let shared = Arc::new(Shared::new());
        shared.set_state(SessionState::Connecting);

        let thread_shared = Arc::clone(&shared);
        thread::Builder::new()
            .name("session-rx".into())
            .spawn(move || {
                info!(target: "stepline_transport", %addr, "listening for one peer");
                match accept_one(&listener, &thread_shared) {
                    Ok(Some(stream)) => {
                        // Single-peer design: stop listening before serving.
                        drop(listener);
                        establish(&thread_shared, &events, stream);
                    }
                    Ok(None) => finish_quietly(&thread_shared, &events),
                    Err(source) => {
                        error!(target: "stepline_transport", %source, "accept failed");
                        thread_shared.set_state(SessionState::Closed);
                        let _ = events.send(SessionEvent::Ended {
                            error: Some(TransportError::Accept { source }),
                        });
                    }
                }
            })
            .expect("spawning session-rx thread");

        Ok(Self {
            shared,
            role: SessionRole::Listen,
            local_addr,
        })
    }

    /// Current lifecycle state. This, not traffic, is the source of truth
    /// for connection status display.
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// The role this transport was constructed with.
    pub fn role(&self) -> SessionRole {
        self.role
    }

    /// Bound listen address (server role only). Useful when listening on
    /// an ephemeral port.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Serialize and write one message synchronously.
    ///
    /// Fails with [`TransportError::NotConnected`] when no active socket
    /// exists and with [`TransportError::Send`] on write failure.
    pub fn send(&self, cmd: &MotionCommand) -> Result<(), TransportError> {
        let mut guard = self.shared.stream.lock();
        let stream = guard.as_mut().ok_or(TransportError::NotConnected)?;
        trace!(target: "stepline_transport", "sending {}", cmd.to_display_string());
        wire::write_message(stream, cmd).map_err(|e| match e {
            wire::WireError::Io { source } => TransportError::Send { source },
            // encode is infallible; anything else would be a codec bug.
            other => TransportError::Send {
                source: std::io::Error::other(other.to_string()),
            },
        })
    }

    /// Shut the session down. Idempotent, callable from any thread,
    /// non-blocking beyond one best-effort final send.
    ///
    /// If connected, a `RemoteDisconnect` message is attempted (failure
    /// swallowed; this side is closing regardless), then the socket is
    /// shut down, which unblocks and terminates the receive loop. After
    /// this call `send()` always fails with `NotConnected`.
    pub fn shutdown(&self) {
        if self.shared.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.set_state(SessionState::Closing);

        let stream = self.shared.stream.lock().take();
        if let Some(mut stream) = stream {
            let goodbye = MotionCommand::lifecycle(ContentKind::RemoteDisconnect);
            if let Err(e) = wire::write_message(&mut stream, &goodbye) {
                debug!(target: "stepline_transport", error = %e, "goodbye not delivered");
            }
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.shared.set_state(SessionState::Closed);
        info!(target: "stepline_transport", "session shut down");
    }
}

// ─── Receive thread internals ───────────────────────────────────────

/// Wait for the single peer, polling so a local shutdown can cancel the
/// wait. `Ok(None)` means shutdown won the race.
fn accept_one(listener: &TcpListener, shared: &Shared) -> std::io::Result<Option<TcpStream>> {
    listener.set_nonblocking(true)?;
    loop {
        if shared.is_shutting_down() {
            return Ok(None);
        }
        match listener.accept() {
            Ok((stream, peer)) => {
                info!(target: "stepline_transport", %peer, "peer connection accepted");
                stream.set_nonblocking(false)?;
                return Ok(Some(stream));
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Socket is up: install the writer half, greet the peer, run the loop.
fn establish(shared: &Shared, events: &Sender<SessionEvent>, stream: TcpStream) {
    if shared.is_shutting_down() {
        finish_quietly(shared, events);
        return;
    }

    let reader = match stream.try_clone() {
        Ok(reader) => reader,
        Err(source) => {
            shared.set_state(SessionState::Closed);
            let _ = events.send(SessionEvent::Ended {
                error: Some(TransportError::Receive {
                    source: wire::WireError::from(source),
                }),
            });
            return;
        }
    };

    let _ = stream.set_nodelay(true);
    *shared.stream.lock() = Some(stream);

    // A shutdown may have raced the installation above; re-check so the
    // session cannot outlive the request.
    if shared.is_shutting_down() {
        if let Some(s) = shared.stream.lock().take() {
            let _ = s.shutdown(Shutdown::Both);
        }
        finish_quietly(shared, events);
        return;
    }

    shared.set_state(SessionState::Connected);
    info!(target: "stepline_transport", "session connected");

    // Greet the peer immediately; both roles do this.
    let greeting = MotionCommand::lifecycle(ContentKind::RemoteConnect);
    {
        let mut guard = shared.stream.lock();
        if let Some(s) = guard.as_mut()
            && let Err(e) = wire::write_message(s, &greeting)
        {
            drop(guard);
            error!(target: "stepline_transport", error = %e, "greeting failed");
            terminate(shared, events, e);
            return;
        }
    }

    read_loop(shared, events, reader);
}

/// Blocking read loop: one frame per iteration, delivered in arrival order.
fn read_loop(shared: &Shared, events: &Sender<SessionEvent>, mut reader: TcpStream) {
    loop {
        match wire::read_message(&mut reader) {
            Ok(msg) => {
                trace!(target: "stepline_transport", "received {}", msg.to_display_string());
                if events.send(SessionEvent::Message(msg)).is_err() {
                    // Consumer hung up; nobody is listening anymore.
                    debug!(target: "stepline_transport", "event consumer gone, stopping");
                    break;
                }
            }
            Err(e) if e.is_decode_error() => {
                // Drop the offending message, keep the session alive.
                warn!(target: "stepline_transport", error = %e, "dropping undecodable message");
            }
            Err(e) => {
                if shared.is_shutting_down() {
                    break;
                }
                error!(target: "stepline_transport", error = %e, "receive loop terminating");
                terminate(shared, events, e);
                return;
            }
        }
    }
    finish_quietly(shared, events);
}

fn terminate(shared: &Shared, events: &Sender<SessionEvent>, source: wire::WireError) {
    shared.stream.lock().take();
    shared.set_state(SessionState::Closed);
    let _ = events.send(SessionEvent::Ended {
        error: Some(TransportError::Receive { source }),
    });
}

fn finish_quietly(shared: &Shared, events: &Sender<SessionEvent>) {
    shared.stream.lock().take();
    shared.set_state(SessionState::Closed);
    let _ = events.send(SessionEvent::Ended { error: None });
}
