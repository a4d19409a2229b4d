//! Session lifecycle over real loopback sockets.
//!
//! Console (listen) and node (connect) roles are exercised against each
//! other on ephemeral 127.0.0.1 ports.

use std::sync::mpsc;
use std::time::Duration;

use stepline_common::{AxisCommand, ContentKind, GlobalEnable, MotionCommand};
use stepline_transport::{SessionEvent, SessionState, SessionTransport, TransportError};

const RECV_WAIT: Duration = Duration::from_secs(5);

struct Pair {
    server: SessionTransport,
    server_rx: mpsc::Receiver<SessionEvent>,
    client: SessionTransport,
    client_rx: mpsc::Receiver<SessionEvent>,
}

fn connected_pair() -> Pair {
    let (stx, server_rx) = mpsc::channel();
    let server = SessionTransport::listen("127.0.0.1:0", stx).expect("bind ephemeral port");
    let addr = server.local_addr().expect("listen role exposes its address");

    let (ctx, client_rx) = mpsc::channel();
    let client = SessionTransport::connect(addr.to_string(), ctx);

    Pair {
        server,
        server_rx,
        client,
        client_rx,
    }
}

fn next_message(rx: &mpsc::Receiver<SessionEvent>) -> MotionCommand {
    match rx.recv_timeout(RECV_WAIT).expect("event before timeout") {
        SessionEvent::Message(msg) => msg,
        SessionEvent::Ended { error } => panic!("session ended early: {error:?}"),
    }
}

#[test]
fn both_sides_get_exactly_one_remote_connect_first() {
    let pair = connected_pair();

    let server_first = next_message(&pair.server_rx);
    let client_first = next_message(&pair.client_rx);
    assert_eq!(server_first.content_kind, ContentKind::RemoteConnect);
    assert_eq!(client_first.content_kind, ContentKind::RemoteConnect);

    assert_eq!(pair.server.state(), SessionState::Connected);
    assert_eq!(pair.client.state(), SessionState::Connected);

    pair.server.shutdown();
    pair.client.shutdown();
}

#[test]
fn user_data_delivered_in_send_order_after_connect() {
    let pair = connected_pair();

    // Drain the greeting on the client side first.
    assert_eq!(
        next_message(&pair.client_rx).content_kind,
        ContentKind::RemoteConnect
    );

    let mut first = MotionCommand::user_data("first");
    first.all_axes_enable = GlobalEnable::Enabled;
    first.axes[0] = AxisCommand {
        enabled: true,
        direction: true,
        period: 5_000_000,
    };
    let second = MotionCommand::user_data("second");
    let third = MotionCommand::user_data("third");

    pair.server.send(&first).unwrap();
    pair.server.send(&second).unwrap();
    pair.server.send(&third).unwrap();

    assert_eq!(next_message(&pair.client_rx), first);
    assert_eq!(next_message(&pair.client_rx), second);
    assert_eq!(next_message(&pair.client_rx), third);

    pair.server.shutdown();
    pair.client.shutdown();
}

#[test]
fn replies_flow_from_client_to_server() {
    let pair = connected_pair();
    assert_eq!(
        next_message(&pair.server_rx).content_kind,
        ContentKind::RemoteConnect
    );

    let ack = MotionCommand::user_data("parameters applied");
    pair.client.send(&ack).unwrap();
    assert_eq!(next_message(&pair.server_rx), ack);

    pair.server.shutdown();
    pair.client.shutdown();
}

#[test]
fn peer_shutdown_delivers_one_remote_disconnect() {
    let pair = connected_pair();
    assert_eq!(
        next_message(&pair.client_rx).content_kind,
        ContentKind::RemoteConnect
    );

    pair.server.shutdown();
    assert_eq!(pair.server.state(), SessionState::Closed);

    // Best-effort goodbye arrives before the stream dies.
    let goodbye = next_message(&pair.client_rx);
    assert_eq!(goodbye.content_kind, ContentKind::RemoteDisconnect);

    // The client's loop then terminates; a broken stream is equivalent to
    // a disconnect and must not be silent.
    match pair.client_rx.recv_timeout(RECV_WAIT) {
        Ok(SessionEvent::Ended { .. }) => {}
        other => panic!("expected terminal event, got {other:?}"),
    }

    pair.client.shutdown();
}

#[test]
fn send_after_shutdown_is_not_connected() {
    let pair = connected_pair();
    assert_eq!(
        next_message(&pair.client_rx).content_kind,
        ContentKind::RemoteConnect
    );

    pair.client.shutdown();
    // Idempotent: a second call is a no-op.
    pair.client.shutdown();

    let err = pair.client.send(&MotionCommand::user_data("late")).unwrap_err();
    assert!(matches!(err, TransportError::NotConnected));
    assert_eq!(pair.client.state(), SessionState::Closed);

    pair.server.shutdown();
}

#[test]
fn connect_failure_reported_not_retried() {
    // Bind then immediately drop, so the port is very likely refused.
    let refused_addr = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().to_string()
    };

    let (tx, rx) = mpsc::channel();
    let client = SessionTransport::connect(refused_addr, tx);

    match rx.recv_timeout(RECV_WAIT) {
        Ok(SessionEvent::Ended {
            error: Some(TransportError::Connect { .. }),
        }) => {}
        other => panic!("expected connect failure, got {other:?}"),
    }
    assert_eq!(client.state(), SessionState::Closed);
    assert!(matches!(
        client.send(&MotionCommand::user_data("x")).unwrap_err(),
        TransportError::NotConnected
    ));
}

#[test]
fn listener_shutdown_before_any_peer() {
    let (tx, rx) = mpsc::channel();
    let server = SessionTransport::listen("127.0.0.1:0", tx).unwrap();
    assert_eq!(server.state(), SessionState::Connecting);

    server.shutdown();
    match rx.recv_timeout(RECV_WAIT) {
        Ok(SessionEvent::Ended { error: None }) => {}
        other => panic!("expected quiet end, got {other:?}"),
    }
    assert_eq!(server.state(), SessionState::Closed);
}

#[test]
fn bind_failure_is_synchronous() {
    let (tx1, _rx1) = mpsc::channel();
    let holder = SessionTransport::listen("127.0.0.1:0", tx1).unwrap();
    let addr = holder.local_addr().unwrap().to_string();

    let (tx2, _rx2) = mpsc::channel();
    let err = SessionTransport::listen(addr, tx2).unwrap_err();
    assert!(matches!(err, TransportError::Bind { .. }));

    holder.shutdown();
}
