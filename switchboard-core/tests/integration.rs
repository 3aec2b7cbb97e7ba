//! Integration tests: controller and clients talking over real localhost
//! sockets.

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use switchboard_core::{
    Broadcaster, Channel, ClientEvent, ClientOptions, Controller, ControllerEvent, Endpoint,
    FaceBox, MediaServer, MessageType, Packet, PipChanges, PreviewPort, SwitchClient, SwitchError,
};
use tokio::sync::broadcast;
use tokio_test::assert_ok;

// ── Helpers ──────────────────────────────────────────────────────

/// In-memory media server. Counts mode changes and never announces them on
/// its own, so tests decide when `new_mode_online` goes out.
#[derive(Default)]
struct TestMedia {
    hub: Broadcaster,
    mode: AtomicI32,
    mode_calls: AtomicUsize,
    ports: Mutex<Vec<PreviewPort>>,
    slow_compose: Option<Duration>,
}

impl TestMedia {
    fn with_ports(ports: Vec<PreviewPort>) -> Self {
        Self {
            ports: Mutex::new(ports),
            ..Default::default()
        }
    }
}

impl MediaServer for TestMedia {
    fn compose_port(&self) -> i32 {
        if let Some(delay) = self.slow_compose {
            std::thread::sleep(delay);
        }
        3001
    }

    fn encode_port(&self) -> i32 {
        3002
    }

    fn audio_port(&self) -> i32 {
        3003
    }

    fn preview_ports(&self) -> Vec<PreviewPort> {
        self.ports.lock().unwrap().clone()
    }

    fn set_composite_mode(&self, mode: i32) -> bool {
        self.mode_calls.fetch_add(1, Ordering::SeqCst);
        if !(0..=3).contains(&mode) {
            return false;
        }
        self.mode.store(mode, Ordering::SeqCst);
        true
    }

    fn composite_mode(&self) -> i32 {
        self.mode.load(Ordering::SeqCst)
    }

    fn new_record(&self) -> bool {
        true
    }

    fn adjust_pip(&self, dx: i32, dy: i32, dw: i32, dh: i32) -> PipChanges {
        let mut changed = PipChanges::empty();
        changed.set(PipChanges::X, dx != 0);
        changed.set(PipChanges::Y, dy != 0);
        changed.set(PipChanges::W, dw != 0);
        changed.set(PipChanges::H, dh != 0);
        changed
    }

    fn switch(&self, channel: i32, port: i32) -> bool {
        channel == Channel::VideoA as i32 && port == 3004
    }

    fn click_video(&self, x: i32, y: i32, view_w: i32, view_h: i32) -> bool {
        if view_w <= 0 || view_h <= 0 {
            return false;
        }
        self.hub.select_face(x, y);
        true
    }

    fn mark_face(&self, faces: Vec<FaceBox>, tracking: bool) {
        if tracking {
            self.hub.show_track_marker(faces);
        } else {
            self.hub.show_face_marker(faces);
        }
    }
}

fn loopback() -> Endpoint {
    Endpoint::Tcp {
        host: "127.0.0.1".into(),
        port: 0,
    }
}

async fn start(media: TestMedia) -> (Controller, Arc<TestMedia>) {
    let hub = media.hub.clone();
    let media = Arc::new(media);
    let controller = Controller::start_with(&loopback(), media.clone(), hub)
        .await
        .expect("controller failed to start");
    (controller, media)
}

async fn connect(controller: &Controller) -> SwitchClient {
    let client = SwitchClient::default();
    client
        .connect(controller.local_endpoint())
        .await
        .expect("client failed to connect");
    client
}

/// Poll `cond` until it holds, failing after five seconds.
async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

async fn next_event(rx: &mut broadcast::Receiver<ClientEvent>) -> ClientEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timeout")
        .expect("event channel closed")
}

// ── Dispatch ─────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_method_gets_an_error_reply_and_the_connection_survives() {
    let (controller, _media) = start(TestMedia::default()).await;
    let mut conn = controller.local_endpoint().connect().await.unwrap();

    conn.send(Packet::call(1, "set_encode_mode", Vec::new()).unwrap())
        .await
        .unwrap();
    let answer = tokio::time::timeout(Duration::from_secs(5), conn.recv())
        .await
        .expect("timeout")
        .expect("closed");
    assert_eq!(answer.message_type(), MessageType::Error);
    assert_eq!(answer.serial(), 1);
    assert_eq!(answer.member(), "set_encode_mode");
    assert!(answer.error_message().unwrap().contains("set_encode_mode"));

    conn.send(Packet::call(2, "get_compose_port", Vec::new()).unwrap())
        .await
        .unwrap();
    let answer = tokio::time::timeout(Duration::from_secs(5), conn.recv())
        .await
        .expect("timeout")
        .expect("closed");
    assert_eq!(answer.message_type(), MessageType::Reply);
    assert_eq!(answer.serial(), 2);
    let (port,): (i32,) = bincode::deserialize(answer.body()).unwrap();
    assert_eq!(port, 3001);
}

#[tokio::test]
async fn unknown_method_through_the_client_is_a_remote_error() {
    let (controller, _media) = start(TestMedia::default()).await;
    let client = connect(&controller).await;

    let result = client.call::<_, ()>("set_encode_mode", &(1i32,)).await;
    match result {
        Err(SwitchError::Remote { method, message }) => {
            assert_eq!(method, "set_encode_mode");
            assert!(message.contains("unsupported call"));
        }
        other => panic!("unexpected {other:?}"),
    }

    assert!(client.is_connected());
    assert_eq!(client.get_audio_port().await, 3003);
}

#[tokio::test]
async fn non_call_frames_are_ignored() {
    let (controller, _media) = start(TestMedia::default()).await;
    let mut conn = controller.local_endpoint().connect().await.unwrap();

    conn.send(Packet::event("select_face", Vec::new()).unwrap())
        .await
        .unwrap();
    conn.send(Packet::call(9, "get_encode_port", Vec::new()).unwrap())
        .await
        .unwrap();

    let answer = tokio::time::timeout(Duration::from_secs(5), conn.recv())
        .await
        .expect("timeout")
        .expect("closed");
    assert_eq!(answer.serial(), 9);
    assert_eq!(answer.message_type(), MessageType::Reply);
}

#[tokio::test]
async fn typed_wrappers_round_trip() {
    let (controller, _media) = start(TestMedia::default()).await;
    let client = connect(&controller).await;

    assert_eq!(client.get_compose_port().await, 3001);
    assert_eq!(client.get_encode_port().await, 3002);
    assert_eq!(client.get_audio_port().await, 3003);
    assert!(client.new_record().await);

    assert_eq!(
        client.adjust_pip(1, 0, 0, -1).await,
        PipChanges::X | PipChanges::H
    );
    assert!(client.switch_channel(Channel::VideoA, 3004).await);
    assert!(!client.switch_channel(Channel::Audio, 3004).await);

    // A rejected mode leaves no change in flight.
    assert!(!client.set_composite_mode(9).await);
    assert!(!client.mode_change_in_flight());
    assert_eq!(client.get_composite_mode().await, 0);
}

// ── Preview ports ────────────────────────────────────────────────

#[tokio::test]
async fn preview_ports_round_trip() {
    let (controller, media) = start(TestMedia::default()).await;
    let client = connect(&controller).await;

    assert!(client.get_preview_ports().await.is_empty());

    let ports = vec![PreviewPort::new(9001, 1, 2), PreviewPort::new(9002, 2, 7)];
    *media.ports.lock().unwrap() = ports.clone();
    assert_eq!(client.get_preview_ports().await, ports);
}

#[tokio::test]
async fn preview_ports_from_startup_list() {
    let ports = vec![PreviewPort::new(3004, 1, 6), PreviewPort::new(3005, 2, 5)];
    let (controller, _media) = start(TestMedia::with_ports(ports.clone())).await;
    let client = connect(&controller).await;
    assert_eq!(client.get_preview_ports().await, ports);
}

// ── Events ───────────────────────────────────────────────────────

#[tokio::test]
async fn events_arrive_in_emit_order() {
    let (controller, _media) = start(TestMedia::default()).await;
    let client = connect(&controller).await;
    let mut rx = client.subscribe();
    wait_until(|| controller.connection_count() == 1).await;

    controller.broadcaster().tell_new_mode_online(1);
    controller.broadcaster().tell_new_mode_online(2);

    assert_eq!(
        next_event(&mut rx).await,
        ClientEvent::Controller(ControllerEvent::NewModeOnline { mode: 1 })
    );
    assert_eq!(
        next_event(&mut rx).await,
        ClientEvent::Controller(ControllerEvent::NewModeOnline { mode: 2 })
    );
}

#[tokio::test]
async fn media_server_can_emit_from_a_handler() {
    let (controller, _media) = start(TestMedia::default()).await;
    let client = connect(&controller).await;
    let mut rx = client.subscribe();
    wait_until(|| controller.connection_count() == 1).await;

    let faces = vec![FaceBox::new(10, 20, 30, 40)];
    client.mark_face(&faces).await;
    assert_eq!(
        next_event(&mut rx).await,
        ClientEvent::Controller(ControllerEvent::ShowFaceMarker {
            faces: faces.clone()
        })
    );

    client.mark_tracking(&[]).await;
    assert_eq!(
        next_event(&mut rx).await,
        ClientEvent::Controller(ControllerEvent::ShowTrackMarker { faces: Vec::new() })
    );

    assert!(client.click_video(5, 6, 640, 360).await);
    assert_eq!(
        next_event(&mut rx).await,
        ClientEvent::Controller(ControllerEvent::SelectFace { x: 5, y: 6 })
    );
}

#[tokio::test]
async fn preview_port_removed_is_redispatched() {
    let (controller, _media) = start(TestMedia::default()).await;
    let client = connect(&controller).await;
    let mut rx = client.subscribe();
    wait_until(|| controller.connection_count() == 1).await;

    let port = PreviewPort::new(3006, 1, 6);
    controller.broadcaster().tell_preview_port_added(port);
    controller.broadcaster().tell_preview_port_removed(port);

    assert_eq!(
        next_event(&mut rx).await,
        ClientEvent::Controller(ControllerEvent::PreviewPortAdded(port))
    );
    assert_eq!(
        next_event(&mut rx).await,
        ClientEvent::Controller(ControllerEvent::PreviewPortRemoved(port))
    );
}

#[tokio::test]
async fn event_stream_yields_the_same_events() {
    use tokio_stream::StreamExt;

    let (controller, _media) = start(TestMedia::default()).await;
    let client = connect(&controller).await;
    let mut events = Box::pin(client.events());
    wait_until(|| controller.connection_count() == 1).await;

    controller.broadcaster().select_face(1, 2);
    let event = tokio::time::timeout(Duration::from_secs(5), events.next())
        .await
        .expect("timeout");
    assert_eq!(
        event,
        Some(ClientEvent::Controller(ControllerEvent::SelectFace { x: 1, y: 2 }))
    );
}

// ── Single flight ────────────────────────────────────────────────

#[tokio::test]
async fn second_mode_change_is_dropped_until_mode_online() {
    let (controller, media) = start(TestMedia::default()).await;
    let client = connect(&controller).await;
    let mut rx = client.subscribe();
    wait_until(|| controller.connection_count() == 1).await;

    assert!(client.set_composite_mode(1).await);
    assert!(client.mode_change_in_flight());
    assert!(!client.set_composite_mode(2).await);
    assert_eq!(media.mode_calls.load(Ordering::SeqCst), 1);

    // Unrelated calls are not held up by the pending change.
    assert_eq!(client.get_composite_mode().await, 1);

    controller.broadcaster().tell_new_mode_online(1);
    assert_eq!(
        next_event(&mut rx).await,
        ClientEvent::Controller(ControllerEvent::NewModeOnline { mode: 1 })
    );
    assert!(!client.mode_change_in_flight());

    assert!(client.set_composite_mode(2).await);
    assert_eq!(media.mode_calls.load(Ordering::SeqCst), 2);
}

// ── Connection lifecycle ─────────────────────────────────────────

#[tokio::test]
async fn connect_twice_is_rejected_without_a_second_transport() {
    let (controller, _media) = start(TestMedia::default()).await;
    let client = connect(&controller).await;
    wait_until(|| controller.connection_count() == 1).await;

    let again = client.connect(controller.local_endpoint()).await;
    assert!(matches!(again, Err(SwitchError::AlreadyConnected)));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(controller.connection_count(), 1);
    assert!(client.is_connected());
}

#[tokio::test]
async fn disconnected_client_leaves_the_live_set() {
    let (controller, _media) = start(TestMedia::default()).await;
    let leaving = connect(&controller).await;
    let staying = connect(&controller).await;
    let mut leaving_rx = leaving.subscribe();
    let mut staying_rx = staying.subscribe();
    wait_until(|| controller.connection_count() == 2).await;

    assert_ok!(leaving.disconnect().await);
    assert!(!leaving.is_connected());
    wait_until(|| controller.connection_count() == 1).await;

    assert_eq!(controller.broadcaster().select_face(7, 8), 1);
    assert_eq!(
        next_event(&mut staying_rx).await,
        ClientEvent::Controller(ControllerEvent::SelectFace { x: 7, y: 8 })
    );
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(leaving_rx.try_recv().is_err());

    // A disconnected client fails locally and may reconnect.
    assert!(matches!(
        leaving.call::<_, (i32,)>("get_audio_port", &()).await,
        Err(SwitchError::NotConnected)
    ));
    assert_ok!(leaving.connect(controller.local_endpoint()).await);
    assert_eq!(leaving.get_audio_port().await, 3003);
}

#[tokio::test]
async fn every_client_sees_every_event_exactly_once() {
    const CLIENTS: usize = 8;
    const EVENTS: i32 = 200;

    let (controller, _media) = start(TestMedia::default()).await;
    let mut clients = Vec::new();
    for _ in 0..CLIENTS {
        let client = connect(&controller).await;
        let rx = client.subscribe();
        clients.push((client, rx));
    }
    wait_until(|| controller.connection_count() == CLIENTS).await;

    let hub = controller.broadcaster().clone();
    let emitter = tokio::spawn(async move {
        for i in 0..EVENTS {
            assert_eq!(hub.select_face(i, -i), CLIENTS);
            if i % 50 == 0 {
                tokio::task::yield_now().await;
            }
        }
    });

    for (_client, rx) in clients.iter_mut() {
        for i in 0..EVENTS {
            assert_eq!(
                next_event(rx).await,
                ClientEvent::Controller(ControllerEvent::SelectFace { x: i, y: -i })
            );
        }
    }
    emitter.await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    for (_client, rx) in clients.iter_mut() {
        assert!(rx.try_recv().is_err(), "duplicate delivery");
    }
}

#[tokio::test]
async fn slow_reply_times_out_locally() {
    let media = TestMedia {
        slow_compose: Some(Duration::from_millis(300)),
        ..Default::default()
    };
    let (controller, _media) = start(media).await;
    let client = SwitchClient::new(
        ClientOptions::default().with_call_timeout(Duration::from_millis(100)),
    );
    client.connect(controller.local_endpoint()).await.unwrap();

    let result = client.call::<_, (i32,)>("get_compose_port", &()).await;
    assert!(matches!(result, Err(SwitchError::Timeout(_))));
    assert!(client.is_connected());
    assert_eq!(client.get_compose_port().await, 0);

    // Let the stale replies land; they must not answer the next call.
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(client.get_encode_port().await, 3002);
}

#[tokio::test]
async fn slow_handler_does_not_stall_other_connections() {
    let media = TestMedia {
        slow_compose: Some(Duration::from_millis(500)),
        ..Default::default()
    };
    let (controller, _media) = start(media).await;
    let slow = connect(&controller).await;
    let fast = connect(&controller).await;

    let started = std::time::Instant::now();
    let (compose, encode) = tokio::join!(slow.get_compose_port(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let port = fast.get_encode_port().await;
        (port, started.elapsed())
    });
    assert_eq!(compose, 3001);
    assert_eq!(encode.0, 3002);
    assert!(encode.1 < Duration::from_millis(400), "blocked for {:?}", encode.1);
}

#[tokio::test]
async fn stalled_peer_loses_events_instead_of_queueing_forever() {
    const EVENTS: usize = 2000;

    let (controller, _media) = start(TestMedia::default()).await;
    // Never polled, so its socket and queues fill up.
    let _stalled = controller.local_endpoint().connect().await.unwrap();
    wait_until(|| controller.connection_count() == 1).await;

    let faces = vec![FaceBox::new(1, 2, 3, 4); 1000];
    let delivered: usize = (0..EVENTS)
        .map(|_| controller.broadcaster().show_face_marker(faces.clone()))
        .sum();
    assert!(delivered < EVENTS, "every event was queued");
    assert_eq!(controller.connection_count(), 1);

    let client = connect(&controller).await;
    assert_eq!(client.get_audio_port().await, 3003);
}

#[tokio::test]
async fn pending_mode_change_does_not_survive_a_disconnect() {
    let (controller, media) = start(TestMedia::default()).await;
    let client = connect(&controller).await;

    assert!(client.set_composite_mode(1).await);
    assert!(client.mode_change_in_flight());

    assert_ok!(client.disconnect().await);
    assert!(!client.mode_change_in_flight());

    assert_ok!(client.connect(controller.local_endpoint()).await);
    assert!(client.set_composite_mode(2).await);
    assert_eq!(media.mode_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn pending_mode_change_does_not_survive_a_remote_close() {
    let (controller, _media) = start(TestMedia::default()).await;
    let client = connect(&controller).await;
    let mut rx = client.subscribe();
    wait_until(|| controller.connection_count() == 1).await;

    assert!(client.set_composite_mode(3).await);
    controller.shutdown().await;
    assert_eq!(next_event(&mut rx).await, ClientEvent::ConnectionClosed);
    assert!(!client.mode_change_in_flight());

    let (replacement, media) = start(TestMedia::default()).await;
    assert_ok!(client.connect(replacement.local_endpoint()).await);
    assert!(client.set_composite_mode(1).await);
    assert_eq!(media.mode_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn controller_shutdown_closes_clients() {
    let (controller, _media) = start(TestMedia::default()).await;
    let client = connect(&controller).await;
    let mut rx = client.subscribe();
    wait_until(|| controller.connection_count() == 1).await;

    controller.shutdown().await;
    assert!(!controller.is_active());
    assert_eq!(controller.connection_count(), 0);

    assert_eq!(next_event(&mut rx).await, ClientEvent::ConnectionClosed);
    assert!(!client.is_connected());

    let late = SwitchClient::default();
    assert!(late.connect(controller.local_endpoint()).await.is_err());
}

#[tokio::test]
async fn bind_failure_is_returned() {
    let (controller, _media) = start(TestMedia::default()).await;
    let media: Arc<dyn MediaServer> = Arc::new(TestMedia::default());
    let second = Controller::start(controller.local_endpoint(), media).await;
    assert!(matches!(second, Err(SwitchError::Bind { .. })));
}

#[cfg(unix)]
#[tokio::test]
async fn unix_socket_transport() {
    let path = std::env::temp_dir().join(format!("switchboard-test-{}.sock", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let endpoint = Endpoint::Unix { path: path.clone() };

    let media: Arc<dyn MediaServer> = Arc::new(TestMedia::default());
    let controller = Controller::start(&endpoint, media).await.unwrap();
    let client = SwitchClient::default();
    client.connect(&endpoint).await.unwrap();
    assert_eq!(client.get_compose_port().await, 3001);

    client.disconnect().await.unwrap();
    controller.shutdown().await;
    assert!(!path.exists());
}
