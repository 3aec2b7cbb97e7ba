//! Client side of the control plane.
//!
//! [`SwitchClient`] holds one link to a controller. Every schema method has
//! a typed wrapper; events arrive on a single tagged stream.
//!
//! ```text
//!  caller ──► call lock ──► Call frame ────────────► controller
//!                 │                                      │
//!                 └── awaits ◄── reader task ◄── Reply / Error
//!                                    │
//!                                    └── Event ──► broadcast ──► subscribers
//! ```

mod guard;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, trace, warn};

use crate::error::SwitchError;
use crate::message::MessageType;
use crate::network::{Connection, ConnectionSender, Endpoint};
use crate::packet::Packet;
use crate::protocol::{
    Channel, ControllerEvent, FaceBox, Method, PipChanges, PreviewPort, decode_body, encode_body,
    parse_preview_ports,
};
use crate::state::{ClientState, ConnectionPhase, PendingCall};

pub use guard::SingleFlight;

/// Matches the bus timeout controllers have always been tuned for.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

// ── Options ──────────────────────────────────────────────────────

/// What kind of application a client belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClientRole {
    #[default]
    None,
    Ui,
    Capture,
}

impl fmt::Display for ClientRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientRole::None => f.write_str("none"),
            ClientRole::Ui => f.write_str("ui"),
            ClientRole::Capture => f.write_str("capture"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub role: ClientRole,
    /// How long a call waits for its reply before failing locally.
    pub call_timeout: Duration,
    /// Events buffered per subscriber before the slowest one lags.
    pub event_capacity: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            role: ClientRole::None,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ClientOptions {
    pub fn with_role(mut self, role: ClientRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

// ── Events ───────────────────────────────────────────────────────

/// Everything a subscriber can observe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Controller(ControllerEvent),
    /// The controller closed the link.
    ConnectionClosed,
}

// ── Shared state ─────────────────────────────────────────────────

#[derive(Debug)]
struct Shared {
    state: Mutex<ClientState>,
    mode_guard: SingleFlight,
    events: broadcast::Sender<ClientEvent>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: ClientEvent) {
        if self.events.send(event).is_err() {
            trace!("no event subscribers");
        }
    }

    fn redispatch(&self, packet: &Packet) {
        match ControllerEvent::from_packet(packet) {
            Ok(event) => {
                if let ControllerEvent::NewModeOnline { mode } = event {
                    // Clear before subscribers run so they may issue the next change.
                    self.mode_guard.release();
                    debug!(mode, "composite mode online");
                }
                self.publish(ClientEvent::Controller(event));
            }
            Err(SwitchError::UnknownEvent(name)) => {
                warn!(event = %name, "ignoring unknown event");
            }
            Err(e) => warn!(event = packet.member(), "dropping undecodable event: {e}"),
        }
    }
}

/// The live half of a connection, guarded by the call lock.
#[derive(Debug)]
struct Link {
    tx: ConnectionSender,
    reader: JoinHandle<()>,
    next_serial: u64,
    peer: String,
}

impl Drop for Link {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

// ── SwitchClient ─────────────────────────────────────────────────

#[derive(Debug)]
pub struct SwitchClient {
    options: ClientOptions,
    shared: Arc<Shared>,
    /// Call-serialization lock: held from sending a call until its answer.
    link: tokio::sync::Mutex<Option<Link>>,
}

impl SwitchClient {
    pub fn new(options: ClientOptions) -> Self {
        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        Self {
            options,
            shared: Arc::new(Shared {
                state: Mutex::new(ClientState::new()),
                mode_guard: SingleFlight::new(),
                events,
            }),
            link: tokio::sync::Mutex::new(None),
        }
    }

    pub fn role(&self) -> ClientRole {
        self.options.role
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn is_connected(&self) -> bool {
        self.shared.state().phase().is_connected()
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.shared.state().phase().clone()
    }

    /// `true` while a composite mode change awaits its `new_mode_online`.
    pub fn mode_change_in_flight(&self) -> bool {
        self.shared.mode_guard.is_in_flight()
    }

    /// Receiver for every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.shared.events.subscribe()
    }

    /// [`subscribe`](Self::subscribe) as a `Stream`. Lagged gaps are logged
    /// and skipped.
    pub fn events(&self) -> impl Stream<Item = ClientEvent> + Send + 'static {
        BroadcastStream::new(self.subscribe()).filter_map(|item| match item {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "event subscriber lagged");
                None
            }
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────────

    /// Open the link. Fails with [`SwitchError::AlreadyConnected`] if a link
    /// is up or being set up; no second transport is opened.
    pub async fn connect(&self, endpoint: &Endpoint) -> Result<(), SwitchError> {
        self.shared.state().phase_mut().begin_connect()?;

        let mut link = self.link.lock().await;
        let conn = match endpoint.connect().await {
            Ok(conn) => conn,
            Err(e) => {
                self.shared.state().phase_mut().force_disconnect();
                warn!(%endpoint, "connect failed: {e}");
                return Err(e);
            }
        };

        let generation = self.shared.state().link_established()?;
        let tx = conn.sender();
        let peer = conn.peer().to_string();
        let reader = tokio::spawn(read_loop(conn, generation, self.shared.clone()));

        info!(role = %self.options.role, %peer, "connected to controller");
        *link = Some(Link {
            tx,
            reader,
            next_serial: 0,
            peer,
        });
        Ok(())
    }

    /// Close the link. An in-flight call fails with
    /// [`SwitchError::ChannelClosed`]. `connect` may be called again
    /// afterwards.
    pub async fn disconnect(&self) -> Result<(), SwitchError> {
        {
            let mut state = self.shared.state();
            state.phase_mut().begin_disconnect()?;
            state.abandon();
        }
        // No new_mode_online can arrive for a change sent on this link.
        self.shared.mode_guard.release();

        let link = self.link.lock().await.take();
        if let Some(link) = link {
            info!(peer = %link.peer, "disconnected from controller");
        }
        self.shared.state().phase_mut().finish_disconnect()
    }

    // ── Calls ─────────────────────────────────────────────────────

    /// Issue one call and wait for its answer.
    ///
    /// Only one call is on the wire per client; concurrent callers wait for
    /// the call lock. Nothing is sent when the client is not connected. No
    /// call is retried.
    pub async fn call<A, R>(&self, method: &str, args: &A) -> Result<R, SwitchError>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut guard = self.link.lock().await;
        let link = guard.as_mut().ok_or(SwitchError::NotConnected)?;

        let body = encode_body(args)?;
        link.next_serial += 1;
        let serial = link.next_serial;
        let packet = Packet::call(serial, method, body)?;

        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let mut state = self.shared.state();
            if !state.phase().is_connected() {
                return Err(SwitchError::NotConnected);
            }
            state.track(PendingCall::new(serial, method, reply_tx));
        }

        if link.tx.send(packet).await.is_err() {
            self.shared.state().abandon();
            return Err(SwitchError::ChannelClosed);
        }
        trace!(serial, %method, "call sent");

        let timeout = self.options.call_timeout;
        let answer = match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(answer)) => answer,
            Ok(Err(_)) => return Err(SwitchError::ChannelClosed),
            Err(_) => {
                let mut state = self.shared.state();
                if state.pending_serial() == Some(serial) {
                    state.abandon();
                }
                return Err(SwitchError::Timeout(timeout));
            }
        };
        drop(guard);

        match answer.message_type() {
            MessageType::Reply => decode_body(method, answer.body()),
            MessageType::Error => Err(SwitchError::Remote {
                method: method.to_string(),
                message: answer.error_message()?,
            }),
            _ => Err(SwitchError::ProtocolViolation("call answered by a non-reply frame")),
        }
    }

    /// Call a method returning one value; failures are logged and yield the
    /// default.
    async fn call_value<A, R>(&self, method: Method, args: &A) -> R
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned + Default,
    {
        match self.call::<A, (R,)>(method.name(), args).await {
            Ok((value,)) => value,
            Err(e) if e.is_transport() => {
                warn!(%method, "call failed: {e}");
                R::default()
            }
            Err(e) => {
                warn!(%method, "controller rejected call: {e}");
                R::default()
            }
        }
    }

    pub async fn get_compose_port(&self) -> i32 {
        self.call_value(Method::GetComposePort, &()).await
    }

    pub async fn get_encode_port(&self) -> i32 {
        self.call_value(Method::GetEncodePort, &()).await
    }

    pub async fn get_audio_port(&self) -> i32 {
        self.call_value(Method::GetAudioPort, &()).await
    }

    /// Decoded preview-port list; empty on any failure.
    pub async fn get_preview_ports(&self) -> Vec<PreviewPort> {
        let text: String = self.call_value(Method::GetPreviewPorts, &()).await;
        if text.is_empty() {
            return Vec::new();
        }
        parse_preview_ports(&text).unwrap_or_else(|e| {
            warn!("get_preview_ports: {e}");
            Vec::new()
        })
    }

    /// Request a layout change.
    ///
    /// While an accepted change has not yet been confirmed by
    /// `new_mode_online`, further requests return `false` without touching
    /// the wire. They are dropped, not queued: reissue after the event.
    pub async fn set_composite_mode(&self, mode: i32) -> bool {
        if !self.shared.mode_guard.try_begin() {
            debug!(mode, "composite mode change already in flight");
            return false;
        }
        let accepted: bool = self.call_value(Method::SetCompositeMode, &(mode,)).await;
        if !accepted {
            self.shared.mode_guard.release();
        }
        accepted
    }

    pub async fn get_composite_mode(&self) -> i32 {
        self.call_value(Method::GetCompositeMode, &()).await
    }

    pub async fn new_record(&self) -> bool {
        self.call_value(Method::NewRecord, &()).await
    }

    /// Which of x, y, w, h the controller actually changed.
    pub async fn adjust_pip(&self, dx: i32, dy: i32, dw: i32, dh: i32) -> PipChanges {
        let bits: u32 = self.call_value(Method::AdjustPip, &(dx, dy, dw, dh)).await;
        PipChanges::from_bits_truncate(bits)
    }

    pub async fn switch_channel(&self, channel: Channel, port: i32) -> bool {
        self.call_value(Method::Switch, &(channel as i32, port)).await
    }

    pub async fn click_video(&self, x: i32, y: i32, view_w: i32, view_h: i32) -> bool {
        self.call_value(Method::ClickVideo, &(x, y, view_w, view_h)).await
    }

    pub async fn mark_face(&self, faces: &[FaceBox]) {
        self.call_unit(Method::MarkFace, faces).await;
    }

    pub async fn mark_tracking(&self, faces: &[FaceBox]) {
        self.call_unit(Method::MarkTracking, faces).await;
    }

    async fn call_unit(&self, method: Method, faces: &[FaceBox]) {
        if let Err(e) = self.call::<_, ()>(method.name(), &(faces,)).await {
            warn!(%method, "call failed: {e}");
        }
    }
}

impl Default for SwitchClient {
    fn default() -> Self {
        Self::new(ClientOptions::default())
    }
}

async fn read_loop(mut conn: Connection, generation: u64, shared: Arc<Shared>) {
    while let Some(packet) = conn.recv().await {
        match packet.message_type() {
            MessageType::Reply | MessageType::Error => {
                let call = shared.state().resolve(packet.serial());
                match call {
                    Some(call) => {
                        if !call.complete(packet) {
                            debug!("caller stopped waiting");
                        }
                    }
                    None => debug!(
                        serial = packet.serial(),
                        member = packet.member(),
                        "dropping answer to a call that is no longer pending"
                    ),
                }
            }
            MessageType::Event => shared.redispatch(&packet),
            MessageType::Call => {
                warn!(member = packet.member(), "protocol violation: controller sent a call");
            }
        }
    }

    let lost = shared.state().link_lost(generation);
    if lost {
        shared.mode_guard.release();
        warn!(peer = conn.peer(), "controller closed the connection");
        shared.publish(ClientEvent::ConnectionClosed);
    }
}
