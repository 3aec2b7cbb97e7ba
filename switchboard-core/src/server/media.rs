//! The business object behind every remote method.

use crate::protocol::{FaceBox, PipChanges, PreviewPort};

/// Who issued a call. Handed to every handler alongside its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// Identifier the controller assigned when the connection was accepted.
    pub connection_id: u64,
    /// Transport-level peer label (`ip:port` or socket path).
    pub peer: String,
}

/// The media-server side of the control plane.
///
/// Handlers run synchronously with respect to the call they answer, so
/// implementations should return promptly. Implementations that change
/// observable state are expected to announce it through a
/// [`Broadcaster`](crate::server::Broadcaster) they hold.
pub trait MediaServer: Send + Sync + 'static {
    /// Current composite output sink port.
    fn compose_port(&self) -> i32;

    /// Current encode output sink port.
    fn encode_port(&self) -> i32;

    /// Current active audio sink port.
    fn audio_port(&self) -> i32;

    /// Every preview sink, in display order.
    fn preview_ports(&self) -> Vec<PreviewPort>;

    /// Request a layout change. `false` rejects it.
    fn set_composite_mode(&self, mode: i32) -> bool;

    fn composite_mode(&self) -> i32;

    /// Start a new recording segment.
    fn new_record(&self) -> bool;

    /// Nudge the picture-in-picture rectangle and report which fields moved.
    fn adjust_pip(&self, dx: i32, dy: i32, dw: i32, dh: i32) -> PipChanges;

    /// Retarget `channel` to the source on `port`.
    fn switch(&self, channel: i32, port: i32) -> bool;

    /// A pointer click at `(x, y)` inside a `view_w` by `view_h` view.
    fn click_video(&self, x: i32, y: i32, view_w: i32, view_h: i32) -> bool;

    /// Face boxes to redraw. `tracking` selects the tracking overlay.
    fn mark_face(&self, faces: Vec<FaceBox>, tracking: bool);
}
