//! Method name → handler mapping.
//!
//! The table is built once from the schema when the controller starts and
//! never changes afterwards. Lookup is an exact, case-sensitive key match.

use std::collections::HashMap;

use tracing::debug;

use crate::error::SwitchError;
use crate::protocol::{FaceBox, Method, decode_body, encode_body, format_preview_ports};
use crate::server::media::{CallContext, MediaServer};

/// Decodes an argument tuple, invokes the media server and encodes the
/// return tuple.
pub type MethodHandler = fn(&dyn MediaServer, &CallContext, &[u8]) -> Reply;

/// Encoded return tuple, or the failure sent back as an Error frame.
pub type Reply = Result<Vec<u8>, SwitchError>;

#[derive(Clone)]
pub struct DispatchTable {
    handlers: HashMap<&'static str, MethodHandler>,
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort_unstable();
        f.debug_struct("DispatchTable").field("methods", &names).finish()
    }
}

impl DispatchTable {
    /// One entry per schema method.
    pub fn new() -> Self {
        let handlers = Method::all()
            .map(|method| (method.name(), handler_for(method)))
            .collect();
        Self { handlers }
    }

    pub fn lookup(&self, name: &str) -> Option<MethodHandler> {
        self.handlers.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Route one call. A name outside the table yields
    /// [`SwitchError::UnknownMethod`].
    pub fn dispatch(
        &self,
        media: &dyn MediaServer,
        ctx: &CallContext,
        method: &str,
        args: &[u8],
    ) -> Reply {
        let handler = self
            .lookup(method)
            .ok_or_else(|| SwitchError::UnknownMethod(method.to_string()))?;
        debug!(conn = ctx.connection_id, %method, "dispatch");
        handler(media, ctx, args)
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

fn handler_for(method: Method) -> MethodHandler {
    match method {
        Method::GetComposePort => get_compose_port,
        Method::GetEncodePort => get_encode_port,
        Method::GetAudioPort => get_audio_port,
        Method::GetPreviewPorts => get_preview_ports,
        Method::SetCompositeMode => set_composite_mode,
        Method::GetCompositeMode => get_composite_mode,
        Method::NewRecord => new_record,
        Method::AdjustPip => adjust_pip,
        Method::Switch => switch,
        Method::ClickVideo => click_video,
        Method::MarkFace => mark_face,
        Method::MarkTracking => mark_tracking,
    }
}

// ── Handlers ─────────────────────────────────────────────────────

fn no_args(method: Method, args: &[u8]) -> Result<(), SwitchError> {
    decode_body::<()>(method.name(), args)
}

fn get_compose_port(media: &dyn MediaServer, _: &CallContext, args: &[u8]) -> Reply {
    no_args(Method::GetComposePort, args)?;
    encode_body(&(media.compose_port(),))
}

fn get_encode_port(media: &dyn MediaServer, _: &CallContext, args: &[u8]) -> Reply {
    no_args(Method::GetEncodePort, args)?;
    encode_body(&(media.encode_port(),))
}

fn get_audio_port(media: &dyn MediaServer, _: &CallContext, args: &[u8]) -> Reply {
    no_args(Method::GetAudioPort, args)?;
    encode_body(&(media.audio_port(),))
}

/// The port list travels as text, see [`crate::protocol::ports`].
fn get_preview_ports(media: &dyn MediaServer, _: &CallContext, args: &[u8]) -> Reply {
    no_args(Method::GetPreviewPorts, args)?;
    let text = format_preview_ports(&media.preview_ports());
    encode_body(&(text,))
}

fn set_composite_mode(media: &dyn MediaServer, ctx: &CallContext, args: &[u8]) -> Reply {
    let (mode,): (i32,) = decode_body(Method::SetCompositeMode.name(), args)?;
    let ok = media.set_composite_mode(mode);
    debug!(conn = ctx.connection_id, mode, ok, "set_composite_mode");
    encode_body(&(ok,))
}

fn get_composite_mode(media: &dyn MediaServer, _: &CallContext, args: &[u8]) -> Reply {
    no_args(Method::GetCompositeMode, args)?;
    encode_body(&(media.composite_mode(),))
}

fn new_record(media: &dyn MediaServer, _: &CallContext, args: &[u8]) -> Reply {
    no_args(Method::NewRecord, args)?;
    encode_body(&(media.new_record(),))
}

fn adjust_pip(media: &dyn MediaServer, _: &CallContext, args: &[u8]) -> Reply {
    let (dx, dy, dw, dh): (i32, i32, i32, i32) = decode_body(Method::AdjustPip.name(), args)?;
    let changed = media.adjust_pip(dx, dy, dw, dh);
    encode_body(&(changed.bits(),))
}

fn switch(media: &dyn MediaServer, ctx: &CallContext, args: &[u8]) -> Reply {
    let (channel, port): (i32, i32) = decode_body(Method::Switch.name(), args)?;
    let ok = media.switch(channel, port);
    debug!(conn = ctx.connection_id, channel, port, ok, "switch");
    encode_body(&(ok,))
}

fn click_video(media: &dyn MediaServer, _: &CallContext, args: &[u8]) -> Reply {
    let (x, y, view_w, view_h): (i32, i32, i32, i32) =
        decode_body(Method::ClickVideo.name(), args)?;
    encode_body(&(media.click_video(x, y, view_w, view_h),))
}

fn mark_face(media: &dyn MediaServer, _: &CallContext, args: &[u8]) -> Reply {
    let (faces,): (Vec<FaceBox>,) = decode_body(Method::MarkFace.name(), args)?;
    media.mark_face(faces, false);
    encode_body(&())
}

fn mark_tracking(media: &dyn MediaServer, _: &CallContext, args: &[u8]) -> Reply {
    let (faces,): (Vec<FaceBox>,) = decode_body(Method::MarkTracking.name(), args)?;
    media.mark_face(faces, true);
    encode_body(&())
}
