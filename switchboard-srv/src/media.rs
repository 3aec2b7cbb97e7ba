//! In-memory media server.
//!
//! Holds the state a real pipeline would own (sink ports, preview sinks,
//! composite layout, PIP rectangle, channel sources) and announces changes
//! through the controller's [`Broadcaster`].

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use switchboard_core::{
    Broadcaster, Channel, CompositeMode, FaceBox, MediaServer, PipChanges, PreviewPort,
};

use crate::config::{MediaConfig, PipConfig};

#[derive(Debug)]
struct MediaState {
    compose_port: i32,
    encode_port: i32,
    audio_port: i32,
    preview_ports: Vec<PreviewPort>,
    mode: CompositeMode,
    pip: PipConfig,
    sources: HashMap<Channel, i32>,
    segment: u32,
}

#[derive(Debug)]
pub struct SimulatedMediaServer {
    hub: Broadcaster,
    frame_width: i32,
    frame_height: i32,
    state: Mutex<MediaState>,
}

impl SimulatedMediaServer {
    pub fn new(config: &MediaConfig, hub: Broadcaster) -> Self {
        let mode = CompositeMode::try_from(config.composite_mode).unwrap_or(CompositeMode::Pip);
        let frame_width = config.frame_width.max(1);
        let frame_height = config.frame_height.max(1);
        let preview_ports: Vec<PreviewPort> =
            config.preview_ports.iter().copied().map(PreviewPort::from).collect();

        // Video channels start on the first two video previews.
        let mut sources = HashMap::new();
        let mut videos = preview_ports
            .iter()
            .filter(|p| p.serve == Channel::VideoA.serves() as i32);
        if let Some(p) = videos.next() {
            sources.insert(Channel::VideoA, p.port);
        }
        if let Some(p) = videos.next() {
            sources.insert(Channel::VideoB, p.port);
        }

        let state = MediaState {
            compose_port: config.compose_port,
            encode_port: config.encode_port,
            audio_port: config.audio_port,
            preview_ports,
            mode,
            pip: clamp_rect(config.pip, frame_width, frame_height),
            sources,
            segment: 0,
        };

        Self {
            hub,
            frame_width,
            frame_height,
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, MediaState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The port currently feeding `channel`.
    pub fn source(&self, channel: Channel) -> Option<i32> {
        self.state().sources.get(&channel).copied()
    }

    pub fn pip(&self) -> PipConfig {
        self.state().pip
    }

    pub fn segment(&self) -> u32 {
        self.state().segment
    }

    /// A new input came online. Returns `false` if the port is already known.
    pub fn add_preview_port(&self, port: PreviewPort) -> bool {
        {
            let mut state = self.state();
            if state.preview_ports.iter().any(|p| p.port == port.port) {
                return false;
            }
            state.preview_ports.push(port);
        }
        info!(port = port.port, serve = port.serve, case = port.case, "preview port added");
        self.hub.tell_preview_port_added(port);
        true
    }

    /// An input went away. Returns `false` if the port was not known.
    pub fn remove_preview_port(&self, port: i32) -> bool {
        let removed = {
            let mut state = self.state();
            let Some(idx) = state.preview_ports.iter().position(|p| p.port == port) else {
                return false;
            };
            state.sources.retain(|_, source| *source != port);
            state.preview_ports.remove(idx)
        };
        info!(port, "preview port removed");
        self.hub.tell_preview_port_removed(removed);
        true
    }
}

/// Keep the rectangle inside the frame with a size of at least one pixel.
fn clamp_rect(rect: PipConfig, frame_w: i32, frame_h: i32) -> PipConfig {
    let w = rect.w.clamp(1, frame_w);
    let h = rect.h.clamp(1, frame_h);
    PipConfig {
        x: rect.x.clamp(0, frame_w - w),
        y: rect.y.clamp(0, frame_h - h),
        w,
        h,
    }
}

impl MediaServer for SimulatedMediaServer {
    fn compose_port(&self) -> i32 {
        self.state().compose_port
    }

    fn encode_port(&self) -> i32 {
        self.state().encode_port
    }

    fn audio_port(&self) -> i32 {
        self.state().audio_port
    }

    fn preview_ports(&self) -> Vec<PreviewPort> {
        self.state().preview_ports.clone()
    }

    fn set_composite_mode(&self, mode: i32) -> bool {
        let Ok(next) = CompositeMode::try_from(mode) else {
            debug!(mode, "rejecting unknown composite mode");
            return false;
        };
        self.state().mode = next;
        info!(mode = %next, "composite mode changed");
        self.hub.tell_new_mode_online(mode);
        true
    }

    fn composite_mode(&self) -> i32 {
        self.state().mode as i32
    }

    fn new_record(&self) -> bool {
        let segment = {
            let mut state = self.state();
            state.segment += 1;
            state.segment
        };
        info!(segment, "new recording segment");
        true
    }

    fn adjust_pip(&self, dx: i32, dy: i32, dw: i32, dh: i32) -> PipChanges {
        let mut state = self.state();
        let before = state.pip;
        let requested = PipConfig {
            x: before.x.saturating_add(dx),
            y: before.y.saturating_add(dy),
            w: before.w.saturating_add(dw),
            h: before.h.saturating_add(dh),
        };
        let after = clamp_rect(requested, self.frame_width, self.frame_height);
        state.pip = after;

        let mut changed = PipChanges::empty();
        changed.set(PipChanges::X, after.x != before.x);
        changed.set(PipChanges::Y, after.y != before.y);
        changed.set(PipChanges::W, after.w != before.w);
        changed.set(PipChanges::H, after.h != before.h);
        debug!(?after, changed = changed.bits(), "pip adjusted");
        changed
    }

    fn switch(&self, channel: i32, port: i32) -> bool {
        let Ok(channel) = Channel::try_from(channel) else {
            debug!(channel, "switch to unknown channel");
            return false;
        };

        let mut state = self.state();
        let serves = state
            .preview_ports
            .iter()
            .any(|p| p.port == port && p.serve == channel.serves() as i32);
        if !serves {
            debug!(%channel, port, "no matching source");
            return false;
        }

        state.sources.insert(channel, port);
        if channel == Channel::Audio {
            state.audio_port = port;
        }
        info!(%channel, port, "switched");
        true
    }

    fn click_video(&self, x: i32, y: i32, view_w: i32, view_h: i32) -> bool {
        if view_w <= 0 || view_h <= 0 {
            return false;
        }
        let fx = i64::from(x) * i64::from(self.frame_width) / i64::from(view_w);
        let fy = i64::from(y) * i64::from(self.frame_height) / i64::from(view_h);
        let fx = fx.clamp(0, i64::from(self.frame_width - 1)) as i32;
        let fy = fy.clamp(0, i64::from(self.frame_height - 1)) as i32;
        self.hub.select_face(fx, fy);
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
