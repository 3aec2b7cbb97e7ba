//! Live connection set and event fan-out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, warn};

use crate::network::ConnectionSender;
use crate::packet::Packet;
use crate::protocol::{ControllerEvent, FaceBox, PreviewPort};

/// One registered connection.
#[derive(Debug)]
struct Peer {
    id: u64,
    label: String,
    tx: ConnectionSender,
}

/// Cloneable handle to the controller's live connection set.
///
/// Registration, removal and every broadcast take the same lock, so each
/// event reaches a consistent set of recipients and every connection sees
/// events in emit order. Sends only try to queue onto the connection's
/// writer and never wait while the lock is held; a peer whose queue is full
/// misses that event.
#[derive(Debug, Clone, Default)]
pub struct Broadcaster {
    peers: Arc<Mutex<Vec<Peer>>>,
    next_id: Arc<AtomicU64>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    fn peers(&self) -> MutexGuard<'_, Vec<Peer>> {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a connection; returns its id.
    pub(crate) fn register(&self, label: &str, tx: ConnectionSender) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut peers = self.peers();
        peers.push(Peer {
            id,
            label: label.to_string(),
            tx,
        });
        debug!(conn = id, peer = label, live = peers.len(), "connection registered");
        id
    }

    /// Remove a connection and drop its sender in the same step.
    pub(crate) fn unregister(&self, id: u64) -> bool {
        let mut peers = self.peers();
        let Some(idx) = peers.iter().position(|p| p.id == id) else {
            return false;
        };
        let peer = peers.remove(idx);
        debug!(conn = id, peer = %peer.label, live = peers.len(), "connection removed");
        true
    }

    /// Remove every connection. Returns how many were live.
    pub(crate) fn close_all(&self) -> usize {
        let mut peers = self.peers();
        let count = peers.len();
        peers.clear();
        count
    }

    pub fn connection_count(&self) -> usize {
        self.peers().len()
    }

    /// Send `event` to every live connection in registration order.
    /// Returns the number of connections it was queued on.
    pub fn emit(&self, event: &ControllerEvent) -> usize {
        match event.clone().into_packet() {
            Ok(packet) => self.emit_packet(packet),
            Err(e) => {
                error!(event = event.name(), "failed to encode event: {e}");
                0
            }
        }
    }

    /// Fan out an already-built Event frame.
    pub fn emit_packet(&self, packet: Packet) -> usize {
        let peers = self.peers();
        let mut delivered = 0;
        for peer in peers.iter() {
            match peer.tx.try_send(packet.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => warn!(
                    conn = peer.id,
                    peer = %peer.label,
                    event = packet.member(),
                    "event dropped: peer is not reading"
                ),
                Err(TrySendError::Closed(_)) => warn!(
                    conn = peer.id,
                    peer = %peer.label,
                    event = packet.member(),
                    "event delivery failed: connection closed"
                ),
            }
        }
        debug!(event = packet.member(), delivered, "emit");
        delivered
    }

    // ── Typed helpers ────────────────────────────────────────────

    pub fn tell_preview_port_added(&self, port: PreviewPort) -> usize {
        self.emit(&ControllerEvent::PreviewPortAdded(port))
    }

    pub fn tell_preview_port_removed(&self, port: PreviewPort) -> usize {
        self.emit(&ControllerEvent::PreviewPortRemoved(port))
    }

    pub fn tell_new_mode_online(&self, mode: i32) -> usize {
        self.emit(&ControllerEvent::NewModeOnline { mode })
    }

    pub fn show_face_marker(&self, faces: Vec<FaceBox>) -> usize {
        self.emit(&ControllerEvent::ShowFaceMarker { faces })
    }

    pub fn show_track_marker(&self, faces: Vec<FaceBox>) -> usize {
        self.emit(&ControllerEvent::ShowTrackMarker { faces })
    }

    pub fn select_face(&self, x: i32, y: i32) -> usize {
        self.emit(&ControllerEvent::SelectFace { x, y })
    }
}
