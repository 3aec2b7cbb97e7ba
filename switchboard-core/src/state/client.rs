//! Client-side state tracking.
//!
//! Tracks the link phase, which link generation is current, and the one
//! call that may be outstanding at a time.

use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use crate::error::SwitchError;
use crate::packet::Packet;
use crate::state::connection::ConnectionPhase;

// ── PendingCall ──────────────────────────────────────────────────

/// The call currently awaiting its Reply or Error frame.
#[derive(Debug)]
pub struct PendingCall {
    pub serial: u64,
    pub method: String,
    pub sent_at: Instant,
    reply: oneshot::Sender<Packet>,
}

impl PendingCall {
    pub fn new(serial: u64, method: impl Into<String>, reply: oneshot::Sender<Packet>) -> Self {
        Self {
            serial,
            method: method.into(),
            sent_at: Instant::now(),
            reply,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.sent_at.elapsed()
    }

    /// Hand the answer to the waiting caller. Returns `false` if the caller
    /// already gave up.
    pub fn complete(self, packet: Packet) -> bool {
        self.reply.send(packet).is_ok()
    }
}

// ── ClientState ──────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ClientState {
    phase: ConnectionPhase,

    /// Bumped on every successful connect so that a reader task from an
    /// older link cannot tear down a newer one.
    generation: u64,

    pending: Option<PendingCall>,
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Connection Phase ──────────────────────────────────────────

    pub fn phase(&self) -> &ConnectionPhase {
        &self.phase
    }

    pub fn phase_mut(&mut self) -> &mut ConnectionPhase {
        &mut self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Move `Connecting` to `Connected` and start a new generation.
    pub fn link_established(&mut self) -> Result<u64, SwitchError> {
        self.phase.complete_connect()?;
        self.generation += 1;
        Ok(self.generation)
    }

    /// The link of `generation` went away underneath us. Returns `false`
    /// (and changes nothing) when that link is no longer current.
    pub fn link_lost(&mut self, generation: u64) -> bool {
        if generation != self.generation || !self.phase.is_connected() {
            return false;
        }
        self.phase.force_disconnect();
        self.pending = None;
        true
    }

    // ── Call Tracking ─────────────────────────────────────────────

    pub fn track(&mut self, call: PendingCall) {
        self.pending = Some(call);
    }

    /// Take the pending call if `serial` matches it.
    pub fn resolve(&mut self, serial: u64) -> Option<PendingCall> {
        match &self.pending {
            Some(call) if call.serial == serial => self.pending.take(),
            _ => None,
        }
    }

    /// Drop the pending call, failing its waiter.
    pub fn abandon(&mut self) -> Option<PendingCall> {
        self.pending.take()
    }

    pub fn pending_serial(&self) -> Option<u64> {
        self.pending.as_ref().map(|call| call.serial)
    }
}

// ── Tests ─────────────────────────────────────────────────────────
