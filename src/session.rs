//! Shared session state.
//!
//! One record holds the matched peer identity, the link status, and the
//! most recent water-level sample. Link-event handlers are the only
//! writers; the periodic reporter reads through [`Session::snapshot`].
//! Every update happens under a single lock acquisition, so a reader can
//! never observe a partially updated record.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::bt::stack::PeerAddress;

/// The mutable session record.
///
/// Created once at startup and mutated in place for the process lifetime.
/// `matched_peer` is written at most once per discovery cycle; only an
/// explicit discovery restart clears it.
#[derive(Debug, Default)]
struct SessionState {
    matched_peer: Option<PeerAddress>,
    connected: bool,
    latest_level: u8,
}

/// A consistent copy of the session record at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionSnapshot {
    /// Address of the matched peer, if discovery has found one.
    pub matched_peer: Option<PeerAddress>,
    /// Whether the SPP channel is currently open.
    pub connected: bool,
    /// Most recent water-level reading (0-255).
    pub latest_level: u8,
}

/// Handle to the shared session record.
///
/// Cheap to clone; all clones observe the same record.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<RwLock<SessionState>>,
}

impl Session {
    /// Create a fresh session: no matched peer, disconnected, level 0.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionState::default())),
        }
    }

    /// Capture the matched peer address, first write wins.
    ///
    /// Returns whether the address was written. A peer captured earlier in
    /// the same discovery cycle is never overwritten.
    pub(crate) fn set_matched_peer(&self, addr: PeerAddress) -> bool {
        let mut state = self.inner.write();
        if state.matched_peer.is_some() {
            return false;
        }
        state.matched_peer = Some(addr);
        true
    }

    /// Clear the matched peer for a new discovery cycle.
    pub(crate) fn clear_matched_peer(&self) {
        self.inner.write().matched_peer = None;
    }

    /// Set the connected flag.
    pub(crate) fn set_connected(&self, connected: bool) {
        self.inner.write().connected = connected;
    }

    /// Record a new water-level sample.
    pub(crate) fn record_level(&self, level: u8) {
        self.inner.write().latest_level = level;
    }

    /// Take a consistent copy of the record.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.read();
        SessionSnapshot {
            matched_peer: state.matched_peer,
            connected: state.connected,
            latest_level: state.latest_level,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
