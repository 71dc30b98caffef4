//! SPP connection lifecycle.
//!
//! Tracks the single data channel: `Disconnected -> Connecting ->
//! Connected -> Disconnected`. The session's connected flag follows the
//! open and close events; nothing here schedules a retry or re-discovery.

use tracing::{debug, error, info};

use crate::bt::stack::{Command, PeerAddress, StackStatus};
use crate::session::Session;

/// Connection state for the data channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No channel is open.
    #[default]
    Disconnected,
    /// An open request is outstanding.
    Connecting,
    /// The channel is open and carrying data.
    Connected,
}

impl ConnectionState {
    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
        }
    }
}

/// Manages the single SPP channel to the matched peer.
pub struct ConnectionManager {
    state: ConnectionState,
}

impl ConnectionManager {
    /// Create a manager in the disconnected state.
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Request a connection on the selected channel.
    ///
    /// Transitions to `Connecting` and returns the command to issue: an
    /// open as initiator with no security requirement. Ignored unless
    /// currently `Disconnected`.
    pub fn open(&mut self, addr: PeerAddress, channel: u8) -> Option<Command> {
        if self.state != ConnectionState::Disconnected {
            debug!("connection is {}, ignoring open request", self.state);
            return None;
        }

        info!("connecting to {addr} on channel {channel}");
        self.state = ConnectionState::Connecting;
        Some(Command::Connect { addr, channel })
    }

    /// Handle the completion of an open request.
    ///
    /// Success sets the session's connected flag and returns `true`.
    /// Failure is reported, the state returns to `Disconnected`, and no
    /// retry is scheduled.
    pub fn on_opened(&mut self, status: StackStatus, session: &Session) -> bool {
        if status.is_success() {
            info!("successfully connected to remote device");
            self.state = ConnectionState::Connected;
            session.set_connected(true);
            true
        } else {
            error!("connection open failed: {status}");
            self.state = ConnectionState::Disconnected;
            false
        }
    }

    /// Handle a close event.
    ///
    /// Local and remote closes are not distinguished in the state model;
    /// both deterministically clear the session's connected flag. Returning
    /// to scanning afterwards requires an explicit discovery restart.
    pub fn on_closed(&mut self, by_remote: bool, session: &Session) {
        info!("channel closed (by_remote: {by_remote})");
        self.state = ConnectionState::Disconnected;
        session.set_connected(false);
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
