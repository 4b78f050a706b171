//! Session connection state

use std::fmt;

/// Connection state of an interactive session
///
/// The variants are ordered so that `state >= SessionState::Connected`
/// reads as "bootstrap has completed".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum SessionState {
    /// No worker threads are running
    #[default]
    Disconnected = 0,
    /// Discovering hosts, opening the socket or bootstrapping
    Connecting = 1,
    /// Cache bootstrapped, participants cannot interact yet
    Connected = 2,
    /// Participants can give input
    Ready = 3,
}

impl SessionState {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(SessionState::Disconnected),
            1 => Some(SessionState::Connecting),
            2 => Some(SessionState::Connected),
            3 => Some(SessionState::Ready),
            _ => None,
        }
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// True once the initial time/scene/group sync has finished
    #[inline]
    pub fn is_connected(self) -> bool {
        self >= SessionState::Connected
    }

    pub fn name(self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Ready => "ready",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
