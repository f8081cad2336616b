//! Connection lifecycle state machine.
//!
//! Pure bookkeeping, no I/O. `ConnectionManager` feeds it events as the
//! socket comes and goes; every transition not listed below is ignored,
//! which is what keeps a second reconnect timer from starting a second
//! connection attempt.
//!
//! ```text
//! Disconnected --Start----------> Connecting
//! Connecting   --HandshakeOk----> Connected
//! Connecting   --HandshakeFailed> Disconnected
//! Connected    --StreamLost-----> Disconnected
//! Disconnected --RetryArmed-----> Reconnecting
//! Reconnecting --RetryElapsed---> Connecting
//! any          --Shutdown-------> Disconnected (terminal)
//! ```

use serde::Serialize;
use std::fmt;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle events fed into the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Start,
    HandshakeOk,
    HandshakeFailed,
    /// Stream error, close frame, end of stream or activity timeout.
    StreamLost,
    RetryArmed,
    RetryElapsed,
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct ConnectionFsm {
    state: ConnectionState,
    shut_down: bool,
}

impl Default for ConnectionFsm {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionFsm {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            shut_down: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Apply an event. Returns the new state when a transition happened,
    /// `None` when the event does not apply in the current state.
    pub fn handle(&mut self, event: ConnectionEvent) -> Option<ConnectionState> {
        use ConnectionEvent as E;
        use ConnectionState as S;

        if self.shut_down {
            return None;
        }

        let next = match (self.state, event) {
            (_, E::Shutdown) => {
                self.shut_down = true;
                S::Disconnected
            }
            (S::Disconnected, E::Start) => S::Connecting,
            (S::Connecting, E::HandshakeOk) => S::Connected,
            (S::Connecting, E::HandshakeFailed) => S::Disconnected,
            (S::Connected, E::StreamLost) => S::Disconnected,
            (S::Disconnected, E::RetryArmed) => S::Reconnecting,
            (S::Reconnecting, E::RetryElapsed) => S::Connecting,
            _ => return None,
        };

        self.state = next;
        Some(next)
    }
}
