// src/reload/client.rs

//! Browser-side connection state machine.
//!
//! Each page load owns one [`Connection`] per path key. Socket callbacks are
//! modelled as events fed into [`Connection::step`]; every transition is a
//! pure function from `(state, event)` to `(state', effects)`, so the
//! self-healing behaviour is testable without a real socket.
//!
//! Reconnects are unbounded, at a fixed delay, with no growing backoff: at
//! most one reconnect is pending at any time, so there are never two
//! concurrent sockets for the same path key.

use tracing::{debug, warn};

use crate::reload::strip_document_marker;

/// Fixed delay between a close and the next connection attempt.
pub const RECONNECT_DELAY_MS: u64 = 1000;

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
}

/// Socket events as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Opened,
    Message(String),
    Errored,
    Closed,
}

/// Effects the surrounding transport glue must carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Create a fresh socket for this connection's path key.
    OpenSocket,
    /// Apply a structure-preserving merge of the given fragment content
    /// against the live document. The merge must preserve unrelated state
    /// (scroll position, focus, in-progress form input) and merge, not
    /// replace, the head element; the algorithm itself is the consumer's
    /// contract.
    MergeDocument(String),
    /// Force the socket closed (deterministically produces `Closed`).
    CloseSocket,
    /// Arm the single reconnect timer for [`RECONNECT_DELAY_MS`].
    ScheduleReconnect,
}

/// One live-reload connection for a page path.
#[derive(Debug)]
pub struct Connection {
    path_key: String,
    state: ConnectionState,
    reconnect_pending: bool,
}

impl Connection {
    pub fn new(path_key: impl Into<String>) -> Self {
        Self {
            path_key: path_key.into(),
            state: ConnectionState::Disconnected,
            reconnect_pending: false,
        }
    }

    pub fn path_key(&self) -> &str {
        &self.path_key
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// Start the first connection attempt.
    ///
    /// Only meaningful from `Disconnected` with no reconnect pending; any
    /// other state already owns a socket or a timer.
    pub fn connect(&mut self) -> Vec<Effect> {
        if self.state != ConnectionState::Disconnected || self.reconnect_pending {
            return Vec::new();
        }

        self.state = ConnectionState::Connecting;
        vec![Effect::OpenSocket]
    }

    /// The reconnect timer fired; attempt a fresh connection.
    pub fn reconnect_due(&mut self) -> Vec<Effect> {
        if !self.reconnect_pending {
            return Vec::new();
        }

        self.reconnect_pending = false;
        self.state = ConnectionState::Connecting;
        vec![Effect::OpenSocket]
    }

    /// Feed one socket event through the state machine.
    pub fn step(&mut self, event: SocketEvent) -> Vec<Effect> {
        match event {
            SocketEvent::Opened => {
                debug!(path = %self.path_key, "live reload socket connected");
                self.state = ConnectionState::Open;
                Vec::new()
            }

            SocketEvent::Message(payload) => {
                if self.state != ConnectionState::Open {
                    warn!(path = %self.path_key, "message on a non-open connection; dropping");
                    return Vec::new();
                }

                let fragment = strip_document_marker(payload.trim_start_matches('\u{feff}'));
                vec![Effect::MergeDocument(fragment.to_string())]
            }

            SocketEvent::Errored => {
                warn!(path = %self.path_key, "live reload socket failed");
                // Forcing the close produces the `Closed` event, which owns
                // the reconnect scheduling.
                vec![Effect::CloseSocket]
            }

            SocketEvent::Closed => {
                self.state = ConnectionState::Disconnected;

                if self.reconnect_pending {
                    return Vec::new();
                }

                self.reconnect_pending = true;
                vec![Effect::ScheduleReconnect]
            }
        }
    }
}

/// Page-session owner of the one-time setup guard.
///
/// Setup entry points may be invoked multiple times per page load; the
/// subscribe/state-machine setup runs at most once.
#[derive(Debug, Default)]
pub struct PageSession {
    initialized: bool,
}

impl PageSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// First call yields the connection for this page; later calls yield
    /// `None`.
    pub fn initialize(&mut self, path_key: impl Into<String>) -> Option<Connection> {
        if self.initialized {
            return None;
        }

        self.initialized = true;
        Some(Connection::new(path_key))
    }
}
