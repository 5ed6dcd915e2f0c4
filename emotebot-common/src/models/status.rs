// File: emotebot-common/src/models/status.rs

use std::fmt;
use tokio::time::Instant;

/// Whether a channel is currently broadcasting, as last reported by the
/// stream status API. Starts out `Unknown` until the first query answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LiveState {
    #[default]
    Unknown,
    Live,
    Offline,
}

impl LiveState {
    pub fn is_live(self) -> bool {
        self == LiveState::Live
    }
}

impl From<bool> for LiveState {
    fn from(live: bool) -> Self {
        if live { LiveState::Live } else { LiveState::Offline }
    }
}

impl fmt::Display for LiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiveState::Unknown => write!(f, "unknown"),
            LiveState::Live => write!(f, "live"),
            LiveState::Offline => write!(f, "offline"),
        }
    }
}

/// Per-channel posting record.
///
/// `next_post` stays `None` until the auto-post scheduler first computes it.
/// Once computed it is never earlier than `last_post`; a post that moves
/// `last_post` past it forces a recompute on the next scheduler tick.
#[derive(Debug, Clone)]
pub struct ChannelStatus {
    pub last_post: Instant,
    pub next_post: Option<Instant>,
    pub live: LiveState,
}

impl ChannelStatus {
    pub fn new(started_at: Instant) -> Self {
        Self {
            last_post: started_at,
            next_post: None,
            live: LiveState::Unknown,
        }
    }
}

/// Address of the chat server we are currently connected to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub address: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Connection record for the single chat server session.
///
/// The endpoint doubles as the connected flag, so an address and port are
/// only ever present while connected.
#[derive(Debug, Clone, Default)]
pub struct ServerStatus {
    pub endpoint: Option<Endpoint>,
    pub reconnect_try: u32,
    pub disconnect_reason: Option<String>,
}

impl ServerStatus {
    pub fn connected(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn address(&self) -> Option<&str> {
        self.endpoint.as_ref().map(|e| e.address.as_str())
    }

    pub fn port(&self) -> Option<u16> {
        self.endpoint.as_ref().map(|e| e.port)
    }
}
