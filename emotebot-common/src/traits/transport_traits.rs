// File: emotebot-common/src/traits/transport_traits.rs

use async_trait::async_trait;
use crate::Error;

/// Outbound side of a chat connection. Inbound traffic is delivered
/// separately as [`crate::models::ChatEvent`]s.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Starts a new connection attempt. Success only means the socket is up;
    /// the session is usable once a `Connected` event arrives.
    async fn connect(&self) -> Result<(), Error>;

    /// Fire-and-forget send of a chat line to `channel`.
    async fn say(&self, channel: &str, text: &str) -> Result<(), Error>;
}

/// Streaming platform endpoint reporting whether a channel is broadcasting.
#[async_trait]
pub trait StreamStatusApi: Send + Sync {
    /// Returns the raw response body; interpreting it is up to the caller.
    async fn fetch_stream_status(&self, channel: &str) -> Result<String, Error>;
}
