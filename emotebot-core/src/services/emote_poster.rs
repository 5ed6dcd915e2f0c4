// File: src/services/emote_poster.rs

use std::sync::Arc;

use emotebot_common::traits::ChatTransport;
use tokio::time::Instant;
use tracing::info;

use crate::status::ChannelStatusStore;
use crate::Error;

/// Sends the configured emote, optionally led by a prefix, and records the
/// post time for the channel.
pub struct EmotePoster {
    transport: Arc<dyn ChatTransport>,
    channels: Arc<ChannelStatusStore>,
    emote: String,
}

impl EmotePoster {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        channels: Arc<ChannelStatusStore>,
        emote: String,
    ) -> Self {
        Self { transport, channels, emote }
    }

    pub fn emote(&self) -> &str {
        &self.emote
    }

    /// Send failures are returned as-is; callers log them and carry on.
    pub async fn post(&self, channel: &str, prefix: Option<&str>) -> Result<(), Error> {
        let message = compose_message(&self.emote, prefix);

        self.channels.record_post(channel, Instant::now());
        self.transport.say(channel, &message).await?;

        info!(
            "Emote posted to {} with prefix '{}'",
            channel,
            prefix.unwrap_or_default()
        );
        Ok(())
    }
}

pub fn compose_message(emote: &str, prefix: Option<&str>) -> String {
    match prefix.map(str::trim).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{} {}", prefix, emote),
        None => emote.to_string(),
    }
}
