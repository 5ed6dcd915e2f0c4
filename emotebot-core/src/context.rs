// File: src/context.rs

use std::sync::Arc;

use emotebot_common::traits::{ChatTransport, StreamStatusApi};
use tokio::time::Instant;

use crate::config::BotConfig;
use crate::services::EmotePoster;
use crate::status::{ChannelStatusStore, ServerStatusStore};

/// Everything the handlers and background loops share, built once at startup.
pub struct BotContext {
    pub config: Arc<BotConfig>,
    pub transport: Arc<dyn ChatTransport>,
    pub status_api: Arc<dyn StreamStatusApi>,
    pub channels: Arc<ChannelStatusStore>,
    pub server: Arc<ServerStatusStore>,
    pub poster: Arc<EmotePoster>,
}

impl BotContext {
    pub fn new(
        config: BotConfig,
        transport: Arc<dyn ChatTransport>,
        status_api: Arc<dyn StreamStatusApi>,
    ) -> Self {
        let channels = Arc::new(ChannelStatusStore::new(
            &config.connection.channels,
            Instant::now(),
        ));
        let poster = Arc::new(EmotePoster::new(
            transport.clone(),
            channels.clone(),
            config.bot.emote.clone(),
        ));

        Self {
            config: Arc::new(config),
            transport,
            status_api,
            channels,
            server: Arc::new(ServerStatusStore::new()),
            poster,
        }
    }
}
