// File: src/bot.rs

use std::sync::Arc;

use emotebot_common::models::ChatEvent;
use emotebot_common::traits::{ChatTransport, StreamStatusApi};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::BotConfig;
use crate::context::BotContext;
use crate::services::EventHandler;
use crate::Error;

/// The bot runtime: connects once, then feeds every [`ChatEvent`] to the
/// [`EventHandler`] until shutdown or a fatal error.
pub struct EmoteBot {
    handler: EventHandler,
    shutdown: CancellationToken,
    fatal_rx: mpsc::UnboundedReceiver<Error>,
}

impl EmoteBot {
    pub fn new(
        config: BotConfig,
        transport: Arc<dyn ChatTransport>,
        status_api: Arc<dyn StreamStatusApi>,
    ) -> Result<Self, Error> {
        let ctx = Arc::new(BotContext::new(config, transport, status_api));
        let shutdown = CancellationToken::new();
        let (fatal_tx, fatal_rx) = mpsc::unbounded_channel();
        let handler = EventHandler::new(ctx, shutdown.clone(), fatal_tx)?;

        Ok(Self {
            handler,
            shutdown,
            fatal_rx,
        })
    }

    pub fn context(&self) -> &Arc<BotContext> {
        self.handler.context()
    }

    /// Cancelling this token stops the runtime and every background loop.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Returns `Ok(())` after a requested shutdown or when the event stream
    /// ends, and `Err` when the first connect fails or reconnecting gave up.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<ChatEvent>) -> Result<(), Error> {
        let ctx = self.handler.context().clone();
        info!(
            "Starting {} bot with config {:?}",
            ctx.config.identity.username, ctx.config.bot
        );

        if let Err(e) = ctx.transport.connect().await {
            error!("Initial connect failed: {}", e);
            self.shutdown.cancel();
            return Err(e);
        }

        let result = loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested, stopping bot.");
                    break Ok(());
                }
                Some(fatal) = self.fatal_rx.recv() => {
                    error!("Fatal: {}", fatal);
                    break Err(fatal);
                }
                maybe_event = events.recv() => match maybe_event {
                    Some(event) => {
                        if let Err(e) = self.handler.handle(event).await {
                            warn!("Failed to handle chat event: {}", e);
                        }
                    }
                    None => {
                        info!("Chat event stream closed, stopping bot.");
                        break Ok(());
                    }
                },
            }
        };

        self.shutdown.cancel();
        result
    }
}
