// src/tasks/auto_post.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::AutoPostTiming;
use crate::context::BotContext;
use crate::services::EmotePoster;
use crate::status::ChannelStatusStore;

/// How long after connecting the first auto-post tick runs.
pub const AUTO_POST_START_DELAY: Duration = Duration::from_millis(500);

/// Added to every re-arm so an overdue post never yields a zero wait.
const TICK_EPSILON: Duration = Duration::from_millis(10);

/// Spawns the auto-post loop for `channel`, first waiting `start_delay`.
/// Returns `None` when auto posting is disabled.
pub fn spawn_auto_post_task(
    ctx: &BotContext,
    channel: String,
    start_delay: Duration,
    cancel: CancellationToken,
) -> Option<JoinHandle<()>> {
    if !ctx.config.bot.auto_post {
        return None;
    }

    let channels = ctx.channels.clone();
    let poster = ctx.poster.clone();
    let timing = ctx.config.timing();

    Some(tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = sleep(start_delay) => {}
        }
        run_auto_post_loop(channel, channels, poster, timing, cancel).await;
    }))
}

pub async fn run_auto_post_loop(
    channel: String,
    channels: Arc<ChannelStatusStore>,
    poster: Arc<EmotePoster>,
    timing: AutoPostTiming,
    cancel: CancellationToken,
) {
    debug!("Auto post loop started for {}", channel);
    loop {
        let wait = auto_post_tick(&channel, &channels, &poster, &timing).await;
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(wait) => {}
        }
    }
    debug!("Auto post loop for {} stopped", channel);
}

/// One scheduler step: post if live and due, then return how long to wait
/// before the next step.
pub async fn auto_post_tick(
    channel: &str,
    channels: &ChannelStatusStore,
    poster: &EmotePoster,
    timing: &AutoPostTiming,
) -> Duration {
    let due = channels.next_post(channel, timing, &mut rand::rng());
    let live = channels.is_live(channel);

    if live && Instant::now() >= due {
        if let Err(e) = poster.post(channel, None).await {
            warn!("Auto post to {} failed: {}", channel, e);
        }
    }

    let next = channels.next_post(channel, timing, &mut rand::rng());
    let wait = next.saturating_duration_since(Instant::now()) + TICK_EPSILON;

    if live {
        info!("Auto post scheduled for {} in {}ms", channel, wait.as_millis());
    }
    wait
}
