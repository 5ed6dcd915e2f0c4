// src/tasks/live_check.rs

use std::sync::Arc;
use std::time::Duration;

use emotebot_common::models::LiveState;
use emotebot_common::traits::StreamStatusApi;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::context::BotContext;
use crate::platforms::twitch_helix::parse_live_status;
use crate::status::{ChannelStatusStore, LiveTransition};
use crate::Error;

/// What a single stream status response did to the channel record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Unusable response; query again.
    Malformed,
    Unchanged(LiveState),
    Changed(LiveTransition),
}

/// Spawns the live-check loop for `channel`. Returns `None` when auto
/// posting is disabled, since nothing else reads the live flag.
pub fn spawn_live_check_task(
    ctx: &BotContext,
    channel: String,
    cancel: CancellationToken,
) -> Option<JoinHandle<()>> {
    if !ctx.config.bot.auto_post {
        return None;
    }

    let channels = ctx.channels.clone();
    let api = ctx.status_api.clone();
    let interval = ctx.config.timing().live_check_interval();
    let retry_delay = ctx.config.live_check_retry_delay();

    Some(tokio::spawn(run_live_check_loop(
        channel, channels, api, interval, retry_delay, cancel,
    )))
}

pub async fn run_live_check_loop(
    channel: String,
    channels: Arc<ChannelStatusStore>,
    api: Arc<dyn StreamStatusApi>,
    interval: Duration,
    retry_delay: Duration,
    cancel: CancellationToken,
) {
    debug!("Live check loop started for {}", channel);
    loop {
        let response = tokio::select! {
            _ = cancel.cancelled() => break,
            res = api.fetch_stream_status(&channel) => res,
        };

        let wait = match apply_status_response(&channels, &channel, response) {
            PollOutcome::Malformed => {
                if retry_delay.is_zero() {
                    // re-query right away, but let other tasks run first
                    tokio::task::yield_now().await;
                    continue;
                }
                retry_delay
            }
            PollOutcome::Unchanged(_) => interval,
            PollOutcome::Changed(transition) => {
                info!(
                    channel = %transition.channel,
                    from = %transition.from,
                    to = %transition.to,
                    "Channel {} went {}",
                    transition.channel,
                    if transition.went_live() { "LIVE" } else { "OFFLINE" }
                );
                interval
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(wait) => {}
        }
    }
    debug!("Live check loop for {} stopped", channel);
}

/// Interprets one status query result and stores the live flag.
pub fn apply_status_response(
    channels: &ChannelStatusStore,
    channel: &str,
    response: Result<String, Error>,
) -> PollOutcome {
    let body = match response {
        Ok(body) => body,
        Err(e) => {
            debug!("Stream status query for {} failed: {}", channel, e);
            return PollOutcome::Malformed;
        }
    };

    let Some(live) = parse_live_status(&body) else {
        debug!("Malformed stream status for {}, querying again: {}", channel, body);
        return PollOutcome::Malformed;
    };

    match channels.set_live(channel, live) {
        Some(transition) => PollOutcome::Changed(transition),
        None => PollOutcome::Unchanged(LiveState::from(live)),
    }
}
