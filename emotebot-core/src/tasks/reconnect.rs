// src/tasks/reconnect.rs

use std::sync::Arc;
use std::time::Duration;

use emotebot_common::traits::ChatTransport;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::status::ServerStatusStore;
use crate::Error;

pub const MAX_RECONNECT_TRIES: u32 = 10;

/// Delay grows by this much with every attempt.
pub const RECONNECT_STEP: Duration = Duration::from_millis(500);

/// Keeps retrying the connection with a linearly growing delay until a
/// connection succeeds or `cancel` fires.
///
/// Running out of attempts is fatal: the caller is expected to shut the bot
/// down when this returns [`Error::ReconnectExhausted`].
pub async fn run_reconnect_loop(
    transport: Arc<dyn ChatTransport>,
    server: Arc<ServerStatusStore>,
    cancel: CancellationToken,
) -> Result<(), Error> {
    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let retry = server.next_reconnect_try();
        if retry > MAX_RECONNECT_TRIES {
            error!("Tried to reconnect {} times, giving up", MAX_RECONNECT_TRIES);
            return Err(Error::ReconnectExhausted(MAX_RECONNECT_TRIES));
        }

        info!("Trying to reconnect #{}...", retry);
        if let Err(e) = transport.connect().await {
            warn!("Reconnect attempt #{} failed: {}", retry, e);
        }

        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = sleep(RECONNECT_STEP * retry) => {}
        }

        if server.is_connected() {
            return Ok(());
        }
    }
}
