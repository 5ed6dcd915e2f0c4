// File: src/platforms/twitch_irc/runtime.rs

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use emotebot_common::models::ChatEvent;
use emotebot_common::traits::ChatTransport;

use super::client::{IrcSettings, TwitchIrcClient};
use crate::Error;

/// [`ChatTransport`] over Twitch IRC.
///
/// Every `connect` replaces the previous socket. Events from all sockets flow
/// into the same channel.
pub struct TwitchIrcTransport {
    settings: IrcSettings,
    events: mpsc::UnboundedSender<ChatEvent>,
    client: Mutex<Option<TwitchIrcClient>>,
}

impl TwitchIrcTransport {
    pub fn new(settings: IrcSettings, events: mpsc::UnboundedSender<ChatEvent>) -> Self {
        Self {
            settings,
            events,
            client: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ChatTransport for TwitchIrcTransport {
    async fn connect(&self) -> Result<(), Error> {
        let mut guard = self.client.lock().await;
        if let Some(old) = guard.take() {
            debug!("(TwitchIrcTransport) dropping previous connection");
            old.shutdown();
        }

        info!(
            "(TwitchIrcTransport) connecting to {}:{} as '{}'",
            self.settings.host, self.settings.port, self.settings.username
        );
        let client = TwitchIrcClient::connect(&self.settings, self.events.clone()).await?;
        *guard = Some(client);
        Ok(())
    }

    async fn say(&self, channel: &str, text: &str) -> Result<(), Error> {
        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or(Error::NotConnected)?;
        client
            .send_privmsg(channel, text)
            .map_err(|_| Error::NotConnected)
    }
}
