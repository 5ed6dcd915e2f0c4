// File: emotebot-core/src/test_utils/helpers.rs

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use emotebot_common::models::ChatEvent;
use emotebot_common::traits::{ChatTransport, StreamStatusApi};

use crate::config::BotConfig;
use crate::Error;

/// A config for tests: one channel (`#somechannel`), every feature on, and
/// short timings (10s base, 4s spread).
pub fn test_config() -> Result<BotConfig, Error> {
    BotConfig::from_toml_str(
        r##"
        [identity]
        username = "emotebot"
        password = "oauth:testtoken"

        [connection]
        channels = ["#somechannel"]

        [bot]
        emote = "PogChamp"
        auto_post = true
        reply_mentions = true
        greet_subs = true
        auto_post_delay_ms = 10000
        auto_post_rng_delay_ms = 4000

        [bot.tier_prefixes]
        Prime = "prime hype"
        1000 = "tier one hype"
        "##,
    )
}

/// In-memory transport that records what the bot says.
///
/// With [`RecordingTransport::with_events`] a successful `connect` also emits
/// `Connected`, the way a real server welcome would.
#[derive(Default)]
pub struct RecordingTransport {
    said: Mutex<Vec<(String, String)>>,
    connects: AtomicU32,
    fail_connect: AtomicBool,
    fail_say: AtomicBool,
    events: Mutex<Option<mpsc::UnboundedSender<ChatEvent>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: mpsc::UnboundedSender<ChatEvent>) -> Self {
        let transport = Self::default();
        *transport.events.lock() = Some(events);
        transport
    }

    pub fn said(&self) -> Vec<(String, String)> {
        self.said.lock().clone()
    }

    pub fn connect_count(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_say(&self, fail: bool) {
        self.fail_say.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn connect(&self) -> Result<(), Error> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(Error::Platform("connection refused".into()));
        }
        if let Some(tx) = self.events.lock().as_ref() {
            let _ = tx.send(ChatEvent::Connected {
                address: "irc.test".to_string(),
                port: 6697,
            });
        }
        Ok(())
    }

    async fn say(&self, channel: &str, text: &str) -> Result<(), Error> {
        if self.fail_say.load(Ordering::SeqCst) {
            return Err(Error::NotConnected);
        }
        self.said.lock().push((channel.to_string(), text.to_string()));
        Ok(())
    }
}

/// Answers status queries from a script. The last body repeats once the
/// script runs out.
pub struct ScriptedStatusApi {
    bodies: Mutex<VecDeque<String>>,
    calls: AtomicU32,
}

impl ScriptedStatusApi {
    pub fn new<I, S>(bodies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            bodies: Mutex::new(bodies.into_iter().map(Into::into).collect()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamStatusApi for ScriptedStatusApi {
    async fn fetch_stream_status(&self, _channel: &str) -> Result<String, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut bodies = self.bodies.lock();
        let body = if bodies.len() > 1 {
            bodies.pop_front()
        } else {
            bodies.front().cloned()
        };
        body.ok_or_else(|| Error::Platform("no scripted response".into()))
    }
}

pub const LIVE_BODY: &str = r#"{"data":[{"id":"1","user_login":"somechannel","type":"live"}]}"#;
pub const OFFLINE_BODY: &str = r#"{"data":[]}"#;
