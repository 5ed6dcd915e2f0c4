// File: src/config.rs

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::Error;

pub const DEFAULT_HOST: &str = "irc.chat.twitch.tv";
pub const DEFAULT_PORT: u16 = 6697;

/// Top-level bot configuration, read from a TOML file.
///
/// ```toml
/// [identity]
/// username = "emotebot"
/// password = "oauth:abcdef"
///
/// [connection]
/// channels = ["#somechannel"]
///
/// [bot]
/// emote = "PogChamp"
/// auto_post = true
/// auto_post_delay_ms = 900000
/// auto_post_rng_delay_ms = 300000
///
/// [bot.tier_prefixes]
/// 1000 = "Thanks for the sub!"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub identity: IdentityConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    pub bot: BotOptions,
}

#[derive(Clone, Deserialize)]
pub struct IdentityConfig {
    pub username: String,
    /// Chat token, usually of the form `oauth:xxxx`.
    #[serde(default)]
    pub password: String,
    /// Application client id, sent along with stream status queries.
    #[serde(default)]
    pub client_id: Option<String>,
}

// keep the token out of the logs
impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("client_id", &self.client_id)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_secure")]
    pub secure: bool,
    #[serde(default)]
    pub channels: Vec<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            secure: default_secure(),
            channels: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotOptions {
    pub emote: String,
    #[serde(default)]
    pub auto_post: bool,
    #[serde(default)]
    pub reply_mentions: bool,
    #[serde(default)]
    pub greet_subs: bool,
    #[serde(default = "default_auto_post_delay")]
    pub auto_post_delay_ms: u64,
    #[serde(default = "default_auto_post_rng_delay")]
    pub auto_post_rng_delay_ms: u64,
    /// Pause before re-querying after a malformed stream status response.
    /// Zero re-queries immediately.
    #[serde(default)]
    pub live_check_retry_delay_ms: u64,
    /// Extra text for sub greetings, keyed by plan id (`Prime`, `1000`, `2000`, `3000`).
    #[serde(default)]
    pub tier_prefixes: HashMap<String, String>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_secure() -> bool {
    true
}

fn default_auto_post_delay() -> u64 {
    15 * 60 * 1000
}

fn default_auto_post_rng_delay() -> u64 {
    5 * 60 * 1000
}

/// Auto-post timing derived from [`BotOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoPostTiming {
    pub base_delay: Duration,
    pub rng_delay: Duration,
}

impl AutoPostTiming {
    pub fn new(base_delay: Duration, rng_delay: Duration) -> Self {
        Self { base_delay, rng_delay }
    }

    /// Interval between stream status queries.
    pub fn live_check_interval(&self) -> Duration {
        self.base_delay.saturating_sub(self.rng_delay / 2)
    }
}

impl BotConfig {
    /// Reads and validates the config at `path`, then applies
    /// `EMOTEBOT_USERNAME`, `EMOTEBOT_PASSWORD` and `EMOTEBOT_CLIENT_ID`
    /// from the environment.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        debug!("Loading config from {}", path.display());
        let data = std::fs::read_to_string(path)?;

        let mut config: BotConfig = toml::from_str(&data)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.finish()
    }

    /// Parses a config from a TOML string without consulting the environment.
    pub fn from_toml_str(data: &str) -> Result<Self, Error> {
        let config: BotConfig = toml::from_str(data)?;
        config.finish()
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(username) = lookup("EMOTEBOT_USERNAME") {
            self.identity.username = username;
        }
        if let Some(password) = lookup("EMOTEBOT_PASSWORD") {
            self.identity.password = password;
        }
        if let Some(client_id) = lookup("EMOTEBOT_CLIENT_ID") {
            self.identity.client_id = Some(client_id);
        }
    }

    fn finish(mut self) -> Result<Self, Error> {
        self.identity.username = self.identity.username.trim().to_lowercase();
        let mut channels: Vec<String> = Vec::new();
        for channel in self.connection.channels.iter().map(|c| normalize_channel(c)) {
            if channel.len() > 1 && !channels.contains(&channel) {
                channels.push(channel);
            }
        }
        self.connection.channels = channels;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.identity.username.is_empty() {
            return Err(Error::Config("identity.username must not be empty".into()));
        }
        if self.identity.password.trim().is_empty() {
            return Err(Error::Config("identity.password must not be empty".into()));
        }
        if self.connection.channels.is_empty() {
            return Err(Error::Config("connection.channels must list at least one channel".into()));
        }
        if self.bot.emote.trim().is_empty() {
            return Err(Error::Config("bot.emote must not be empty".into()));
        }
        if self.bot.auto_post_delay_ms < self.bot.auto_post_rng_delay_ms / 2 {
            return Err(Error::Config(format!(
                "bot.auto_post_delay_ms ({}) must be at least half of bot.auto_post_rng_delay_ms ({})",
                self.bot.auto_post_delay_ms, self.bot.auto_post_rng_delay_ms
            )));
        }
        Ok(())
    }

    pub fn timing(&self) -> AutoPostTiming {
        AutoPostTiming::new(
            Duration::from_millis(self.bot.auto_post_delay_ms),
            Duration::from_millis(self.bot.auto_post_rng_delay_ms),
        )
    }

    pub fn live_check_retry_delay(&self) -> Duration {
        Duration::from_millis(self.bot.live_check_retry_delay_ms)
    }

    pub fn tier_prefix(&self, plan: &str) -> Option<&str> {
        self.bot.tier_prefixes.get(plan).map(String::as_str)
    }

    /// The chat token without its `oauth:` marker, as used for API bearer auth.
    pub fn bearer_token(&self) -> &str {
        let password = self.identity.password.trim();
        password.strip_prefix("oauth:").unwrap_or(password)
    }
}

/// `Foo` and `#foo` both become `#foo`.
pub fn normalize_channel(channel: &str) -> String {
    let name = channel.trim().trim_start_matches('#').to_lowercase();
    format!("#{}", name)
}
