// ================================================================
// File: emotebot-common/src/error.rs
// ================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Not connected to the chat server")]
    NotConnected,

    #[error("Parse error: {0}")]
    Parse(String),

    /// The only unrecoverable condition: the reconnect supervisor ran out of attempts.
    #[error("Tried to reconnect {0} times, giving up")]
    ReconnectExhausted(u32),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Parse(s.to_string())
    }
}
