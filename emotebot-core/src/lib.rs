// src/lib.rs

pub mod bot;
pub mod config;
pub mod context;
pub mod http;
pub mod platforms;
pub mod services;
pub mod status;
pub mod tasks;
pub mod test_utils;

pub use bot::EmoteBot;
pub use config::BotConfig;
pub use context::BotContext;
pub use emotebot_common::error::Error;
pub use http::{DefaultHttpClient, HttpClient};
