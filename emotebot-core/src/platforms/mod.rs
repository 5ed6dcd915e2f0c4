// File: src/platforms/mod.rs

pub mod twitch_helix;
pub mod twitch_irc;

pub use emotebot_common::traits::{ChatTransport, StreamStatusApi};
