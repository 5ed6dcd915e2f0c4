// File: src/platforms/twitch_helix/mod.rs

pub mod streams;

pub use streams::{parse_live_status, TwitchHelixStatusApi, HELIX_STREAMS_URL};
