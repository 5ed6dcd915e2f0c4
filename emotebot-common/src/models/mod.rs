// File: emotebot-common/src/models/mod.rs

pub mod event;
pub mod status;

pub use event::{ChatEvent, MessageKind, SubMethods, UserState};
pub use status::{ChannelStatus, Endpoint, LiveState, ServerStatus};
