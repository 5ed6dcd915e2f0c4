pub mod client;
pub mod events;
pub mod message;
pub mod runtime;

pub use client::{IrcSettings, TwitchIrcClient};
pub use events::{to_chat_event, SessionInfo};
pub use message::IrcMessage;
pub use runtime::TwitchIrcTransport;
