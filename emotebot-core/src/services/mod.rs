pub mod emote_poster;
pub mod event_handlers;

pub use emote_poster::EmotePoster;
pub use event_handlers::EventHandler;
