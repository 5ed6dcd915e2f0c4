// File: emotebot-common/src/traits/mod.rs

pub mod transport_traits;

pub use transport_traits::{ChatTransport, StreamStatusApi};
