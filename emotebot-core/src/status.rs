//! src/status.rs
//!
//! Process-lifetime status records: one [`ChannelStatus`] per configured
//! channel and a single [`ServerStatus`]. Both stores are shared by `Arc`
//! between the event handlers and the background loops.

use dashmap::DashMap;
use parking_lot::Mutex;
use rand::Rng;
use tokio::time::{Duration, Instant};

use emotebot_common::models::{ChannelStatus, Endpoint, LiveState, ServerStatus};

use crate::config::{normalize_channel, AutoPostTiming};

/// A change of a channel's live flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveTransition {
    pub channel: String,
    pub from: LiveState,
    pub to: LiveState,
}

impl LiveTransition {
    pub fn went_live(&self) -> bool {
        self.to.is_live()
    }
}

pub struct ChannelStatusStore {
    channels: DashMap<String, ChannelStatus>,
}

impl ChannelStatusStore {
    /// Creates one record per channel with `last_post` set to `started_at`.
    pub fn new<I, S>(channels: I, started_at: Instant) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let map = DashMap::new();
        for channel in channels {
            map.insert(normalize_channel(channel.as_ref()), ChannelStatus::new(started_at));
        }
        Self { channels: map }
    }

    pub fn channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn get(&self, channel: &str) -> Option<ChannelStatus> {
        self.channels.get(&normalize_channel(channel)).map(|s| s.clone())
    }

    pub fn is_live(&self, channel: &str) -> bool {
        self.channels
            .get(&normalize_channel(channel))
            .is_some_and(|s| s.live.is_live())
    }

    pub fn record_post(&self, channel: &str, at: Instant) {
        self.channels
            .entry(normalize_channel(channel))
            .or_insert_with(|| ChannelStatus::new(at))
            .last_post = at;
    }

    /// Returns the next auto-post time, computing a fresh jittered one when
    /// none exists yet or the last post has moved past it.
    pub fn next_post<R>(&self, channel: &str, timing: &AutoPostTiming, rng: &mut R) -> Instant
    where
        R: Rng + ?Sized,
    {
        let mut status = self
            .channels
            .entry(normalize_channel(channel))
            .or_insert_with(|| ChannelStatus::new(Instant::now()));

        match status.next_post {
            Some(next) if next >= status.last_post => next,
            _ => {
                let next = status.last_post + jittered_delay(timing, rng);
                status.next_post = Some(next);
                next
            }
        }
    }

    /// Stores the live flag, reporting a transition when it changed.
    pub fn set_live(&self, channel: &str, live: bool) -> Option<LiveTransition> {
        let key = normalize_channel(channel);
        let mut status = self
            .channels
            .entry(key.clone())
            .or_insert_with(|| ChannelStatus::new(Instant::now()));

        let to = LiveState::from(live);
        let from = std::mem::replace(&mut status.live, to);
        (from != to).then(|| LiveTransition { channel: key, from, to })
    }
}

/// `base_delay` shifted by a uniform offset in `[-rng_delay / 2, rng_delay / 2)`.
pub fn jittered_delay<R>(timing: &AutoPostTiming, rng: &mut R) -> Duration
where
    R: Rng + ?Sized,
{
    let spread = timing.rng_delay.as_millis() as u64;
    let offset = if spread == 0 { 0 } else { rng.random_range(0..spread) };
    (timing.base_delay + Duration::from_millis(offset)).saturating_sub(timing.rng_delay / 2)
}

#[derive(Default)]
pub struct ServerStatusStore {
    inner: Mutex<ServerStatus>,
}

impl ServerStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ServerStatus {
        self.inner.lock().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().connected()
    }

    pub fn mark_connected(&self, address: &str, port: u16) {
        let mut status = self.inner.lock();
        status.endpoint = Some(Endpoint {
            address: address.to_string(),
            port,
        });
        status.reconnect_try = 0;
    }

    /// Returns whether we were connected before this disconnect.
    pub fn mark_disconnected(&self, reason: &str) -> bool {
        let mut status = self.inner.lock();
        let was_connected = status.connected();
        status.endpoint = None;
        status.disconnect_reason = Some(reason.to_string());
        was_connected
    }

    /// Bumps and returns the reconnect attempt counter.
    pub fn next_reconnect_try(&self) -> u32 {
        let mut status = self.inner.lock();
        status.reconnect_try += 1;
        status.reconnect_try
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn timing(base: u64, spread: u64) -> AutoPostTiming {
        AutoPostTiming::new(Duration::from_millis(base), Duration::from_millis(spread))
    }

    #[test]
    fn jitter_stays_within_half_spread_of_base() {
        let timing = timing(10_000, 4_000);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let delay = jittered_delay(&timing, &mut rng);
            assert!(delay >= Duration::from_millis(8_000), "{:?} too short", delay);
            assert!(delay < Duration::from_millis(12_000), "{:?} too long", delay);
        }
    }

    #[test]
    fn zero_spread_gives_exact_base() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(jittered_delay(&timing(5_000, 0), &mut rng), Duration::from_millis(5_000));
    }

    #[test]
    fn next_post_is_stable_until_a_post_happens() {
        let start = Instant::now();
        let store = ChannelStatusStore::new(["#chan"], start);
        let timing = timing(10_000, 4_000);
        let mut rng = StdRng::seed_from_u64(42);

        let first = store.next_post("#chan", &timing, &mut rng);
        let second = store.next_post("#chan", &timing, &mut rng);
        assert_eq!(first, second);

        let delay = first - start;
        assert!(delay >= Duration::from_millis(8_000) && delay < Duration::from_millis(12_000));

        let posted_at = first + Duration::from_millis(5);
        store.record_post("#chan", posted_at);
        let third = store.next_post("#chan", &timing, &mut rng);
        assert!(third >= posted_at);
        assert_ne!(third, first);
    }

    #[test]
    fn set_live_reports_only_changes() {
        let store = ChannelStatusStore::new(["Chan"], Instant::now());

        let t = store.set_live("#chan", true).expect("unknown -> live");
        assert_eq!(t.from, LiveState::Unknown);
        assert!(t.went_live());
        assert!(store.set_live("#chan", true).is_none());

        let t = store.set_live("#CHAN", false).expect("live -> offline");
        assert_eq!(t.from, LiveState::Live);
        assert_eq!(t.to, LiveState::Offline);
        assert!(!store.is_live("#chan"));
    }

    #[test]
    fn endpoint_tracks_connection_state() {
        let server = ServerStatusStore::new();
        assert!(!server.mark_disconnected("never connected"));

        assert_eq!(server.next_reconnect_try(), 1);
        server.mark_connected("irc.chat.twitch.tv", 6697);
        let status = server.snapshot();
        assert!(status.connected());
        assert_eq!(status.address(), Some("irc.chat.twitch.tv"));
        assert_eq!(status.port(), Some(6697));
        assert_eq!(status.reconnect_try, 0);

        assert!(server.mark_disconnected("Connection closed."));
        let status = server.snapshot();
        assert!(!status.connected());
        assert_eq!(status.address(), None);
        assert_eq!(status.port(), None);
        assert_eq!(status.disconnect_reason.as_deref(), Some("Connection closed."));
    }
}
