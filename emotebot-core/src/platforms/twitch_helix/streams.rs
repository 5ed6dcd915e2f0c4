// File: src/platforms/twitch_helix/streams.rs

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::trace;

use emotebot_common::traits::StreamStatusApi;

use crate::config::BotConfig;
use crate::http::HttpClient;
use crate::Error;

pub const HELIX_STREAMS_URL: &str = "https://api.twitch.tv/helix/streams";

/// Queries the Helix `streams` endpoint for one channel at a time.
pub struct TwitchHelixStatusApi {
    http: Arc<dyn HttpClient<Error = Error>>,
    bearer_token: String,
    client_id: Option<String>,
    base_url: String,
}

impl TwitchHelixStatusApi {
    pub fn new(config: &BotConfig, http: Arc<dyn HttpClient<Error = Error>>) -> Self {
        Self {
            http,
            bearer_token: config.bearer_token().to_string(),
            client_id: config.identity.client_id.clone(),
            base_url: HELIX_STREAMS_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request_url(&self, channel: &str) -> String {
        let login = channel.trim().trim_start_matches('#');
        format!("{}?user_login={}", self.base_url, urlencoding::encode(login))
    }
}

#[async_trait]
impl StreamStatusApi for TwitchHelixStatusApi {
    async fn fetch_stream_status(&self, channel: &str) -> Result<String, Error> {
        let url = self.request_url(channel);

        let mut headers = HashMap::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.bearer_token),
        );
        if let Some(client_id) = &self.client_id {
            headers.insert("Client-Id".to_string(), client_id.clone());
        }

        trace!("GET {}", url);
        self.http.get(url, headers).await
    }
}

/// Reads a `streams` response body.
///
/// `None` means the body is unusable: not JSON, not an object, or without a
/// `data` list. Otherwise the channel is live when the first entry's `type`
/// is `live`; an empty list means offline.
pub fn parse_live_status(body: &str) -> Option<bool> {
    let value: Value = serde_json::from_str(body).ok()?;
    let data = value.as_object()?.get("data")?.as_array()?;

    let live = data
        .first()
        .and_then(|stream| stream.get("type"))
        .and_then(Value::as_str)
        .is_some_and(|t| t.eq_ignore_ascii_case("live"));
    Some(live)
}
