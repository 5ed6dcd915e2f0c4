//! HTTP Client abstraction layer for platform queries
//!
//! The stream status client talks to the platform's REST API through this
//! trait rather than through reqwest directly, so tests can hand it canned
//! response bodies without touching the network.
//!
//! Bodies are returned as text regardless of the HTTP status code; callers
//! decide what a usable response looks like.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use crate::Error;

/// A generic trait for making HTTP requests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn get(&self, url: String, headers: HashMap<String, String>) -> Result<String, Self::Error>;
}

#[derive(Clone)]
pub struct DefaultHttpClient {
    client: reqwest::Client,
}

impl DefaultHttpClient {
    const TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new() -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(Self::TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for DefaultHttpClient {
    type Error = Error;

    async fn get(&self, url: String, headers: HashMap<String, String>) -> Result<String, Self::Error> {
        let mut request = self.client.get(&url);
        for (key, value) in headers {
            request = request.header(&key, value);
        }
        let response = request
            .send()
            .await?
            .text()
            .await?;
        Ok(response)
    }
}
