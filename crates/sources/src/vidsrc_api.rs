//! Manifest lookup through a vidsrc-style JSON API.
//!
//! `GET {endpoint}/{imdb_id}[?s={season}&e={episode}]` answers
//! `{ "status": 200, "sources": [ { "data": { "stream": "<m3u8 url>" } } ] }`.

use reelroute_core::ContentRef;
use tracing::debug;
use url::Url;

use crate::provider::ManifestResolver;
use crate::ManifestError;

pub const DEFAULT_ENDPOINT: &str = "https://api.vercel.app/vidsrc";

pub struct VidsrcApiResolver {
    client: reqwest::Client,
    endpoint: Url,
}

impl VidsrcApiResolver {
    pub fn new(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    fn request_url(&self, imdb_id: &str, content: &ContentRef) -> Result<Url, ManifestError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| ManifestError::Api(format!("endpoint cannot be a base: {}", self.endpoint)))?
            .pop_if_empty()
            .push(imdb_id);
        if let Some(key) = content.episode_key() {
            url.query_pairs_mut()
                .append_pair("s", &key.season.to_string())
                .append_pair("e", &key.episode.to_string());
        }
        Ok(url)
    }
}

#[async_trait::async_trait]
impl ManifestResolver for VidsrcApiResolver {
    fn requires_external_id(&self) -> bool {
        true
    }

    async fn resolve(&self, content: &ContentRef) -> Result<Option<Url>, ManifestError> {
        let Some(imdb_id) = content.external_id() else {
            return Ok(None);
        };

        let url = self.request_url(imdb_id, content)?;
        debug!(url = %url, "manifest api request");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ManifestError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ManifestError::Api(format!("api returned {}", resp.status())));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ManifestError::Api(format!("parse JSON: {e}")))?;

        Ok(stream_url(&body))
    }
}

/// First stream URL of a successful answer; anything else means "no manifest".
fn stream_url(body: &serde_json::Value) -> Option<Url> {
    if body["status"].as_u64() != Some(200) {
        return None;
    }
    body["sources"]
        .as_array()?
        .first()?
        .pointer("/data/stream")?
        .as_str()
        .and_then(|s| Url::parse(s).ok())
}
