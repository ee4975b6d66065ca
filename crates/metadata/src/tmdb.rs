//! TMDB (The Movie Database) client.
//!
//! Uses TMDB API v3: https://developer.themoviedb.org/docs

use reelroute_core::TitleKind;
use tracing::debug;

use crate::client::MetadataClient;
use crate::{EpisodeInfo, MetadataError, TitleDetails};

const BASE_URL: &str = "https://api.themoviedb.org/3";

pub struct TmdbClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl TmdbClient {
    pub fn new(api_key: String, client: reqwest::Client) -> Self {
        Self {
            api_key,
            base_url: BASE_URL.to_string(),
            client,
        }
    }

    /// Point the client at another API root (mirrors, local fixtures).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_json(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, MetadataError> {
        let mut all_params = vec![("api_key", self.api_key.as_str())];
        all_params.extend_from_slice(params);

        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "TMDB request");

        let resp = self
            .client
            .get(&url)
            .query(&all_params)
            .send()
            .await
            .map_err(|e| MetadataError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MetadataError::NotFound);
        }

        if !resp.status().is_success() {
            return Err(MetadataError::Provider(format!(
                "TMDB returned {}",
                resp.status()
            )));
        }

        resp.json()
            .await
            .map_err(|e| MetadataError::Provider(format!("parse JSON: {e}")))
    }
}

#[async_trait::async_trait]
impl MetadataClient for TmdbClient {
    fn name(&self) -> &str {
        "tmdb"
    }

    async fn get_details(
        &self,
        kind: TitleKind,
        native_id: &str,
    ) -> Result<TitleDetails, MetadataError> {
        let data = self.get_json(&format!("/{kind}/{native_id}"), &[]).await?;
        Ok(match kind {
            TitleKind::Movie => parse_movie_details(&data),
            TitleKind::Tv => parse_series_details(&data),
        })
    }

    async fn get_external_id(
        &self,
        kind: TitleKind,
        native_id: &str,
    ) -> Result<Option<String>, MetadataError> {
        let data = self
            .get_json(&format!("/{kind}/{native_id}/external_ids"), &[])
            .await?;
        Ok(parse_imdb_id(&data))
    }

    async fn get_season_episodes(
        &self,
        native_id: &str,
        season: u32,
    ) -> Result<Vec<EpisodeInfo>, MetadataError> {
        let data = self
            .get_json(&format!("/tv/{native_id}/season/{season}"), &[])
            .await?;
        Ok(parse_episodes(&data))
    }
}

fn parse_genres(data: &serde_json::Value) -> Vec<String> {
    data["genres"]
        .as_array()
        .map(|gs| {
            gs.iter()
                .filter_map(|g| g["name"].as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_movie_details(data: &serde_json::Value) -> TitleDetails {
    TitleDetails {
        title: data["title"].as_str().unwrap_or("Unknown").to_string(),
        release_date: data["release_date"].as_str().map(|s| s.to_string()),
        runtime_minutes: data["runtime"].as_u64().map(|r| r as u32),
        poster_path: data["poster_path"].as_str().map(|s| s.to_string()),
        backdrop_path: data["backdrop_path"].as_str().map(|s| s.to_string()),
        vote_average: data["vote_average"].as_f64(),
        genres: parse_genres(data),
        seasons: Vec::new(),
    }
}

fn parse_series_details(data: &serde_json::Value) -> TitleDetails {
    let mut seasons: Vec<u32> = data["seasons"]
        .as_array()
        .map(|ss| {
            ss.iter()
                .filter_map(|s| s["season_number"].as_u64())
                .filter(|n| *n > 0) // season 0 holds specials
                .map(|n| n as u32)
                .collect()
        })
        .unwrap_or_default();
    seasons.sort_unstable();
    seasons.dedup();

    TitleDetails {
        title: data["name"].as_str().unwrap_or("Unknown").to_string(),
        release_date: data["first_air_date"].as_str().map(|s| s.to_string()),
        runtime_minutes: data["episode_run_time"]
            .as_array()
            .and_then(|a| a.first())
            .and_then(|v| v.as_u64())
            .map(|r| r as u32),
        poster_path: data["poster_path"].as_str().map(|s| s.to_string()),
        backdrop_path: data["backdrop_path"].as_str().map(|s| s.to_string()),
        vote_average: data["vote_average"].as_f64(),
        genres: parse_genres(data),
        seasons,
    }
}

fn parse_imdb_id(data: &serde_json::Value) -> Option<String> {
    data["imdb_id"]
        .as_str()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| id.to_string())
}

fn parse_episodes(data: &serde_json::Value) -> Vec<EpisodeInfo> {
    let episodes = data["episodes"].as_array().cloned().unwrap_or_default();

    episodes
        .iter()
        .map(|ep| EpisodeInfo {
            season_number: ep["season_number"].as_u64().unwrap_or(0) as u32,
            episode_number: ep["episode_number"].as_u64().unwrap_or(0) as u32,
            title: ep["name"].as_str().map(|s| s.to_string()),
            overview: ep["overview"].as_str().map(|s| s.to_string()),
            air_date: ep["air_date"].as_str().map(|s| s.to_string()),
            still_path: ep["still_path"].as_str().map(|s| s.to_string()),
        })
        .collect()
}
