use std::path::PathBuf;
use std::time::Duration;

use reelroute_playback::PlaybackConfig;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a whole number of milliseconds, got {value:?}")]
    InvalidMillis { var: &'static str, value: String },
}

/// Process configuration, read from `REELROUTE_*` environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    /// Without a key, metadata lookups fail and providers keyed by IMDb id are skipped.
    pub tmdb_api_key: Option<String>,
    /// JSON source catalog; the built-in catalog when absent.
    pub sources_path: Option<PathBuf>,
    pub json_logs: bool,
    pub playback: PlaybackConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut playback = PlaybackConfig::default();
        if let Some(d) = millis(&var, "REELROUTE_GRACE_WINDOW_MS")? {
            playback.grace_window = d;
        }
        if let Some(d) = millis(&var, "REELROUTE_ROTATION_DELAY_MS")? {
            playback.rotation_delay = d;
        }
        if let Some(d) = millis(&var, "REELROUTE_METADATA_TIMEOUT_MS")? {
            playback.metadata_timeout = d;
        }
        if let Some(d) = millis(&var, "REELROUTE_MANIFEST_TIMEOUT_MS")? {
            playback.manifest_timeout = d;
        }

        Ok(Self {
            db_path: var("REELROUTE_DB").unwrap_or_else(|| "reelroute.db".to_string()),
            tmdb_api_key: var("REELROUTE_TMDB_API_KEY"),
            sources_path: var("REELROUTE_SOURCES").map(PathBuf::from),
            json_logs: var("REELROUTE_LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
            playback,
        })
    }
}

fn millis(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    let Some(value) = var(key) else {
        return Ok(None);
    };
    value
        .trim()
        .parse::<u64>()
        .map(|ms| Some(Duration::from_millis(ms)))
        .map_err(|_| ConfigError::InvalidMillis { var: key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.db_path, "reelroute.db");
        assert_eq!(config.tmdb_api_key, None);
        assert_eq!(config.sources_path, None);
        assert!(!config.json_logs);
        assert_eq!(config.playback.grace_window, Duration::from_secs(5));
        assert_eq!(config.playback.rotation_delay, Duration::from_millis(500));
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("REELROUTE_DB", "/var/lib/reelroute/db.sqlite"),
            ("REELROUTE_TMDB_API_KEY", "k"),
            ("REELROUTE_SOURCES", "sources.json"),
            ("REELROUTE_GRACE_WINDOW_MS", "8000"),
            ("REELROUTE_MANIFEST_TIMEOUT_MS", " 2500 "),
            ("REELROUTE_LOG_FORMAT", "JSON"),
        ])
        .unwrap();
        assert_eq!(config.db_path, "/var/lib/reelroute/db.sqlite");
        assert_eq!(config.tmdb_api_key.as_deref(), Some("k"));
        assert_eq!(config.sources_path, Some(PathBuf::from("sources.json")));
        assert_eq!(config.playback.grace_window, Duration::from_secs(8));
        assert_eq!(config.playback.manifest_timeout, Duration::from_millis(2500));
        assert!(config.json_logs);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = config(&[("REELROUTE_TMDB_API_KEY", "  "), ("REELROUTE_DB", "")]).unwrap();
        assert_eq!(config.tmdb_api_key, None);
        assert_eq!(config.db_path, "reelroute.db");
    }

    #[test]
    fn bad_duration_rejected() {
        assert_eq!(
            config(&[("REELROUTE_ROTATION_DELAY_MS", "soon")]).unwrap_err(),
            ConfigError::InvalidMillis {
                var: "REELROUTE_ROTATION_DELAY_MS",
                value: "soon".into()
            }
        );
    }
}
