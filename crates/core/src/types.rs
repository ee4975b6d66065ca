use serde::{Deserialize, Serialize};

use crate::error::ContentRefError;

/// Kind of playable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Movie,
    Episode,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Episode => "episode",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog-level title kind, used by metadata lookups and play routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleKind {
    Movie,
    Tv,
}

impl TitleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "movie" => Some(Self::Movie),
            "tv" => Some(Self::Tv),
            _ => None,
        }
    }
}

impl std::fmt::Display for TitleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Season/episode coordinates. Orders by season, then episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpisodeKey {
    pub season: u32,
    pub episode: u32,
}

impl EpisodeKey {
    pub fn new(season: u32, episode: u32) -> Self {
        Self { season, episode }
    }
}

impl std::fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{}E{}", self.season, self.episode)
    }
}

/// Identifies a playable unit.
///
/// `season`/`episode` are present iff `kind` is [`ContentKind::Episode`]; the
/// constructors are the only way to build one, so the invariant holds for
/// every value in circulation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentRef {
    kind: ContentKind,
    native_id: String,
    external_id: Option<String>,
    season: Option<u32>,
    episode: Option<u32>,
}

impl ContentRef {
    /// Validating constructor.
    pub fn new(
        kind: ContentKind,
        native_id: impl Into<String>,
        season: Option<u32>,
        episode: Option<u32>,
    ) -> Result<Self, ContentRefError> {
        let native_id = native_id.into();
        if native_id.trim().is_empty() {
            return Err(ContentRefError::EmptyNativeId);
        }

        match (kind, season, episode) {
            (ContentKind::Movie, None, None) => {}
            (ContentKind::Movie, _, _) => return Err(ContentRefError::UnexpectedEpisodeCoordinates),
            (ContentKind::Episode, Some(s), Some(e)) => {
                if s == 0 || e == 0 {
                    return Err(ContentRefError::NonPositiveCoordinates {
                        season: s,
                        episode: e,
                    });
                }
            }
            (ContentKind::Episode, _, _) => return Err(ContentRefError::MissingEpisodeCoordinates),
        }

        Ok(Self {
            kind,
            native_id,
            external_id: None,
            season,
            episode,
        })
    }

    pub fn movie(native_id: impl Into<String>) -> Result<Self, ContentRefError> {
        Self::new(ContentKind::Movie, native_id, None, None)
    }

    pub fn episode(
        native_id: impl Into<String>,
        season: u32,
        episode: u32,
    ) -> Result<Self, ContentRefError> {
        Self::new(ContentKind::Episode, native_id, Some(season), Some(episode))
    }

    /// Attach a cross-catalog identifier. Blank values are ignored.
    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.set_external_id(external_id);
        self
    }

    pub fn set_external_id(&mut self, external_id: impl Into<String>) {
        let external_id = external_id.into();
        if !external_id.trim().is_empty() {
            self.external_id = Some(external_id);
        }
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn native_id(&self) -> &str {
        &self.native_id
    }

    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    pub fn season(&self) -> Option<u32> {
        self.season
    }

    pub fn episode_number(&self) -> Option<u32> {
        self.episode
    }

    pub fn episode_key(&self) -> Option<EpisodeKey> {
        match (self.season, self.episode) {
            (Some(s), Some(e)) => Some(EpisodeKey::new(s, e)),
            _ => None,
        }
    }

    pub fn title_kind(&self) -> TitleKind {
        match self.kind {
            ContentKind::Movie => TitleKind::Movie,
            ContentKind::Episode => TitleKind::Tv,
        }
    }

    /// Same title, identity compared without the lazily resolved external id.
    pub fn same_title(&self, other: &ContentRef) -> bool {
        self.kind == other.kind && self.native_id == other.native_id
    }
}

impl std::fmt::Display for ContentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.episode_key() {
            Some(key) => write!(f, "tv/{} {key}", self.native_id),
            None => write!(f, "movie/{}", self.native_id),
        }
    }
}

/// Last provider/host that confirmed a successful load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedPreference {
    pub provider_name: String,
    pub host: String,
}

/// An item on the user's watchlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub native_id: String,
    pub kind: TitleKind,
    pub title: String,
    pub poster_path: Option<String>,
    pub added_at: chrono::DateTime<chrono::Utc>,
}
