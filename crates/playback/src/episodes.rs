//! Next/previous episode lookup for series playback.

use std::sync::Arc;

use reelroute_core::{ContentRef, TitleKind};
use reelroute_metadata::{MetadataClient, MetadataError};
use tracing::debug;

pub struct EpisodeNavigator {
    metadata: Arc<dyn MetadataClient>,
}

impl EpisodeNavigator {
    pub fn new(metadata: Arc<dyn MetadataClient>) -> Self {
        Self { metadata }
    }

    /// Next episode in the season, else the first of the next season.
    /// `None` for movies and for the final episode of a series.
    pub async fn next(&self, current: &ContentRef) -> Result<Option<ContentRef>, MetadataError> {
        let Some(key) = current.episode_key() else {
            return Ok(None);
        };

        let numbers = self.episode_numbers(current, key.season).await?;
        if let Some(&episode) = numbers.iter().find(|&&n| n > key.episode) {
            return Ok(Some(self.sibling(current, key.season, episode)?));
        }

        let seasons = self
            .metadata
            .get_details(TitleKind::Tv, current.native_id())
            .await?
            .seasons;
        match seasons.into_iter().filter(|&s| s > key.season).min() {
            Some(season) => Ok(Some(self.sibling(current, season, 1)?)),
            None => {
                debug!(content = %current, "series complete");
                Ok(None)
            }
        }
    }

    /// Previous episode in the season, else the last episode of the nearest
    /// earlier season that lists any.
    pub async fn previous(
        &self,
        current: &ContentRef,
    ) -> Result<Option<ContentRef>, MetadataError> {
        let Some(key) = current.episode_key() else {
            return Ok(None);
        };

        let numbers = self.episode_numbers(current, key.season).await?;
        if let Some(&episode) = numbers.iter().rev().find(|&&n| n < key.episode) {
            return Ok(Some(self.sibling(current, key.season, episode)?));
        }

        let seasons = self
            .metadata
            .get_details(TitleKind::Tv, current.native_id())
            .await?
            .seasons;
        let mut earlier: Vec<u32> = seasons.into_iter().filter(|&s| s < key.season).collect();
        earlier.sort_unstable_by(|a, b| b.cmp(a));
        for season in earlier {
            if let Some(&episode) = self.episode_numbers(current, season).await?.last() {
                return Ok(Some(self.sibling(current, season, episode)?));
            }
            debug!(content = %current, season, "season lists no episodes, looking further back");
        }
        Ok(None)
    }

    /// Sorted, deduplicated episode numbers of one season.
    async fn episode_numbers(
        &self,
        current: &ContentRef,
        season: u32,
    ) -> Result<Vec<u32>, MetadataError> {
        let mut numbers: Vec<u32> = self
            .metadata
            .get_season_episodes(current.native_id(), season)
            .await?
            .into_iter()
            .map(|e| e.episode_number)
            .filter(|&n| n > 0)
            .collect();
        numbers.sort_unstable();
        numbers.dedup();
        Ok(numbers)
    }

    /// Same title at other coordinates, keeping any resolved external id.
    fn sibling(
        &self,
        current: &ContentRef,
        season: u32,
        episode: u32,
    ) -> Result<ContentRef, MetadataError> {
        let mut next = ContentRef::episode(current.native_id(), season, episode)
            .map_err(|e| MetadataError::Provider(e.to_string()))?;
        if let Some(id) = current.external_id() {
            next.set_external_id(id);
        }
        Ok(next)
    }
}
