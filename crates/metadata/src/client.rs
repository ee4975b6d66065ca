use reelroute_core::TitleKind;

use crate::{EpisodeInfo, MetadataError, TitleDetails};

/// Read-only access to a title catalog.
///
/// Implementations never retry; retry policy belongs to the caller.
#[async_trait::async_trait]
pub trait MetadataClient: Send + Sync {
    fn name(&self) -> &str;

    /// Full details for a movie or series.
    async fn get_details(
        &self,
        kind: TitleKind,
        native_id: &str,
    ) -> Result<TitleDetails, MetadataError>;

    /// Cross-catalog id (IMDb), `None` when the catalog has no mapping.
    async fn get_external_id(
        &self,
        kind: TitleKind,
        native_id: &str,
    ) -> Result<Option<String>, MetadataError>;

    /// Episode list of one season of a series.
    async fn get_season_episodes(
        &self,
        native_id: &str,
        season: u32,
    ) -> Result<Vec<EpisodeInfo>, MetadataError>;
}
