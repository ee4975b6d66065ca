use reelroute_core::TitleKind;
use reelroute_metadata::{EpisodeInfo, MetadataClient, MetadataError, TitleDetails};

/// Stand-in when no catalog API key is configured. Every lookup fails, so
/// resolution falls back to embeds keyed by the native id.
pub struct OfflineMetadata;

#[async_trait::async_trait]
impl MetadataClient for OfflineMetadata {
    fn name(&self) -> &str {
        "offline"
    }

    async fn get_details(
        &self,
        _kind: TitleKind,
        _native_id: &str,
    ) -> Result<TitleDetails, MetadataError> {
        Err(unconfigured())
    }

    async fn get_external_id(
        &self,
        _kind: TitleKind,
        _native_id: &str,
    ) -> Result<Option<String>, MetadataError> {
        Err(unconfigured())
    }

    async fn get_season_episodes(
        &self,
        _native_id: &str,
        _season: u32,
    ) -> Result<Vec<EpisodeInfo>, MetadataError> {
        Err(unconfigured())
    }
}

fn unconfigured() -> MetadataError {
    MetadataError::Provider("no metadata API key configured".into())
}
