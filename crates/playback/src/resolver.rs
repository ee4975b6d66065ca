//! Turns a (content, candidate) pair into a playable target.
//!
//! Manifest lookup is attempted first and is never fatal; the embed URL is
//! always built. Every network step runs under a timeout.

use std::sync::Arc;
use std::time::Duration;

use reelroute_core::ContentRef;
use reelroute_metadata::MetadataClient;
use reelroute_sources::{EmbedError, ManifestError, ManifestResolver, SourceCandidate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::manifest::{parse_variants, ManifestLoader, QualityVariant};
use crate::PlaybackConfig;

/// What the player surface should load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackTarget {
    pub provider: String,
    pub host: String,
    pub candidate_index: usize,
    pub embed_url: Url,
    pub manifest_url: Option<Url>,
    /// Highest bandwidth first; empty for embed-only targets.
    pub quality_variants: Vec<QualityVariant>,
}

impl PlaybackTarget {
    /// Direct manifest when available, else the embed page.
    pub fn playable_url(&self) -> &Url {
        self.manifest_url.as_ref().unwrap_or(&self.embed_url)
    }

    pub fn variant(&self, name: &str) -> Option<&QualityVariant> {
        self.quality_variants.iter().find(|v| v.name == name)
    }
}

/// A resolved target plus any external id fetched along the way.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub target: PlaybackTarget,
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("{provider} needs an external id and none could be resolved")]
    ExternalIdUnavailable { provider: String },
    #[error("embed url: {0}")]
    Embed(EmbedError),
}

pub struct StreamResolver {
    metadata: Arc<dyn MetadataClient>,
    manifests: Arc<dyn ManifestLoader>,
    metadata_timeout: Duration,
    manifest_timeout: Duration,
}

impl StreamResolver {
    pub fn new(
        metadata: Arc<dyn MetadataClient>,
        manifests: Arc<dyn ManifestLoader>,
        config: &PlaybackConfig,
    ) -> Self {
        Self {
            metadata,
            manifests,
            metadata_timeout: config.metadata_timeout,
            manifest_timeout: config.manifest_timeout,
        }
    }

    /// Full resolution: external id lookup when needed, then [`Self::resolve_target`].
    pub async fn resolve(
        &self,
        content: &ContentRef,
        candidate: &SourceCandidate,
    ) -> Result<Resolution, ResolutionError> {
        let mut content = content.clone();
        let mut fetched_external_id = None;

        if content.external_id().is_none() && candidate.provider.needs_external_id() {
            if let Some(id) = self.lookup_external_id(&content).await {
                content.set_external_id(id.clone());
                fetched_external_id = Some(id);
            }
        }

        Ok(Resolution {
            target: self.resolve_target(&content, candidate).await?,
            external_id: fetched_external_id,
        })
    }

    /// Resolve with the ids `content` already carries. Never consults metadata.
    pub async fn resolve_target(
        &self,
        content: &ContentRef,
        candidate: &SourceCandidate,
    ) -> Result<PlaybackTarget, ResolutionError> {
        let provider = &candidate.provider;
        let (manifest_url, quality_variants) = match provider.manifest() {
            Some(resolver) if resolver.requires_external_id() && content.external_id().is_none() => {
                debug!(provider = provider.name(), "no external id, embed only");
                (None, Vec::new())
            }
            Some(resolver) => self.resolve_manifest(&**resolver, content).await,
            None => (None, Vec::new()),
        };

        let embed_url = candidate.embed_url(content).map_err(|e| match e {
            EmbedError::MissingExternalId(_) => ResolutionError::ExternalIdUnavailable {
                provider: provider.name().to_string(),
            },
            other => ResolutionError::Embed(other),
        })?;

        Ok(PlaybackTarget {
            provider: provider.name().to_string(),
            host: candidate.host.clone(),
            candidate_index: candidate.index,
            embed_url,
            manifest_url,
            quality_variants,
        })
    }

    /// Metadata failures are logged and read as "no id".
    pub async fn lookup_external_id(&self, content: &ContentRef) -> Option<String> {
        let lookup = self
            .metadata
            .get_external_id(content.title_kind(), content.native_id());
        match tokio::time::timeout(self.metadata_timeout, lookup).await {
            Ok(Ok(id)) => {
                if id.is_none() {
                    debug!(content = %content, "catalog has no external id");
                }
                id
            }
            Ok(Err(e)) => {
                warn!(content = %content, error = %e, "metadata unavailable");
                None
            }
            Err(_) => {
                warn!(content = %content, "metadata lookup timed out");
                None
            }
        }
    }

    /// Manifest URL plus its variants. Variant extraction failures leave the URL usable.
    async fn resolve_manifest(
        &self,
        resolver: &dyn ManifestResolver,
        content: &ContentRef,
    ) -> (Option<Url>, Vec<QualityVariant>) {
        let url = match tokio::time::timeout(self.manifest_timeout, resolver.resolve(content)).await
        {
            Ok(Ok(Some(url))) => url,
            Ok(Ok(None)) => return (None, Vec::new()),
            Ok(Err(e)) => {
                debug!(error = %e, "manifest lookup failed");
                return (None, Vec::new());
            }
            Err(_) => {
                debug!(error = %ManifestError::Timeout, "manifest lookup failed");
                return (None, Vec::new());
            }
        };

        let variants = match self.load_variants(&url).await {
            Ok(variants) => variants,
            Err(e) => {
                debug!(manifest = %url, error = %e, "no quality variants");
                Vec::new()
            }
        };
        (Some(url), variants)
    }

    async fn load_variants(&self, url: &Url) -> Result<Vec<QualityVariant>, ManifestError> {
        let text = tokio::time::timeout(self.manifest_timeout, self.manifests.load(url))
            .await
            .map_err(|_| ManifestError::Timeout)??;
        parse_variants(url, &text)
    }
}
