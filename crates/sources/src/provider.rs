use std::sync::Arc;

use reelroute_core::ContentRef;
use url::Url;

use crate::scheme::EmbedScheme;
use crate::{EmbedError, ManifestError};

/// Looks up a direct media manifest for a title, when a provider exposes one.
#[async_trait::async_trait]
pub trait ManifestResolver: Send + Sync {
    /// Whether the lookup is keyed by the external (IMDb) id.
    fn requires_external_id(&self) -> bool;

    /// `Ok(None)` means the provider has no manifest for this title.
    async fn resolve(&self, content: &ContentRef) -> Result<Option<Url>, ManifestError>;
}

/// A streaming source definition: one embed scheme served from ordered host mirrors.
#[derive(Clone)]
pub struct Provider {
    name: String,
    scheme: EmbedScheme,
    hosts: Vec<String>,
    manifest: Option<Arc<dyn ManifestResolver>>,
}

impl Provider {
    /// Unvalidated; `SourceCatalog::new` checks names and hosts.
    pub fn new(name: impl Into<String>, scheme: EmbedScheme, hosts: Vec<String>) -> Self {
        Self {
            name: name.into(),
            scheme,
            hosts,
            manifest: None,
        }
    }

    pub fn with_manifest(mut self, resolver: Arc<dyn ManifestResolver>) -> Self {
        self.manifest = Some(resolver);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scheme(&self) -> EmbedScheme {
        self.scheme
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn manifest(&self) -> Option<&Arc<dyn ManifestResolver>> {
        self.manifest.as_ref()
    }

    /// Whether any step of resolving this provider needs the external id.
    pub fn needs_external_id(&self) -> bool {
        self.scheme.requires_external_id()
            || self
                .manifest
                .as_ref()
                .is_some_and(|m| m.requires_external_id())
    }

    pub fn embed_url(&self, content: &ContentRef, host: &str) -> Result<Url, EmbedError> {
        self.scheme.embed_url(content, host)
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("scheme", &self.scheme)
            .field("hosts", &self.hosts)
            .field("manifest", &self.manifest.is_some())
            .finish()
    }
}
