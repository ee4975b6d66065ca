pub mod catalog;
pub mod config;
pub mod provider;
pub mod scheme;
pub mod vidsrc_api;

pub use catalog::{SourceCandidate, SourceCatalog};
pub use config::{CatalogConfig, ProviderConfig};
pub use provider::{ManifestResolver, Provider};
pub use scheme::EmbedScheme;

use thiserror::Error;

/// Catalog configuration rejected at load time.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog has no providers")]
    Empty,
    #[error("provider name must not be empty")]
    EmptyName,
    #[error("duplicate provider name: {0}")]
    DuplicateName(String),
    #[error("provider {0} declares no hosts")]
    NoHosts(String),
    #[error("provider {provider}: invalid host {host:?}")]
    InvalidHost { provider: String, host: String },
    #[error("provider {provider}: invalid manifest api {url:?}")]
    InvalidManifestApi { provider: String, url: String },
    #[error("parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("read catalog: {0}")]
    Io(#[from] std::io::Error),
}

/// Embed URL could not be built for a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmbedError {
    #[error("{0} embeds require an external id")]
    MissingExternalId(EmbedScheme),
    #[error("invalid embed url for host {0}")]
    InvalidUrl(String),
}

/// Manifest lookup or download failure. Never fatal to playback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("network error: {0}")]
    Network(String),
    #[error("manifest api error: {0}")]
    Api(String),
    #[error("manifest step timed out")]
    Timeout,
    #[error("manifest parse error: {0}")]
    Parse(String),
}
