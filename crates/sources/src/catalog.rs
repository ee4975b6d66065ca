use std::collections::HashSet;
use std::sync::Arc;

use reelroute_core::{ContentRef, PersistedPreference};
use tracing::info;
use url::Url;

use crate::config::CatalogConfig;
use crate::provider::Provider;
use crate::vidsrc_api::VidsrcApiResolver;
use crate::{CatalogError, EmbedError};

/// One (provider, host) pair eligible for a playback attempt.
#[derive(Debug, Clone)]
pub struct SourceCandidate {
    pub index: usize,
    pub provider: Arc<Provider>,
    pub host: String,
}

impl SourceCandidate {
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn embed_url(&self, content: &ContentRef) -> Result<Url, EmbedError> {
        self.provider.embed_url(content, &self.host)
    }

    pub fn preference(&self) -> PersistedPreference {
        PersistedPreference {
            provider_name: self.provider.name().to_string(),
            host: self.host.clone(),
        }
    }

    fn matches(&self, pref: &PersistedPreference) -> bool {
        self.provider.name() == pref.provider_name && self.host == pref.host
    }
}

impl std::fmt::Display for SourceCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.provider.name(), self.host)
    }
}

/// Ordered providers and their flattened candidate sequence.
///
/// Candidates follow provider declaration order, then each provider's host
/// order. The sequence is never empty.
#[derive(Debug, Clone)]
pub struct SourceCatalog {
    providers: Vec<Arc<Provider>>,
    candidates: Vec<SourceCandidate>,
}

impl SourceCatalog {
    /// Validate providers and flatten them into candidates.
    pub fn new(providers: Vec<Provider>) -> Result<Self, CatalogError> {
        if providers.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut names = HashSet::new();
        for provider in &providers {
            if provider.name().trim().is_empty() {
                return Err(CatalogError::EmptyName);
            }
            if !names.insert(provider.name().to_string()) {
                return Err(CatalogError::DuplicateName(provider.name().to_string()));
            }
            if provider.hosts().is_empty() {
                return Err(CatalogError::NoHosts(provider.name().to_string()));
            }
            for host in provider.hosts() {
                if !is_bare_host(host) {
                    return Err(CatalogError::InvalidHost {
                        provider: provider.name().to_string(),
                        host: host.clone(),
                    });
                }
            }
        }

        let providers: Vec<Arc<Provider>> = providers.into_iter().map(Arc::new).collect();
        let candidates = providers
            .iter()
            .flat_map(|p| p.hosts().iter().map(move |h| (p.clone(), h.clone())))
            .enumerate()
            .map(|(index, (provider, host))| SourceCandidate {
                index,
                provider,
                host,
            })
            .collect();

        Ok(Self {
            providers,
            candidates,
        })
    }

    /// Build providers from config, wiring manifest resolvers to `http`.
    pub fn from_config(config: &CatalogConfig, http: &reqwest::Client) -> Result<Self, CatalogError> {
        let mut providers = Vec::with_capacity(config.providers.len());
        for entry in &config.providers {
            let mut provider = Provider::new(&entry.name, entry.scheme, entry.hosts.clone());
            if let Some(api) = &entry.manifest_api {
                let endpoint = Url::parse(api)
                    .ok()
                    .filter(|u| matches!(u.scheme(), "http" | "https"))
                    .ok_or_else(|| CatalogError::InvalidManifestApi {
                        provider: entry.name.clone(),
                        url: api.clone(),
                    })?;
                provider = provider
                    .with_manifest(Arc::new(VidsrcApiResolver::new(http.clone(), endpoint)));
            }
            providers.push(provider);
        }

        let catalog = Self::new(providers)?;
        info!(
            providers = catalog.providers.len(),
            candidates = catalog.candidates.len(),
            "source catalog loaded"
        );
        Ok(catalog)
    }

    pub fn providers(&self) -> &[Arc<Provider>] {
        &self.providers
    }

    pub fn candidates(&self) -> &[SourceCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidate(&self, index: usize) -> Option<&SourceCandidate> {
        self.candidates.get(index)
    }

    /// Position of a persisted (provider, host) pair, if still configured.
    pub fn index_of(&self, pref: &PersistedPreference) -> Option<usize> {
        self.candidates.iter().position(|c| c.matches(pref))
    }

    /// Round-robin successor of `index`.
    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.candidates.len()
    }
}

/// A host must be a plain lowercase host name, optionally with a port.
fn is_bare_host(host: &str) -> bool {
    if host.is_empty() || host.contains(['/', '?', '#', '@']) {
        return false;
    }
    Url::parse(&format!("https://{host}/"))
        .ok()
        .and_then(|u| {
            let rendered = match u.port() {
                Some(port) => format!("{}:{port}", u.host_str()?),
                None => u.host_str()?.to_string(),
            };
            Some(rendered == host)
        })
        .unwrap_or(false)
}
