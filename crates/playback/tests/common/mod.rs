#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reelroute_core::{ContentRef, TitleKind};
use reelroute_metadata::{EpisodeInfo, MetadataClient, MetadataError, TitleDetails};
use reelroute_playback::{
    ManifestLoader, MemoryStore, PlaybackConfig, PlaybackSession, PlaybackTarget, SessionDeps,
    SessionUpdate, StreamResolver,
};
use reelroute_sources::{EmbedScheme, ManifestError, ManifestResolver, Provider, SourceCatalog};
use tokio::sync::mpsc::UnboundedReceiver;
use url::Url;

/// Metadata catalog with a fixed native id -> IMDb id table.
#[derive(Default)]
pub struct StubMetadata {
    pub external_ids: HashMap<String, String>,
    pub fail: bool,
    pub delay: Option<Duration>,
    pub lookups: AtomicUsize,
}

impl StubMetadata {
    pub fn with_id(native_id: &str, imdb: &str) -> Self {
        Self {
            external_ids: HashMap::from([(native_id.to_string(), imdb.to_string())]),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
impl MetadataClient for StubMetadata {
    fn name(&self) -> &str {
        "stub"
    }

    async fn get_details(
        &self,
        _kind: TitleKind,
        _native_id: &str,
    ) -> Result<TitleDetails, MetadataError> {
        Err(MetadataError::NotFound)
    }

    async fn get_external_id(
        &self,
        _kind: TitleKind,
        native_id: &str,
    ) -> Result<Option<String>, MetadataError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(MetadataError::Network("connection refused".into()));
        }
        Ok(self.external_ids.get(native_id).cloned())
    }

    async fn get_season_episodes(
        &self,
        _native_id: &str,
        _season: u32,
    ) -> Result<Vec<EpisodeInfo>, MetadataError> {
        Ok(Vec::new())
    }
}

/// Manifest API answering with a fixed URL, optionally slow for chosen titles.
pub struct StubManifestApi {
    pub url: Option<Url>,
    pub needs_external_id: bool,
    pub slow_ids: Vec<String>,
    pub delay: Duration,
}

impl StubManifestApi {
    pub fn answering(url: &str) -> Self {
        Self {
            url: Some(Url::parse(url).unwrap()),
            needs_external_id: false,
            slow_ids: Vec::new(),
            delay: Duration::ZERO,
        }
    }
}

#[async_trait::async_trait]
impl ManifestResolver for StubManifestApi {
    fn requires_external_id(&self) -> bool {
        self.needs_external_id
    }

    async fn resolve(&self, content: &ContentRef) -> Result<Option<Url>, ManifestError> {
        if self.slow_ids.iter().any(|id| id == content.native_id()) {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.url.clone())
    }
}

/// Serves manifest text from memory.
#[derive(Default)]
pub struct StubLoader {
    pub bodies: HashMap<String, String>,
}

impl StubLoader {
    pub fn serving(url: &str, body: &str) -> Self {
        Self {
            bodies: HashMap::from([(url.to_string(), body.to_string())]),
        }
    }
}

#[async_trait::async_trait]
impl ManifestLoader for StubLoader {
    async fn load(&self, url: &Url) -> Result<String, ManifestError> {
        self.bodies
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| ManifestError::Network(format!("404 for {url}")))
    }
}

/// `n` embed-only providers `p0..pn`, one host each.
pub fn plain_providers(n: usize) -> Vec<Provider> {
    (0..n)
        .map(|i| {
            Provider::new(
                format!("p{i}"),
                EmbedScheme::Vidsrc,
                vec![format!("p{i}.example")],
            )
        })
        .collect()
}

pub fn resolver(
    metadata: StubMetadata,
    loader: StubLoader,
    config: &PlaybackConfig,
) -> Arc<StreamResolver> {
    Arc::new(StreamResolver::new(
        Arc::new(metadata),
        Arc::new(loader),
        config,
    ))
}

pub fn spawn_session(
    providers: Vec<Provider>,
    store: Arc<MemoryStore>,
    config: PlaybackConfig,
) -> (PlaybackSession, UnboundedReceiver<SessionUpdate>) {
    let deps = SessionDeps {
        catalog: Arc::new(SourceCatalog::new(providers).unwrap()),
        resolver: resolver(StubMetadata::default(), StubLoader::default(), &config),
        preferences: store.clone(),
        progress: store,
    };
    PlaybackSession::spawn(deps, config)
}

/// Receive updates until the next assigned target.
pub async fn next_target(rx: &mut UnboundedReceiver<SessionUpdate>) -> (u64, PlaybackTarget) {
    loop {
        match rx.recv().await.expect("session ended") {
            SessionUpdate::TargetAssigned { token, target } => return (token, target),
            SessionUpdate::Unavailable { message } => panic!("unexpected exhaustion: {message}"),
            _ => {}
        }
    }
}

/// Receive updates until one matches, returning everything seen on the way.
pub async fn until<F>(rx: &mut UnboundedReceiver<SessionUpdate>, mut pred: F) -> Vec<SessionUpdate>
where
    F: FnMut(&SessionUpdate) -> bool,
{
    let mut seen = Vec::new();
    loop {
        let update = rx.recv().await.expect("session ended");
        let done = pred(&update);
        seen.push(update);
        if done {
            return seen;
        }
    }
}
