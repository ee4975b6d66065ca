use std::sync::Arc;

use anyhow::Context;
use reelroute::config::AppConfig;
use reelroute::console::Console;
use reelroute::offline::OfflineMetadata;
use reelroute_core::route::parse_play_route;
use reelroute_metadata::tmdb::TmdbClient;
use reelroute_metadata::MetadataClient;
use reelroute_playback::{
    EpisodeNavigator, HttpManifestLoader, PlaybackSession, SessionDeps, SqliteStore,
    StreamResolver,
};
use reelroute_sources::{CatalogConfig, SourceCatalog};
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;

    // Logs go to stderr; stdout carries session updates
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let initial = std::env::args()
        .nth(1)
        .map(|route| parse_play_route(&route))
        .transpose()
        .context("usage: reelroute [/play/<movie|tv>/<id>[?season=N&episode=M]]")?;

    info!(db_path = %config.db_path, "connecting to database");
    let pool = reelroute_db::connect(&config.db_path)
        .await
        .context("failed to connect to database")?;
    let applied = reelroute_db::migrate::run(&pool)
        .await
        .context("failed to run migrations")?;
    info!(applied, "migrations complete");

    let http = reqwest::Client::builder()
        .user_agent(concat!("reelroute/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build http client")?;

    let catalog_config = match &config.sources_path {
        Some(path) => CatalogConfig::load(path)
            .with_context(|| format!("failed to load source catalog {}", path.display()))?,
        None => CatalogConfig::default(),
    };
    let catalog = Arc::new(
        SourceCatalog::from_config(&catalog_config, &http).context("invalid source catalog")?,
    );

    let metadata: Arc<dyn MetadataClient> = match &config.tmdb_api_key {
        Some(key) => Arc::new(TmdbClient::new(key.clone(), http.clone())),
        None => {
            warn!("REELROUTE_TMDB_API_KEY not set, metadata lookups disabled");
            Arc::new(OfflineMetadata)
        }
    };

    let resolver = Arc::new(StreamResolver::new(
        metadata.clone(),
        Arc::new(HttpManifestLoader::new(http.clone())),
        &config.playback,
    ));
    let store = Arc::new(SqliteStore::new(pool));
    let deps = SessionDeps {
        catalog,
        resolver,
        preferences: store.clone(),
        progress: store,
    };

    let (session, updates) = PlaybackSession::spawn(deps, config.playback.clone());
    let mut console = Console::new(session, EpisodeNavigator::new(metadata));
    if let Some(content) = initial {
        console.open(content)?;
    }

    console
        .run(updates, BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
}
