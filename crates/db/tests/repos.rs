use chrono::{Duration, Utc};
use reelroute_core::{EpisodeKey, PersistedPreference, TitleKind, WatchlistEntry};
use reelroute_db::repo::{settings, watch_progress, watchlist};
use sqlx::SqlitePool;

/// Fresh database in a temp dir. The dir guard must outlive the pool.
async fn test_db() -> (tempfile::TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reelroute.db");
    let pool = reelroute_db::connect(path.to_str().unwrap()).await.unwrap();
    reelroute_db::migrate::run(&pool).await.unwrap();
    (dir, pool)
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let (_dir, pool) = test_db().await;
    assert_eq!(reelroute_db::migrate::run(&pool).await.unwrap(), 0);

    let applied: Vec<(String,)> = sqlx::query_as("SELECT name FROM _migrations")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(applied.len(), 1);
}

#[tokio::test]
async fn source_preference_last_write_wins() {
    let (_dir, pool) = test_db().await;
    assert_eq!(settings::get_source_preference(&pool).await.unwrap(), None);

    let first = PersistedPreference {
        provider_name: "vidsrc_cc".into(),
        host: "vidsrc.cc".into(),
    };
    let second = PersistedPreference {
        provider_name: "embed_su".into(),
        host: "embed.su".into(),
    };
    settings::set_source_preference(&pool, &first).await.unwrap();
    settings::set_source_preference(&pool, &second).await.unwrap();

    assert_eq!(
        settings::get_source_preference(&pool).await.unwrap(),
        Some(second)
    );
}

#[tokio::test]
async fn half_written_preference_reads_as_absent() {
    let (_dir, pool) = test_db().await;
    settings::set(&pool, settings::PREFERRED_SOURCE_HOST, "vidsrc.cc")
        .await
        .unwrap();
    assert_eq!(settings::get_source_preference(&pool).await.unwrap(), None);

    assert!(settings::delete(&pool, settings::PREFERRED_SOURCE_HOST)
        .await
        .unwrap());
    assert!(!settings::delete(&pool, settings::PREFERRED_SOURCE_HOST)
        .await
        .unwrap());
}

#[tokio::test]
async fn watch_progress_marks_are_idempotent_and_ordered() {
    let (_dir, pool) = test_db().await;
    for key in [
        EpisodeKey::new(2, 1),
        EpisodeKey::new(1, 3),
        EpisodeKey::new(1, 3),
    ] {
        watch_progress::mark_watched(&pool, "1396", key).await.unwrap();
    }
    watch_progress::mark_watched(&pool, "60059", EpisodeKey::new(1, 1))
        .await
        .unwrap();

    assert_eq!(
        watch_progress::watched_episodes(&pool, "1396").await.unwrap(),
        vec![EpisodeKey::new(1, 3), EpisodeKey::new(2, 1)]
    );
    assert!(watch_progress::is_watched(&pool, "1396", EpisodeKey::new(2, 1))
        .await
        .unwrap());
    assert!(!watch_progress::is_watched(&pool, "1396", EpisodeKey::new(2, 2))
        .await
        .unwrap());

    assert_eq!(watch_progress::clear(&pool, "1396").await.unwrap(), 2);
    assert!(watch_progress::watched_episodes(&pool, "1396")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn watchlist_lists_newest_first_and_ignores_duplicates() {
    let (_dir, pool) = test_db().await;
    let now = Utc::now();
    let older = WatchlistEntry {
        native_id: "27205".into(),
        kind: TitleKind::Movie,
        title: "Inception".into(),
        poster_path: Some("/poster.jpg".into()),
        added_at: now - Duration::minutes(5),
    };
    let newer = WatchlistEntry {
        native_id: "1396".into(),
        kind: TitleKind::Tv,
        title: "Breaking Bad".into(),
        poster_path: None,
        added_at: now,
    };

    assert!(watchlist::add(&pool, &older).await.unwrap());
    assert!(watchlist::add(&pool, &newer).await.unwrap());
    assert!(!watchlist::add(&pool, &older).await.unwrap());

    let listed = watchlist::list(&pool).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].native_id, "1396");
    assert_eq!(listed[1].title, "Inception");

    // Same id, different kind is a different entry
    assert!(!watchlist::contains(&pool, "27205", TitleKind::Tv).await.unwrap());
    assert!(watchlist::remove(&pool, "27205", TitleKind::Movie).await.unwrap());
    assert!(!watchlist::contains(&pool, "27205", TitleKind::Movie)
        .await
        .unwrap());
}

#[tokio::test]
async fn connect_creates_missing_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/data/reelroute.db");
    let pool = reelroute_db::connect(path.to_str().unwrap()).await.unwrap();
    reelroute_db::migrate::run(&pool).await.unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn connect_fails_when_directory_cannot_be_created() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();
    let path = blocker.join("reelroute.db");
    assert!(reelroute_db::connect(path.to_str().unwrap()).await.is_err());
}
