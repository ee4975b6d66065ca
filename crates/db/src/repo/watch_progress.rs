use reelroute_core::EpisodeKey;
use sqlx::SqlitePool;

/// Mark an episode as watched. Re-marking refreshes the timestamp.
pub async fn mark_watched(
    pool: &SqlitePool,
    native_id: &str,
    key: EpisodeKey,
) -> Result<(), sqlx::Error> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        "INSERT INTO watch_progress (native_id, season, episode, watched_ts) \
         VALUES (?, ?, ?, ?) \
         ON CONFLICT(native_id, season, episode) DO UPDATE SET \
         watched_ts = excluded.watched_ts",
    )
    .bind(native_id)
    .bind(key.season as i64)
    .bind(key.episode as i64)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// All watched episodes of a series, in season/episode order.
pub async fn watched_episodes(
    pool: &SqlitePool,
    native_id: &str,
) -> Result<Vec<EpisodeKey>, sqlx::Error> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT season, episode FROM watch_progress \
         WHERE native_id = ? ORDER BY season, episode",
    )
    .bind(native_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(s, e)| EpisodeKey::new(s as u32, e as u32))
        .collect())
}

pub async fn is_watched(
    pool: &SqlitePool,
    native_id: &str,
    key: EpisodeKey,
) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT watched_ts FROM watch_progress \
         WHERE native_id = ? AND season = ? AND episode = ?",
    )
    .bind(native_id)
    .bind(key.season as i64)
    .bind(key.episode as i64)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

/// Forget all progress for a series. Returns the number of markers removed.
pub async fn clear(pool: &SqlitePool, native_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM watch_progress WHERE native_id = ?")
        .bind(native_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
