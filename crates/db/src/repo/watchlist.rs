use chrono::{TimeZone, Utc};
use reelroute_core::{TitleKind, WatchlistEntry};
use sqlx::SqlitePool;

use crate::DbError;

/// Add an entry. Returns `false` if `(native_id, kind)` was already listed.
pub async fn add(pool: &SqlitePool, entry: &WatchlistEntry) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO watchlist (native_id, kind, title, poster_path, added_ts) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&entry.native_id)
    .bind(entry.kind.as_str())
    .bind(&entry.title)
    .bind(&entry.poster_path)
    .bind(entry.added_at.timestamp_millis())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn remove(
    pool: &SqlitePool,
    native_id: &str,
    kind: TitleKind,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM watchlist WHERE native_id = ? AND kind = ?")
        .bind(native_id)
        .bind(kind.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn contains(
    pool: &SqlitePool,
    native_id: &str,
    kind: TitleKind,
) -> Result<bool, sqlx::Error> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT native_id FROM watchlist WHERE native_id = ? AND kind = ?")
            .bind(native_id)
            .bind(kind.as_str())
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

/// List the watchlist, most recently added first.
pub async fn list(pool: &SqlitePool) -> Result<Vec<WatchlistEntry>, DbError> {
    let rows: Vec<(String, String, String, Option<String>, i64)> = sqlx::query_as(
        "SELECT native_id, kind, title, poster_path, added_ts \
         FROM watchlist ORDER BY added_ts DESC, rowid DESC",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(native_id, kind, title, poster_path, added_ts)| {
            let kind = TitleKind::from_str(&kind).ok_or_else(|| DbError::Corrupt {
                table: "watchlist",
                detail: format!("unknown kind {kind}"),
            })?;
            let added_at = Utc
                .timestamp_millis_opt(added_ts)
                .single()
                .ok_or_else(|| DbError::Corrupt {
                    table: "watchlist",
                    detail: format!("bad timestamp {added_ts}"),
                })?;
            Ok(WatchlistEntry {
                native_id,
                kind,
                title,
                poster_path,
                added_at,
            })
        })
        .collect()
}
