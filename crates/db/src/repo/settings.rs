use reelroute_core::PersistedPreference;
use sqlx::SqlitePool;

pub const PREFERRED_SOURCE_PROVIDER: &str = "preferred_source_provider";
pub const PREFERRED_SOURCE_HOST: &str = "preferred_source_host";

/// Get a setting value by key.
pub async fn get(pool: &SqlitePool, key: &str) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|(v,)| v))
}

/// Set a setting value (upsert).
pub async fn set(pool: &SqlitePool, key: &str, value: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete a setting.
pub async fn delete(pool: &SqlitePool, key: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM settings WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Read the last source that confirmed a successful load.
///
/// Both keys must be present; a half-written record reads as absent.
pub async fn get_source_preference(
    pool: &SqlitePool,
) -> Result<Option<PersistedPreference>, sqlx::Error> {
    let provider = get(pool, PREFERRED_SOURCE_PROVIDER).await?;
    let host = get(pool, PREFERRED_SOURCE_HOST).await?;
    Ok(match (provider, host) {
        (Some(provider_name), Some(host)) => Some(PersistedPreference {
            provider_name,
            host,
        }),
        _ => None,
    })
}

/// Overwrite the source preference. Last write wins.
pub async fn set_source_preference(
    pool: &SqlitePool,
    pref: &PersistedPreference,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for (key, value) in [
        (PREFERRED_SOURCE_PROVIDER, pref.provider_name.as_str()),
        (PREFERRED_SOURCE_HOST, pref.host.as_str()),
    ] {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}
