use sqlx::SqlitePool;
use tracing::{debug, info};

/// Schema files in apply order. Names are recorded once applied and must never change.
const MIGRATIONS: &[(&str, &str)] = &[(
    "001_initial_schema",
    include_str!("../migrations/001_initial_schema.sql"),
)];

/// Apply every pending migration, returning how many ran.
///
/// Each migration and its `_migrations` row commit together, so a failed
/// statement leaves that migration pending for the next start.
pub async fn run(pool: &SqlitePool) -> Result<usize, sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_ts INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    let applied: Vec<(String,)> = sqlx::query_as("SELECT name FROM _migrations")
        .fetch_all(pool)
        .await?;

    let mut count = 0;
    for (name, sql) in MIGRATIONS {
        if applied.iter().any(|(done,)| done == name) {
            debug!(migration = name, "already applied");
            continue;
        }

        let mut tx = pool.begin().await?;
        // Schema files carry no literal semicolons
        for statement in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query("INSERT INTO _migrations (name, applied_ts) VALUES (?, ?)")
            .bind(name)
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(migration = name, "migration applied");
        count += 1;
    }

    Ok(count)
}
