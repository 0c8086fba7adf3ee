// Migration Runner

use crate::error::map_sqlx_error;
use chunkwise_core::error::Result;
use sqlx::SqlitePool;
use tracing::info;

const MIGRATIONS: &[(i64, &str, &str)] = &[
    (
        1,
        "Queue checkpoints",
        include_str!("../migrations/001_checkpoints.sql"),
    ),
    (
        2,
        "Progress and completion markers",
        include_str!("../migrations/002_job_progress.sql"),
    ),
];

/// Bring the schema up to date. Safe to run on every start.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let table_exists: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
    )
    .fetch_one(pool)
    .await
    .map_err(map_sqlx_error)?;

    let current_version: i64 = if table_exists > 0 {
        sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
            .fetch_one(pool)
            .await
            .map_err(map_sqlx_error)?
    } else {
        0
    };

    info!(current_version, "Checking database schema");

    for (version, name, sql) in MIGRATIONS {
        if current_version < *version {
            info!(version, name, "Applying migration");
            apply_migration(pool, sql).await?;
        }
    }

    Ok(())
}

/// Apply one migration file atomically
async fn apply_migration(pool: &SqlitePool, sql: &str) -> Result<()> {
    let mut tx = pool.begin().await.map_err(map_sqlx_error)?;

    // Statements are split on ';', so migration comments must not contain one
    for statement in sql.split(';') {
        let clean_statement = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let clean_statement = clean_statement.trim();

        if !clean_statement.is_empty() {
            sqlx::query(clean_statement)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }
    }

    tx.commit().await.map_err(map_sqlx_error)?;
    Ok(())
}
