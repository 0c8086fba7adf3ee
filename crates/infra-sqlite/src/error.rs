// sqlx::Error -> AppError::Store

use chunkwise_core::error::AppError;

/// Every SQLite failure is a store failure: the engine must never read it as "absent"
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            // SQLite result codes: https://www.sqlite.org/rescode.html
            Some(code) => match code.as_ref() {
                "5" | "517" => AppError::Store(format!(
                    "Database locked (SQLITE_BUSY): {}",
                    db_err.message()
                )),
                "13" => AppError::Store(format!("Database full: {}", db_err.message())),
                "8" => AppError::Store(format!("Database is read-only: {}", db_err.message())),
                other => AppError::Store(format!(
                    "Database error [{}]: {}",
                    other,
                    db_err.message()
                )),
            },
            None => AppError::Store(format!("Database error: {}", db_err.message())),
        },
        sqlx::Error::PoolTimedOut => AppError::Store("Connection pool timed out".to_string()),
        sqlx::Error::PoolClosed => AppError::Store("Connection pool closed".to_string()),
        _ => AppError::Store(err.to_string()),
    }
}
