use std::str::FromStr;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created DATETIME NOT NULL,
    email VARCHAR(255) NOT NULL UNIQUE,
    forename VARCHAR(255),
    surname VARCHAR(255)
)
"#;

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("parse database url {database_url:?}"))?
        .create_if_missing(true);

    // Every connection to an in-memory database gets its own empty database,
    // so the pool must keep exactly one connection alive for the whole process.
    let pool = if is_in_memory(database_url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(10)
    };

    pool.connect_with(options)
        .await
        .context("connect to database")
}

/// Creates the users table and its unique email index if missing.
pub async fn sync(db: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(SCHEMA)
        .execute(db)
        .await
        .context("sync users schema")?;
    tracing::debug!("users schema ready");
    Ok(())
}
