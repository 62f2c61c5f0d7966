use std::str::FromStr;

use anyhow::Context;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use time::OffsetDateTime;
use tracing::info;

use crate::config::AppConfig;
use crate::users::{password::hash_password, repo};

const SAMPLE_USERS: [(&str, &str, &str); 3] = [
    ("John Doe", "john@example.com", "password123"),
    ("Jane Smith", "jane@example.com", "secret456"),
    ("Bob Johnson", "bob@example.com", "qwerty789"),
];

pub async fn connect(config: &AppConfig) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .context("parse DATABASE_URL")?
        .create_if_missing(true);
    let db = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .context("connect to database")?;
    Ok(db)
}

pub async fn migrate(db: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    Ok(())
}

/// Inserts the demo accounts, skipping any email already present.
pub async fn seed_sample_users(db: &SqlitePool) -> anyhow::Result<usize> {
    let mut added = 0;
    for (name, email, password) in SAMPLE_USERS {
        if repo::exists_by_email(db, email, None).await? {
            info!(%email, "sample user already exists");
            continue;
        }
        let hash = hash_password(password)?;
        let id = repo::insert(db, name, email, &hash, OffsetDateTime::now_utc()).await?;
        info!(user_id = id, %email, "sample user added");
        added += 1;
    }
    Ok(added)
}

/// Single-connection in-memory database with the schema applied.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite");
    migrate(&db).await.expect("migrations apply");
    db
}
