use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use crate::models::ChatMessage;

pub type DbPool = PgPool;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/fanzone".to_string()),
            max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            min_connections: 2,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

/// Initialize the connection pool and run pending migrations.
pub async fn init_db(config: DbConfig) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    Ok(pool)
}

/// Cheap reachability probe, independent of message reads and writes.
pub async fn ping(pool: &DbPool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}

/// Insert a message, assigning its id and timestamp with the write.
pub async fn insert_message(pool: &DbPool, author: &str, body: &str) -> Result<ChatMessage> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let message = sqlx::query_as::<_, ChatMessage>(
        r#"
        INSERT INTO messages (id, author, body, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, author, body, created_at
        "#,
    )
    .bind(id)
    .bind(author)
    .bind(body)
    .bind(now)
    .fetch_one(pool)
    .await
    .context("Failed to insert message")?;

    Ok(message)
}

/// Fetch the `limit` most recent messages, newest first. `seq` breaks ties
/// between messages committed in the same timestamp tick.
pub async fn recent_messages(pool: &DbPool, limit: i64) -> Result<Vec<ChatMessage>> {
    let messages = sqlx::query_as::<_, ChatMessage>(
        r#"
        SELECT id, author, body, created_at
        FROM messages
        ORDER BY seq DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to fetch recent messages")?;

    Ok(messages)
}
