use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::debug;

use crate::{StoreError, UserId, UserRecord, UserStore};

/// SQLite-based store implementation.
#[derive(Debug, Clone)]
pub struct SqliteUserStore {
  pool: SqlitePool,
}

impl SqliteUserStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Open a pool for `url` (e.g. `sqlite://rekey.db?mode=rwc`).
  pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
    let pool = SqlitePoolOptions::new()
      .max_connections(max_connections)
      .connect(url)
      .await?;
    Ok(Self::new(pool))
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    Ok(())
  }

  /// Current API key digest of a user, if one was ever issued.
  pub async fn credential_digest(&self, user_id: &UserId) -> Result<Option<String>, StoreError> {
    let digest: Option<Option<String>> = sqlx::query_scalar(
      r#"
      SELECT api_key FROM users
      WHERE id = ?
      "#,
    )
    .bind(user_id)
    .fetch_optional(&self.pool)
    .await?;

    match digest {
      Some(digest) => Ok(digest),
      None => Err(StoreError::NotFound(format!("user {}", user_id))),
    }
  }

  pub fn pool(&self) -> &SqlitePool {
    &self.pool
  }
}

#[async_trait]
impl UserStore for SqliteUserStore {
  async fn find_unexpired(
    &self,
    email: &str,
    now: DateTime<Utc>,
  ) -> Result<Option<UserRecord>, StoreError> {
    // julianday() normalizes timezone offsets and fractional seconds.
    let record = sqlx::query_as(
      r#"
      SELECT id, reset_token FROM users
      WHERE email = ?
        AND reset_token IS NOT NULL
        AND julianday(reset_expires) > julianday(?)
      LIMIT 1
      "#,
    )
    .bind(email)
    .bind(now)
    .fetch_optional(&self.pool)
    .await?;

    Ok(record)
  }

  async fn update_credential_digest(
    &self,
    user_id: &UserId,
    digest: &str,
  ) -> Result<(), StoreError> {
    let result = sqlx::query(
      r#"
      UPDATE users SET api_key = ?
      WHERE id = ?
      "#,
    )
    .bind(digest)
    .bind(user_id)
    .execute(&self.pool)
    .await?;

    if result.rows_affected() == 0 {
      return Err(StoreError::NotFound(format!("user {}", user_id)));
    }

    debug!(user_id = %user_id, "credential digest updated");
    Ok(())
  }
}
