//! Rekey Store
//!
//! This crate provides the storage trait and implementations for the user
//! records touched by a credential rotation. Data is persisted to SQLite.
//!
//! The [`UserStore`] trait defines two operations:
//! - Finding a user by email whose reset token has not yet expired
//! - Replacing a user's API key digest

mod sqlite;
mod types;

pub use sqlite::SqliteUserStore;
pub use types::{UserId, UserRecord};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// The requested record was not found.
  #[error("not found: {0}")]
  NotFound(String),

  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  /// Applying migrations failed.
  #[error("migration error: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Storage trait for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
  /// Find the user with this email whose reset token expires after `now`.
  async fn find_unexpired(
    &self,
    email: &str,
    now: DateTime<Utc>,
  ) -> Result<Option<UserRecord>, StoreError>;

  /// Replace the user's API key digest in a single atomic update.
  ///
  /// Returns [`StoreError::NotFound`] if no row matches `user_id`.
  async fn update_credential_digest(&self, user_id: &UserId, digest: &str)
  -> Result<(), StoreError>;
}
