use std::fmt;

use sqlx::FromRow;

/// Primary key of a user row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// A user with an outstanding, unexpired reset token.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UserRecord {
  pub id: UserId,
  /// Digest of the reset token that was sent to the user.
  #[sqlx(rename = "reset_token")]
  pub reset_token_digest: String,
}
