//! Error type for `tenure-store-sqlite`.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A registry-level outcome decided inside a transaction, such as a lost
  /// version race or a stale transfer status.
  #[error(transparent)]
  Core(#[from] tenure_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown enum value in column: {0}")]
  Enum(#[from] strum::ParseError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The message of a failed SQLite constraint (CHECK, UNIQUE, FOREIGN KEY or a
/// `RAISE(ABORT)` trigger), if that is what `e` is.
fn constraint_message(e: &rusqlite::Error) -> Option<String> {
  match e {
    rusqlite::Error::SqliteFailure(failure, message)
      if failure.code == ErrorCode::ConstraintViolation =>
    {
      Some(message.clone().unwrap_or_else(|| failure.to_string()))
    }
    _ => None,
  }
}

impl From<Error> for tenure_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(inner) => inner,
      Error::Json(inner) => Self::Serialization(inner),
      Error::Sqlite(ref inner) => match constraint_message(inner) {
        Some(message) => Self::Constraint(message),
        None => Self::Storage(Box::new(e)),
      },
      Error::Database(tokio_rusqlite::Error::Rusqlite(ref inner)) => {
        match constraint_message(inner) {
          Some(message) => Self::Constraint(message),
          None => Self::Storage(Box::new(e)),
        }
      }
      other => Self::Storage(Box::new(other)),
    }
  }
}
