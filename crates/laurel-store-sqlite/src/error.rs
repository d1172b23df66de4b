//! Error type for `laurel-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] laurel_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored string (timestamp, date, or enum discriminant) failed to
  /// decode back into its domain type.
  #[error("decode error: {0}")]
  Decode(String),
}

/// Collapse backend detail into the engine-facing taxonomy. A closed
/// connection surfaces as retryable [`laurel_core::Error::Transient`];
/// everything else is a plain storage failure.
impl From<Error> for laurel_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Core(e) => e,
      Error::Database(tokio_rusqlite::Error::ConnectionClosed) => {
        laurel_core::Error::Transient("sqlite connection closed".into())
      }
      Error::Database(e) => laurel_core::Error::Storage(e.to_string()),
      Error::Json(e) => laurel_core::Error::Serialization(e),
      Error::Uuid(e) => laurel_core::Error::Storage(e.to_string()),
      Error::Decode(m) => laurel_core::Error::Storage(m),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
