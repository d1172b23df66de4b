//! Error taxonomy for `laurel-core`.
//!
//! Engine operations return these variants directly; storage backends define
//! their own error type and convert into this taxonomy at the trait boundary.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// The operation required an active season and none exists. Fatal to the
  /// operation — awarding XP outside a season would corrupt ranking
  /// semantics, so this is never a silent no-op.
  #[error("no active season")]
  NoActiveSeason,

  #[error("xp type {0} is inactive")]
  InactiveType(Uuid),

  #[error("achievement rule {0} is inactive")]
  InactiveRule(Uuid),

  /// The granter already reached the daily grant-volume limit.
  /// Retryable after the calendar day rolls over.
  #[error(
    "granter {granter_id} reached the daily limit: {granted_today} of {limit} base points already granted today"
  )]
  RateLimitExceeded {
    granter_id:    Uuid,
    limit:         i64,
    granted_today: i64,
  },

  #[error("season not found: {0}")]
  SeasonNotFound(Uuid),

  #[error("xp type not found: {0}")]
  TypeNotFound(Uuid),

  #[error("achievement rule not found: {0}")]
  RuleNotFound(Uuid),

  #[error("grant not found: {0}")]
  GrantNotFound(Uuid),

  /// An orphaned grant/event pair or a duplicate active season was detected.
  /// Signals a bug or external tampering; surfaced, never silently repaired.
  #[error("consistency violation: {0}")]
  ConsistencyViolation(String),

  #[error("progress may not decrease: stored {current}, requested {requested}")]
  ProgressNotMonotonic { current: u8, requested: u8 },

  #[error("comparison requires 2 to 10 attendants, got {0}")]
  InvalidComparison(usize),

  #[error("no base points configured for rating {0}")]
  UnknownRating(u8),

  #[error("season multiplier must be positive and finite, got {0}")]
  InvalidMultiplier(f64),

  /// A storage call timed out or lost its connection. Retryable; does not
  /// indicate corruption.
  #[error("transient storage failure: {0}")]
  Transient(String),

  #[error("storage error: {0}")]
  Storage(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
