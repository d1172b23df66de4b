//! Seasons — bounded competition windows with their own XP multiplier.
//!
//! At most one season is active at any instant; the storage backend enforces
//! this with an atomic activate-all-others-off transition. Seasons are never
//! physically deleted once events reference them (soft-deactivate only).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// A competition window. Rankings are scoped per season; events recorded
/// while a season is active snapshot its `xp_multiplier`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Season {
  pub season_id:     Uuid,
  pub name:          String,
  pub starts_on:     NaiveDate,
  pub ends_on:       NaiveDate,
  pub active:        bool,
  pub xp_multiplier: f64,
}

/// Input to [`crate::store::LedgerStore::add_season`]. Seasons are created
/// inactive; activation is a separate, atomic operation.
#[derive(Debug, Clone)]
pub struct NewSeason {
  pub name:          String,
  pub starts_on:     NaiveDate,
  pub ends_on:       NaiveDate,
  pub xp_multiplier: f64,
}

impl NewSeason {
  /// Reject non-positive or non-finite multipliers before they can poison
  /// every snapshot taken during the season.
  pub fn validate(&self) -> Result<()> {
    if !self.xp_multiplier.is_finite() || self.xp_multiplier <= 0.0 {
      return Err(Error::InvalidMultiplier(self.xp_multiplier));
    }
    Ok(())
  }
}

/// How a caller names a season in queries: explicitly by id, or relative to
/// the active one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonSelector {
  Explicit(Uuid),
  Current,
  /// The season whose `ends_on` is the latest one strictly before the
  /// current season's `starts_on`.
  Previous,
}
