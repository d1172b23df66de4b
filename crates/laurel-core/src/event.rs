//! XP events — the fundamental unit of the Laurel ledger.
//!
//! An event is an immutable award (or penalty) of experience points to an
//! attendant at a point in time. Events are never updated or deleted;
//! corrections are made by appending a compensating event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

// ─── Source ──────────────────────────────────────────────────────────────────

/// Where an XP event originated. The snake_case form serves as the `source`
/// discriminant stored in the database.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum XpSource {
  /// Derived from a customer satisfaction rating.
  Evaluation,
  /// A manually granted bonus, always backed by an [`crate::grant::XpGrant`].
  ManualGrant,
  /// The reward attached to an unlocked achievement.
  Achievement,
}

impl XpSource {
  /// Whether recording from this source demands an active season.
  ///
  /// Evaluations keep flowing outside seasons (season-less, multiplier 1);
  /// bonuses and rewards are competitive currency and hard-stop instead.
  pub fn requires_season(self) -> bool {
    matches!(self, Self::ManualGrant | Self::Achievement)
  }
}

// ─── Multiplier arithmetic ───────────────────────────────────────────────────

/// Multiply base points by a season multiplier, rounding half to even.
///
/// Recalculation must reproduce stored points exactly, so the rounding
/// mode here can never change.
pub fn apply_multiplier(base_points: i64, multiplier: f64) -> i64 {
  (base_points as f64 * multiplier).round_ties_even() as i64
}

// ─── XpEvent ─────────────────────────────────────────────────────────────────

/// An immutable ledger entry. Once written, no field is ever updated.
///
/// `multiplier` is the season multiplier snapshot taken at write time;
/// later edits to the season never retroactively change `points`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpEvent {
  pub event_id:     Uuid,
  pub attendant_id: Uuid,
  /// `None` means the event was recorded outside any season; no multiplier
  /// applied.
  pub season_id:    Option<Uuid>,
  pub source:       XpSource,
  pub base_points:  i64,
  pub multiplier:   f64,
  /// `round_half_even(base_points × multiplier)`, fixed at write time.
  pub points:       i64,
  pub reason:       String,
  /// The originating record — an evaluation id, a grant's type id, or an
  /// achievement rule id.
  pub related_id:   Option<Uuid>,
  /// Store-assigned timestamp; never changes after creation.
  pub recorded_at:  DateTime<Utc>,
}

// ─── NewXpEvent ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::LedgerStore::append_event`].
///
/// The season and multiplier snapshot are resolved by the ledger service
/// before this struct is built; `event_id` and `recorded_at` are always
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewXpEvent {
  pub attendant_id: Uuid,
  pub season_id:    Option<Uuid>,
  pub source:       XpSource,
  pub base_points:  i64,
  pub multiplier:   f64,
  pub reason:       String,
  pub related_id:   Option<Uuid>,
}

impl NewXpEvent {
  /// The multiplied points this event will carry once persisted.
  pub fn points(&self) -> i64 {
    apply_multiplier(self.base_points, self.multiplier)
  }

  /// A compensating event cancelling `points` previously credited to the
  /// attendant. Written season-less with multiplier 1 so the cancellation
  /// is exact regardless of what multiplier the original snapshot carried.
  pub fn compensation(
    attendant_id: Uuid,
    source: XpSource,
    points: i64,
    reason: String,
    related_id: Option<Uuid>,
  ) -> Self {
    Self {
      attendant_id,
      season_id: None,
      source,
      base_points: -points,
      multiplier: 1.0,
      reason,
      related_id,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn multiplier_applies_and_rounds_half_to_even() {
    assert_eq!(apply_multiplier(100, 2.0), 200);
    assert_eq!(apply_multiplier(100, 1.5), 150);
    // .5 ties go to the even neighbour in both directions
    assert_eq!(apply_multiplier(5, 0.5), 2);
    assert_eq!(apply_multiplier(7, 0.5), 4);
    assert_eq!(apply_multiplier(-5, 1.5), -8);
    assert_eq!(apply_multiplier(-5, 0.5), -2);
  }

  #[test]
  fn identity_multiplier_preserves_base() {
    for base in [-5, -2, 0, 1, 3, 5, 100] {
      assert_eq!(apply_multiplier(base, 1.0), base);
    }
  }

  #[test]
  fn source_discriminants_are_snake_case() {
    assert_eq!(XpSource::Evaluation.as_ref(), "evaluation");
    assert_eq!(XpSource::ManualGrant.as_ref(), "manual_grant");
    assert_eq!(XpSource::Achievement.as_ref(), "achievement");
    assert_eq!(
      "manual_grant".parse::<XpSource>().unwrap(),
      XpSource::ManualGrant
    );
  }

  #[test]
  fn season_requirements_per_source() {
    assert!(!XpSource::Evaluation.requires_season());
    assert!(XpSource::ManualGrant.requires_season());
    assert!(XpSource::Achievement.requires_season());
  }
}
