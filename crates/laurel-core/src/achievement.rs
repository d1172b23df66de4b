//! Achievement rules, their declarative conditions, and per-attendant
//! progress.
//!
//! Conditions are a closed tree of tagged variants evaluated by a small
//! interpreter against an aggregated attendant snapshot. This keeps the rule
//! set data-driven and testable in isolation from the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::XpSource;

// ─── Conditions ──────────────────────────────────────────────────────────────

/// A declarative unlock condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleCondition {
  /// Lifetime total XP reaching a threshold.
  TotalXpAtLeast { threshold: i64 },
  /// Number of recorded events reaching a count, optionally restricted to
  /// one source.
  EventCountAtLeast {
    count:  u64,
    source: Option<XpSource>,
  },
  /// Every child must be satisfied; progress is the minimum of the
  /// children's.
  All { conditions: Vec<RuleCondition> },
  /// Any child suffices; progress is the maximum of the children's.
  Any { conditions: Vec<RuleCondition> },
}

/// The aggregated state a condition is evaluated against. Produced by the
/// ranking engine; the interpreter itself never touches storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttendantSnapshot {
  pub total_xp:           i64,
  pub evaluation_events:  u64,
  pub grant_events:       u64,
  pub achievement_events: u64,
}

impl AttendantSnapshot {
  pub fn event_count(&self, source: Option<XpSource>) -> u64 {
    match source {
      None => {
        self.evaluation_events + self.grant_events + self.achievement_events
      }
      Some(XpSource::Evaluation) => self.evaluation_events,
      Some(XpSource::ManualGrant) => self.grant_events,
      Some(XpSource::Achievement) => self.achievement_events,
    }
  }
}

impl RuleCondition {
  /// Evaluate to a progress percentage in `0..=100`.
  ///
  /// A condition with a non-positive threshold is trivially satisfied.
  /// `All` with no children is satisfied; `Any` with no children is not.
  pub fn progress(&self, snapshot: &AttendantSnapshot) -> u8 {
    match self {
      Self::TotalXpAtLeast { threshold } => {
        let required = (*threshold).max(0) as u64;
        ratio_progress(snapshot.total_xp.max(0) as u64, required)
      }
      Self::EventCountAtLeast { count, source } => {
        ratio_progress(snapshot.event_count(*source), *count)
      }
      Self::All { conditions } => conditions
        .iter()
        .map(|c| c.progress(snapshot))
        .min()
        .unwrap_or(100),
      Self::Any { conditions } => conditions
        .iter()
        .map(|c| c.progress(snapshot))
        .max()
        .unwrap_or(0),
    }
  }

  pub fn is_satisfied(&self, snapshot: &AttendantSnapshot) -> bool {
    self.progress(snapshot) >= 100
  }
}

fn ratio_progress(actual: u64, required: u64) -> u8 {
  if required == 0 {
    return 100;
  }
  ((actual.saturating_mul(100) / required).min(100)) as u8
}

// ─── Rules ───────────────────────────────────────────────────────────────────

/// An administrator-configured achievement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementRule {
  pub rule_id:   Uuid,
  pub title:     String,
  /// Base points recorded as a ledger event on unlock; 0 means the
  /// achievement is purely decorative.
  pub xp_reward: i64,
  pub condition: RuleCondition,
  pub active:    bool,
}

/// Input to [`crate::store::LedgerStore::add_rule`]. Rules are created
/// active.
#[derive(Debug, Clone)]
pub struct NewAchievementRule {
  pub title:     String,
  pub xp_reward: i64,
  pub condition: RuleCondition,
}

// ─── Progress ────────────────────────────────────────────────────────────────

/// The lifecycle position of one (attendant, rule) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressState {
  Locked,
  InProgress,
  /// Terminal: immutable except for explicit administrative reversal.
  Unlocked,
}

/// Stored progress towards one achievement. `progress` only moves up while
/// non-terminal; `unlocked_at` is stamped exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementProgress {
  pub attendant_id: Uuid,
  pub rule_id:      Uuid,
  /// 0–100.
  pub progress:     u8,
  pub unlocked_at:  Option<DateTime<Utc>>,
}

impl AchievementProgress {
  pub fn locked(attendant_id: Uuid, rule_id: Uuid) -> Self {
    Self {
      attendant_id,
      rule_id,
      progress: 0,
      unlocked_at: None,
    }
  }

  pub fn state(&self) -> ProgressState {
    if self.unlocked_at.is_some() {
      ProgressState::Unlocked
    } else if self.progress > 0 {
      ProgressState::InProgress
    } else {
      ProgressState::Locked
    }
  }

  pub fn is_unlocked(&self) -> bool {
    self.unlocked_at.is_some()
  }
}
