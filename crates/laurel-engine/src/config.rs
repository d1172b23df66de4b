//! Injectable engine configuration.
//!
//! Everything here is plain serde data so the embedding application can load
//! it from whatever configuration layer it already runs. Defaults mirror the
//! reference deployment.

use std::collections::BTreeMap;

use laurel_core::curve::LevelCurve;
use serde::{Deserialize, Serialize};

/// The rating → base-points table used by the survey collaborator.
///
/// Injectable configuration, not a hard-coded constant: deployments tune the
/// penalty/reward spread without touching the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatingScale {
  points: BTreeMap<u8, i64>,
}

impl Default for RatingScale {
  /// The reference table: 1★ → −5, 2★ → −2, 3★ → +1, 4★ → +3, 5★ → +5.
  fn default() -> Self {
    Self {
      points: BTreeMap::from([(1, -5), (2, -2), (3, 1), (4, 3), (5, 5)]),
    }
  }
}

impl RatingScale {
  pub fn new(points: BTreeMap<u8, i64>) -> Self {
    Self { points }
  }

  /// Base points for a rating, or `None` for a rating outside the table.
  pub fn base_points(&self, rating: u8) -> Option<i64> {
    self.points.get(&rating).copied()
  }
}

/// Aggregate configuration for [`crate::Engine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub rating_scale:      RatingScale,
  /// Maximum base points one granter may hand out per UTC calendar day.
  pub daily_grant_limit: i64,
  pub curve:             LevelCurve,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      rating_scale:      RatingScale::default(),
      daily_grant_limit: 100,
      curve:             LevelCurve::default(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reference_scale() {
    let scale = RatingScale::default();
    assert_eq!(scale.base_points(1), Some(-5));
    assert_eq!(scale.base_points(2), Some(-2));
    assert_eq!(scale.base_points(3), Some(1));
    assert_eq!(scale.base_points(4), Some(3));
    assert_eq!(scale.base_points(5), Some(5));
    assert_eq!(scale.base_points(0), None);
    assert_eq!(scale.base_points(6), None);
  }

  #[test]
  fn config_deserialises_with_defaults() {
    let config: EngineConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config.daily_grant_limit, 100);
    assert_eq!(config.curve, LevelCurve::default());
  }

  #[test]
  fn custom_scale_roundtrip() {
    let scale = RatingScale::new(BTreeMap::from([(1, -10), (5, 10)]));
    let json = serde_json::to_string(&scale).unwrap();
    let back: RatingScale = serde_json::from_str(&json).unwrap();
    assert_eq!(back.base_points(1), Some(-10));
    assert_eq!(back.base_points(3), None);
  }
}
