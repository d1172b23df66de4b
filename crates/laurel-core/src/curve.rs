//! The XP curve — cumulative XP to level, and level to XP threshold.
//!
//! Pure and deterministic. The curve is injectable configuration; the
//! default uses a linearly growing per-level step (100, 125, 150, …), so
//! the cumulative thresholds form a quadratic.

use serde::{Deserialize, Serialize};

/// Parameters of the level curve.
///
/// `base_step` is the XP needed to go from level 1 to level 2;
/// `step_growth` is added to the step at every subsequent level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelCurve {
  pub base_step:   i64,
  pub step_growth: i64,
}

impl Default for LevelCurve {
  fn default() -> Self {
    Self {
      base_step:   100,
      step_growth: 25,
    }
  }
}

impl LevelCurve {
  /// XP needed to advance from `level` to `level + 1`.
  ///
  /// Clamped to at least 1 so the level walk terminates even for degenerate
  /// deserialised configurations.
  pub fn step(&self, level: u32) -> i64 {
    (self.base_step + i64::from(level.saturating_sub(1)) * self.step_growth)
      .max(1)
  }

  /// The minimum cumulative XP required to hold `level`.
  ///
  /// `xp_for_level(1)` is 0; the function is monotonically non-decreasing
  /// in `level`.
  pub fn xp_for_level(&self, level: u32) -> i64 {
    let mut threshold = 0i64;
    for l in 1..level.max(1) {
      threshold += self.step(l);
    }
    threshold
  }

  /// The level held at `xp` cumulative XP.
  ///
  /// XP exactly at a threshold belongs to the higher level (closed lower
  /// bound). Negative totals — possible with 1★/2★ evaluation penalties —
  /// clamp to level 1.
  pub fn level_for_xp(&self, xp: i64) -> u32 {
    if xp <= 0 {
      return 1;
    }
    let mut level = 1u32;
    let mut threshold = 0i64;
    loop {
      let next = threshold + self.step(level);
      if xp < next {
        return level;
      }
      threshold = next;
      level += 1;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zero_xp_is_level_one() {
    let curve = LevelCurve::default();
    assert_eq!(curve.level_for_xp(0), 1);
    assert_eq!(curve.xp_for_level(1), 0);
  }

  #[test]
  fn negative_xp_clamps_to_level_one() {
    let curve = LevelCurve::default();
    assert_eq!(curve.level_for_xp(-40), 1);
  }

  #[test]
  fn threshold_belongs_to_the_higher_level() {
    let curve = LevelCurve::default();
    let threshold = curve.xp_for_level(3);
    assert_eq!(curve.level_for_xp(threshold), 3);
    assert_eq!(curve.level_for_xp(threshold - 1), 2);
  }

  #[test]
  fn reference_thresholds() {
    // steps: 100 (1→2), 125 (2→3), 150 (3→4)
    let curve = LevelCurve::default();
    assert_eq!(curve.xp_for_level(2), 100);
    assert_eq!(curve.xp_for_level(3), 225);
    assert_eq!(curve.xp_for_level(4), 375);
  }

  #[test]
  fn round_trips_through_thresholds() {
    let curve = LevelCurve::default();
    for level in 1..=40 {
      assert_eq!(curve.level_for_xp(curve.xp_for_level(level)), level);
    }
  }

  #[test]
  fn monotonic_in_xp() {
    let curve = LevelCurve::default();
    let mut last = 0;
    for xp in (0i64..5_000).step_by(7) {
      let level = curve.level_for_xp(xp);
      assert!(level >= last);
      last = level;
    }
  }

  #[test]
  fn degenerate_config_still_terminates() {
    let curve = LevelCurve {
      base_step:   0,
      step_growth: -10,
    };
    // Steps clamp to 1; the walk must terminate and stay monotonic.
    assert!(curve.level_for_xp(50) >= 1);
    assert!(curve.xp_for_level(10) >= curve.xp_for_level(9));
  }
}
