//! The Aggregation & Ranking Engine — derived views over the event log.
//!
//! Nothing here is a source of truth: every ranking, percentile and
//! comparison is recomputed on demand from the immutable ledger. All
//! percentage and average math guards division by zero by returning 0,
//! never NaN or infinity.

use std::collections::{HashMap, HashSet};

use laurel_core::{
  curve::LevelCurve,
  store::{EventQuery, LedgerStore, SeasonFilter},
  Error, Result,
};
use serde::Serialize;
use uuid::Uuid;

use crate::ledger::guarded_events;

// ─── Derived types ───────────────────────────────────────────────────────────

/// One row of a seasonal leaderboard. Derived, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RankingEntry {
  pub attendant_id: Uuid,
  /// Sum of multiplied points within the ranked season.
  pub total_xp:     i64,
  /// 1-based shared position; ties share, the next distinct entry resumes
  /// at `position + tie group size`.
  pub position:     u32,
  pub percentile:   f64,
  /// Level derived from lifetime XP, not the seasonal total.
  pub level:        u32,
}

/// Per-attendant stats in a head-to-head comparison, each metric ranked
/// independently across the compared group.
#[derive(Debug, Clone, Serialize)]
pub struct AttendantComparison {
  pub attendant_id:     Uuid,
  pub total_xp:         i64,
  pub achievements:     u64,
  pub level:            u32,
  pub xp_rank:          u32,
  pub achievement_rank: u32,
  pub level_rank:       u32,
  /// `round(mean of the three individual ranks)`.
  pub overall_rank:     u32,
}

/// An attendant's total against a peer group average.
#[derive(Debug, Clone, Serialize)]
pub struct PeerComparison {
  pub attendant_id: Uuid,
  pub total_xp:     i64,
  pub peer_average: f64,
  pub delta:        f64,
  /// Percentage delta against the peer average; 0 when the average is 0.
  pub delta_pct:    f64,
}

// ─── Pure ranking math ───────────────────────────────────────────────────────

/// Assign 1-based positions to totals already sorted descending.
///
/// Tied entries share the position of the first member of their group; the
/// entry after a tie group resumes at its own index + 1, i.e. the shared
/// position plus the group size.
fn assign_positions(sorted_totals: &[i64]) -> Vec<u32> {
  let mut positions = Vec::with_capacity(sorted_totals.len());
  for (idx, total) in sorted_totals.iter().enumerate() {
    if idx > 0 && *total == sorted_totals[idx - 1] {
      positions.push(positions[idx - 1]);
    } else {
      positions.push(idx as u32 + 1);
    }
  }
  positions
}

/// Rank each value among all of them, descending, ties sharing a position.
/// Returns ranks in input order.
fn shared_ranks_desc(values: &[i64]) -> Vec<u32> {
  let mut order: Vec<usize> = (0..values.len()).collect();
  order.sort_by(|&a, &b| values[b].cmp(&values[a]).then(a.cmp(&b)));

  let mut ranks = vec![0u32; values.len()];
  let mut prev_value = None;
  let mut prev_rank = 0u32;
  for (sorted_idx, &input_idx) in order.iter().enumerate() {
    let rank = if prev_value == Some(values[input_idx]) {
      prev_rank
    } else {
      sorted_idx as u32 + 1
    };
    ranks[input_idx] = rank;
    prev_value = Some(values[input_idx]);
    prev_rank = rank;
  }
  ranks
}

/// `(N − position + 1) / N × 100`, and 0 for an empty population.
fn percentile(position: u32, population: usize) -> f64 {
  if population == 0 {
    return 0.0;
  }
  (population as f64 - f64::from(position) + 1.0) / population as f64 * 100.0
}

// ─── Engine ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct RankingEngine<L> {
  store: L,
  curve: LevelCurve,
}

impl<L: LedgerStore + Clone> RankingEngine<L> {
  pub fn new(store: L, curve: LevelCurve) -> Self {
    Self { store, curve }
  }

  /// Sum of multiplied points for one attendant under the given season
  /// scope; [`SeasonFilter::Any`] is the lifetime total.
  pub async fn total_xp(
    &self,
    attendant_id: Uuid,
    season: SeasonFilter,
  ) -> Result<i64> {
    let query = EventQuery {
      attendant: Some(attendant_id),
      season,
      ..Default::default()
    };
    let events = guarded_events(&self.store, &query).await?;
    Ok(events.iter().map(|e| e.points).sum())
  }

  /// The attendant's level, derived from lifetime XP through the curve.
  pub async fn level(&self, attendant_id: Uuid) -> Result<u32> {
    let total = self.total_xp(attendant_id, SeasonFilter::Any).await?;
    Ok(self.curve.level_for_xp(total))
  }

  /// The seasonal leaderboard, ordered best-first.
  ///
  /// Ties share a position and are ordered among themselves by the earliest
  /// XP event — stable iteration only, the shared position is what counts.
  /// `population` restricts the board (e.g. one department); attendants
  /// without events in the season do not appear.
  pub async fn rankings(
    &self,
    season_id: Uuid,
    population: Option<&[Uuid]>,
  ) -> Result<Vec<RankingEntry>> {
    let events =
      guarded_events(&self.store, &EventQuery::season(season_id)).await?;

    // Events arrive ordered by recorded_at, so first-seen order doubles as
    // the earliest-event tie order.
    let mut first_seen: Vec<Uuid> = Vec::new();
    let mut totals: HashMap<Uuid, i64> = HashMap::new();
    for event in &events {
      totals
        .entry(event.attendant_id)
        .and_modify(|t| *t += event.points)
        .or_insert_with(|| {
          first_seen.push(event.attendant_id);
          event.points
        });
    }

    let allowed: Option<HashSet<Uuid>> =
      population.map(|ids| ids.iter().copied().collect());

    let mut rows: Vec<(usize, Uuid, i64)> = first_seen
      .iter()
      .enumerate()
      .filter(|(_, id)| allowed.as_ref().is_none_or(|set| set.contains(id)))
      .map(|(seen_idx, id)| (seen_idx, *id, totals[id]))
      .collect();
    rows.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));

    let sorted_totals: Vec<i64> = rows.iter().map(|r| r.2).collect();
    let positions = assign_positions(&sorted_totals);
    let lifetime = self.lifetime_totals().await?;

    let n = rows.len();
    Ok(
      rows
        .into_iter()
        .zip(positions)
        .map(|((_, attendant_id, total_xp), position)| RankingEntry {
          attendant_id,
          total_xp,
          position,
          percentile: percentile(position, n),
          level: self
            .curve
            .level_for_xp(lifetime.get(&attendant_id).copied().unwrap_or(0)),
        })
        .collect(),
    )
  }

  /// Head-to-head comparison of 2 to 10 attendants across lifetime XP,
  /// unlocked achievements and level, each ranked independently.
  pub async fn compare(
    &self,
    attendant_ids: &[Uuid],
  ) -> Result<Vec<AttendantComparison>> {
    if !(2..=10).contains(&attendant_ids.len()) {
      return Err(Error::InvalidComparison(attendant_ids.len()));
    }

    let mut totals = Vec::with_capacity(attendant_ids.len());
    let mut achievements = Vec::with_capacity(attendant_ids.len());
    let mut levels = Vec::with_capacity(attendant_ids.len());
    for &attendant_id in attendant_ids {
      let total = self.total_xp(attendant_id, SeasonFilter::Any).await?;
      let unlocked = self
        .store
        .list_progress(attendant_id)
        .await
        .map_err(Into::into)?
        .iter()
        .filter(|p| p.is_unlocked())
        .count() as i64;
      totals.push(total);
      achievements.push(unlocked);
      levels.push(i64::from(self.curve.level_for_xp(total)));
    }

    let xp_ranks = shared_ranks_desc(&totals);
    let achievement_ranks = shared_ranks_desc(&achievements);
    let level_ranks = shared_ranks_desc(&levels);

    Ok(
      attendant_ids
        .iter()
        .enumerate()
        .map(|(i, &attendant_id)| {
          let rank_sum = xp_ranks[i] + achievement_ranks[i] + level_ranks[i];
          AttendantComparison {
            attendant_id,
            total_xp: totals[i],
            achievements: achievements[i] as u64,
            level: levels[i] as u32,
            xp_rank: xp_ranks[i],
            achievement_rank: achievement_ranks[i],
            level_rank: level_ranks[i],
            overall_rank: (f64::from(rank_sum) / 3.0).round() as u32,
          }
        })
        .collect(),
    )
  }

  /// An attendant's total against the average of a peer group (e.g. their
  /// department). Empty or all-zero peer groups yield 0 deltas, never NaN.
  pub async fn peer_comparison(
    &self,
    attendant_id: Uuid,
    peer_ids: &[Uuid],
    season: SeasonFilter,
  ) -> Result<PeerComparison> {
    let total_xp = self.total_xp(attendant_id, season).await?;

    let mut peer_sum = 0i64;
    for &peer in peer_ids {
      peer_sum += self.total_xp(peer, season).await?;
    }
    let peer_average = if peer_ids.is_empty() {
      0.0
    } else {
      peer_sum as f64 / peer_ids.len() as f64
    };

    let delta = total_xp as f64 - peer_average;
    let delta_pct = if peer_average == 0.0 {
      0.0
    } else {
      delta / peer_average * 100.0
    };

    Ok(PeerComparison {
      attendant_id,
      total_xp,
      peer_average,
      delta,
      delta_pct,
    })
  }

  async fn lifetime_totals(&self) -> Result<HashMap<Uuid, i64>> {
    let events =
      guarded_events(&self.store, &EventQuery::default()).await?;
    let mut totals = HashMap::new();
    for event in events {
      *totals.entry(event.attendant_id).or_insert(0) += event.points;
    }
    Ok(totals)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn positions_share_and_account_for_tie_groups() {
    // 50, 40, 40, 30 → 1, 2, 2, 4 (not 3)
    assert_eq!(assign_positions(&[50, 40, 40, 30]), vec![1, 2, 2, 4]);
    // triple tie at the top → the next position is 4
    assert_eq!(assign_positions(&[10, 10, 10, 5]), vec![1, 1, 1, 4]);
    assert_eq!(assign_positions(&[]), Vec::<u32>::new());
  }

  #[test]
  fn ranks_follow_input_order() {
    // values 30, 50, 30 → ranks 2, 1, 2
    assert_eq!(shared_ranks_desc(&[30, 50, 30]), vec![2, 1, 2]);
    assert_eq!(shared_ranks_desc(&[7]), vec![1]);
  }

  #[test]
  fn percentile_formula() {
    assert_eq!(percentile(1, 4), 100.0);
    assert_eq!(percentile(4, 4), 25.0);
    // empty population: 0, never NaN
    assert_eq!(percentile(1, 0), 0.0);
  }
}
