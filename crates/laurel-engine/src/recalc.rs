//! The Recalculation Orchestrator — deterministic re-derivation and the
//! consistency audit.
//!
//! Used after bulk historical mutation (an evaluation import reverted,
//! events backfilled). It never rewrites event history; it only recomputes
//! derived totals from the immutable log.

use std::collections::BTreeMap;
use std::fmt;

use laurel_core::{
  store::{EventQuery, LedgerStore, SeasonFilter},
  Error, Result,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::ledger::guarded_events;

/// One finding of the consistency audit.
#[derive(Debug, Clone)]
pub enum ConsistencyIssue {
  /// A grant whose 1:1 event row is missing.
  OrphanedGrant { grant_id: Uuid, xp_event_id: Uuid },
  /// More than one season flagged active at once.
  DuplicateActiveSeasons { season_ids: Vec<Uuid> },
}

impl fmt::Display for ConsistencyIssue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::OrphanedGrant {
        grant_id,
        xp_event_id,
      } => write!(
        f,
        "grant {grant_id} references missing event {xp_event_id}"
      ),
      Self::DuplicateActiveSeasons { season_ids } => {
        write!(f, "{} seasons active at once", season_ids.len())
      }
    }
  }
}

#[derive(Clone)]
pub struct RecalculationOrchestrator<L> {
  store: L,
}

impl<L: LedgerStore + Clone> RecalculationOrchestrator<L> {
  pub fn new(store: L) -> Self {
    Self { store }
  }

  /// Re-read every event in scope and re-sum per attendant.
  ///
  /// Pure and idempotent: running it twice yields identical totals, and
  /// the result always equals incremental aggregation over the same event
  /// set.
  pub async fn recalculate_all(
    &self,
    season: Option<Uuid>,
  ) -> Result<BTreeMap<Uuid, i64>> {
    let query = EventQuery {
      season: season.map_or(SeasonFilter::Any, SeasonFilter::In),
      ..Default::default()
    };
    let events = guarded_events(&self.store, &query).await?;

    let mut totals: BTreeMap<Uuid, i64> = BTreeMap::new();
    for event in events {
      *totals.entry(event.attendant_id).or_insert(0) += event.points;
    }

    info!(
      attendants = totals.len(),
      season = ?season,
      "ledger totals recalculated"
    );
    Ok(totals)
  }

  /// Probe for corruption: orphaned grant/event pairs and duplicate active
  /// seasons. Issues are logged and surfaced, never silently repaired.
  pub async fn audit(&self) -> Result<Vec<ConsistencyIssue>> {
    let mut issues = Vec::new();

    for grant in self.store.orphaned_grants().await.map_err(Into::into)? {
      issues.push(ConsistencyIssue::OrphanedGrant {
        grant_id:    grant.grant_id,
        xp_event_id: grant.xp_event_id,
      });
    }

    let active = self.store.active_seasons().await.map_err(Into::into)?;
    if active.len() > 1 {
      issues.push(ConsistencyIssue::DuplicateActiveSeasons {
        season_ids: active.iter().map(|s| s.season_id).collect(),
      });
    }

    for issue in &issues {
      warn!(%issue, "consistency issue detected");
    }
    Ok(issues)
  }

  /// A non-empty audit collapsed into [`Error::ConsistencyViolation`].
  pub async fn verify(&self) -> Result<()> {
    let issues = self.audit().await?;
    if issues.is_empty() {
      return Ok(());
    }
    let summary = issues
      .iter()
      .map(ConsistencyIssue::to_string)
      .collect::<Vec<_>>()
      .join("; ");
    Err(Error::ConsistencyViolation(summary))
  }
}
