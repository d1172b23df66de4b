//! The XP Ledger — the single write path into the append-only event log.
//!
//! Every write resolves the current season through the registry at call
//! time and snapshots its multiplier into the event; nothing here holds
//! season state between calls.

use laurel_core::{
  event::{NewXpEvent, XpEvent, XpSource},
  store::{EventQuery, LedgerStore, SeasonFilter},
  Error, Result,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{config::RatingScale, seasons::SeasonRegistry};

/// Read events for `query`, dropping any whose season row has been
/// administratively purged. Orphaned events are logged and excluded —
/// totals must never silently include points from a vanished season.
pub(crate) async fn guarded_events<L: LedgerStore>(
  store: &L,
  query: &EventQuery,
) -> Result<Vec<XpEvent>> {
  let events = store.list_events(query).await.map_err(Into::into)?;
  let known: std::collections::HashSet<Uuid> = store
    .list_seasons()
    .await
    .map_err(Into::into)?
    .into_iter()
    .map(|s| s.season_id)
    .collect();

  let (kept, orphaned): (Vec<_>, Vec<_>) = events
    .into_iter()
    .partition(|e| e.season_id.is_none_or(|id| known.contains(&id)));

  if !orphaned.is_empty() {
    warn!(
      dropped = orphaned.len(),
      "excluding events whose season no longer exists"
    );
  }
  Ok(kept)
}

#[derive(Clone)]
pub struct XpLedger<L> {
  store:   L,
  seasons: SeasonRegistry<L>,
  scale:   RatingScale,
}

impl<L: LedgerStore + Clone> XpLedger<L> {
  pub fn new(store: L, scale: RatingScale) -> Self {
    Self {
      seasons: SeasonRegistry::new(store.clone()),
      store,
      scale,
    }
  }

  /// Record one event: resolve the current season, snapshot its multiplier,
  /// round half to even, append.
  ///
  /// Sources that require a season hard-stop with
  /// [`Error::NoActiveSeason`]; evaluations outside a season are recorded
  /// season-less with multiplier 1.
  pub async fn record(
    &self,
    attendant_id: Uuid,
    source: XpSource,
    base_points: i64,
    reason: impl Into<String>,
    related_id: Option<Uuid>,
  ) -> Result<XpEvent> {
    let season = self.seasons.current().await?;
    let (season_id, multiplier) = match &season {
      Some(s) => (Some(s.season_id), s.xp_multiplier),
      None if source.requires_season() => return Err(Error::NoActiveSeason),
      None => (None, 1.0),
    };

    let event = self
      .store
      .append_event(NewXpEvent {
        attendant_id,
        season_id,
        source,
        base_points,
        multiplier,
        reason: reason.into(),
        related_id,
      })
      .await
      .map_err(Into::into)?;

    info!(
      event = %event.event_id,
      attendant = %event.attendant_id,
      source = %event.source,
      points = event.points,
      "xp event recorded"
    );
    Ok(event)
  }

  /// The survey collaborator's entry point: convert a star rating through
  /// the injectable [`RatingScale`] and record it.
  pub async fn record_evaluation(
    &self,
    attendant_id: Uuid,
    rating: u8,
    evaluation_id: Uuid,
  ) -> Result<XpEvent> {
    let base_points = self
      .scale
      .base_points(rating)
      .ok_or(Error::UnknownRating(rating))?;
    self
      .record(
        attendant_id,
        XpSource::Evaluation,
        base_points,
        format!("{rating}-star evaluation"),
        Some(evaluation_id),
      )
      .await
  }

  /// Append a compensating event cancelling `points` previously credited.
  /// The correction path: history is never edited in place.
  pub async fn record_compensation(
    &self,
    attendant_id: Uuid,
    source: XpSource,
    points: i64,
    reason: impl Into<String>,
    related_id: Option<Uuid>,
  ) -> Result<XpEvent> {
    let event = self
      .store
      .append_event(NewXpEvent::compensation(
        attendant_id,
        source,
        points,
        reason.into(),
        related_id,
      ))
      .await
      .map_err(Into::into)?;
    info!(
      event = %event.event_id,
      attendant = %event.attendant_id,
      points = event.points,
      "compensating event recorded"
    );
    Ok(event)
  }

  /// Sum of multiplied points for one attendant under the given season
  /// scope. Missing data is a zero total, never an error.
  pub async fn sum_for_attendant(
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

  /// Full event history for one attendant, oldest first.
  pub async fn events_for_attendant(
    &self,
    attendant_id: Uuid,
  ) -> Result<Vec<XpEvent>> {
    guarded_events(&self.store, &EventQuery::attendant(attendant_id)).await
  }
}
