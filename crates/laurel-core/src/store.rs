//! The `LedgerStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `laurel-store-sqlite`). The engine services depend on this abstraction,
//! not on any concrete backend; persistence technology is the caller's
//! choice.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
  achievement::{AchievementProgress, AchievementRule, NewAchievementRule},
  event::{NewXpEvent, XpEvent, XpSource},
  grant::{NewXpGrant, NewXpType, XpGrant, XpTypeConfig},
  season::{NewSeason, Season},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// How a query constrains an event's season column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SeasonFilter {
  /// Season-scoped and season-less events alike — lifetime totals.
  #[default]
  Any,
  /// Only events recorded outside any season.
  Unscoped,
  /// Only events recorded under the given season.
  In(Uuid),
}

/// Parameters for [`LedgerStore::list_events`].
///
/// A closed, explicitly-typed criteria struct: filter combinations the
/// backend cannot honour are unrepresentable rather than silently ignored.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
  pub attendant:       Option<Uuid>,
  pub season:          SeasonFilter,
  pub source:          Option<XpSource>,
  /// Restrict to events produced by grants from this granter.
  pub granter:         Option<Uuid>,
  pub recorded_after:  Option<DateTime<Utc>>,
  pub recorded_before: Option<DateTime<Utc>>,
  pub min_points:      Option<i64>,
  pub max_points:      Option<i64>,
}

impl EventQuery {
  /// All events for one attendant across their lifetime.
  pub fn attendant(attendant_id: Uuid) -> Self {
    Self {
      attendant: Some(attendant_id),
      ..Self::default()
    }
  }

  /// All events recorded under one season.
  pub fn season(season_id: Uuid) -> Self {
    Self {
      season: SeasonFilter::In(season_id),
      ..Self::default()
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Laurel ledger backend.
///
/// The `xp_events` log is append-only: no update or delete is ever issued.
/// The two operations with cross-record invariants — season activation and
/// the grant+event pair — are single transactions inside the backend, so no
/// observer sees a partial state.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait LedgerStore: Send + Sync {
  type Error: std::error::Error
    + Into<crate::Error>
    + Send
    + Sync
    + 'static;

  // ── Seasons ───────────────────────────────────────────────────────────

  /// Create and persist a new, inactive season.
  /// Multiplier validity is the caller's responsibility
  /// (see [`NewSeason::validate`]).
  fn add_season(
    &self,
    input: NewSeason,
  ) -> impl Future<Output = Result<Season, Self::Error>> + Send + '_;

  /// Retrieve a season by id. Returns `None` if not found.
  fn get_season(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Season>, Self::Error>> + Send + '_;

  /// List all seasons, active or not.
  fn list_seasons(
    &self,
  ) -> impl Future<Output = Result<Vec<Season>, Self::Error>> + Send + '_;

  /// Atomically deactivate every other season and activate `id`.
  ///
  /// Returns the newly active season, or `None` if `id` is unknown — in
  /// which case nothing was deactivated. No observer may see two or zero
  /// active seasons mid-transition.
  fn activate_season(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Season>, Self::Error>> + Send + '_;

  /// The single active season, if any. Derived by query on every call —
  /// never cached across requests — so administrative activation is
  /// immediately visible.
  fn current_season(
    &self,
  ) -> impl Future<Output = Result<Option<Season>, Self::Error>> + Send + '_;

  /// Administrative multiplier edit. Only future snapshots observe the new
  /// value; historical events are untouched. Returns `None` for an unknown
  /// id.
  fn set_season_multiplier(
    &self,
    id: Uuid,
    xp_multiplier: f64,
  ) -> impl Future<Output = Result<Option<Season>, Self::Error>> + Send + '_;

  /// Every season currently flagged active. More than one element is a
  /// corruption signal surfaced by the consistency audit.
  fn active_seasons(
    &self,
  ) -> impl Future<Output = Result<Vec<Season>, Self::Error>> + Send + '_;

  // ── Events — append-only writes ───────────────────────────────────────

  /// Append an event and return it with its store-assigned id and
  /// timestamp.
  fn append_event(
    &self,
    input: NewXpEvent,
  ) -> impl Future<Output = Result<XpEvent, Self::Error>> + Send + '_;

  /// List events matching `query`, ordered by `recorded_at` ascending.
  fn list_events<'a>(
    &'a self,
    query: &'a EventQuery,
  ) -> impl Future<Output = Result<Vec<XpEvent>, Self::Error>> + Send + 'a;

  // ── Grants ────────────────────────────────────────────────────────────

  /// Persist one grant and its backing event as a single atomic unit.
  /// Either both rows exist afterwards or neither does.
  fn insert_grant_with_event(
    &self,
    grant: NewXpGrant,
    event: NewXpEvent,
  ) -> impl Future<Output = Result<(XpGrant, XpEvent), Self::Error>> + Send + '_;

  /// Retrieve a grant by id. Returns `None` if not found.
  fn get_grant(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<XpGrant>, Self::Error>> + Send + '_;

  /// Sum of `base_points` across events backing grants issued by `granter`
  /// on the given UTC calendar day. Feeds the daily rate limit.
  fn base_points_granted_on(
    &self,
    granter: Uuid,
    day: NaiveDate,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// Grants whose referenced event row is missing — the 1:1 corruption
  /// probe used by the consistency audit.
  fn orphaned_grants(
    &self,
  ) -> impl Future<Output = Result<Vec<XpGrant>, Self::Error>> + Send + '_;

  // ── XP type catalogue ─────────────────────────────────────────────────

  /// Create and persist a new, active XP type.
  fn add_xp_type(
    &self,
    input: NewXpType,
  ) -> impl Future<Output = Result<XpTypeConfig, Self::Error>> + Send + '_;

  /// Retrieve an XP type by id. Returns `None` if not found.
  fn get_xp_type(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<XpTypeConfig>, Self::Error>> + Send + '_;

  fn list_xp_types(
    &self,
  ) -> impl Future<Output = Result<Vec<XpTypeConfig>, Self::Error>> + Send + '_;

  /// Toggle a type. Returns `None` for an unknown id.
  fn set_xp_type_active(
    &self,
    id: Uuid,
    active: bool,
  ) -> impl Future<Output = Result<Option<XpTypeConfig>, Self::Error>> + Send + '_;

  // ── Achievements ──────────────────────────────────────────────────────

  /// Create and persist a new, active achievement rule.
  fn add_rule(
    &self,
    input: NewAchievementRule,
  ) -> impl Future<Output = Result<AchievementRule, Self::Error>> + Send + '_;

  /// Retrieve a rule by id. Returns `None` if not found.
  fn get_rule(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<AchievementRule>, Self::Error>> + Send + '_;

  /// List rules; `active_only` restricts to rules eligible for evaluation.
  fn list_rules(
    &self,
    active_only: bool,
  ) -> impl Future<Output = Result<Vec<AchievementRule>, Self::Error>> + Send + '_;

  /// Toggle a rule. Returns `None` for an unknown id.
  fn set_rule_active(
    &self,
    id: Uuid,
    active: bool,
  ) -> impl Future<Output = Result<Option<AchievementRule>, Self::Error>> + Send + '_;

  /// Stored progress for one (attendant, rule) pair, if any.
  fn get_progress(
    &self,
    attendant: Uuid,
    rule: Uuid,
  ) -> impl Future<Output = Result<Option<AchievementProgress>, Self::Error>> + Send + '_;

  /// All stored progress rows for one attendant.
  fn list_progress(
    &self,
    attendant: Uuid,
  ) -> impl Future<Output = Result<Vec<AchievementProgress>, Self::Error>> + Send + '_;

  /// Insert or replace a progress row, keyed on (attendant, rule).
  /// Monotonicity and terminality are enforced by the evaluator, not here.
  fn upsert_progress(
    &self,
    progress: AchievementProgress,
  ) -> impl Future<Output = Result<AchievementProgress, Self::Error>> + Send + '_;
}
