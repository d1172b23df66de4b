//! The Grant Service — the manual-bonus path into the ledger.
//!
//! Preconditions are checked in a fixed order and fail fast; the grant and
//! its backing event are then written as one storage transaction, so a
//! failed grant leaves no trace.

use chrono::Utc;
use laurel_core::{
  event::{NewXpEvent, XpSource},
  grant::{GrantRequest, NewXpGrant, NewXpType, XpGrant, XpTypeConfig},
  store::LedgerStore,
  Error, Result,
};
use tracing::info;
use uuid::Uuid;

use crate::seasons::SeasonRegistry;

#[derive(Clone)]
pub struct GrantService<L> {
  store:       L,
  seasons:     SeasonRegistry<L>,
  /// Maximum base points one granter may hand out per UTC calendar day.
  daily_limit: i64,
}

impl<L: LedgerStore + Clone> GrantService<L> {
  pub fn new(store: L, daily_limit: i64) -> Self {
    Self {
      seasons: SeasonRegistry::new(store.clone()),
      store,
      daily_limit,
    }
  }

  /// Grant a configured bonus to an attendant.
  ///
  /// Checks, in order: the type exists and is active, a season is active,
  /// and the granter's daily volume is still under the limit. The limit is
  /// calendar-day based, checked against what was already granted today —
  /// so a single grant may cross the line once per day, exactly as the
  /// window resets.
  pub async fn grant(&self, request: GrantRequest) -> Result<XpGrant> {
    let xp_type = self
      .store
      .get_xp_type(request.type_id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::TypeNotFound(request.type_id))?;
    if !xp_type.active {
      return Err(Error::InactiveType(xp_type.type_id));
    }

    let season = self.seasons.require_current().await?;

    let today = Utc::now().date_naive();
    let granted_today = self
      .store
      .base_points_granted_on(request.granter_id, today)
      .await
      .map_err(Into::into)?;
    if granted_today >= self.daily_limit {
      return Err(Error::RateLimitExceeded {
        granter_id: request.granter_id,
        limit: self.daily_limit,
        granted_today,
      });
    }

    let event = NewXpEvent {
      attendant_id: request.attendant_id,
      season_id:    Some(season.season_id),
      source:       XpSource::ManualGrant,
      base_points:  xp_type.points,
      multiplier:   season.xp_multiplier,
      reason:       format!("manual grant: {}", xp_type.name),
      related_id:   Some(xp_type.type_id),
    };
    let grant = NewXpGrant {
      attendant_id:  request.attendant_id,
      type_id:       request.type_id,
      granter_id:    request.granter_id,
      justification: request.justification,
    };

    let (grant, event) = self
      .store
      .insert_grant_with_event(grant, event)
      .await
      .map_err(Into::into)?;

    info!(
      grant = %grant.grant_id,
      attendant = %grant.attendant_id,
      granter = %grant.granter_id,
      points = event.points,
      "xp grant recorded"
    );
    Ok(grant)
  }

  /// Look up a grant by id, surfacing an unknown id as
  /// [`Error::GrantNotFound`].
  pub async fn get(&self, grant_id: Uuid) -> Result<XpGrant> {
    self
      .store
      .get_grant(grant_id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::GrantNotFound(grant_id))
  }

  /// Register a new bonus type in the catalogue.
  pub async fn define_type(&self, input: NewXpType) -> Result<XpTypeConfig> {
    let config = self.store.add_xp_type(input).await.map_err(Into::into)?;
    info!(
      xp_type = %config.type_id,
      name = %config.name,
      points = config.points,
      "xp type defined"
    );
    Ok(config)
  }

  /// Toggle a type. Deactivation blocks new grants and nothing else; past
  /// events are history.
  pub async fn set_type_active(
    &self,
    type_id: Uuid,
    active: bool,
  ) -> Result<XpTypeConfig> {
    self
      .store
      .set_xp_type_active(type_id, active)
      .await
      .map_err(Into::into)?
      .ok_or(Error::TypeNotFound(type_id))
  }
}
