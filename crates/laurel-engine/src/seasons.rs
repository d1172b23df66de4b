//! The Season Registry — owner of the "exactly one active season" invariant.
//!
//! The registry never caches the active season across calls; it is derived
//! by query every time, so an administrative activation is visible to the
//! very next operation.

use laurel_core::{
  season::{NewSeason, Season, SeasonSelector},
  store::LedgerStore,
  Error, Result,
};
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct SeasonRegistry<L> {
  store: L,
}

impl<L: LedgerStore> SeasonRegistry<L> {
  pub fn new(store: L) -> Self {
    Self { store }
  }

  /// Create a new, inactive season after validating its multiplier.
  pub async fn create(&self, input: NewSeason) -> Result<Season> {
    input.validate()?;
    let season = self.store.add_season(input).await.map_err(Into::into)?;
    info!(season = %season.season_id, name = %season.name, "season created");
    Ok(season)
  }

  /// Atomically deactivate every other season and activate `season_id`.
  pub async fn activate(&self, season_id: Uuid) -> Result<Season> {
    let season = self
      .store
      .activate_season(season_id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::SeasonNotFound(season_id))?;
    info!(season = %season.season_id, name = %season.name, "season activated");
    Ok(season)
  }

  /// The single active season, or `None`.
  pub async fn current(&self) -> Result<Option<Season>> {
    self.store.current_season().await.map_err(Into::into)
  }

  /// The active season, or [`Error::NoActiveSeason`] — the hard stop for
  /// XP-producing operations.
  pub async fn require_current(&self) -> Result<Season> {
    self.current().await?.ok_or(Error::NoActiveSeason)
  }

  /// Resolve a season by id or relative period. Total: an unknown explicit
  /// id and a missing relative season both yield `None`.
  pub async fn resolve(&self, selector: SeasonSelector) -> Result<Option<Season>> {
    match selector {
      SeasonSelector::Explicit(id) => {
        self.store.get_season(id).await.map_err(Into::into)
      }
      SeasonSelector::Current => self.current().await,
      SeasonSelector::Previous => {
        let Some(current) = self.current().await? else {
          return Ok(None);
        };
        let seasons = self.store.list_seasons().await.map_err(Into::into)?;
        Ok(
          seasons
            .into_iter()
            .filter(|s| s.ends_on < current.starts_on)
            .max_by_key(|s| s.ends_on),
        )
      }
    }
  }

  /// Administrative multiplier edit. Future events snapshot the new value;
  /// history keeps the old one.
  pub async fn set_multiplier(
    &self,
    season_id: Uuid,
    xp_multiplier: f64,
  ) -> Result<Season> {
    if !xp_multiplier.is_finite() || xp_multiplier <= 0.0 {
      return Err(Error::InvalidMultiplier(xp_multiplier));
    }
    self
      .store
      .set_season_multiplier(season_id, xp_multiplier)
      .await
      .map_err(Into::into)?
      .ok_or(Error::SeasonNotFound(season_id))
  }
}
