//! Service layer of the Laurel gamification ledger.
//!
//! Every service is generic over a [`laurel_core::store::LedgerStore`]
//! backend and returns errors from the core taxonomy. Nothing here caches
//! mutable state between calls: the active season is resolved fresh on every
//! operation, so administrative changes are visible immediately.

pub mod achievements;
pub mod config;
pub mod grants;
pub mod ledger;
pub mod ranking;
pub mod recalc;
pub mod seasons;

use laurel_core::store::LedgerStore;

pub use config::{EngineConfig, RatingScale};

/// Convenience bundle wiring every service onto one shared store.
///
/// The individual services stay independently constructible; collaborators
/// that only rank, for example, can hold a [`ranking::RankingEngine`] alone.
#[derive(Clone)]
pub struct Engine<L> {
  pub seasons:      seasons::SeasonRegistry<L>,
  pub ledger:       ledger::XpLedger<L>,
  pub grants:       grants::GrantService<L>,
  pub rankings:     ranking::RankingEngine<L>,
  pub achievements: achievements::AchievementEvaluator<L>,
  pub recalc:       recalc::RecalculationOrchestrator<L>,
}

impl<L: LedgerStore + Clone> Engine<L> {
  pub fn new(store: L, config: EngineConfig) -> Self {
    Self {
      seasons:      seasons::SeasonRegistry::new(store.clone()),
      ledger:       ledger::XpLedger::new(store.clone(), config.rating_scale),
      grants:       grants::GrantService::new(store.clone(), config.daily_grant_limit),
      rankings:     ranking::RankingEngine::new(store.clone(), config.curve),
      achievements: achievements::AchievementEvaluator::new(store.clone()),
      recalc:       recalc::RecalculationOrchestrator::new(store),
    }
  }
}
