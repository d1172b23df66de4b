//! The Achievement Evaluator — progress state machine and reward emission.
//!
//! Per (attendant, rule) pair the lifecycle is Locked → InProgress →
//! Unlocked, terminal. Progress only moves up; the first transition to 100
//! stamps `unlocked_at` and records the reward event exactly once.

use chrono::Utc;
use laurel_core::{
  achievement::{
    AchievementProgress, AchievementRule, AttendantSnapshot,
    NewAchievementRule,
  },
  event::{NewXpEvent, XpSource},
  store::{EventQuery, LedgerStore},
  Error, Result,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{ledger::guarded_events, seasons::SeasonRegistry};

#[derive(Clone)]
pub struct AchievementEvaluator<L> {
  store:   L,
  seasons: SeasonRegistry<L>,
}

impl<L: LedgerStore + Clone> AchievementEvaluator<L> {
  pub fn new(store: L) -> Self {
    Self {
      seasons: SeasonRegistry::new(store.clone()),
      store,
    }
  }

  /// Register a new achievement rule.
  pub async fn define_rule(
    &self,
    input: NewAchievementRule,
  ) -> Result<AchievementRule> {
    let rule = self.store.add_rule(input).await.map_err(Into::into)?;
    info!(rule = %rule.rule_id, title = %rule.title, "achievement rule defined");
    Ok(rule)
  }

  /// Toggle a rule. Inactive rules are skipped by evaluation and reject
  /// direct progress updates.
  pub async fn set_rule_active(
    &self,
    rule_id: Uuid,
    active: bool,
  ) -> Result<AchievementRule> {
    self
      .store
      .set_rule_active(rule_id, active)
      .await
      .map_err(Into::into)?
      .ok_or(Error::RuleNotFound(rule_id))
  }

  /// Re-evaluate every active rule against the attendant's aggregated
  /// state and apply the resulting progress. Returns the resulting
  /// progress per rule; rows still at zero are not persisted.
  pub async fn refresh(
    &self,
    attendant_id: Uuid,
  ) -> Result<Vec<AchievementProgress>> {
    let snapshot = self.snapshot(attendant_id).await?;
    let rules = self.store.list_rules(true).await.map_err(Into::into)?;

    let mut results = Vec::with_capacity(rules.len());
    for rule in rules {
      let target = rule.condition.progress(&snapshot);
      results.push(
        self
          .apply_progress(&rule, attendant_id, target, false)
          .await?,
      );
    }
    Ok(results)
  }

  /// Direct progress update from the administration collaborator.
  ///
  /// Unlike [`refresh`](Self::refresh), a value below the stored progress
  /// is an error here rather than a silent keep.
  pub async fn set_progress(
    &self,
    attendant_id: Uuid,
    rule_id: Uuid,
    value: u8,
  ) -> Result<AchievementProgress> {
    let rule = self
      .store
      .get_rule(rule_id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::RuleNotFound(rule_id))?;
    if !rule.active {
      return Err(Error::InactiveRule(rule_id));
    }
    self
      .apply_progress(&rule, attendant_id, value.min(100), true)
      .await
  }

  /// Administrative reversal of an unlocked achievement: appends a
  /// compensating event cancelling the net reward points and resets the
  /// progress row to Locked.
  pub async fn revoke(
    &self,
    attendant_id: Uuid,
    rule_id: Uuid,
  ) -> Result<AchievementProgress> {
    let rule = self
      .store
      .get_rule(rule_id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::RuleNotFound(rule_id))?;

    let net_reward = self.net_reward_points(attendant_id, rule_id).await?;
    if net_reward != 0 {
      self
        .store
        .append_event(NewXpEvent::compensation(
          attendant_id,
          XpSource::Achievement,
          net_reward,
          format!("achievement reversal: {}", rule.title),
          Some(rule_id),
        ))
        .await
        .map_err(Into::into)?;
    }

    let reset = AchievementProgress::locked(attendant_id, rule_id);
    let stored = self
      .store
      .upsert_progress(reset)
      .await
      .map_err(Into::into)?;
    info!(
      attendant = %attendant_id,
      rule = %rule_id,
      retracted_points = net_reward,
      "achievement revoked"
    );
    Ok(stored)
  }

  async fn apply_progress(
    &self,
    rule: &AchievementRule,
    attendant_id: Uuid,
    value: u8,
    strict: bool,
  ) -> Result<AchievementProgress> {
    let stored = self
      .store
      .get_progress(attendant_id, rule.rule_id)
      .await
      .map_err(Into::into)?
      .unwrap_or_else(|| AchievementProgress::locked(attendant_id, rule.rule_id));

    // Unlocked is terminal: re-unlocking is a no-op and must never
    // duplicate the reward event.
    if stored.is_unlocked() {
      return Ok(stored);
    }

    if value < stored.progress {
      if strict {
        return Err(Error::ProgressNotMonotonic {
          current:   stored.progress,
          requested: value,
        });
      }
      // Aggregated totals can dip after a compensation; stored progress
      // stays put.
      return Ok(stored);
    }
    if value == stored.progress && value < 100 {
      return Ok(stored);
    }

    let mut next = stored;
    next.progress = value;
    if value >= 100 {
      next.unlocked_at = Some(Utc::now());
    }

    let saved = self
      .store
      .upsert_progress(next)
      .await
      .map_err(Into::into)?;

    if saved.is_unlocked() {
      info!(
        attendant = %attendant_id,
        rule = %rule.rule_id,
        title = %rule.title,
        "achievement unlocked"
      );
      self.reward(rule, attendant_id).await?;
    }
    Ok(saved)
  }

  /// Record the reward event for a fresh unlock, or skip it with a warning
  /// when no season is active. The skipped reward is lost, not deferred.
  async fn reward(&self, rule: &AchievementRule, attendant_id: Uuid) -> Result<()> {
    if rule.xp_reward <= 0 {
      return Ok(());
    }
    match self.seasons.current().await? {
      Some(season) => {
        let event = self
          .store
          .append_event(NewXpEvent {
            attendant_id,
            season_id: Some(season.season_id),
            source: XpSource::Achievement,
            base_points: rule.xp_reward,
            multiplier: season.xp_multiplier,
            reason: format!("achievement unlocked: {}", rule.title),
            related_id: Some(rule.rule_id),
          })
          .await
          .map_err(Into::into)?;
        info!(
          event = %event.event_id,
          points = event.points,
          "achievement reward recorded"
        );
      }
      None => {
        warn!(
          attendant = %attendant_id,
          rule = %rule.rule_id,
          reward = rule.xp_reward,
          "achievement unlocked outside any season; reward XP skipped"
        );
      }
    }
    Ok(())
  }

  /// Net achievement points this attendant currently holds for one rule —
  /// reward events minus any compensations already applied.
  async fn net_reward_points(
    &self,
    attendant_id: Uuid,
    rule_id: Uuid,
  ) -> Result<i64> {
    let query = EventQuery {
      attendant: Some(attendant_id),
      source: Some(XpSource::Achievement),
      ..Default::default()
    };
    let events = guarded_events(&self.store, &query).await?;
    Ok(
      events
        .iter()
        .filter(|e| e.related_id == Some(rule_id))
        .map(|e| e.points)
        .sum(),
    )
  }

  async fn snapshot(&self, attendant_id: Uuid) -> Result<AttendantSnapshot> {
    let events =
      guarded_events(&self.store, &EventQuery::attendant(attendant_id)).await?;

    let mut snapshot = AttendantSnapshot::default();
    for event in &events {
      snapshot.total_xp += event.points;
      match event.source {
        XpSource::Evaluation => snapshot.evaluation_events += 1,
        XpSource::ManualGrant => snapshot.grant_events += 1,
        XpSource::Achievement => snapshot.achievement_events += 1,
      }
    }
    Ok(snapshot)
  }
}
