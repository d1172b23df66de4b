//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use laurel_core::{
  achievement::{AchievementProgress, NewAchievementRule, RuleCondition},
  event::{NewXpEvent, XpSource},
  grant::{NewXpGrant, NewXpType},
  season::NewSeason,
  store::{EventQuery, LedgerStore, SeasonFilter},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn season_input(name: &str, year: i32, multiplier: f64) -> NewSeason {
  NewSeason {
    name:          name.into(),
    starts_on:     NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
    ends_on:       NaiveDate::from_ymd_opt(year, 3, 31).unwrap(),
    xp_multiplier: multiplier,
  }
}

fn eval_event(
  attendant: Uuid,
  season: Option<Uuid>,
  base: i64,
  multiplier: f64,
) -> NewXpEvent {
  NewXpEvent {
    attendant_id: attendant,
    season_id: season,
    source: XpSource::Evaluation,
    base_points: base,
    multiplier,
    reason: "5-star rating".into(),
    related_id: None,
  }
}

fn bonus_type(creator: Uuid, points: i64) -> NewXpType {
  NewXpType {
    name: "Team spirit".into(),
    points,
    category: "teamwork".into(),
    created_by: creator,
  }
}

// ─── Seasons ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_season() {
  let s = store().await;

  let season = s.add_season(season_input("Q1", 2024, 1.5)).await.unwrap();
  assert!(!season.active);

  let fetched = s.get_season(season.season_id).await.unwrap().unwrap();
  assert_eq!(fetched.season_id, season.season_id);
  assert_eq!(fetched.name, "Q1");
  assert_eq!(fetched.xp_multiplier, 1.5);
  assert_eq!(
    fetched.starts_on,
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
  );
}

#[tokio::test]
async fn get_season_missing_returns_none() {
  let s = store().await;
  assert!(s.get_season(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn activation_is_exclusive_across_any_sequence() {
  let s = store().await;
  let a = s.add_season(season_input("Q1", 2024, 1.0)).await.unwrap();
  let b = s.add_season(season_input("Q2", 2024, 2.0)).await.unwrap();
  let c = s.add_season(season_input("Q3", 2024, 1.5)).await.unwrap();

  for target in [&a, &b, &c, &a, &c] {
    let activated = s.activate_season(target.season_id).await.unwrap().unwrap();
    assert!(activated.active);

    let active: Vec<_> = s
      .list_seasons()
      .await
      .unwrap()
      .into_iter()
      .filter(|x| x.active)
      .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].season_id, target.season_id);
  }
}

#[tokio::test]
async fn activate_unknown_season_leaves_current_untouched() {
  let s = store().await;
  let season = s.add_season(season_input("Q1", 2024, 1.0)).await.unwrap();
  s.activate_season(season.season_id).await.unwrap().unwrap();

  let result = s.activate_season(Uuid::new_v4()).await.unwrap();
  assert!(result.is_none());

  // The blanket deactivation must have been rolled back.
  let current = s.current_season().await.unwrap().unwrap();
  assert_eq!(current.season_id, season.season_id);
}

#[tokio::test]
async fn current_season_is_none_before_any_activation() {
  let s = store().await;
  s.add_season(season_input("Q1", 2024, 1.0)).await.unwrap();
  assert!(s.current_season().await.unwrap().is_none());
}

#[tokio::test]
async fn multiplier_edit_does_not_touch_recorded_events() {
  let s = store().await;
  let season = s.add_season(season_input("Q1", 2024, 2.0)).await.unwrap();
  let attendant = Uuid::new_v4();

  let event = s
    .append_event(eval_event(attendant, Some(season.season_id), 100, 2.0))
    .await
    .unwrap();
  assert_eq!(event.points, 200);

  s.set_season_multiplier(season.season_id, 3.0)
    .await
    .unwrap()
    .unwrap();

  let events = s
    .list_events(&EventQuery::attendant(attendant))
    .await
    .unwrap();
  assert_eq!(events.len(), 1);
  assert_eq!(events[0].multiplier, 2.0);
  assert_eq!(events[0].points, 200);
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn append_event_computes_multiplied_points() {
  let s = store().await;
  let attendant = Uuid::new_v4();

  let event = s
    .append_event(eval_event(attendant, None, 5, 1.5))
    .await
    .unwrap();
  assert_eq!(event.base_points, 5);
  assert_eq!(event.points, 8); // 7.5 rounds half to even

  let events = s
    .list_events(&EventQuery::attendant(attendant))
    .await
    .unwrap();
  assert_eq!(events.len(), 1);
  assert_eq!(events[0].event_id, event.event_id);
  assert_eq!(events[0].points, 8);
}

#[tokio::test]
async fn list_events_filters_by_season_scope() {
  let s = store().await;
  let season = s.add_season(season_input("Q1", 2024, 1.0)).await.unwrap();
  let attendant = Uuid::new_v4();

  s.append_event(eval_event(attendant, Some(season.season_id), 10, 1.0))
    .await
    .unwrap();
  s.append_event(eval_event(attendant, None, 3, 1.0))
    .await
    .unwrap();

  let lifetime = s
    .list_events(&EventQuery::attendant(attendant))
    .await
    .unwrap();
  assert_eq!(lifetime.len(), 2);

  let scoped = s
    .list_events(&EventQuery {
      attendant: Some(attendant),
      season: SeasonFilter::In(season.season_id),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(scoped.len(), 1);
  assert_eq!(scoped[0].base_points, 10);

  let unscoped = s
    .list_events(&EventQuery {
      attendant: Some(attendant),
      season: SeasonFilter::Unscoped,
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(unscoped.len(), 1);
  assert_eq!(unscoped[0].base_points, 3);
}

#[tokio::test]
async fn list_events_filters_by_source_and_point_bounds() {
  let s = store().await;
  let attendant = Uuid::new_v4();

  s.append_event(eval_event(attendant, None, -5, 1.0))
    .await
    .unwrap();
  s.append_event(eval_event(attendant, None, 5, 1.0))
    .await
    .unwrap();
  s.append_event(NewXpEvent {
    source: XpSource::Achievement,
    ..eval_event(attendant, None, 50, 1.0)
  })
  .await
  .unwrap();

  let achievements = s
    .list_events(&EventQuery {
      attendant: Some(attendant),
      source: Some(XpSource::Achievement),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(achievements.len(), 1);
  assert_eq!(achievements[0].base_points, 50);

  let positive = s
    .list_events(&EventQuery {
      attendant: Some(attendant),
      min_points: Some(0),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(positive.len(), 2);
}

#[tokio::test]
async fn list_events_orders_by_recorded_at() {
  let s = store().await;
  let attendant = Uuid::new_v4();

  let first = s
    .append_event(eval_event(attendant, None, 1, 1.0))
    .await
    .unwrap();
  let second = s
    .append_event(eval_event(attendant, None, 2, 1.0))
    .await
    .unwrap();

  let events = s
    .list_events(&EventQuery::attendant(attendant))
    .await
    .unwrap();
  let ids: Vec<_> = events.iter().map(|e| e.event_id).collect();
  assert_eq!(ids, vec![first.event_id, second.event_id]);
}

// ─── Grants ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn grant_and_event_are_written_together() {
  let s = store().await;
  let granter = Uuid::new_v4();
  let attendant = Uuid::new_v4();
  let xp_type = s.add_xp_type(bonus_type(granter, 25)).await.unwrap();

  let (grant, event) = s
    .insert_grant_with_event(
      NewXpGrant {
        attendant_id:  attendant,
        type_id:       xp_type.type_id,
        granter_id:    granter,
        justification: "great quarter".into(),
      },
      NewXpEvent {
        source: XpSource::ManualGrant,
        ..eval_event(attendant, None, 25, 1.0)
      },
    )
    .await
    .unwrap();

  assert_eq!(grant.xp_event_id, event.event_id);

  let fetched = s.get_grant(grant.grant_id).await.unwrap().unwrap();
  assert_eq!(fetched.xp_event_id, event.event_id);

  let events = s
    .list_events(&EventQuery::attendant(attendant))
    .await
    .unwrap();
  assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn failed_grant_writes_neither_row() {
  let s = store().await;
  let attendant = Uuid::new_v4();

  // Unknown type id trips the xp_grants foreign key after the event insert;
  // the transaction must roll both rows back.
  let result = s
    .insert_grant_with_event(
      NewXpGrant {
        attendant_id:  attendant,
        type_id:       Uuid::new_v4(),
        granter_id:    Uuid::new_v4(),
        justification: "doomed".into(),
      },
      NewXpEvent {
        source: XpSource::ManualGrant,
        ..eval_event(attendant, None, 25, 1.0)
      },
    )
    .await;
  assert!(result.is_err());

  let events = s
    .list_events(&EventQuery::attendant(attendant))
    .await
    .unwrap();
  assert!(events.is_empty());
}

#[tokio::test]
async fn granted_base_points_sum_per_granter_and_day() {
  let s = store().await;
  let granter = Uuid::new_v4();
  let other = Uuid::new_v4();
  let attendant = Uuid::new_v4();
  let xp_type = s.add_xp_type(bonus_type(granter, 30)).await.unwrap();

  for g in [granter, granter, other] {
    s.insert_grant_with_event(
      NewXpGrant {
        attendant_id:  attendant,
        type_id:       xp_type.type_id,
        granter_id:    g,
        justification: "bonus".into(),
      },
      NewXpEvent {
        source: XpSource::ManualGrant,
        ..eval_event(attendant, None, 30, 1.0)
      },
    )
    .await
    .unwrap();
  }

  let today = chrono::Utc::now().date_naive();
  assert_eq!(s.base_points_granted_on(granter, today).await.unwrap(), 60);
  assert_eq!(s.base_points_granted_on(other, today).await.unwrap(), 30);

  let yesterday = today - chrono::Duration::days(1);
  assert_eq!(s.base_points_granted_on(granter, yesterday).await.unwrap(), 0);
}

#[tokio::test]
async fn orphaned_grant_detection() {
  let s = store().await;
  assert!(s.orphaned_grants().await.unwrap().is_empty());

  // Simulate external tampering: a grant row whose event vanished.
  let grant_id = Uuid::new_v4();
  s.conn
    .call(move |conn| {
      conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
      conn.execute(
        "INSERT INTO xp_grants (grant_id, attendant_id, type_id, granter_id,
                                justification, xp_event_id, granted_at)
         VALUES (?1, ?2, ?3, ?4, 'lost event', ?5,
                 '2024-01-01T00:00:00+00:00')",
        rusqlite::params![
          grant_id.hyphenated().to_string(),
          Uuid::new_v4().hyphenated().to_string(),
          Uuid::new_v4().hyphenated().to_string(),
          Uuid::new_v4().hyphenated().to_string(),
          Uuid::new_v4().hyphenated().to_string(),
        ],
      )?;
      conn.execute_batch("PRAGMA foreign_keys = ON;")?;
      Ok(())
    })
    .await
    .unwrap();

  let orphans = s.orphaned_grants().await.unwrap();
  assert_eq!(orphans.len(), 1);
  assert_eq!(orphans[0].grant_id, grant_id);
}

// ─── XP types ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn xp_type_lifecycle() {
  let s = store().await;
  let creator = Uuid::new_v4();

  let xp_type = s.add_xp_type(bonus_type(creator, 25)).await.unwrap();
  assert!(xp_type.active);

  let fetched = s.get_xp_type(xp_type.type_id).await.unwrap().unwrap();
  assert_eq!(fetched.name, "Team spirit");
  assert_eq!(fetched.points, 25);

  let deactivated = s
    .set_xp_type_active(xp_type.type_id, false)
    .await
    .unwrap()
    .unwrap();
  assert!(!deactivated.active);

  assert!(
    s.set_xp_type_active(Uuid::new_v4(), false)
      .await
      .unwrap()
      .is_none()
  );
}

// ─── Achievements ────────────────────────────────────────────────────────────

#[tokio::test]
async fn rule_roundtrip_preserves_condition() {
  let s = store().await;

  let rule = s
    .add_rule(NewAchievementRule {
      title:     "Centurion".into(),
      xp_reward: 50,
      condition: RuleCondition::All {
        conditions: vec![
          RuleCondition::TotalXpAtLeast { threshold: 100 },
          RuleCondition::EventCountAtLeast {
            count:  10,
            source: Some(XpSource::Evaluation),
          },
        ],
      },
    })
    .await
    .unwrap();

  let fetched = s.get_rule(rule.rule_id).await.unwrap().unwrap();
  assert_eq!(fetched.title, "Centurion");
  assert!(matches!(
    fetched.condition,
    RuleCondition::All { ref conditions } if conditions.len() == 2
  ));
}

#[tokio::test]
async fn list_rules_active_only() {
  let s = store().await;

  let keep = s
    .add_rule(NewAchievementRule {
      title:     "Keep".into(),
      xp_reward: 0,
      condition: RuleCondition::TotalXpAtLeast { threshold: 10 },
    })
    .await
    .unwrap();
  let retire = s
    .add_rule(NewAchievementRule {
      title:     "Retire".into(),
      xp_reward: 0,
      condition: RuleCondition::TotalXpAtLeast { threshold: 10 },
    })
    .await
    .unwrap();
  s.set_rule_active(retire.rule_id, false).await.unwrap();

  let active = s.list_rules(true).await.unwrap();
  assert_eq!(active.len(), 1);
  assert_eq!(active[0].rule_id, keep.rule_id);

  assert_eq!(s.list_rules(false).await.unwrap().len(), 2);
}

#[tokio::test]
async fn progress_upsert_overwrites() {
  let s = store().await;
  let rule = s
    .add_rule(NewAchievementRule {
      title:     "Steady".into(),
      xp_reward: 0,
      condition: RuleCondition::TotalXpAtLeast { threshold: 100 },
    })
    .await
    .unwrap();
  let attendant = Uuid::new_v4();

  assert!(
    s.get_progress(attendant, rule.rule_id)
      .await
      .unwrap()
      .is_none()
  );

  let mut progress = AchievementProgress::locked(attendant, rule.rule_id);
  progress.progress = 40;
  s.upsert_progress(progress.clone()).await.unwrap();

  progress.progress = 100;
  progress.unlocked_at = Some(chrono::Utc::now());
  s.upsert_progress(progress).await.unwrap();

  let stored = s
    .get_progress(attendant, rule.rule_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(stored.progress, 100);
  assert!(stored.unlocked_at.is_some());

  assert_eq!(s.list_progress(attendant).await.unwrap().len(), 1);
}
