//! [`SqliteStore`] — the SQLite implementation of [`LedgerStore`].

use std::path::Path;

use chrono::{NaiveDate, NaiveTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use laurel_core::{
  achievement::{AchievementProgress, AchievementRule, NewAchievementRule},
  event::{NewXpEvent, XpEvent},
  grant::{NewXpGrant, NewXpType, XpGrant, XpTypeConfig},
  season::{NewSeason, Season},
  store::{EventQuery, LedgerStore, SeasonFilter},
};

use crate::{
  encode::{
    encode_condition, encode_date, encode_dt, encode_source, encode_uuid,
    RawProgress, RawRule, RawSeason, RawXpEvent, RawXpGrant, RawXpType,
  },
  schema::SCHEMA,
  Error, Result,
};

const SEASON_COLS: &str =
  "season_id, name, starts_on, ends_on, active, xp_multiplier";
const GRANT_COLS: &str = "grant_id, attendant_id, type_id, granter_id, \
                          justification, xp_event_id, granted_at";
const TYPE_COLS: &str = "type_id, name, points, active, category, created_by";

fn season_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSeason> {
  Ok(RawSeason {
    season_id:     row.get(0)?,
    name:          row.get(1)?,
    starts_on:     row.get(2)?,
    ends_on:       row.get(3)?,
    active:        row.get(4)?,
    xp_multiplier: row.get(5)?,
  })
}

fn event_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawXpEvent> {
  Ok(RawXpEvent {
    event_id:     row.get(0)?,
    attendant_id: row.get(1)?,
    season_id:    row.get(2)?,
    source:       row.get(3)?,
    base_points:  row.get(4)?,
    multiplier:   row.get(5)?,
    points:       row.get(6)?,
    reason:       row.get(7)?,
    related_id:   row.get(8)?,
    recorded_at:  row.get(9)?,
  })
}

fn grant_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawXpGrant> {
  Ok(RawXpGrant {
    grant_id:      row.get(0)?,
    attendant_id:  row.get(1)?,
    type_id:       row.get(2)?,
    granter_id:    row.get(3)?,
    justification: row.get(4)?,
    xp_event_id:   row.get(5)?,
    granted_at:    row.get(6)?,
  })
}

fn type_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawXpType> {
  Ok(RawXpType {
    type_id:    row.get(0)?,
    name:       row.get(1)?,
    points:     row.get(2)?,
    active:     row.get(3)?,
    category:   row.get(4)?,
    created_by: row.get(5)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Laurel ledger backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert a fully-built [`XpEvent`]. Takes a plain connection so it also
  /// works inside a transaction via deref.
  fn insert_event(
    conn: &rusqlite::Connection,
    event: &XpEvent,
  ) -> rusqlite::Result<()> {
    conn.execute(
      "INSERT INTO xp_events (
         event_id, attendant_id, season_id, source, base_points,
         multiplier, points, reason, related_id, recorded_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
      rusqlite::params![
        encode_uuid(event.event_id),
        encode_uuid(event.attendant_id),
        event.season_id.map(encode_uuid),
        encode_source(event.source),
        event.base_points,
        event.multiplier,
        event.points,
        event.reason,
        event.related_id.map(encode_uuid),
        encode_dt(event.recorded_at),
      ],
    )?;
    Ok(())
  }

  /// Materialise a [`NewXpEvent`] with a fresh id and a store-assigned
  /// timestamp.
  fn build_event(input: NewXpEvent) -> XpEvent {
    let points = input.points();
    XpEvent {
      event_id: Uuid::new_v4(),
      attendant_id: input.attendant_id,
      season_id: input.season_id,
      source: input.source,
      base_points: input.base_points,
      multiplier: input.multiplier,
      points,
      reason: input.reason,
      related_id: input.related_id,
      recorded_at: Utc::now(),
    }
  }
}

// ─── LedgerStore impl ────────────────────────────────────────────────────────

impl LedgerStore for SqliteStore {
  type Error = Error;

  // ── Seasons ───────────────────────────────────────────────────────────────

  async fn add_season(&self, input: NewSeason) -> Result<Season> {
    let season = Season {
      season_id:     Uuid::new_v4(),
      name:          input.name,
      starts_on:     input.starts_on,
      ends_on:       input.ends_on,
      active:        false,
      xp_multiplier: input.xp_multiplier,
    };

    let id_str     = encode_uuid(season.season_id);
    let name       = season.name.clone();
    let starts_str = encode_date(season.starts_on);
    let ends_str   = encode_date(season.ends_on);
    let multiplier = season.xp_multiplier;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO seasons (season_id, name, starts_on, ends_on, active, xp_multiplier)
           VALUES (?1, ?2, ?3, ?4, 0, ?5)",
          rusqlite::params![id_str, name, starts_str, ends_str, multiplier],
        )?;
        Ok(())
      })
      .await?;

    Ok(season)
  }

  async fn get_season(&self, id: Uuid) -> Result<Option<Season>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSeason> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {SEASON_COLS} FROM seasons WHERE season_id = ?1"),
              rusqlite::params![id_str],
              season_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSeason::into_season).transpose()
  }

  async fn list_seasons(&self) -> Result<Vec<Season>> {
    let raws: Vec<RawSeason> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SEASON_COLS} FROM seasons ORDER BY starts_on ASC"
        ))?;
        let rows = stmt
          .query_map([], season_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSeason::into_season).collect()
  }

  async fn activate_season(&self, id: Uuid) -> Result<Option<Season>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSeason> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // Flip everything off first so the partial unique index never sees
        // two active rows, even transiently.
        tx.execute("UPDATE seasons SET active = 0 WHERE active = 1", [])?;
        let updated = tx.execute(
          "UPDATE seasons SET active = 1 WHERE season_id = ?1",
          rusqlite::params![id_str],
        )?;

        if updated == 0 {
          // Unknown id: dropping the transaction rolls back the blanket
          // deactivation above.
          return Ok(None);
        }

        let raw = tx.query_row(
          &format!("SELECT {SEASON_COLS} FROM seasons WHERE season_id = ?1"),
          rusqlite::params![id_str],
          season_from_row,
        )?;
        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawSeason::into_season).transpose()
  }

  async fn current_season(&self) -> Result<Option<Season>> {
    let raw: Option<RawSeason> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {SEASON_COLS} FROM seasons WHERE active = 1"),
              [],
              season_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSeason::into_season).transpose()
  }

  async fn set_season_multiplier(
    &self,
    id: Uuid,
    xp_multiplier: f64,
  ) -> Result<Option<Season>> {
    let id_str = encode_uuid(id);

    let updated: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE seasons SET xp_multiplier = ?2 WHERE season_id = ?1",
          rusqlite::params![id_str, xp_multiplier],
        )?)
      })
      .await?;

    if updated == 0 {
      return Ok(None);
    }
    self.get_season(id).await
  }

  async fn active_seasons(&self) -> Result<Vec<Season>> {
    let raws: Vec<RawSeason> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SEASON_COLS} FROM seasons WHERE active = 1"
        ))?;
        let rows = stmt
          .query_map([], season_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSeason::into_season).collect()
  }

  // ── Events — append-only writes ───────────────────────────────────────────

  async fn append_event(&self, input: NewXpEvent) -> Result<XpEvent> {
    let event = Self::build_event(input);
    let stored = event.clone();

    self
      .conn
      .call(move |conn| {
        Self::insert_event(conn, &stored)?;
        Ok(())
      })
      .await?;

    Ok(event)
  }

  async fn list_events(&self, query: &EventQuery) -> Result<Vec<XpEvent>> {
    let attendant_str = query.attendant.map(encode_uuid);
    let (season_null, season_str) = match query.season {
      SeasonFilter::Any => (false, None),
      SeasonFilter::Unscoped => (true, None),
      SeasonFilter::In(id) => (false, Some(encode_uuid(id))),
    };
    let source_str  = query.source.map(|s| encode_source(s).to_owned());
    let granter_str = query.granter.map(encode_uuid);
    let after_str   = query.recorded_after.map(encode_dt);
    let before_str  = query.recorded_before.map(encode_dt);
    let min_points  = query.min_points;
    let max_points  = query.max_points;

    let raws: Vec<RawXpEvent> = self
      .conn
      .call(move |conn| {
        // Build the WHERE clause dynamically; every bound value keeps its
        // positional index in lock-step with `params`.
        let mut conds: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql + Send>> = Vec::new();

        if let Some(v) = attendant_str {
          params.push(Box::new(v));
          conds.push(format!("e.attendant_id = ?{}", params.len()));
        }
        if season_null {
          conds.push("e.season_id IS NULL".to_owned());
        }
        if let Some(v) = season_str {
          params.push(Box::new(v));
          conds.push(format!("e.season_id = ?{}", params.len()));
        }
        if let Some(v) = source_str {
          params.push(Box::new(v));
          conds.push(format!("e.source = ?{}", params.len()));
        }
        if let Some(v) = granter_str {
          params.push(Box::new(v));
          conds.push(format!(
            "EXISTS (SELECT 1 FROM xp_grants g
                     WHERE g.xp_event_id = e.event_id AND g.granter_id = ?{})",
            params.len()
          ));
        }
        if let Some(v) = after_str {
          params.push(Box::new(v));
          conds.push(format!("e.recorded_at >= ?{}", params.len()));
        }
        if let Some(v) = before_str {
          params.push(Box::new(v));
          conds.push(format!("e.recorded_at < ?{}", params.len()));
        }
        if let Some(v) = min_points {
          params.push(Box::new(v));
          conds.push(format!("e.points >= ?{}", params.len()));
        }
        if let Some(v) = max_points {
          params.push(Box::new(v));
          conds.push(format!("e.points <= ?{}", params.len()));
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let sql = format!(
          "SELECT e.event_id, e.attendant_id, e.season_id, e.source,
                  e.base_points, e.multiplier, e.points, e.reason,
                  e.related_id, e.recorded_at
           FROM xp_events e
           {where_clause}
           ORDER BY e.recorded_at ASC, e.event_id ASC"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), event_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawXpEvent::into_event).collect()
  }

  // ── Grants ────────────────────────────────────────────────────────────────

  async fn insert_grant_with_event(
    &self,
    grant: NewXpGrant,
    event: NewXpEvent,
  ) -> Result<(XpGrant, XpEvent)> {
    let event = Self::build_event(event);
    let grant = XpGrant {
      grant_id:      Uuid::new_v4(),
      attendant_id:  grant.attendant_id,
      type_id:       grant.type_id,
      granter_id:    grant.granter_id,
      justification: grant.justification,
      xp_event_id:   event.event_id,
      granted_at:    event.recorded_at,
    };

    let stored_event = event.clone();
    let grant_id_str   = encode_uuid(grant.grant_id);
    let attendant_str  = encode_uuid(grant.attendant_id);
    let type_str       = encode_uuid(grant.type_id);
    let granter_str    = encode_uuid(grant.granter_id);
    let justification  = grant.justification.clone();
    let event_id_str   = encode_uuid(grant.xp_event_id);
    let granted_at_str = encode_dt(grant.granted_at);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        Self::insert_event(&tx, &stored_event)?;
        tx.execute(
          "INSERT INTO xp_grants (
             grant_id, attendant_id, type_id, granter_id,
             justification, xp_event_id, granted_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            grant_id_str,
            attendant_str,
            type_str,
            granter_str,
            justification,
            event_id_str,
            granted_at_str,
          ],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok((grant, event))
  }

  async fn get_grant(&self, id: Uuid) -> Result<Option<XpGrant>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawXpGrant> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {GRANT_COLS} FROM xp_grants WHERE grant_id = ?1"),
              rusqlite::params![id_str],
              grant_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawXpGrant::into_grant).transpose()
  }

  async fn base_points_granted_on(
    &self,
    granter: Uuid,
    day: NaiveDate,
  ) -> Result<i64> {
    let granter_str = encode_uuid(granter);
    let day_start   = day.and_time(NaiveTime::MIN).and_utc();
    let start_str   = encode_dt(day_start);
    let end_str     = encode_dt(day_start + chrono::Duration::days(1));

    let sum: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COALESCE(SUM(e.base_points), 0)
           FROM xp_grants g
           JOIN xp_events e ON e.event_id = g.xp_event_id
           WHERE g.granter_id = ?1
             AND g.granted_at >= ?2
             AND g.granted_at < ?3",
          rusqlite::params![granter_str, start_str, end_str],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(sum)
  }

  async fn orphaned_grants(&self) -> Result<Vec<XpGrant>> {
    let raws: Vec<RawXpGrant> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT g.grant_id, g.attendant_id, g.type_id, g.granter_id,
                  g.justification, g.xp_event_id, g.granted_at
           FROM xp_grants g
           LEFT JOIN xp_events e ON e.event_id = g.xp_event_id
           WHERE e.event_id IS NULL",
        )?;
        let rows = stmt
          .query_map([], grant_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawXpGrant::into_grant).collect()
  }

  // ── XP type catalogue ─────────────────────────────────────────────────────

  async fn add_xp_type(&self, input: NewXpType) -> Result<XpTypeConfig> {
    let config = XpTypeConfig {
      type_id:    Uuid::new_v4(),
      name:       input.name,
      points:     input.points,
      active:     true,
      category:   input.category,
      created_by: input.created_by,
    };

    let id_str      = encode_uuid(config.type_id);
    let name        = config.name.clone();
    let points      = config.points;
    let category    = config.category.clone();
    let creator_str = encode_uuid(config.created_by);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO xp_types (type_id, name, points, active, category, created_by)
           VALUES (?1, ?2, ?3, 1, ?4, ?5)",
          rusqlite::params![id_str, name, points, category, creator_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(config)
  }

  async fn get_xp_type(&self, id: Uuid) -> Result<Option<XpTypeConfig>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawXpType> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {TYPE_COLS} FROM xp_types WHERE type_id = ?1"),
              rusqlite::params![id_str],
              type_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawXpType::into_type).transpose()
  }

  async fn list_xp_types(&self) -> Result<Vec<XpTypeConfig>> {
    let raws: Vec<RawXpType> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {TYPE_COLS} FROM xp_types ORDER BY name ASC"))?;
        let rows = stmt
          .query_map([], type_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawXpType::into_type).collect()
  }

  async fn set_xp_type_active(
    &self,
    id: Uuid,
    active: bool,
  ) -> Result<Option<XpTypeConfig>> {
    let id_str = encode_uuid(id);

    let updated: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE xp_types SET active = ?2 WHERE type_id = ?1",
          rusqlite::params![id_str, active],
        )?)
      })
      .await?;

    if updated == 0 {
      return Ok(None);
    }
    self.get_xp_type(id).await
  }

  // ── Achievements ──────────────────────────────────────────────────────────

  async fn add_rule(&self, input: NewAchievementRule) -> Result<AchievementRule> {
    let rule = AchievementRule {
      rule_id:   Uuid::new_v4(),
      title:     input.title,
      xp_reward: input.xp_reward,
      condition: input.condition,
      active:    true,
    };

    let id_str        = encode_uuid(rule.rule_id);
    let title         = rule.title.clone();
    let xp_reward     = rule.xp_reward;
    let condition_str = encode_condition(&rule.condition)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO achievement_rules (rule_id, title, xp_reward, condition_json, active)
           VALUES (?1, ?2, ?3, ?4, 1)",
          rusqlite::params![id_str, title, xp_reward, condition_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(rule)
  }

  async fn get_rule(&self, id: Uuid) -> Result<Option<AchievementRule>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawRule> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT rule_id, title, xp_reward, condition_json, active
               FROM achievement_rules WHERE rule_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawRule {
                  rule_id:        row.get(0)?,
                  title:          row.get(1)?,
                  xp_reward:      row.get(2)?,
                  condition_json: row.get(3)?,
                  active:         row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRule::into_rule).transpose()
  }

  async fn list_rules(&self, active_only: bool) -> Result<Vec<AchievementRule>> {
    let raws: Vec<RawRule> = self
      .conn
      .call(move |conn| {
        let sql = if active_only {
          "SELECT rule_id, title, xp_reward, condition_json, active
           FROM achievement_rules WHERE active = 1 ORDER BY title ASC"
        } else {
          "SELECT rule_id, title, xp_reward, condition_json, active
           FROM achievement_rules ORDER BY title ASC"
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawRule {
              rule_id:        row.get(0)?,
              title:          row.get(1)?,
              xp_reward:      row.get(2)?,
              condition_json: row.get(3)?,
              active:         row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRule::into_rule).collect()
  }

  async fn set_rule_active(
    &self,
    id: Uuid,
    active: bool,
  ) -> Result<Option<AchievementRule>> {
    let id_str = encode_uuid(id);

    let updated: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE achievement_rules SET active = ?2 WHERE rule_id = ?1",
          rusqlite::params![id_str, active],
        )?)
      })
      .await?;

    if updated == 0 {
      return Ok(None);
    }
    self.get_rule(id).await
  }

  async fn get_progress(
    &self,
    attendant: Uuid,
    rule: Uuid,
  ) -> Result<Option<AchievementProgress>> {
    let attendant_str = encode_uuid(attendant);
    let rule_str      = encode_uuid(rule);

    let raw: Option<RawProgress> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT attendant_id, rule_id, progress, unlocked_at
               FROM achievement_progress
               WHERE attendant_id = ?1 AND rule_id = ?2",
              rusqlite::params![attendant_str, rule_str],
              |row| {
                Ok(RawProgress {
                  attendant_id: row.get(0)?,
                  rule_id:      row.get(1)?,
                  progress:     row.get(2)?,
                  unlocked_at:  row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProgress::into_progress).transpose()
  }

  async fn list_progress(&self, attendant: Uuid) -> Result<Vec<AchievementProgress>> {
    let attendant_str = encode_uuid(attendant);

    let raws: Vec<RawProgress> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT attendant_id, rule_id, progress, unlocked_at
           FROM achievement_progress WHERE attendant_id = ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![attendant_str], |row| {
            Ok(RawProgress {
              attendant_id: row.get(0)?,
              rule_id:      row.get(1)?,
              progress:     row.get(2)?,
              unlocked_at:  row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProgress::into_progress).collect()
  }

  async fn upsert_progress(
    &self,
    progress: AchievementProgress,
  ) -> Result<AchievementProgress> {
    let attendant_str = encode_uuid(progress.attendant_id);
    let rule_str      = encode_uuid(progress.rule_id);
    let value         = i64::from(progress.progress);
    let unlocked_str  = progress.unlocked_at.map(encode_dt);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO achievement_progress (attendant_id, rule_id, progress, unlocked_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (attendant_id, rule_id)
           DO UPDATE SET progress = excluded.progress,
                         unlocked_at = excluded.unlocked_at",
          rusqlite::params![attendant_str, rule_str, value, unlocked_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(progress)
  }
}
