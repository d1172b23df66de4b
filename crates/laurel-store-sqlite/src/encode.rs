//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings and calendar dates as
//! ISO 8601 (`YYYY-MM-DD`). Achievement conditions are stored as compact
//! JSON. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, Utc};
use laurel_core::{
  achievement::{AchievementProgress, AchievementRule, RuleCondition},
  event::{XpEvent, XpSource},
  grant::{XpGrant, XpTypeConfig},
  season::Season,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("date {s:?}: {e}")))
}

// ─── XpSource ────────────────────────────────────────────────────────────────

pub fn encode_source(source: XpSource) -> &'static str {
  match source {
    XpSource::Evaluation => "evaluation",
    XpSource::ManualGrant => "manual_grant",
    XpSource::Achievement => "achievement",
  }
}

pub fn decode_source(s: &str) -> Result<XpSource> {
  s.parse::<XpSource>()
    .map_err(|_| Error::Decode(format!("unknown xp source: {s:?}")))
}

// ─── RuleCondition ───────────────────────────────────────────────────────────

pub fn encode_condition(c: &RuleCondition) -> Result<String> {
  Ok(serde_json::to_string(c)?)
}

pub fn decode_condition(s: &str) -> Result<RuleCondition> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `seasons` row.
pub struct RawSeason {
  pub season_id:     String,
  pub name:          String,
  pub starts_on:     String,
  pub ends_on:       String,
  pub active:        bool,
  pub xp_multiplier: f64,
}

impl RawSeason {
  pub fn into_season(self) -> Result<Season> {
    Ok(Season {
      season_id:     decode_uuid(&self.season_id)?,
      name:          self.name,
      starts_on:     decode_date(&self.starts_on)?,
      ends_on:       decode_date(&self.ends_on)?,
      active:        self.active,
      xp_multiplier: self.xp_multiplier,
    })
  }
}

/// Raw strings read directly from an `xp_events` row.
pub struct RawXpEvent {
  pub event_id:     String,
  pub attendant_id: String,
  pub season_id:    Option<String>,
  pub source:       String,
  pub base_points:  i64,
  pub multiplier:   f64,
  pub points:       i64,
  pub reason:       String,
  pub related_id:   Option<String>,
  pub recorded_at:  String,
}

impl RawXpEvent {
  pub fn into_event(self) -> Result<XpEvent> {
    Ok(XpEvent {
      event_id:     decode_uuid(&self.event_id)?,
      attendant_id: decode_uuid(&self.attendant_id)?,
      season_id:    self.season_id.as_deref().map(decode_uuid).transpose()?,
      source:       decode_source(&self.source)?,
      base_points:  self.base_points,
      multiplier:   self.multiplier,
      points:       self.points,
      reason:       self.reason,
      related_id:   self.related_id.as_deref().map(decode_uuid).transpose()?,
      recorded_at:  decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw strings read directly from an `xp_grants` row.
pub struct RawXpGrant {
  pub grant_id:      String,
  pub attendant_id:  String,
  pub type_id:       String,
  pub granter_id:    String,
  pub justification: String,
  pub xp_event_id:   String,
  pub granted_at:    String,
}

impl RawXpGrant {
  pub fn into_grant(self) -> Result<XpGrant> {
    Ok(XpGrant {
      grant_id:      decode_uuid(&self.grant_id)?,
      attendant_id:  decode_uuid(&self.attendant_id)?,
      type_id:       decode_uuid(&self.type_id)?,
      granter_id:    decode_uuid(&self.granter_id)?,
      justification: self.justification,
      xp_event_id:   decode_uuid(&self.xp_event_id)?,
      granted_at:    decode_dt(&self.granted_at)?,
    })
  }
}

/// Raw strings read directly from an `xp_types` row.
pub struct RawXpType {
  pub type_id:    String,
  pub name:       String,
  pub points:     i64,
  pub active:     bool,
  pub category:   String,
  pub created_by: String,
}

impl RawXpType {
  pub fn into_type(self) -> Result<XpTypeConfig> {
    Ok(XpTypeConfig {
      type_id:    decode_uuid(&self.type_id)?,
      name:       self.name,
      points:     self.points,
      active:     self.active,
      category:   self.category,
      created_by: decode_uuid(&self.created_by)?,
    })
  }
}

/// Raw strings read directly from an `achievement_rules` row.
pub struct RawRule {
  pub rule_id:        String,
  pub title:          String,
  pub xp_reward:      i64,
  pub condition_json: String,
  pub active:         bool,
}

impl RawRule {
  pub fn into_rule(self) -> Result<AchievementRule> {
    Ok(AchievementRule {
      rule_id:   decode_uuid(&self.rule_id)?,
      title:     self.title,
      xp_reward: self.xp_reward,
      condition: decode_condition(&self.condition_json)?,
      active:    self.active,
    })
  }
}

/// Raw strings read directly from an `achievement_progress` row.
pub struct RawProgress {
  pub attendant_id: String,
  pub rule_id:      String,
  pub progress:     i64,
  pub unlocked_at:  Option<String>,
}

impl RawProgress {
  pub fn into_progress(self) -> Result<AchievementProgress> {
    Ok(AchievementProgress {
      attendant_id: decode_uuid(&self.attendant_id)?,
      rule_id:      decode_uuid(&self.rule_id)?,
      progress:     self.progress.clamp(0, 100) as u8,
      unlocked_at:  self.unlocked_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
