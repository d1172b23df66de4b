//! SQL schema for the Laurel SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS seasons (
    season_id     TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    starts_on     TEXT NOT NULL,      -- ISO 8601 calendar date
    ends_on       TEXT NOT NULL,
    active        INTEGER NOT NULL DEFAULT 0,
    xp_multiplier REAL NOT NULL
);

-- At most one row may carry active = 1 at any instant.
CREATE UNIQUE INDEX IF NOT EXISTS seasons_single_active_idx
    ON seasons(active) WHERE active = 1;

CREATE TABLE IF NOT EXISTS xp_types (
    type_id    TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    points     INTEGER NOT NULL,
    active     INTEGER NOT NULL DEFAULT 1,
    category   TEXT NOT NULL,
    created_by TEXT NOT NULL
);

-- The ledger is strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS xp_events (
    event_id     TEXT PRIMARY KEY,
    attendant_id TEXT NOT NULL,
    season_id    TEXT REFERENCES seasons(season_id),  -- NULL: outside any season
    source       TEXT NOT NULL,      -- 'evaluation' | 'manual_grant' | 'achievement'
    base_points  INTEGER NOT NULL,
    multiplier   REAL NOT NULL,      -- season multiplier snapshot at write time
    points       INTEGER NOT NULL,   -- round_half_even(base_points * multiplier)
    reason       TEXT NOT NULL,
    related_id   TEXT,
    recorded_at  TEXT NOT NULL       -- ISO 8601 UTC; server-assigned
);

CREATE TABLE IF NOT EXISTS xp_grants (
    grant_id      TEXT PRIMARY KEY,
    attendant_id  TEXT NOT NULL,
    type_id       TEXT NOT NULL REFERENCES xp_types(type_id),
    granter_id    TEXT NOT NULL,
    justification TEXT NOT NULL,
    xp_event_id   TEXT NOT NULL REFERENCES xp_events(event_id),
    granted_at    TEXT NOT NULL,
    UNIQUE (xp_event_id)
);

CREATE TABLE IF NOT EXISTS achievement_rules (
    rule_id        TEXT PRIMARY KEY,
    title          TEXT NOT NULL,
    xp_reward      INTEGER NOT NULL,
    condition_json TEXT NOT NULL,    -- JSON-encoded RuleCondition
    active         INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS achievement_progress (
    attendant_id TEXT NOT NULL,
    rule_id      TEXT NOT NULL REFERENCES achievement_rules(rule_id),
    progress     INTEGER NOT NULL DEFAULT 0,
    unlocked_at  TEXT,
    PRIMARY KEY (attendant_id, rule_id)
);

CREATE INDEX IF NOT EXISTS xp_events_attendant_idx
    ON xp_events(attendant_id);
CREATE INDEX IF NOT EXISTS xp_events_season_attendant_idx
    ON xp_events(season_id, attendant_id);
CREATE INDEX IF NOT EXISTS xp_grants_granter_day_idx
    ON xp_grants(granter_id, granted_at);

PRAGMA user_version = 1;
";
