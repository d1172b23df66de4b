//! Manual XP grants and their type catalogue.
//!
//! A grant is the manual-bonus path into the ledger: a granter picks a
//! configured XP type and attaches a justification. Every grant references
//! exactly one ledger event (1:1); a grant without a resolvable event is a
//! corruption signal, detectable via the consistency audit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Type catalogue ──────────────────────────────────────────────────────────

/// An administrator-configured bonus type. Deactivating a type blocks new
/// grants but never retroactively changes past events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpTypeConfig {
  pub type_id:    Uuid,
  pub name:       String,
  /// Base points awarded per grant of this type, before the season
  /// multiplier.
  pub points:     i64,
  pub active:     bool,
  pub category:   String,
  pub created_by: Uuid,
}

/// Input to [`crate::store::LedgerStore::add_xp_type`]. Types are created
/// active.
#[derive(Debug, Clone)]
pub struct NewXpType {
  pub name:       String,
  pub points:     i64,
  pub category:   String,
  pub created_by: Uuid,
}

// ─── Grants ──────────────────────────────────────────────────────────────────

/// A persisted manual grant, referencing the ledger event it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpGrant {
  pub grant_id:      Uuid,
  pub attendant_id:  Uuid,
  pub type_id:       Uuid,
  pub granter_id:    Uuid,
  pub justification: String,
  pub xp_event_id:   Uuid,
  pub granted_at:    DateTime<Utc>,
}

/// A request to grant a bonus, as submitted by the administration
/// collaborator. Authorization happened upstream.
#[derive(Debug, Clone)]
pub struct GrantRequest {
  pub attendant_id:  Uuid,
  pub type_id:       Uuid,
  pub granter_id:    Uuid,
  pub justification: String,
}

/// Input to [`crate::store::LedgerStore::insert_grant_with_event`]:
/// the grant half of the atomic grant+event pair. `xp_event_id` and
/// `granted_at` are assigned by the store inside the same transaction that
/// persists the event.
#[derive(Debug, Clone)]
pub struct NewXpGrant {
  pub attendant_id:  Uuid,
  pub type_id:       Uuid,
  pub granter_id:    Uuid,
  pub justification: String,
}
