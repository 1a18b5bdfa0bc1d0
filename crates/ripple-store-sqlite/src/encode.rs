//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings (microsecond
//! precision, `Z` suffix) so that string comparison in SQL matches
//! chronological order. UUIDs are stored as hyphenated lowercase strings.
//! Entity references are stored as (kind, id) column pairs; the id column is
//! the normalized string form of the identifier.

use chrono::{DateTime, SecondsFormat, Utc};
use ripple_core::{
  action::Action,
  entity::EntityRef,
  follow::Follow,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Entity references ───────────────────────────────────────────────────────

/// Split an optional reference into its column pair.
pub fn encode_opt_ref(
  entity_ref: Option<&EntityRef>,
) -> (Option<String>, Option<String>) {
  match entity_ref {
    Some(r) => (Some(r.kind.clone()), Some(r.id.clone())),
    None => (None, None),
  }
}

/// Rebuild an optional reference from its column pair. A NULL in either
/// column means the reference is absent.
pub fn decode_opt_ref(
  kind: Option<String>,
  id: Option<String>,
) -> Option<EntityRef> {
  match (kind, id) {
    (Some(kind), Some(id)) => Some(EntityRef { kind, id }),
    _ => None,
  }
}

// ─── Extension payload ───────────────────────────────────────────────────────

pub fn encode_data(data: Option<&serde_json::Value>) -> Result<Option<String>> {
  data.map(|v| serde_json::to_string(v).map_err(Error::Json)).transpose()
}

pub fn decode_data(s: Option<&str>) -> Result<Option<serde_json::Value>> {
  s.map(|v| serde_json::from_str(v).map_err(Error::Json)).transpose()
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `actions` row.
pub struct RawAction {
  pub action_id:    String,
  pub actor_kind:   String,
  pub actor_id:     String,
  pub verb:         String,
  pub description:  Option<String>,
  pub subject_kind: Option<String>,
  pub subject_id:   Option<String>,
  pub target_kind:  Option<String>,
  pub target_id:    Option<String>,
  pub public:       bool,
  pub data:         Option<String>,
  pub created_at:   String,
}

impl RawAction {
  /// Column list matching [`RawAction::from_row`]'s ordering.
  pub const COLUMNS: &'static str = "action_id, actor_kind, actor_id, verb, \
     description, subject_kind, subject_id, target_kind, target_id, public, \
     data, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      action_id:    row.get(0)?,
      actor_kind:   row.get(1)?,
      actor_id:     row.get(2)?,
      verb:         row.get(3)?,
      description:  row.get(4)?,
      subject_kind: row.get(5)?,
      subject_id:   row.get(6)?,
      target_kind:  row.get(7)?,
      target_id:    row.get(8)?,
      public:       row.get(9)?,
      data:         row.get(10)?,
      created_at:   row.get(11)?,
    })
  }

  pub fn into_action(self) -> Result<Action> {
    Ok(Action {
      action_id:   decode_uuid(&self.action_id)?,
      actor:       EntityRef { kind: self.actor_kind, id: self.actor_id },
      verb:        self.verb,
      description: self.description,
      subject:     decode_opt_ref(self.subject_kind, self.subject_id),
      target:      decode_opt_ref(self.target_kind, self.target_id),
      public:      self.public,
      data:        decode_data(self.data.as_deref())?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `follows` row.
pub struct RawFollow {
  pub follow_id:    String,
  pub watcher_kind: String,
  pub watcher_id:   String,
  pub subject_kind: String,
  pub subject_id:   String,
  pub started_at:   String,
}

impl RawFollow {
  pub const COLUMNS: &'static str =
    "follow_id, watcher_kind, watcher_id, subject_kind, subject_id, started_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      follow_id:    row.get(0)?,
      watcher_kind: row.get(1)?,
      watcher_id:   row.get(2)?,
      subject_kind: row.get(3)?,
      subject_id:   row.get(4)?,
      started_at:   row.get(5)?,
    })
  }

  pub fn into_follow(self) -> Result<Follow> {
    Ok(Follow {
      follow_id:  decode_uuid(&self.follow_id)?,
      watcher:    EntityRef { kind: self.watcher_kind, id: self.watcher_id },
      subject:    EntityRef { kind: self.subject_kind, id: self.subject_id },
      started_at: decode_dt(&self.started_at)?,
    })
  }
}
