//! Action types — the fundamental unit of the activity stream.
//!
//! An action records an actor acting out a verb, optionally on a target, and
//! is attributed to a subject whose stream it appears in. Nomenclature based
//! on the Atom activity-streams draft.
//!
//! Generalized format:
//!
//! ```text
//! <actor> <verb> <time>
//! <actor> <verb> <target> <time>
//! ```
//!
//! Examples:
//!
//! ```text
//! justquick reached level 60 1 minute ago
//! brosner commented on pinax/pinax 2 hours ago
//! washingtontimes started following justquick 8 minutes ago
//! ```
//!
//! Actions are never mutated after creation; removal is an explicit
//! administrative store call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::EntityRef;

// ─── Action ──────────────────────────────────────────────────────────────────

/// A persisted actor–verb–target event.
///
/// The actor is always present; subject and target may be absent. The subject
/// is the entity whose stream the action belongs to — usually the actor, but
/// dispatch may attribute it elsewhere (see
/// [`SubjectSpec`](crate::dispatch::SubjectSpec)).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
  pub action_id:   Uuid,
  pub actor:       EntityRef,
  pub verb:        String,
  pub description: Option<String>,
  pub subject:     Option<EntityRef>,
  pub target:      Option<EntityRef>,
  /// Actions marked not-public are excluded from actor, subject, and watcher
  /// streams.
  pub public:      bool,
  /// Extension payload for fields outside the core schema.
  pub data:        Option<serde_json::Value>,
  /// Server-assigned timestamp; never changes after creation.
  pub created_at:  DateTime<Utc>,
}

// ─── NewAction ───────────────────────────────────────────────────────────────

/// Input to [`crate::store::ActivityStore::record_action`].
#[derive(Debug, Clone)]
pub struct NewAction {
  pub actor:       EntityRef,
  pub verb:        String,
  pub description: Option<String>,
  pub subject:     Option<EntityRef>,
  pub target:      Option<EntityRef>,
  pub public:      bool,
  pub data:        Option<serde_json::Value>,
  /// Normally `None` — the store stamps `created_at` itself. Importers
  /// backfilling history may supply an explicit timestamp.
  pub created_at:  Option<DateTime<Utc>>,
}

impl NewAction {
  /// Convenience constructor: public action with subject defaulted to the
  /// actor and all optional fields empty.
  pub fn new(actor: EntityRef, verb: impl Into<String>) -> Self {
    Self {
      actor:       actor.clone(),
      verb:        verb.into(),
      description: None,
      subject:     Some(actor),
      target:      None,
      public:      true,
      data:        None,
      created_at:  None,
    }
  }
}
