//! Follow relationships — a watcher's subscription to a subject's activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::EntityRef;

/// Lets a watcher follow the activities of any specific subject.
///
/// At most one live follow exists per (watcher, subject) pair — enforced by a
/// UNIQUE constraint in the backing store. Actions created after `started_at`
/// by the subject appear in the watcher's personalized stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follow {
  pub follow_id:  Uuid,
  pub watcher:    EntityRef,
  pub subject:    EntityRef,
  pub started_at: DateTime<Utc>,
}

/// Options for [`crate::ops::follow`] and [`crate::ops::unfollow`].
#[derive(Debug, Clone, Copy)]
pub struct FollowOptions {
  /// Dispatch a "started following" / "stopped following" action alongside
  /// the relationship change.
  pub announce: bool,
}

impl Default for FollowOptions {
  fn default() -> Self { Self { announce: true } }
}
