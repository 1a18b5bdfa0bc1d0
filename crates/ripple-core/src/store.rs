//! The `ActivityStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `ripple-store-sqlite`).
//! Higher layers (`ripple-api`, dispatch, follow helpers) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  action::{Action, NewAction},
  entity::EntityRef,
  follow::Follow,
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Pagination for the stream queries. Streams are always ordered by creation
/// time descending; `limit`/`offset` page through that ordering.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamQuery {
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

impl StreamQuery {
  /// Page size applied when the caller gives no explicit limit.
  pub const DEFAULT_LIMIT: usize = 100;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an activity stream storage backend.
///
/// Actions are immutable once recorded; the only write after creation is the
/// explicit administrative [`delete_action`](Self::delete_action). All stream
/// reads return newest-first.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ActivityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Actions ───────────────────────────────────────────────────────────

  /// Persist a new action and return it. `action_id` and `created_at` are
  /// assigned by the store unless the input carries an explicit backfill
  /// timestamp.
  fn record_action(
    &self,
    input: NewAction,
  ) -> impl Future<Output = Result<Action, Self::Error>> + Send + '_;

  /// Find an already-recorded action whose fields exactly match `candidate`
  /// (ignoring timestamps). Backs the idempotent dispatch: reuse before
  /// create, never overwrite.
  fn find_action<'a>(
    &'a self,
    candidate: &'a NewAction,
  ) -> impl Future<Output = Result<Option<Action>, Self::Error>> + Send + 'a;

  /// Retrieve an action by id. Returns `None` if not found.
  fn get_action(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Action>, Self::Error>> + Send + '_;

  /// Administrative removal. Returns `false` if no such action existed.
  fn delete_action(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Streams ───────────────────────────────────────────────────────────

  /// Most recent public actions performed by `actor`.
  fn actor_stream<'a>(
    &'a self,
    actor: &'a EntityRef,
    query: &'a StreamQuery,
  ) -> impl Future<Output = Result<Vec<Action>, Self::Error>> + Send + 'a;

  /// Most recent public actions attributed to `subject`.
  fn subject_stream<'a>(
    &'a self,
    subject: &'a EntityRef,
    query: &'a StreamQuery,
  ) -> impl Future<Output = Result<Vec<Action>, Self::Error>> + Send + 'a;

  /// Most recent actions whose actor is of the given kind. Deliberately does
  /// not filter on `public` — kind-wide streams are a moderation surface.
  fn model_stream<'a>(
    &'a self,
    kind: &'a str,
    query: &'a StreamQuery,
  ) -> impl Future<Output = Result<Vec<Action>, Self::Error>> + Send + 'a;

  /// The watcher's personalized stream: for every subject the watcher
  /// follows, that subject's public actions created after the follow began,
  /// merged newest-first. Empty when the watcher follows nothing.
  fn watcher_stream<'a>(
    &'a self,
    watcher: &'a EntityRef,
    query: &'a StreamQuery,
  ) -> impl Future<Output = Result<Vec<Action>, Self::Error>> + Send + 'a;

  // ── Follows ───────────────────────────────────────────────────────────

  /// Create a follow with `started_at = now`, or return the existing one.
  /// The boolean is `true` when a new relationship was created.
  fn add_follow<'a>(
    &'a self,
    watcher: &'a EntityRef,
    subject: &'a EntityRef,
  ) -> impl Future<Output = Result<(Follow, bool), Self::Error>> + Send + 'a;

  /// Delete every follow matching (watcher, subject); returns the count.
  fn remove_follows<'a>(
    &'a self,
    watcher: &'a EntityRef,
    subject: &'a EntityRef,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// All follows held by `watcher`, oldest first.
  fn follows_of<'a>(
    &'a self,
    watcher: &'a EntityRef,
  ) -> impl Future<Output = Result<Vec<Follow>, Self::Error>> + Send + 'a;

  /// Retrieve a follow by id. Returns `None` if not found.
  fn get_follow(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Follow>, Self::Error>> + Send + '_;
}
