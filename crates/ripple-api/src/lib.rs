//! JSON REST API for Ripple.
//!
//! Exposes an axum [`Router`] backed by any
//! [`ripple_core::store::ActivityStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", ripple_api::api_router(state))
//! ```

pub mod actions;
pub mod error;
pub mod follows;
pub mod streams;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use ripple_core::{
  registry::EntityRegistry, resolve::ResolveOptions, store::ActivityStore,
};

pub use error::ApiError;

// ─── State ───────────────────────────────────────────────────────────────────

/// Shared state threaded through all handlers: the store, the entity
/// registry, and the resolver/follow behavior chosen at startup.
pub struct ApiState<S> {
  pub store:            Arc<S>,
  pub registry:         Arc<EntityRegistry>,
  pub resolve:          ResolveOptions,
  /// Announce follows with a "started following" action by default.
  pub announce_follows: bool,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:            self.store.clone(),
      registry:         self.registry.clone(),
      resolve:          self.resolve,
      announce_follows: self.announce_follows,
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: ActivityStore + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Actions
    .route("/actions", post(actions::create::<S>))
    .route(
      "/actions/{id}",
      get(actions::get_one::<S>).delete(actions::delete_one::<S>),
    )
    // Streams
    .route("/streams/actor", get(streams::actor::<S>))
    .route("/streams/subject", get(streams::subject::<S>))
    .route("/streams/model/{kind}", get(streams::model::<S>))
    .route("/streams/watcher", get(streams::watcher::<S>))
    // Follows
    .route(
      "/follows",
      post(follows::create::<S>)
        .get(follows::list::<S>)
        .delete(follows::remove::<S>),
    )
    .with_state(state)
}
