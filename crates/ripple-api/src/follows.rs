//! Handlers for `/follows` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/follows` | Body: [`FollowBody`]; idempotent; 201 + follow |
//! | `GET`    | `/follows?kind&id` | Resolved follows held by a watcher |
//! | `DELETE` | `/follows` | Body: [`FollowBody`]; returns removed count |

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use ripple_core::{
  entity::EntityRef,
  follow::{Follow, FollowOptions},
  ops,
  resolve::{ResolvedFollow, resolve_follows},
  store::ActivityStore,
};
use serde::Deserialize;
use serde_json::json;

use crate::{ApiState, error::ApiError};

/// JSON body accepted by `POST /follows` and `DELETE /follows`.
#[derive(Debug, Deserialize)]
pub struct FollowBody {
  pub watcher: EntityRef,
  pub subject: EntityRef,
  /// Overrides the server's default announcement behavior.
  pub announce: Option<bool>,
}

/// `POST /follows` — watcher starts following subject.
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<FollowBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ActivityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let opts = FollowOptions {
    announce: body.announce.unwrap_or(state.announce_follows),
  };
  let follow: Follow =
    ops::follow(state.store.as_ref(), &body.watcher, &body.subject, opts)
      .await?;
  tracing::debug!(watcher = %body.watcher, subject = %body.subject, "follow created");
  Ok((StatusCode::CREATED, Json(follow)))
}

/// `GET /follows?kind=<kind>&id=<id>` — resolved follows held by a watcher.
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<WatcherParams>,
) -> Result<Json<Vec<ResolvedFollow>>, ApiError>
where
  S: ActivityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let watcher = EntityRef::new(params.kind, params.id);
  let follows = state
    .store
    .follows_of(&watcher)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  let resolved =
    resolve_follows(&state.registry, &state.resolve, follows).await?;
  Ok(Json(resolved))
}

#[derive(Debug, Deserialize)]
pub struct WatcherParams {
  pub kind: String,
  pub id:   String,
}

/// `DELETE /follows` — watcher stops following subject. Announcement is off
/// unless the body asks for it.
pub async fn remove<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<FollowBody>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: ActivityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let opts = FollowOptions { announce: body.announce.unwrap_or(false) };
  let removed =
    ops::unfollow(state.store.as_ref(), &body.watcher, &body.subject, opts)
      .await?;
  Ok(Json(json!({ "removed": removed })))
}
