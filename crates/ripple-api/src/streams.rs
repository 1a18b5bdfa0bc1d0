//! Handlers for `/streams` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/streams/actor?kind&id` | Public actions performed by an entity |
//! | `GET`  | `/streams/subject?kind&id` | Public actions attributed to an entity |
//! | `GET`  | `/streams/model/:kind` | All actions whose actor is of a kind |
//! | `GET`  | `/streams/watcher?kind&id` | Personalized stream of a watcher |
//!
//! Every response is batch-resolved server-side: one bulk entity fetch per
//! distinct referenced kind in the page.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use ripple_core::{
  entity::EntityRef,
  resolve::{ResolvedAction, resolve_actions},
  store::{ActivityStore, StreamQuery},
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct EntityParams {
  pub kind:   String,
  pub id:     String,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PageParams {
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

impl EntityParams {
  fn entity_ref(&self) -> EntityRef {
    EntityRef::new(self.kind.clone(), self.id.clone())
  }

  fn stream_query(&self) -> StreamQuery {
    StreamQuery { limit: self.limit, offset: self.offset }
  }
}

/// `GET /streams/actor?kind=<kind>&id=<id>[&limit=...][&offset=...]`
pub async fn actor<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<EntityParams>,
) -> Result<Json<Vec<ResolvedAction>>, ApiError>
where
  S: ActivityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let actions = state
    .store
    .actor_stream(&params.entity_ref(), &params.stream_query())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  let resolved =
    resolve_actions(&state.registry, &state.resolve, actions).await?;
  Ok(Json(resolved))
}

/// `GET /streams/subject?kind=<kind>&id=<id>[&limit=...][&offset=...]`
pub async fn subject<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<EntityParams>,
) -> Result<Json<Vec<ResolvedAction>>, ApiError>
where
  S: ActivityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let actions = state
    .store
    .subject_stream(&params.entity_ref(), &params.stream_query())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  let resolved =
    resolve_actions(&state.registry, &state.resolve, actions).await?;
  Ok(Json(resolved))
}

/// `GET /streams/model/:kind[?limit=...][&offset=...]`
pub async fn model<S>(
  State(state): State<ApiState<S>>,
  Path(kind): Path<String>,
  Query(params): Query<PageParams>,
) -> Result<Json<Vec<ResolvedAction>>, ApiError>
where
  S: ActivityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let query = StreamQuery { limit: params.limit, offset: params.offset };
  let actions = state
    .store
    .model_stream(&kind, &query)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  let resolved =
    resolve_actions(&state.registry, &state.resolve, actions).await?;
  Ok(Json(resolved))
}

/// `GET /streams/watcher?kind=<kind>&id=<id>[&limit=...][&offset=...]`
pub async fn watcher<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<EntityParams>,
) -> Result<Json<Vec<ResolvedAction>>, ApiError>
where
  S: ActivityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let actions = state
    .store
    .watcher_stream(&params.entity_ref(), &params.stream_query())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  let resolved =
    resolve_actions(&state.registry, &state.resolve, actions).await?;
  Ok(Json(resolved))
}
