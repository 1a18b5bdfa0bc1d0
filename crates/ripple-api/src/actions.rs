//! Handlers for `/actions` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/actions` | Body: [`ActionEvent`]; idempotent dispatch; returns 201 + stored action |
//! | `GET`    | `/actions/:id` | Single resolved action |
//! | `DELETE` | `/actions/:id` | Administrative removal |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use ripple_core::{
  action::Action,
  dispatch::{ActionEvent, dispatch},
  resolve::{ResolvedAction, resolve_actions},
  store::ActivityStore,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

/// `POST /actions` — dispatch an event. Returns 201 with the stored action;
/// dispatching the same event again returns the existing record.
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Json(event): Json<ActionEvent>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ActivityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let action = dispatch(state.store.as_ref(), &event).await?;
  tracing::debug!(action_id = %action.action_id, verb = %action.verb, "dispatched action");
  Ok((StatusCode::CREATED, Json(action)))
}

/// `GET /actions/:id`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ResolvedAction>, ApiError>
where
  S: ActivityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let action: Action = state
    .store
    .get_action(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("action {id} not found")))?;

  let resolved =
    resolve_actions(&state.registry, &state.resolve, vec![action]).await?;
  resolved
    .into_iter()
    .next()
    .ok_or_else(|| ApiError::NotFound(format!("action {id} references a missing entity")))
    .map(Json)
}

/// `DELETE /actions/:id`
pub async fn delete_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: ActivityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let deleted = state
    .store
    .delete_action(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  if !deleted {
    return Err(ApiError::NotFound(format!("action {id} not found")));
  }
  tracing::info!(action_id = %id, "deleted action");
  Ok(StatusCode::NO_CONTENT)
}
