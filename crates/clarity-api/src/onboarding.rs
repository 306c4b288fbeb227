//! Handlers for `/onboarding` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/onboarding/path` | Optional `role` (`viewer`), `cluster`; 404 if none match |
//! | `POST` | `/onboarding/paths` | Body: [`CreatePathBody`]; returns 201 |
//! | `GET`  | `/onboarding/progress` | The acting user's progress; same filters as `/path` |
//! | `POST` | `/onboarding/complete` | Marks the acting user onboarded |
//!
//! Progress and completion need an actor, from the header or the configured
//! default.

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use clarity_core::{
  onboarding::{NewOnboardingPath, OnboardingPath, OnboardingProgress, PathQuery},
  store::GlossaryStore,
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{AppState, actor::Actor, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct PathParams {
  pub role:    Option<String>,
  pub cluster: Option<String>,
}

impl From<PathParams> for PathQuery {
  fn from(p: PathParams) -> Self {
    let defaults = PathQuery::default();
    PathQuery {
      role:    p.role.filter(|r| !r.is_empty()).unwrap_or(defaults.role),
      cluster: p.cluster.filter(|c| !c.is_empty()),
    }
  }
}

fn require_actor(actor: Option<Uuid>) -> Result<Uuid, ApiError> {
  actor.ok_or_else(|| ApiError::BadRequest("an acting user is required".into()))
}

/// `GET /onboarding/path[?role=...][&cluster=...]`
pub async fn path<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<PathParams>,
) -> Result<Json<OnboardingPath>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let path = state
    .store
    .onboarding_path(&params.into())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("onboarding path not found".into()))?;
  Ok(Json(path))
}

#[derive(Debug, Deserialize)]
pub struct CreatePathBody {
  pub role:        String,
  pub cluster:     Option<String>,
  #[serde(default)]
  pub term_ids:    Vec<Uuid>,
  #[serde(default)]
  pub order_index: i64,
}

/// `POST /onboarding/paths`
pub async fn create_path<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<CreatePathBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: GlossaryStore + 'static,
{
  let input = NewOnboardingPath {
    role:        body.role,
    cluster:     body.cluster,
    term_ids:    body.term_ids,
    order_index: body.order_index,
  };
  let path = state
    .store
    .create_onboarding_path(input)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(path)))
}

/// `GET /onboarding/progress[?role=...][&cluster=...]`
pub async fn progress<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Query(params): Query<PathParams>,
) -> Result<Json<OnboardingProgress>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let user = require_actor(actor)?;
  let progress = state
    .store
    .onboarding_progress(user, &params.into())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(progress))
}

/// `POST /onboarding/complete`
pub async fn complete<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
) -> Result<Json<Value>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let user = require_actor(actor)?;
  state
    .store
    .complete_onboarding(user, Utc::now())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(json!({ "message": "onboarding completed" })))
}
