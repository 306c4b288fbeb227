//! Handlers for term history.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/terms/{id}/versions` | Highest version first |
//! | `POST` | `/terms/{id}/rollback` | Body: `{"version_id": "..."}` |
//! | `GET`  | `/versions/{id}` | 404 if not found |
//! | `GET`  | `/versions/compare` | `?version1=&version2=` |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use clarity_core::{
  store::GlossaryStore,
  term::Term,
  version::{TermVersion, VersionDiff, compare},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, actor::Actor, error::ApiError};

/// `GET /terms/{id}/versions`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<TermVersion>>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let versions = state.store.list_versions(id).await.map_err(ApiError::store)?;
  Ok(Json(versions))
}

/// `GET /versions/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<TermVersion>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let version = state
    .store
    .get_version(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("version {id} not found")))?;
  Ok(Json(version))
}

// ─── Compare ─────────────────────────────────────────────────────────────────

/// Raw strings so that a missing or malformed id is a 400 with our own
/// message rather than an extractor rejection.
#[derive(Debug, Deserialize)]
pub struct CompareParams {
  pub version1: Option<String>,
  pub version2: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Comparison {
  pub version1:    TermVersion,
  pub version2:    TermVersion,
  pub differences: VersionDiff,
}

fn parse_param(name: &str, value: Option<&str>) -> Result<Uuid, ApiError> {
  let value = value.filter(|v| !v.is_empty()).ok_or_else(|| {
    ApiError::BadRequest("version1 and version2 query parameters are required".into())
  })?;
  Uuid::parse_str(value).map_err(|_| ApiError::BadRequest(format!("invalid {name} ID")))
}

/// `GET /versions/compare?version1=<id>&version2=<id>`
pub async fn compare_versions<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<CompareParams>,
) -> Result<Json<Comparison>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let id1 = parse_param("version1", params.version1.as_deref())?;
  let id2 = parse_param("version2", params.version2.as_deref())?;

  let version1 = state
    .store
    .get_version(id1)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("version1 not found".into()))?;
  let version2 = state
    .store
    .get_version(id2)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("version2 not found".into()))?;

  let differences = compare(&version1.snapshot, &version2.snapshot);
  Ok(Json(Comparison { version1, version2, differences }))
}

// ─── Rollback ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RollbackBody {
  pub version_id: Uuid,
}

/// `POST /terms/{id}/rollback`
pub async fn rollback<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<RollbackBody>,
) -> Result<Json<Term>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let term = state
    .store
    .restore_version(id, body.version_id, actor)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(term))
}
