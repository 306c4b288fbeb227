//! Handlers for `/gaps` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/gaps` | Optional `gap_type`, `severity`, `cluster`, `resolved`, `limit`, `offset` |
//! | `GET`   | `/gaps/{id}` | 404 if not found |
//! | `POST`  | `/gaps/detect` | Runs a full detection pass |
//! | `PATCH` | `/gaps/{id}/resolve` | 404 unknown, 409 already resolved |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::Utc;
use clarity_core::{
  detect::GapDetector,
  gap::{GapFinding, GapQuery, GapType, Severity},
  store::GlossaryStore,
  term::Page,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, actor::Actor, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub gap_type: Option<GapType>,
  pub severity: Option<Severity>,
  pub cluster:  Option<String>,
  pub resolved: Option<bool>,
  pub limit:    Option<usize>,
  pub offset:   Option<usize>,
}

/// `GET /gaps[?gap_type=...][&severity=...][&cluster=...][&resolved=...]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Page<GapFinding>>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let defaults = GapQuery::default();
  let query = GapQuery {
    gap_type: params.gap_type,
    severity: params.severity,
    cluster:  params.cluster.filter(|c| !c.is_empty()),
    resolved: params.resolved,
    limit:    params.limit.unwrap_or(defaults.limit),
    offset:   params.offset.unwrap_or(defaults.offset),
  };
  let page = state.store.list_gaps(&query).await.map_err(ApiError::store)?;
  Ok(Json(page))
}

/// `GET /gaps/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<GapFinding>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let gap = state
    .store
    .get_gap(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("gap {id} not found")))?;
  Ok(Json(gap))
}

// ─── Detect ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DetectResponse {
  pub message:       &'static str,
  pub gaps_detected: usize,
  pub gaps:          Vec<GapFinding>,
  pub terms_skipped: usize,
  pub failed_writes: usize,
}

/// `POST /gaps/detect`
pub async fn detect<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<DetectResponse>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let run = GapDetector::new(state.store.as_ref())
    .run(Utc::now())
    .await
    .map_err(ApiError::store)?;

  Ok(Json(DetectResponse {
    message:       "Gap detection completed",
    gaps_detected: run.findings.len(),
    gaps:          run.findings,
    terms_skipped: run.terms_skipped,
    failed_writes: run.failed_writes,
  }))
}

// ─── Resolve ─────────────────────────────────────────────────────────────────

/// `PATCH /gaps/{id}/resolve`
pub async fn resolve<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Path(id): Path<Uuid>,
) -> Result<Json<GapFinding>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let gap = state
    .store
    .resolve_gap(id, actor, Utc::now())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(gap))
}
