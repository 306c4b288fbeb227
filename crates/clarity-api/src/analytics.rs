//! Handlers for `/analytics` endpoints.

use axum::{Json, extract::State};
use clarity_core::{cluster::CoverageReport, gap::GapAnalytics, store::GlossaryStore};

use crate::{AppState, error::ApiError};

/// `GET /analytics/gaps`
pub async fn gaps<S>(State(state): State<AppState<S>>) -> Result<Json<GapAnalytics>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let analytics = state.store.gap_analytics().await.map_err(ApiError::store)?;
  Ok(Json(analytics))
}

/// `GET /analytics/cluster-coverage`
pub async fn cluster_coverage<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<CoverageReport>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let report = state.store.cluster_coverage().await.map_err(ApiError::store)?;
  Ok(Json(report))
}
