//! Handlers for change proposals and term flags.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/proposals` | Optional `status`, `limit` (20), `offset` (0); newest first |
//! | `POST`  | `/proposals` | Body: [`CreateProposalBody`]; returns 201 |
//! | `GET`   | `/proposals/{id}` | 404 if not found |
//! | `PATCH` | `/proposals/{id}/status` | Body: `{"status": "approved" \| "rejected"}`; 409 once reviewed |
//! | `POST`  | `/terms/{id}/flags` | Body: [`CreateFlagBody`]; returns 201 |
//! | `GET`   | `/flags` | Optional `term_id`, `status`, `limit`, `offset`; newest first |
//! | `GET`   | `/flags/{id}` | 404 if not found |
//! | `PATCH` | `/flags/{id}/status` | Body: `{"status": "open" \| "resolved" \| "dismissed"}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use clarity_core::{
  governance::{
    FlagQuery, FlagStatus, FlagType, NewFlag, NewProposal, ProposalQuery, ProposalStatus,
    ProposalType, TermFlag, TermProposal,
  },
  store::GlossaryStore,
  term::Page,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{AppState, actor::Actor, error::ApiError};

/// Parse an enum named by its wire string, or fail with a 400 naming `field`.
fn parse_named<T>(field: &str, value: &str, parse: fn(&str) -> Option<T>) -> Result<T, ApiError> {
  parse(value).ok_or_else(|| ApiError::BadRequest(format!("unknown {field} {value:?}")))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: String,
}

// ─── Proposals ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ProposalListParams {
  pub status: Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// `GET /proposals[?status=...][&limit=...][&offset=...]`
pub async fn list_proposals<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ProposalListParams>,
) -> Result<Json<Page<TermProposal>>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let defaults = ProposalQuery::default();
  let query = ProposalQuery {
    status: params
      .status
      .filter(|s| !s.is_empty())
      .map(|s| parse_named("status", &s, ProposalStatus::parse))
      .transpose()?,
    limit:  params.limit.unwrap_or(defaults.limit),
    offset: params.offset.unwrap_or(defaults.offset),
  };
  let page = state
    .store
    .list_proposals(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct CreateProposalBody {
  pub term_id:       Option<Uuid>,
  pub proposal_type: String,
  pub proposed_data: Map<String, Value>,
  pub reason:        Option<String>,
}

/// `POST /proposals`
pub async fn create_proposal<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Json(body): Json<CreateProposalBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: GlossaryStore + 'static,
{
  let input = NewProposal {
    term_id:       body.term_id,
    proposal_type: parse_named("proposal_type", &body.proposal_type, ProposalType::parse)?,
    proposed_data: body.proposed_data,
    reason:        body.reason,
  };
  let proposal = state
    .store
    .create_proposal(input, actor)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(proposal)))
}

/// `GET /proposals/{id}`
pub async fn get_proposal<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<TermProposal>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let proposal = state
    .store
    .get_proposal(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("proposal {id} not found")))?;
  Ok(Json(proposal))
}

/// `PATCH /proposals/{id}/status`
pub async fn review_proposal<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<TermProposal>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let status = ProposalStatus::parse(&body.status)
    .filter(|s| s.is_verdict())
    .ok_or_else(|| ApiError::BadRequest("status must be 'approved' or 'rejected'".into()))?;
  let proposal = state
    .store
    .review_proposal(id, status, actor, Utc::now())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(proposal))
}

// ─── Flags ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateFlagBody {
  pub flag_type:   String,
  pub description: String,
}

/// `POST /terms/{id}/flags`
pub async fn create_flag<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Path(term_id): Path<Uuid>,
  Json(body): Json<CreateFlagBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: GlossaryStore + 'static,
{
  let input = NewFlag {
    flag_type:   parse_named("flag_type", &body.flag_type, FlagType::parse)?,
    description: body.description,
  };
  let flag = state
    .store
    .create_flag(term_id, input, actor)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(flag)))
}

#[derive(Debug, Deserialize)]
pub struct FlagListParams {
  pub term_id: Option<Uuid>,
  pub status:  Option<String>,
  pub limit:   Option<usize>,
  pub offset:  Option<usize>,
}

/// `GET /flags[?term_id=...][&status=...][&limit=...][&offset=...]`
pub async fn list_flags<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<FlagListParams>,
) -> Result<Json<Page<TermFlag>>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let defaults = FlagQuery::default();
  let query = FlagQuery {
    term_id: params.term_id,
    status:  params
      .status
      .filter(|s| !s.is_empty())
      .map(|s| parse_named("status", &s, FlagStatus::parse))
      .transpose()?,
    limit:   params.limit.unwrap_or(defaults.limit),
    offset:  params.offset.unwrap_or(defaults.offset),
  };
  let page = state.store.list_flags(&query).await.map_err(ApiError::store)?;
  Ok(Json(page))
}

/// `GET /flags/{id}`
pub async fn get_flag<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<TermFlag>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let flag = state
    .store
    .get_flag(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("flag {id} not found")))?;
  Ok(Json(flag))
}

/// `PATCH /flags/{id}/status`
pub async fn set_flag_status<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<TermFlag>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let status = parse_named("status", &body.status, FlagStatus::parse)?;
  let flag = state
    .store
    .set_flag_status(id, status, actor, Utc::now())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(flag))
}
