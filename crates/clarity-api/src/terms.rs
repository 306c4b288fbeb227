//! Handlers for `/terms` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/terms` | Optional `?category`, `limit` (20), `offset` (0) |
//! | `POST`   | `/terms` | Body: [`CreateTermBody`]; returns 201 |
//! | `GET`    | `/terms/{id}` | With contexts, examples and relationships; records a view; optional `?cluster` |
//! | `PUT`    | `/terms/{id}` | Body: [`UpdateTermBody`]; snapshots first |
//! | `DELETE` | `/terms/{id}` | 204 |
//! | `GET`    | `/terms/{id}/contexts` | Newest first |
//! | `POST`   | `/terms/{id}/contexts` | Body: [`CreateContextBody`]; returns 201 |
//! | `GET`    | `/terms/{id}/examples` | Newest first |
//! | `POST`   | `/terms/{id}/examples` | Body: [`CreateExampleBody`]; returns 201 |
//! | `GET`    | `/terms/{id}/relationships` | With a summary of each related term |
//! | `POST`   | `/terms/{id}/relationships` | Body: [`CreateRelationshipBody`]; 201, 409 if it exists |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use clarity_core::{
  relationship::{NewExample, NewRelationship, RelationshipType, TermExample, TermRelationship},
  store::GlossaryStore,
  term::{NewContext, NewTerm, Page, Term, TermContext, TermDetail, TermPatch, TermQuery},
  usage::UsageEvent,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, actor::Actor, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub category: Option<String>,
  pub limit:    Option<usize>,
  pub offset:   Option<usize>,
}

/// `GET /terms[?category=...][&limit=...][&offset=...]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Page<Term>>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let defaults = TermQuery::default();
  let query = TermQuery {
    category: params.category.filter(|c| !c.is_empty()),
    after:    None,
    limit:    params.limit.unwrap_or(defaults.limit),
    offset:   params.offset.unwrap_or(defaults.offset),
  };
  let page = state.store.list_terms(&query).await.map_err(ApiError::store)?;
  Ok(Json(page))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateTermBody {
  pub term:                  String,
  pub base_definition:       String,
  pub category:              Option<String>,
  pub code_name:             Option<String>,
  #[serde(default)]
  pub tags:                  Vec<String>,
  #[serde(default)]
  pub compliance_frameworks: Vec<String>,
}

impl From<CreateTermBody> for NewTerm {
  fn from(b: CreateTermBody) -> Self {
    NewTerm {
      term:                  b.term,
      base_definition:       b.base_definition,
      category:              b.category,
      code_name:             b.code_name,
      tags:                  b.tags,
      compliance_frameworks: b.compliance_frameworks,
    }
  }
}

/// `POST /terms`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Json(body): Json<CreateTermBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: GlossaryStore + 'static,
{
  let term = state
    .store
    .create_term(body.into(), actor)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(term)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GetParams {
  /// The cluster the term is being viewed under, for usage analytics.
  pub cluster: Option<String>,
}

/// `GET /terms/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Path(id): Path<Uuid>,
  Query(params): Query<GetParams>,
) -> Result<Json<TermDetail>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let detail = state
    .store
    .term_detail(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("term {id} not found")))?;

  state.usage.record(UsageEvent::viewed(id, params.cluster, actor));
  Ok(Json(detail))
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateTermBody {
  pub term:                  Option<String>,
  pub base_definition:       Option<String>,
  pub category:              Option<String>,
  pub code_name:             Option<String>,
  pub tags:                  Option<Vec<String>>,
  pub compliance_frameworks: Option<Vec<String>>,
  /// Stored on the version recorded before the update.
  pub change_reason:         Option<String>,
}

/// `PUT /terms/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<UpdateTermBody>,
) -> Result<Json<Term>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let patch = TermPatch {
    term:                  body.term,
    base_definition:       body.base_definition,
    category:              body.category,
    code_name:             body.code_name,
    tags:                  body.tags,
    compliance_frameworks: body.compliance_frameworks,
  };
  let term = state
    .store
    .update_term(id, patch, actor, body.change_reason)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(term))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /terms/{id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: GlossaryStore + 'static,
{
  state.store.delete_term(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Contexts ────────────────────────────────────────────────────────────────

/// `GET /terms/{id}/contexts`
pub async fn list_contexts<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<TermContext>>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let contexts = state.store.get_contexts(id).await.map_err(ApiError::store)?;
  Ok(Json(contexts))
}

#[derive(Debug, Deserialize)]
pub struct CreateContextBody {
  pub cluster:             Option<String>,
  pub system:              Option<String>,
  pub product:             Option<String>,
  pub context_definition:  String,
  #[serde(default)]
  pub business_rules:      Vec<String>,
  #[serde(default)]
  pub compliance_required: bool,
}

/// `POST /terms/{id}/contexts`
pub async fn create_context<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<CreateContextBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: GlossaryStore + 'static,
{
  let input = NewContext {
    cluster:             body.cluster,
    system:              body.system,
    product:             body.product,
    context_definition:  body.context_definition,
    business_rules:      body.business_rules,
    compliance_required: body.compliance_required,
  };
  let context = state
    .store
    .add_context(id, input, actor)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(context)))
}

// ─── Examples ────────────────────────────────────────────────────────────────

/// `GET /terms/{id}/examples`
pub async fn list_examples<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<TermExample>>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let examples = state.store.list_examples(id).await.map_err(ApiError::store)?;
  Ok(Json(examples))
}

#[derive(Debug, Deserialize)]
pub struct CreateExampleBody {
  pub context_id:   Option<Uuid>,
  pub example_text: String,
  pub source:       Option<String>,
}

/// `POST /terms/{id}/examples`
pub async fn create_example<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<CreateExampleBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: GlossaryStore + 'static,
{
  let input = NewExample {
    context_id:   body.context_id,
    example_text: body.example_text,
    source:       body.source,
  };
  let example = state
    .store
    .add_example(id, input, actor)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(example)))
}

// ─── Relationships ───────────────────────────────────────────────────────────

/// `GET /terms/{id}/relationships`
pub async fn list_relationships<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<TermRelationship>>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let links = state
    .store
    .list_relationships(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(links))
}

#[derive(Debug, Deserialize)]
pub struct CreateRelationshipBody {
  pub related_term_id:   Uuid,
  pub relationship_type: String,
}

/// `POST /terms/{id}/relationships`
pub async fn create_relationship<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<CreateRelationshipBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: GlossaryStore + 'static,
{
  let relationship_type = RelationshipType::parse(&body.relationship_type).ok_or_else(|| {
    ApiError::BadRequest(format!(
      "unknown relationship_type {:?}",
      body.relationship_type
    ))
  })?;
  let input = NewRelationship { related_term_id: body.related_term_id, relationship_type };
  let link = state
    .store
    .add_relationship(id, input, actor)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(link)))
}
