//! Handler for `GET /search`.

use axum::{
  Json,
  extract::{Query, State},
};
use clarity_core::{
  store::GlossaryStore,
  term::{Page, SearchQuery, Term},
};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize, Default)]
pub struct SearchParams {
  /// Required. Each word must prefix a word of the term name or base definition.
  pub q:      Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// `GET /search?q=...[&limit=...][&offset=...]`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<SearchParams>,
) -> Result<Json<Page<Term>>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let text = params
    .q
    .filter(|q| !q.trim().is_empty())
    .ok_or_else(|| ApiError::BadRequest("query parameter 'q' is required".into()))?;

  let query = SearchQuery { text, limit: params.limit, offset: params.offset };
  let page = state.store.search_terms(&query).await.map_err(ApiError::store)?;
  Ok(Json(page))
}
