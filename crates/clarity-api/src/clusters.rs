//! Handlers for cluster endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/clusters` | Registered clusters, else those derived from contexts |
//! | `POST` | `/clusters` | Body: `{"name": "...", "description": "..."}`; 409 on duplicate |
//! | `GET`  | `/clusters/{name}/terms` | Terms with a context in the cluster |
//! | `GET`  | `/clusters/{name}/comparison` | The cluster's terms plus every known cluster |
//! | `GET`  | `/terms/{id}/cluster-comparison` | A term's contexts grouped by cluster |

use std::collections::{BTreeMap, BTreeSet};

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use clarity_core::{
  cluster::{Cluster, NewCluster},
  store::GlossaryStore,
  term::{Term, TermContext},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, actor::Actor, error::ApiError};

/// `GET /clusters`
pub async fn list<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Cluster>>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let clusters = state.store.list_clusters().await.map_err(ApiError::store)?;
  Ok(Json(clusters))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name:        String,
  pub description: Option<String>,
}

/// `POST /clusters`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: GlossaryStore + 'static,
{
  let input = NewCluster { name: body.name, description: body.description };
  let cluster = state
    .store
    .create_cluster(input, actor)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(cluster)))
}

/// `GET /clusters/{name}/terms`
pub async fn terms<S>(
  State(state): State<AppState<S>>,
  Path(name): Path<String>,
) -> Result<Json<Vec<Term>>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let terms = state
    .store
    .terms_for_cluster(&name)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(terms))
}

#[derive(Debug, Serialize)]
pub struct ClusterComparison {
  pub cluster:        String,
  pub terms:          Vec<Term>,
  pub other_clusters: BTreeSet<String>,
}

/// `GET /clusters/{name}/comparison`
pub async fn comparison<S>(
  State(state): State<AppState<S>>,
  Path(name): Path<String>,
) -> Result<Json<ClusterComparison>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let other_clusters = state
    .store
    .all_known_clusters()
    .await
    .map_err(ApiError::store)?;
  let terms = state
    .store
    .terms_for_cluster(&name)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(ClusterComparison { cluster: name, terms, other_clusters }))
}

/// `GET /terms/{id}/cluster-comparison`
pub async fn term_comparison<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<BTreeMap<String, Vec<TermContext>>>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let grouped = state
    .store
    .cluster_comparison(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(grouped))
}
