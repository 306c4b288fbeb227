//! JSON REST API for Clarity.
//!
//! Exposes an axum [`Router`] backed by any
//! [`clarity_core::store::GlossaryStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let state = clarity_api::AppState::new(Arc::new(store), default_actor);
//! .nest("/api/v1", clarity_api::api_router(state))
//! ```

pub mod actor;
pub mod analytics;
pub mod clusters;
pub mod error;
pub mod gaps;
pub mod governance;
pub mod onboarding;
pub mod search;
pub mod terms;
pub mod usage;
pub mod versions;

use std::sync::Arc;

use axum::{
  Json, Router,
  routing::{get, patch, post},
};
use clarity_core::store::GlossaryStore;
use serde_json::{Value, json};
use uuid::Uuid;

pub use actor::Actor;
pub use error::ApiError;
pub use usage::UsageRecorder;

// ─── State ───────────────────────────────────────────────────────────────────

/// Shared state threaded through every handler.
pub struct AppState<S> {
  pub store:         Arc<S>,
  pub usage:         UsageRecorder,
  /// Actor used when a request carries no `X-Actor-Id` header.
  pub default_actor: Option<Uuid>,
}

// Manual impl: `S` itself need not be `Clone`.
impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:         Arc::clone(&self.store),
      usage:         self.usage.clone(),
      default_actor: self.default_actor,
    }
  }
}

impl<S: GlossaryStore + 'static> AppState<S> {
  /// State with a freshly spawned usage recorder writing to `store`.
  ///
  /// Must be called from within a tokio runtime.
  pub fn new(store: Arc<S>, default_actor: Option<Uuid>) -> Self {
    let usage = UsageRecorder::spawn(Arc::clone(&store));
    Self { store, usage, default_actor }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

/// Build a fully-materialised API router over `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: GlossaryStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    // Terms
    .route("/terms", get(terms::list::<S>).post(terms::create::<S>))
    .route(
      "/terms/{id}",
      get(terms::get_one::<S>)
        .put(terms::update::<S>)
        .delete(terms::delete::<S>),
    )
    .route(
      "/terms/{id}/contexts",
      get(terms::list_contexts::<S>).post(terms::create_context::<S>),
    )
    .route("/terms/{id}/versions", get(versions::list::<S>))
    .route("/terms/{id}/rollback", post(versions::rollback::<S>))
    .route("/terms/{id}/cluster-comparison", get(clusters::term_comparison::<S>))
    .route("/terms/{id}/views", get(usage::view_count::<S>))
    .route(
      "/terms/{id}/examples",
      get(terms::list_examples::<S>).post(terms::create_example::<S>),
    )
    .route(
      "/terms/{id}/relationships",
      get(terms::list_relationships::<S>).post(terms::create_relationship::<S>),
    )
    .route("/terms/{id}/flags", post(governance::create_flag::<S>))
    // Versions
    .route("/versions/compare", get(versions::compare_versions::<S>))
    .route("/versions/{id}", get(versions::get_one::<S>))
    // Gaps
    .route("/gaps", get(gaps::list::<S>))
    .route("/gaps/detect", post(gaps::detect::<S>))
    .route("/gaps/{id}", get(gaps::get_one::<S>))
    .route("/gaps/{id}/resolve", patch(gaps::resolve::<S>))
    // Governance
    .route(
      "/proposals",
      get(governance::list_proposals::<S>).post(governance::create_proposal::<S>),
    )
    .route("/proposals/{id}", get(governance::get_proposal::<S>))
    .route("/proposals/{id}/status", patch(governance::review_proposal::<S>))
    .route("/flags", get(governance::list_flags::<S>))
    .route("/flags/{id}", get(governance::get_flag::<S>))
    .route("/flags/{id}/status", patch(governance::set_flag_status::<S>))
    // Onboarding
    .route("/onboarding/path", get(onboarding::path::<S>))
    .route("/onboarding/paths", post(onboarding::create_path::<S>))
    .route("/onboarding/progress", get(onboarding::progress::<S>))
    .route("/onboarding/complete", post(onboarding::complete::<S>))
    // Clusters
    .route("/clusters", get(clusters::list::<S>).post(clusters::create::<S>))
    .route("/clusters/{name}/terms", get(clusters::terms::<S>))
    .route("/clusters/{name}/comparison", get(clusters::comparison::<S>))
    // Analytics
    .route("/analytics/gaps", get(analytics::gaps::<S>))
    .route("/analytics/cluster-coverage", get(analytics::cluster_coverage::<S>))
    // Usage
    .route("/usage/recently-viewed", get(usage::recently_viewed::<S>))
    // Search
    .route("/search", get(search::handler::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use clarity_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  const ALICE: &str = "6f0c2a9e-3d1b-4c8a-9f57-1e2d3c4b5a60";

  async fn make_state() -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    AppState::new(Arc::new(store), None)
  }

  async fn send(
    state:  &AppState<SqliteStore>,
    method: &str,
    uri:    &str,
    actor:  Option<&str>,
    body:   Option<Value>,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(a) = actor {
      builder = builder.header(actor::ACTOR_HEADER, a);
    }
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    api_router(state.clone())
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap()
  }

  async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  async fn create_term(state: &AppState<SqliteStore>, name: &str) -> Value {
    let resp = send(
      state,
      "POST",
      "/terms",
      Some(ALICE),
      Some(json!({ "term": name, "base_definition": format!("{name} definition") })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    json_body(resp).await
  }

  async fn add_context(state: &AppState<SqliteStore>, term_id: &str, cluster: &str, def: &str) {
    let resp = send(
      state,
      "POST",
      &format!("/terms/{term_id}/contexts"),
      Some(ALICE),
      Some(json!({ "cluster": cluster, "context_definition": def })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
  }

  // ── Health ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn health_reports_ok() {
    let state = make_state().await;
    let resp = send(&state, "GET", "/health", None, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await, json!({ "status": "ok" }));
  }

  // ── Terms ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_then_get_term() {
    let state = make_state().await;
    let created = create_term(&state, "Settlement").await;
    assert_eq!(created["created_by"], ALICE);

    let id = created["term_id"].as_str().unwrap();
    let resp = send(&state, "GET", &format!("/terms/{id}"), None, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["term"], "Settlement");
  }

  #[tokio::test]
  async fn create_term_with_blank_name_is_400() {
    let state = make_state().await;
    let resp = send(
      &state,
      "POST",
      "/terms",
      None,
      Some(json!({ "term": "  ", "base_definition": "x" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn get_unknown_term_is_404() {
    let state = make_state().await;
    let resp = send(&state, "GET", &format!("/terms/{}", Uuid::new_v4()), None, None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(json_body(resp).await["error"].is_string());
  }

  #[tokio::test]
  async fn malformed_actor_header_is_400() {
    let state = make_state().await;
    let resp = send(
      &state,
      "POST",
      "/terms",
      Some("not-a-uuid"),
      Some(json!({ "term": "Netting", "base_definition": "Offsetting obligations" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn list_terms_filters_by_category() {
    let state = make_state().await;
    send(
      &state,
      "POST",
      "/terms",
      None,
      Some(json!({ "term": "KYC", "base_definition": "Know your customer", "category": "compliance" })),
    )
    .await;
    create_term(&state, "Ledger").await;

    let resp = send(&state, "GET", "/terms?category=compliance", None, None).await;
    let page = json_body(resp).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["limit"], 20);
    assert_eq!(page["data"][0]["term"], "KYC");
  }

  #[tokio::test]
  async fn delete_term_then_get_is_404() {
    let state = make_state().await;
    let id = create_term(&state, "Accrual").await["term_id"].as_str().unwrap().to_string();

    let resp = send(&state, "DELETE", &format!("/terms/{id}"), None, None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = send(&state, "GET", &format!("/terms/{id}"), None, None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Versions ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn update_records_version_and_rollback_restores_it() {
    let state = make_state().await;
    let id = create_term(&state, "Exposure").await["term_id"].as_str().unwrap().to_string();

    let resp = send(
      &state,
      "PUT",
      &format!("/terms/{id}"),
      Some(ALICE),
      Some(json!({ "base_definition": "Amount at risk", "change_reason": "clarify" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["base_definition"], "Amount at risk");

    let resp = send(&state, "GET", &format!("/terms/{id}/versions"), None, None).await;
    let versions = json_body(resp).await;
    let versions = versions.as_array().unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0]["version_number"], 1);
    assert_eq!(versions[0]["change_reason"], "clarify");
    assert_eq!(versions[0]["snapshot"]["base_definition"], "Exposure definition");
    let version_id = versions[0]["version_id"].as_str().unwrap().to_string();

    let resp = send(
      &state,
      "POST",
      &format!("/terms/{id}/rollback"),
      Some(ALICE),
      Some(json!({ "version_id": version_id })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["base_definition"], "Exposure definition");

    let resp = send(&state, "GET", &format!("/terms/{id}/versions"), None, None).await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn compare_versions_reports_differences() {
    let state = make_state().await;
    let id = create_term(&state, "Margin").await["term_id"].as_str().unwrap().to_string();
    for def in ["Collateral posted", "Collateral required"] {
      send(
        &state,
        "PUT",
        &format!("/terms/{id}"),
        None,
        Some(json!({ "base_definition": def })),
      )
      .await;
    }
    let resp = send(&state, "GET", &format!("/terms/{id}/versions"), None, None).await;
    let versions = json_body(resp).await;
    // Highest version first.
    let v2 = versions[0]["version_id"].as_str().unwrap().to_string();
    let v1 = versions[1]["version_id"].as_str().unwrap().to_string();

    let resp = send(
      &state,
      "GET",
      &format!("/versions/compare?version1={v1}&version2={v2}"),
      None,
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["differences"]["base_definition"]["old"], "Margin definition");
    assert_eq!(body["differences"]["base_definition"]["new"], "Collateral posted");
    assert!(body["differences"].get("term").is_none());
  }

  #[tokio::test]
  async fn compare_versions_rejects_missing_and_unknown_ids() {
    let state = make_state().await;

    let resp = send(&state, "GET", "/versions/compare?version1=abc", None, None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(&state, "GET", "/versions/compare?version1=abc&version2=def", None, None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let uri = format!(
      "/versions/compare?version1={}&version2={}",
      Uuid::new_v4(),
      Uuid::new_v4()
    );
    let resp = send(&state, "GET", &uri, None, None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn get_unknown_version_is_404() {
    let state = make_state().await;
    let resp = send(&state, "GET", &format!("/versions/{}", Uuid::new_v4()), None, None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Gaps ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn detect_then_resolve_once() {
    let state = make_state().await;
    let a = create_term(&state, "Customer").await["term_id"].as_str().unwrap().to_string();
    let b = create_term(&state, "Account").await["term_id"].as_str().unwrap().to_string();
    add_context(&state, &a, "retail", "A person who holds an account").await;
    add_context(&state, &b, "lending", "A borrowing relationship").await;

    let resp = send(&state, "POST", "/gaps/detect", None, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["message"], "Gap detection completed");
    assert_eq!(body["gaps_detected"], 2);
    assert_eq!(body["gaps"][0]["gap_type"], "missing_context");

    let resp = send(&state, "GET", "/gaps?gap_type=missing_context&resolved=false", None, None).await;
    let page = json_body(resp).await;
    assert_eq!(page["total"], 2);
    let gap_id = page["data"][0]["gap_id"].as_str().unwrap().to_string();

    let resp = send(&state, "PATCH", &format!("/gaps/{gap_id}/resolve"), Some(ALICE), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resolved = json_body(resp).await;
    assert_eq!(resolved["resolved_by"], ALICE);
    assert!(resolved["resolved_at"].is_string());

    let resp = send(&state, "PATCH", &format!("/gaps/{gap_id}/resolve"), None, None).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = send(&state, "GET", "/analytics/gaps", None, None).await;
    let analytics = json_body(resp).await;
    assert_eq!(analytics["total_gaps"], 1);
    assert_eq!(analytics["resolved_gaps"], 1);
  }

  #[tokio::test]
  async fn resolve_unknown_gap_is_404() {
    let state = make_state().await;
    let uri = format!("/gaps/{}/resolve", Uuid::new_v4());
    let resp = send(&state, "PATCH", &uri, None, None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Clusters ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn clusters_fall_back_to_derived_then_reject_duplicates() {
    let state = make_state().await;
    let id = create_term(&state, "Payment").await["term_id"].as_str().unwrap().to_string();
    add_context(&state, &id, "payments", "A transfer of funds").await;

    let resp = send(&state, "GET", "/clusters", None, None).await;
    let clusters = json_body(resp).await;
    assert_eq!(clusters[0]["name"], "payments");

    let body = json!({ "name": "treasury", "description": "Cash management" });
    let resp = send(&state, "POST", "/clusters", Some(ALICE), Some(body.clone())).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(json_body(resp).await["owner_id"], ALICE);

    let resp = send(&state, "POST", "/clusters", None, Some(body)).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn cluster_comparison_endpoints() {
    let state = make_state().await;
    let id = create_term(&state, "Limit").await["term_id"].as_str().unwrap().to_string();
    add_context(&state, &id, "credit", "Maximum credit extended").await;
    add_context(&state, &id, "trading", "Maximum open position").await;

    let resp = send(&state, "GET", &format!("/terms/{id}/cluster-comparison"), None, None).await;
    let grouped = json_body(resp).await;
    assert_eq!(grouped["credit"][0]["context_definition"], "Maximum credit extended");
    assert_eq!(grouped["trading"].as_array().unwrap().len(), 1);

    let resp = send(&state, "GET", "/clusters/credit/comparison", None, None).await;
    let body = json_body(resp).await;
    assert_eq!(body["cluster"], "credit");
    assert_eq!(body["terms"][0]["term"], "Limit");
    assert_eq!(body["other_clusters"], json!(["credit", "trading"]));

    let resp = send(&state, "GET", "/clusters/trading/terms", None, None).await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 1);
  }

  // ── Examples & relationships ────────────────────────────────────────────────

  #[tokio::test]
  async fn get_term_embeds_contexts_examples_and_relationships() {
    let state = make_state().await;
    let kyc = create_term(&state, "KYC").await;
    let cdd = create_term(&state, "CDD").await;
    let kyc_id = kyc["term_id"].as_str().unwrap();
    let cdd_id = cdd["term_id"].as_str().unwrap();
    add_context(&state, kyc_id, "retail", "Customer checks at onboarding").await;

    let resp = send(
      &state,
      "POST",
      &format!("/terms/{kyc_id}/examples"),
      Some(ALICE),
      Some(json!({ "example_text": "KYC is refreshed every two years", "source": "Policy 7" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let link = json!({ "related_term_id": cdd_id, "relationship_type": "see_also" });
    let uri = format!("/terms/{kyc_id}/relationships");
    let resp = send(&state, "POST", &uri, Some(ALICE), Some(link.clone())).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = send(&state, "POST", &uri, Some(ALICE), Some(link)).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(resp).await["error"], "relationship already exists");

    let resp = send(&state, "GET", &format!("/terms/{kyc_id}"), None, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["term"], "KYC");
    assert_eq!(body["contexts"][0]["cluster"], "retail");
    assert_eq!(body["examples"][0]["source"], "Policy 7");
    assert_eq!(body["relationships"][0]["relationship_type"], "see_also");
    assert_eq!(body["relationships"][0]["related_term"]["term"], "CDD");
  }

  #[tokio::test]
  async fn unknown_relationship_type_is_400() {
    let state = make_state().await;
    let a = create_term(&state, "Bid").await;
    let b = create_term(&state, "Ask").await;
    let resp = send(
      &state,
      "POST",
      &format!("/terms/{}/relationships", a["term_id"].as_str().unwrap()),
      None,
      Some(json!({ "related_term_id": b["term_id"], "relationship_type": "cousin" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  // ── Governance ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn proposal_review_flow() {
    let state = make_state().await;
    let term = create_term(&state, "Netting").await;
    let resp = send(
      &state,
      "POST",
      "/proposals",
      Some(ALICE),
      Some(json!({
        "term_id": term["term_id"],
        "proposal_type": "update",
        "proposed_data": { "base_definition": "Offsetting of obligations" },
        "reason": "too vague"
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let proposal = json_body(resp).await;
    assert_eq!(proposal["status"], "pending");
    assert_eq!(proposal["proposed_by"], ALICE);
    let id = proposal["proposal_id"].as_str().unwrap();
    let status_uri = format!("/proposals/{id}/status");

    let resp = send(&state, "PATCH", &status_uri, None, Some(json!({ "status": "pending" }))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(&state, "PATCH", &status_uri, Some(ALICE), Some(json!({ "status": "approved" })))
      .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["reviewed_by"], ALICE);

    let resp = send(&state, "PATCH", &status_uri, None, Some(json!({ "status": "rejected" }))).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = send(&state, "GET", "/proposals?status=approved", None, None).await;
    let page = json_body(resp).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["limit"], 20);

    let resp = send(&state, "GET", "/proposals?status=archived", None, None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn flag_lifecycle() {
    let state = make_state().await;
    let term = create_term(&state, "LIBOR").await;
    let term_id = term["term_id"].as_str().unwrap();

    let resp = send(
      &state,
      "POST",
      &format!("/terms/{term_id}/flags"),
      None,
      Some(json!({ "flag_type": "outdated", "description": "Rate was discontinued" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let flag = json_body(resp).await;
    assert_eq!(flag["status"], "open");
    let id = flag["flag_id"].as_str().unwrap();

    let resp = send(
      &state,
      "PATCH",
      &format!("/flags/{id}/status"),
      Some(ALICE),
      Some(json!({ "status": "resolved" })),
    )
    .await;
    let body = json_body(resp).await;
    assert_eq!(body["resolved_by"], ALICE);
    assert!(body["resolved_at"].is_string());

    let resp = send(&state, "GET", &format!("/flags?term_id={term_id}&status=resolved"), None, None)
      .await;
    assert_eq!(json_body(resp).await["total"], 1);

    let resp = send(&state, "GET", &format!("/flags/{}", Uuid::new_v4()), None, None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Onboarding ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn onboarding_path_progress_and_completion() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let (recorder, receiver) = UsageRecorder::channel(16);
    let state = AppState { store: Arc::clone(&store), usage: recorder, default_actor: None };

    let resp = send(&state, "GET", "/onboarding/path", None, None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let a = create_term(&state, "Margin").await["term_id"].as_str().unwrap().to_string();
    let b = create_term(&state, "Haircut").await["term_id"].as_str().unwrap().to_string();
    let resp = send(
      &state,
      "POST",
      "/onboarding/paths",
      None,
      Some(json!({ "role": "viewer", "cluster": "risk", "term_ids": [a, b] })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(&state, "GET", "/onboarding/path?cluster=risk", None, None).await;
    assert_eq!(json_body(resp).await["term_ids"], json!([a, b]));

    send(&state, "GET", &format!("/terms/{a}"), Some(ALICE), None).await;
    drop(state);
    usage::drain(Arc::clone(&store), receiver).await;
    let state = AppState::new(store, None);

    let resp = send(&state, "GET", "/onboarding/progress", None, None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(&state, "GET", "/onboarding/progress?cluster=risk", Some(ALICE), None).await;
    let body = json_body(resp).await;
    assert_eq!(body["viewed_count"], 1);
    assert_eq!(body["total_count"], 2);
    assert_eq!(body["progress_percent"], 50.0);
    assert_eq!(body["onboarding_completed"], false);

    let resp = send(&state, "POST", "/onboarding/complete", Some(ALICE), None).await;
    assert_eq!(json_body(resp).await["message"], "onboarding completed");
    let resp = send(&state, "GET", "/onboarding/progress", Some(ALICE), None).await;
    assert_eq!(json_body(resp).await["onboarding_completed"], true);
  }

  // ── Usage ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn viewing_a_term_is_logged() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let (recorder, receiver) = UsageRecorder::channel(16);
    let state = AppState { store: Arc::clone(&store), usage: recorder, default_actor: None };

    let id = create_term(&state, "Haircut").await["term_id"].as_str().unwrap().to_string();
    let resp = send(&state, "GET", &format!("/terms/{id}?cluster=risk"), Some(ALICE), None).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Dropping the last recorder closes the channel, so the drain finishes.
    drop(state);
    usage::drain(Arc::clone(&store), receiver).await;

    let state = AppState::new(store, None);
    let resp = send(&state, "GET", &format!("/terms/{id}/views"), None, None).await;
    let body = json_body(resp).await;
    assert_eq!(body["term_id"], id.as_str());
    assert_eq!(body["view_count"], 1);

    let resp = send(&state, "GET", "/usage/recently-viewed", Some(ALICE), None).await;
    let body = json_body(resp).await;
    assert_eq!(body["data"][0]["term"], "Haircut");
  }

  // ── Search ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn search_requires_query() {
    let state = make_state().await;
    let resp = send(&state, "GET", "/search", None, None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "query parameter 'q' is required");
  }

  #[tokio::test]
  async fn search_matches_definition_text() {
    let state = make_state().await;
    create_term(&state, "Collateral").await;
    create_term(&state, "Coupon").await;

    let resp = send(&state, "GET", "/search?q=collateral", None, None).await;
    let page = json_body(resp).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["data"][0]["term"], "Collateral");
  }
}
