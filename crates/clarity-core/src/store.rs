//! The `GlossaryStore` trait.
//!
//! Implemented by storage backends (e.g. `clarity-store-sqlite`). The HTTP
//! layer and the gap detector depend on this abstraction, never on a concrete
//! backend, and receive it by injection.

use std::{
  collections::{BTreeMap, BTreeSet},
  future::Future,
};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  cluster::{Cluster, CoverageReport, NewCluster},
  error::Classify,
  gap::{GapAnalytics, GapFinding, GapQuery},
  governance::{
    FlagQuery, FlagStatus, NewFlag, NewProposal, ProposalQuery, ProposalStatus, TermFlag,
    TermProposal,
  },
  onboarding::{NewOnboardingPath, OnboardingPath, OnboardingProgress, PathQuery},
  relationship::{NewExample, NewRelationship, TermExample, TermRelationship},
  term::{
    NewContext, NewTerm, Page, SearchQuery, Term, TermContext, TermDetail, TermPatch,
    TermQuery,
  },
  usage::{RecentTerm, UsageEvent},
  version::{NewVersion, TermVersion},
};

/// Abstraction over a glossary backend.
///
/// Versions and usage events are append-only. Terms are mutable, but every
/// mutation made through [`update_term`](Self::update_term) or
/// [`restore_version`](Self::restore_version) first records the replaced
/// state as a new version.
///
/// `actor` is the user a mutation is attributed to; `None` means the change
/// is unattributed.
///
/// All methods return `Send` futures so the trait can be used from a
/// multi-threaded runtime (tokio with `axum`).
pub trait GlossaryStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── Terms ─────────────────────────────────────────────────────────────

  fn create_term(
    &self,
    input: NewTerm,
    actor: Option<Uuid>,
  ) -> impl Future<Output = Result<Term, Self::Error>> + Send + '_;

  /// Returns `None` if the term does not exist.
  fn get_term(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Term>, Self::Error>> + Send + '_;

  /// Terms ordered by name.
  fn list_terms<'a>(
    &'a self,
    query: &'a TermQuery,
  ) -> impl Future<Output = Result<Page<Term>, Self::Error>> + Send + 'a;

  /// Snapshot the current state, then apply `patch`, atomically.
  ///
  /// An empty patch returns the term unchanged and records no version.
  fn update_term(
    &self,
    id: Uuid,
    patch: TermPatch,
    actor: Option<Uuid>,
    reason: Option<String>,
  ) -> impl Future<Output = Result<Term, Self::Error>> + Send + '_;

  /// Delete a term with its contexts and gap findings. Its versions remain.
  fn delete_term(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Contexts ──────────────────────────────────────────────────────────

  fn add_context(
    &self,
    term_id: Uuid,
    input: NewContext,
    actor: Option<Uuid>,
  ) -> impl Future<Output = Result<TermContext, Self::Error>> + Send + '_;

  /// All contexts of a term, newest first.
  fn get_contexts(
    &self,
    term_id: Uuid,
  ) -> impl Future<Output = Result<Vec<TermContext>, Self::Error>> + Send + '_;

  // ── Examples & relationships ──────────────────────────────────────────

  /// The term with its contexts, examples and relationships. Returns `None`
  /// if the term does not exist.
  fn term_detail(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<TermDetail>, Self::Error>> + Send + '_;

  /// A `context_id`, if given, must name one of the term's own contexts.
  fn add_example(
    &self,
    term_id: Uuid,
    input: NewExample,
    actor: Option<Uuid>,
  ) -> impl Future<Output = Result<TermExample, Self::Error>> + Send + '_;

  /// Examples of a term, newest first.
  fn list_examples(
    &self,
    term_id: Uuid,
  ) -> impl Future<Output = Result<Vec<TermExample>, Self::Error>> + Send + '_;

  /// Link two existing terms. A second link of the same type between the
  /// same ordered pair is a conflict.
  fn add_relationship(
    &self,
    term_id: Uuid,
    input: NewRelationship,
    actor: Option<Uuid>,
  ) -> impl Future<Output = Result<TermRelationship, Self::Error>> + Send + '_;

  /// Outgoing links of a term with a summary of each linked term, ordered by
  /// type then linked name.
  fn list_relationships(
    &self,
    term_id: Uuid,
  ) -> impl Future<Output = Result<Vec<TermRelationship>, Self::Error>> + Send + '_;

  // ── Versions ──────────────────────────────────────────────────────────

  /// Append a snapshot, assigning the next version number for its subject.
  ///
  /// Safe under concurrent callers: two calls for the same subject never
  /// receive the same number.
  fn record_version(
    &self,
    input: NewVersion,
  ) -> impl Future<Output = Result<TermVersion, Self::Error>> + Send + '_;

  /// Capture the term's current state as a new version.
  fn snapshot_term(
    &self,
    term_id: Uuid,
    actor: Option<Uuid>,
    reason: Option<String>,
  ) -> impl Future<Output = Result<TermVersion, Self::Error>> + Send + '_;

  /// Returns `None` if the version does not exist.
  fn get_version(
    &self,
    version_id: Uuid,
  ) -> impl Future<Output = Result<Option<TermVersion>, Self::Error>> + Send + '_;

  /// Versions of a subject, highest number first. Unknown subjects yield an
  /// empty list.
  fn list_versions(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Vec<TermVersion>, Self::Error>> + Send + '_;

  /// Roll a term back to one of its own versions.
  ///
  /// Records the current state with reason `"Rollback to version N"`, then
  /// overwrites exactly the fields the target snapshot captured. A version
  /// belonging to another subject is reported as not found.
  fn restore_version(
    &self,
    term_id: Uuid,
    version_id: Uuid,
    actor: Option<Uuid>,
  ) -> impl Future<Output = Result<Term, Self::Error>> + Send + '_;

  // ── Clusters ──────────────────────────────────────────────────────────

  /// Every distinct non-empty cluster name appearing on any context.
  fn all_known_clusters(
    &self,
  ) -> impl Future<Output = Result<BTreeSet<String>, Self::Error>> + Send + '_;

  /// Terms with at least one context in `cluster`, ordered by name.
  fn terms_for_cluster<'a>(
    &'a self,
    cluster: &'a str,
  ) -> impl Future<Output = Result<Vec<Term>, Self::Error>> + Send + 'a;

  /// A term's clustered contexts grouped by cluster, newest first within
  /// each group. Unknown terms yield an empty map.
  fn cluster_comparison(
    &self,
    term_id: Uuid,
  ) -> impl Future<Output = Result<BTreeMap<String, Vec<TermContext>>, Self::Error>>
  + Send
  + '_;

  /// Registered clusters, falling back to clusters derived from contexts
  /// when none are registered.
  fn list_clusters(
    &self,
  ) -> impl Future<Output = Result<Vec<Cluster>, Self::Error>> + Send + '_;

  fn create_cluster(
    &self,
    input: NewCluster,
    owner: Option<Uuid>,
  ) -> impl Future<Output = Result<Cluster, Self::Error>> + Send + '_;

  fn cluster_coverage(
    &self,
  ) -> impl Future<Output = Result<CoverageReport, Self::Error>> + Send + '_;

  // ── Gaps ──────────────────────────────────────────────────────────────

  fn record_gap<'a>(
    &'a self,
    finding: &'a GapFinding,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Returns `None` if the finding does not exist.
  fn get_gap(
    &self,
    gap_id: Uuid,
  ) -> impl Future<Output = Result<Option<GapFinding>, Self::Error>> + Send + '_;

  /// Findings newest first.
  fn list_gaps<'a>(
    &'a self,
    query: &'a GapQuery,
  ) -> impl Future<Output = Result<Page<GapFinding>, Self::Error>> + Send + 'a;

  /// Mark a finding resolved. Fails if it is unknown or already resolved.
  fn resolve_gap(
    &self,
    gap_id: Uuid,
    actor: Option<Uuid>,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<GapFinding, Self::Error>> + Send + '_;

  fn gap_analytics(
    &self,
  ) -> impl Future<Output = Result<GapAnalytics, Self::Error>> + Send + '_;

  // ── Governance ────────────────────────────────────────────────────────

  /// Submit a proposal. It starts out `pending`. A referenced term must
  /// exist.
  fn create_proposal(
    &self,
    input: NewProposal,
    actor: Option<Uuid>,
  ) -> impl Future<Output = Result<TermProposal, Self::Error>> + Send + '_;

  /// Returns `None` if the proposal does not exist.
  fn get_proposal(
    &self,
    proposal_id: Uuid,
  ) -> impl Future<Output = Result<Option<TermProposal>, Self::Error>> + Send + '_;

  /// Proposals newest first.
  fn list_proposals<'a>(
    &'a self,
    query: &'a ProposalQuery,
  ) -> impl Future<Output = Result<Page<TermProposal>, Self::Error>> + Send + 'a;

  /// Approve or reject a pending proposal. `status` must be a verdict; a
  /// proposal that was already reviewed is a conflict.
  fn review_proposal(
    &self,
    proposal_id: Uuid,
    status: ProposalStatus,
    actor: Option<Uuid>,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<TermProposal, Self::Error>> + Send + '_;

  /// Raise an `open` flag against an existing term.
  fn create_flag(
    &self,
    term_id: Uuid,
    input: NewFlag,
    actor: Option<Uuid>,
  ) -> impl Future<Output = Result<TermFlag, Self::Error>> + Send + '_;

  /// Returns `None` if the flag does not exist.
  fn get_flag(
    &self,
    flag_id: Uuid,
  ) -> impl Future<Output = Result<Option<TermFlag>, Self::Error>> + Send + '_;

  /// Flags newest first.
  fn list_flags<'a>(
    &'a self,
    query: &'a FlagQuery,
  ) -> impl Future<Output = Result<Page<TermFlag>, Self::Error>> + Send + 'a;

  /// Move a flag to any status; see [`TermFlag::transition`].
  fn set_flag_status(
    &self,
    flag_id: Uuid,
    status: FlagStatus,
    actor: Option<Uuid>,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<TermFlag, Self::Error>> + Send + '_;

  // ── Onboarding ────────────────────────────────────────────────────────

  fn create_onboarding_path(
    &self,
    input: NewOnboardingPath,
  ) -> impl Future<Output = Result<OnboardingPath, Self::Error>> + Send + '_;

  /// The lowest-ordered path matching `query`, or `None`.
  fn onboarding_path<'a>(
    &'a self,
    query: &'a PathQuery,
  ) -> impl Future<Output = Result<Option<OnboardingPath>, Self::Error>> + Send + 'a;

  /// Progress of `user` through the path matching `query`. With no matching
  /// path both counts are zero.
  fn onboarding_progress<'a>(
    &'a self,
    user: Uuid,
    query: &'a PathQuery,
  ) -> impl Future<Output = Result<OnboardingProgress, Self::Error>> + Send + 'a;

  /// Mark `user` as onboarded. Repeated calls keep the first completion time.
  fn complete_onboarding(
    &self,
    user: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Usage ─────────────────────────────────────────────────────────────

  fn log_usage(
    &self,
    event: UsageEvent,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Number of `viewed` events for a term.
  fn view_count(
    &self,
    term_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Distinct terms `actor` viewed, most recent first.
  fn recently_viewed(
    &self,
    actor: Uuid,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<RecentTerm>, Self::Error>> + Send + '_;

  // ── Search ────────────────────────────────────────────────────────────

  /// Case-insensitive full-text match over term and base definition, ordered
  /// by name. Text without any words matches nothing.
  fn search_terms<'a>(
    &'a self,
    query: &'a SearchQuery,
  ) -> impl Future<Output = Result<Page<Term>, Self::Error>> + Send + 'a;
}
