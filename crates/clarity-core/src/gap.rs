//! Gap findings and the pure per-term classification checks.
//!
//! Three independent checks run for every term:
//!
//! | Check | Emits when | Severity |
//! |-------|------------|----------|
//! | missing context | the term has contexts in some clusters but not all | `high` if more than half the universe is missing, else `medium` |
//! | conflicting definition | two clusters' current definitions score below 0.5 similarity | `medium` for two clusters, else `high` |
//! | outdated | a clustered context was last updated over six months ago | `low` |
//!
//! Each check yields at most one finding per term and none of them suppress
//! each other. Nothing here touches storage; see [`crate::detect`] for the
//! run that feeds these checks and persists their output.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::term::TermContext;

/// Definitions scoring below this are considered to conflict.
pub const CONFLICT_THRESHOLD: f64 = 0.5;

/// Definitions this many bytes long or shorter never conflict.
pub const MIN_CONFLICT_DEFINITION_LEN: usize = 20;

/// Contexts untouched for this many calendar months are outdated.
pub const STALE_AFTER_MONTHS: u32 = 6;

// ─── Types ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapType {
  MissingContext,
  ConflictingDefinition,
  Outdated,
}

impl GapType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::MissingContext => "missing_context",
      Self::ConflictingDefinition => "conflicting_definition",
      Self::Outdated => "outdated",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Low,
  Medium,
  High,
}

impl Severity {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Low => "low",
      Self::Medium => "medium",
      Self::High => "high",
    }
  }
}

/// A persisted discrepancy for one term.
///
/// Immutable apart from the resolve transition, which sets `resolved_at` and
/// `resolved_by` exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapFinding {
  pub gap_id:            Uuid,
  pub subject_id:        Uuid,
  pub gap_type:          GapType,
  /// Never empty; sorted and de-duplicated.
  pub affected_clusters: Vec<String>,
  pub severity:          Severity,
  pub description:       String,
  pub detected_at:       DateTime<Utc>,
  pub resolved_at:       Option<DateTime<Utc>>,
  pub resolved_by:       Option<Uuid>,
}

impl GapFinding {
  pub fn is_resolved(&self) -> bool { self.resolved_at.is_some() }
}

/// The output of a single check, before it is given an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedGap {
  pub gap_type:          GapType,
  pub affected_clusters: BTreeSet<String>,
  pub severity:          Severity,
  pub description:       String,
}

impl DetectedGap {
  pub fn into_finding(self, subject_id: Uuid, detected_at: DateTime<Utc>) -> GapFinding {
    GapFinding {
      gap_id: Uuid::new_v4(),
      subject_id,
      gap_type: self.gap_type,
      affected_clusters: self.affected_clusters.into_iter().collect(),
      severity: self.severity,
      description: self.description,
      detected_at,
      resolved_at: None,
      resolved_by: None,
    }
  }
}

// ─── Queries and analytics ───────────────────────────────────────────────────

/// Parameters for [`crate::store::GlossaryStore::list_gaps`].
#[derive(Debug, Clone)]
pub struct GapQuery {
  pub gap_type: Option<GapType>,
  pub severity: Option<Severity>,
  /// Only findings naming this cluster.
  pub cluster:  Option<String>,
  /// `Some(true)` for resolved only, `Some(false)` for open only.
  pub resolved: Option<bool>,
  pub limit:    usize,
  pub offset:   usize,
}

impl Default for GapQuery {
  fn default() -> Self {
    Self {
      gap_type: None,
      severity: None,
      cluster:  None,
      resolved: None,
      limit:    20,
      offset:   0,
    }
  }
}

/// Aggregate counts over stored findings. `total_gaps` and both breakdowns
/// count open findings only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapAnalytics {
  pub total_gaps:       u64,
  pub gaps_by_type:     BTreeMap<String, u64>,
  pub gaps_by_severity: BTreeMap<String, u64>,
  pub resolved_gaps:    u64,
}

// ─── Similarity ──────────────────────────────────────────────────────────────

/// Crude bag-of-words similarity in `[0, 1]`.
///
/// Case-insensitive and whitespace-tokenised. Every word present in both
/// texts contributes its count from *both* sides to the numerator, which is
/// then divided by the total word count of both texts.
pub fn similarity(a: &str, b: &str) -> f64 {
  if a == b {
    return 1.0;
  }

  let a = a.to_lowercase();
  let b = b.to_lowercase();
  let words_a: Vec<&str> = a.split_whitespace().collect();
  let words_b: Vec<&str> = b.split_whitespace().collect();

  match (words_a.is_empty(), words_b.is_empty()) {
    (true, true) => return 1.0,
    (true, false) | (false, true) => return 0.0,
    (false, false) => {}
  }

  let counts_a = word_counts(&words_a);
  let counts_b = word_counts(&words_b);

  let common: usize = counts_a
    .iter()
    .filter_map(|(word, ca)| counts_b.get(word).map(|cb| ca + cb))
    .sum();

  common as f64 / (words_a.len() + words_b.len()) as f64
}

fn word_counts<'a>(words: &[&'a str]) -> HashMap<&'a str, usize> {
  let mut counts = HashMap::new();
  for word in words {
    *counts.entry(*word).or_insert(0) += 1;
  }
  counts
}

// ─── Grouping ────────────────────────────────────────────────────────────────

/// Group a term's contexts by cluster, preserving input order within each
/// group. Contexts without a cluster are dropped.
pub fn group_by_cluster(contexts: &[TermContext]) -> BTreeMap<&str, Vec<&TermContext>> {
  let mut grouped: BTreeMap<&str, Vec<&TermContext>> = BTreeMap::new();
  for ctx in contexts {
    if let Some(cluster) = ctx.cluster.as_deref() {
      grouped.entry(cluster).or_default().push(ctx);
    }
  }
  grouped
}

// ─── Checks ──────────────────────────────────────────────────────────────────

/// Clusters in `universe` that the term has no context in.
///
/// A term with no clustered context at all is not reported: there is no
/// evidence it belongs anywhere.
pub fn check_missing_context(
  by_cluster: &BTreeMap<&str, Vec<&TermContext>>,
  universe: &BTreeSet<String>,
) -> Option<DetectedGap> {
  if by_cluster.is_empty() {
    return None;
  }

  let missing: BTreeSet<String> = universe
    .iter()
    .filter(|c| !by_cluster.contains_key(c.as_str()))
    .cloned()
    .collect();
  if missing.is_empty() {
    return None;
  }

  let severity = if missing.len() > universe.len() / 2 {
    Severity::High
  } else {
    Severity::Medium
  };

  Some(DetectedGap {
    gap_type: GapType::MissingContext,
    description: format!(
      "Term has contexts in {} cluster(s) but is missing in {} cluster(s)",
      by_cluster.len(),
      missing.len()
    ),
    affected_clusters: missing,
    severity,
  })
}

/// Clusters whose current definitions disagree with another cluster's.
///
/// The current definition of a cluster is its first context, so callers must
/// pass contexts newest first.
pub fn check_conflicting_definitions(
  by_cluster: &BTreeMap<&str, Vec<&TermContext>>,
) -> Option<DetectedGap> {
  if by_cluster.len() < 2 {
    return None;
  }

  let current: Vec<(&str, &str)> = by_cluster
    .iter()
    .filter_map(|(cluster, ctxs)| {
      ctxs.first().map(|c| (*cluster, c.context_definition.as_str()))
    })
    .collect();

  let mut conflicting = BTreeSet::new();
  for (i, (cluster_a, def_a)) in current.iter().enumerate() {
    for (cluster_b, def_b) in &current[i + 1..] {
      if definitions_conflict(def_a, def_b) {
        conflicting.insert((*cluster_a).to_owned());
        conflicting.insert((*cluster_b).to_owned());
      }
    }
  }
  if conflicting.is_empty() {
    return None;
  }

  let severity = if conflicting.len() == 2 {
    Severity::Medium
  } else {
    Severity::High
  };

  Some(DetectedGap {
    gap_type: GapType::ConflictingDefinition,
    description: format!(
      "Term has conflicting definitions across {} cluster(s)",
      conflicting.len()
    ),
    affected_clusters: conflicting,
    severity,
  })
}

fn definitions_conflict(a: &str, b: &str) -> bool {
  a.len() > MIN_CONFLICT_DEFINITION_LEN
    && b.len() > MIN_CONFLICT_DEFINITION_LEN
    && similarity(a, b) < CONFLICT_THRESHOLD
}

/// Clusters with at least one context last updated before the staleness
/// cutoff relative to `now`.
pub fn check_outdated(contexts: &[TermContext], now: DateTime<Utc>) -> Option<DetectedGap> {
  let cutoff = stale_cutoff(now);

  let outdated: BTreeSet<String> = contexts
    .iter()
    .filter(|c| c.updated_at < cutoff)
    .filter_map(|c| c.cluster.clone())
    .collect();
  if outdated.is_empty() {
    return None;
  }

  Some(DetectedGap {
    gap_type: GapType::Outdated,
    description: format!(
      "Term has outdated context definitions in {} cluster(s) (not updated in {STALE_AFTER_MONTHS}+ months)",
      outdated.len()
    ),
    affected_clusters: outdated,
    severity: Severity::Low,
  })
}

/// `now` minus [`STALE_AFTER_MONTHS`] calendar months. Day-of-month overflow
/// clamps to the last day of the target month.
pub fn stale_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
  now
    .checked_sub_months(Months::new(STALE_AFTER_MONTHS))
    .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Run every check for one term and stamp the results as findings.
pub fn classify_term(
  subject_id: Uuid,
  contexts: &[TermContext],
  universe: &BTreeSet<String>,
  now: DateTime<Utc>,
) -> Vec<GapFinding> {
  let by_cluster = group_by_cluster(contexts);

  [
    check_missing_context(&by_cluster, universe),
    check_conflicting_definitions(&by_cluster),
    check_outdated(contexts, now),
  ]
  .into_iter()
  .flatten()
  .map(|gap| gap.into_finding(subject_id, now))
  .collect()
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;

  const KYC_RETAIL: &str = "Customer due diligence process for onboarding new clients";
  const KYC_TREASURY: &str = "Regulatory reporting requirement for cross-border transactions";

  fn ctx(cluster: Option<&str>, definition: &str, updated_at: DateTime<Utc>) -> TermContext {
    TermContext {
      context_id:          Uuid::new_v4(),
      term_id:             Uuid::nil(),
      cluster:             cluster.map(str::to_owned),
      system:              None,
      product:             None,
      context_definition:  definition.to_owned(),
      business_rules:      vec![],
      compliance_required: false,
      created_by:          None,
      created_at:          updated_at,
      updated_at,
    }
  }

  fn universe(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| (*s).to_owned()).collect()
  }

  fn clusters(gap: &DetectedGap) -> Vec<&str> {
    gap.affected_clusters.iter().map(String::as_str).collect()
  }

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 9, 15, 12, 0, 0).unwrap() }

  // ── similarity ─────────────────────────────────────────────────────────────

  #[test]
  fn similarity_of_identical_text_is_one() {
    assert_eq!(similarity(KYC_RETAIL, KYC_RETAIL), 1.0);
    assert_eq!(similarity("a b a", "a b a"), 1.0);
  }

  #[test]
  fn similarity_of_empty_inputs() {
    assert_eq!(similarity("", ""), 1.0);
    assert_eq!(similarity("   ", "\t"), 1.0);
    assert_eq!(similarity("x", ""), 0.0);
    assert_eq!(similarity("", "x"), 0.0);
  }

  #[test]
  fn similarity_ignores_case_and_spacing() {
    assert_eq!(similarity("Net  Asset Value", "net asset\nvalue"), 1.0);
  }

  #[test]
  fn similarity_with_no_shared_words_is_zero() {
    assert_eq!(similarity("settlement of funds", "net asset value"), 0.0);
  }

  #[test]
  fn similarity_of_kyc_wordings_is_low() {
    // Only "for" is shared: 2 / (8 + 6).
    assert!(similarity(KYC_RETAIL, KYC_TREASURY) < CONFLICT_THRESHOLD);
  }

  #[test]
  fn similarity_double_counts_shared_words() {
    // Shared: "a" (2 + 1). Total words: 3 + 2.
    assert_eq!(similarity("a a b", "a c"), 3.0 / 5.0);
    // Shared: "x" (1 + 1), "y" (1 + 1). Total words: 3 + 3.
    assert_eq!(similarity("x y z", "x y w"), 4.0 / 6.0);
  }

  // ── missing context ────────────────────────────────────────────────────────

  #[test]
  fn term_in_no_cluster_is_not_missing() {
    let contexts = vec![ctx(None, "unclustered", now())];
    let grouped = group_by_cluster(&contexts);
    assert!(check_missing_context(&grouped, &universe(&["A", "B"])).is_none());
  }

  #[test]
  fn term_in_every_cluster_is_not_missing() {
    let contexts = vec![ctx(Some("A"), "x", now()), ctx(Some("B"), "y", now())];
    let grouped = group_by_cluster(&contexts);
    assert!(check_missing_context(&grouped, &universe(&["A", "B"])).is_none());
  }

  #[test]
  fn two_of_three_missing_is_high() {
    let contexts = vec![ctx(Some("A"), "x", now())];
    let grouped = group_by_cluster(&contexts);
    let gap = check_missing_context(&grouped, &universe(&["A", "B", "C"])).unwrap();
    assert_eq!(gap.gap_type, GapType::MissingContext);
    assert_eq!(clusters(&gap), ["B", "C"]);
    // 2 > 3 / 2 == 1
    assert_eq!(gap.severity, Severity::High);
  }

  #[test]
  fn exactly_half_missing_is_medium() {
    let contexts = vec![ctx(Some("A"), "x", now()), ctx(Some("B"), "y", now())];
    let grouped = group_by_cluster(&contexts);
    let gap =
      check_missing_context(&grouped, &universe(&["A", "B", "C", "D"])).unwrap();
    assert_eq!(clusters(&gap), ["C", "D"]);
    // 2 > 4 / 2 == 2 is false
    assert_eq!(gap.severity, Severity::Medium);
  }

  #[test]
  fn one_of_three_missing_is_medium() {
    let contexts = vec![ctx(Some("A"), "x", now()), ctx(Some("B"), "y", now())];
    let grouped = group_by_cluster(&contexts);
    let gap = check_missing_context(&grouped, &universe(&["A", "B", "C"])).unwrap();
    assert_eq!(clusters(&gap), ["C"]);
    assert_eq!(gap.severity, Severity::Medium);
  }

  // ── conflicting definitions ────────────────────────────────────────────────

  #[test]
  fn disjoint_long_definitions_conflict() {
    let contexts = vec![
      ctx(Some("A"), KYC_RETAIL, now()),
      ctx(Some("B"), KYC_TREASURY, now()),
    ];
    let gap = check_conflicting_definitions(&group_by_cluster(&contexts)).unwrap();
    assert_eq!(gap.gap_type, GapType::ConflictingDefinition);
    assert_eq!(clusters(&gap), ["A", "B"]);
    assert_eq!(gap.severity, Severity::Medium);
  }

  #[test]
  fn short_definitions_never_conflict() {
    let contexts = vec![
      ctx(Some("A"), "Client onboarding", now()),
      ctx(Some("B"), KYC_TREASURY, now()),
    ];
    assert!(check_conflicting_definitions(&group_by_cluster(&contexts)).is_none());
  }

  #[test]
  fn similar_definitions_do_not_conflict() {
    let contexts = vec![
      ctx(Some("A"), KYC_RETAIL, now()),
      ctx(Some("B"), "Customer due diligence process for onboarding corporate clients", now()),
    ];
    assert!(check_conflicting_definitions(&group_by_cluster(&contexts)).is_none());
  }

  #[test]
  fn single_cluster_cannot_conflict() {
    let contexts = vec![
      ctx(Some("A"), KYC_RETAIL, now()),
      ctx(Some("A"), KYC_TREASURY, now()),
    ];
    assert!(check_conflicting_definitions(&group_by_cluster(&contexts)).is_none());
  }

  #[test]
  fn only_the_newest_context_per_cluster_is_compared() {
    // Cluster B's newest definition agrees with A; an older one does not.
    let contexts = vec![
      ctx(Some("A"), KYC_RETAIL, now()),
      ctx(Some("B"), KYC_RETAIL, now()),
      ctx(Some("B"), KYC_TREASURY, now() - Duration::days(30)),
    ];
    assert!(check_conflicting_definitions(&group_by_cluster(&contexts)).is_none());
  }

  #[test]
  fn three_conflicting_clusters_is_high() {
    let contexts = vec![
      ctx(Some("A"), KYC_RETAIL, now()),
      ctx(Some("B"), KYC_TREASURY, now()),
      ctx(Some("C"), "Periodic refresh of sanctions screening results", now()),
    ];
    let gap = check_conflicting_definitions(&group_by_cluster(&contexts)).unwrap();
    assert_eq!(clusters(&gap), ["A", "B", "C"]);
    assert_eq!(gap.severity, Severity::High);
  }

  // ── outdated ───────────────────────────────────────────────────────────────

  #[test]
  fn seven_month_old_context_is_outdated() {
    let old = now().checked_sub_months(Months::new(7)).unwrap();
    let contexts = vec![ctx(Some("A"), "x", old), ctx(Some("A"), "y", old)];
    let gap = check_outdated(&contexts, now()).unwrap();
    assert_eq!(gap.gap_type, GapType::Outdated);
    assert_eq!(clusters(&gap), ["A"]);
    assert_eq!(gap.severity, Severity::Low);
  }

  #[test]
  fn recently_updated_context_is_not_outdated() {
    let contexts = vec![ctx(Some("A"), "x", now() - Duration::days(1))];
    assert!(check_outdated(&contexts, now()).is_none());
  }

  #[test]
  fn unclustered_stale_context_is_ignored() {
    let old = now() - Duration::days(400);
    let contexts = vec![ctx(None, "x", old)];
    assert!(check_outdated(&contexts, now()).is_none());
  }

  #[test]
  fn stale_cutoff_clamps_month_end() {
    let now = Utc.with_ymd_and_hms(2025, 8, 31, 0, 0, 0).unwrap();
    assert_eq!(
      stale_cutoff(now),
      Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap()
    );
  }

  // ── classify ───────────────────────────────────────────────────────────────

  #[test]
  fn checks_compose_without_suppressing_each_other() {
    let old = now().checked_sub_months(Months::new(8)).unwrap();
    let contexts = vec![
      ctx(Some("A"), KYC_RETAIL, now()),
      ctx(Some("B"), KYC_TREASURY, old),
    ];
    let subject = Uuid::new_v4();
    let findings = classify_term(subject, &contexts, &universe(&["A", "B", "C"]), now());

    let types: Vec<GapType> = findings.iter().map(|f| f.gap_type).collect();
    assert_eq!(types, [
      GapType::MissingContext,
      GapType::ConflictingDefinition,
      GapType::Outdated,
    ]);
    assert!(findings.iter().all(|f| f.subject_id == subject));
    assert!(findings.iter().all(|f| f.detected_at == now()));
    assert!(findings.iter().all(|f| !f.affected_clusters.is_empty()));
    assert!(findings.iter().all(|f| !f.is_resolved()));
  }

  #[test]
  fn term_without_contexts_yields_nothing() {
    let findings = classify_term(Uuid::new_v4(), &[], &universe(&["A"]), now());
    assert!(findings.is_empty());
  }
}
