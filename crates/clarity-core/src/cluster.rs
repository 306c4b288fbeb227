//! Clusters — organisational groupings a term can have a context in.
//!
//! Clusters are mostly implicit: the working set is derived from the cluster
//! names on existing contexts. Explicit rows only add a description and an
//! owner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
  pub cluster_id:  Uuid,
  pub name:        String,
  pub description: Option<String>,
  pub owner_id:    Option<Uuid>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl Cluster {
  /// A transient cluster for a name that only exists on contexts.
  pub fn derived(name: impl Into<String>, now: DateTime<Utc>) -> Self {
    Self {
      cluster_id:  Uuid::new_v4(),
      name:        name.into(),
      description: None,
      owner_id:    None,
      created_at:  now,
      updated_at:  now,
    }
  }
}

/// Input to [`crate::store::GlossaryStore::create_cluster`].
#[derive(Debug, Clone)]
pub struct NewCluster {
  pub name:        String,
  pub description: Option<String>,
}

impl NewCluster {
  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::Validation("cluster name must not be empty".into()));
    }
    Ok(())
  }
}

// ─── Coverage ────────────────────────────────────────────────────────────────

/// How much of the glossary one cluster has a context for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterCoverage {
  pub cluster:            String,
  pub terms_with_context: u64,
  pub total_terms:        u64,
  pub coverage_percent:   f64,
  /// Unresolved gaps naming this cluster.
  pub gaps_count:         u64,
}

impl ClusterCoverage {
  pub fn new(
    cluster: String,
    terms_with_context: u64,
    total_terms: u64,
    gaps_count: u64,
  ) -> Self {
    let coverage_percent = if total_terms == 0 {
      0.0
    } else {
      terms_with_context as f64 / total_terms as f64 * 100.0
    };
    Self { cluster, terms_with_context, total_terms, coverage_percent, gaps_count }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
  pub clusters:    Vec<ClusterCoverage>,
  pub total_terms: u64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn coverage_percent_of_empty_glossary_is_zero() {
    let c = ClusterCoverage::new("Retail".into(), 0, 0, 0);
    assert_eq!(c.coverage_percent, 0.0);
  }

  #[test]
  fn coverage_percent() {
    let c = ClusterCoverage::new("Retail".into(), 1, 4, 2);
    assert_eq!(c.coverage_percent, 25.0);
    assert_eq!(c.gaps_count, 2);
  }
}
