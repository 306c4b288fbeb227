//! Curated reading lists for new users, and their progress through them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Role assumed when a caller does not name one.
pub const DEFAULT_ROLE: &str = "viewer";

/// An ordered list of terms a role should read, optionally per cluster.
///
/// Several paths may exist for the same role and cluster; the one with the
/// lowest `order_index` wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingPath {
  pub path_id:     Uuid,
  pub role:        String,
  pub cluster:     Option<String>,
  pub term_ids:    Vec<Uuid>,
  pub order_index: i64,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::GlossaryStore::create_onboarding_path`].
#[derive(Debug, Clone, Default)]
pub struct NewOnboardingPath {
  pub role:        String,
  pub cluster:     Option<String>,
  pub term_ids:    Vec<Uuid>,
  pub order_index: i64,
}

impl NewOnboardingPath {
  pub fn validate(&self) -> Result<()> {
    if self.role.trim().is_empty() {
      return Err(Error::Validation("role must not be empty".into()));
    }
    if self.cluster.as_deref().is_some_and(|c| c.trim().is_empty()) {
      return Err(Error::Validation("cluster must not be blank".into()));
    }
    Ok(())
  }
}

/// Which path to look up. A `None` cluster matches paths of any cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathQuery {
  pub role:    String,
  pub cluster: Option<String>,
}

impl Default for PathQuery {
  fn default() -> Self { Self { role: DEFAULT_ROLE.into(), cluster: None } }
}

/// How far a user has read through a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingProgress {
  pub onboarding_completed: bool,
  pub completed_at:         Option<DateTime<Utc>>,
  /// The path measured against, if one matched.
  pub path_id:              Option<Uuid>,
  /// Distinct path terms the user has viewed.
  pub viewed_count:         u64,
  pub total_count:          u64,
  pub progress_percent:     f64,
}

impl OnboardingProgress {
  pub fn new(
    completed_at: Option<DateTime<Utc>>,
    path_id: Option<Uuid>,
    viewed_count: u64,
    total_count: u64,
  ) -> Self {
    let progress_percent = if total_count == 0 {
      0.0
    } else {
      viewed_count as f64 / total_count as f64 * 100.0
    };
    Self {
      onboarding_completed: completed_at.is_some(),
      completed_at,
      path_id,
      viewed_count,
      total_count,
      progress_percent,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_path_is_zero_percent() {
    let p = OnboardingProgress::new(None, None, 0, 0);
    assert_eq!(p.progress_percent, 0.0);
    assert!(!p.onboarding_completed);
  }

  #[test]
  fn percent_is_viewed_over_total() {
    let p = OnboardingProgress::new(Some(Utc::now()), Some(Uuid::new_v4()), 1, 4);
    assert_eq!(p.progress_percent, 25.0);
    assert!(p.onboarding_completed);
  }

  #[test]
  fn blank_role_is_rejected() {
    let path = NewOnboardingPath { role: " ".into(), ..NewOnboardingPath::default() };
    assert!(matches!(path.validate(), Err(Error::Validation(_))));
  }
}
