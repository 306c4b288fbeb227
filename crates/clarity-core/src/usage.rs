//! Usage events recorded for analytics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageAction {
  Viewed,
  Searched,
  Referenced,
}

impl UsageAction {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Viewed => "viewed",
      Self::Searched => "searched",
      Self::Referenced => "referenced",
    }
  }
}

/// A single usage record. The timestamp is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageEvent {
  pub term_id: Uuid,
  /// Cluster the term was viewed under, if the client said so.
  pub cluster: Option<String>,
  pub actor:   Option<Uuid>,
  pub action:  UsageAction,
}

impl UsageEvent {
  pub fn viewed(term_id: Uuid, cluster: Option<String>, actor: Option<Uuid>) -> Self {
    Self { term_id, cluster, actor, action: UsageAction::Viewed }
  }
}

/// A term the actor looked at, with the time of the latest view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentTerm {
  pub term_id:         Uuid,
  pub term:            String,
  pub base_definition: String,
  pub last_viewed:     DateTime<Utc>,
}
