//! Change proposals and quality flags raised against terms.
//!
//! Both are review workflows layered on top of the glossary; neither changes
//! a term by itself. A proposal is reviewed exactly once (`pending` to
//! `approved` or `rejected`). A flag moves freely between `open`, `resolved`
//! and `dismissed`; its resolution fields describe the latest transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Proposals ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalType {
  Create,
  Update,
  Delete,
  Merge,
}

impl ProposalType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Create => "create",
      Self::Update => "update",
      Self::Delete => "delete",
      Self::Merge => "merge",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "create" => Some(Self::Create),
      "update" => Some(Self::Update),
      "delete" => Some(Self::Delete),
      "merge" => Some(Self::Merge),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
  Pending,
  Approved,
  Rejected,
}

impl ProposalStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Approved => "approved",
      Self::Rejected => "rejected",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "pending" => Some(Self::Pending),
      "approved" => Some(Self::Approved),
      "rejected" => Some(Self::Rejected),
      _ => None,
    }
  }

  /// Whether a review may move a proposal into this status.
  pub fn is_verdict(self) -> bool { !matches!(self, Self::Pending) }
}

/// A suggested change to the glossary, awaiting or past review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermProposal {
  pub proposal_id:   Uuid,
  /// The term the proposal is about; `None` for proposals to create one.
  pub term_id:       Option<Uuid>,
  pub proposal_type: ProposalType,
  /// The proposed field values, as submitted.
  pub proposed_data: Map<String, Value>,
  pub reason:        Option<String>,
  pub status:        ProposalStatus,
  pub proposed_by:   Option<Uuid>,
  pub reviewed_by:   Option<Uuid>,
  pub reviewed_at:   Option<DateTime<Utc>>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// Input to [`crate::store::GlossaryStore::create_proposal`].
#[derive(Debug, Clone)]
pub struct NewProposal {
  pub term_id:       Option<Uuid>,
  pub proposal_type: ProposalType,
  pub proposed_data: Map<String, Value>,
  pub reason:        Option<String>,
}

impl NewProposal {
  pub fn validate(&self) -> Result<()> {
    if self.proposal_type != ProposalType::Create && self.term_id.is_none() {
      return Err(Error::Validation(format!(
        "term_id is required for {} proposals",
        self.proposal_type.as_str()
      )));
    }
    Ok(())
  }
}

/// Parameters for [`crate::store::GlossaryStore::list_proposals`].
#[derive(Debug, Clone)]
pub struct ProposalQuery {
  pub status: Option<ProposalStatus>,
  pub limit:  usize,
  pub offset: usize,
}

impl Default for ProposalQuery {
  fn default() -> Self { Self { status: None, limit: 20, offset: 0 } }
}

// ─── Flags ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagType {
  Inconsistency,
  Outdated,
  Duplicate,
  Incorrect,
  Other,
}

impl FlagType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Inconsistency => "inconsistency",
      Self::Outdated => "outdated",
      Self::Duplicate => "duplicate",
      Self::Incorrect => "incorrect",
      Self::Other => "other",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "inconsistency" => Some(Self::Inconsistency),
      "outdated" => Some(Self::Outdated),
      "duplicate" => Some(Self::Duplicate),
      "incorrect" => Some(Self::Incorrect),
      "other" => Some(Self::Other),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagStatus {
  Open,
  Resolved,
  Dismissed,
}

impl FlagStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Open => "open",
      Self::Resolved => "resolved",
      Self::Dismissed => "dismissed",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "open" => Some(Self::Open),
      "resolved" => Some(Self::Resolved),
      "dismissed" => Some(Self::Dismissed),
      _ => None,
    }
  }
}

/// A reported problem with a term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermFlag {
  pub flag_id:     Uuid,
  pub term_id:     Uuid,
  pub flag_type:   FlagType,
  pub description: String,
  pub status:      FlagStatus,
  pub flagged_by:  Option<Uuid>,
  /// Who closed the flag, if it is resolved or dismissed.
  pub resolved_by: Option<Uuid>,
  /// Set only while the flag is `resolved`.
  pub resolved_at: Option<DateTime<Utc>>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl TermFlag {
  /// Move the flag to `status` on behalf of `actor`.
  ///
  /// Reopening clears the resolution; dismissing records who closed it but
  /// no resolution time.
  pub fn transition(&mut self, status: FlagStatus, actor: Option<Uuid>, at: DateTime<Utc>) {
    self.status = status;
    self.updated_at = at;
    match status {
      FlagStatus::Open => {
        self.resolved_by = None;
        self.resolved_at = None;
      }
      FlagStatus::Resolved => {
        self.resolved_by = actor;
        self.resolved_at = Some(at);
      }
      FlagStatus::Dismissed => {
        self.resolved_by = actor;
        self.resolved_at = None;
      }
    }
  }
}

/// Input to [`crate::store::GlossaryStore::create_flag`].
#[derive(Debug, Clone)]
pub struct NewFlag {
  pub flag_type:   FlagType,
  pub description: String,
}

impl NewFlag {
  pub fn validate(&self) -> Result<()> {
    if self.description.trim().is_empty() {
      return Err(Error::Validation("description must not be empty".into()));
    }
    Ok(())
  }
}

/// Parameters for [`crate::store::GlossaryStore::list_flags`].
#[derive(Debug, Clone)]
pub struct FlagQuery {
  pub term_id: Option<Uuid>,
  pub status:  Option<FlagStatus>,
  pub limit:   usize,
  pub offset:  usize,
}

impl Default for FlagQuery {
  fn default() -> Self { Self { term_id: None, status: None, limit: 20, offset: 0 } }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn open_flag() -> TermFlag {
    let now = Utc::now();
    TermFlag {
      flag_id:     Uuid::new_v4(),
      term_id:     Uuid::new_v4(),
      flag_type:   FlagType::Outdated,
      description: "still mentions LIBOR".into(),
      status:      FlagStatus::Open,
      flagged_by:  None,
      resolved_by: None,
      resolved_at: None,
      created_at:  now,
      updated_at:  now,
    }
  }

  #[test]
  fn resolving_sets_time_dismissing_does_not() {
    let actor = Some(Uuid::new_v4());
    let at = Utc::now();

    let mut flag = open_flag();
    flag.transition(FlagStatus::Resolved, actor, at);
    assert_eq!(flag.resolved_by, actor);
    assert_eq!(flag.resolved_at, Some(at));

    let mut flag = open_flag();
    flag.transition(FlagStatus::Dismissed, actor, at);
    assert_eq!(flag.resolved_by, actor);
    assert_eq!(flag.resolved_at, None);
  }

  #[test]
  fn reopening_clears_resolution() {
    let mut flag = open_flag();
    flag.transition(FlagStatus::Resolved, Some(Uuid::new_v4()), Utc::now());
    flag.transition(FlagStatus::Open, Some(Uuid::new_v4()), Utc::now());
    assert_eq!(flag.status, FlagStatus::Open);
    assert_eq!(flag.resolved_by, None);
    assert_eq!(flag.resolved_at, None);
  }

  #[test]
  fn only_create_proposals_may_omit_the_term() {
    let proposal = |proposal_type, term_id| NewProposal {
      term_id,
      proposal_type,
      proposed_data: Map::new(),
      reason: None,
    };
    assert!(proposal(ProposalType::Create, None).validate().is_ok());
    assert!(proposal(ProposalType::Update, Some(Uuid::new_v4())).validate().is_ok());
    assert!(matches!(
      proposal(ProposalType::Delete, None).validate(),
      Err(Error::Validation(_))
    ));
  }

  #[test]
  fn statuses_round_trip_through_their_names() {
    for s in [ProposalStatus::Pending, ProposalStatus::Approved, ProposalStatus::Rejected] {
      assert_eq!(ProposalStatus::parse(s.as_str()), Some(s));
    }
    for s in [FlagStatus::Open, FlagStatus::Resolved, FlagStatus::Dismissed] {
      assert_eq!(FlagStatus::parse(s.as_str()), Some(s));
    }
    assert_eq!(FlagType::parse("typo"), None);
  }
}
