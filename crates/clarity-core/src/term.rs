//! Terms and their per-cluster contexts.
//!
//! A term is the unit of the glossary. Its contextual variants live in a
//! separate append-only set of [`TermContext`] rows; the set of clusters a
//! term is known in is derived from those rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  relationship::{TermExample, TermRelationship},
  snapshot::{Snapshot, fields},
};

// ─── Term ────────────────────────────────────────────────────────────────────

/// A glossary term as currently stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
  pub term_id:               Uuid,
  /// The term itself, e.g. "KYC".
  pub term:                  String,
  pub base_definition:       String,
  pub category:              Option<String>,
  /// Code or system name used by IT for this term.
  pub code_name:             Option<String>,
  pub tags:                  Vec<String>,
  /// Regulatory frameworks the term falls under, e.g. "BCBS 239", "GDPR".
  pub compliance_frameworks: Vec<String>,
  pub created_by:            Option<Uuid>,
  pub created_at:            DateTime<Utc>,
  pub updated_at:            DateTime<Utc>,
  pub updated_by:            Option<Uuid>,
}

/// A term together with everything attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermDetail {
  #[serde(flatten)]
  pub term:          Term,
  /// Newest first.
  pub contexts:      Vec<TermContext>,
  /// Newest first.
  pub examples:      Vec<TermExample>,
  pub relationships: Vec<TermRelationship>,
}

/// Input to [`crate::store::GlossaryStore::create_term`].
#[derive(Debug, Clone, Default)]
pub struct NewTerm {
  pub term:                  String,
  pub base_definition:       String,
  pub category:              Option<String>,
  pub code_name:             Option<String>,
  pub tags:                  Vec<String>,
  pub compliance_frameworks: Vec<String>,
}

impl NewTerm {
  pub fn new(term: impl Into<String>, base_definition: impl Into<String>) -> Self {
    Self {
      term: term.into(),
      base_definition: base_definition.into(),
      ..Self::default()
    }
  }

  /// Reject inputs the store must never persist.
  pub fn validate(&self) -> Result<()> {
    if self.term.trim().is_empty() {
      return Err(Error::Validation("term must not be empty".into()));
    }
    if self.base_definition.trim().is_empty() {
      return Err(Error::Validation("base_definition must not be empty".into()));
    }
    Ok(())
  }
}

// ─── TermPatch ───────────────────────────────────────────────────────────────

/// A partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermPatch {
  pub term:                  Option<String>,
  pub base_definition:       Option<String>,
  pub category:              Option<String>,
  pub code_name:             Option<String>,
  pub tags:                  Option<Vec<String>>,
  pub compliance_frameworks: Option<Vec<String>>,
}

impl TermPatch {
  pub fn is_empty(&self) -> bool { *self == Self::default() }

  /// Build the patch that restores the fields recorded in `snapshot`.
  ///
  /// Only fields present in the snapshot (with the expected shape) are set,
  /// so restoring an old snapshot never clears fields it did not capture.
  pub fn from_snapshot(snapshot: &Snapshot) -> Self {
    let text = |f: &str| snapshot.text(f).map(str::to_owned);
    let list = |f: &str| snapshot.list(f).map(<[String]>::to_vec);
    Self {
      term:                  text(fields::TERM),
      base_definition:       text(fields::BASE_DEFINITION),
      category:              text(fields::CATEGORY),
      code_name:             text(fields::CODE_NAME),
      tags:                  list(fields::TAGS),
      compliance_frameworks: list(fields::COMPLIANCE_FRAMEWORKS),
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.term.as_deref().is_some_and(|t| t.trim().is_empty()) {
      return Err(Error::Validation("term must not be empty".into()));
    }
    if self
      .base_definition
      .as_deref()
      .is_some_and(|d| d.trim().is_empty())
    {
      return Err(Error::Validation("base_definition must not be empty".into()));
    }
    Ok(())
  }

  /// Apply the patch to `term` in place.
  pub fn apply(self, term: &mut Term) {
    if let Some(v) = self.term {
      term.term = v;
    }
    if let Some(v) = self.base_definition {
      term.base_definition = v;
    }
    if let Some(v) = self.category {
      term.category = Some(v);
    }
    if let Some(v) = self.code_name {
      term.code_name = Some(v);
    }
    if let Some(v) = self.tags {
      term.tags = v;
    }
    if let Some(v) = self.compliance_frameworks {
      term.compliance_frameworks = v;
    }
  }
}

// ─── TermQuery ───────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::GlossaryStore::list_terms`].
#[derive(Debug, Clone)]
pub struct TermQuery {
  pub category: Option<String>,
  /// Only terms ordered strictly after this position. Applied before
  /// `offset`; `total` ignores it.
  pub after:    Option<TermCursor>,
  pub limit:    usize,
  pub offset:   usize,
}

impl Default for TermQuery {
  fn default() -> Self { Self { category: None, after: None, limit: 20, offset: 0 } }
}

/// A position in the `(term, term_id)` listing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermCursor {
  pub term:    String,
  pub term_id: Uuid,
}

impl From<&Term> for TermCursor {
  fn from(t: &Term) -> Self { Self { term: t.term.clone(), term_id: t.term_id } }
}

/// One page of a filtered listing plus the unpaged total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
  pub data:   Vec<T>,
  pub total:  u64,
  pub limit:  usize,
  pub offset: usize,
}

// ─── Contexts ────────────────────────────────────────────────────────────────

/// A contextual variant of a term, scoped to a cluster and optionally to a
/// system or product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermContext {
  pub context_id:          Uuid,
  pub term_id:             Uuid,
  pub cluster:             Option<String>,
  pub system:              Option<String>,
  pub product:             Option<String>,
  pub context_definition:  String,
  pub business_rules:      Vec<String>,
  pub compliance_required: bool,
  pub created_by:          Option<Uuid>,
  pub created_at:          DateTime<Utc>,
  /// Last time the definition was touched; drives staleness detection.
  pub updated_at:          DateTime<Utc>,
}

/// Input to [`crate::store::GlossaryStore::add_context`].
#[derive(Debug, Clone, Default)]
pub struct NewContext {
  pub cluster:             Option<String>,
  pub system:              Option<String>,
  pub product:             Option<String>,
  pub context_definition:  String,
  pub business_rules:      Vec<String>,
  pub compliance_required: bool,
}

impl NewContext {
  pub fn for_cluster(
    cluster: impl Into<String>,
    context_definition: impl Into<String>,
  ) -> Self {
    Self {
      cluster: Some(cluster.into()),
      context_definition: context_definition.into(),
      ..Self::default()
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.context_definition.trim().is_empty() {
      return Err(Error::Validation(
        "context_definition must not be empty".into(),
      ));
    }
    if self.cluster.as_deref().is_some_and(|c| c.trim().is_empty()) {
      return Err(Error::Validation("cluster must not be blank".into()));
    }
    Ok(())
  }
}

// ─── Search ──────────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::GlossaryStore::search_terms`].
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
  /// Free text. Every word must prefix-match a word of the term or its base
  /// definition; punctuation separates words and is otherwise ignored.
  pub text:   String,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::snapshot::FieldValue;

  fn sample_term() -> Term {
    let now = Utc::now();
    Term {
      term_id:               Uuid::new_v4(),
      term:                  "KYC".into(),
      base_definition:       "Know your customer".into(),
      category:              Some("Compliance".into()),
      code_name:             None,
      tags:                  vec!["onboarding".into()],
      compliance_frameworks: vec![],
      created_by:            None,
      created_at:            now,
      updated_at:            now,
      updated_by:            None,
    }
  }

  #[test]
  fn new_term_rejects_blank_name() {
    let err = NewTerm::new("   ", "something").validate().unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn empty_patch_is_empty() {
    assert!(TermPatch::default().is_empty());
    let patch = TermPatch { code_name: Some("kyc_v2".into()), ..TermPatch::default() };
    assert!(!patch.is_empty());
  }

  #[test]
  fn patch_from_snapshot_only_sets_captured_fields() {
    let mut snapshot = Snapshot::new();
    snapshot.insert(fields::TERM, FieldValue::Text("Know Your Customer".into()));
    snapshot.insert(fields::TAGS, FieldValue::List(vec!["a".into(), "b".into()]));

    let patch = TermPatch::from_snapshot(&snapshot);
    assert_eq!(patch.term.as_deref(), Some("Know Your Customer"));
    assert_eq!(patch.tags, Some(vec!["a".to_string(), "b".to_string()]));
    assert!(patch.category.is_none());
    assert!(patch.base_definition.is_none());

    let mut term = sample_term();
    patch.apply(&mut term);
    assert_eq!(term.term, "Know Your Customer");
    assert_eq!(term.category.as_deref(), Some("Compliance"));
    assert_eq!(term.base_definition, "Know your customer");
  }

  #[test]
  fn patch_from_snapshot_ignores_mistyped_fields() {
    let mut snapshot = Snapshot::new();
    snapshot.insert(fields::TAGS, FieldValue::Text("not-a-list".into()));
    snapshot.insert(fields::CATEGORY, FieldValue::Flag(true));
    assert!(TermPatch::from_snapshot(&snapshot).is_empty());
  }
}
