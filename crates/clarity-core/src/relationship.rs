//! Usage examples and typed links between terms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Examples ────────────────────────────────────────────────────────────────

/// A sentence showing a term in use, optionally tied to one of its contexts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermExample {
  pub example_id:   Uuid,
  pub term_id:      Uuid,
  pub context_id:   Option<Uuid>,
  pub example_text: String,
  /// Where the example was taken from, e.g. a policy document.
  pub source:       Option<String>,
  pub created_by:   Option<Uuid>,
  pub created_at:   DateTime<Utc>,
}

/// Input to [`crate::store::GlossaryStore::add_example`].
#[derive(Debug, Clone, Default)]
pub struct NewExample {
  pub context_id:   Option<Uuid>,
  pub example_text: String,
  pub source:       Option<String>,
}

impl NewExample {
  pub fn validate(&self) -> Result<()> {
    if self.example_text.trim().is_empty() {
      return Err(Error::Validation("example_text must not be empty".into()));
    }
    Ok(())
  }
}

// ─── Relationships ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
  Synonym,
  Antonym,
  Related,
  SeeAlso,
  Parent,
  Child,
}

impl RelationshipType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Synonym => "synonym",
      Self::Antonym => "antonym",
      Self::Related => "related",
      Self::SeeAlso => "see_also",
      Self::Parent => "parent",
      Self::Child => "child",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "synonym" => Some(Self::Synonym),
      "antonym" => Some(Self::Antonym),
      "related" => Some(Self::Related),
      "see_also" => Some(Self::SeeAlso),
      "parent" => Some(Self::Parent),
      "child" => Some(Self::Child),
      _ => None,
    }
  }
}

/// A directed, typed link from one term to another.
///
/// At most one link of each type exists between an ordered pair of terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermRelationship {
  pub relationship_id:   Uuid,
  pub term_id:           Uuid,
  pub related_term_id:   Uuid,
  pub relationship_type: RelationshipType,
  pub created_by:        Option<Uuid>,
  pub created_at:        DateTime<Utc>,
  /// Summary of the linked term, filled in when listing.
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub related_term:      Option<RelatedTerm>,
}

/// Enough of a term to render a link to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedTerm {
  pub term_id:         Uuid,
  pub term:            String,
  pub base_definition: String,
}

/// Input to [`crate::store::GlossaryStore::add_relationship`].
#[derive(Debug, Clone)]
pub struct NewRelationship {
  pub related_term_id:   Uuid,
  pub relationship_type: RelationshipType,
}

impl NewRelationship {
  pub fn validate(&self, term_id: Uuid) -> Result<()> {
    if self.related_term_id == term_id {
      return Err(Error::Validation("a term cannot be related to itself".into()));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn self_links_are_rejected() {
    let id = Uuid::new_v4();
    let link = NewRelationship {
      related_term_id:   id,
      relationship_type: RelationshipType::Synonym,
    };
    assert!(matches!(link.validate(id), Err(Error::Validation(_))));
    assert!(link.validate(Uuid::new_v4()).is_ok());
  }

  #[test]
  fn see_also_uses_snake_case() {
    let json = serde_json::to_string(&RelationshipType::SeeAlso).unwrap();
    assert_eq!(json, "\"see_also\"");
    assert_eq!(RelationshipType::parse("see_also"), Some(RelationshipType::SeeAlso));
  }
}
