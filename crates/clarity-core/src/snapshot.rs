//! The schema-flexible snapshot document stored with every term version.
//!
//! A snapshot is an ordered map from field name to a small closed set of
//! value shapes. Absent fields are absent keys; the JSON form never contains
//! `null`. Keeping the document entity-agnostic lets old snapshots survive
//! changes to the [`Term`] shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::term::Term;

/// Field names used when snapshotting a [`Term`].
pub mod fields {
  pub const TERM: &str = "term";
  pub const BASE_DEFINITION: &str = "base_definition";
  pub const CATEGORY: &str = "category";
  pub const CODE_NAME: &str = "code_name";
  pub const TAGS: &str = "tags";
  pub const COMPLIANCE_FRAMEWORKS: &str = "compliance_frameworks";
  pub const UPDATED_AT: &str = "updated_at";
  pub const UPDATED_BY: &str = "updated_by";
}

/// A single captured value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
  Text(String),
  List(Vec<String>),
  Flag(bool),
}

/// Captured state of a subject at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<String, FieldValue>);

impl Snapshot {
  pub fn new() -> Self { Self::default() }

  pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) {
    self.0.insert(field.into(), value);
  }

  pub fn get(&self, field: &str) -> Option<&FieldValue> { self.0.get(field) }

  pub fn contains(&self, field: &str) -> bool { self.0.contains_key(field) }

  /// The value of `field` if it was captured as text.
  pub fn text(&self, field: &str) -> Option<&str> {
    match self.0.get(field) {
      Some(FieldValue::Text(s)) => Some(s),
      _ => None,
    }
  }

  /// The value of `field` if it was captured as a list.
  pub fn list(&self, field: &str) -> Option<&[String]> {
    match self.0.get(field) {
      Some(FieldValue::List(l)) => Some(l),
      _ => None,
    }
  }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn to_json(&self) -> crate::Result<String> { Ok(serde_json::to_string(self)?) }

  pub fn from_json(s: &str) -> crate::Result<Self> { Ok(serde_json::from_str(s)?) }
}

impl From<&Term> for Snapshot {
  fn from(term: &Term) -> Self {
    let mut s = Snapshot::new();
    s.insert(fields::TERM, FieldValue::Text(term.term.clone()));
    s.insert(
      fields::BASE_DEFINITION,
      FieldValue::Text(term.base_definition.clone()),
    );
    if let Some(category) = &term.category {
      s.insert(fields::CATEGORY, FieldValue::Text(category.clone()));
    }
    if let Some(code_name) = &term.code_name {
      s.insert(fields::CODE_NAME, FieldValue::Text(code_name.clone()));
    }
    s.insert(fields::TAGS, FieldValue::List(term.tags.clone()));
    s.insert(
      fields::COMPLIANCE_FRAMEWORKS,
      FieldValue::List(term.compliance_frameworks.clone()),
    );
    s.insert(
      fields::UPDATED_AT,
      FieldValue::Text(term.updated_at.to_rfc3339()),
    );
    if let Some(by) = term.updated_by {
      s.insert(fields::UPDATED_BY, FieldValue::Text(by.to_string()));
    }
    s
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;

  fn term(category: Option<&str>) -> Term {
    let now = Utc::now();
    Term {
      term_id:               Uuid::new_v4(),
      term:                  "Settlement".into(),
      base_definition:       "Final transfer of funds".into(),
      category:              category.map(str::to_owned),
      code_name:             None,
      tags:                  vec!["payments".into(), "ops".into()],
      compliance_frameworks: vec!["PFMI".into()],
      created_by:            None,
      created_at:            now,
      updated_at:            now,
      updated_by:            None,
    }
  }

  #[test]
  fn unset_optionals_are_absent_not_null() {
    let snapshot = Snapshot::from(&term(None));
    assert!(!snapshot.contains(fields::CATEGORY));
    assert!(!snapshot.contains(fields::CODE_NAME));
    assert!(!snapshot.contains(fields::UPDATED_BY));

    let json = snapshot.to_json().unwrap();
    assert!(!json.contains("null"), "json: {json}");
    assert!(!json.contains("category"), "json: {json}");
  }

  #[test]
  fn json_keeps_lists_in_order() {
    let snapshot = Snapshot::from(&term(Some("Payments")));
    let parsed = Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
    assert_eq!(parsed, snapshot);
    assert_eq!(
      parsed.list(fields::TAGS),
      Some(&["payments".to_string(), "ops".to_string()][..])
    );
    assert_eq!(parsed.text(fields::CATEGORY), Some("Payments"));
  }

  #[test]
  fn json_shape_is_a_plain_object() {
    let mut snapshot = Snapshot::new();
    snapshot.insert("archived", FieldValue::Flag(false));
    snapshot.insert("term", FieldValue::Text("FX".into()));
    let value: serde_json::Value =
      serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
    assert_eq!(value, serde_json::json!({ "archived": false, "term": "FX" }));
  }

  #[test]
  fn null_values_are_rejected() {
    assert!(Snapshot::from_json(r#"{"category": null}"#).is_err());
  }
}
