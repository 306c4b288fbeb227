//! Term versions: immutable snapshots plus field-level comparison.
//!
//! A version is written immediately *before* a term is mutated (update or
//! rollback), so it records the state being replaced. Versions are never
//! updated or deleted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::snapshot::{FieldValue, Snapshot, fields};

// ─── Records ─────────────────────────────────────────────────────────────────

/// A stored snapshot of a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermVersion {
  pub version_id:     Uuid,
  /// The versioned entity (a term).
  pub subject_id:     Uuid,
  /// 1-based, gapless and strictly increasing per subject. Assigned by the
  /// store, never by callers.
  pub version_number: u32,
  pub snapshot:       Snapshot,
  pub changed_by:     Option<Uuid>,
  pub change_reason:  Option<String>,
  pub created_at:     DateTime<Utc>,
}

/// Input to [`crate::store::GlossaryStore::record_version`].
#[derive(Debug, Clone)]
pub struct NewVersion {
  pub subject_id:    Uuid,
  pub snapshot:      Snapshot,
  pub changed_by:    Option<Uuid>,
  pub change_reason: Option<String>,
}

/// The reason recorded on the snapshot taken before a rollback.
pub fn rollback_reason(version_number: u32) -> String {
  format!("Rollback to version {version_number}")
}

// ─── Comparison ──────────────────────────────────────────────────────────────

/// Scalar fields compared by [`compare`].
pub const SCALAR_FIELDS: [&str; 4] = [
  fields::TERM,
  fields::BASE_DEFINITION,
  fields::CATEGORY,
  fields::CODE_NAME,
];

/// List fields compared by [`compare`], element by element in order.
pub const LIST_FIELDS: [&str; 2] = [fields::TAGS, fields::COMPLIANCE_FRAMEWORKS];

/// One differing field. `None` means the field was absent on that side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
  pub old: Option<FieldValue>,
  pub new: Option<FieldValue>,
}

/// Field name → change. Fields that did not change are absent.
pub type VersionDiff = BTreeMap<String, FieldChange>;

/// Field-level diff between two snapshots.
///
/// A scalar field is reported when exactly one side has it, or both have it
/// with different values. A list field is reported when the lists differ by
/// content or position; a missing list compares as empty.
pub fn compare(old: &Snapshot, new: &Snapshot) -> VersionDiff {
  let mut diff = VersionDiff::new();

  for field in SCALAR_FIELDS {
    // Absent on both sides compares equal and is skipped too.
    let (a, b) = (old.get(field), new.get(field));
    if a == b {
      continue;
    }
    diff.insert(field.to_owned(), FieldChange {
      old: a.cloned(),
      new: b.cloned(),
    });
  }

  for field in LIST_FIELDS {
    let a = old.list(field).unwrap_or_default();
    let b = new.list(field).unwrap_or_default();
    if a != b {
      diff.insert(field.to_owned(), FieldChange {
        old: old.get(field).cloned(),
        new: new.get(field).cloned(),
      });
    }
  }

  diff
}

#[cfg(test)]
mod tests {
  use super::*;

  fn text(s: &str) -> FieldValue { FieldValue::Text(s.into()) }

  fn list(items: &[&str]) -> FieldValue {
    FieldValue::List(items.iter().map(|s| (*s).to_owned()).collect())
  }

  fn snapshot(entries: &[(&str, FieldValue)]) -> Snapshot {
    let mut s = Snapshot::new();
    for (k, v) in entries {
      s.insert(*k, v.clone());
    }
    s
  }

  #[test]
  fn identical_snapshots_have_no_diff() {
    let s = snapshot(&[
      (fields::TERM, text("AML")),
      (fields::TAGS, list(&["risk"])),
    ]);
    assert!(compare(&s, &s.clone()).is_empty());
  }

  #[test]
  fn changed_scalar_is_reported() {
    let a = snapshot(&[(fields::BASE_DEFINITION, text("old wording"))]);
    let b = snapshot(&[(fields::BASE_DEFINITION, text("new wording"))]);
    let diff = compare(&a, &b);
    assert_eq!(diff.len(), 1);
    assert_eq!(diff[fields::BASE_DEFINITION], FieldChange {
      old: Some(text("old wording")),
      new: Some(text("new wording")),
    });
  }

  #[test]
  fn scalar_present_on_one_side_is_reported() {
    let a = snapshot(&[]);
    let b = snapshot(&[(fields::CATEGORY, text("Risk"))]);
    let diff = compare(&a, &b);
    assert_eq!(diff[fields::CATEGORY].old, None);
    assert_eq!(diff[fields::CATEGORY].new, Some(text("Risk")));

    let reverse = compare(&b, &a);
    assert_eq!(reverse[fields::CATEGORY].old, Some(text("Risk")));
    assert_eq!(reverse[fields::CATEGORY].new, None);
  }

  #[test]
  fn scalar_absent_on_both_sides_is_skipped() {
    let a = snapshot(&[(fields::TERM, text("AML"))]);
    let diff = compare(&a, &a.clone());
    assert!(!diff.contains_key(fields::CODE_NAME));
    assert!(!diff.contains_key(fields::CATEGORY));
  }

  #[test]
  fn reordered_list_counts_as_changed() {
    let a = snapshot(&[(fields::TAGS, list(&["a", "b"]))]);
    let b = snapshot(&[(fields::TAGS, list(&["b", "a"]))]);
    let diff = compare(&a, &b);
    assert_eq!(diff[fields::TAGS].old, Some(list(&["a", "b"])));
    assert_eq!(diff[fields::TAGS].new, Some(list(&["b", "a"])));
  }

  #[test]
  fn missing_list_equals_empty_list() {
    let a = snapshot(&[]);
    let b = snapshot(&[(fields::COMPLIANCE_FRAMEWORKS, list(&[]))]);
    assert!(compare(&a, &b).is_empty());
  }

  #[test]
  fn never_reports_null_to_null() {
    let a = snapshot(&[(fields::TAGS, list(&["x"]))]);
    let b = snapshot(&[(fields::TERM, text("X"))]);
    for change in compare(&a, &b).values() {
      assert!(change.old.is_some() || change.new.is_some());
    }
  }

  #[test]
  fn rollback_reason_names_the_version() {
    assert_eq!(rollback_reason(3), "Rollback to version 3");
  }
}
