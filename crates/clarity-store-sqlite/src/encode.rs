//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (nanoseconds, `Z`
//! suffix) so that lexical order matches chronological order. String lists
//! and snapshot documents are stored as compact JSON. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use clarity_core::{
  cluster::Cluster,
  gap::{GapFinding, GapType, Severity},
  governance::{FlagStatus, FlagType, ProposalStatus, ProposalType, TermFlag, TermProposal},
  onboarding::OnboardingPath,
  relationship::{RelatedTerm, RelationshipType, TermExample, TermRelationship},
  snapshot::Snapshot,
  term::{Term, TermContext},
  usage::UsageAction,
  version::TermVersion,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── String lists ────────────────────────────────────────────────────────────

pub fn encode_list(items: &[String]) -> Result<String> {
  Ok(serde_json::to_string(items)?)
}

pub fn decode_list(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_gap_type(s: &str) -> Result<GapType> {
  match s {
    "missing_context" => Ok(GapType::MissingContext),
    "conflicting_definition" => Ok(GapType::ConflictingDefinition),
    "outdated" => Ok(GapType::Outdated),
    other => Err(Error::UnknownValue { column: "gap_type", value: other.to_owned() }),
  }
}

pub fn decode_severity(s: &str) -> Result<Severity> {
  match s {
    "low" => Ok(Severity::Low),
    "medium" => Ok(Severity::Medium),
    "high" => Ok(Severity::High),
    other => Err(Error::UnknownValue { column: "severity", value: other.to_owned() }),
  }
}

pub fn encode_action(a: UsageAction) -> &'static str { a.as_str() }

/// Decode a column written from one of the core enums' `as_str`.
fn decode_named<T>(column: &'static str, s: &str, parse: fn(&str) -> Option<T>) -> Result<T> {
  parse(s).ok_or_else(|| Error::UnknownValue { column, value: s.to_owned() })
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const TERM_COLUMNS: &str = "t.term_id, t.term, t.base_definition, t.category, t.code_name,
   t.tags, t.compliance_frameworks, t.created_by, t.created_at, t.updated_at,
   t.updated_by";

/// Raw strings read directly from a `terms` row.
pub struct RawTerm {
  pub term_id:               String,
  pub term:                  String,
  pub base_definition:       String,
  pub category:              Option<String>,
  pub code_name:             Option<String>,
  pub tags:                  String,
  pub compliance_frameworks: String,
  pub created_by:            Option<String>,
  pub created_at:            String,
  pub updated_at:            String,
  pub updated_by:            Option<String>,
}

impl RawTerm {
  /// Read the columns listed in [`TERM_COLUMNS`], in order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      term_id:               row.get(0)?,
      term:                  row.get(1)?,
      base_definition:       row.get(2)?,
      category:              row.get(3)?,
      code_name:             row.get(4)?,
      tags:                  row.get(5)?,
      compliance_frameworks: row.get(6)?,
      created_by:            row.get(7)?,
      created_at:            row.get(8)?,
      updated_at:            row.get(9)?,
      updated_by:            row.get(10)?,
    })
  }

  pub fn into_term(self) -> Result<Term> {
    Ok(Term {
      term_id:               decode_uuid(&self.term_id)?,
      term:                  self.term,
      base_definition:       self.base_definition,
      category:              self.category,
      code_name:             self.code_name,
      tags:                  decode_list(&self.tags)?,
      compliance_frameworks: decode_list(&self.compliance_frameworks)?,
      created_by:            decode_opt_uuid(self.created_by)?,
      created_at:            decode_dt(&self.created_at)?,
      updated_at:            decode_dt(&self.updated_at)?,
      updated_by:            decode_opt_uuid(self.updated_by)?,
    })
  }
}

pub const CONTEXT_COLUMNS: &str = "context_id, term_id, cluster, system, product,
   context_definition, business_rules, compliance_required, created_by,
   created_at, updated_at";

/// Raw strings read directly from a `term_contexts` row.
pub struct RawContext {
  pub context_id:          String,
  pub term_id:             String,
  pub cluster:             Option<String>,
  pub system:              Option<String>,
  pub product:             Option<String>,
  pub context_definition:  String,
  pub business_rules:      String,
  pub compliance_required: bool,
  pub created_by:          Option<String>,
  pub created_at:          String,
  pub updated_at:          String,
}

impl RawContext {
  /// Read the columns listed in [`CONTEXT_COLUMNS`], in order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      context_id:          row.get(0)?,
      term_id:             row.get(1)?,
      cluster:             row.get(2)?,
      system:              row.get(3)?,
      product:             row.get(4)?,
      context_definition:  row.get(5)?,
      business_rules:      row.get(6)?,
      compliance_required: row.get(7)?,
      created_by:          row.get(8)?,
      created_at:          row.get(9)?,
      updated_at:          row.get(10)?,
    })
  }

  pub fn into_context(self) -> Result<TermContext> {
    Ok(TermContext {
      context_id:          decode_uuid(&self.context_id)?,
      term_id:             decode_uuid(&self.term_id)?,
      cluster:             self.cluster,
      system:              self.system,
      product:             self.product,
      context_definition:  self.context_definition,
      business_rules:      decode_list(&self.business_rules)?,
      compliance_required: self.compliance_required,
      created_by:          decode_opt_uuid(self.created_by)?,
      created_at:          decode_dt(&self.created_at)?,
      updated_at:          decode_dt(&self.updated_at)?,
    })
  }
}

pub const VERSION_COLUMNS: &str = "version_id, term_id, version_number, term_data, changed_by,
   change_reason, created_at";

/// Raw strings read directly from a `term_versions` row.
pub struct RawVersion {
  pub version_id:     String,
  pub term_id:        String,
  pub version_number: u32,
  pub term_data:      String,
  pub changed_by:     Option<String>,
  pub change_reason:  Option<String>,
  pub created_at:     String,
}

impl RawVersion {
  /// Read the columns listed in [`VERSION_COLUMNS`], in order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      version_id:     row.get(0)?,
      term_id:        row.get(1)?,
      version_number: row.get(2)?,
      term_data:      row.get(3)?,
      changed_by:     row.get(4)?,
      change_reason:  row.get(5)?,
      created_at:     row.get(6)?,
    })
  }

  pub fn into_version(self) -> Result<TermVersion> {
    Ok(TermVersion {
      version_id:     decode_uuid(&self.version_id)?,
      subject_id:     decode_uuid(&self.term_id)?,
      version_number: self.version_number,
      snapshot:       Snapshot::from_json(&self.term_data)?,
      changed_by:     decode_opt_uuid(self.changed_by)?,
      change_reason:  self.change_reason,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

pub const CLUSTER_COLUMNS: &str =
  "cluster_id, name, description, owner_id, created_at, updated_at";

/// Raw strings read directly from a `clusters` row.
pub struct RawCluster {
  pub cluster_id:  String,
  pub name:        String,
  pub description: Option<String>,
  pub owner_id:    Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawCluster {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      cluster_id:  row.get(0)?,
      name:        row.get(1)?,
      description: row.get(2)?,
      owner_id:    row.get(3)?,
      created_at:  row.get(4)?,
      updated_at:  row.get(5)?,
    })
  }

  pub fn into_cluster(self) -> Result<Cluster> {
    Ok(Cluster {
      cluster_id:  decode_uuid(&self.cluster_id)?,
      name:        self.name,
      description: self.description,
      owner_id:    decode_opt_uuid(self.owner_id)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub const GAP_COLUMNS: &str = "gap_id, term_id, gap_type, affected_clusters, severity,
   description, detected_at, resolved_at, resolved_by";

/// Raw strings read directly from a `gap_analyses` row.
pub struct RawGap {
  pub gap_id:            String,
  pub term_id:           String,
  pub gap_type:          String,
  pub affected_clusters: String,
  pub severity:          String,
  pub description:       String,
  pub detected_at:       String,
  pub resolved_at:       Option<String>,
  pub resolved_by:       Option<String>,
}

impl RawGap {
  /// Read the columns listed in [`GAP_COLUMNS`], in order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      gap_id:            row.get(0)?,
      term_id:           row.get(1)?,
      gap_type:          row.get(2)?,
      affected_clusters: row.get(3)?,
      severity:          row.get(4)?,
      description:       row.get(5)?,
      detected_at:       row.get(6)?,
      resolved_at:       row.get(7)?,
      resolved_by:       row.get(8)?,
    })
  }

  pub fn into_finding(self) -> Result<GapFinding> {
    Ok(GapFinding {
      gap_id:            decode_uuid(&self.gap_id)?,
      subject_id:        decode_uuid(&self.term_id)?,
      gap_type:          decode_gap_type(&self.gap_type)?,
      affected_clusters: decode_list(&self.affected_clusters)?,
      severity:          decode_severity(&self.severity)?,
      description:       self.description,
      detected_at:       decode_dt(&self.detected_at)?,
      resolved_at:       decode_opt_dt(self.resolved_at)?,
      resolved_by:       decode_opt_uuid(self.resolved_by)?,
    })
  }
}

pub const EXAMPLE_COLUMNS: &str =
  "example_id, term_id, context_id, example_text, source, created_by, created_at";

/// Raw strings read directly from a `term_examples` row.
pub struct RawExample {
  pub example_id:   String,
  pub term_id:      String,
  pub context_id:   Option<String>,
  pub example_text: String,
  pub source:       Option<String>,
  pub created_by:   Option<String>,
  pub created_at:   String,
}

impl RawExample {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      example_id:   row.get(0)?,
      term_id:      row.get(1)?,
      context_id:   row.get(2)?,
      example_text: row.get(3)?,
      source:       row.get(4)?,
      created_by:   row.get(5)?,
      created_at:   row.get(6)?,
    })
  }

  pub fn into_example(self) -> Result<TermExample> {
    Ok(TermExample {
      example_id:   decode_uuid(&self.example_id)?,
      term_id:      decode_uuid(&self.term_id)?,
      context_id:   decode_opt_uuid(self.context_id)?,
      example_text: self.example_text,
      source:       self.source,
      created_by:   decode_opt_uuid(self.created_by)?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Relationship columns plus the linked term's name and definition, which
/// are `NULL` when the join finds no term.
pub const RELATIONSHIP_COLUMNS: &str = "r.relationship_id, r.term_id, r.related_term_id,
   r.relationship_type, r.created_by, r.created_at, rt.term, rt.base_definition";

/// Raw strings read from a `term_relationships` row joined to its target.
pub struct RawRelationship {
  pub relationship_id:   String,
  pub term_id:           String,
  pub related_term_id:   String,
  pub relationship_type: String,
  pub created_by:        Option<String>,
  pub created_at:        String,
  pub related_term:      Option<String>,
  pub related_def:       Option<String>,
}

impl RawRelationship {
  /// Read the columns listed in [`RELATIONSHIP_COLUMNS`], in order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      relationship_id:   row.get(0)?,
      term_id:           row.get(1)?,
      related_term_id:   row.get(2)?,
      relationship_type: row.get(3)?,
      created_by:        row.get(4)?,
      created_at:        row.get(5)?,
      related_term:      row.get(6)?,
      related_def:       row.get(7)?,
    })
  }

  pub fn into_relationship(self) -> Result<TermRelationship> {
    let related_term_id = decode_uuid(&self.related_term_id)?;
    let related_term = match (self.related_term, self.related_def) {
      (Some(term), Some(base_definition)) => {
        Some(RelatedTerm { term_id: related_term_id, term, base_definition })
      }
      _ => None,
    };
    Ok(TermRelationship {
      relationship_id: decode_uuid(&self.relationship_id)?,
      term_id: decode_uuid(&self.term_id)?,
      related_term_id,
      relationship_type: decode_named(
        "relationship_type",
        &self.relationship_type,
        RelationshipType::parse,
      )?,
      created_by: decode_opt_uuid(self.created_by)?,
      created_at: decode_dt(&self.created_at)?,
      related_term,
    })
  }
}

pub const PROPOSAL_COLUMNS: &str = "proposal_id, term_id, proposal_type, proposed_data, reason,
   status, proposed_by, reviewed_by, reviewed_at, created_at, updated_at";

/// Raw strings read directly from a `term_proposals` row.
pub struct RawProposal {
  pub proposal_id:   String,
  pub term_id:       Option<String>,
  pub proposal_type: String,
  pub proposed_data: String,
  pub reason:        Option<String>,
  pub status:        String,
  pub proposed_by:   Option<String>,
  pub reviewed_by:   Option<String>,
  pub reviewed_at:   Option<String>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawProposal {
  /// Read the columns listed in [`PROPOSAL_COLUMNS`], in order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      proposal_id:   row.get(0)?,
      term_id:       row.get(1)?,
      proposal_type: row.get(2)?,
      proposed_data: row.get(3)?,
      reason:        row.get(4)?,
      status:        row.get(5)?,
      proposed_by:   row.get(6)?,
      reviewed_by:   row.get(7)?,
      reviewed_at:   row.get(8)?,
      created_at:    row.get(9)?,
      updated_at:    row.get(10)?,
    })
  }

  pub fn into_proposal(self) -> Result<TermProposal> {
    Ok(TermProposal {
      proposal_id:   decode_uuid(&self.proposal_id)?,
      term_id:       decode_opt_uuid(self.term_id)?,
      proposal_type: decode_named("proposal_type", &self.proposal_type, ProposalType::parse)?,
      proposed_data: serde_json::from_str(&self.proposed_data)?,
      reason:        self.reason,
      status:        decode_named("status", &self.status, ProposalStatus::parse)?,
      proposed_by:   decode_opt_uuid(self.proposed_by)?,
      reviewed_by:   decode_opt_uuid(self.reviewed_by)?,
      reviewed_at:   decode_opt_dt(self.reviewed_at)?,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

pub const FLAG_COLUMNS: &str = "flag_id, term_id, flag_type, description, status, flagged_by,
   resolved_by, resolved_at, created_at, updated_at";

/// Raw strings read directly from a `term_flags` row.
pub struct RawFlag {
  pub flag_id:     String,
  pub term_id:     String,
  pub flag_type:   String,
  pub description: String,
  pub status:      String,
  pub flagged_by:  Option<String>,
  pub resolved_by: Option<String>,
  pub resolved_at: Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawFlag {
  /// Read the columns listed in [`FLAG_COLUMNS`], in order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      flag_id:     row.get(0)?,
      term_id:     row.get(1)?,
      flag_type:   row.get(2)?,
      description: row.get(3)?,
      status:      row.get(4)?,
      flagged_by:  row.get(5)?,
      resolved_by: row.get(6)?,
      resolved_at: row.get(7)?,
      created_at:  row.get(8)?,
      updated_at:  row.get(9)?,
    })
  }

  pub fn into_flag(self) -> Result<TermFlag> {
    Ok(TermFlag {
      flag_id:     decode_uuid(&self.flag_id)?,
      term_id:     decode_uuid(&self.term_id)?,
      flag_type:   decode_named("flag_type", &self.flag_type, FlagType::parse)?,
      description: self.description,
      status:      decode_named("status", &self.status, FlagStatus::parse)?,
      flagged_by:  decode_opt_uuid(self.flagged_by)?,
      resolved_by: decode_opt_uuid(self.resolved_by)?,
      resolved_at: decode_opt_dt(self.resolved_at)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub const PATH_COLUMNS: &str = "path_id, role, cluster, term_ids, order_index, created_at";

/// Raw strings read directly from an `onboarding_paths` row.
pub struct RawPath {
  pub path_id:     String,
  pub role:        String,
  pub cluster:     Option<String>,
  pub term_ids:    String,
  pub order_index: i64,
  pub created_at:  String,
}

impl RawPath {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      path_id:     row.get(0)?,
      role:        row.get(1)?,
      cluster:     row.get(2)?,
      term_ids:    row.get(3)?,
      order_index: row.get(4)?,
      created_at:  row.get(5)?,
    })
  }

  pub fn into_path(self) -> Result<OnboardingPath> {
    Ok(OnboardingPath {
      path_id:     decode_uuid(&self.path_id)?,
      role:        self.role,
      cluster:     self.cluster,
      term_ids:    serde_json::from_str(&self.term_ids)?,
      order_index: self.order_index,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn encoded_timestamps_sort_chronologically() {
    let a = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let b = a + chrono::Duration::microseconds(1500);
    let c = a + chrono::Duration::seconds(10);
    let mut encoded = vec![encode_dt(c), encode_dt(a), encode_dt(b)];
    encoded.sort();
    assert_eq!(encoded, [encode_dt(a), encode_dt(b), encode_dt(c)]);
    assert_eq!(decode_dt(&encode_dt(b)).unwrap(), b);
  }

  #[test]
  fn unknown_enum_values_are_rejected() {
    assert!(matches!(
      decode_gap_type("duplicate"),
      Err(Error::UnknownValue { column: "gap_type", .. })
    ));
    assert!(decode_severity("critical").is_err());
    assert!(matches!(
      decode_named("status", "archived", FlagStatus::parse),
      Err(Error::UnknownValue { column: "status", .. })
    ));
  }
}
