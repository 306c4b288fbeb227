//! [`SqliteStore`] — the SQLite implementation of [`GlossaryStore`].

use std::{
  collections::{BTreeMap, BTreeSet},
  path::Path,
};

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use clarity_core::{
  cluster::{Cluster, ClusterCoverage, CoverageReport, NewCluster},
  gap::{GapAnalytics, GapFinding, GapQuery},
  snapshot::Snapshot,
  store::GlossaryStore,
  governance::{
    FlagQuery, FlagStatus, NewFlag, NewProposal, ProposalQuery, ProposalStatus, TermFlag,
    TermProposal,
  },
  onboarding::{NewOnboardingPath, OnboardingPath, OnboardingProgress, PathQuery},
  relationship::{NewExample, NewRelationship, TermExample, TermRelationship},
  term::{
    NewContext, NewTerm, Page, SearchQuery, Term, TermContext, TermDetail, TermPatch,
    TermQuery,
  },
  usage::{RecentTerm, UsageAction, UsageEvent},
  version::{NewVersion, TermVersion, rollback_reason},
};

use crate::{
  Error, Result,
  encode::{
    CLUSTER_COLUMNS, CONTEXT_COLUMNS, EXAMPLE_COLUMNS, FLAG_COLUMNS, GAP_COLUMNS,
    PATH_COLUMNS, PROPOSAL_COLUMNS, RELATIONSHIP_COLUMNS, RawCluster, RawContext,
    RawExample, RawFlag, RawGap, RawPath, RawProposal, RawRelationship, RawTerm,
    RawVersion, TERM_COLUMNS, VERSION_COLUMNS, decode_dt, decode_uuid, encode_action,
    encode_dt, encode_list, encode_uuid,
  },
  schema::{REBUILD_SEARCH_INDEX, SCHEMA, SCHEMA_VERSION},
};

/// How many times [`SqliteStore::record_version`] retries after losing a race
/// for a version number.
const VERSION_ATTEMPTS: u32 = 5;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A glossary store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let upgraded_from = self
      .conn
      .call(|conn| {
        let found: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
        // Journal mode cannot change inside a transaction.
        conn.execute_batch(SCHEMA)?;
        if found < SCHEMA_VERSION {
          let tx = conn.transaction()?;
          if found > 0 {
            tx.execute_batch(REBUILD_SEARCH_INDEX)?;
          }
          tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
          tx.commit()?;
        }
        Ok(found)
      })
      .await?;

    if upgraded_from > 0 && upgraded_from < SCHEMA_VERSION {
      info!(from = upgraded_from, to = SCHEMA_VERSION, "upgraded store schema");
    }
    Ok(())
  }
}

// ─── Connection-thread helpers ───────────────────────────────────────────────
//
// These run inside `Connection::call`, where only `tokio_rusqlite::Error` can
// be returned. Decoding failures are boxed into its `Other` variant.

fn other(e: impl Into<Error>) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e.into()))
}

fn is_constraint_violation(e: &tokio_rusqlite::Error) -> bool {
  matches!(
    e,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(f, _))
      if f.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

fn term_exists(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row("SELECT 1 FROM terms WHERE term_id = ?1", rusqlite::params![id], |_| Ok(()))
      .optional()?
      .is_some(),
  )
}

fn fetch_term(conn: &rusqlite::Connection, id: &str) -> tokio_rusqlite::Result<Option<Term>> {
  let raw = conn
    .query_row(
      &format!("SELECT {TERM_COLUMNS} FROM terms t WHERE t.term_id = ?1"),
      rusqlite::params![id],
      RawTerm::from_row,
    )
    .optional()?;
  raw.map(RawTerm::into_term).transpose().map_err(other)
}

/// Overwrite every mutable column of `term`'s row.
fn write_term(conn: &rusqlite::Connection, term: &Term) -> tokio_rusqlite::Result<()> {
  let tags = encode_list(&term.tags).map_err(other)?;
  let frameworks = encode_list(&term.compliance_frameworks).map_err(other)?;
  conn.execute(
    "UPDATE terms SET
       term = ?2, base_definition = ?3, category = ?4, code_name = ?5,
       tags = ?6, compliance_frameworks = ?7, updated_at = ?8, updated_by = ?9
     WHERE term_id = ?1",
    rusqlite::params![
      encode_uuid(term.term_id),
      term.term,
      term.base_definition,
      term.category,
      term.code_name,
      tags,
      frameworks,
      encode_dt(term.updated_at),
      term.updated_by.map(encode_uuid),
    ],
  )?;
  Ok(())
}

/// Insert `input` under the next free version number for its subject.
///
/// Callers hold an immediate transaction, so the read of the current maximum
/// and the insert cannot interleave with another writer.
fn insert_next_version(
  conn: &rusqlite::Connection,
  input: NewVersion,
  now: DateTime<Utc>,
) -> tokio_rusqlite::Result<TermVersion> {
  let subject = encode_uuid(input.subject_id);
  let next: u32 = conn.query_row(
    "SELECT COALESCE(MAX(version_number), 0) + 1 FROM term_versions WHERE term_id = ?1",
    rusqlite::params![subject],
    |r| r.get(0),
  )?;

  let version = TermVersion {
    version_id:     Uuid::new_v4(),
    subject_id:     input.subject_id,
    version_number: next,
    snapshot:       input.snapshot,
    changed_by:     input.changed_by,
    change_reason:  input.change_reason,
    created_at:     now,
  };
  let term_data = version.snapshot.to_json().map_err(other)?;

  conn.execute(
    "INSERT INTO term_versions (
       version_id, term_id, version_number, term_data,
       changed_by, change_reason, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      encode_uuid(version.version_id),
      subject,
      version.version_number,
      term_data,
      version.changed_by.map(encode_uuid),
      version.change_reason,
      encode_dt(version.created_at),
    ],
  )?;
  Ok(version)
}

/// Snapshot `term` as it currently stands.
fn snapshot_of(term: &Term, actor: Option<Uuid>, reason: Option<String>) -> NewVersion {
  NewVersion {
    subject_id:    term.term_id,
    snapshot:      Snapshot::from(term),
    changed_by:    actor,
    change_reason: reason,
  }
}

fn count(conn: &rusqlite::Connection, sql: &str) -> rusqlite::Result<u64> {
  let n: i64 = conn.query_row(sql, [], |r| r.get(0))?;
  Ok(n as u64)
}

fn grouped_counts(
  conn: &rusqlite::Connection,
  sql: &str,
) -> rusqlite::Result<BTreeMap<String, u64>> {
  let mut stmt = conn.prepare(sql)?;
  stmt
    .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)? as u64)))?
    .collect()
}

/// Turn free text into an FTS5 query: every word becomes a quoted prefix
/// term, and all of them must match. `None` when the text has no words.
fn fts_query(text: &str) -> Option<String> {
  let terms: Vec<String> = text
    .split(|c: char| !c.is_alphanumeric())
    .filter(|w| !w.is_empty())
    .map(|w| format!("\"{w}\"*"))
    .collect();
  (!terms.is_empty()).then(|| terms.join(" "))
}

// ─── Transaction outcomes ────────────────────────────────────────────────────

enum Restore {
  VersionMissing,
  TermMissing,
  Restored(Term),
}

enum Resolve {
  Missing,
  AlreadyResolved,
  Resolved(RawGap),
}

enum Attach {
  TermMissing,
  ForeignContext,
  Attached,
}

enum Link {
  TermMissing,
  RelatedMissing,
  Exists,
  Linked(RawRelationship),
}

enum Review {
  Missing,
  AlreadyReviewed,
  Reviewed(RawProposal),
}

// ─── GlossaryStore impl ──────────────────────────────────────────────────────

impl GlossaryStore for SqliteStore {
  type Error = Error;

  // ── Terms ─────────────────────────────────────────────────────────────────

  async fn create_term(&self, input: NewTerm, actor: Option<Uuid>) -> Result<Term> {
    input.validate()?;

    let now = Utc::now();
    let term = Term {
      term_id:               Uuid::new_v4(),
      term:                  input.term,
      base_definition:       input.base_definition,
      category:              input.category,
      code_name:             input.code_name,
      tags:                  input.tags,
      compliance_frameworks: input.compliance_frameworks,
      created_by:            actor,
      created_at:            now,
      updated_at:            now,
      updated_by:            None,
    };

    let id_str     = encode_uuid(term.term_id);
    let name       = term.term.clone();
    let definition = term.base_definition.clone();
    let category   = term.category.clone();
    let code_name  = term.code_name.clone();
    let tags       = encode_list(&term.tags)?;
    let frameworks = encode_list(&term.compliance_frameworks)?;
    let by_str     = actor.map(encode_uuid);
    let at_str     = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO terms (
             term_id, term, base_definition, category, code_name, tags,
             compliance_frameworks, created_by, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
          rusqlite::params![
            id_str, name, definition, category, code_name, tags, frameworks,
            by_str, at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(term)
  }

  async fn get_term(&self, id: Uuid) -> Result<Option<Term>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawTerm> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {TERM_COLUMNS} FROM terms t WHERE t.term_id = ?1"),
            rusqlite::params![id_str],
            RawTerm::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawTerm::into_term).transpose()
  }

  async fn list_terms(&self, query: &TermQuery) -> Result<Page<Term>> {
    let category   = query.category.clone();
    let after_term = query.after.as_ref().map(|c| c.term.clone());
    let after_id   = query.after.as_ref().map(|c| encode_uuid(c.term_id));
    let limit_val  = query.limit as i64;
    let offset_val = query.offset as i64;

    let (raws, total): (Vec<RawTerm>, i64) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row(
          "SELECT COUNT(*) FROM terms t WHERE (?1 IS NULL OR t.category = ?1)",
          rusqlite::params![category],
          |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {TERM_COLUMNS} FROM terms t
           WHERE (?1 IS NULL OR t.category = ?1)
             AND (?4 IS NULL OR (t.term, t.term_id) > (?4, ?5))
           ORDER BY t.term ASC, t.term_id ASC
           LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![category, limit_val, offset_val, after_term, after_id],
            RawTerm::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((rows, total))
      })
      .await?;

    Ok(Page {
      data:   raws.into_iter().map(RawTerm::into_term).collect::<Result<_>>()?,
      total:  total as u64,
      limit:  query.limit,
      offset: query.offset,
    })
  }

  async fn update_term(
    &self,
    id:     Uuid,
    patch:  TermPatch,
    actor:  Option<Uuid>,
    reason: Option<String>,
  ) -> Result<Term> {
    patch.validate()?;

    if patch.is_empty() {
      return self
        .get_term(id)
        .await?
        .ok_or(Error::Core(clarity_core::Error::TermNotFound(id)));
    }

    let id_str = encode_uuid(id);

    let updated: Option<Term> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(mut term) = fetch_term(&tx, &id_str)? else {
          return Ok(None);
        };

        let now = Utc::now();
        insert_next_version(&tx, snapshot_of(&term, actor, reason), now)?;

        patch.apply(&mut term);
        term.updated_at = now;
        term.updated_by = actor;
        write_term(&tx, &term)?;

        tx.commit()?;
        Ok(Some(term))
      })
      .await?;

    updated.ok_or(Error::Core(clarity_core::Error::TermNotFound(id)))
  }

  async fn delete_term(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM terms WHERE term_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;

    if deleted == 0 {
      return Err(clarity_core::Error::TermNotFound(id).into());
    }
    Ok(())
  }

  // ── Contexts ──────────────────────────────────────────────────────────────

  async fn add_context(
    &self,
    term_id: Uuid,
    input:   NewContext,
    actor:   Option<Uuid>,
  ) -> Result<TermContext> {
    input.validate()?;

    let now = Utc::now();
    let context = TermContext {
      context_id:          Uuid::new_v4(),
      term_id,
      cluster:             input.cluster,
      system:              input.system,
      product:             input.product,
      context_definition:  input.context_definition,
      business_rules:      input.business_rules,
      compliance_required: input.compliance_required,
      created_by:          actor,
      created_at:          now,
      updated_at:          now,
    };

    let ctx_id_str  = encode_uuid(context.context_id);
    let term_id_str = encode_uuid(term_id);
    let cluster     = context.cluster.clone();
    let system      = context.system.clone();
    let product     = context.product.clone();
    let definition  = context.context_definition.clone();
    let rules       = encode_list(&context.business_rules)?;
    let compliance  = context.compliance_required;
    let by_str      = actor.map(encode_uuid);
    let at_str      = encode_dt(now);

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !term_exists(&tx, &term_id_str)? {
          return Ok(false);
        }

        tx.execute(
          "INSERT INTO term_contexts (
             context_id, term_id, cluster, system, product, context_definition,
             business_rules, compliance_required, created_by, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
          rusqlite::params![
            ctx_id_str, term_id_str, cluster, system, product, definition, rules,
            compliance, by_str, at_str,
          ],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(clarity_core::Error::TermNotFound(term_id).into());
    }
    Ok(context)
  }

  async fn get_contexts(&self, term_id: Uuid) -> Result<Vec<TermContext>> {
    let id_str = encode_uuid(term_id);

    let raws: Vec<RawContext> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONTEXT_COLUMNS} FROM term_contexts
           WHERE term_id = ?1
           ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawContext::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContext::into_context).collect()
  }

  // ── Examples & relationships ──────────────────────────────────────────────

  async fn term_detail(&self, id: Uuid) -> Result<Option<TermDetail>> {
    let Some(term) = self.get_term(id).await? else {
      return Ok(None);
    };
    Ok(Some(TermDetail {
      term,
      contexts:      self.get_contexts(id).await?,
      examples:      self.list_examples(id).await?,
      relationships: self.list_relationships(id).await?,
    }))
  }

  async fn add_example(
    &self,
    term_id: Uuid,
    input:   NewExample,
    actor:   Option<Uuid>,
  ) -> Result<TermExample> {
    input.validate()?;

    let example = TermExample {
      example_id:   Uuid::new_v4(),
      term_id,
      context_id:   input.context_id,
      example_text: input.example_text,
      source:       input.source,
      created_by:   actor,
      created_at:   Utc::now(),
    };

    let id_str      = encode_uuid(example.example_id);
    let term_id_str = encode_uuid(term_id);
    let ctx_str     = example.context_id.map(encode_uuid);
    let text        = example.example_text.clone();
    let source      = example.source.clone();
    let by_str      = actor.map(encode_uuid);
    let at_str      = encode_dt(example.created_at);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !term_exists(&tx, &term_id_str)? {
          return Ok(Attach::TermMissing);
        }
        if let Some(ctx) = &ctx_str {
          let owner: Option<String> = tx
            .query_row(
              "SELECT term_id FROM term_contexts WHERE context_id = ?1",
              rusqlite::params![ctx],
              |r| r.get(0),
            )
            .optional()?;
          if owner.as_deref() != Some(term_id_str.as_str()) {
            return Ok(Attach::ForeignContext);
          }
        }

        tx.execute(
          "INSERT INTO term_examples (
             example_id, term_id, context_id, example_text, source, created_by, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, term_id_str, ctx_str, text, source, by_str, at_str],
        )?;
        tx.commit()?;
        Ok(Attach::Attached)
      })
      .await?;

    match outcome {
      Attach::Attached => Ok(example),
      Attach::TermMissing => Err(clarity_core::Error::TermNotFound(term_id).into()),
      Attach::ForeignContext => Err(
        clarity_core::Error::Validation(format!(
          "context {} does not belong to term {term_id}",
          example.context_id.map(|c| c.to_string()).unwrap_or_default()
        ))
        .into(),
      ),
    }
  }

  async fn list_examples(&self, term_id: Uuid) -> Result<Vec<TermExample>> {
    let id_str = encode_uuid(term_id);

    let raws: Vec<RawExample> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {EXAMPLE_COLUMNS} FROM term_examples
           WHERE term_id = ?1
           ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawExample::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawExample::into_example).collect()
  }

  async fn add_relationship(
    &self,
    term_id: Uuid,
    input:   NewRelationship,
    actor:   Option<Uuid>,
  ) -> Result<TermRelationship> {
    input.validate(term_id)?;

    let now = Utc::now();
    let relationship_id = Uuid::new_v4();
    let id_str      = encode_uuid(relationship_id);
    let term_id_str = encode_uuid(term_id);
    let related_str = encode_uuid(input.related_term_id);
    let kind        = input.relationship_type.as_str();
    let by_str      = actor.map(encode_uuid);
    let at_str      = encode_dt(now);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !term_exists(&tx, &term_id_str)? {
          return Ok(Link::TermMissing);
        }
        if !term_exists(&tx, &related_str)? {
          return Ok(Link::RelatedMissing);
        }

        let inserted = tx.execute(
          "INSERT INTO term_relationships (
             relationship_id, term_id, related_term_id, relationship_type,
             created_by, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (term_id, related_term_id, relationship_type) DO NOTHING",
          rusqlite::params![id_str, term_id_str, related_str, kind, by_str, at_str],
        )?;
        if inserted == 0 {
          return Ok(Link::Exists);
        }

        let raw = tx.query_row(
          &format!(
            "SELECT {RELATIONSHIP_COLUMNS} FROM term_relationships r
             LEFT JOIN terms rt ON rt.term_id = r.related_term_id
             WHERE r.relationship_id = ?1"
          ),
          rusqlite::params![id_str],
          RawRelationship::from_row,
        )?;
        tx.commit()?;
        Ok(Link::Linked(raw))
      })
      .await?;

    match outcome {
      Link::Linked(raw) => raw.into_relationship(),
      Link::TermMissing => Err(clarity_core::Error::TermNotFound(term_id).into()),
      Link::RelatedMissing => {
        Err(clarity_core::Error::TermNotFound(input.related_term_id).into())
      }
      Link::Exists => Err(clarity_core::Error::RelationshipExists.into()),
    }
  }

  async fn list_relationships(&self, term_id: Uuid) -> Result<Vec<TermRelationship>> {
    let id_str = encode_uuid(term_id);

    let raws: Vec<RawRelationship> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RELATIONSHIP_COLUMNS} FROM term_relationships r
           LEFT JOIN terms rt ON rt.term_id = r.related_term_id
           WHERE r.term_id = ?1
           ORDER BY r.relationship_type ASC, rt.term ASC, r.related_term_id ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawRelationship::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRelationship::into_relationship).collect()
  }

  // ── Versions ──────────────────────────────────────────────────────────────

  async fn record_version(&self, input: NewVersion) -> Result<TermVersion> {
    let subject_id = input.subject_id;

    for attempt in 1..=VERSION_ATTEMPTS {
      let input = input.clone();
      let result = self
        .conn
        .call(move |conn| {
          let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
          let version = insert_next_version(&tx, input, Utc::now())?;
          tx.commit()?;
          Ok(version)
        })
        .await;

      match result {
        Ok(version) => return Ok(version),
        Err(e) if is_constraint_violation(&e) => {
          debug!(%subject_id, attempt, "version number taken; retrying");
        }
        Err(e) => return Err(e.into()),
      }
    }

    Err(Error::VersionContention(subject_id, VERSION_ATTEMPTS))
  }

  async fn snapshot_term(
    &self,
    term_id: Uuid,
    actor:   Option<Uuid>,
    reason:  Option<String>,
  ) -> Result<TermVersion> {
    let id_str = encode_uuid(term_id);

    let version: Option<TermVersion> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(term) = fetch_term(&tx, &id_str)? else {
          return Ok(None);
        };
        let version = insert_next_version(&tx, snapshot_of(&term, actor, reason), Utc::now())?;
        tx.commit()?;
        Ok(Some(version))
      })
      .await?;

    version.ok_or(Error::Core(clarity_core::Error::TermNotFound(term_id)))
  }

  async fn get_version(&self, version_id: Uuid) -> Result<Option<TermVersion>> {
    let id_str = encode_uuid(version_id);

    let raw: Option<RawVersion> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {VERSION_COLUMNS} FROM term_versions WHERE version_id = ?1"),
            rusqlite::params![id_str],
            RawVersion::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawVersion::into_version).transpose()
  }

  async fn list_versions(&self, subject_id: Uuid) -> Result<Vec<TermVersion>> {
    let id_str = encode_uuid(subject_id);

    let raws: Vec<RawVersion> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {VERSION_COLUMNS} FROM term_versions
           WHERE term_id = ?1
           ORDER BY version_number DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawVersion::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVersion::into_version).collect()
  }

  async fn restore_version(
    &self,
    term_id:    Uuid,
    version_id: Uuid,
    actor:      Option<Uuid>,
  ) -> Result<Term> {
    let term_id_str    = encode_uuid(term_id);
    let version_id_str = encode_uuid(version_id);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let target = tx
          .query_row(
            &format!("SELECT {VERSION_COLUMNS} FROM term_versions WHERE version_id = ?1"),
            rusqlite::params![version_id_str],
            RawVersion::from_row,
          )
          .optional()?
          .map(RawVersion::into_version)
          .transpose()
          .map_err(other)?;
        let Some(target) = target.filter(|v| v.subject_id == term_id) else {
          return Ok(Restore::VersionMissing);
        };

        let Some(mut term) = fetch_term(&tx, &term_id_str)? else {
          return Ok(Restore::TermMissing);
        };

        let now = Utc::now();
        let reason = rollback_reason(target.version_number);
        insert_next_version(&tx, snapshot_of(&term, actor, Some(reason)), now)?;

        TermPatch::from_snapshot(&target.snapshot).apply(&mut term);
        term.updated_at = now;
        term.updated_by = actor;
        write_term(&tx, &term)?;

        tx.commit()?;
        Ok(Restore::Restored(term))
      })
      .await?;

    match outcome {
      Restore::Restored(term) => Ok(term),
      Restore::VersionMissing => {
        Err(clarity_core::Error::VersionNotFound(version_id).into())
      }
      Restore::TermMissing => Err(clarity_core::Error::TermNotFound(term_id).into()),
    }
  }

  // ── Clusters ──────────────────────────────────────────────────────────────

  async fn all_known_clusters(&self) -> Result<BTreeSet<String>> {
    let names: Vec<String> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT cluster FROM term_contexts
           WHERE cluster IS NOT NULL AND cluster != ''",
        )?;
        let rows = stmt
          .query_map([], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(names.into_iter().collect())
  }

  async fn terms_for_cluster(&self, cluster: &str) -> Result<Vec<Term>> {
    let cluster = cluster.to_owned();

    let raws: Vec<RawTerm> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TERM_COLUMNS} FROM terms t
           WHERE EXISTS (
             SELECT 1 FROM term_contexts tc
             WHERE tc.term_id = t.term_id AND tc.cluster = ?1
           )
           ORDER BY t.term ASC, t.term_id ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![cluster], RawTerm::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTerm::into_term).collect()
  }

  async fn cluster_comparison(
    &self,
    term_id: Uuid,
  ) -> Result<BTreeMap<String, Vec<TermContext>>> {
    let mut grouped: BTreeMap<String, Vec<TermContext>> = BTreeMap::new();
    for ctx in self.get_contexts(term_id).await? {
      if let Some(cluster) = ctx.cluster.clone() {
        grouped.entry(cluster).or_default().push(ctx);
      }
    }
    Ok(grouped)
  }

  async fn list_clusters(&self) -> Result<Vec<Cluster>> {
    let raws: Vec<RawCluster> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CLUSTER_COLUMNS} FROM clusters ORDER BY name ASC"
        ))?;
        let rows = stmt
          .query_map([], RawCluster::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    if raws.is_empty() {
      let now = Utc::now();
      return Ok(
        self
          .all_known_clusters()
          .await?
          .into_iter()
          .map(|name| Cluster::derived(name, now))
          .collect(),
      );
    }

    raws.into_iter().map(RawCluster::into_cluster).collect()
  }

  async fn create_cluster(&self, input: NewCluster, owner: Option<Uuid>) -> Result<Cluster> {
    input.validate()?;

    let now = Utc::now();
    let cluster = Cluster {
      cluster_id:  Uuid::new_v4(),
      name:        input.name,
      description: input.description,
      owner_id:    owner,
      created_at:  now,
      updated_at:  now,
    };

    let id_str      = encode_uuid(cluster.cluster_id);
    let name        = cluster.name.clone();
    let description = cluster.description.clone();
    let owner_str   = owner.map(encode_uuid);
    let at_str      = encode_dt(now);

    let result = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO clusters (cluster_id, name, description, owner_id, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![id_str, name, description, owner_str, at_str],
        )?;
        Ok(())
      })
      .await;

    match result {
      Ok(()) => Ok(cluster),
      Err(e) if is_constraint_violation(&e) => {
        Err(clarity_core::Error::ClusterExists(cluster.name).into())
      }
      Err(e) => Err(e.into()),
    }
  }

  async fn cluster_coverage(&self) -> Result<CoverageReport> {
    let (total_terms, with_context, open_gaps) = self
      .conn
      .call(|conn| {
        let total = count(conn, "SELECT COUNT(*) FROM terms")?;
        let with_context = grouped_counts(
          conn,
          "SELECT cluster, COUNT(DISTINCT term_id) FROM term_contexts
           WHERE cluster IS NOT NULL AND cluster != ''
           GROUP BY cluster",
        )?;
        let open_gaps = grouped_counts(
          conn,
          "SELECT c.value, COUNT(*) FROM gap_analyses g, json_each(g.affected_clusters) c
           WHERE g.resolved_at IS NULL
           GROUP BY c.value",
        )?;
        Ok((total, with_context, open_gaps))
      })
      .await?;

    let clusters = with_context
      .into_iter()
      .map(|(cluster, terms)| {
        let gaps = open_gaps.get(&cluster).copied().unwrap_or(0);
        ClusterCoverage::new(cluster, terms, total_terms, gaps)
      })
      .collect();

    Ok(CoverageReport { clusters, total_terms })
  }

  // ── Gaps ──────────────────────────────────────────────────────────────────

  async fn record_gap(&self, finding: &GapFinding) -> Result<()> {
    let gap_id_str  = encode_uuid(finding.gap_id);
    let term_id_str = encode_uuid(finding.subject_id);
    let gap_type    = finding.gap_type.as_str();
    let clusters    = encode_list(&finding.affected_clusters)?;
    let severity    = finding.severity.as_str();
    let description = finding.description.clone();
    let detected    = encode_dt(finding.detected_at);
    let resolved_at = finding.resolved_at.map(encode_dt);
    let resolved_by = finding.resolved_by.map(encode_uuid);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO gap_analyses (
             gap_id, term_id, gap_type, affected_clusters, severity,
             description, detected_at, resolved_at, resolved_by
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            gap_id_str, term_id_str, gap_type, clusters, severity, description,
            detected, resolved_at, resolved_by,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_gap(&self, gap_id: Uuid) -> Result<Option<GapFinding>> {
    let id_str = encode_uuid(gap_id);

    let raw: Option<RawGap> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {GAP_COLUMNS} FROM gap_analyses WHERE gap_id = ?1"),
            rusqlite::params![id_str],
            RawGap::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawGap::into_finding).transpose()
  }

  async fn list_gaps(&self, query: &GapQuery) -> Result<Page<GapFinding>> {
    let gap_type   = query.gap_type.map(|t| t.as_str());
    let severity   = query.severity.map(|s| s.as_str());
    let resolved   = query.resolved;
    let cluster    = query.cluster.clone();
    let limit_val  = query.limit as i64;
    let offset_val = query.offset as i64;

    const FILTER: &str = "(?1 IS NULL OR gap_type = ?1)
       AND (?2 IS NULL OR severity = ?2)
       AND (?3 IS NULL OR (resolved_at IS NOT NULL) = ?3)
       AND (?4 IS NULL OR EXISTS (
         SELECT 1 FROM json_each(affected_clusters) WHERE value = ?4
       ))";

    let (raws, total): (Vec<RawGap>, i64) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row(
          &format!("SELECT COUNT(*) FROM gap_analyses WHERE {FILTER}"),
          rusqlite::params![gap_type, severity, resolved, cluster],
          |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {GAP_COLUMNS} FROM gap_analyses
           WHERE {FILTER}
           ORDER BY detected_at DESC, rowid DESC
           LIMIT ?5 OFFSET ?6"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![gap_type, severity, resolved, cluster, limit_val, offset_val],
            RawGap::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((rows, total))
      })
      .await?;

    Ok(Page {
      data:   raws.into_iter().map(RawGap::into_finding).collect::<Result<_>>()?,
      total:  total as u64,
      limit:  query.limit,
      offset: query.offset,
    })
  }

  async fn resolve_gap(
    &self,
    gap_id: Uuid,
    actor:  Option<Uuid>,
    at:     DateTime<Utc>,
  ) -> Result<GapFinding> {
    let id_str = encode_uuid(gap_id);
    let by_str = actor.map(encode_uuid);
    let at_str = encode_dt(at);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let resolved_at: Option<Option<String>> = tx
          .query_row(
            "SELECT resolved_at FROM gap_analyses WHERE gap_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        match resolved_at {
          None => return Ok(Resolve::Missing),
          Some(Some(_)) => return Ok(Resolve::AlreadyResolved),
          Some(None) => {}
        }

        tx.execute(
          "UPDATE gap_analyses SET resolved_at = ?2, resolved_by = ?3
           WHERE gap_id = ?1 AND resolved_at IS NULL",
          rusqlite::params![id_str, at_str, by_str],
        )?;
        let raw = tx.query_row(
          &format!("SELECT {GAP_COLUMNS} FROM gap_analyses WHERE gap_id = ?1"),
          rusqlite::params![id_str],
          RawGap::from_row,
        )?;

        tx.commit()?;
        Ok(Resolve::Resolved(raw))
      })
      .await?;

    match outcome {
      Resolve::Resolved(raw) => raw.into_finding(),
      Resolve::Missing => Err(clarity_core::Error::GapNotFound(gap_id).into()),
      Resolve::AlreadyResolved => {
        Err(clarity_core::Error::AlreadyResolved(gap_id).into())
      }
    }
  }

  async fn gap_analytics(&self) -> Result<GapAnalytics> {
    Ok(
      self
        .conn
        .call(|conn| {
          Ok(GapAnalytics {
            total_gaps:       count(
              conn,
              "SELECT COUNT(*) FROM gap_analyses WHERE resolved_at IS NULL",
            )?,
            gaps_by_type:     grouped_counts(
              conn,
              "SELECT gap_type, COUNT(*) FROM gap_analyses
               WHERE resolved_at IS NULL GROUP BY gap_type",
            )?,
            gaps_by_severity: grouped_counts(
              conn,
              "SELECT severity, COUNT(*) FROM gap_analyses
               WHERE resolved_at IS NULL GROUP BY severity",
            )?,
            resolved_gaps:    count(
              conn,
              "SELECT COUNT(*) FROM gap_analyses WHERE resolved_at IS NOT NULL",
            )?,
          })
        })
        .await?,
    )
  }

  // ── Governance ────────────────────────────────────────────────────────────

  async fn create_proposal(
    &self,
    input: NewProposal,
    actor: Option<Uuid>,
  ) -> Result<TermProposal> {
    input.validate()?;

    let now = Utc::now();
    let proposal = TermProposal {
      proposal_id:   Uuid::new_v4(),
      term_id:       input.term_id,
      proposal_type: input.proposal_type,
      proposed_data: input.proposed_data,
      reason:        input.reason,
      status:        ProposalStatus::Pending,
      proposed_by:   actor,
      reviewed_by:   None,
      reviewed_at:   None,
      created_at:    now,
      updated_at:    now,
    };

    let id_str      = encode_uuid(proposal.proposal_id);
    let term_id_str = proposal.term_id.map(encode_uuid);
    let kind        = proposal.proposal_type.as_str();
    let data        = serde_json::to_string(&proposal.proposed_data)?;
    let reason      = proposal.reason.clone();
    let status      = proposal.status.as_str();
    let by_str      = actor.map(encode_uuid);
    let at_str      = encode_dt(now);

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Some(term) = &term_id_str
          && !term_exists(&tx, term)?
        {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO term_proposals (
             proposal_id, term_id, proposal_type, proposed_data, reason, status,
             proposed_by, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
          rusqlite::params![id_str, term_id_str, kind, data, reason, status, by_str, at_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    match (inserted, proposal.term_id) {
      (false, Some(term_id)) => Err(clarity_core::Error::TermNotFound(term_id).into()),
      _ => Ok(proposal),
    }
  }

  async fn get_proposal(&self, proposal_id: Uuid) -> Result<Option<TermProposal>> {
    let id_str = encode_uuid(proposal_id);

    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PROPOSAL_COLUMNS} FROM term_proposals WHERE proposal_id = ?1"),
            rusqlite::params![id_str],
            RawProposal::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawProposal::into_proposal).transpose()
  }

  async fn list_proposals(&self, query: &ProposalQuery) -> Result<Page<TermProposal>> {
    let status     = query.status.map(|s| s.as_str());
    let limit_val  = query.limit as i64;
    let offset_val = query.offset as i64;

    let (raws, total): (Vec<RawProposal>, i64) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row(
          "SELECT COUNT(*) FROM term_proposals WHERE ?1 IS NULL OR status = ?1",
          rusqlite::params![status],
          |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {PROPOSAL_COLUMNS} FROM term_proposals
           WHERE ?1 IS NULL OR status = ?1
           ORDER BY created_at DESC, rowid DESC
           LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![status, limit_val, offset_val], RawProposal::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((rows, total))
      })
      .await?;

    Ok(Page {
      data:   raws.into_iter().map(RawProposal::into_proposal).collect::<Result<_>>()?,
      total:  total as u64,
      limit:  query.limit,
      offset: query.offset,
    })
  }

  async fn review_proposal(
    &self,
    proposal_id: Uuid,
    status:      ProposalStatus,
    actor:       Option<Uuid>,
    at:          DateTime<Utc>,
  ) -> Result<TermProposal> {
    if !status.is_verdict() {
      return Err(
        clarity_core::Error::Validation("status must be 'approved' or 'rejected'".into())
          .into(),
      );
    }

    let id_str  = encode_uuid(proposal_id);
    let verdict = status.as_str();
    let pending = ProposalStatus::Pending.as_str();
    let by_str  = actor.map(encode_uuid);
    let at_str  = encode_dt(at);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<String> = tx
          .query_row(
            "SELECT status FROM term_proposals WHERE proposal_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        match current.as_deref() {
          None => return Ok(Review::Missing),
          Some(s) if s != pending => return Ok(Review::AlreadyReviewed),
          Some(_) => {}
        }

        tx.execute(
          "UPDATE term_proposals
           SET status = ?2, reviewed_by = ?3, reviewed_at = ?4, updated_at = ?4
           WHERE proposal_id = ?1",
          rusqlite::params![id_str, verdict, by_str, at_str],
        )?;
        let raw = tx.query_row(
          &format!("SELECT {PROPOSAL_COLUMNS} FROM term_proposals WHERE proposal_id = ?1"),
          rusqlite::params![id_str],
          RawProposal::from_row,
        )?;

        tx.commit()?;
        Ok(Review::Reviewed(raw))
      })
      .await?;

    match outcome {
      Review::Reviewed(raw) => raw.into_proposal(),
      Review::Missing => Err(clarity_core::Error::ProposalNotFound(proposal_id).into()),
      Review::AlreadyReviewed => {
        Err(clarity_core::Error::AlreadyReviewed(proposal_id).into())
      }
    }
  }

  async fn create_flag(
    &self,
    term_id: Uuid,
    input:   NewFlag,
    actor:   Option<Uuid>,
  ) -> Result<TermFlag> {
    input.validate()?;

    let now = Utc::now();
    let flag = TermFlag {
      flag_id:     Uuid::new_v4(),
      term_id,
      flag_type:   input.flag_type,
      description: input.description,
      status:      FlagStatus::Open,
      flagged_by:  actor,
      resolved_by: None,
      resolved_at: None,
      created_at:  now,
      updated_at:  now,
    };

    let id_str      = encode_uuid(flag.flag_id);
    let term_id_str = encode_uuid(term_id);
    let kind        = flag.flag_type.as_str();
    let description = flag.description.clone();
    let status      = flag.status.as_str();
    let by_str      = actor.map(encode_uuid);
    let at_str      = encode_dt(now);

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !term_exists(&tx, &term_id_str)? {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO term_flags (
             flag_id, term_id, flag_type, description, status, flagged_by,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
          rusqlite::params![id_str, term_id_str, kind, description, status, by_str, at_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(clarity_core::Error::TermNotFound(term_id).into());
    }
    Ok(flag)
  }

  async fn get_flag(&self, flag_id: Uuid) -> Result<Option<TermFlag>> {
    let id_str = encode_uuid(flag_id);

    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {FLAG_COLUMNS} FROM term_flags WHERE flag_id = ?1"),
            rusqlite::params![id_str],
            RawFlag::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawFlag::into_flag).transpose()
  }

  async fn list_flags(&self, query: &FlagQuery) -> Result<Page<TermFlag>> {
    let term_id    = query.term_id.map(encode_uuid);
    let status     = query.status.map(|s| s.as_str());
    let limit_val  = query.limit as i64;
    let offset_val = query.offset as i64;

    const FILTER: &str = "(?1 IS NULL OR term_id = ?1) AND (?2 IS NULL OR status = ?2)";

    let (raws, total): (Vec<RawFlag>, i64) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row(
          &format!("SELECT COUNT(*) FROM term_flags WHERE {FILTER}"),
          rusqlite::params![term_id, status],
          |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {FLAG_COLUMNS} FROM term_flags
           WHERE {FILTER}
           ORDER BY created_at DESC, rowid DESC
           LIMIT ?3 OFFSET ?4"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![term_id, status, limit_val, offset_val],
            RawFlag::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((rows, total))
      })
      .await?;

    Ok(Page {
      data:   raws.into_iter().map(RawFlag::into_flag).collect::<Result<_>>()?,
      total:  total as u64,
      limit:  query.limit,
      offset: query.offset,
    })
  }

  async fn set_flag_status(
    &self,
    flag_id: Uuid,
    status:  FlagStatus,
    actor:   Option<Uuid>,
    at:      DateTime<Utc>,
  ) -> Result<TermFlag> {
    let id_str = encode_uuid(flag_id);

    let updated: Option<TermFlag> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let raw = tx
          .query_row(
            &format!("SELECT {FLAG_COLUMNS} FROM term_flags WHERE flag_id = ?1"),
            rusqlite::params![id_str],
            RawFlag::from_row,
          )
          .optional()?;
        let Some(raw) = raw else {
          return Ok(None);
        };
        let mut flag = raw.into_flag().map_err(other)?;
        flag.transition(status, actor, at);

        tx.execute(
          "UPDATE term_flags
           SET status = ?2, resolved_by = ?3, resolved_at = ?4, updated_at = ?5
           WHERE flag_id = ?1",
          rusqlite::params![
            id_str,
            flag.status.as_str(),
            flag.resolved_by.map(encode_uuid),
            flag.resolved_at.map(encode_dt),
            encode_dt(flag.updated_at),
          ],
        )?;

        tx.commit()?;
        Ok(Some(flag))
      })
      .await?;

    updated.ok_or(Error::Core(clarity_core::Error::FlagNotFound(flag_id)))
  }

  // ── Onboarding ────────────────────────────────────────────────────────────

  async fn create_onboarding_path(&self, input: NewOnboardingPath) -> Result<OnboardingPath> {
    input.validate()?;

    let path = OnboardingPath {
      path_id:     Uuid::new_v4(),
      role:        input.role,
      cluster:     input.cluster,
      term_ids:    input.term_ids,
      order_index: input.order_index,
      created_at:  Utc::now(),
    };

    let id_str   = encode_uuid(path.path_id);
    let role     = path.role.clone();
    let cluster  = path.cluster.clone();
    let term_ids = serde_json::to_string(&path.term_ids)?;
    let order    = path.order_index;
    let at_str   = encode_dt(path.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO onboarding_paths (path_id, role, cluster, term_ids, order_index, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, role, cluster, term_ids, order, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(path)
  }

  async fn onboarding_path(&self, query: &PathQuery) -> Result<Option<OnboardingPath>> {
    let role    = query.role.clone();
    let cluster = query.cluster.clone();

    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {PATH_COLUMNS} FROM onboarding_paths
               WHERE role = ?1 AND (?2 IS NULL OR cluster = ?2)
               ORDER BY order_index ASC, created_at ASC
               LIMIT 1"
            ),
            rusqlite::params![role, cluster],
            RawPath::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawPath::into_path).transpose()
  }

  async fn onboarding_progress(
    &self,
    user:  Uuid,
    query: &PathQuery,
  ) -> Result<OnboardingProgress> {
    let path = self.onboarding_path(query).await?;
    let path_terms: BTreeSet<Uuid> =
      path.iter().flat_map(|p| p.term_ids.iter().copied()).collect();
    let term_ids = serde_json::to_string(&path_terms)?;
    let user_str = encode_uuid(user);
    let viewed   = encode_action(UsageAction::Viewed);

    let (completed_at, viewed_count): (Option<String>, i64) = self
      .conn
      .call(move |conn| {
        let completed_at: Option<String> = conn
          .query_row(
            "SELECT completed_at FROM user_onboarding WHERE user_id = ?1",
            rusqlite::params![user_str],
            |r| r.get(0),
          )
          .optional()?;
        let viewed_count: i64 = conn.query_row(
          "SELECT COUNT(DISTINCT term_id) FROM term_usage_logs
           WHERE user_id = ?1 AND action = ?2
             AND term_id IN (SELECT value FROM json_each(?3))",
          rusqlite::params![user_str, viewed, term_ids],
          |r| r.get(0),
        )?;
        Ok((completed_at, viewed_count))
      })
      .await?;

    Ok(OnboardingProgress::new(
      completed_at.as_deref().map(decode_dt).transpose()?,
      path.map(|p| p.path_id),
      viewed_count as u64,
      path_terms.len() as u64,
    ))
  }

  async fn complete_onboarding(&self, user: Uuid, at: DateTime<Utc>) -> Result<()> {
    let user_str = encode_uuid(user);
    let at_str   = encode_dt(at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO user_onboarding (user_id, completed_at) VALUES (?1, ?2)
           ON CONFLICT (user_id) DO NOTHING",
          rusqlite::params![user_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Usage ─────────────────────────────────────────────────────────────────

  async fn log_usage(&self, event: UsageEvent) -> Result<()> {
    let term_id_str = encode_uuid(event.term_id);
    let cluster     = event.cluster;
    let user_str    = event.actor.map(encode_uuid);
    let action      = encode_action(event.action);
    let at_str      = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO term_usage_logs (term_id, cluster, user_id, action, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![term_id_str, cluster, user_str, action, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn view_count(&self, term_id: Uuid) -> Result<u64> {
    let id_str = encode_uuid(term_id);
    let viewed = encode_action(UsageAction::Viewed);

    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM term_usage_logs WHERE term_id = ?1 AND action = ?2",
          rusqlite::params![id_str, viewed],
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(n as u64)
  }

  async fn recently_viewed(&self, actor: Uuid, limit: usize) -> Result<Vec<RecentTerm>> {
    let user_str  = encode_uuid(actor);
    let viewed    = encode_action(UsageAction::Viewed);
    let limit_val = limit as i64;

    let rows: Vec<(String, String, String, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT t.term_id, t.term, t.base_definition, MAX(u.created_at) AS last_viewed
           FROM term_usage_logs u
           JOIN terms t ON t.term_id = u.term_id
           WHERE u.user_id = ?1 AND u.action = ?2
           GROUP BY t.term_id
           ORDER BY last_viewed DESC
           LIMIT ?3",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str, viewed, limit_val], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(id, term, base_definition, last_viewed)| {
        Ok(RecentTerm {
          term_id: decode_uuid(&id)?,
          term,
          base_definition,
          last_viewed: decode_dt(&last_viewed)?,
        })
      })
      .collect()
  }

  // ── Search ────────────────────────────────────────────────────────────────

  async fn search_terms(&self, query: &SearchQuery) -> Result<Page<Term>> {
    let limit  = query.limit.unwrap_or(20);
    let offset = query.offset.unwrap_or(0);
    let Some(fts) = fts_query(&query.text) else {
      return Ok(Page { data: Vec::new(), total: 0, limit, offset });
    };
    let limit_val  = limit as i64;
    let offset_val = offset as i64;

    const MATCH: &str =
      "t.term_id IN (SELECT term_id FROM terms_fts WHERE terms_fts MATCH ?1)";

    let (raws, total): (Vec<RawTerm>, i64) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row(
          &format!("SELECT COUNT(*) FROM terms t WHERE {MATCH}"),
          rusqlite::params![fts],
          |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {TERM_COLUMNS} FROM terms t
           WHERE {MATCH}
           ORDER BY t.term ASC, t.term_id ASC
           LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![fts, limit_val, offset_val],
            RawTerm::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((rows, total))
      })
      .await?;

    Ok(Page {
      data: raws.into_iter().map(RawTerm::into_term).collect::<Result<_>>()?,
      total: total as u64,
      limit,
      offset,
    })
  }
}
