//! A full gap-detection pass over the glossary.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
  gap::{GapFinding, classify_term},
  store::GlossaryStore,
  term::{TermCursor, TermQuery},
};

/// Outcome of [`GapDetector::run`].
///
/// A run never fails because of a single term or a single write; those are
/// counted here instead.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DetectionRun {
  /// Findings that were stored. Those whose write failed are only counted.
  pub findings:      Vec<GapFinding>,
  pub terms_scanned: usize,
  /// Terms whose contexts could not be loaded.
  pub terms_skipped: usize,
  pub failed_writes: usize,
}

/// Scans every term in a store and persists the gaps it finds.
pub struct GapDetector<'a, S> {
  store:     &'a S,
  page_size: usize,
}

impl<'a, S: GlossaryStore> GapDetector<'a, S> {
  pub fn new(store: &'a S) -> Self { Self { store, page_size: 100 } }

  /// Number of terms requested from the store at a time.
  pub fn with_page_size(mut self, page_size: usize) -> Self {
    self.page_size = page_size.max(1);
    self
  }

  /// Run every check against every term, stamping findings with `now`.
  ///
  /// Only a failure to read the cluster universe or the term list aborts the
  /// run. Findings are not de-duplicated against earlier runs.
  pub async fn run(&self, now: DateTime<Utc>) -> Result<DetectionRun, S::Error> {
    let mut run = DetectionRun::default();

    let universe = self.store.all_known_clusters().await?;
    if universe.is_empty() {
      info!("no clusters known; skipping gap detection");
      return Ok(run);
    }

    let mut query = TermQuery { limit: self.page_size, ..TermQuery::default() };
    loop {
      let page = self.store.list_terms(&query).await?;
      let fetched = page.data.len();
      // Keyset paging: deleting a term mid-run does not shift later pages.
      query.after = page.data.last().map(TermCursor::from);

      for term in page.data {
        run.terms_scanned += 1;

        let contexts = match self.store.get_contexts(term.term_id).await {
          Ok(contexts) => contexts,
          Err(e) => {
            warn!(term_id = %term.term_id, error = %e, "skipping term: failed to load contexts");
            run.terms_skipped += 1;
            continue;
          }
        };

        for finding in classify_term(term.term_id, &contexts, &universe, now) {
          match self.store.record_gap(&finding).await {
            Ok(()) => run.findings.push(finding),
            Err(e) => {
              warn!(
                term_id = %term.term_id,
                gap_type = finding.gap_type.as_str(),
                error = %e,
                "failed to store gap finding"
              );
              run.failed_writes += 1;
            }
          }
        }
      }

      if fetched < query.limit {
        break;
      }
      debug!(after = ?query.after, total = page.total, "fetching next page of terms");
    }

    info!(
      clusters = universe.len(),
      terms = run.terms_scanned,
      findings = run.findings.len(),
      skipped = run.terms_skipped,
      failed_writes = run.failed_writes,
      "gap detection finished"
    );
    Ok(run)
  }
}
