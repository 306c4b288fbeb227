//! Fire-and-forget usage logging, plus the `/usage` and `/terms/{id}/views`
//! handlers that read it back.
//!
//! Handlers never wait on a usage write. [`UsageRecorder::record`] pushes the
//! event onto a bounded channel and returns; a detached task drains the
//! channel into the store. A full channel drops the event.

use std::sync::{
  Arc,
  atomic::{AtomicU64, Ordering},
};

use axum::{
  Json,
  extract::{Path, Query, State},
};
use clarity_core::{store::GlossaryStore, usage::{RecentTerm, UsageEvent}};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::{AppState, actor::Actor, error::ApiError};

/// Events buffered before new ones are dropped.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

// ─── Recorder ────────────────────────────────────────────────────────────────

/// Sender half of the usage pipeline. Cheap to clone.
#[derive(Clone)]
pub struct UsageRecorder {
  sender:  mpsc::Sender<UsageEvent>,
  dropped: Arc<AtomicU64>,
}

impl UsageRecorder {
  /// A recorder and the receiver its events arrive on.
  pub fn channel(size: usize) -> (Self, mpsc::Receiver<UsageEvent>) {
    let (sender, receiver) = mpsc::channel(size);
    (Self { sender, dropped: Arc::default() }, receiver)
  }

  /// Start a detached task that writes every recorded event to `store`.
  ///
  /// The task ends once every clone of the returned recorder is dropped.
  /// Must be called from within a tokio runtime.
  pub fn spawn<S>(store: Arc<S>) -> Self
  where
    S: GlossaryStore + 'static,
  {
    let (recorder, receiver) = Self::channel(DEFAULT_BUFFER_SIZE);
    tokio::spawn(drain(store, receiver));
    recorder
  }

  /// Queue an event. Never blocks and never fails.
  pub fn record(&self, event: UsageEvent) {
    if self.sender.try_send(event).is_err() {
      self.dropped.fetch_add(1, Ordering::Relaxed);
    }
  }

  /// Events discarded because the buffer was full or the drain had stopped.
  pub fn dropped(&self) -> u64 { self.dropped.load(Ordering::Relaxed) }
}

/// Write events to `store` until the channel closes. Failures are logged
/// and discarded.
pub async fn drain<S>(store: Arc<S>, mut receiver: mpsc::Receiver<UsageEvent>)
where
  S: GlossaryStore,
{
  while let Some(event) = receiver.recv().await {
    let term_id = event.term_id;
    if let Err(e) = store.log_usage(event).await {
      debug!(%term_id, error = %e, "dropping usage event");
    }
  }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ViewCount {
  pub term_id:    Uuid,
  pub view_count: u64,
}

/// `GET /terms/{id}/views`
pub async fn view_count<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ViewCount>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let view_count = state.store.view_count(id).await.map_err(ApiError::store)?;
  Ok(Json(ViewCount { term_id: id, view_count }))
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
  pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecentList {
  pub data: Vec<RecentTerm>,
}

/// `GET /usage/recently-viewed[?limit=10]`
pub async fn recently_viewed<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Query(params): Query<RecentParams>,
) -> Result<Json<RecentList>, ApiError>
where
  S: GlossaryStore + 'static,
{
  let Some(actor) = actor else {
    return Ok(Json(RecentList { data: vec![] }));
  };
  let data = state
    .store
    .recently_viewed(actor, params.limit.unwrap_or(10))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(RecentList { data }))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn record_never_blocks_when_full() {
    let (recorder, mut receiver) = UsageRecorder::channel(2);
    for _ in 0..5 {
      recorder.record(UsageEvent::viewed(Uuid::new_v4(), None, None));
    }
    assert_eq!(recorder.dropped(), 3);
    assert!(receiver.recv().await.is_some());
  }

  #[tokio::test]
  async fn record_after_drain_stops_is_dropped() {
    let (recorder, receiver) = UsageRecorder::channel(4);
    drop(receiver);
    recorder.record(UsageEvent::viewed(Uuid::new_v4(), None, None));
    assert_eq!(recorder.dropped(), 1);
  }
}
