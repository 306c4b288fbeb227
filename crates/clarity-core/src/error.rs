//! Error types for `clarity-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("term not found: {0}")]
  TermNotFound(Uuid),

  #[error("version not found: {0}")]
  VersionNotFound(Uuid),

  #[error("gap not found: {0}")]
  GapNotFound(Uuid),

  #[error("gap {0} is already resolved")]
  AlreadyResolved(Uuid),

  #[error("cluster already exists: {0:?}")]
  ClusterExists(String),

  #[error("proposal not found: {0}")]
  ProposalNotFound(Uuid),

  #[error("proposal {0} has already been reviewed")]
  AlreadyReviewed(Uuid),

  #[error("flag not found: {0}")]
  FlagNotFound(Uuid),

  #[error("relationship already exists")]
  RelationshipExists,

  #[error("onboarding path not found")]
  PathNotFound,

  #[error("validation error: {0}")]
  Validation(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Classification ──────────────────────────────────────────────────────────

/// Coarse category of a failure, used by transport layers to pick a status
/// code without knowing which backend produced the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// An id is unknown, or not owned by the expected parent.
  NotFound,
  /// The caller supplied malformed or missing input.
  Validation,
  /// The request conflicts with current state (duplicate, already resolved).
  Conflict,
  /// The underlying store failed.
  Storage,
}

/// Implemented by every store error type so callers can branch on
/// [`ErrorKind`].
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::TermNotFound(_)
      | Self::VersionNotFound(_)
      | Self::GapNotFound(_)
      | Self::ProposalNotFound(_)
      | Self::FlagNotFound(_)
      | Self::PathNotFound => ErrorKind::NotFound,
      Self::AlreadyResolved(_)
      | Self::ClusterExists(_)
      | Self::AlreadyReviewed(_)
      | Self::RelationshipExists => ErrorKind::Conflict,
      Self::Validation(_) => ErrorKind::Validation,
      Self::Serialization(_) => ErrorKind::Storage,
    }
  }
}
