//! The acting-user extractor.
//!
//! Mutations are attributed to the UUID in the `X-Actor-Id` header. Requests
//! without the header fall back to the server's configured default actor.

use axum::{extract::FromRequestParts, http::request::Parts};
use clarity_core::store::GlossaryStore;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

pub const ACTOR_HEADER: &str = "x-actor-id";

/// The user a request acts as, if known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub Option<Uuid>);

impl Actor {
  /// Read the actor from `parts`, using `default` when the header is absent.
  pub fn from_parts(parts: &Parts, default: Option<Uuid>) -> Result<Self, ApiError> {
    let Some(value) = parts.headers.get(ACTOR_HEADER) else {
      return Ok(Actor(default));
    };
    let id = value
      .to_str()
      .ok()
      .and_then(|s| Uuid::parse_str(s.trim()).ok())
      .ok_or_else(|| ApiError::BadRequest(format!("invalid {ACTOR_HEADER} header")))?;
    Ok(Actor(Some(id)))
  }
}

impl<S> FromRequestParts<AppState<S>> for Actor
where
  S: GlossaryStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    Actor::from_parts(parts, state.default_actor)
  }
}

#[cfg(test)]
mod tests {
  use axum::{body::Body, http::Request};

  use super::*;

  fn parts(header: Option<&str>) -> Parts {
    let mut builder = Request::builder();
    if let Some(h) = header {
      builder = builder.header(ACTOR_HEADER, h);
    }
    builder.body(Body::empty()).unwrap().into_parts().0
  }

  #[test]
  fn header_wins_over_default() {
    let id = Uuid::new_v4();
    let actor = Actor::from_parts(&parts(Some(&id.to_string())), Some(Uuid::nil())).unwrap();
    assert_eq!(actor, Actor(Some(id)));
  }

  #[test]
  fn missing_header_uses_default() {
    let default = Uuid::new_v4();
    assert_eq!(Actor::from_parts(&parts(None), Some(default)).unwrap(), Actor(Some(default)));
    assert_eq!(Actor::from_parts(&parts(None), None).unwrap(), Actor(None));
  }

  #[test]
  fn malformed_header_is_rejected() {
    let err = Actor::from_parts(&parts(Some("not-a-uuid")), None).unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
  }
}
