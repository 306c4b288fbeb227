//! Core types and trait definitions for the Clarity glossary backend.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the domain model, the snapshot document used for term history, the pure
//! gap-classification logic, and the [`store::GlossaryStore`] abstraction
//! that backends implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod cluster;
pub mod detect;
pub mod error;
pub mod gap;
pub mod governance;
pub mod onboarding;
pub mod relationship;
pub mod snapshot;
pub mod store;
pub mod term;
pub mod usage;
pub mod version;

pub use error::{Error, Result};
