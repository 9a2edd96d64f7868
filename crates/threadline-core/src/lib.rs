//! # Threadline Core
//!
//! Shared, I/O-free logic for Threadline: article and comment models,
//! identifier generation, input validation, the store abstraction, and
//! the thread builder that turns flat parent-pointer comments into
//! nested reply trees.
//!
//! This crate contains no tokio, sqlx, or filesystem dependencies. The
//! SQLite-backed store lives in the `threadline` application crate; an
//! in-memory store ships here for tests and embedding.

pub mod error;
pub mod id;
pub mod models;
pub mod store;
pub mod thread;
pub mod validate;

pub use error::{Error, Result};
