//! # Threadline
//!
//! Articles with arbitrarily deep reader comment threads, served from a
//! local SQLite store over a JSON HTTP API and a CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────┐
//! │  Seed docs  │──▶│    Store    │──▶│  SQLite  │
//! │ articles/*  │   │  (validate) │   │          │
//! └─────────────┘   └──────┬──────┘   └──────────┘
//!                          │ flat comments
//!                          ▼
//!                   ┌─────────────┐
//!                   │Thread build │
//!                   └──────┬──────┘
//!                  ┌───────┴───────┐
//!                  ▼               ▼
//!             ┌──────────┐   ┌──────────┐
//!             │   CLI    │   │   HTTP   │
//!             └──────────┘   └──────────┘
//! ```
//!
//! Models, validation, the [`Store`](threadline_core::store::Store) trait
//! and the thread builder live in [`threadline_core`]; this crate adds the
//! SQLite backend, configuration, seeding, and the two front ends.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | SQLite-backed store |
//! | [`seed`] | Article documents and first-run seeding |
//! | [`articles`] | Comment views and CLI commands |
//! | [`stats`] | Database statistics |
//! | [`server`] | HTTP API server |

pub mod articles;
pub mod config;
pub mod db;
pub mod migrate;
pub mod seed;
pub mod server;
pub mod sqlite_store;
pub mod stats;

pub use threadline_core;
