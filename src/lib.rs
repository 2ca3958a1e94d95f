//! # Coursemart
//!
//! SQLite-backed course catalog with keyword search, filtered browsing,
//! course detail pages, and course administration, exposed through a CLI
//! and a JSON HTTP API.
//!
//! The search pipeline itself (normalizer, planner, paginator) lives in
//! [`coursemart_core`]; this crate supplies the SQLite store, the schema,
//! catalog import, and the two front-ends.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌────────────────┐
//! │ catalog.json │──▶│ import            │──▶│ SQLite          │
//! └──────────────┘   └──────────────────┘   │ courses + FTS5  │
//!                                            └───────┬────────┘
//!                          coursemart_core::search   │ SqliteStore
//!                      ┌─────────────────────────────┤
//!                      ▼                             ▼
//!                 ┌──────────┐                 ┌──────────┐
//!                 │   CLI    │                 │   HTTP   │
//!                 └──────────┘                 └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! coursemart init
//! coursemart import ./catalog.json
//! coursemart search "python -django" --sort-by rating
//! coursemart serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | `CourseStore` over SQLite/FTS5 |
//! | [`search`] | Search, listing and category commands |
//! | [`course`] | Course detail |
//! | [`admin`] | Delete, lock/unlock, admin list |
//! | [`import`] | JSON catalog import |
//! | [`server`] | HTTP API |

pub mod admin;
pub mod config;
pub mod course;
pub mod db;
pub mod import;
pub mod migrate;
pub mod search;
pub mod server;
pub mod sqlite_store;
