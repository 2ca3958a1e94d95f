//! # Coursemart Core
//!
//! Storage-agnostic logic for the Coursemart course catalog: data models,
//! the search pipeline (normalizer → planner → paginator), the web-search
//! keyword syntax, and the [`store::CourseStore`] abstraction.
//!
//! This crate contains no tokio, sqlx, or HTTP dependencies. Executing a
//! search only needs some implementation of [`store::CourseStore`]; the
//! application crate provides the SQLite one and [`store::memory`] provides
//! an in-memory one for tests.
//!
//! ```text
//! raw params ──▶ normalize ──▶ SearchQuery ──▶ plan ──▶ PlannedQuery
//!                                                          │
//!                        SearchResult ◀── paginate ◀── CourseStore
//! ```

pub mod error;
pub mod models;
pub mod normalize;
pub mod paginate;
pub mod plan;
pub mod search;
pub mod store;
pub mod websearch;
