//! Storage abstraction for the course catalog.
//!
//! The [`CourseStore`] trait is the seam between the pure search pipeline
//! and a concrete backend. It takes planned queries, never raw user input,
//! so every implementation sees the same already-validated filters.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`count_courses`](CourseStore::count_courses) | Number of rows matching a filter |
//! | [`fetch_courses`](CourseStore::fetch_courses) | One sorted page of course cards |
//! | [`list_filter_categories`](CourseStore::list_filter_categories) | Topics offered as filter options |

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{CategoryOption, CourseCard};
use crate::plan::{CountQuery, PageQuery};

/// Read-side backend for course search and listing.
///
/// The count and page queries of one request are issued concurrently and
/// may run on separate connections; stores should not rely on them sharing
/// a snapshot.
#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Count courses matching the query's filter.
    async fn count_courses(&self, query: &CountQuery) -> Result<i64>;

    /// Fetch the page of courses the query describes, in its ordering.
    async fn fetch_courses(&self, query: &PageQuery) -> Result<Vec<CourseCard>>;

    /// All level-2 topics, ordered by id.
    async fn list_filter_categories(&self) -> Result<Vec<CategoryOption>>;
}
