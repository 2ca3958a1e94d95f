//! Search entry points: normalize → plan → paginate, with fail-soft store errors.
//!
//! Validation errors are returned before the store is touched. Store errors
//! never escape: they become a [`SearchOutcome::Degraded`] holding an empty
//! envelope and the underlying cause, which the caller is expected to log.

use crate::error::QueryError;
use crate::normalize::{
    normalize, normalize_listing, ListingQuery, RawListingParams, RawSearchParams, SearchQuery,
};
use crate::paginate::{paginate, SearchResult};
use crate::plan::{plan_listing, plan_search, PlannedQuery};
use crate::store::CourseStore;

/// Message shown to users when a search degraded.
pub const DEGRADED_MESSAGE: &str = "Search is temporarily unavailable. Please try again later.";

/// Result of running a planned query against a store.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Complete(SearchResult),
    /// The store failed; `result` is the empty envelope for the requested page.
    Degraded { result: SearchResult, cause: String },
}

impl SearchOutcome {
    pub fn result(&self) -> &SearchResult {
        match self {
            Self::Complete(result) | Self::Degraded { result, .. } => result,
        }
    }

    pub fn into_result(self) -> SearchResult {
        match self {
            Self::Complete(result) | Self::Degraded { result, .. } => result,
        }
    }

    /// Internal failure description, for logs only.
    pub fn cause(&self) -> Option<&str> {
        match self {
            Self::Complete(_) => None,
            Self::Degraded { cause, .. } => Some(cause),
        }
    }

    /// User-facing error indicator.
    pub fn error_message(&self) -> Option<&'static str> {
        self.cause().map(|_| DEGRADED_MESSAGE)
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// A search outcome together with the canonical query it answered, so the
/// presentation layer can echo keyword, category and sort.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage<Q> {
    pub query: Q,
    pub outcome: SearchOutcome,
}

async fn execute<S>(store: &S, plan: &PlannedQuery) -> SearchOutcome
where
    S: CourseStore + ?Sized,
{
    match paginate(store, plan).await {
        Ok(result) => SearchOutcome::Complete(result),
        Err(e) => SearchOutcome::Degraded {
            result: SearchResult::empty(plan.page_number, plan.page_size),
            cause: format!("{:#}", e),
        },
    }
}

/// Public keyword search over active courses.
pub async fn search_courses<S>(
    store: &S,
    raw: &RawSearchParams,
) -> Result<SearchPage<SearchQuery>, QueryError>
where
    S: CourseStore + ?Sized,
{
    let query = normalize(raw)?;
    let plan = plan_search(&query);
    let outcome = execute(store, &plan).await;
    Ok(SearchPage { query, outcome })
}

/// Filtered browse listing.
pub async fn list_courses<S>(
    store: &S,
    raw: &RawListingParams,
    page_size: u32,
    active_only: bool,
) -> Result<SearchPage<ListingQuery>, QueryError>
where
    S: CourseStore + ?Sized,
{
    let query = normalize_listing(raw, page_size, active_only)?;
    let plan = plan_listing(&query);
    let outcome = execute(store, &plan).await;
    Ok(SearchPage { query, outcome })
}
