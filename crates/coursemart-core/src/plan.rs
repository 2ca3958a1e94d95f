//! Query planner: canonical queries → immutable predicate/ordering plans.
//!
//! The planner performs no I/O. It emits a [`PlannedQuery`] holding two
//! independent values over the same [`Filter`]: a [`CountQuery`] and a
//! [`PageQuery`]. Store implementations render these however they like
//! (SQL for SQLite, closures for the in-memory store); every predicate in a
//! filter is combined with AND.
//!
//! The base relation is always courses joined with their instructor and
//! level-2 category for display names.

use crate::normalize::{ListingQuery, SearchQuery, SortBy, SortOrder};
use crate::websearch::{fold_text, WebSearch};

/// One boolean condition on a course row.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `is_active = true`.
    ActiveOnly,
    /// Full-text match against the folded title/description index.
    FullText(WebSearch),
    /// Level-2 topic equality.
    CategoryIs(i64),
    /// Topic belongs to this level-1 domain.
    DomainIs(i64),
    LevelIs(String),
    /// Title substring, compared on accent- and case-folded text. Holds the
    /// folded needle.
    TitleContains(String),
    /// List price lower bound, inclusive.
    PriceAtLeast(f64),
    /// List price upper bound, inclusive.
    PriceAtMost(f64),
    RatingAtLeast(f64),
    OnSale,
}

/// Conjunction of predicates. Built once by the planner, then read-only.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_active_only(&self) -> bool {
        self.predicates.contains(&Predicate::ActiveOnly)
    }
}

/// Course column a result set can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Rating,
    /// The sale price when one is set, otherwise the list price.
    CurrentPrice,
    LatestUpdate,
    TotalEnrollment,
}

impl SortColumn {
    pub const fn column_name(self) -> &'static str {
        match self {
            Self::Rating => "rating",
            Self::CurrentPrice => "current_price",
            Self::LatestUpdate => "latest_update",
            Self::TotalEnrollment => "total_enrollment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering {
    pub column: SortColumn,
    pub direction: SortOrder,
}

/// Resolve a canonical sort pair to an ordering clause.
///
/// `Newest` and `Popular` are always descending. `Relevance` has no clause:
/// rows come back in the store's natural order, and ties between equally
/// relevant rows are unspecified.
pub fn ordering_for(sort_by: SortBy, sort_order: SortOrder) -> Option<Ordering> {
    let (column, direction) = match sort_by {
        SortBy::Relevance => return None,
        SortBy::Rating => (SortColumn::Rating, sort_order),
        SortBy::Price => (SortColumn::CurrentPrice, sort_order),
        SortBy::Newest => (SortColumn::LatestUpdate, SortOrder::Desc),
        SortBy::Popular => (SortColumn::TotalEnrollment, SortOrder::Desc),
    };
    Some(Ordering { column, direction })
}

/// Counts rows matching a filter.
#[derive(Debug, Clone, PartialEq)]
pub struct CountQuery {
    pub filter: Filter,
}

/// Fetches one sorted page of rows matching a filter.
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub filter: Filter,
    pub ordering: Option<Ordering>,
    pub limit: i64,
    pub offset: i64,
}

/// Output of the planner.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedQuery {
    pub count: CountQuery,
    pub page: PageQuery,
    /// 1-based page number the page query targets.
    pub page_number: u32,
    pub page_size: u32,
}

impl PlannedQuery {
    fn new(filter: Filter, ordering: Option<Ordering>, page: u32, page_size: u32) -> Self {
        let page = page.max(1);
        let page_size = page_size.max(1);
        Self {
            count: CountQuery {
                filter: filter.clone(),
            },
            page: PageQuery {
                filter,
                ordering,
                limit: i64::from(page_size),
                offset: (i64::from(page) - 1) * i64::from(page_size),
            },
            page_number: page,
            page_size,
        }
    }
}

/// Plan the public keyword search. Always restricted to active courses.
pub fn plan_search(query: &SearchQuery) -> PlannedQuery {
    let mut predicates = vec![Predicate::ActiveOnly];

    if !query.keyword.is_empty() {
        predicates.push(Predicate::FullText(WebSearch::parse(&query.plain_keyword())));
    }
    if let Some(category) = query.category {
        predicates.push(Predicate::CategoryIs(category));
    }

    PlannedQuery::new(
        Filter { predicates },
        ordering_for(query.sort_by, query.sort_order),
        query.page,
        query.page_size,
    )
}

/// Plan the browse listing, where active-only is a deployment choice.
pub fn plan_listing(query: &ListingQuery) -> PlannedQuery {
    let f = &query.filters;
    let mut predicates = Vec::new();

    if query.active_only {
        predicates.push(Predicate::ActiveOnly);
    }
    if let Some(category) = f.category {
        predicates.push(Predicate::CategoryIs(category));
    }
    if let Some(domain) = f.domain {
        predicates.push(Predicate::DomainIs(domain));
    }
    if let Some(level) = &f.level {
        predicates.push(Predicate::LevelIs(level.clone()));
    }
    if let Some(title) = &f.title {
        let plain = html_escape::decode_html_entities(title);
        predicates.push(Predicate::TitleContains(fold_text(&plain)));
    }
    if let Some(min) = f.price_min {
        predicates.push(Predicate::PriceAtLeast(min));
    }
    if let Some(max) = f.price_max {
        predicates.push(Predicate::PriceAtMost(max));
    }
    if let Some(rating) = f.min_rating {
        predicates.push(Predicate::RatingAtLeast(rating));
    }
    if f.on_sale {
        predicates.push(Predicate::OnSale);
    }

    PlannedQuery::new(
        Filter { predicates },
        ordering_for(query.sort_by, query.sort_order),
        query.page,
        query.page_size,
    )
}
