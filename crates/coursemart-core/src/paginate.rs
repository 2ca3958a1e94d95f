//! Paginator: executes a planned query and builds the result envelope.

use anyhow::Result;
use serde::Serialize;

use crate::models::CourseCard;
use crate::plan::PlannedQuery;
use crate::store::CourseStore;

/// `max(1, ceil(total_count / page_size))`.
///
/// A negative count is treated as zero and a zero page size as one.
pub fn total_pages(total_count: i64, page_size: u32) -> u32 {
    let count = total_count.max(0) as u64;
    let size = u64::from(page_size.max(1));
    let pages = count.div_ceil(size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// One entry in the page-navigation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub value: u32,
    pub is_current: bool,
}

fn page_links(total_pages: u32, current_page: u32) -> Vec<PageLink> {
    (1..=total_pages)
        .map(|value| PageLink {
            value,
            is_current: value == current_page,
        })
        .collect()
}

/// A page of courses plus navigation metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub items: Vec<CourseCard>,
    pub total_count: i64,
    pub total_pages: u32,
    pub current_page: u32,
    pub page_size: u32,
    /// Exactly `total_pages` entries, `1..=total_pages`.
    pub pages: Vec<PageLink>,
    pub has_prev: bool,
    pub has_next: bool,
}

impl SearchResult {
    /// Build the envelope around an already fetched page.
    ///
    /// `current_page` is echoed as requested even when it lies past
    /// `total_pages`; no clamping happens here.
    pub fn new(items: Vec<CourseCard>, total_count: i64, current_page: u32, page_size: u32) -> Self {
        let total_pages = total_pages(total_count, page_size);
        Self {
            items,
            total_count: total_count.max(0),
            total_pages,
            current_page,
            page_size,
            pages: page_links(total_pages, current_page),
            has_prev: current_page > 1,
            has_next: current_page < total_pages,
        }
    }

    /// The zero-row envelope used when the store could not be reached.
    pub fn empty(current_page: u32, page_size: u32) -> Self {
        Self::new(Vec::new(), 0, current_page, page_size)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Run the count and page queries concurrently and assemble the result.
///
/// Any store error fails the whole call; callers decide how to degrade.
pub async fn paginate<S>(store: &S, plan: &PlannedQuery) -> Result<SearchResult>
where
    S: CourseStore + ?Sized,
{
    let (total_count, items) = futures::try_join!(
        store.count_courses(&plan.count),
        store.fetch_courses(&plan.page),
    )?;

    Ok(SearchResult::new(
        items,
        total_count,
        plan.page_number,
        plan.page_size,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 6), 1);
        assert_eq!(total_pages(1, 6), 1);
        assert_eq!(total_pages(6, 6), 1);
        assert_eq!(total_pages(7, 6), 2);
        assert_eq!(total_pages(14, 6), 3);
        assert_eq!(total_pages(-3, 6), 1);
        assert_eq!(total_pages(5, 0), 5);
    }

    #[test]
    fn test_page_links_mark_current() {
        let result = SearchResult::new(Vec::new(), 14, 2, 6);
        let values: Vec<u32> = result.pages.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1, 2, 3]);
        let current: Vec<u32> = result
            .pages
            .iter()
            .filter(|p| p.is_current)
            .map(|p| p.value)
            .collect();
        assert_eq!(current, vec![2]);
        assert!(result.has_prev);
        assert!(result.has_next);
    }

    #[test]
    fn test_out_of_range_page_is_not_clamped() {
        let result = SearchResult::new(Vec::new(), 14, 99, 6);
        assert_eq!(result.current_page, 99);
        assert_eq!(result.total_pages, 3);
        assert!(result.pages.iter().all(|p| !p.is_current));
        assert!(result.has_prev);
        assert!(!result.has_next);
    }

    #[test]
    fn test_empty_envelope() {
        let result = SearchResult::empty(1, 6);
        assert!(result.is_empty());
        assert_eq!(result.total_count, 0);
        assert_eq!(result.total_pages, 1);
        assert_eq!(result.pages.len(), 1);
        assert!(!result.has_prev);
        assert!(!result.has_next);
    }
}
