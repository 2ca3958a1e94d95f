//! In-memory [`CourseStore`] implementation for tests and embedding.
//!
//! Rows live in `Vec`s behind `std::sync::RwLock`. Predicates are evaluated
//! row by row; full-text matching tokenizes the title and the description
//! the same way the SQLite index does. Without an ordering, rows come back
//! in insertion order.

use std::cmp::Ordering as CmpOrdering;
use std::sync::{PoisonError, RwLock};

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{CategoryOption, Course, CourseCard, Instructor, Topic};
use crate::normalize::SortOrder;
use crate::plan::{CountQuery, Filter, Ordering, PageQuery, Predicate, SortColumn};
use crate::websearch::{fold_text, tokenize};

use super::CourseStore;

/// In-memory catalog. Topics carry their domain id, so domains themselves
/// are not stored.
#[derive(Default)]
pub struct InMemoryStore {
    topics: RwLock<Vec<Topic>>,
    instructors: RwLock<Vec<Instructor>>,
    courses: RwLock<Vec<Course>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_topic(&self, topic: Topic) {
        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);
        topics.retain(|t| t.id != topic.id);
        topics.push(topic);
    }

    pub fn insert_instructor(&self, instructor: Instructor) {
        let mut instructors = self
            .instructors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        instructors.retain(|i| i.id != instructor.id);
        instructors.push(instructor);
    }

    /// Insert a course, replacing any existing course with the same id in place.
    pub fn insert_course(&self, course: Course) {
        let mut courses = self.courses.write().unwrap_or_else(PoisonError::into_inner);
        match courses.iter_mut().find(|c| c.id == course.id) {
            Some(existing) => *existing = course,
            None => courses.push(course),
        }
    }
}

/// Per-request view over the catalog used to evaluate a [`Filter`].
struct Catalog<'a> {
    topics: &'a [Topic],
    instructors: &'a [Instructor],
}

impl Catalog<'_> {
    fn topic(&self, id: i64) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == id)
    }

    fn instructor_name(&self, id: i64) -> Option<String> {
        self.instructors
            .iter()
            .find(|i| i.id == id)
            .map(|i| i.name.clone())
    }

    fn matches(&self, course: &Course, filter: &Filter) -> bool {
        filter.predicates().iter().all(|p| self.eval(course, p))
    }

    fn eval(&self, course: &Course, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::ActiveOnly => course.is_active,
            Predicate::FullText(ws) => {
                let title = tokenize(&course.title);
                let description = tokenize(&format!(
                    "{} {}",
                    course.short_description, course.full_description
                ));
                ws.matches_fields(&[title.as_slice(), description.as_slice()])
            }
            Predicate::CategoryIs(id) => course.category_id == *id,
            Predicate::DomainIs(id) => self
                .topic(course.category_id)
                .is_some_and(|t| t.domain_id == *id),
            Predicate::LevelIs(level) => course
                .level
                .as_deref()
                .is_some_and(|l| l.eq_ignore_ascii_case(level)),
            Predicate::TitleContains(needle) => fold_text(&course.title).contains(needle.as_str()),
            Predicate::PriceAtLeast(min) => course.price >= *min,
            Predicate::PriceAtMost(max) => course.price <= *max,
            Predicate::RatingAtLeast(min) => course.rating >= *min,
            Predicate::OnSale => course.is_onsale,
        }
    }

    fn card(&self, course: &Course) -> CourseCard {
        CourseCard::from_course(
            course,
            self.instructor_name(course.instructor_id),
            self.topic(course.category_id).map(|t| t.name.clone()),
        )
    }
}

fn compare(a: &Course, b: &Course, ordering: Ordering) -> CmpOrdering {
    let ord = match ordering.column {
        SortColumn::Rating => a.rating.partial_cmp(&b.rating),
        SortColumn::CurrentPrice => {
            let price = |c: &Course| c.current_price.unwrap_or(c.price);
            price(a).partial_cmp(&price(b))
        }
        SortColumn::LatestUpdate => Some(a.latest_update.cmp(&b.latest_update)),
        SortColumn::TotalEnrollment => Some(a.total_enrollment.cmp(&b.total_enrollment)),
    }
    .unwrap_or(CmpOrdering::Equal);

    match ordering.direction {
        SortOrder::Asc => ord,
        SortOrder::Desc => ord.reverse(),
    }
}

#[async_trait]
impl CourseStore for InMemoryStore {
    async fn count_courses(&self, query: &CountQuery) -> Result<i64> {
        let topics = self.topics.read().unwrap_or_else(PoisonError::into_inner);
        let instructors = self.instructors.read().unwrap_or_else(PoisonError::into_inner);
        let courses = self.courses.read().unwrap_or_else(PoisonError::into_inner);
        let catalog = Catalog {
            topics: &topics,
            instructors: &instructors,
        };
        let n = courses
            .iter()
            .filter(|c| catalog.matches(c, &query.filter))
            .count();
        Ok(n as i64)
    }

    async fn fetch_courses(&self, query: &PageQuery) -> Result<Vec<CourseCard>> {
        let topics = self.topics.read().unwrap_or_else(PoisonError::into_inner);
        let instructors = self.instructors.read().unwrap_or_else(PoisonError::into_inner);
        let courses = self.courses.read().unwrap_or_else(PoisonError::into_inner);
        let catalog = Catalog {
            topics: &topics,
            instructors: &instructors,
        };

        let mut hits: Vec<&Course> = courses
            .iter()
            .filter(|c| catalog.matches(c, &query.filter))
            .collect();
        if let Some(ordering) = query.ordering {
            // sort_by is stable: equal keys keep insertion order.
            hits.sort_by(|a, b| compare(a, b, ordering));
        }

        Ok(hits
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .map(|c| catalog.card(c))
            .collect())
    }

    async fn list_filter_categories(&self) -> Result<Vec<CategoryOption>> {
        let topics = self.topics.read().unwrap_or_else(PoisonError::into_inner);
        let mut options: Vec<CategoryOption> = topics
            .iter()
            .map(|t| CategoryOption {
                id: t.id,
                name: t.name.clone(),
            })
            .collect();
        options.sort_by_key(|o| o.id);
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{normalize, normalize_listing, RawListingParams, RawSearchParams};
    use crate::plan::{plan_listing, plan_search};
    use chrono::{TimeZone, Utc};
    use futures::executor::block_on;

    fn course(id: i64, title: &str, topic: i64) -> Course {
        Course {
            id,
            title: title.to_string(),
            short_description: String::new(),
            full_description: String::new(),
            image_url: None,
            category_id: topic,
            instructor_id: 1,
            price: 10.0 * id as f64,
            current_price: None,
            is_onsale: false,
            rating: 4.0,
            total_enrollment: 0,
            total_reviews: 0,
            level: None,
            is_active: true,
            is_complete: true,
            latest_update: Utc.with_ymd_and_hms(2024, 1, id as u32, 0, 0, 0).unwrap(),
        }
    }

    fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.insert_topic(Topic {
            id: 10,
            domain_id: 1,
            name: "Web".into(),
        });
        store.insert_topic(Topic {
            id: 20,
            domain_id: 2,
            name: "Graphics".into(),
        });
        store.insert_instructor(Instructor {
            id: 1,
            name: "Ada".into(),
            bio: None,
        });
        store
    }

    fn search_plan(keyword: &str, sort_by: &str) -> crate::plan::PlannedQuery {
        plan_search(
            &normalize(&RawSearchParams {
                keyword: Some(keyword.into()),
                sort_by: Some(sort_by.into()),
                ..Default::default()
            })
            .unwrap(),
        )
    }

    #[test]
    fn test_relevance_keeps_insertion_order() {
        let store = store();
        for (id, title) in [(3, "Rust C"), (1, "Rust A"), (2, "Rust B")] {
            store.insert_course(course(id, title, 10));
        }
        let plan = search_plan("rust", "relevance");
        let rows = block_on(store.fetch_courses(&plan.page)).unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(rows[0].instructor_name.as_deref(), Some("Ada"));
        assert_eq!(rows[0].category_name.as_deref(), Some("Web"));
    }

    #[test]
    fn test_inactive_courses_are_hidden_from_search() {
        let store = store();
        store.insert_course(course(1, "Rust", 10));
        let mut hidden = course(2, "Rust hidden", 10);
        hidden.is_active = false;
        store.insert_course(hidden);

        let plan = search_plan("rust", "relevance");
        assert_eq!(block_on(store.count_courses(&plan.count)).unwrap(), 1);
    }

    #[test]
    fn test_full_text_uses_description() {
        let store = store();
        let mut c = course(1, "Backend basics", 10);
        c.full_description = "Build services with Tokio".into();
        store.insert_course(c);
        store.insert_course(course(2, "Frontend", 10));

        let plan = search_plan("tokio", "relevance");
        let rows = block_on(store.fetch_courses(&plan.page)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 1);
    }

    #[test]
    fn test_price_sort_uses_effective_price() {
        let store = store();
        let mut a = course(1, "A", 10); // 10.0
        let mut b = course(2, "B", 10); // 20.0, on sale at 5.0
        b.current_price = Some(5.0);
        a.current_price = None;
        store.insert_course(a);
        store.insert_course(b);
        store.insert_course(course(3, "C", 10)); // 30.0

        let plan = search_plan("", "price-asc");
        let ids: Vec<i64> = block_on(store.fetch_courses(&plan.page))
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_offset_past_end_is_empty() {
        let store = store();
        store.insert_course(course(1, "Only", 10));
        let plan = plan_search(
            &normalize(&RawSearchParams {
                page: Some("5".into()),
                ..Default::default()
            })
            .unwrap(),
        );
        assert!(block_on(store.fetch_courses(&plan.page)).unwrap().is_empty());
        assert_eq!(block_on(store.count_courses(&plan.count)).unwrap(), 1);
    }

    #[test]
    fn test_listing_domain_and_title_filters() {
        let store = store();
        store.insert_course(course(1, "Modern CSS", 10));
        store.insert_course(course(2, "CSS for designers", 20));
        store.insert_course(course(3, "HTML", 10));

        let raw = RawListingParams {
            domain: Some("1".into()),
            title: Some("css".into()),
            ..Default::default()
        };
        let plan = plan_listing(&normalize_listing(&raw, 9, true).unwrap());
        let rows = block_on(store.fetch_courses(&plan.page)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 1);
    }

    #[test]
    fn test_insert_course_replaces_in_place() {
        let store = store();
        store.insert_course(course(1, "First", 10));
        store.insert_course(course(2, "Second", 10));
        store.insert_course(course(1, "First, revised", 10));

        let plan = search_plan("", "relevance");
        let rows = block_on(store.fetch_courses(&plan.page)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "First, revised");
    }

    #[test]
    fn test_filter_categories_sorted_by_id() {
        let store = store();
        let names: Vec<String> = block_on(store.list_filter_categories())
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Web", "Graphics"]);
    }

    #[test]
    fn test_title_filter_ignores_case_and_accents() {
        let store = store();
        store.insert_course(course(1, "Lập trình ĐIỆN TỬ", 10));
        store.insert_course(course(2, "Electronics", 10));

        let raw = RawListingParams {
            title: Some("điện tử".into()),
            ..Default::default()
        };
        let plan = plan_listing(&normalize_listing(&raw, 9, true).unwrap());
        let rows = block_on(store.fetch_courses(&plan.page)).unwrap();
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1]);
    }
}
