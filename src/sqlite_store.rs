//! SQLite-backed [`CourseStore`] implementation.
//!
//! Renders the planner's predicate list into one `WHERE 1=1 AND ...` clause
//! with [`QueryBuilder`], shared by the count and page queries. Full-text
//! predicates become `IN`/`NOT IN` sub-selects against `course_fts`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use coursemart_core::models::{resolve_image_url, CategoryOption, CourseCard};
use coursemart_core::plan::{CountQuery, Filter, Ordering, PageQuery, Predicate, SortColumn};
use coursemart_core::store::CourseStore;
use coursemart_core::websearch::{Term, WebSearch};

/// Base relation: courses with their instructor and topic joined in.
pub(crate) const FROM_COURSES: &str = " FROM courses c \
     LEFT JOIN instructors i ON i.id = c.instructor_id \
     LEFT JOIN category_l2 cat ON cat.id = c.category_id";

pub(crate) const CARD_COLUMNS: &str = "SELECT c.id, c.title, c.short_description, c.image_url, \
     c.price, c.current_price, c.is_onsale, c.rating, c.total_enrollment, \
     c.total_reviews, c.level, c.latest_update, \
     i.name AS instructor_name, cat.name AS category_name";

/// SQLite implementation of the [`CourseStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

pub(crate) fn ts_to_datetime(ts: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
        .with_context(|| format!("timestamp out of range: {}", ts))
}

/// Map a row selected with [`CARD_COLUMNS`] to a card.
pub(crate) fn card_from_row(row: &SqliteRow) -> Result<CourseCard> {
    let image_url: Option<String> = row.try_get("image_url")?;
    Ok(CourseCard {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        short_description: row.try_get("short_description")?,
        image_url: resolve_image_url(image_url.as_deref()),
        price: row.try_get("price")?,
        current_price: row.try_get("current_price")?,
        is_onsale: row.try_get("is_onsale")?,
        rating: row.try_get("rating")?,
        total_enrollment: row.try_get("total_enrollment")?,
        total_reviews: row.try_get("total_reviews")?,
        level: row.try_get("level")?,
        latest_update: ts_to_datetime(row.try_get("latest_update")?)?,
        instructor_name: row.try_get("instructor_name")?,
        category_name: row.try_get("category_name")?,
    })
}

pub(crate) fn card_select() -> String {
    format!("{}{}", CARD_COLUMNS, FROM_COURSES)
}

/// FTS5 query for a conjunction of terms: `"a" AND "b c"`.
///
/// Term tokens are alphanumeric, so quoting needs no escaping.
fn fts_expression(terms: &[Term]) -> String {
    terms
        .iter()
        .map(|t| format!("\"{}\"", t.tokens().join(" ")))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn push_full_text(qb: &mut QueryBuilder<'_, Sqlite>, ws: &WebSearch) {
    if ws.is_empty() {
        qb.push("0");
        return;
    }

    qb.push("(");
    for (i, clause) in ws.clauses.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push("(1=1");
        if !clause.include.is_empty() {
            qb.push(" AND c.id IN (SELECT rowid FROM course_fts WHERE course_fts MATCH ")
                .push_bind(fts_expression(&clause.include))
                .push(")");
        }
        for term in &clause.exclude {
            qb.push(" AND c.id NOT IN (SELECT rowid FROM course_fts WHERE course_fts MATCH ")
                .push_bind(fts_expression(std::slice::from_ref(term)))
                .push(")");
        }
        qb.push(")");
    }
    qb.push(")");
}

/// Escape `%`, `_` and the escape character itself for `LIKE ... ESCAPE '\'`.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_predicate(qb: &mut QueryBuilder<'_, Sqlite>, predicate: &Predicate) {
    match predicate {
        Predicate::ActiveOnly => {
            qb.push("c.is_active = 1");
        }
        Predicate::FullText(ws) => push_full_text(qb, ws),
        Predicate::CategoryIs(id) => {
            qb.push("c.category_id = ").push_bind(*id);
        }
        Predicate::DomainIs(id) => {
            qb.push("cat.l1_id = ").push_bind(*id);
        }
        Predicate::LevelIs(level) => {
            qb.push("LOWER(c.level) = LOWER(")
                .push_bind(level.clone())
                .push(")");
        }
        // course_fts.title holds the folded title, matching the folded needle.
        Predicate::TitleContains(needle) => {
            qb.push("c.id IN (SELECT rowid FROM course_fts WHERE title LIKE ")
                .push_bind(like_pattern(needle))
                .push(" ESCAPE '\\')");
        }
        Predicate::PriceAtLeast(min) => {
            qb.push("c.price >= ").push_bind(*min);
        }
        Predicate::PriceAtMost(max) => {
            qb.push("c.price <= ").push_bind(*max);
        }
        Predicate::RatingAtLeast(min) => {
            qb.push("c.rating >= ").push_bind(*min);
        }
        Predicate::OnSale => {
            qb.push("c.is_onsale = 1");
        }
    }
}

fn push_where(qb: &mut QueryBuilder<'_, Sqlite>, filter: &Filter) {
    qb.push(" WHERE 1=1");
    for predicate in filter.predicates() {
        qb.push(" AND ");
        push_predicate(qb, predicate);
    }
}

fn order_expression(column: SortColumn) -> &'static str {
    match column {
        SortColumn::Rating => "c.rating",
        SortColumn::CurrentPrice => "COALESCE(c.current_price, c.price)",
        SortColumn::LatestUpdate => "c.latest_update",
        SortColumn::TotalEnrollment => "c.total_enrollment",
    }
}

fn push_order(qb: &mut QueryBuilder<'_, Sqlite>, ordering: Option<Ordering>) {
    if let Some(ordering) = ordering {
        qb.push(" ORDER BY ")
            .push(order_expression(ordering.column))
            .push(" ")
            .push(ordering.direction.as_sql())
            .push(", c.id ASC");
    }
}

fn count_sql(query: &CountQuery) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*)");
    qb.push(FROM_COURSES);
    push_where(&mut qb, &query.filter);
    qb
}

fn page_sql(query: &PageQuery) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new(card_select());
    push_where(&mut qb, &query.filter);
    push_order(&mut qb, query.ordering);
    qb.push(" LIMIT ")
        .push_bind(query.limit)
        .push(" OFFSET ")
        .push_bind(query.offset);
    qb
}

#[async_trait]
impl CourseStore for SqliteStore {
    async fn count_courses(&self, query: &CountQuery) -> Result<i64> {
        let mut qb = count_sql(query);
        tracing::debug!(sql = qb.sql(), "count courses");
        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .context("Failed to count courses")?;
        Ok(count)
    }

    async fn fetch_courses(&self, query: &PageQuery) -> Result<Vec<CourseCard>> {
        let mut qb = page_sql(query);
        tracing::debug!(sql = qb.sql(), "fetch courses");
        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch courses")?;
        rows.iter().map(card_from_row).collect()
    }

    async fn list_filter_categories(&self) -> Result<Vec<CategoryOption>> {
        let rows = sqlx::query("SELECT id, name FROM category_l2 ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list categories")?;
        rows.iter()
            .map(|row| -> Result<CategoryOption> {
                Ok(CategoryOption {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }
}
