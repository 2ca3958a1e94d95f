//! Query normalizer: untrusted request parameters → canonical queries.
//!
//! All raw inputs are plain optional strings, exactly as they arrive from a
//! query string or form body. Parsing is explicit and every field has a
//! defined fallback; the only hard failure is an over-long keyword
//! ([`QueryError::KeywordTooLong`]).

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Maximum keyword length in characters, measured after trimming.
pub const MAX_KEYWORD_CHARS: usize = 100;

/// Fixed page size on the keyword-search path.
pub const SEARCH_PAGE_SIZE: u32 = 6;

/// Sort key requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Relevance,
    Rating,
    Price,
    Newest,
    Popular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    fn parse(raw: Option<&str>) -> Option<Self> {
        match raw?.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Map a raw `sortBy` value (and optional `sortOrder`) to a canonical pair.
///
/// Returns `None` for values outside the table so callers can pick their
/// own fallback.
fn resolve_sort(raw_sort_by: &str, raw_sort_order: Option<&str>) -> Option<(SortBy, SortOrder)> {
    match raw_sort_by.trim().to_ascii_lowercase().as_str() {
        "relevance" => Some((SortBy::Relevance, SortOrder::Asc)),
        "rating" => Some((
            SortBy::Rating,
            SortOrder::parse(raw_sort_order).unwrap_or(SortOrder::Desc),
        )),
        "price" | "price-asc" => Some((SortBy::Price, SortOrder::Asc)),
        "price-desc" => Some((SortBy::Price, SortOrder::Desc)),
        "newest" => Some((SortBy::Newest, SortOrder::Desc)),
        "popular" => Some((SortBy::Popular, SortOrder::Desc)),
        _ => None,
    }
}

/// The UI-facing key for a canonical sort pair (e.g. `price-desc`).
pub fn sort_key(sort_by: SortBy, sort_order: SortOrder) -> &'static str {
    match (sort_by, sort_order) {
        (SortBy::Relevance, _) => "relevance",
        (SortBy::Rating, _) => "rating",
        (SortBy::Price, SortOrder::Asc) => "price-asc",
        (SortBy::Price, SortOrder::Desc) => "price-desc",
        (SortBy::Newest, _) => "newest",
        (SortBy::Popular, _) => "popular",
    }
}

/// Parse a 1-based page number; anything unparsable or below 1 becomes 1.
pub fn parse_page(raw: Option<&str>) -> u32 {
    raw.and_then(|p| p.trim().parse::<u32>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1)
}

/// Parse a category id; `0` is the "all categories" sentinel.
pub fn parse_category(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|c| c.trim().parse::<i64>().ok())
        .filter(|c| *c != 0)
}

fn parse_amount(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "on" | "yes")
    )
}

/// Trim, length-check, and HTML-escape free text.
pub fn normalize_keyword(raw: Option<&str>) -> Result<String, QueryError> {
    let trimmed = raw.unwrap_or_default().trim();
    let len = trimmed.chars().count();
    if len > MAX_KEYWORD_CHARS {
        return Err(QueryError::KeywordTooLong {
            len,
            max: MAX_KEYWORD_CHARS,
        });
    }
    Ok(html_escape::encode_safe(trimmed).into_owned())
}

// ============ Keyword search ============

/// Keep the first value offered for a field.
fn fill(slot: &mut Option<String>, value: impl Into<String>) {
    if slot.is_none() {
        *slot = Some(value.into());
    }
}

/// Raw keyword-search parameters as received from the client.
///
/// Built from decoded key/value pairs with [`RawSearchParams::from_pairs`];
/// the keyword is accepted as `keyword`, `q` or `searchInput`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSearchParams {
    pub keyword: Option<String>,
    pub page: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub category: Option<String>,
}

impl RawSearchParams {
    /// Collect parameters from decoded pairs. Repeated fields and aliases
    /// never fail: the first value seen wins, unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut raw = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "keyword" | "q" | "searchInput" => &mut raw.keyword,
                "page" => &mut raw.page,
                "sort_by" | "sortBy" => &mut raw.sort_by,
                "sort_order" | "sortOrder" => &mut raw.sort_order,
                "category" => &mut raw.category,
                _ => continue,
            };
            fill(slot, value);
        }
        raw
    }

    /// Fields missing here are taken from `fallback`.
    pub fn or(self, fallback: Self) -> Self {
        Self {
            keyword: self.keyword.or(fallback.keyword),
            page: self.page.or(fallback.page),
            sort_by: self.sort_by.or(fallback.sort_by),
            sort_order: self.sort_order.or(fallback.sort_order),
            category: self.category.or(fallback.category),
        }
    }
}

/// Canonical keyword-search descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    /// Empty, or trimmed and HTML-escaped.
    pub keyword: String,
    pub category: Option<i64>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub page: u32,
    pub page_size: u32,
}

impl SearchQuery {
    /// The keyword with HTML entities decoded, for query parsing.
    pub fn plain_keyword(&self) -> String {
        html_escape::decode_html_entities(&self.keyword).into_owned()
    }

    pub fn sort_key(&self) -> &'static str {
        sort_key(self.sort_by, self.sort_order)
    }
}

/// Normalize raw keyword-search parameters.
pub fn normalize(raw: &RawSearchParams) -> Result<SearchQuery, QueryError> {
    let keyword = normalize_keyword(raw.keyword.as_deref())?;
    let (sort_by, sort_order) = raw
        .sort_by
        .as_deref()
        .and_then(|s| resolve_sort(s, raw.sort_order.as_deref()))
        .unwrap_or((SortBy::Relevance, SortOrder::Asc));

    Ok(SearchQuery {
        keyword,
        category: parse_category(raw.category.as_deref()),
        sort_by,
        sort_order,
        page: parse_page(raw.page.as_deref()),
        page_size: SEARCH_PAGE_SIZE,
    })
}

// ============ Catalog listing ============

/// Raw parameters of the browse listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawListingParams {
    pub category: Option<String>,
    pub domain: Option<String>,
    pub level: Option<String>,
    pub title: Option<String>,
    pub price_min: Option<String>,
    pub price_max: Option<String>,
    pub min_rating: Option<String>,
    pub on_sale: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<String>,
}

impl RawListingParams {
    /// Same rules as [`RawSearchParams::from_pairs`].
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut raw = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "category" => &mut raw.category,
                "domain" => &mut raw.domain,
                "level" => &mut raw.level,
                "title" => &mut raw.title,
                "price_min" | "priceMin" => &mut raw.price_min,
                "price_max" | "priceMax" => &mut raw.price_max,
                "min_rating" | "minRating" => &mut raw.min_rating,
                "on_sale" | "onSale" => &mut raw.on_sale,
                "sort_by" | "sortBy" => &mut raw.sort_by,
                "sort_order" | "sortOrder" => &mut raw.sort_order,
                "page" => &mut raw.page,
                _ => continue,
            };
            fill(slot, value);
        }
        raw
    }
}

/// Optional listing filters; every present filter narrows the result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListingFilters {
    pub category: Option<i64>,
    /// Level-1 domain; matches every topic under it.
    pub domain: Option<i64>,
    pub level: Option<String>,
    /// Case-insensitive substring of the title (HTML-escaped).
    pub title: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub min_rating: Option<f64>,
    pub on_sale: bool,
}

/// Canonical browse-listing descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingQuery {
    pub filters: ListingFilters,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub page: u32,
    pub page_size: u32,
    pub active_only: bool,
}

/// Normalize raw listing parameters.
///
/// `page_size` and `active_only` are deployment settings, not client input.
/// A missing or unknown sort key falls back to newest-first.
pub fn normalize_listing(
    raw: &RawListingParams,
    page_size: u32,
    active_only: bool,
) -> Result<ListingQuery, QueryError> {
    let title = normalize_keyword(raw.title.as_deref())?;
    let level = raw
        .level
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string);
    let (sort_by, sort_order) = raw
        .sort_by
        .as_deref()
        .and_then(|s| resolve_sort(s, raw.sort_order.as_deref()))
        .unwrap_or((SortBy::Newest, SortOrder::Desc));

    Ok(ListingQuery {
        filters: ListingFilters {
            category: parse_category(raw.category.as_deref()),
            domain: parse_category(raw.domain.as_deref()),
            level,
            title: (!title.is_empty()).then_some(title),
            price_min: parse_amount(raw.price_min.as_deref()),
            price_max: parse_amount(raw.price_max.as_deref()),
            min_rating: parse_amount(raw.min_rating.as_deref()).filter(|r| *r > 0.0),
            on_sale: parse_flag(raw.on_sale.as_deref()),
        },
        sort_by,
        sort_order,
        page: parse_page(raw.page.as_deref()),
        page_size: page_size.max(1),
        active_only,
    })
}
