//! Core data models shared by the search pipeline and the stores.
//!
//! [`Course`] is the persisted row; [`CourseCard`] is the read model handed
//! to the presentation layer, with the instructor and category names joined
//! in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Image shown for courses that never had one uploaded.
pub const DEFAULT_COURSE_IMAGE: &str = "/static/default/default-course.jpg";

/// Legacy placeholder paths that older rows carry instead of `NULL`.
const LEGACY_PLACEHOLDER_IMAGES: &[&str] = &[
    "/upload/images/default-course.jpg",
    "/src/public/upload/images/default-course.jpg",
];

/// One purchasable course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub full_description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Level-2 topic the course is filed under.
    pub category_id: i64,
    pub instructor_id: i64,
    pub price: f64,
    /// Discounted price; `None` when the list price applies.
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub is_onsale: bool,
    /// Average review score in `[0, 5]`.
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub total_enrollment: i64,
    #[serde(default)]
    pub total_reviews: i64,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub is_complete: bool,
    pub latest_update: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

/// Level-1 category ("domain"), e.g. *Development*.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: i64,
    pub name: String,
}

/// Level-2 category ("topic"), e.g. *Web Development*. Courses reference topics only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub domain_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instructor {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
}

/// A category entry usable as a search filter option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryOption {
    pub id: i64,
    pub name: String,
}

/// A course as it appears in a result list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseCard {
    pub id: i64,
    pub title: String,
    pub short_description: String,
    pub image_url: String,
    pub price: f64,
    pub current_price: Option<f64>,
    pub is_onsale: bool,
    pub rating: f64,
    pub total_enrollment: i64,
    pub total_reviews: i64,
    pub level: Option<String>,
    pub latest_update: DateTime<Utc>,
    pub instructor_name: Option<String>,
    pub category_name: Option<String>,
}

impl CourseCard {
    /// Build a card from a course row and its joined display names.
    pub fn from_course(
        course: &Course,
        instructor_name: Option<String>,
        category_name: Option<String>,
    ) -> Self {
        Self {
            id: course.id,
            title: course.title.clone(),
            short_description: course.short_description.clone(),
            image_url: resolve_image_url(course.image_url.as_deref()),
            price: course.price,
            current_price: course.current_price,
            is_onsale: course.is_onsale,
            rating: course.rating,
            total_enrollment: course.total_enrollment,
            total_reviews: course.total_reviews,
            level: course.level.clone(),
            latest_update: course.latest_update,
            instructor_name,
            category_name,
        }
    }

    /// The price a buyer pays right now.
    pub fn effective_price(&self) -> f64 {
        self.current_price.unwrap_or(self.price)
    }
}

/// Substitute [`DEFAULT_COURSE_IMAGE`] for missing or placeholder image paths.
pub fn resolve_image_url(image_url: Option<&str>) -> String {
    match image_url.map(str::trim) {
        Some(url) if !url.is_empty() && !LEGACY_PLACEHOLDER_IMAGES.contains(&url) => {
            url.to_string()
        }
        _ => DEFAULT_COURSE_IMAGE.to_string(),
    }
}
