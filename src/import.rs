//! Catalog import from JSON.
//!
//! Loads a catalog snapshot (categories, instructors, courses with their
//! lectures and videos, plus enrollments, feedback, watchlist entries and
//! video progress) into SQLite in a single transaction. Rows are upserted
//! by id, so re-importing the same file is a no-op apart from refreshing
//! each course's full-text row.
//!
//! ```json
//! {
//!   "domains":     [{ "id": 1, "name": "Development" }],
//!   "topics":      [{ "id": 5, "domain_id": 1, "name": "Web Development" }],
//!   "instructors": [{ "id": 1, "name": "Ada", "bio": "..." }],
//!   "courses": [{
//!     "id": 10, "title": "Rust for the Web", "category_id": 5, "instructor_id": 1,
//!     "price": 49.0, "latest_update": "2024-05-01T00:00:00Z",
//!     "lectures": [{ "id": 100, "title": "Intro", "position": 1,
//!                    "videos": [{ "id": 1000, "title": "Welcome", "url": "/v/1000.mp4" }] }]
//!   }]
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{Sqlite, SqlitePool, Transaction};

use coursemart_core::models::{Course, Domain, Instructor, Topic};
use coursemart_core::websearch::fold_text;

use crate::config::Config;
use crate::db;

#[derive(Debug, Default, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub domains: Vec<Domain>,
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub instructors: Vec<Instructor>,
    #[serde(default)]
    pub courses: Vec<CourseEntry>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
    #[serde(default)]
    pub feedback: Vec<Feedback>,
    #[serde(default)]
    pub watchlist: Vec<WatchlistEntry>,
    #[serde(default)]
    pub video_progress: Vec<VideoProgress>,
}

#[derive(Debug, Deserialize)]
pub struct CourseEntry {
    #[serde(flatten)]
    pub course: Course,
    #[serde(default)]
    pub lectures: Vec<LectureEntry>,
}

#[derive(Debug, Deserialize)]
pub struct LectureEntry {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub videos: Vec<VideoEntry>,
}

#[derive(Debug, Deserialize)]
pub struct VideoEntry {
    pub id: i64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub duration_secs: i64,
    #[serde(default)]
    pub position: i64,
}

#[derive(Debug, Deserialize)]
pub struct Enrollment {
    pub user_id: i64,
    pub course_id: i64,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct Feedback {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct WatchlistEntry {
    pub user_id: i64,
    pub course_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct VideoProgress {
    pub user_id: i64,
    pub video_id: i64,
    #[serde(default)]
    pub progress_secs: i64,
    #[serde(default)]
    pub completed: bool,
}

/// Row counts written by one import.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportStats {
    pub domains: usize,
    pub topics: usize,
    pub instructors: usize,
    pub courses: usize,
    pub lectures: usize,
    pub videos: usize,
    pub enrollments: usize,
    pub feedback: usize,
    pub watchlist: usize,
    pub video_progress: usize,
}

pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse catalog file: {}", path.display()))
}

/// Write a catalog into the database. All or nothing.
pub async fn import_catalog(pool: &SqlitePool, catalog: &Catalog) -> Result<ImportStats> {
    let mut tx = pool.begin().await?;
    let mut stats = ImportStats::default();

    for domain in &catalog.domains {
        sqlx::query(
            "INSERT INTO category_l1 (id, name) VALUES (?, ?) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        )
        .bind(domain.id)
        .bind(&domain.name)
        .execute(&mut *tx)
        .await?;
        stats.domains += 1;
    }

    for topic in &catalog.topics {
        sqlx::query(
            "INSERT INTO category_l2 (id, l1_id, name) VALUES (?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET l1_id = excluded.l1_id, name = excluded.name",
        )
        .bind(topic.id)
        .bind(topic.domain_id)
        .bind(&topic.name)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to import topic {}", topic.id))?;
        stats.topics += 1;
    }

    for instructor in &catalog.instructors {
        sqlx::query(
            "INSERT INTO instructors (id, name, bio) VALUES (?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, bio = excluded.bio",
        )
        .bind(instructor.id)
        .bind(&instructor.name)
        .bind(&instructor.bio)
        .execute(&mut *tx)
        .await?;
        stats.instructors += 1;
    }

    for entry in &catalog.courses {
        upsert_course(&mut tx, &entry.course)
            .await
            .with_context(|| format!("Failed to import course {}", entry.course.id))?;
        stats.courses += 1;

        for lecture in &entry.lectures {
            sqlx::query(
                "INSERT INTO lectures (id, course_id, title, position) VALUES (?, ?, ?, ?) \
                 ON CONFLICT(id) DO UPDATE SET course_id = excluded.course_id, \
                 title = excluded.title, position = excluded.position",
            )
            .bind(lecture.id)
            .bind(entry.course.id)
            .bind(&lecture.title)
            .bind(lecture.position)
            .execute(&mut *tx)
            .await?;
            stats.lectures += 1;

            for video in &lecture.videos {
                sqlx::query(
                    "INSERT INTO videos (id, lecture_id, title, url, duration_secs, position) \
                     VALUES (?, ?, ?, ?, ?, ?) \
                     ON CONFLICT(id) DO UPDATE SET lecture_id = excluded.lecture_id, \
                     title = excluded.title, url = excluded.url, \
                     duration_secs = excluded.duration_secs, position = excluded.position",
                )
                .bind(video.id)
                .bind(lecture.id)
                .bind(&video.title)
                .bind(&video.url)
                .bind(video.duration_secs)
                .bind(video.position)
                .execute(&mut *tx)
                .await?;
                stats.videos += 1;
            }
        }
    }

    for e in &catalog.enrollments {
        sqlx::query(
            "INSERT INTO enrollments (user_id, course_id, enrolled_at) VALUES (?, ?, ?) \
             ON CONFLICT(user_id, course_id) DO UPDATE SET enrolled_at = excluded.enrolled_at",
        )
        .bind(e.user_id)
        .bind(e.course_id)
        .bind(e.enrolled_at.timestamp())
        .execute(&mut *tx)
        .await?;
        stats.enrollments += 1;
    }

    for f in &catalog.feedback {
        sqlx::query(
            "INSERT INTO feedback (id, user_id, course_id, rating, comment, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET rating = excluded.rating, comment = excluded.comment",
        )
        .bind(f.id)
        .bind(f.user_id)
        .bind(f.course_id)
        .bind(f.rating)
        .bind(&f.comment)
        .bind(f.created_at.timestamp())
        .execute(&mut *tx)
        .await?;
        stats.feedback += 1;
    }

    for w in &catalog.watchlist {
        sqlx::query(
            "INSERT INTO watchlist (user_id, course_id) VALUES (?, ?) \
             ON CONFLICT(user_id, course_id) DO NOTHING",
        )
        .bind(w.user_id)
        .bind(w.course_id)
        .execute(&mut *tx)
        .await?;
        stats.watchlist += 1;
    }

    for p in &catalog.video_progress {
        sqlx::query(
            "INSERT INTO video_process (user_id, video_id, progress_secs, completed) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(user_id, video_id) DO UPDATE SET \
             progress_secs = excluded.progress_secs, completed = excluded.completed",
        )
        .bind(p.user_id)
        .bind(p.video_id)
        .bind(p.progress_secs)
        .bind(p.completed)
        .execute(&mut *tx)
        .await?;
        stats.video_progress += 1;
    }

    tx.commit().await?;
    tracing::info!(courses = stats.courses, topics = stats.topics, "catalog imported");
    Ok(stats)
}

async fn upsert_course(tx: &mut Transaction<'_, Sqlite>, course: &Course) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO courses (id, title, short_description, full_description, image_url,
                             category_id, instructor_id, price, current_price, is_onsale,
                             rating, total_enrollment, total_reviews, level,
                             is_active, is_complete, latest_update)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            short_description = excluded.short_description,
            full_description = excluded.full_description,
            image_url = excluded.image_url,
            category_id = excluded.category_id,
            instructor_id = excluded.instructor_id,
            price = excluded.price,
            current_price = excluded.current_price,
            is_onsale = excluded.is_onsale,
            rating = excluded.rating,
            total_enrollment = excluded.total_enrollment,
            total_reviews = excluded.total_reviews,
            level = excluded.level,
            is_active = excluded.is_active,
            is_complete = excluded.is_complete,
            latest_update = excluded.latest_update
        "#,
    )
    .bind(course.id)
    .bind(&course.title)
    .bind(&course.short_description)
    .bind(&course.full_description)
    .bind(&course.image_url)
    .bind(course.category_id)
    .bind(course.instructor_id)
    .bind(course.price)
    .bind(course.current_price)
    .bind(course.is_onsale)
    .bind(course.rating)
    .bind(course.total_enrollment)
    .bind(course.total_reviews)
    .bind(&course.level)
    .bind(course.is_active)
    .bind(course.is_complete)
    .bind(course.latest_update.timestamp())
    .execute(&mut **tx)
    .await?;

    sqlx::query("DELETE FROM course_fts WHERE rowid = ?")
        .bind(course.id)
        .execute(&mut **tx)
        .await?;

    let description = format!("{} {}", course.short_description, course.full_description);
    sqlx::query("INSERT INTO course_fts (rowid, title, description) VALUES (?, ?, ?)")
        .bind(course.id)
        .bind(fold_text(&course.title))
        .bind(fold_text(&description))
        .execute(&mut **tx)
        .await?;

    Ok(())
}

/// CLI entry point: imports a catalog file and prints row counts.
pub async fn run_import(config: &Config, path: &Path) -> Result<()> {
    let catalog = load_catalog(path)?;
    let pool = db::connect(config).await?;
    let stats = import_catalog(&pool, &catalog).await?;
    pool.close().await;

    println!("Imported catalog from {}", path.display());
    println!("  categories:  {} domains, {} topics", stats.domains, stats.topics);
    println!("  instructors: {}", stats.instructors);
    println!(
        "  courses:     {} ({} lectures, {} videos)",
        stats.courses, stats.lectures, stats.videos
    );
    println!(
        "  activity:    {} enrollments, {} feedback, {} watchlist, {} progress",
        stats.enrollments, stats.feedback, stats.watchlist, stats.video_progress
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_parses_nested_lectures() {
        let catalog: Catalog = serde_json::from_str(
            r#"{
                "topics": [{ "id": 5, "domain_id": 1, "name": "Web" }],
                "courses": [{
                    "id": 10,
                    "title": "Rust for the Web",
                    "category_id": 5,
                    "instructor_id": 1,
                    "price": 49.0,
                    "latest_update": "2024-05-01T00:00:00Z",
                    "lectures": [{
                        "id": 100,
                        "title": "Intro",
                        "videos": [{ "id": 1000, "title": "Welcome", "url": "/v/1000.mp4" }]
                    }]
                }]
            }"#,
        )
        .unwrap();
        assert!(catalog.domains.is_empty());
        assert_eq!(catalog.courses.len(), 1);
        let entry = &catalog.courses[0];
        assert!(entry.course.is_active);
        assert_eq!(entry.lectures[0].videos[0].id, 1000);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = load_catalog(Path::new("/nonexistent/catalog.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read catalog file"));
    }
}
