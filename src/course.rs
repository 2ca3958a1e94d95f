//! Course detail retrieval.
//!
//! Assembles the full course page: the course itself, its instructor with
//! aggregate stats, other courses by the same instructor, related courses
//! from the same topic, and the lecture/video outline. Used by the
//! `coursemart course show` command and `GET /courses/{id}`.

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use coursemart_core::models::CourseCard;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::{card_from_row, card_select, CARD_COLUMNS, FROM_COURSES};

const OTHER_COURSES_LIMIT: i64 = 4;
const RELATED_COURSES_LIMIT: i64 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub card: CourseCard,
    pub full_description: String,
    pub category_id: i64,
    pub is_active: bool,
    pub is_complete: bool,
    pub instructor: InstructorProfile,
    /// Up to four other active courses by the same instructor.
    pub other_courses: Vec<CourseCard>,
    /// Up to five active courses from the same topic.
    pub related_courses: Vec<CourseCard>,
    pub lectures: Vec<Lecture>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstructorProfile {
    pub id: i64,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub course_count: i64,
    /// Mean rating over all of the instructor's courses; 0 with none.
    pub average_rating: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Lecture {
    pub id: i64,
    pub title: String,
    pub position: i64,
    pub videos: Vec<Video>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Video {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub duration_secs: i64,
}

/// Load one course with everything its detail page shows.
///
/// Returns `Ok(None)` when no course has this id. Inactive courses are
/// returned too; callers decide whether to show them.
pub async fn get_course(pool: &SqlitePool, id: i64) -> Result<Option<CourseDetail>> {
    let sql = format!(
        "{}, c.full_description, c.category_id, c.instructor_id, c.is_active, c.is_complete, \
         i.bio AS instructor_bio{} WHERE c.id = ?",
        CARD_COLUMNS, FROM_COURSES
    );
    let row = match sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to load course")?
    {
        Some(row) => row,
        None => return Ok(None),
    };

    let card = card_from_row(&row)?;
    let category_id: i64 = row.try_get("category_id")?;
    let instructor_id: i64 = row.try_get("instructor_id")?;

    let (course_count, average_rating): (i64, Option<f64>) =
        sqlx::query_as("SELECT COUNT(*), AVG(rating) FROM courses WHERE instructor_id = ?")
            .bind(instructor_id)
            .fetch_one(pool)
            .await?;

    let other_courses =
        top_courses_where(pool, "c.instructor_id", instructor_id, id, OTHER_COURSES_LIMIT).await?;
    let related_courses =
        top_courses_where(pool, "c.category_id", category_id, id, RELATED_COURSES_LIMIT).await?;
    let lectures = load_lectures(pool, id).await?;

    Ok(Some(CourseDetail {
        instructor: InstructorProfile {
            id: instructor_id,
            name: card.instructor_name.clone(),
            bio: row.try_get("instructor_bio")?,
            course_count,
            average_rating: average_rating.unwrap_or(0.0),
        },
        card,
        full_description: row.try_get("full_description")?,
        category_id,
        is_active: row.try_get("is_active")?,
        is_complete: row.try_get("is_complete")?,
        other_courses,
        related_courses,
        lectures,
    }))
}

/// Active courses sharing `column = value`, excluding `exclude_id`, most
/// enrolled first.
async fn top_courses_where(
    pool: &SqlitePool,
    column: &'static str,
    value: i64,
    exclude_id: i64,
    limit: i64,
) -> Result<Vec<CourseCard>> {
    let sql = format!(
        "{} WHERE {} = ? AND c.id != ? AND c.is_active = 1 \
         ORDER BY c.total_enrollment DESC, c.id ASC LIMIT ?",
        card_select(),
        column
    );
    let rows = sqlx::query(&sql)
        .bind(value)
        .bind(exclude_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    rows.iter().map(card_from_row).collect()
}

async fn load_lectures(pool: &SqlitePool, course_id: i64) -> Result<Vec<Lecture>> {
    let lecture_rows = sqlx::query(
        "SELECT id, title, position FROM lectures WHERE course_id = ? ORDER BY position, id",
    )
    .bind(course_id)
    .fetch_all(pool)
    .await?;

    let video_rows = sqlx::query(
        r#"
        SELECT v.id, v.lecture_id, v.title, v.url, v.duration_secs
        FROM videos v
        JOIN lectures l ON l.id = v.lecture_id
        WHERE l.course_id = ?
        ORDER BY v.position, v.id
        "#,
    )
    .bind(course_id)
    .fetch_all(pool)
    .await?;

    let mut lectures: Vec<Lecture> = lecture_rows
        .iter()
        .map(|row| Lecture {
            id: row.get("id"),
            title: row.get("title"),
            position: row.get("position"),
            videos: Vec::new(),
        })
        .collect();

    for row in &video_rows {
        let lecture_id: i64 = row.get("lecture_id");
        if let Some(lecture) = lectures.iter_mut().find(|l| l.id == lecture_id) {
            lecture.videos.push(Video {
                id: row.get("id"),
                title: row.get("title"),
                url: row.get("url"),
                duration_secs: row.get("duration_secs"),
            });
        }
    }

    Ok(lectures)
}

/// CLI entry point: loads a course and prints it to stdout.
pub async fn run_show(config: &Config, id: i64) -> Result<()> {
    let pool = db::connect(config).await?;
    let detail = get_course(&pool, id).await?;
    pool.close().await;

    let detail = match detail {
        Some(d) => d,
        None => anyhow::bail!("course not found: {}", id),
    };
    let card = &detail.card;

    println!("--- Course ---");
    println!("id:          {}", card.id);
    println!("title:       {}", card.title);
    println!(
        "category:    {}",
        card.category_name.as_deref().unwrap_or("(none)")
    );
    println!("price:       {:.2}", card.effective_price());
    println!("rating:      {:.1} ({} reviews)", card.rating, card.total_reviews);
    println!("enrolled:    {}", card.total_enrollment);
    println!("updated:     {}", card.latest_update.format("%Y-%m-%d"));
    println!("active:      {}", detail.is_active);
    println!();

    println!("--- Instructor ---");
    println!(
        "{} ({} courses, avg rating {:.1})",
        detail.instructor.name.as_deref().unwrap_or("(unknown)"),
        detail.instructor.course_count,
        detail.instructor.average_rating
    );
    println!();

    println!("--- Lectures ({}) ---", detail.lectures.len());
    for lecture in &detail.lectures {
        println!("{}. {}", lecture.position, lecture.title);
        for video in &lecture.videos {
            println!("    - {} [{}s]", video.title, video.duration_secs);
        }
    }
    println!();

    println!("--- Related ({}) ---", detail.related_courses.len());
    for related in &detail.related_courses {
        println!("[{}] {}", related.id, related.title);
    }

    Ok(())
}
