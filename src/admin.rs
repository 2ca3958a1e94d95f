//! Course administration: cascading delete, lock/unlock, and the admin list.

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use coursemart_core::models::CourseCard;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::{card_from_row, CARD_COLUMNS, FROM_COURSES};

/// A course row as the admin dashboard sees it, regardless of status.
#[derive(Debug, Clone, Serialize)]
pub struct AdminCourse {
    #[serde(flatten)]
    pub card: CourseCard,
    pub category_id: i64,
    pub instructor_id: i64,
    pub is_active: bool,
}

/// Delete a course and everything that references it, in one transaction.
///
/// Dependents go first so foreign keys hold at every step: feedback,
/// enrollments, watchlist entries, per-user video progress, videos,
/// lectures, the full-text row, then the course. Any failure rolls the
/// whole deletion back. Returns whether a course row was deleted.
pub async fn delete_course(pool: &SqlitePool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await?;

    for (table, sql) in [
        ("feedback", "DELETE FROM feedback WHERE course_id = ?"),
        ("enrollments", "DELETE FROM enrollments WHERE course_id = ?"),
        ("watchlist", "DELETE FROM watchlist WHERE course_id = ?"),
        (
            "video_process",
            "DELETE FROM video_process WHERE video_id IN \
             (SELECT v.id FROM videos v JOIN lectures l ON l.id = v.lecture_id WHERE l.course_id = ?)",
        ),
        (
            "videos",
            "DELETE FROM videos WHERE lecture_id IN (SELECT id FROM lectures WHERE course_id = ?)",
        ),
        ("lectures", "DELETE FROM lectures WHERE course_id = ?"),
        ("course_fts", "DELETE FROM course_fts WHERE rowid = ?"),
    ] {
        let removed = sqlx::query(sql)
            .bind(id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to delete {} for course {}", table, id))?
            .rows_affected();
        tracing::debug!(course_id = id, table, removed, "cascade delete");
    }

    let deleted = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to delete course {}", id))?
        .rows_affected()
        > 0;

    tx.commit().await?;

    if deleted {
        tracing::info!(course_id = id, "course deleted");
    }
    Ok(deleted)
}

/// Lock (`active = false`) or unlock a course. Returns whether it exists.
pub async fn set_course_active(pool: &SqlitePool, id: i64, active: bool) -> Result<bool> {
    let updated = sqlx::query("UPDATE courses SET is_active = ? WHERE id = ?")
        .bind(active)
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected()
        > 0;
    if updated {
        tracing::info!(course_id = id, active, "course status changed");
    }
    Ok(updated)
}

/// Every course, active or not, optionally narrowed by topic and instructor.
pub async fn list_courses_admin(
    pool: &SqlitePool,
    category_id: Option<i64>,
    instructor_id: Option<i64>,
) -> Result<Vec<AdminCourse>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(CARD_COLUMNS);
    qb.push(", c.category_id, c.instructor_id, c.is_active");
    qb.push(FROM_COURSES);
    qb.push(" WHERE 1=1");
    if let Some(category_id) = category_id {
        qb.push(" AND c.category_id = ").push_bind(category_id);
    }
    if let Some(instructor_id) = instructor_id {
        qb.push(" AND c.instructor_id = ").push_bind(instructor_id);
    }
    qb.push(" ORDER BY c.id ASC");

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter()
        .map(|row| -> Result<AdminCourse> {
            Ok(AdminCourse {
                card: card_from_row(row)?,
                category_id: row.try_get("category_id")?,
                instructor_id: row.try_get("instructor_id")?,
                is_active: row.try_get("is_active")?,
            })
        })
        .collect()
}

// ============ CLI entry points ============

pub async fn run_delete(config: &Config, id: i64) -> Result<()> {
    let pool = db::connect(config).await?;
    let deleted = delete_course(&pool, id).await?;
    pool.close().await;

    if !deleted {
        anyhow::bail!("course not found: {}", id);
    }
    println!("Deleted course {}", id);
    Ok(())
}

pub async fn run_set_active(config: &Config, id: i64, active: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    let updated = set_course_active(&pool, id, active).await?;
    pool.close().await;

    if !updated {
        anyhow::bail!("course not found: {}", id);
    }
    println!(
        "Course {} {}",
        id,
        if active { "unlocked" } else { "locked" }
    );
    Ok(())
}
