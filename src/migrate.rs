use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Catalog schema. Every statement is idempotent.
///
/// Timestamps are unix seconds. `course_fts` is keyed by `rowid = courses.id`
/// and holds accent-folded title and description text.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS category_l1 (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS category_l2 (
        id INTEGER PRIMARY KEY,
        l1_id INTEGER NOT NULL REFERENCES category_l1(id),
        name TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS instructors (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        bio TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS courses (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        short_description TEXT NOT NULL DEFAULT '',
        full_description TEXT NOT NULL DEFAULT '',
        image_url TEXT,
        category_id INTEGER NOT NULL REFERENCES category_l2(id),
        instructor_id INTEGER NOT NULL REFERENCES instructors(id),
        price REAL NOT NULL,
        current_price REAL,
        is_onsale INTEGER NOT NULL DEFAULT 0,
        rating REAL NOT NULL DEFAULT 0,
        total_enrollment INTEGER NOT NULL DEFAULT 0,
        total_reviews INTEGER NOT NULL DEFAULT 0,
        level TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        is_complete INTEGER NOT NULL DEFAULT 0,
        latest_update INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS lectures (
        id INTEGER PRIMARY KEY,
        course_id INTEGER NOT NULL REFERENCES courses(id),
        title TEXT NOT NULL,
        position INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS videos (
        id INTEGER PRIMARY KEY,
        lecture_id INTEGER NOT NULL REFERENCES lectures(id),
        title TEXT NOT NULL,
        url TEXT NOT NULL,
        duration_secs INTEGER NOT NULL DEFAULT 0,
        position INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS video_process (
        user_id INTEGER NOT NULL,
        video_id INTEGER NOT NULL REFERENCES videos(id),
        progress_secs INTEGER NOT NULL DEFAULT 0,
        completed INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (user_id, video_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS enrollments (
        user_id INTEGER NOT NULL,
        course_id INTEGER NOT NULL REFERENCES courses(id),
        enrolled_at INTEGER NOT NULL,
        PRIMARY KEY (user_id, course_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS feedback (
        id INTEGER PRIMARY KEY,
        user_id INTEGER NOT NULL,
        course_id INTEGER NOT NULL REFERENCES courses(id),
        rating INTEGER NOT NULL,
        comment TEXT,
        created_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS watchlist (
        user_id INTEGER NOT NULL,
        course_id INTEGER NOT NULL REFERENCES courses(id),
        PRIMARY KEY (user_id, course_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_category_l2_l1 ON category_l2(l1_id)",
    "CREATE INDEX IF NOT EXISTS idx_courses_category ON courses(category_id)",
    "CREATE INDEX IF NOT EXISTS idx_courses_instructor ON courses(instructor_id)",
    "CREATE INDEX IF NOT EXISTS idx_courses_latest_update ON courses(latest_update DESC)",
    "CREATE INDEX IF NOT EXISTS idx_lectures_course ON lectures(course_id)",
    "CREATE INDEX IF NOT EXISTS idx_videos_lecture ON videos(lecture_id)",
    "CREATE INDEX IF NOT EXISTS idx_feedback_course ON feedback(course_id)",
    "CREATE INDEX IF NOT EXISTS idx_enrollments_course ON enrollments(course_id)",
    "CREATE INDEX IF NOT EXISTS idx_watchlist_course ON watchlist(course_id)",
];

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Apply the schema to an open pool.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(*statement)
            .execute(pool)
            .await
            .with_context(|| format!("Migration failed: {}", statement.trim()))?;
    }

    // FTS5 CREATE is not idempotent natively, so we check first
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='course_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE course_fts USING fts5(
                title,
                description,
                tokenize = 'unicode61 remove_diacritics 2'
            )
            "#,
        )
        .execute(pool)
        .await?;
    }

    tracing::debug!("schema up to date");
    Ok(())
}
