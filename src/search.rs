//! CLI front-ends for keyword search, the browse listing, and categories.
//!
//! Each command opens a pool, runs the core pipeline against a
//! [`SqliteStore`], and prints to stdout. Degraded results are logged with
//! their cause and still printed (as an empty page).

use anyhow::Result;

use coursemart_core::normalize::{RawListingParams, RawSearchParams};
use coursemart_core::paginate::SearchResult;
use coursemart_core::search::{list_courses, search_courses, SearchOutcome};
use coursemart_core::store::CourseStore;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Log the cause of a degraded outcome and tell the user.
pub fn report_degraded(outcome: &SearchOutcome) {
    if let (Some(cause), Some(message)) = (outcome.cause(), outcome.error_message()) {
        tracing::error!(error = %cause, "course search failed");
        eprintln!("{}", message);
    }
}

fn print_result(result: &SearchResult) {
    if result.is_empty() {
        if result.current_page > result.total_pages {
            println!(
                "No results on page {} ({} pages, {} results).",
                result.current_page, result.total_pages, result.total_count
            );
        } else {
            println!("No results.");
        }
        return;
    }

    println!(
        "Page {} of {} ({} results)",
        result.current_page, result.total_pages, result.total_count
    );
    println!();

    let first = u64::from(result.current_page.saturating_sub(1)) * u64::from(result.page_size);
    for (i, course) in result.items.iter().enumerate() {
        println!("{}. [{:.1}] {}", first + i as u64 + 1, course.rating, course.title);
        println!(
            "    category: {}",
            course.category_name.as_deref().unwrap_or("(none)")
        );
        println!(
            "    instructor: {}",
            course.instructor_name.as_deref().unwrap_or("(unknown)")
        );
        if course.is_onsale && course.current_price.is_some() {
            println!(
                "    price: {:.2} (was {:.2})",
                course.effective_price(),
                course.price
            );
        } else {
            println!("    price: {:.2}", course.effective_price());
        }
        println!("    enrolled: {}", course.total_enrollment);
        println!("    updated: {}", course.latest_update.format("%Y-%m-%d"));
        println!("    id: {}", course.id);
        println!();
    }
}

pub async fn run_search(config: &Config, params: &RawSearchParams) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);

    let page = search_courses(&store, params).await;
    store.pool().close().await;
    let page = page?;

    tracing::debug!(
        keyword = %page.query.keyword,
        sort = page.query.sort_key(),
        page = page.query.page,
        "search complete"
    );
    report_degraded(&page.outcome);
    print_result(page.outcome.result());
    Ok(())
}

pub async fn run_courses(config: &Config, params: &RawListingParams) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);

    let page = list_courses(
        &store,
        params,
        config.listing.page_size,
        config.listing.active_only,
    )
    .await;
    store.pool().close().await;
    let page = page?;

    report_degraded(&page.outcome);
    print_result(page.outcome.result());
    Ok(())
}

pub async fn run_categories(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let categories = store.list_filter_categories().await;
    store.pool().close().await;
    let categories = categories?;

    if categories.is_empty() {
        println!("No categories.");
        return Ok(());
    }
    for category in categories {
        println!("{:>4}  {}", category.id, category.name);
    }
    Ok(())
}
