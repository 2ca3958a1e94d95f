//! # Coursemart CLI (`coursemart`)
//!
//! The `coursemart` binary manages the catalog database, runs searches and
//! listings from the terminal, and starts the HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! coursemart --config ./config/coursemart.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `coursemart init` | Create the SQLite database and run schema migrations |
//! | `coursemart import <file>` | Load a JSON catalog snapshot |
//! | `coursemart search "<keyword>"` | Keyword search over active courses |
//! | `coursemart courses` | Filtered browse listing |
//! | `coursemart course show <id>` | Course detail |
//! | `coursemart course delete <id>` | Delete a course and its dependents |
//! | `coursemart course lock <id>` | Hide a course from search |
//! | `coursemart course unlock <id>` | Make a course visible again |
//! | `coursemart categories` | List filterable topics |
//! | `coursemart serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Phrase search, excluding a term, newest first
//! coursemart search '"machine learning" -tensorflow' --sort-by newest
//!
//! # Second page of on-sale web courses under 50
//! coursemart courses --category 5 --on-sale --price-max 50 --page 2
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use coursemart::{admin, config, course, import, migrate, search, server};
use coursemart_core::normalize::{RawListingParams, RawSearchParams};

/// Coursemart CLI: course catalog search and administration.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/coursemart.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "coursemart",
    about = "Coursemart: course catalog search and administration",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/coursemart.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Import a JSON catalog (categories, instructors, courses, activity).
    Import {
        /// Path to the catalog JSON file.
        file: PathBuf,
    },

    /// Search active courses by keyword.
    ///
    /// Supports quoted phrases, `-term` exclusion and `or`. Results come in
    /// pages of six.
    Search {
        /// Keyword; may be empty to list everything.
        #[arg(default_value = "")]
        keyword: String,

        /// 1-based page number.
        #[arg(long)]
        page: Option<String>,

        /// relevance, rating, price, price-asc, price-desc, newest, popular.
        #[arg(long)]
        sort_by: Option<String>,

        /// asc or desc; only affects `rating`.
        #[arg(long)]
        sort_order: Option<String>,

        /// Topic id (0 means all).
        #[arg(long)]
        category: Option<String>,
    },

    /// Browse courses with filters, newest first by default.
    Courses {
        #[arg(long)]
        category: Option<String>,

        /// Level-1 domain id.
        #[arg(long)]
        domain: Option<String>,

        #[arg(long)]
        level: Option<String>,

        /// Title substring.
        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        price_min: Option<String>,

        #[arg(long)]
        price_max: Option<String>,

        #[arg(long)]
        min_rating: Option<String>,

        /// Only courses currently on sale.
        #[arg(long)]
        on_sale: bool,

        #[arg(long)]
        sort_by: Option<String>,

        #[arg(long)]
        sort_order: Option<String>,

        #[arg(long)]
        page: Option<String>,
    },

    /// Inspect or administer a single course.
    Course {
        #[command(subcommand)]
        action: CourseAction,
    },

    /// List topics usable as search filters.
    Categories,

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum CourseAction {
    /// Show course detail, instructor stats, lectures and related courses.
    Show { id: i64 },
    /// Delete a course with its lectures, videos, enrollments and feedback.
    Delete { id: i64 },
    /// Hide a course from search and listings.
    Lock { id: i64 },
    /// Make a locked course visible again.
    Unlock { id: i64 },
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    init_tracing(&cfg.log.filter);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Import { file } => {
            import::run_import(&cfg, &file).await?;
        }
        Commands::Search {
            keyword,
            page,
            sort_by,
            sort_order,
            category,
        } => {
            let params = RawSearchParams {
                keyword: Some(keyword),
                page,
                sort_by,
                sort_order,
                category,
            };
            search::run_search(&cfg, &params).await?;
        }
        Commands::Courses {
            category,
            domain,
            level,
            title,
            price_min,
            price_max,
            min_rating,
            on_sale,
            sort_by,
            sort_order,
            page,
        } => {
            let params = RawListingParams {
                category,
                domain,
                level,
                title,
                price_min,
                price_max,
                min_rating,
                on_sale: on_sale.then(|| "true".to_string()),
                sort_by,
                sort_order,
                page,
            };
            search::run_courses(&cfg, &params).await?;
        }
        Commands::Course { action } => match action {
            CourseAction::Show { id } => course::run_show(&cfg, id).await?,
            CourseAction::Delete { id } => admin::run_delete(&cfg, id).await?,
            CourseAction::Lock { id } => admin::run_set_active(&cfg, id, false).await?,
            CourseAction::Unlock { id } => admin::run_set_active(&cfg, id, true).await?,
        },
        Commands::Categories => {
            search::run_categories(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
