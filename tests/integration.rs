use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn coursemart_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("coursemart");
    path
}

fn fixture_catalog() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/catalog.json")
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/coursemart.sqlite"

[listing]
page_size = 9
active_only = true

[server]
bind = "127.0.0.1:7340"

[log]
filter = "warn"
"#,
        root.display()
    );

    let config_path = config_dir.join("coursemart.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_coursemart(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = coursemart_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run coursemart binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

/// Init + import the fixture catalog.
fn setup_catalog() -> (TempDir, PathBuf) {
    let (tmp, config_path) = setup_test_env();
    let (stdout, stderr, success) = run_coursemart(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);

    let catalog = fixture_catalog();
    let (stdout, stderr, success) =
        run_coursemart(&config_path, &["import", catalog.to_str().unwrap()]);
    assert!(success, "import failed: stdout={}, stderr={}", stdout, stderr);
    (tmp, config_path)
}

/// Course ids in the order they were printed.
fn printed_ids(stdout: &str) -> Vec<i64> {
    stdout
        .lines()
        .filter_map(|l| l.trim().strip_prefix("id: "))
        .map(|id| id.parse().unwrap())
        .collect()
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_coursemart(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/coursemart.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_coursemart(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_coursemart(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_import_reports_counts() {
    let (_tmp, config_path) = setup_test_env();
    run_coursemart(&config_path, &["init"]);

    let catalog = fixture_catalog();
    let (stdout, stderr, success) =
        run_coursemart(&config_path, &["import", catalog.to_str().unwrap()]);
    assert!(success, "import failed: {}", stderr);
    assert!(stdout.contains("2 domains, 3 topics"));
    assert!(stdout.contains("courses:     20 (2 lectures, 3 videos)"));
}

#[test]
fn test_import_twice_is_idempotent() {
    let (_tmp, config_path) = setup_catalog();

    let catalog = fixture_catalog();
    let (_, stderr, success) =
        run_coursemart(&config_path, &["import", catalog.to_str().unwrap()]);
    assert!(success, "re-import failed: {}", stderr);

    let (stdout, _, _) = run_coursemart(&config_path, &["search", "python"]);
    assert!(stdout.contains("(14 results)"), "stdout: {}", stdout);
}

#[test]
fn test_import_missing_file_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_coursemart(&config_path, &["init"]);

    let (_, stderr, success) = run_coursemart(&config_path, &["import", "/nonexistent.json"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read catalog file"));
}

#[test]
fn test_search_keyword_paginates() {
    let (_tmp, config_path) = setup_catalog();

    let (stdout, stderr, success) = run_coursemart(&config_path, &["search", "python"]);
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.contains("Page 1 of 3 (14 results)"), "stdout: {}", stdout);
    assert_eq!(printed_ids(&stdout).len(), 6);

    let (stdout, _, _) = run_coursemart(&config_path, &["search", "python", "--page", "3"]);
    assert!(stdout.contains("Page 3 of 3 (14 results)"));
    assert_eq!(printed_ids(&stdout).len(), 2);
}

#[test]
fn test_search_excludes_inactive_courses() {
    let (_tmp, config_path) = setup_catalog();

    let (stdout, _, _) = run_coursemart(&config_path, &["search", "python", "--sort-by", "newest"]);
    let ids = printed_ids(&stdout);
    assert_eq!(ids.first(), Some(&14));
    assert!(!ids.contains(&15) && !ids.contains(&16));
}

#[test]
fn test_search_category_and_newest() {
    let (_tmp, config_path) = setup_catalog();

    let (stdout, _, success) = run_coursemart(
        &config_path,
        &["search", "", "--category", "5", "--sort-by", "newest"],
    );
    assert!(success);
    assert!(stdout.contains("(10 results)"), "stdout: {}", stdout);
    assert_eq!(printed_ids(&stdout), vec![19, 18, 17, 14, 12, 10]);
}

#[test]
fn test_search_category_zero_means_all() {
    let (_tmp, config_path) = setup_catalog();

    let (stdout, _, _) = run_coursemart(&config_path, &["search", "python", "--category", "0"]);
    assert!(stdout.contains("(14 results)"));
}

#[test]
fn test_search_price_sorts() {
    let (_tmp, config_path) = setup_catalog();

    // Course 3 is on sale at 5.00, below every list price.
    let (stdout, _, _) =
        run_coursemart(&config_path, &["search", "python", "--sort-by", "price-asc"]);
    assert_eq!(printed_ids(&stdout)[..3], [3, 1, 2]);

    let (stdout, _, _) =
        run_coursemart(&config_path, &["search", "python", "--sort-by", "price-desc"]);
    assert_eq!(printed_ids(&stdout)[0], 14);
}

#[test]
fn test_search_rating_sort_order() {
    let (_tmp, config_path) = setup_catalog();

    let (stdout, _, _) = run_coursemart(&config_path, &["search", "python", "--sort-by", "rating"]);
    assert!(stdout.lines().any(|l| l.starts_with("1. [4.5]")), "stdout: {}", stdout);

    let (stdout, _, _) = run_coursemart(
        &config_path,
        &["search", "python", "--sort-by", "rating", "--sort-order", "asc"],
    );
    assert!(stdout.lines().any(|l| l.starts_with("1. [0.5]")), "stdout: {}", stdout);
}

#[test]
fn test_search_websearch_syntax() {
    let (_tmp, config_path) = setup_catalog();

    let (stdout, _, _) = run_coursemart(&config_path, &["search", "python or go"]);
    assert!(stdout.contains("(17 results)"), "stdout: {}", stdout);

    let (stdout, _, _) = run_coursemart(&config_path, &["search", "python -course"]);
    assert!(stdout.contains("No results."));

    let (stdout, _, _) = run_coursemart(&config_path, &["search", "\"python course 7\""]);
    assert_eq!(printed_ids(&stdout), vec![7]);
}

#[test]
fn test_search_folds_accents() {
    let (_tmp, config_path) = setup_catalog();

    let (stdout, _, _) = run_coursemart(&config_path, &["search", "cafe"]);
    assert_eq!(printed_ids(&stdout), vec![20]);

    let (stdout, _, _) = run_coursemart(&config_path, &["search", "CAFÉS"]);
    assert_eq!(printed_ids(&stdout), vec![20]);
}

#[test]
fn test_search_keyword_too_long_rejected() {
    let (_tmp, config_path) = setup_catalog();

    let long = "a".repeat(101);
    let (_, stderr, success) = run_coursemart(&config_path, &["search", &long]);
    assert!(!success);
    assert!(stderr.contains("query too long"), "stderr: {}", stderr);

    let exact = "a".repeat(100);
    let (stdout, _, success) = run_coursemart(&config_path, &["search", &exact]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_search_page_past_end() {
    let (_tmp, config_path) = setup_catalog();

    let (stdout, _, success) = run_coursemart(&config_path, &["search", "python", "--page", "99"]);
    assert!(success);
    assert!(stdout.contains("No results on page 99 (3 pages, 14 results)."));
}

#[test]
fn test_search_invalid_params_fall_back() {
    let (_tmp, config_path) = setup_catalog();

    let (stdout, _, success) = run_coursemart(
        &config_path,
        &["search", "python", "--page", "abc", "--sort-by", "bogus"],
    );
    assert!(success);
    assert!(stdout.contains("Page 1 of 3"));
}

#[test]
fn test_search_deterministic() {
    let (_tmp, config_path) = setup_catalog();

    let (stdout1, _, _) = run_coursemart(&config_path, &["search", "python", "--sort-by", "popular"]);
    let (stdout2, _, _) = run_coursemart(&config_path, &["search", "python", "--sort-by", "popular"]);
    assert_eq!(stdout1, stdout2);
}

#[test]
fn test_courses_listing_filters() {
    let (_tmp, config_path) = setup_catalog();

    let (stdout, stderr, success) = run_coursemart(&config_path, &["courses"]);
    assert!(success, "courses failed: {}", stderr);
    assert!(stdout.contains("Page 1 of 2 (18 results)"), "stdout: {}", stdout);
    assert_eq!(printed_ids(&stdout).len(), 9);

    let (stdout, _, _) = run_coursemart(&config_path, &["courses", "--domain", "2"]);
    assert_eq!(printed_ids(&stdout), vec![20]);

    let (stdout, _, _) = run_coursemart(&config_path, &["courses", "--on-sale"]);
    assert_eq!(printed_ids(&stdout), vec![3]);

    let (stdout, _, _) = run_coursemart(
        &config_path,
        &["courses", "--level", "beginner", "--price-max", "15"],
    );
    assert_eq!(printed_ids(&stdout), vec![5, 4, 3, 2, 1]);

    let (stdout, _, _) = run_coursemart(&config_path, &["courses", "--title", "programming"]);
    assert_eq!(printed_ids(&stdout), vec![19, 18, 17]);
}

#[test]
fn test_categories() {
    let (_tmp, config_path) = setup_catalog();

    let (stdout, _, success) = run_coursemart(&config_path, &["categories"]);
    assert!(success);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("Web Development"));
    assert!(lines[2].contains("Finance"));
}

#[test]
fn test_categories_empty() {
    let (_tmp, config_path) = setup_test_env();
    run_coursemart(&config_path, &["init"]);

    let (stdout, _, success) = run_coursemart(&config_path, &["categories"]);
    assert!(success);
    assert!(stdout.contains("No categories."));
}

#[test]
fn test_course_show() {
    let (_tmp, config_path) = setup_catalog();

    let (stdout, stderr, success) = run_coursemart(&config_path, &["course", "show", "1"]);
    assert!(success, "show failed: {}", stderr);
    assert!(stdout.contains("title:       Python Course 1"));
    assert!(stdout.contains("Ada Lovelace"));
    assert!(stdout.contains("--- Lectures (2) ---"));
    assert!(stdout.contains("Installing Python"));
}

#[test]
fn test_course_show_missing() {
    let (_tmp, config_path) = setup_catalog();

    let (_, stderr, success) = run_coursemart(&config_path, &["course", "show", "999"]);
    assert!(!success);
    assert!(stderr.contains("course not found"));
}

#[test]
fn test_course_lock_hides_from_search() {
    let (_tmp, config_path) = setup_catalog();

    let (stdout, _, success) = run_coursemart(&config_path, &["course", "lock", "7"]);
    assert!(success);
    assert!(stdout.contains("Course 7 locked"));

    let (stdout, _, _) = run_coursemart(&config_path, &["search", "python"]);
    assert!(stdout.contains("(13 results)"));

    let (stdout, _, _) = run_coursemart(&config_path, &["course", "unlock", "7"]);
    assert!(stdout.contains("Course 7 unlocked"));

    let (stdout, _, _) = run_coursemart(&config_path, &["search", "python"]);
    assert!(stdout.contains("(14 results)"));
}

#[test]
fn test_course_delete() {
    let (_tmp, config_path) = setup_catalog();

    let (stdout, stderr, success) = run_coursemart(&config_path, &["course", "delete", "1"]);
    assert!(success, "delete failed: {}", stderr);
    assert!(stdout.contains("Deleted course 1"));

    let (_, _, success) = run_coursemart(&config_path, &["course", "show", "1"]);
    assert!(!success);

    let (stdout, _, _) = run_coursemart(&config_path, &["search", "python"]);
    assert!(stdout.contains("(13 results)"));

    let (_, stderr, success) = run_coursemart(&config_path, &["course", "delete", "1"]);
    assert!(!success);
    assert!(stderr.contains("course not found"));
}

#[test]
fn test_missing_config_fails() {
    let (_, stderr, success) = run_coursemart(Path::new("/nonexistent/coursemart.toml"), &["init"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
