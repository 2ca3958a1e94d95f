//! JSON HTTP API for the course catalog.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/search` | Keyword search (`q`, `page`, `sortBy`, `sortOrder`, `category`) |
//! | `POST` | `/search` | Same, from a form (`q` or `searchInput`); query-string fields take precedence |
//! | `GET`  | `/courses` | Filtered browse listing |
//! | `GET`  | `/courses/{id}` | Course detail |
//! | `GET`  | `/categories` | Topics usable as filters |
//! | `GET`  | `/admin/courses` | All courses, optional `category` / `instructor` |
//! | `POST` | `/admin/courses/{id}/delete` | Cascading delete |
//! | `POST` | `/admin/courses/{id}/lock` | Hide a course |
//! | `POST` | `/admin/courses/{id}/unlock` | Show a course again |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "query_too_long", "message": "query too long: 101 characters (max 100)" } }
//! ```
//!
//! Error codes: `bad_request` (400), `query_too_long` (400), `not_found` (404),
//! `internal` (500).
//!
//! Query strings and form bodies are decoded leniently: a repeated parameter
//! keeps its first value and unknown parameters are ignored. A non-numeric
//! course id in the path is a `bad_request`.
//!
//! Store failures during search or listing are not errors: the response is
//! a normal `200` with an empty page and `error_message` set.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use url::form_urlencoded;

use coursemart_core::error::QueryError;
use coursemart_core::models::CategoryOption;
use coursemart_core::normalize::{
    parse_category, sort_key, RawListingParams, RawSearchParams, SearchQuery, SortBy,
};
use coursemart_core::paginate::SearchResult;
use coursemart_core::search::{list_courses, search_courses, SearchOutcome};
use coursemart_core::store::CourseStore;

use crate::admin::{self, AdminCourse};
use crate::config::Config;
use crate::course::{self, CourseDetail};
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<SqliteStore>,
}

impl AppState {
    pub fn new(config: Arc<Config>, store: Arc<SqliteStore>) -> Self {
        Self { config, store }
    }
}

/// Build the router with every route and layer attached.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/search", get(handle_search_get).post(handle_search_post))
        .route("/courses", get(handle_list_courses))
        .route("/courses/{id}", get(handle_course_detail))
        .route("/categories", get(handle_categories))
        .route("/admin/courses", get(handle_admin_list))
        .route("/admin/courses/{id}/delete", post(handle_admin_delete))
        .route("/admin/courses/{id}/lock", post(handle_admin_lock))
        .route("/admin/courses/{id}/unlock", post(handle_admin_unlock))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server.
///
/// Binds to the address configured in `[server].bind`. The server runs
/// until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let pool = db::connect(config).await?;
    let state = AppState::new(Arc::new(config.clone()), Arc::new(SqliteStore::new(pool)));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "server listening");
    println!("Coursemart server listening on http://{}", bind_addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Error type that converts into an Axum HTTP response.
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::KeywordTooLong { .. } => AppError {
                status: StatusCode::BAD_REQUEST,
                code: "query_too_long".to_string(),
                message: err.to_string(),
            },
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

/// Logs the full error chain and returns a generic 500.
fn internal(context: &str, err: anyhow::Error) -> AppError {
    tracing::error!(error = %format!("{:#}", err), "{}", context);
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: context.to_string(),
    }
}

fn log_degraded(outcome: &SearchOutcome) {
    if let Some(cause) = outcome.cause() {
        tracing::error!(error = %cause, "course search degraded");
    }
}

/// Category options for the filter UI. A failure here is logged and
/// rendered as an empty list.
async fn filter_categories(state: &AppState) -> Vec<CategoryOption> {
    match state.store.list_filter_categories().await {
        Ok(categories) => categories,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "failed to load categories");
            Vec::new()
        }
    }
}

// ============ GET|POST /search ============

#[derive(Serialize)]
pub struct SearchResponse {
    /// Trimmed, HTML-escaped keyword.
    pub keyword: String,
    pub category: Option<i64>,
    pub sort_by: &'static str,
    /// `/search?...` with every parameter except `page`.
    pub base_url: String,
    pub categories: Vec<CategoryOption>,
    #[serde(flatten)]
    pub result: SearchResult,
    pub error_message: Option<&'static str>,
}

fn search_base_url(query: &SearchQuery) -> String {
    let mut params = form_urlencoded::Serializer::new(String::new());
    params.append_pair("q", &query.plain_keyword());
    if let Some(category) = query.category {
        params.append_pair("category", &category.to_string());
    }
    params.append_pair("sortBy", query.sort_key());
    if query.sort_by == SortBy::Rating {
        params.append_pair("sortOrder", &query.sort_order.as_sql().to_ascii_lowercase());
    }
    format!("/search?{}", params.finish())
}

async fn run_search(state: &AppState, raw: &RawSearchParams) -> Result<SearchResponse, AppError> {
    let page = search_courses(state.store.as_ref(), raw).await?;
    log_degraded(&page.outcome);
    let categories = filter_categories(state).await;

    Ok(SearchResponse {
        base_url: search_base_url(&page.query),
        sort_by: page.query.sort_key(),
        category: page.query.category,
        error_message: page.outcome.error_message(),
        result: page.outcome.into_result(),
        keyword: page.query.keyword,
        categories,
    })
}

/// Decoded pairs of a query string or urlencoded body. Malformed escapes
/// decode lossily instead of failing.
fn pairs(input: &[u8]) -> form_urlencoded::Parse<'_> {
    form_urlencoded::parse(input)
}

async fn handle_search_get(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<SearchResponse>, AppError> {
    let raw = RawSearchParams::from_pairs(pairs(query.unwrap_or_default().as_bytes()));
    Ok(Json(run_search(&state, &raw).await?))
}

/// The query string decides paging, sorting and category; the form body
/// fills whatever the query string leaves out, usually the keyword.
async fn handle_search_post(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Json<SearchResponse>, AppError> {
    let from_query = RawSearchParams::from_pairs(pairs(query.unwrap_or_default().as_bytes()));
    let raw = from_query.or(RawSearchParams::from_pairs(pairs(&body)));
    Ok(Json(run_search(&state, &raw).await?))
}

// ============ GET /courses ============

#[derive(Serialize)]
pub struct ListingResponse {
    pub sort_by: &'static str,
    #[serde(flatten)]
    pub result: SearchResult,
    pub error_message: Option<&'static str>,
}

async fn handle_list_courses(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<ListingResponse>, AppError> {
    let raw = RawListingParams::from_pairs(pairs(query.unwrap_or_default().as_bytes()));
    let listing = &state.config.listing;
    let page = list_courses(
        state.store.as_ref(),
        &raw,
        listing.page_size,
        listing.active_only,
    )
    .await?;
    log_degraded(&page.outcome);

    Ok(Json(ListingResponse {
        sort_by: sort_key(page.query.sort_by, page.query.sort_order),
        error_message: page.outcome.error_message(),
        result: page.outcome.into_result(),
    }))
}

// ============ GET /courses/{id} ============

async fn handle_course_detail(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<CourseDetail>, AppError> {
    let Path(id) = path?;
    let detail = course::get_course(state.store.pool(), id)
        .await
        .map_err(|e| internal("failed to load course", e))?
        .ok_or_else(|| not_found(format!("course not found: {}", id)))?;
    Ok(Json(detail))
}

// ============ GET /categories ============

#[derive(Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<CategoryOption>,
}

async fn handle_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoriesResponse>, AppError> {
    let categories = state
        .store
        .list_filter_categories()
        .await
        .map_err(|e| internal("failed to load categories", e))?;
    Ok(Json(CategoriesResponse { categories }))
}

// ============ /admin/courses ============

#[derive(Default)]
struct AdminListParams {
    category: Option<String>,
    instructor: Option<String>,
}

impl AdminListParams {
    fn from_query(query: Option<&str>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs(query.unwrap_or_default().as_bytes()) {
            let slot = match key.as_ref() {
                "category" => &mut params.category,
                "instructor" => &mut params.instructor,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }
}

#[derive(Serialize)]
pub struct AdminListResponse {
    pub courses: Vec<AdminCourse>,
}

async fn handle_admin_list(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<AdminListResponse>, AppError> {
    let params = AdminListParams::from_query(query.as_deref());
    let instructor = match params.instructor.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| bad_request(format!("invalid instructor id: {}", raw)))?,
        ),
    };
    let courses = admin::list_courses_admin(
        state.store.pool(),
        parse_category(params.category.as_deref()),
        instructor,
    )
    .await
    .map_err(|e| internal("failed to list courses", e))?;
    Ok(Json(AdminListResponse { courses }))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub id: i64,
    pub deleted: bool,
}

async fn handle_admin_delete(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<DeleteResponse>, AppError> {
    let Path(id) = path?;
    let deleted = admin::delete_course(state.store.pool(), id)
        .await
        .map_err(|e| internal("failed to delete course", e))?;
    if !deleted {
        return Err(not_found(format!("course not found: {}", id)));
    }
    Ok(Json(DeleteResponse { id, deleted }))
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub id: i64,
    pub is_active: bool,
}

async fn set_active(
    state: &AppState,
    id: i64,
    active: bool,
) -> Result<Json<StatusResponse>, AppError> {
    let updated = admin::set_course_active(state.store.pool(), id, active)
        .await
        .map_err(|e| internal("failed to update course", e))?;
    if !updated {
        return Err(not_found(format!("course not found: {}", id)));
    }
    Ok(Json(StatusResponse {
        id,
        is_active: active,
    }))
}

async fn handle_admin_lock(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<StatusResponse>, AppError> {
    let Path(id) = path?;
    set_active(&state, id, false).await
}

async fn handle_admin_unlock(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<StatusResponse>, AppError> {
    let Path(id) = path?;
    set_active(&state, id, true).await
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
