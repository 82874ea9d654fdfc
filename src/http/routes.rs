//! HTTP routes for the roster API.

use axum::extract::{Query, State};
use axum::middleware;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, instrument};
use utoipa::{OpenApi, ToSchema};

use super::admission::{admission_middleware, AdmissionState, RateLimitBody};
use crate::error::{Result, RosterError};
use crate::roster::{parse_org_id, Employee, FilterMetadata, RosterStore, SearchQuery};

/// State shared by the route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Roster backing store
    pub store: Arc<dyn RosterStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn RosterStore>) -> Self {
        Self { store }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// RFC 3339 timestamp of the check
    pub timestamp: String,
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Employee Search API"),
    paths(search_employees, filter_metadata, health),
    components(schemas(Employee, FilterMetadata, HealthResponse, RateLimitBody)),
    tags((name = "search", description = "Employee roster search"))
)]
pub struct ApiDoc;

/// Build the application router with admission control applied to every
/// route, including the fallback.
pub fn router(state: AppState, admission: AdmissionState) -> Router {
    let routes = Router::new()
        .route("/employees/search", get(search_employees))
        .route("/employees/filters/metadata", get(filter_metadata))
        .route("/health", get(health))
        .route("/openapi.json", get(openapi_json))
        .fallback(not_found)
        .with_state(state);

    with_admission(routes, admission)
}

/// Wrap `routes` in request tracing and admission control.
///
/// Handler panics are turned into 500 responses below the admission layer,
/// so they are charged as failures like any other server error.
pub fn with_admission(routes: Router, admission: AdmissionState) -> Router {
    routes.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(middleware::from_fn_with_state(admission, admission_middleware))
            .layer(CatchPanicLayer::new()),
    )
}

/// Search an organization's employees.
///
/// Each result contains only the organization's visible columns.
#[utoipa::path(
    get,
    path = "/employees/search",
    params(
        ("org_id" = i64, Query, description = "Organization to search"),
        ("q" = Option<String>, Query, description = "Substring of name, email or phone"),
        ("status" = Option<Vec<String>>, Query, description = "Allowed statuses"),
        ("locations" = Option<Vec<String>>, Query, description = "Allowed locations"),
        ("departments" = Option<Vec<String>>, Query, description = "Allowed departments"),
        ("positions" = Option<Vec<String>>, Query, description = "Allowed positions"),
        ("offset" = Option<usize>, Query, description = "Results to skip"),
        ("limit" = Option<usize>, Query, description = "Page size, at most 500"),
    ),
    responses(
        (status = 200, description = "Projected employee records", body = [Employee]),
        (status = 404, description = "Organization config not found"),
        (status = 422, description = "Invalid query parameters"),
        (status = 429, description = "Rate limit exceeded", body = RateLimitBody)
    ),
    tag = "search"
)]
#[instrument(skip(state, pairs))]
async fn search_employees(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Map<String, Value>>>> {
    let query = SearchQuery::from_pairs(&pairs)?;

    let columns = state
        .store
        .org_columns(query.org_id)
        .await?
        .filter(|columns| !columns.is_empty())
        .ok_or_else(|| RosterError::NotFound("Organization config not found".to_string()))?;

    let employees = state.store.search(&query).await?;
    debug!(
        org_id = query.org_id,
        results = employees.len(),
        "Search completed"
    );

    Ok(Json(
        employees.iter().map(|e| e.project(&columns)).collect(),
    ))
}

/// Distinct filter values for an organization.
#[utoipa::path(
    get,
    path = "/employees/filters/metadata",
    params(("org_id" = i64, Query, description = "Organization")),
    responses(
        (status = 200, description = "Filter values", body = FilterMetadata),
        (status = 422, description = "Invalid query parameters"),
        (status = 429, description = "Rate limit exceeded", body = RateLimitBody)
    ),
    tag = "search"
)]
async fn filter_metadata(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<FilterMetadata>> {
    let org_id = parse_org_id(&pairs)?;
    Ok(Json(state.store.filter_metadata(org_id).await?))
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn not_found() -> RosterError {
    RosterError::NotFound("Not Found".to_string())
}
