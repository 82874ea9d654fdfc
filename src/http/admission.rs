//! Admission middleware: applies the rate limiter to every inbound request.

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use utoipa::ToSchema;

use super::identity::resolve_identity;
use crate::ratelimit::RateLimiter;

/// Operational endpoints that are never rate limited (exact match).
pub const BYPASS_PATHS: &[&str] = &[
    "/health",
    "/docs",
    "/docs/oauth2-redirect",
    "/redoc",
    "/openapi.json",
];

/// Whether `path` skips admission control entirely.
pub fn is_bypassed(path: &str) -> bool {
    BYPASS_PATHS.contains(&path)
}

/// State shared by every invocation of [`admission_middleware`].
#[derive(Clone)]
pub struct AdmissionState {
    /// The process-wide limiter
    pub limiter: Arc<RateLimiter>,
    /// Charge a penalty when an admitted request ends in a server error
    pub penalize_failures: bool,
}

impl AdmissionState {
    /// Create admission state that penalizes downstream failures.
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self {
            limiter,
            penalize_failures: true,
        }
    }
}

/// Body of a 429 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RateLimitBody {
    pub error: String,
    pub message: String,
    pub detail: String,
    /// Seconds until the caller should retry
    pub retry_after: u64,
}

/// The response sent when an identity has used up its window.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitRejection {
    limit: u32,
    retry_after: u64,
}

impl RateLimitRejection {
    /// Build the rejection for a limiter configured with `limit` per `window`.
    pub fn new(limit: u32, window: Duration) -> Self {
        let mut retry_after = window.as_secs();
        if window.subsec_nanos() > 0 {
            retry_after += 1;
        }
        Self { limit, retry_after }
    }

    /// The JSON body of this rejection.
    pub fn body(&self) -> RateLimitBody {
        RateLimitBody {
            error: "Rate limit exceeded".to_string(),
            message: "Too many requests. Please try again later.".to_string(),
            detail: format!(
                "Rate limit: {} requests per {} seconds",
                self.limit, self.retry_after
            ),
            retry_after: self.retry_after,
        }
    }
}

impl IntoResponse for RateLimitRejection {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(self.body())).into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(self.retry_after));
        response
    }
}

/// Gate a request on the limiter.
///
/// Rejected requests never reach the wrapped handler. Admitted requests that
/// come back with a 5xx status are charged a penalty entry; the response is
/// passed through unchanged either way.
pub async fn admission_middleware(
    State(state): State<AdmissionState>,
    request: Request,
    next: Next,
) -> Response {
    if is_bypassed(request.uri().path()) {
        return next.run(request).await;
    }

    let identity = resolve_identity(&request);
    let path = request.uri().path().to_string();

    if !state.limiter.is_allowed(&identity) {
        warn!(identity = %identity, path = %path, "Rate limit exceeded");
        return RateLimitRejection::new(state.limiter.limit(), state.limiter.window())
            .into_response();
    }

    let response = next.run(request).await;

    if state.penalize_failures && response.status().is_server_error() {
        state.limiter.record_penalty(&identity);
        warn!(
            identity = %identity,
            path = %path,
            status = response.status().as_u16(),
            "Downstream failure charged to client"
        );
    }

    response
}
