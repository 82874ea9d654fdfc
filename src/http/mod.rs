//! HTTP layer: admission control, routes and the server.

mod admission;
mod identity;
mod routes;
mod server;

pub use admission::{
    admission_middleware, is_bypassed, AdmissionState, RateLimitBody, RateLimitRejection,
    BYPASS_PATHS,
};
pub use identity::{resolve_identity, UNKNOWN_IDENTITY};
pub use routes::{router, with_admission, ApiDoc, AppState, HealthResponse};
pub use server::HttpServer;
