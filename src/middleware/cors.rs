//! CORS for browser clients of the resource server.
//!
//! Applied outside the access gate: every `OPTIONS` request (a preflight never
//! carries a bearer token) is answered here with headers only and never
//! reaches a handler.
//! Credentials (cookies) are never allowed; the bearer header is the only
//! credential this API reads.

use std::time::Duration;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::Config;

const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(600);

/// development: any origin. production: exact allowlist, empty allows none.
fn allow_origin(config: &Config) -> AllowOrigin {
    if !config.app_env.is_production() {
        return Any.into();
    }

    let origins = config
        .cors_allowed_origins
        .iter()
        // tower-http panics on a wildcard inside a list
        .filter(|origin| origin.as_str() != "*")
        .filter_map(|origin| HeaderValue::from_str(origin).ok());

    AllowOrigin::list(origins)
}

pub fn apply(router: Router, config: &Config) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allow_origin(config))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-request-id"),
        ])
        // the 401 challenge must be readable from scripts
        .expose_headers([header::WWW_AUTHENTICATE])
        .max_age(PREFLIGHT_MAX_AGE);

    router.layer(cors)
}
