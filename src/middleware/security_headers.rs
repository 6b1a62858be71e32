//! Default security response headers.
//!
//! Every response, including gate rejections, gets:
//! - no caching of (possibly authenticated) content
//! - MIME sniffing and framing disabled
//! - the legacy XSS auditor disabled (`0`)
//!
//! Handlers may set their own value first; these only fill in missing headers.

use axum::Router;
use axum::http::header::{self, HeaderName, HeaderValue};
use tower_http::set_header::SetResponseHeaderLayer;

fn defaults() -> [(HeaderName, &'static str); 6] {
    [
        (
            header::CACHE_CONTROL,
            "no-cache, no-store, max-age=0, must-revalidate",
        ),
        (header::PRAGMA, "no-cache"),
        (header::EXPIRES, "0"),
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::X_FRAME_OPTIONS, "DENY"),
        (header::X_XSS_PROTECTION, "0"),
    ]
}

pub fn apply(router: Router) -> Router {
    defaults().into_iter().fold(router, |router, (name, value)| {
        router.layer(SetResponseHeaderLayer::if_not_present(
            name,
            HeaderValue::from_static(value),
        ))
    })
}
