//! CORS policy for the browser front-end.
//!
//! The refresh token travels in a cookie, so credentialed requests must be allowed.
//! That rules out wildcard origins: exactly one configured origin is echoed back.
//!
//! Policy:
//! - Development: `http://localhost:3000` unless FRONTEND_ORIGIN overrides it.
//! - Production: FRONTEND_ORIGIN (required by Config).

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::Config;

/// Apply CORS policy to the given Router.
pub fn apply(router: Router, config: &Config) -> Router {
    router.layer(layer(&config.frontend_origin))
}

fn layer(origin: &str) -> CorsLayer {
    let cors = match HeaderValue::from_str(origin) {
        Ok(origin) => CorsLayer::new().allow_origin(AllowOrigin::list([origin])),
        Err(_) => {
            // Config validates the origin; an unusable value means no CORS headers at all.
            tracing::warn!(origin, "frontend origin is not a valid header value");
            CorsLayer::new()
        }
    };

    cors.allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-request-id"),
        ])
        .max_age(std::time::Duration::from_secs(60 * 5))
}
