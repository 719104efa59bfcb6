//! # trixel-tags HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /trids/{trid}` - Tags of a trixel
//! - `DELETE /trids/{trid}/tag/{tag}` - Remove a tag from a trixel
//! - `GET /tags/` - All tags in use
//! - `GET /tags/{tag}` - Trixels carrying a tag
//! - `POST /tags/{tag}` - Tag the trixel named in the request body
//! - `POST /tags/` - Same, with the empty tag
//! - `GET /health` - Health check
//!
//! Tags are the rest of the path and may contain `/`. Anything else falls
//! through to the static directory when one is configured.
//!
//! ## Security Configuration
//!
//! - `cors_origins`: comma-separated origins, or "*" for all (default: localhost only)
//! - `rate_limit`: requests per second (default: 100, 0 to disable)
//! - `api_key`: if set, `POST` and `DELETE` require a Bearer token

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{ApiKey, keys_match};
pub use handlers::{
    all_tags_handler, empty_tag_handler, health_handler, ids_of_handler, tag_handler,
    tags_of_handler, untag_handler,
};
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{ApiError, ErrorResponse, HealthResponse, trid_from_body, validate_trid};

use crate::{AppError, Config};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{delete, get},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use trixel_tags_core::TagEngine;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// The index. Internally synchronized, so no outer lock.
    pub engine: Arc<TagEngine>,
    /// Effective configuration.
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new app state around an engine.
    #[must_use]
    pub fn new(engine: TagEngine, config: Config) -> Self {
        Self {
            engine: Arc::new(engine),
            config: Arc::new(config),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer.
///
/// - `"*"`: allows all origins
/// - unset: localhost only
/// - otherwise: the comma-separated list, falling back to localhost when
///   none of the entries parse
fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    match origins {
        Some("*") => {
            tracing::warn!("CORS: allowing ALL origins, not suitable for production");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!(origin = trimmed, "CORS: allowing origin");
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!(origin = trimmed, error = %e, "CORS: invalid origin");
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: no valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                cors_with_origins(allowed_origins)
            }
        }
        None => build_localhost_cors(),
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse().ok())
    .collect();

    cors_with_origins(origins)
}

fn cors_with_origins(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting (if enabled)
/// 5. Authentication of mutating requests (if configured)
pub fn create_router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);
    let cors = build_cors_layer(config.security.cors_origins.as_deref());

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/trids/{trid}", get(handlers::tags_of_handler))
        .route("/trids/{trid}/tag/{*tag}", delete(handlers::untag_handler))
        .route(
            "/tags",
            get(handlers::all_tags_handler).post(handlers::empty_tag_handler),
        )
        .route(
            "/tags/",
            get(handlers::all_tags_handler).post(handlers::empty_tag_handler),
        )
        .route(
            "/tags/{*tag}",
            get(handlers::ids_of_handler).post(handlers::tag_handler),
        );

    if let Some(dir) = &config.server.static_dir {
        tracing::info!(dir = %dir.display(), "serving static files");
        router = router.fallback_service(ServeDir::new(dir));
    }

    if let Some(key) = config.api_key() {
        tracing::info!("API key authentication enabled for POST and DELETE");
        router = router.layer(axum_middleware::from_fn_with_state(
            ApiKey(Arc::from(key)),
            auth::api_key_auth_middleware,
        ));
    } else {
        tracing::warn!(
            "API key authentication DISABLED - anyone can add or remove tags. \
             Set TRIXEL_TAGS_API_KEY to enable it."
        );
    }

    match middleware::create_rate_limiter(config.security.rate_limit) {
        Some(limiter) => {
            tracing::info!(rps = config.security.rate_limit, "rate limiting enabled");
            router = router.layer(axum_middleware::from_fn_with_state(
                limiter,
                middleware::rate_limit_middleware,
            ));
        }
        None => tracing::info!("rate limiting disabled"),
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(config.server.body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and run until Ctrl+C.
pub async fn run_server(state: AppState) -> Result<(), AppError> {
    let addr = state.config.bind_addr();
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Io(format!("bind {}: {}", addr, e)))?;

    tracing::info!(%addr, "trixel-tags HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Io(format!("server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
