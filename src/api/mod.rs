//! API layer - HTTP handlers and routing
//!
//! - JSON endpoints under `/api` (public, authenticated and admin groups)
//! - Server-rendered pages at the site root
//! - `/health`
//! - Uploaded files under `/uploads`, embedded assets under `/static`

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod common;
pub mod contact;
pub mod donations;
pub mod events;
pub mod health;
pub mod images;
pub mod middleware;
pub mod newsletter;
pub mod pages;
pub mod rooms;
pub mod static_files;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::services::upload::UPLOAD_URL_PREFIX;

pub use middleware::{ApiError, AppState, AuthenticatedUser, CurrentUser, RequestStats};

/// Build the `/api` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but not admin)
    let protected_routes = Router::new()
        .merge(auth::protected_router())
        .merge(bookings::protected_router())
        .merge(upload::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .merge(auth::public_router())
        .merge(contact::router())
        .merge(newsletter::router())
        .merge(rooms::router())
        .merge(events::router())
        .merge(donations::router())
        .merge(images::router())
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = build_cors(cors_origin);
    let body_limit = state.upload_config.max_request_size();
    let upload_dir = ServeDir::new(&state.upload_config.path);

    let page_routes = pages::router()
        .fallback(pages::not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ));

    Router::new()
        .nest("/api", build_api_router(state.clone()))
        .route("/health", get(health::health))
        .route("/static/{*path}", get(static_files::serve_static))
        .nest_service(UPLOAD_URL_PREFIX, upload_dir)
        .merge(page_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // Request stats middleware (outermost layer, runs for all requests)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .with_state(state)
}

/// CORS for the configured origin; an unparsable origin disables cross-origin access
fn build_cors(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    match origin.parse::<HeaderValue>() {
        Ok(value) => cors.allow_origin(value),
        Err(_) => {
            tracing::warn!(origin, "Ignoring invalid CORS origin");
            cors
        }
    }
}
