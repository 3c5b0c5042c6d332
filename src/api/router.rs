//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Middleware stack on protected routes (outermost → innermost):
//! 1. Auth validator → 2. Audit logger

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the MDT API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn mdt_api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

fn build_router(ctx: ApiContext) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/diagnosis/symptoms", get(endpoints::diagnosis::symptoms))
        .route("/diagnosis/analyze", post(endpoints::diagnosis::analyze))
        .route("/me", get(endpoints::profile::me))
        .route("/permissions", get(endpoints::profile::permissions))
        .route("/roster", get(endpoints::profile::roster))
        .route(
            "/admin/grades",
            get(endpoints::grades::list).post(endpoints::grades::create),
        )
        .route(
            "/admin/grades/:id",
            put(endpoints::grades::update).delete(endpoints::grades::delete),
        )
        .route(
            "/admin/users",
            get(endpoints::users::list).post(endpoints::users::create),
        )
        .route(
            "/admin/users/:id",
            put(endpoints::users::update).delete(endpoints::users::delete),
        )
        .route("/admin/logs", get(endpoints::logs::recent))
        .route("/admin/stats", get(endpoints::logs::stats))
        .with_state(ctx.clone())
        // Middleware stack (innermost first, outermost last):
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    let unprotected = Router::new()
        .route("/health", get(endpoints::health::check))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::Extension(ctx));

    Router::new()
        .nest("/api", protected)
        .nest("/api", unprotected)
}
