/// HTTP routing
use crate::{api, middleware, state::AppState};
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

/// Build the application router
pub fn create_router(app_state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(api::health::health))
        .route("/auth/login", post(api::auth::login))
        .route("/auth/refresh", post(api::auth::refresh));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/me", get(api::users::me))
        // Queue
        .route(
            "/queue",
            get(api::queue::list_queue).post(api::queue::enqueue),
        )
        .route("/queue/head", get(api::queue::get_head))
        .route("/queue/snapshot", get(api::queue::get_snapshot))
        .route("/queue/start", post(api::queue::start))
        .route("/queue/:id/vote", post(api::queue::vote))
        .route("/queue/:id/advance", post(api::queue::advance))
        .route(
            "/queue/:id/tally/recompute",
            post(api::queue::recompute_tally),
        )
        .layer(axum_middleware::from_fn_with_state(
            Arc::clone(&app_state.auth_service),
            middleware::auth_middleware,
        ));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
