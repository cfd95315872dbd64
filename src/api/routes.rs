use axum::http::{header, HeaderValue, Method};
use axum::middleware;
use axum::{routing::get, Router};
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

use crate::api::handlers::{self, AppState};

/// Create the router with all endpoints
pub fn create_router(state: AppState) -> Router {
    // Discovery routes sit behind the rate limiter; everything under
    // /api requires a caller identity (enforced per-handler)
    let recipe_routes = Router::new()
        .route("/search", get(handlers::search_recipes))
        .route("/:id", get(handlers::get_recipe))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::rate_limit,
        ))
        .with_state(state.clone());

    let favorites_routes = Router::new()
        .route(
            "/",
            get(handlers::list_favorites).post(handlers::add_favorite),
        )
        .route("/search", get(handlers::search_favorites))
        .route(
            "/:id",
            get(handlers::get_favorite).delete(handlers::remove_favorite),
        )
        .with_state(state.clone());

    // Health check routes
    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state.clone());

    Router::new()
        .merge(health_routes)
        .nest("/api/recipes", recipe_routes)
        .nest("/api/favorites", favorites_routes)
        .layer(
            // Request body size limit - saved recipes are bounded payloads
            RequestBodyLimitLayer::new(state.settings.server.max_request_body_size),
        )
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::ACCEPT,
                    header::HeaderName::from_static("x-user-id"),
                ])
                .allow_origin(tower_http::cors::Any)
                .max_age(Duration::from_secs(3600)),
        )
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}
