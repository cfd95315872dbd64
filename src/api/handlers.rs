use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, Path, Query, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
    Json,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tracing::debug;

use crate::{
    api::models::*,
    db,
    limiter::RateLimiter,
    notify::{Event, Notifier},
    provider::{RecipeDetail, RecipeSummary},
    retriever::RecipeRetriever,
    similarity::{EmbeddingIndexer, SimilaritySearch},
    Error, Result,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::SqlitePool,
    pub retriever: RecipeRetriever,
    pub similarity: SimilaritySearch,
    pub indexer: EmbeddingIndexer,
    pub limiter: RateLimiter,
    pub notifier: Notifier,
    pub settings: crate::config::Settings,
}

/// Authenticated caller identity. Session issuance is an upstream
/// concern; the session layer in front of this service sets `x-user-id`
/// on every proxied request.
pub struct UserId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let header = parts
            .headers
            .get("x-user-id")
            .ok_or_else(|| Error::Validation("Missing x-user-id header".to_string()))?;

        let user_id = header
            .to_str()
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|id| *id > 0)
            .ok_or_else(|| Error::Validation("Invalid x-user-id header".to_string()))?;

        Ok(UserId(user_id))
    }
}

/// Admission-control middleware for the discovery routes, keyed by peer
/// address. Requests without connection info (in-process test calls) fall
/// back to localhost.
pub async fn rate_limit(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let client_ip = connect_info
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

    let decision = state.limiter.admit(client_ip).await;
    if !decision.allowed {
        return Err(Error::RateLimited {
            retry_after_seconds: decision
                .retry_after_seconds
                .unwrap_or(state.settings.limiter.window_seconds as i64),
        });
    }

    Ok(next.run(request).await)
}

/// GET /api/recipes/search - Discover recipes from intent and filters
pub async fn search_recipes(
    State(state): State<AppState>,
    _user: UserId,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<RecipeSummary>>> {
    debug!("Search request: {:?}", params);

    let manual = params.manual_filter();
    let query_text = params.query_text();

    if query_text.is_none() && manual.is_empty() {
        return Err(Error::Validation(
            "Provide a query or at least one filter".to_string(),
        ));
    }

    let limit = params
        .limit
        .unwrap_or(state.settings.provider.default_results)
        .clamp(1, state.settings.provider.max_results);

    let results = state.retriever.search(query_text, manual, limit).await?;
    Ok(Json(results))
}

/// GET /api/recipes/:id - Get recipe details
pub async fn get_recipe(
    State(state): State<AppState>,
    _user: UserId,
    Path(id): Path<i64>,
) -> Result<Json<RecipeDetail>> {
    debug!("Get recipe request: {}", id);

    if id <= 0 {
        return Err(Error::Validation("Invalid recipe ID".to_string()));
    }

    let detail = state.retriever.get_details(id).await?;
    Ok(Json(detail))
}

/// GET /api/favorites - List the caller's saved recipes
pub async fn list_favorites(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Json<Vec<RecipeDetail>>> {
    let rows = db::favorites::list_favorites(&state.pool, user_id).await?;
    let details = rows
        .iter()
        .map(|row| row.to_detail())
        .collect::<Result<Vec<_>>>()?;
    Ok(Json(details))
}

/// GET /api/favorites/:id - Get one saved recipe
pub async fn get_favorite(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<i64>,
) -> Result<Json<RecipeDetail>> {
    let row = db::favorites::get_favorite(&state.pool, user_id, id).await?;
    Ok(Json(row.to_detail()?))
}

/// POST /api/favorites - Save a recipe with its embedding
///
/// The embedding runs synchronously before the insert; if it fails the
/// save is aborted so no record exists without a comparable vector.
pub async fn add_favorite(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(recipe): Json<RecipeDetail>,
) -> Result<(axum::http::StatusCode, Json<FavoriteMutation>)> {
    if recipe.id <= 0 || recipe.title.trim().is_empty() {
        return Err(Error::Validation(
            "Recipe must have an id and a title".to_string(),
        ));
    }

    let embedding = state.indexer.embed_recipe(&recipe).await?;
    let inserted = db::favorites::insert_favorite(&state.pool, user_id, &recipe, &embedding).await?;

    if !inserted {
        return Ok((
            axum::http::StatusCode::OK,
            Json(FavoriteMutation {
                message: "Recipe already in favorites".to_string(),
                recipe_id: recipe.id,
            }),
        ));
    }

    state.notifier.enqueue(Event::FavoriteSaved {
        user_id,
        recipe_id: recipe.id,
    });

    Ok((
        axum::http::StatusCode::CREATED,
        Json(FavoriteMutation {
            message: "Recipe added to favorites".to_string(),
            recipe_id: recipe.id,
        }),
    ))
}

/// DELETE /api/favorites/:id - Remove a saved recipe
pub async fn remove_favorite(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<i64>,
) -> Result<Json<FavoriteMutation>> {
    let removed = db::favorites::remove_favorite(&state.pool, user_id, id).await?;
    if !removed {
        return Err(Error::NotFound("Favorite not found".to_string()));
    }

    Ok(Json(FavoriteMutation {
        message: "Favorite removed".to_string(),
        recipe_id: id,
    }))
}

/// GET /api/favorites/search - Semantic search over saved recipes
pub async fn search_favorites(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Query(params): Query<FavoritesSearchParams>,
) -> Result<Json<Vec<RecipeDetail>>> {
    let query = params.query.trim();
    if query.is_empty() {
        return Err(Error::Validation("Invalid search query".to_string()));
    }

    let limit = params.limit.clamp(1, crate::similarity::MAX_TOP_K);
    let results = state
        .similarity
        .search(&state.pool, user_id, query, limit)
        .await?;
    Ok(Json(results))
}

/// GET /health - Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}

/// GET /ready - Readiness check endpoint
pub async fn readiness_check(State(state): State<AppState>) -> Result<Json<ReadinessResponse>> {
    let db_healthy = sqlx::query("SELECT 1").fetch_one(&state.pool).await.is_ok();

    Ok(Json(ReadinessResponse {
        ready: db_healthy,
        database: if db_healthy { "ok" } else { "error" }.to_string(),
    }))
}
