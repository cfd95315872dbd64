use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use mealplan::{
    api::{handlers::AppState, routes},
    cache::{CacheStore, MemoryStore},
    config::{
        CacheConfig, DatabaseConfig, LimiterConfig, LlmConfig, ProviderConfig, ServerConfig,
        Settings,
    },
    db,
    intent::QueryTranslator,
    limiter::RateLimiter,
    llm::LlmClient,
    notify::Notifier,
    provider::ProviderClient,
    retriever::RecipeRetriever,
    similarity::{EmbeddingIndexer, SimilaritySearch},
    Error, Result,
};
use std::sync::Arc;
use tower::ServiceExt;

/// Translator stand-in: a canned structured filter, or a hard failure.
struct TranslatorLlm {
    chat: Option<serde_json::Value>,
}

#[async_trait]
impl LlmClient for TranslatorLlm {
    async fn chat_json(&self, _system: &str, _user: &str) -> Result<serde_json::Value> {
        self.chat
            .clone()
            .ok_or_else(|| Error::Llm("model unavailable".to_string()))
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }
}

async fn build_app(provider_url: &str, chat: Option<serde_json::Value>) -> Router {
    let settings = Settings {
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 5,
            min_connections: 1,
            connection_timeout_seconds: 30,
            idle_timeout_seconds: 600,
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_request_body_size: 1048576,
        },
        provider: ProviderConfig {
            api_key: "test-key".to_string(),
            base_url: provider_url.to_string(),
            timeout_seconds: 5,
            default_results: 6,
            max_results: 25,
        },
        llm: LlmConfig {
            api_key: "test-key".to_string(),
            base_url: "http://unused.invalid".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimensions: 2,
            timeout_seconds: 5,
        },
        cache: CacheConfig { ttl_seconds: 3600 },
        limiter: LimiterConfig {
            window_seconds: 60,
            max_requests: 1000,
        },
    };

    let pool = db::init_pool("sqlite::memory:").await.unwrap();
    db::run_migrations(&pool).await.unwrap();

    let llm: Arc<dyn LlmClient> = Arc::new(TranslatorLlm { chat });
    let provider = ProviderClient::new(&settings.provider).unwrap();
    let kv_store = Arc::new(MemoryStore::new());
    let cache = CacheStore::new(kv_store.clone(), settings.cache.ttl_seconds);
    let limiter = RateLimiter::new(kv_store, &settings.limiter);
    let translator = QueryTranslator::new(llm.clone());
    let retriever = RecipeRetriever::new(translator, provider, cache);
    let indexer = EmbeddingIndexer::new(llm);
    let similarity = SimilaritySearch::new(indexer.clone());

    let state = AppState {
        pool,
        retriever,
        similarity,
        indexer,
        limiter,
        notifier: Notifier::start(8),
        settings,
    };

    routes::create_router(state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-user-id", "1")
        .body(Body::empty())
        .unwrap()
}

const EMPTY_RESULTS: &str = r#"{"results":[],"totalResults":0}"#;

#[tokio::test]
async fn test_manual_filters_override_translated_ones_except_ingredients() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/recipes/complexSearch")
        .match_query(mockito::Matcher::AllOf(vec![
            mockito::Matcher::UrlEncoded("cuisine".into(), "mexican".into()),
            mockito::Matcher::UrlEncoded("includeIngredients".into(), "egg,cheese".into()),
            mockito::Matcher::UrlEncoded("sort".into(), "max-used-ingredients".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(EMPTY_RESULTS)
        .expect(1)
        .create_async()
        .await;

    let app = build_app(
        &server.url(),
        Some(serde_json::json!({
            "cuisine": "italian",
            "includeIngredients": ["egg"]
        })),
    )
    .await;

    let response = app
        .oneshot(get(
            "/api/recipes/search?q=something%20with%20egg&cuisine=mexican&includeIngredients=cheese",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_translator_failure_falls_back_to_raw_query() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/recipes/complexSearch")
        .match_query(mockito::Matcher::AllOf(vec![
            mockito::Matcher::UrlEncoded("query".into(), "spicy tofu stir fry".into()),
            mockito::Matcher::UrlEncoded("sort".into(), "popularity".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(EMPTY_RESULTS)
        .expect(1)
        .create_async()
        .await;

    let app = build_app(&server.url(), None).await;
    let response = app
        .oneshot(get("/api/recipes/search?q=spicy%20tofu%20stir%20fry"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_repeated_searches_reuse_the_cached_payload() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/recipes/complexSearch")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"results":[{"id":7,"title":"Pad Thai"}],"totalResults":1}"#)
        .expect(1)
        .create_async()
        .await;

    let app = build_app(&server.url(), None).await;

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(get("/api/recipes/search?cuisine=thai"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body[0]["id"], 7);
    }

    mock.assert_async().await;
}

#[tokio::test]
async fn test_detail_lookups_are_cached_independently_of_searches() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/recipes/7/information")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":7,"title":"Pad Thai","readyInMinutes":25}"#)
        .expect(1)
        .create_async()
        .await;

    let app = build_app(&server.url(), None).await;

    for _ in 0..2 {
        let response = app.clone().oneshot(get("/api/recipes/7")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["title"], "Pad Thai");
    }

    mock.assert_async().await;
}

#[tokio::test]
async fn test_provider_failure_maps_to_a_generic_upstream_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/recipes/complexSearch")
        .match_query(mockito::Matcher::Any)
        .with_status(500)
        .with_body("internal provider error with secrets")
        .create_async()
        .await;

    let app = build_app(&server.url(), None).await;
    let response = app
        .oneshot(get("/api/recipes/search?cuisine=thai"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "Recipe provider unavailable, please try again");

    let text = body.to_string();
    assert!(!text.contains("secrets"));
}

#[tokio::test]
async fn test_unknown_recipe_surfaces_as_not_found() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/recipes/9999/information")
        .match_query(mockito::Matcher::Any)
        .with_status(404)
        .with_body(r#"{"message":"A recipe with the id 9999 does not exist"}"#)
        .create_async()
        .await;

    let app = build_app(&server.url(), None).await;
    let response = app.oneshot(get("/api/recipes/9999")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
