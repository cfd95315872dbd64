use clap::Parser;
use mealplan::{
    api::{handlers::AppState, routes},
    cache::{CacheStore, MemoryStore},
    cli::{Cli, Commands},
    config::Settings,
    db,
    intent::QueryTranslator,
    limiter::RateLimiter,
    llm::{LlmClient, OpenAiClient},
    notify::Notifier,
    provider::ProviderClient,
    retriever::RecipeRetriever,
    similarity::{EmbeddingIndexer, SimilaritySearch},
    Error, Result,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    // Silently ignore if file doesn't exist
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mealplan=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::from_env()?;

    match cli.command {
        Commands::Serve { port, host } => {
            // Credentials and limits are checked here, once, before any
            // request handling exists
            settings.validate()?;
            serve(settings, port, host).await?;
        }
        Commands::Migrate => {
            migrate(settings).await?;
        }
    }

    Ok(())
}

async fn serve(mut settings: Settings, port: Option<u16>, host: Option<String>) -> Result<()> {
    // Override settings with CLI arguments
    if let Some(port) = port {
        settings.server.port = port;
    }
    if let Some(host) = host {
        settings.server.host = host;
    }

    info!("Starting mealplan server");
    info!("Database: {}", settings.database.url);
    info!("Server: {}:{}", settings.server.host, settings.server.port);

    // Initialize database with connection pooling configuration
    let pool = db::init_pool_with_config(&settings.database).await?;
    info!(
        "Database connection established (max_connections: {}, min_connections: {})",
        settings.database.max_connections, settings.database.min_connections
    );

    // Run migrations
    db::run_migrations(&pool).await?;
    info!("Database migrations completed");

    // Construct every collaborator up front and pass it where it is
    // needed; no lazily-initialized globals
    let llm: Arc<dyn LlmClient> = Arc::new(OpenAiClient::new(&settings.llm)?);
    let provider = ProviderClient::new(&settings.provider)?;

    let kv_store = Arc::new(MemoryStore::new());
    let cache = CacheStore::new(kv_store.clone(), settings.cache.ttl_seconds);
    let limiter = RateLimiter::new(kv_store, &settings.limiter);
    info!(
        "Cache ready (ttl: {}s), rate limiter ready ({} req / {}s)",
        settings.cache.ttl_seconds, settings.limiter.max_requests, settings.limiter.window_seconds
    );

    let translator = QueryTranslator::new(llm.clone());
    let retriever = RecipeRetriever::new(translator, provider, cache);

    let indexer = EmbeddingIndexer::new(llm);
    let similarity = SimilaritySearch::new(indexer.clone());

    let notifier = Notifier::start(64);

    // Create application state
    let state = AppState {
        pool,
        retriever,
        similarity,
        indexer,
        limiter,
        notifier,
        settings: settings.clone(),
    };

    // Create router
    let app = routes::create_router(state);

    // Start server
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| Error::Internal(format!("Server error: {e}")))?;

    info!("Shutting down...");
    Ok(())
}

async fn migrate(settings: Settings) -> Result<()> {
    info!("Running database migrations");

    let pool = db::init_pool(&settings.database.url).await?;
    db::run_migrations(&pool).await?;

    println!("Database migrations completed successfully");
    Ok(())
}
