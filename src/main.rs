mod clients;
mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod routes;
mod services;
mod state;
mod ws;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use clients::openai_client::OpenAiClient;
use config::Config;
use db::{dbdocs::PgDocStore, memdocs::MemoryDocStore, mokacache::MokaCacheTier, rediscache::RedisCacheTier};
use docs::ApiDoc;
use routes::create_api_routes;
use services::ai_service::Completer;
use services::content_store::{CacheTier, ContentStore, DurableTier};
use services::doc_sync_service::spawn_doc_sync;
use state::AppState;
use std::panic;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use ws::registry::RoomRegistry;

const DEV_APP_ORIGIN: &str = "http://localhost:3001";

#[tokio::main(flavor = "current_thread")]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {e}, using defaults");
        Config::default()
    });

    // Initialize tracing
    let default_filter = format!(
        "roomdoc=debug,tower_http=debug,axum::rejection=trace,{}",
        config.log_level
    );
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .init();

    info!("Starting {} ({})...", config.service_name, config.environment);

    let durable = init_durable_tier(&config).await;
    let cache = init_cache_tier(&config).await;
    let store = Arc::new(ContentStore::new(cache, durable));
    let registry = Arc::new(RoomRegistry::new());

    let completer: Option<Arc<dyn Completer>> = match config.openai_api_key.as_deref() {
        Some(key) if !key.is_empty() => {
            match OpenAiClient::new(&config.openai_base_url, key, &config.openai_model) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    error!("Failed to create completion client: {}", e);
                    None
                }
            }
        }
        _ => {
            warn!("No completion API key configured - AI requests will be refused");
            None
        }
    };

    // Background cache -> durable sweep
    spawn_doc_sync(store.clone(), config.sync_interval());

    let config = Arc::new(config);
    let state = AppState {
        config: config.clone(),
        registry,
        store,
        completer,
    };

    // Combine all routes
    let app_routes = Router::new()
        // Mount API routes
        .nest("/api", create_api_routes(state))
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add tracing layer
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config));

    // Start the HTTP/API server
    let listener = tokio::net::TcpListener::bind(config.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", config.server_address()));

    info!("🚀 Server running on http://{}", config.server_address());
    info!("📡 WebSocket available at ws://{}/api/ws", config.server_address());
    info!("📚 Swagger UI available at http://{}/swagger", config.server_address());

    axum::serve(listener, app_routes)
        .await
        .expect("Server failed to start");
}

/// Postgres when a database URL is configured, otherwise an in-process table
async fn init_durable_tier(config: &Config) -> Arc<dyn DurableTier> {
    let Some(db_url) = &config.db_url else {
        warn!("No database URL configured - documents will not survive a restart");
        return Arc::new(MemoryDocStore::default());
    };

    match PgDocStore::new(db_url).await {
        Ok(db) => {
            if let Err(e) = db.ensure_schema().await {
                error!("Failed to prepare database schema: {}", e);
            }
            info!("Database initialized successfully");
            Arc::new(db)
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            warn!("Falling back to in-memory document storage");
            Arc::new(MemoryDocStore::default())
        }
    }
}

/// Redis when configured and reachable, otherwise the in-process cache
async fn init_cache_tier(config: &Config) -> Arc<dyn CacheTier> {
    let moka = || Arc::new(MokaCacheTier::new(config.cache_ttl(), config.cache_max_capacity));

    let Some(redis_url) = &config.redis_url else {
        info!("Using in-process cache tier");
        return moka();
    };

    let redis = match RedisCacheTier::new(redis_url, config.cache_ttl_secs) {
        Ok(redis) => redis,
        Err(e) => {
            error!("Invalid Redis configuration: {}", e);
            return moka();
        }
    };

    match redis.ping().await {
        Ok(()) => {
            info!("Connected to Redis cache tier");
            Arc::new(redis)
        }
        Err(e) => {
            error!("Redis unreachable: {}", e);
            warn!("Falling back to in-process cache tier");
            moka()
        }
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let mut origins = config.cors_origin_list();
    if origins.is_empty() && config.is_development() {
        origins.push(DEV_APP_ORIGIN.to_string());
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
