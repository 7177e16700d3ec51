//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{CompletionConfig, DbAdapter, MyMemoryTranslator, PerplexityAdapter},
    config::Config,
    error::ApiError,
    web::{
        middleware::require_auth, rest::ApiDoc, state::AppState, career_guidance_handler,
        chat_handler, government_jobs_handler, history_status_handler, recent_histories_handler,
        regenerate_history_handler, todays_history_handler,
    },
};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use eduverse_core::{DailyHistoryService, Gateway, QuotaTracker};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    // The token lets in-flight retry backoffs bail out on shutdown.
    let shutdown_token = CancellationToken::new();
    let completion_adapter = Arc::new(PerplexityAdapter::new(
        CompletionConfig {
            api_url: config.perplexity_api_url.clone(),
            api_key: config.perplexity_api_key.clone(),
            model: config.perplexity_model.clone(),
        },
        shutdown_token.clone(),
    )?);
    let translator = Arc::new(MyMemoryTranslator::new(reqwest::Client::new()));

    // --- 4. Build the Core Services & Shared AppState ---
    let gateway = Gateway::new(
        QuotaTracker::new(db_adapter.clone()),
        db_adapter.clone(),
        completion_adapter.clone(),
        Some(translator),
    );
    let history = DailyHistoryService::new(db_adapter.clone(), completion_adapter);

    let app_state = Arc::new(AppState {
        config: config.clone(),
        gateway,
        history,
        users: db_adapter,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Every route requires a resolved user identity.
    let api_router = Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/career/guidance", post(career_guidance_handler))
        .route("/api/government-jobs", post(government_jobs_handler))
        .route("/api/daily-history/today", get(todays_history_handler))
        .route("/api/daily-history/recent", get(recent_histories_handler))
        .route("/api/daily-history/status", get(history_status_handler))
        .route(
            "/api/daily-history/regenerate",
            post(regenerate_history_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
            shutdown_token.cancel();
        })
        .await?;

    Ok(())
}
