//! Biblio Server - Library Management System
//!
//! REST API server for the book catalog, user accounts and the borrow
//! request/validation workflow.

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use biblio_server::{api, config::AppConfig, repository::Repository, services::Services, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("biblio_server={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Biblio Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::new(pool);
    let services = Services::new(repository, &config);

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // uploads arrive as multipart forms, leave headroom over the image cap
    let body_limit =
        DefaultBodyLimit::max((state.config.storage.max_upload_bytes as usize) + 64 * 1024);

    let api = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/auth/register", post(api::auth::register))
        .route("/auth/login", post(api::auth::login))
        .route("/auth/profile", get(api::auth::get_profile))
        .route("/auth/profile", put(api::auth::update_profile))
        .route("/auth/change-password", put(api::auth::change_password))
        // Users (admin)
        .route("/users", get(api::users::list_users))
        .route("/users/:id", get(api::users::get_user))
        .route("/users/:id", put(api::users::update_user))
        .route("/users/:id", delete(api::users::delete_user))
        // Books
        .route("/books", get(api::books::list_books))
        .route("/books", post(api::books::create_book))
        .route("/books/categories", get(api::books::categories))
        .route("/books/stats", get(api::books::stats))
        .route("/books/image/:image_name", get(api::books::serve_image))
        .route("/books/:id", get(api::books::get_book))
        .route("/books/:id", put(api::books::update_book))
        .route("/books/:id", delete(api::books::delete_book))
        // Borrows
        .route("/borrows", post(api::borrows::create_borrow))
        .route("/borrows", get(api::borrows::list_borrows))
        .route("/borrows/my-borrows", get(api::borrows::my_borrows))
        .route("/borrows/pending", get(api::borrows::pending_borrows))
        .route("/borrows/stats/borrows", get(api::borrows::borrow_stats))
        .route("/borrows/check-overdue", post(api::borrows::check_overdue))
        .route("/borrows/validate/:id", put(api::borrows::validate_borrow))
        .route("/borrows/refuse/:id", put(api::borrows::refuse_borrow))
        .route("/borrows/cancel/:id", put(api::borrows::cancel_borrow))
        .route("/borrows/return/:id", put(api::borrows::return_borrow))
        .route("/borrows/history/:id", get(api::borrows::borrow_history))
        .route("/borrows/:id", get(api::borrows::get_borrow))
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api", api)
        .merge(openapi)
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
