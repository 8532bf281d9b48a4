use axum::{
    extract::DefaultBodyLimit,
    routing::{get, get_service},
    Router,
};
use secrecy::ExposeSecret;
use std::path::Path;
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use balcao::api::middleware::session::{create_session_layer, AppState};
use balcao::config::Config;
use balcao::{api, db, jobs};

const MAX_UPLOAD_BYTES: usize = 8 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "balcao=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Balcão server...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create session layer (legacy end-user scheme)
    let session_secret = config.session_secret.expose_secret().as_bytes();
    let session_layer = create_session_layer(pool.clone(), session_secret, &config.base_url).await?;
    tracing::info!("Session layer initialized");

    // Ensure the upload directory exists before serving from it
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    // Build application state
    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
    };

    // Schedule the periodic boost sweep
    let scheduler = JobScheduler::new()
        .await
        .map_err(|e| anyhow::anyhow!("failed to create scheduler: {e}"))?;
    let sweep_pool = pool.clone();
    let sweep_job = Job::new_async("0 */10 * * * *", move |_uuid, _lock| {
        let pool = sweep_pool.clone();
        Box::pin(async move {
            if let Err(e) = jobs::boost_sweeper::sweep_boosts(&pool).await {
                tracing::error!(error = %e, "Boost sweep failed");
            }
        })
    })
    .map_err(|e| anyhow::anyhow!("failed to build sweep job: {e}"))?;
    scheduler
        .add(sweep_job)
        .await
        .map_err(|e| anyhow::anyhow!("failed to schedule sweep job: {e}"))?;
    scheduler
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start scheduler: {e}"))?;
    tracing::info!("Boost sweeper scheduled");

    // Serve uploaded ad images
    let upload_routes = Router::new().nest_service(
        "/uploads",
        get_service(ServeDir::new(Path::new(&config.upload_dir))),
    );

    // Build router
    let app = Router::new()
        .route("/health", get(api::health::health_check))
        .merge(api::auth::router())
        .merge(api::categories::router())
        .merge(api::ads::router(state.clone()))
        .merge(api::favorites::router(state.clone()))
        .merge(api::boosts::router(state.clone()))
        .merge(api::uploads::router(state.clone()))
        .merge(api::admin::router(state.clone()))
        .merge(upload_routes)
        .layer(session_layer)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    tracing::info!("Shutdown signal received, cleaning up...");
}
