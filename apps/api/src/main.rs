use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use checkin_cell::{
    DashboardService, DataVersionGuard, FileVersionStore, GuardConfig, RecordCache, VersionStore,
};
use shared_config::AppConfig;
use shared_database::FoodBankClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting food bank dashboard API");

    let config = AppConfig::from_env();

    let store: Arc<dyn VersionStore> = Arc::new(FileVersionStore::new(&config.version_store_path));
    let cache = Arc::new(RecordCache::from_config(&config));

    let service = Arc::new(
        DashboardService::new(&config, cache.clone(), store.clone())
            .context("invalid dashboard configuration")?,
    );

    let guard = Arc::new(DataVersionGuard::new(
        Arc::new(FoodBankClient::new(&config)),
        store,
        cache,
        GuardConfig::from_config(&config),
    ));
    let guard_handle = guard.spawn();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(service)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    let addr: SocketAddr = config
        .bind_address
        .parse()
        .with_context(|| format!("invalid BIND_ADDRESS '{}'", config.bind_address))?;
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    guard.stop();
    guard_handle.await.ok();
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
