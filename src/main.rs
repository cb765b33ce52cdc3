use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use template_sync_service::config::Settings;
use template_sync_service::provider::ProviderRegistry;
use template_sync_service::server::{create_app, AppState};
use template_sync_service::store::create_template_store;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    init_tracing();

    // Load configuration
    let settings = Settings::new()?;
    tracing::info!("Configuration loaded");

    // Connect PostgreSQL when the postgres backend is configured
    let pool = match (settings.database.backend.as_str(), &settings.database.url) {
        ("postgres", Some(url)) => {
            let pool = PgPoolOptions::new()
                .max_connections(settings.database.max_connections)
                .connect(url)
                .await?;
            tracing::info!("PostgreSQL pool connected");
            Some(pool)
        }
        ("postgres", None) => {
            tracing::warn!("postgres backend configured without database.url");
            None
        }
        _ => None,
    };

    let store = create_template_store(&settings.database, pool);

    // Provider transports are deployment-specific and injected at startup;
    // with none registered, template submission endpoints reject requests.
    let registry = Arc::new(ProviderRegistry::new());
    tracing::warn!("No provider transport clients registered");

    // Create application state
    let state = AppState::new(settings.clone(), store, registry);
    tracing::info!("Application state initialized");

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal_handler() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
