use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transmorpiq_forge::config::ForgeConfig;
use transmorpiq_forge::services::manager::{HttpManagerService, ManagerService};
use transmorpiq_forge::{AppState, create_app};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port for the API server
    #[arg(short, long, default_value_t = 3000, env = "PORT")]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transmorpiq_forge=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting TransmorpIQ forge service...");

    let config = ForgeConfig::from_env();
    let manager: Option<Arc<dyn ManagerService>> = match &config.manager_url {
        Some(url) => {
            info!("🛰️  Manager service: {}", url);
            let client = config
                .http_client()
                .context("Failed to create HTTP client")?;
            let manager: Arc<dyn ManagerService> = Arc::new(HttpManagerService::new(client, url));
            Some(manager)
        }
        None => {
            warn!("⚠️  MANAGER_SERVICE_URL is not set; upload requests will be refused");
            None
        }
    };
    info!(
        "🛡️  Limits: Max Size={}MB, Description={} chars",
        config.max_file_size / 1024 / 1024,
        config.max_description_chars
    );

    let state = AppState { manager, config };

    let app = create_app(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("✅ API Server listening on: http://0.0.0.0:{}", args.port);
    info!("📖 Swagger UI documentation: http://localhost:{}/swagger-ui", args.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Forge service exited cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
