//! Handover Web Server
//!
//! Run with: cargo run -p handover-web

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use handover_config::Config;
use handover_core::{ServiceContext, Services};
use handover_db::Database;
use handover_web::{router::build_router, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,handover=debug")),
        )
        .init();

    info!("Starting Handover server...");

    let config = Config::load()?;
    let db = Database::open(&config.database.url, config.database.max_connections).await?;
    db.initialize().await?;
    info!(url = %db.url(), "Database ready");

    let mailer = handover_notify::mailer::from_config(&config.mail)?;
    info!(transport = %mailer.transport(), "Mailer ready");

    let bind = config.server.bind.clone();
    let ctx = ServiceContext::new(Arc::new(config), Arc::new(db), mailer)?;
    let app = build_router(AppState::new(Services::new(Arc::new(ctx))));

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
