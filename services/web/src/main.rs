use anyhow::Result;
use tokio::net::TcpListener;
use tracing::info;

mod error;
mod guard;
mod routes;
mod state;

use client::ApiClient;
use common::{AppConfig, telemetry};

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init("info")?;

    info!("Starting web service");

    let config = AppConfig::from_env()?;
    let api = ApiClient::from_config(&config)?;
    info!("Task API at {}", api.base_url());

    let listen_addr = config.listen_addr.clone();
    let app = routes::create_router(AppState::new(api, config));

    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Web service listening on {}", listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
