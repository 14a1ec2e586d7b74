use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use comfy_worker::{api, Config, Worker};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    Config::dotenv_load();
    let config = Config::new()?;
    Config::print_env_vars();

    let worker = Worker::new(config.clone())?;
    let state = Arc::new(api::routes::AppState::new(worker));
    let app = api::routes::router(state);

    // Run the local job server with safe parsing
    let ip: std::net::IpAddr = config.api_host.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid API_HOST '{}', falling back to 127.0.0.1", config.api_host);
        std::net::IpAddr::from([127, 0, 0, 1])
    });
    let port: u16 = config.api_port.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid API_PORT '{}', falling back to 8000", config.api_port);
        8000
    });
    let socket_address = SocketAddr::new(ip, port);
    tracing::info!("Starting worker, listening on {}", socket_address);
    axum::Server::bind(&socket_address).serve(app.into_make_service()).await?;
    Ok(())
}
