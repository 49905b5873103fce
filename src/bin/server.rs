use log::{error, info, warn};
use std::convert::Infallible;
use std::net::SocketAddr;
use warp::{self, Filter};

use roomcast::config::Settings;
use roomcast::constants::WS_PATH;
use roomcast::core::hub::{create_hub, SharedHub};
use roomcast::handlers::websocket::handle_ws_client;

#[tokio::main]
async fn main() {
    // Initialize env
    match dotenvy::dotenv() {
        Ok(_) => info!("Environment variables loaded from .env file"),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    // Initialize logging
    env_logger::init();

    // Load preference snapshots and the palette
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load settings: {}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration: host={}, port={}", settings.host, settings.port);

    let addr: SocketAddr = match format!("{}:{}", settings.host, settings.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    let hub = create_hub(settings);

    // Create WebSocket route
    let ws_route = warp::path(WS_PATH)
        .and(warp::ws())
        .and(warp::addr::remote())
        .and(with_hub(hub))
        .map(|ws: warp::ws::Ws, remote: Option<SocketAddr>, hub: SharedHub| {
            info!("New websocket connection");
            ws.on_upgrade(move |socket| handle_ws_client(socket, remote, hub))
        });

    // Create health check route
    let health_route = warp::path("health").map(|| "OK");

    let routes = ws_route.or(health_route);

    info!("Starting Roomcast server on {}", addr);
    warp::serve(routes).run(addr).await;
}

// Helper function to include the hub in request handling
fn with_hub(hub: SharedHub) -> impl Filter<Extract = (SharedHub,), Error = Infallible> + Clone {
    warp::any().map(move || hub.clone())
}
