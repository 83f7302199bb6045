use std::net::SocketAddr;

use tokio::signal;
use tracing::{error, info};

use chat_stream_rs::{api, config, logger};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cfg = match config::Config::init_global() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("Failed to load config: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = logger::init_logger(cfg) {
        eprintln!("Failed to init logger: {err}");
        std::process::exit(1);
    }

    cfg.print();

    let app = api::router();

    let ip = cfg
        .host
        .parse()
        .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0]));
    let addr = SocketAddr::new(ip, cfg.port);
    info!("Mock chat server running on http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(err) => {
            error!("Failed to bind: {err}");
            std::process::exit(1);
        }
    };

    let server = axum::serve(listener, app);

    if let Err(err) = server.with_graceful_shutdown(shutdown_signal()).await {
        error!("Server error: {err}");
    }
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("Shutdown signal received");
}
