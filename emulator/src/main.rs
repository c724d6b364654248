use axum::{routing::get, Router};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sensor_emulator::config::Args;
use sensor_emulator::metrics;
use sensor_emulator::mqtt;
use sensor_emulator::responder::CommandResponder;
use sensor_emulator::scheduler::Scheduler;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const COMMAND_QUEUE_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Args::parse().into_config() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting sensor emulator");
    config.log_summary();

    metrics::init_metrics();

    if let Some(addr) = config.metrics_addr {
        tokio::spawn(serve_metrics(addr));
    }

    let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
    let (publisher, mqtt_handle) = mqtt::connect(&config, command_tx);

    let responder = CommandResponder::new(publisher.clone());
    let responder_handle = tokio::spawn(async move {
        responder.run(command_rx).await;
    });

    let mut scheduler = Scheduler::new(config.clone(), publisher, StdRng::from_entropy());
    let scheduler_handle = tokio::spawn(async move {
        if let Err(e) = scheduler.run().await {
            error!("Scheduler failed: {}", e);
        }
    });

    tokio::select! {
        _ = mqtt_handle => {
            error!("MQTT task terminated");
        }
        _ = responder_handle => {
            error!("Command responder terminated");
        }
        _ = scheduler_handle => {
            error!("Scheduler terminated");
            std::process::exit(1);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Shutting down");
}

async fn serve_metrics(addr: SocketAddr) {
    let app = Router::new().route("/metrics", get(metrics_handler));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind metrics server to {}: {}", addr, e);
            return;
        }
    };

    info!("Metrics server listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Metrics server error: {}", e);
    }
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}
