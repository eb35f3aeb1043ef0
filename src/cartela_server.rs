// src/cartela_server.rs
// Retailer billing server: quotes, charges and records bingo games over HTTP.

use std::sync::atomic::Ordering;

use clap::Parser;
use cartela::config::ServerConfig;
use cartela::ledger::RetailerLedger;
use cartela::logging::{log_error_stderr, log_info};
use cartela::server;

#[derive(Parser)]
#[command(name = env!("CARGO_BIN_NAME"))]
#[command(about = "Cartela billing server - retailer balances and game ledger")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Address to bind, overrides conf/server.conf
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, overrides conf/server.conf
    #[arg(long)]
    port: Option<u16>,

    /// Ledger JSON file, overrides conf/server.conf
    #[arg(long)]
    ledger: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut config = ServerConfig::load_or_default();
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(ledger) = args.ledger {
        config.ledger_path = ledger;
    }

    let ledger = RetailerLedger::load_or_default(&config.ledger_path, config.rates());
    let (server_handle, shutdown_signal) = server::start_server(config, ledger);

    if let Err(e) = tokio::signal::ctrl_c().await {
        log_error_stderr(&format!("Cannot listen for Ctrl-C: {e}"));
    }

    // Signal the server to shutdown
    shutdown_signal.store(true, Ordering::Relaxed);
    log_info("Shutting down billing server...");

    if let Err(e) = server_handle.await {
        log_error_stderr(&format!("Error waiting for server shutdown: {e:?}"));
    }
    log_info("Billing server stopped.");
}
