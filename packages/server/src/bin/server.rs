//! Nounou real-time server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin nounou-server
//! cargo run --bin nounou-server -- --host 0.0.0.0 --port 3000
//! NOUNOU_PUSH_WEBHOOK_URL=http://localhost:9000/push cargo run --bin nounou-server
//! ```

use clap::Parser;
use nounou_server::{
    config::{Args, ServerConfig},
    ui::Server,
};
use nounou_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let config = match ServerConfig::try_from(args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };
    tracing::debug!("Starting with {:?}", config);

    if let Err(e) = Server::new(config).run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
