//! tlsmux command line tool
//!
//! Loads the configuration, binds the TLS listener and serves until Ctrl-C.

use clap::Parser;
use log::{error, info};
use std::path::PathBuf;

use tlsmux::common::{init_logger, ProxyError, Result};
use tlsmux::config::defaults::DEFAULT_CONFIG_FILE;
use tlsmux::proxy::Frontend;
use tlsmux::{load_config, Server, APP_NAME, VERSION};

/// SNI based TLS multiplexer
#[derive(Parser, Debug)]
#[clap(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Configuration file
    #[clap(short, long, env = "TLSMUX_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log level (overrides the configuration file)
    #[clap(long)]
    log_level: Option<String>,

    /// Validate the configuration and certificates, then exit
    #[clap(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let mut config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            init_logger(args.log_level.as_deref().unwrap_or("info"));
            error!("{}", e);
            return Err(ProxyError::from(e));
        }
    };
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    // Initialize logger
    init_logger(&config.log_level);

    if args.check {
        for frontend in &config.frontends {
            Frontend::from_config(frontend)?;
        }
        let effective = serde_json::to_string_pretty(&config)
            .map_err(|e| ProxyError::Other(e.to_string()))?;
        println!("{}", effective);
        info!("Configuration {} is valid", args.config.display());
        return Ok(());
    }

    info!("Starting {} v{}", APP_NAME, VERSION);
    let server = Server::bind(&config).await?;
    info!("Listening on {}", server.local_addr());

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, shutting down");
                shutdown.close();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    server.run().await
}
