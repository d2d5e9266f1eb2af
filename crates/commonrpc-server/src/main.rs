//! commonrpc server - serves the built-in namespaces over framed TCP.
//!
//! On startup the bound port is printed to stdout as `RPC_PORT=<port>` so a
//! parent process can discover it when `--port 0` was used. Logs go to stderr.

mod handlers;

use anyhow::{Context, Result};
use clap::Parser;
use commonrpc::{RpcServer, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "commonrpc-server")]
#[command(about = "Generic call-forwarding RPC server")]
struct Args {
    /// Host to bind to [default: 0.0.0.0]
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, 0 = auto-assign [default: 6565]
    #[arg(short, long)]
    port: Option<u16>,

    /// Number of calls executed concurrently [default: 10]
    #[arg(short = 'w', long)]
    max_workers: Option<usize>,

    /// JSON server configuration file. Flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging, including one rpc_log record per call
    #[arg(short, long)]
    debug: bool,

    /// Write logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn server_config(&self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => ServerConfig::default(),
        };

        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(max_workers) = self.max_workers {
            config.max_workers = max_workers;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_logging(debug: bool, json: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_ids(false);

    if json {
        builder.json().init();
    } else {
        builder.with_target(false).compact().init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug, args.log_json);

    info!("Starting commonrpc server");

    let config = args.server_config()?;
    let dispatcher = Arc::new(handlers::dispatcher());
    info!("Exposing namespaces: {}", handlers::EXPOSED.join(", "));

    let mut server = RpcServer::start(dispatcher, &config).await?;

    // Parent processes read this line to discover the port
    println!("RPC_PORT={}", server.addr().port());

    info!("RPC server running on {}", server.addr());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");
    server.shutdown();
    server.stopped().await;

    Ok(())
}
