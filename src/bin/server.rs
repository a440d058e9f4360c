//! mcwire Server Binary
//!
//! Serves the memcache text protocol from an in-memory store.

use std::sync::Arc;

use clap::Parser;
use mcwire::{Config, MemoryStore, Server, SessionConfig};
use tracing_subscriber::{fmt, EnvFilter};

/// mcwire Server
#[derive(Parser, Debug)]
#[command(name = "mcwire-server")]
#[command(about = "Memcache text protocol server")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:11211")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Idle deadline per connection in milliseconds
    #[arg(short, long, default_value = "60000")]
    deadline_ms: u64,

    /// Per-connection buffer size in bytes
    #[arg(short, long, default_value = "4096")]
    buf: usize,

    /// Largest item payload in bytes
    #[arg(long, default_value = "1048576")]
    max_item: usize,

    /// Session parameters as a query string (e.g. "deadline=500&buf=8192");
    /// overrides the individual flags
    #[arg(short, long)]
    params: Option<String>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mcwire=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("mcwire Server v{}", mcwire::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let mut builder = Config::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .deadline_ms(args.deadline_ms)
        .buffer_size(args.buf)
        .max_item_size(args.max_item);

    if let Some(params) = &args.params {
        builder = builder.session(SessionConfig::from_params(params));
    }
    let config = builder.build();

    tracing::info!(
        "Session settings: deadline={:?} buf={} max_item={}",
        config.session.deadline,
        config.session.buffer_size,
        config.session.max_item_size
    );

    let storage = Arc::new(MemoryStore::new());

    let server = match Server::bind(config, storage) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
