//! Reference overlay node for Postboard.

use anyhow::Result;
use postboard_node::metrics::start_metrics_server;
use postboard_node::{start_http_server, NodeConfig, NodeState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Command line arguments for the overlay node.
#[derive(Debug, StructOpt)]
#[structopt(name = "postboard-node", about = "Postboard overlay node")]
struct Opt {
    /// Path to the configuration file
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Path to the data directory
    #[structopt(short, long, parse(from_os_str))]
    data_dir: Option<PathBuf>,

    /// Listen address for the HTTP server
    #[structopt(short, long)]
    listen: Option<String>,

    /// Enable metrics server
    #[structopt(long)]
    metrics: bool,

    /// Metrics server address
    #[structopt(long)]
    metrics_addr: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let opt = Opt::from_args();

    let mut config = match &opt.config {
        Some(path) => NodeConfig::from_file(path)?,
        None => NodeConfig::default(),
    };
    if let Some(listen) = opt.listen {
        config.http.listen_addr = listen;
    }
    if opt.metrics {
        config.metrics.enabled = true;
    }
    if let Some(addr) = opt.metrics_addr {
        config.metrics.listen_addr = addr;
    }

    let data_dir = match opt.data_dir {
        Some(dir) => dir,
        None if opt.config.is_some() => PathBuf::from(&config.storage.data_dir),
        None => {
            let mut dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
            dir.push("postboard-node");
            dir
        }
    };
    std::fs::create_dir_all(&data_dir)?;

    let mut db_path = data_dir.clone();
    db_path.push("overlay_db");
    info!("Opening RocksDB at {}", db_path.display());
    let state = Arc::new(NodeState::open(&db_path, &config.overlay)?);

    if config.metrics.enabled {
        let addr: SocketAddr = config.metrics.listen_addr.parse()?;
        start_metrics_server(addr).await?;
    }

    let addr: SocketAddr = config.http.listen_addr.parse()?;
    let bound = start_http_server(addr, state, &config.http).await?;
    info!("Postboard topic {} served on http://{}", config.overlay.topic, bound);

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    Ok(())
}
