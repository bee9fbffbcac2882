//! Watch command for the Postboard client.

use super::connect;
use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::render;
use colored::Colorize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Runs the watch command: refreshes the board until interrupted.
pub async fn run<P: AsRef<Path>>(
    config: &ClientConfig,
    wallet_path: P,
    interval_secs: Option<u64>,
) -> Result<(), ClientError> {
    let mut board = connect(config, wallet_path)?;
    let period = Duration::from_secs(interval_secs.unwrap_or(config.poll_interval_secs).max(1));
    let mut interval = tokio::time::interval(period);
    info!("Refreshing every {:?}", period);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                // Failures are already on the board as notifications
                if let Err(e) = board.load_posts().await {
                    warn!("Refresh failed: {}", e);
                }
                if let Err(e) = board.poll_incoming_tips().await {
                    warn!("Tip collection failed: {}", e);
                }

                println!("{}", "── Postboard ──".bold());
                println!("{}", render::posts(board.state()));
                render::print_notifications(&board.take_notifications());
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watch");
                return Ok(());
            }
        }
    }
}
