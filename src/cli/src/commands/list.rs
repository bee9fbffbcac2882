//! List command for the Postboard client.

use super::connect;
use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::render;
use std::path::Path;
use tracing::warn;

/// Runs the list command: loads the board and collects waiting tips.
pub async fn run<P: AsRef<Path>>(config: &ClientConfig, wallet_path: P) -> Result<usize, ClientError> {
    let mut board = connect(config, wallet_path)?;
    let loaded = board.load_posts().await.map(|posts| posts.len());

    if let Err(e) = board.poll_incoming_tips().await {
        warn!("Could not collect tips: {}", e);
    }

    println!("{}", render::posts(board.state()));
    render::print_notifications(&board.take_notifications());
    loaded
}
