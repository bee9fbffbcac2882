//! Tips command for the Postboard client.

use super::connect;
use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::render;
use postboard_core::Satoshis;
use std::path::Path;

/// Runs the tips command, returning the total accepted.
pub async fn run<P: AsRef<Path>>(config: &ClientConfig, wallet_path: P) -> Result<Satoshis, ClientError> {
    let mut board = connect(config, wallet_path)?;
    let result = board.poll_incoming_tips().await;

    render::print_notifications(&board.take_notifications());
    Ok(result?.iter().map(|payment| payment.amount).sum())
}
