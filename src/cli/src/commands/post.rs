//! Post command for the Postboard client.

use super::connect;
use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::render;
use postboard_core::{PostRecord, Satoshis};
use std::path::Path;
use tracing::info;

/// Runs the post command.
pub async fn run<P: AsRef<Path>>(
    config: &ClientConfig,
    wallet_path: P,
    text: &str,
    amount: Option<Satoshis>,
) -> Result<PostRecord, ClientError> {
    let mut board = connect(config, wallet_path)?;
    let amount = amount.unwrap_or(config.default_amount);
    info!("Posting with {} satoshis locked", amount);

    let result = board.create_post(text, amount).await;
    render::print_notifications(&board.take_notifications());
    result
}
