//! Tip command for the Postboard client.

use super::connect;
use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::render;
use crate::services::PaymentReceipt;
use postboard_core::{Outpoint, Satoshis};
use std::path::Path;

/// Runs the tip command.
pub async fn run<P: AsRef<Path>>(
    config: &ClientConfig,
    wallet_path: P,
    outpoint: &Outpoint,
    amount: Satoshis,
) -> Result<PaymentReceipt, ClientError> {
    let mut board = connect(config, wallet_path)?;
    let result = match board.load_posts().await {
        Ok(_) => board.tip_post(outpoint, amount).await,
        Err(e) => Err(ClientError::PaymentError(e.to_string())),
    };

    render::print_notifications(&board.take_notifications());
    result
}
