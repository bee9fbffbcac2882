//! Redeem command for the Postboard client.

use super::connect;
use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::render;
use postboard_core::{Outpoint, PostRecord};
use std::path::Path;

/// Runs the redeem command.
///
/// The board is loaded first so the post's token can be found.
pub async fn run<P: AsRef<Path>>(
    config: &ClientConfig,
    wallet_path: P,
    outpoint: &Outpoint,
) -> Result<PostRecord, ClientError> {
    let mut board = connect(config, wallet_path)?;
    let result = match board.load_posts().await {
        Ok(_) => board.redeem_post(outpoint).await,
        Err(e) => Err(ClientError::RedemptionError(Box::new(e))),
    };

    render::print_notifications(&board.take_notifications());
    result
}
