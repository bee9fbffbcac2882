//! Commands for the Postboard client.

pub mod export_seed;
pub mod identity;
pub mod init_seed;
pub mod list;
pub mod post;
pub mod redeem;
pub mod tip;
pub mod tips;
pub mod watch;

use crate::config::ClientConfig;
use crate::controller::{BoardController, BoardOptions};
use crate::errors::ClientError;
use crate::overlay::HttpOverlay;
use crate::payments::MessageBoxPayments;
use crate::wallet::LocalWallet;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// The board as the terminal client runs it.
pub type Board = BoardController<LocalWallet, HttpOverlay, MessageBoxPayments<LocalWallet>>;

/// Loads the wallet at `wallet_path`.
pub fn load_wallet<P: AsRef<Path>>(wallet_path: P) -> Result<LocalWallet, ClientError> {
    if !wallet_path.as_ref().exists() {
        return Err(ClientError::WalletError(
            "Wallet file does not exist. Use init-seed to create a new wallet.".to_string(),
        ));
    }
    LocalWallet::load(&wallet_path)
        .map_err(|e| ClientError::WalletError(format!("Failed to load wallet: {}", e)))
}

/// Builds a board for the configured overlay using the wallet at `wallet_path`.
pub fn connect<P: AsRef<Path>>(config: &ClientConfig, wallet_path: P) -> Result<Board, ClientError> {
    let wallet = Arc::new(load_wallet(wallet_path)?);
    debug!("Connecting to {} ({:?})", config.overlay_url, config.network);

    let overlay = HttpOverlay::new(&config.overlay_url);
    let payments = MessageBoxPayments::new(&config.overlay_url, &config.message_box, wallet.clone());
    Ok(BoardController::new(wallet, overlay, payments, BoardOptions::from(config)))
}
