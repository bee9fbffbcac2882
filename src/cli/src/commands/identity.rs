//! Identity command for the Postboard client.

use super::load_wallet;
use crate::errors::ClientError;
use std::path::Path;

/// Runs the identity command, returning the wallet's identity key.
pub async fn run<P: AsRef<Path>>(wallet_path: P) -> Result<String, ClientError> {
    load_wallet(wallet_path)?.identity_key_hex()
}
