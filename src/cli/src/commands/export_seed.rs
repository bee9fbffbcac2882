//! Export seed command for the Postboard client.

use super::load_wallet;
use crate::errors::ClientError;
use std::path::Path;
use tracing::debug;

/// Runs the export-seed command.
pub async fn run<P: AsRef<Path>>(wallet_path: P) -> Result<String, ClientError> {
    let wallet = load_wallet(&wallet_path)?;
    debug!("Loaded wallet from {}", wallet_path.as_ref().display());

    Ok(wallet.mnemonic().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::LocalWallet;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_export_seed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallet.dat");
        assert!(matches!(run(&path).await, Err(ClientError::WalletError(_))));

        let wallet = LocalWallet::new().unwrap();
        wallet.save(&path).unwrap();
        assert_eq!(run(&path).await.unwrap(), wallet.mnemonic());
    }
}
