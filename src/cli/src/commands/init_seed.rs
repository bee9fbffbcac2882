//! Initialize seed command for the Postboard client.

use crate::errors::ClientError;
use crate::wallet::LocalWallet;
use std::path::Path;
use tracing::info;

/// Runs the init-seed command, returning the new identity key.
pub async fn run<P: AsRef<Path>>(wallet_path: P, phrase: Option<&str>) -> Result<String, ClientError> {
    if wallet_path.as_ref().exists() {
        return Err(ClientError::WalletError(
            "Wallet file already exists. Use export-seed to view the seed.".to_string(),
        ));
    }

    let wallet = match phrase {
        Some(phrase) => LocalWallet::from_phrase(phrase)?,
        None => LocalWallet::new()?,
    };
    wallet.save(&wallet_path)?;
    info!("Wallet saved to {}", wallet_path.as_ref().display());

    wallet.identity_key_hex()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_init_seed_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallet.dat");

        let identity = run(&path, None).await.unwrap();
        assert_eq!(identity.len(), 64);
        assert!(matches!(run(&path, None).await, Err(ClientError::WalletError(_))));
    }

    #[tokio::test]
    async fn test_init_seed_from_phrase() {
        let dir = tempdir().unwrap();
        let original = LocalWallet::new().unwrap();

        let path = dir.path().join("restored.dat");
        let identity = run(&path, Some(original.mnemonic())).await.unwrap();
        assert_eq!(identity, original.identity_key_hex().unwrap());
    }
}
