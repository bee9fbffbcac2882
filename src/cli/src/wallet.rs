//! Local signing service backed by a mnemonic file.

use crate::errors::ClientError;
use crate::services::{ActionRequest, SigningService};
use async_trait::async_trait;
use bip32::{Mnemonic, XPrv};
use ed25519_dalek::{Keypair, PublicKey, SecretKey, Signer};
use postboard_core::post::sign_linkage;
use postboard_core::pushdrop::{unlocking_script, PushDropToken};
use postboard_core::types::spend_preimage;
use postboard_core::{Action, Script, Signature, TokenRef};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// A wallet that signs Postboard tokens and actions locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalWallet {
    /// The BIP39 mnemonic for the wallet
    mnemonic: String,
    /// The current account index
    account_index: u32,
}

impl LocalWallet {
    /// Creates a new wallet with a random mnemonic.
    pub fn new() -> Result<Self, ClientError> {
        let mnemonic = Mnemonic::random(OsRng, Default::default());

        Ok(Self {
            mnemonic: mnemonic.phrase().to_string(),
            account_index: 0,
        })
    }

    /// Restores a wallet from an existing phrase.
    pub fn from_phrase(phrase: &str) -> Result<Self, ClientError> {
        Mnemonic::new(phrase, Default::default())?;
        Ok(Self {
            mnemonic: phrase.to_string(),
            account_index: 0,
        })
    }

    /// Loads a wallet from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ClientError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let wallet = serde_json::from_str(&contents)?;
        Ok(wallet)
    }

    /// Saves a wallet to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ClientError> {
        let contents = serde_json::to_string_pretty(self)?;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = File::create(path)?;
        file.write_all(contents.as_bytes())?;

        Ok(())
    }

    /// Gets the mnemonic for the wallet.
    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    /// Gets the current account index.
    pub fn account_index(&self) -> u32 {
        self.account_index
    }

    /// Sets the account index.
    pub fn set_account_index(&mut self, index: u32) {
        self.account_index = index;
    }

    /// Gets the identity keypair for the current account.
    pub fn identity_keypair(&self) -> Result<Keypair, ClientError> {
        let mnemonic = Mnemonic::new(self.mnemonic.as_str(), Default::default())?;
        let seed = mnemonic.to_seed("");
        let root = XPrv::derive_from_path(seed, &format!("m/44'/0'/{}'", self.account_index).parse()?)?;

        // ed25519 secrets are 32 arbitrary bytes, so hash the BIP32 key into one
        let secret = root.to_bytes();
        let digest = Sha256::digest(secret);
        keypair_from_seed(&digest)
    }

    /// Derives the keypair used for `protocol_id` / `key_id`.
    pub fn protocol_keypair(&self, protocol_id: &str, key_id: &str) -> Result<Keypair, ClientError> {
        let identity = self.identity_keypair()?;

        let mut hasher = Sha256::new();
        hasher.update(identity.secret.as_bytes());
        hasher.update(protocol_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(key_id.as_bytes());
        keypair_from_seed(&hasher.finalize())
    }

    /// Hex identity key for the current account.
    pub fn identity_key_hex(&self) -> Result<String, ClientError> {
        Ok(hex::encode(self.identity_keypair()?.public.as_bytes()))
    }
}

fn keypair_from_seed(seed: &[u8]) -> Result<Keypair, ClientError> {
    let secret = SecretKey::from_bytes(seed)?;
    let public = PublicKey::from(&secret);
    Ok(Keypair { secret, public })
}

#[async_trait]
impl SigningService for LocalWallet {
    async fn identity_key(&self) -> Result<String, ClientError> {
        self.identity_key_hex()
    }

    async fn reveal_linkage(&self, protocol_id: &str, key_id: &str) -> Result<Signature, ClientError> {
        let identity = self.identity_keypair()?;
        let locking = self.protocol_keypair(protocol_id, key_id)?;
        Ok(sign_linkage(&identity, protocol_id, key_id, &locking.public))
    }

    async fn create_locking_script(
        &self,
        fields: Vec<Vec<u8>>,
        protocol_id: &str,
        key_id: &str,
    ) -> Result<Script, ClientError> {
        let locking = self.protocol_keypair(protocol_id, key_id)?;
        Ok(PushDropToken::create(fields, &locking).to_script())
    }

    async fn create_unlocking_script(
        &self,
        token: &TokenRef,
        protocol_id: &str,
        key_id: &str,
    ) -> Result<Script, ClientError> {
        let decoded = PushDropToken::decode(&token.locking_script)
            .map_err(|e| ClientError::SigningError(format!("cannot read locking script: {}", e)))?;
        let locking = self.protocol_keypair(protocol_id, key_id)?;
        if decoded.locking_public_key != locking.public {
            return Err(ClientError::SigningError(format!(
                "token {}.{} is not locked to this wallet",
                token.txid, token.output_index
            )));
        }

        let preimage = spend_preimage(&token.txid, token.output_index, token.satoshis, &token.locking_script);
        let signature: Signature = locking.sign(&preimage).into();
        Ok(unlocking_script(&signature))
    }

    async fn create_action(&self, request: ActionRequest) -> Result<Action, ClientError> {
        if request.inputs.is_empty() && request.outputs.is_empty() {
            return Err(ClientError::TransactionError("action has no inputs or outputs".to_string()));
        }
        if let Some(output) = request.outputs.iter().find(|o| o.satoshis == 0) {
            return Err(ClientError::TransactionError(format!(
                "output {:?} carries no satoshis",
                output.description
            )));
        }
        if let Some(input) = request.inputs.iter().find(|i| i.unlocking_script.is_empty()) {
            return Err(ClientError::TransactionError(format!(
                "input {}.{} has no unlocking script",
                input.txid, input.output_index
            )));
        }

        let action = Action::new(request.inputs, request.outputs, request.description, rand::random())?;
        debug!("Created action {} ({})", action.txid, action.description);
        Ok(action)
    }

    async fn sign(&self, message: &[u8]) -> Result<Signature, ClientError> {
        Ok(self.identity_keypair()?.sign(message).into())
    }
}
