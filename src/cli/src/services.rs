//! The external collaborators the board talks to.
//!
//! The controller only ever reaches the outside world through these traits,
//! which keeps every state transition testable with in-memory fakes.

use crate::errors::ClientError;
use async_trait::async_trait;
use postboard_core::{Action, ActionInput, ActionOutput, LookupOutput, Satoshis, Script, Signature, TokenRef};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What the caller wants an action to contain.
#[derive(Clone, Debug, Default)]
pub struct ActionRequest {
    /// Outputs to spend
    pub inputs: Vec<ActionInput>,
    /// Outputs to create
    pub outputs: Vec<ActionOutput>,
    /// Description shown to the user
    pub description: String,
}

/// Wallet and signing service.
#[async_trait]
pub trait SigningService: Send + Sync {
    /// Hex identity key of the wallet owner.
    async fn identity_key(&self) -> Result<String, ClientError>;

    /// Identity signature vouching for the key derived for `protocol_id`/`key_id`.
    async fn reveal_linkage(&self, protocol_id: &str, key_id: &str) -> Result<Signature, ClientError>;

    /// Locks `fields` to the key derived for `protocol_id`/`key_id`.
    async fn create_locking_script(
        &self,
        fields: Vec<Vec<u8>>,
        protocol_id: &str,
        key_id: &str,
    ) -> Result<Script, ClientError>;

    /// Produces the script that spends `token`.
    async fn create_unlocking_script(
        &self,
        token: &TokenRef,
        protocol_id: &str,
        key_id: &str,
    ) -> Result<Script, ClientError>;

    /// Creates and signs an action.
    async fn create_action(&self, request: ActionRequest) -> Result<Action, ClientError>;

    /// Signs arbitrary bytes with the identity key.
    async fn sign(&self, message: &[u8]) -> Result<Signature, ClientError>;
}

#[async_trait]
impl<T: SigningService + ?Sized> SigningService for Arc<T> {
    async fn identity_key(&self) -> Result<String, ClientError> {
        (**self).identity_key().await
    }

    async fn reveal_linkage(&self, protocol_id: &str, key_id: &str) -> Result<Signature, ClientError> {
        (**self).reveal_linkage(protocol_id, key_id).await
    }

    async fn create_locking_script(
        &self,
        fields: Vec<Vec<u8>>,
        protocol_id: &str,
        key_id: &str,
    ) -> Result<Script, ClientError> {
        (**self).create_locking_script(fields, protocol_id, key_id).await
    }

    async fn create_unlocking_script(
        &self,
        token: &TokenRef,
        protocol_id: &str,
        key_id: &str,
    ) -> Result<Script, ClientError> {
        (**self).create_unlocking_script(token, protocol_id, key_id).await
    }

    async fn create_action(&self, request: ActionRequest) -> Result<Action, ClientError> {
        (**self).create_action(request).await
    }

    async fn sign(&self, message: &[u8]) -> Result<Signature, ClientError> {
        (**self).sign(message).await
    }
}

/// What the overlay reported after a submission.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmitReceipt {
    /// The submitted action id
    pub txid: String,
    /// Output indexes admitted under the submitted topic
    pub admitted: Vec<u32>,
}

/// Overlay submission and lookup service.
#[async_trait]
pub trait OverlayService: Send + Sync {
    /// Submits an action tagged with `topics`.
    async fn submit(&self, action: &Action, topics: &[String]) -> Result<SubmitReceipt, ClientError>;

    /// Asks `provider` for the outputs matching `query`.
    async fn lookup(&self, provider: &str, query: serde_json::Value) -> Result<Vec<LookupOutput>, ClientError>;
}

/// A tip that has been sent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    /// Hex identity key of the recipient
    pub recipient: String,
    /// Amount sent
    pub amount: Satoshis,
    /// The paying action
    pub txid: String,
}

/// A tip waiting to be accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingPayment {
    /// Message id in the payment box
    pub message_id: u64,
    /// Hex identity key of the sender
    pub sender: String,
    /// Amount announced by the sender
    pub amount: Satoshis,
    /// The paying action
    pub action: Action,
}

/// Payment transfer service.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Sends `amount` to the holder of `recipient`.
    async fn send_payment(&self, recipient: &str, amount: Satoshis) -> Result<PaymentReceipt, ClientError>;

    /// Lists payments waiting for this wallet.
    async fn list_incoming(&self) -> Result<Vec<IncomingPayment>, ClientError>;

    /// Accepts a payment so it is not offered again.
    async fn accept(&self, payment: &IncomingPayment) -> Result<(), ClientError>;
}
