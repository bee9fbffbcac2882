//! Request and response bodies shared by the overlay node and its clients.

use crate::types::{Action, Satoshis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header carrying the caller's hex identity key.
pub const IDENTITY_KEY_HEADER: &str = "x-postboard-identity-key";
/// Header carrying the request nonce.
pub const NONCE_HEADER: &str = "x-postboard-nonce";
/// Header carrying the identity signature over nonce and body.
pub const SIGNATURE_HEADER: &str = "x-postboard-signature";

/// Message box that tips are delivered to.
pub const TIPS_MESSAGE_BOX: &str = "tips";

/// The bytes a caller signs to authenticate a request.
pub fn auth_message(nonce: &str, body: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(nonce.len() + 1 + body.len());
    message.extend_from_slice(nonce.as_bytes());
    message.push(b'|');
    message.extend_from_slice(body);
    message
}

/// Body of `POST /submit`: the action with its topics alongside.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// The submitted action
    #[serde(flatten)]
    pub action: Action,
    /// Topics the action should be tracked under
    pub topics: Vec<String>,
}

/// Successful reply to `POST /submit`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Always "success"
    pub status: String,
    /// Output indexes admitted per topic
    #[serde(default)]
    pub topics: BTreeMap<String, Vec<u32>>,
}

/// Body of `POST /lookup`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LookupRequest {
    /// Which lookup service should answer
    pub provider: String,
    /// Provider specific query
    pub query: serde_json::Value,
}

/// Error object returned in place of a result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// Always "error"
    pub status: String,
    /// Machine readable code
    #[serde(default)]
    pub code: Option<String>,
    /// Human readable description
    #[serde(default)]
    pub description: String,
}

impl ErrorObject {
    /// Creates an error object.
    pub fn new(code: &str, description: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            code: Some(code.to_string()),
            description: description.into(),
        }
    }

    /// Reads an error object out of an arbitrary JSON reply.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        if value.get("status").and_then(|s| s.as_str()) != Some("error") {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}

/// A tip as carried inside a message body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipPayment {
    /// Hex identity key of the sender
    pub sender: String,
    /// Amount paid to the recipient
    pub amount: Satoshis,
    /// The action that pays the recipient
    pub action: Action,
}

/// A message on its way into someone's box.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    /// Hex identity key of the recipient
    pub recipient: String,
    /// Box name
    pub message_box: String,
    /// Opaque body
    pub body: String,
}

/// Body of `POST /sendMessage`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// The message to deliver
    pub message: OutgoingMessage,
}

/// Body of `POST /listMessages`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesRequest {
    /// Box name
    pub message_box: String,
}

/// A message waiting in a box.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerMessage {
    /// Server assigned id
    pub message_id: u64,
    /// Hex identity key of the sender
    pub sender: String,
    /// Opaque body
    pub body: String,
}

/// Reply to `POST /listMessages`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ListMessagesResponse {
    /// Always "success"
    pub status: String,
    /// Messages in arrival order
    #[serde(default)]
    pub messages: Vec<PeerMessage>,
}

/// Body of `POST /acknowledgeMessage`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeRequest {
    /// Ids to remove from the caller's box
    pub message_ids: Vec<u64>,
}
