//! Authenticated message boxes used to deliver tips.

use crate::errors::NodeError;
use crate::metrics::MESSAGE_COUNTER;
use crate::storage::OverlayStore;
use ed25519_dalek::Verifier;
use postboard_core::types::public_key_from_hex;
use postboard_core::wire::{auth_message, OutgoingMessage, PeerMessage};
use postboard_core::Signature;
use tracing::{debug, info};

/// Checks the request authentication headers and returns the caller's identity key.
pub fn authenticate(
    identity_key: Option<&str>,
    nonce: Option<&str>,
    signature: Option<&str>,
    body: &[u8],
) -> Result<String, NodeError> {
    let (identity_key, nonce, signature) = match (identity_key, nonce, signature) {
        (Some(key), Some(nonce), Some(signature)) => (key, nonce, signature),
        _ => return Err(NodeError::Unauthorized("missing authentication headers".to_string())),
    };
    if nonce.is_empty() {
        return Err(NodeError::Unauthorized("empty nonce".to_string()));
    }

    let public_key = public_key_from_hex(identity_key)
        .map_err(|e| NodeError::Unauthorized(format!("bad identity key: {}", e)))?;
    let signature = hex::decode(signature)
        .map_err(|e| NodeError::Unauthorized(format!("bad signature encoding: {}", e)))
        .and_then(|bytes| {
            Signature::from_slice(&bytes)
                .and_then(|s| s.to_ed25519())
                .map_err(|e| NodeError::Unauthorized(e.to_string()))
        })?;

    public_key
        .verify(&auth_message(nonce, body), &signature)
        .map_err(|_| NodeError::Unauthorized("signature does not match the request".to_string()))?;
    Ok(identity_key.to_string())
}

/// Message boxes keyed by recipient identity.
#[derive(Clone)]
pub struct MessageBox {
    store: OverlayStore,
    max_messages: usize,
}

impl MessageBox {
    /// Creates message boxes holding at most `max_messages` each.
    pub fn new(store: OverlayStore, max_messages: usize) -> Self {
        Self { store, max_messages }
    }

    /// Delivers a message from `sender`.
    pub fn send(&self, sender: &str, message: &OutgoingMessage) -> Result<u64, NodeError> {
        public_key_from_hex(&message.recipient)
            .map_err(|e| NodeError::InvalidRequest(format!("bad recipient: {}", e)))?;
        if message.message_box.is_empty() {
            return Err(NodeError::InvalidRequest("message box name is empty".to_string()));
        }
        let waiting = self.store.list_messages(&message.recipient, &message.message_box)?.len();
        if waiting >= self.max_messages {
            return Err(NodeError::MessageBoxFull(message.recipient.clone()));
        }

        let message_id = self
            .store
            .put_message(&message.recipient, &message.message_box, sender, &message.body)?;
        MESSAGE_COUNTER.inc();
        info!("Delivered message {} to {}", message_id, message.recipient);
        Ok(message_id)
    }

    /// Lists the caller's messages in `message_box`.
    pub fn list(&self, recipient: &str, message_box: &str) -> Result<Vec<PeerMessage>, NodeError> {
        let messages = self.store.list_messages(recipient, message_box)?;
        debug!("{} messages waiting for {} in {}", messages.len(), recipient, message_box);
        Ok(messages)
    }

    /// Deletes the caller's messages with the given ids.
    pub fn acknowledge(&self, recipient: &str, message_ids: &[u64]) -> Result<usize, NodeError> {
        let removed = self.store.acknowledge_messages(recipient, message_ids)?;
        debug!("{} acknowledged {} messages", recipient, removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Keypair, PublicKey, SecretKey, Signer};
    use tempfile::tempdir;

    fn keypair(seed: u8) -> Keypair {
        let secret = SecretKey::from_bytes(&[seed; 32]).unwrap();
        let public = PublicKey::from(&secret);
        Keypair { secret, public }
    }

    fn key_hex(keypair: &Keypair) -> String {
        hex::encode(keypair.public.as_bytes())
    }

    #[test]
    fn test_authenticate() {
        let caller = keypair(3);
        let body = br#"{"messageBox":"tips"}"#;
        let signature = hex::encode(caller.sign(&auth_message("n1", body)).to_bytes());
        let identity = key_hex(&caller);

        let authed = authenticate(Some(&identity), Some("n1"), Some(&signature), body).unwrap();
        assert_eq!(authed, identity);

        // Any change to nonce, body or key breaks it
        assert!(authenticate(Some(&identity), Some("n2"), Some(&signature), body).is_err());
        assert!(authenticate(Some(&identity), Some("n1"), Some(&signature), b"{}").is_err());
        assert!(authenticate(Some(&key_hex(&keypair(4))), Some("n1"), Some(&signature), body).is_err());
        assert!(authenticate(Some(&identity), None, Some(&signature), body).is_err());
        assert!(authenticate(Some(&identity), Some("n1"), Some("zz"), body).is_err());
    }

    #[test]
    fn test_box_limits_and_validation() {
        let dir = tempdir().unwrap();
        let boxes = MessageBox::new(OverlayStore::new(dir.path()).unwrap(), 1);
        let recipient = key_hex(&keypair(5));
        let message = OutgoingMessage {
            recipient: recipient.clone(),
            message_box: "tips".to_string(),
            body: "{}".to_string(),
        };

        let id = boxes.send("sender", &message).unwrap();
        assert!(matches!(boxes.send("sender", &message), Err(NodeError::MessageBoxFull(_))));

        let bad = OutgoingMessage {
            recipient: "not a key".to_string(),
            ..message
        };
        assert!(matches!(boxes.send("sender", &bad), Err(NodeError::InvalidRequest(_))));

        assert_eq!(boxes.list(&recipient, "tips").unwrap()[0].message_id, id);
        assert_eq!(boxes.acknowledge("someone else", &[id]).unwrap(), 0);
        assert_eq!(boxes.acknowledge(&recipient, &[id]).unwrap(), 1);
        assert!(boxes.list(&recipient, "tips").unwrap().is_empty());
    }
}
