//! Tip payments delivered through the overlay's message box.

use crate::errors::ClientError;
use crate::services::{ActionRequest, IncomingPayment, PaymentReceipt, PaymentService, SigningService};
use async_trait::async_trait;
use postboard_core::pushdrop::pay_to_public_key;
use postboard_core::types::public_key_from_hex;
use postboard_core::wire::{
    auth_message, AcknowledgeRequest, ErrorObject, ListMessagesRequest, ListMessagesResponse,
    OutgoingMessage, PeerMessage, SendMessageRequest, TipPayment, IDENTITY_KEY_HEADER, NONCE_HEADER,
    SIGNATURE_HEADER,
};
use postboard_core::{ActionOutput, Satoshis};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Payment service that sends tips as messages signed by the wallet.
pub struct MessageBoxPayments<W> {
    base_url: String,
    message_box: String,
    client: reqwest::Client,
    signer: Arc<W>,
}

impl<W: SigningService> MessageBoxPayments<W> {
    /// Creates a payment client for the message box host at `base_url`.
    pub fn new(base_url: &str, message_box: &str, signer: Arc<W>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            message_box: message_box.to_string(),
            client: reqwest::Client::new(),
            signer,
        }
    }

    /// Posts an authenticated JSON body and returns the JSON reply.
    async fn authed_post<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<serde_json::Value, ClientError> {
        let body = serde_json::to_vec(body)?;
        let nonce = hex::encode(rand::random::<[u8; 16]>());
        let identity_key = self.signer.identity_key().await?;
        let signature = self.signer.sign(&auth_message(&nonce, &body)).await?;

        let response = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(IDENTITY_KEY_HEADER, identity_key)
            .header(NONCE_HEADER, nonce)
            .header(SIGNATURE_HEADER, hex::encode(signature.0))
            .body(body)
            .send()
            .await
            .map_err(|e| ClientError::PaymentError(format!("Failed to reach message box: {}", e)))?;
        let status = response.status();
        let reply = response.bytes().await?;

        let value: serde_json::Value = serde_json::from_slice(&reply)
            .map_err(|e| ClientError::PaymentError(format!("message box reply is not JSON: {}", e)))?;
        if let Some(error) = ErrorObject::from_value(&value) {
            return Err(ClientError::PaymentError(format!(
                "{} ({})",
                error.description,
                error.code.unwrap_or_else(|| "ERR_UNKNOWN".to_string())
            )));
        }
        if !status.is_success() {
            return Err(ClientError::PaymentError(format!("message box answered {}", status)));
        }
        Ok(value)
    }

    async fn acknowledge(&self, message_ids: Vec<u64>) -> Result<(), ClientError> {
        self.authed_post("acknowledgeMessage", &AcknowledgeRequest { message_ids })
            .await
            .map(|_| ())
    }
}

/// Reads a tip out of a message body.
pub fn parse_tip(message: &PeerMessage) -> Result<IncomingPayment, ClientError> {
    let tip: TipPayment = serde_json::from_str(&message.body)
        .map_err(|e| ClientError::IntegrityError(format!("message {} is not a tip: {}", message.message_id, e)))?;
    if tip.sender != message.sender {
        return Err(ClientError::IntegrityError(format!(
            "message {} claims a different sender",
            message.message_id
        )));
    }
    Ok(IncomingPayment {
        message_id: message.message_id,
        sender: tip.sender,
        amount: tip.amount,
        action: tip.action,
    })
}

/// Checks that a payment's action really pays `identity_key` the announced amount.
pub fn verify_payment(payment: &IncomingPayment, identity_key: &str) -> Result<(), ClientError> {
    if !payment.action.has_valid_txid() {
        return Err(ClientError::IntegrityError(format!(
            "payment {} has an invalid action id",
            payment.message_id
        )));
    }
    let recipient = public_key_from_hex(identity_key)?;
    let expected_script = pay_to_public_key(&recipient);
    let paid = payment
        .action
        .outputs
        .iter()
        .filter(|output| output.locking_script == expected_script)
        .try_fold(0 as Satoshis, |total, output| total.checked_add(output.satoshis))
        .ok_or_else(|| {
            ClientError::IntegrityError(format!("payment {} overflows its output total", payment.message_id))
        })?;
    if paid != payment.amount {
        return Err(ClientError::IntegrityError(format!(
            "payment {} announces {} satoshis but pays {}",
            payment.message_id, payment.amount, paid
        )));
    }
    Ok(())
}

#[async_trait]
impl<W: SigningService> PaymentService for MessageBoxPayments<W> {
    async fn send_payment(&self, recipient: &str, amount: Satoshis) -> Result<PaymentReceipt, ClientError> {
        let recipient_key = public_key_from_hex(recipient)
            .map_err(|e| ClientError::PaymentError(format!("invalid recipient {}: {}", recipient, e)))?;

        let action = self
            .signer
            .create_action(ActionRequest {
                inputs: Vec::new(),
                outputs: vec![ActionOutput {
                    satoshis: amount,
                    locking_script: pay_to_public_key(&recipient_key),
                    description: "Postboard tip".to_string(),
                }],
                description: format!("Tip {} satoshis to a Postboard author", amount),
            })
            .await?;
        let txid = action.txid.clone();

        let tip = TipPayment {
            sender: self.signer.identity_key().await?,
            amount,
            action,
        };
        let request = SendMessageRequest {
            message: OutgoingMessage {
                recipient: recipient.to_string(),
                message_box: self.message_box.clone(),
                body: serde_json::to_string(&tip)?,
            },
        };
        self.authed_post("sendMessage", &request).await?;

        info!("Sent tip of {} satoshis to {}", amount, recipient);
        Ok(PaymentReceipt {
            recipient: recipient.to_string(),
            amount,
            txid,
        })
    }

    async fn list_incoming(&self) -> Result<Vec<IncomingPayment>, ClientError> {
        let reply = self
            .authed_post(
                "listMessages",
                &ListMessagesRequest {
                    message_box: self.message_box.clone(),
                },
            )
            .await?;
        let response: ListMessagesResponse = serde_json::from_value(reply)?;

        let mut payments = Vec::new();
        let mut unreadable = Vec::new();
        for message in &response.messages {
            match parse_tip(message) {
                Ok(payment) => payments.push(payment),
                Err(e) => {
                    warn!("Discarding message {}: {}", message.message_id, e);
                    unreadable.push(message.message_id);
                }
            }
        }
        if !unreadable.is_empty() {
            self.acknowledge(unreadable).await?;
        }

        debug!("{} incoming payments waiting", payments.len());
        Ok(payments)
    }

    async fn accept(&self, payment: &IncomingPayment) -> Result<(), ClientError> {
        let identity_key = self.signer.identity_key().await?;
        let verdict = verify_payment(payment, &identity_key);

        // Acknowledge either way so a bad payment is not offered again
        self.acknowledge(vec![payment.message_id]).await?;
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::LocalWallet;
    use postboard_core::{Action, Script};

    fn tip_action(recipient: &LocalWallet, amount: Satoshis) -> Action {
        let key = recipient.identity_keypair().unwrap().public;
        Action::new(
            vec![],
            vec![ActionOutput {
                satoshis: amount,
                locking_script: pay_to_public_key(&key),
                description: "Postboard tip".to_string(),
            }],
            "tip",
            3,
        )
        .unwrap()
    }

    #[test]
    fn test_verify_payment() {
        let me = LocalWallet::new().unwrap();
        let my_key = me.identity_key_hex().unwrap();

        let payment = IncomingPayment {
            message_id: 1,
            sender: "ab".to_string(),
            amount: 50,
            action: tip_action(&me, 50),
        };
        verify_payment(&payment, &my_key).unwrap();

        let overstated = IncomingPayment { amount: 500, ..payment.clone() };
        assert!(matches!(verify_payment(&overstated, &my_key), Err(ClientError::IntegrityError(_))));

        let someone_else = LocalWallet::new().unwrap();
        let misdirected = IncomingPayment {
            action: tip_action(&someone_else, 50),
            ..payment.clone()
        };
        assert!(verify_payment(&misdirected, &my_key).is_err());

        let mut tampered = payment;
        tampered.action.outputs[0].locking_script = Script(vec![0xac]);
        assert!(verify_payment(&tampered, &my_key).is_err());
    }

    #[test]
    fn test_verify_payment_overflowing_outputs() {
        let me = LocalWallet::new().unwrap();
        let key = me.identity_keypair().unwrap().public;
        let output = |satoshis| ActionOutput {
            satoshis,
            locking_script: pay_to_public_key(&key),
            description: "Postboard tip".to_string(),
        };
        let payment = IncomingPayment {
            message_id: 4,
            sender: "ab".to_string(),
            amount: 1,
            action: Action::new(vec![], vec![output(u64::MAX), output(2)], "tip", 5).unwrap(),
        };
        assert!(matches!(
            verify_payment(&payment, &me.identity_key_hex().unwrap()),
            Err(ClientError::IntegrityError(_))
        ));
    }

    #[test]
    fn test_parse_tip() {
        let me = LocalWallet::new().unwrap();
        let tip = TipPayment {
            sender: "cafe".to_string(),
            amount: 50,
            action: tip_action(&me, 50),
        };
        let message = PeerMessage {
            message_id: 9,
            sender: "cafe".to_string(),
            body: serde_json::to_string(&tip).unwrap(),
        };
        let payment = parse_tip(&message).unwrap();
        assert_eq!(payment.message_id, 9);
        assert_eq!(payment.amount, 50);

        let forged = PeerMessage {
            sender: "beef".to_string(),
            ..message.clone()
        };
        assert!(parse_tip(&forged).is_err());

        let garbage = PeerMessage {
            body: "hello".to_string(),
            ..message
        };
        assert!(parse_tip(&garbage).is_err());
    }
}
