//! List reconciliation controller.
//!
//! The controller is the effect boundary of the board. Each operation calls
//! out to the external services and, only once the call that authorizes a
//! change has succeeded, feeds the outcome through [`reduce`].

use crate::board::{reduce, BoardEvent, BoardState, Notification};
use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::services::{
    ActionRequest, IncomingPayment, OverlayService, PaymentReceipt, PaymentService, SigningService,
};
use postboard_core::post::{POSTBOARD_KEY_ID, POSTBOARD_PROTOCOL_ID, POSTBOARD_PROVIDER, POSTBOARD_TOPIC};
use postboard_core::{
    Action, ActionInput, ActionOutput, DecodedPost, LookupOutput, Outpoint, PostPayload, PostRecord,
    PostStatus, Satoshis,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Names and policies the controller works with.
#[derive(Debug, Clone)]
pub struct BoardOptions {
    /// Topic new posts are submitted under
    pub topic: String,
    /// Lookup provider that lists posts
    pub provider: String,
    /// Protocol id post keys are derived for
    pub protocol_id: String,
    /// Key id post keys are derived for
    pub key_id: String,
    /// Whether to drop posts whose identity linkage does not verify
    pub verify_linkage: bool,
}

impl Default for BoardOptions {
    fn default() -> Self {
        Self {
            topic: POSTBOARD_TOPIC.to_string(),
            provider: POSTBOARD_PROVIDER.to_string(),
            protocol_id: POSTBOARD_PROTOCOL_ID.to_string(),
            key_id: POSTBOARD_KEY_ID.to_string(),
            verify_linkage: true,
        }
    }
}

impl From<&ClientConfig> for BoardOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            topic: config.topic.clone(),
            provider: config.provider.clone(),
            verify_linkage: config.verify_linkage,
            ..Self::default()
        }
    }
}

/// Whether a decoded post may be shown.
///
/// The field signature must always verify. The identity linkage is checked
/// against the options' protocol and key ids when `verify_linkage` is set;
/// a post naming someone else's identity key fails it.
pub fn passes_integrity(decoded: &DecodedPost, options: &BoardOptions) -> bool {
    if let Err(e) = decoded.verify_signature() {
        warn!("Dropping {}.{}: {}", decoded.output.txid, decoded.output.output_index, e);
        return false;
    }
    if options.verify_linkage {
        if let Err(e) = decoded.verify_linkage(&options.protocol_id, &options.key_id) {
            warn!(
                "Dropping {}.{}: {}",
                decoded.output.txid,
                decoded.output.output_index,
                ClientError::IntegrityError(e.to_string())
            );
            return false;
        }
    }
    true
}

/// Decodes lookup results into board records, keeping the service's order.
pub fn decode_posts(outputs: Vec<LookupOutput>, options: &BoardOptions) -> Vec<PostRecord> {
    outputs
        .into_iter()
        .filter_map(|output| {
            let outpoint = format!("{}.{}", output.txid, output.output_index);
            DecodedPost::decode(output)
                .map_err(|e| warn!("Skipping undecodable output {}: {}", outpoint, e))
                .ok()
        })
        .filter(|decoded| passes_integrity(decoded, options))
        .map(DecodedPost::into_record)
        .collect()
}

/// Drives the board against a signing service, an overlay and a payment service.
pub struct BoardController<W, O, P> {
    signer: Arc<W>,
    overlay: O,
    payments: P,
    options: BoardOptions,
    state: BoardState,
}

impl<W, O, P> BoardController<W, O, P>
where
    W: SigningService,
    O: OverlayService,
    P: PaymentService,
{
    /// Creates a controller with an empty, loading board.
    pub fn new(signer: Arc<W>, overlay: O, payments: P, options: BoardOptions) -> Self {
        Self {
            signer,
            overlay,
            payments,
            options,
            state: BoardState::default(),
        }
    }

    /// The current board.
    pub fn state(&self) -> &BoardState {
        &self.state
    }

    /// The signing service.
    pub fn signer(&self) -> &Arc<W> {
        &self.signer
    }

    /// The overlay service.
    pub fn overlay(&self) -> &O {
        &self.overlay
    }

    /// The payment service.
    pub fn payments(&self) -> &P {
        &self.payments
    }

    fn dispatch(&mut self, event: BoardEvent) {
        debug!("Board event: {:?}", event);
        self.state = reduce(&self.state, event);
    }

    fn reject(&mut self, message: &str) -> ClientError {
        self.dispatch(BoardEvent::ValidationFailed(message.to_string()));
        ClientError::ValidationError(message.to_string())
    }

    /// Hands the pending notifications to the caller and clears them.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        let notifications = self.state.notifications.clone();
        self.dispatch(BoardEvent::NotificationsCleared);
        notifications
    }

    /// Locks `text` into a new token worth `amount` and lists it.
    pub async fn create_post(&mut self, text: &str, amount: Satoshis) -> Result<PostRecord, ClientError> {
        if text.trim().is_empty() {
            return Err(self.reject("Enter a post to share!"));
        }
        if amount == 0 {
            return Err(self.reject("Enter an amount of at least 1 satoshi!"));
        }

        self.dispatch(BoardEvent::CreateStarted);
        match self.publish_post(text, amount).await {
            Ok(record) => {
                info!("Created post {}", record.outpoint());
                self.dispatch(BoardEvent::PostCreated(record.clone()));
                Ok(record)
            }
            Err(e) => {
                error!("Failed to create post: {}", e);
                self.dispatch(BoardEvent::CreateFailed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn publish_post(&self, text: &str, amount: Satoshis) -> Result<PostRecord, ClientError> {
        let protocol_id = &self.options.protocol_id;
        let key_id = &self.options.key_id;

        let identity_key = self.signer.identity_key().await?;
        let linkage = self.signer.reveal_linkage(protocol_id, key_id).await?;
        let payload = PostPayload::with_identity(identity_key.clone(), text.to_string(), linkage);

        let locking_script = self
            .signer
            .create_locking_script(payload.to_fields(), protocol_id, key_id)
            .await?;
        let action = self
            .signer
            .create_action(ActionRequest {
                inputs: Vec::new(),
                outputs: vec![ActionOutput {
                    satoshis: amount,
                    locking_script,
                    description: "New Postboard post".to_string(),
                }],
                description: format!("Create a Postboard post: {}", text),
            })
            .await?;

        self.overlay.submit(&action, &[self.options.topic.clone()]).await?;

        let token = action
            .token_ref(0)
            .ok_or_else(|| ClientError::TransactionError("action has no post output".to_string()))?;
        Ok(PostRecord {
            post: text.to_string(),
            sats: amount,
            identity_key,
            token,
            status: PostStatus::Pending,
        })
    }

    /// Replaces the board with what the overlay currently lists.
    ///
    /// On failure the previous posts stay on the board.
    pub async fn load_posts(&mut self) -> Result<&[PostRecord], ClientError> {
        self.dispatch(BoardEvent::LoadStarted);
        let lookup = self
            .overlay
            .lookup(&self.options.provider, serde_json::json!({}))
            .await;

        match lookup {
            Ok(outputs) => {
                let returned = outputs.len();
                let posts = decode_posts(outputs, &self.options);
                info!("Loaded {} posts ({} returned by the overlay)", posts.len(), returned);
                self.dispatch(BoardEvent::LoadSucceeded(posts));
                Ok(&self.state.posts)
            }
            Err(e) => {
                error!("Failed to load posts: {}", e);
                self.dispatch(BoardEvent::LoadFailed(e.to_string()));
                Err(ClientError::LoadError(Box::new(e)))
            }
        }
    }

    /// Spends the token behind a listed post and removes the post.
    pub async fn redeem_post(&mut self, outpoint: &Outpoint) -> Result<PostRecord, ClientError> {
        let record = match self.state.find(outpoint).cloned() {
            Some(record) => record,
            None => {
                let e = ClientError::PostNotFound(outpoint.clone());
                self.dispatch(BoardEvent::RedeemFailed(e.to_string()));
                return Err(ClientError::RedemptionError(Box::new(e)));
            }
        };

        self.dispatch(BoardEvent::RedeemStarted);
        let action = match self.spend_post(&record).await {
            Ok(action) => action,
            Err(e) => {
                error!("Failed to redeem {}: {}", outpoint, e);
                self.dispatch(BoardEvent::RedeemFailed(e.to_string()));
                return Err(ClientError::RedemptionError(Box::new(e)));
            }
        };

        info!("Redeemed post {} in {}", outpoint, action.txid);
        self.dispatch(BoardEvent::PostRedeemed(outpoint.clone()));

        // The spend already happened; the overlay only needs to stop listing it
        if let Err(e) = self.overlay.submit(&action, &[self.options.topic.clone()]).await {
            warn!("Redeemed {} but the overlay was not notified: {}", outpoint, e);
        }
        Ok(record)
    }

    async fn spend_post(&self, record: &PostRecord) -> Result<Action, ClientError> {
        let unlocking_script = self
            .signer
            .create_unlocking_script(&record.token, &self.options.protocol_id, &self.options.key_id)
            .await?;

        self.signer
            .create_action(ActionRequest {
                inputs: vec![ActionInput {
                    txid: record.token.txid.clone(),
                    output_index: record.token.output_index,
                    satoshis: record.token.satoshis,
                    locking_script: record.token.locking_script.clone(),
                    unlocking_script,
                    spending_description: "Redeem a Postboard post".to_string(),
                }],
                outputs: Vec::new(),
                description: format!("Redeem a Postboard post: \"{}\"", record.post),
            })
            .await
    }

    /// Sends `amount` to the author of a listed post. The board is unchanged.
    ///
    /// Only posts that name an identity key can be tipped; an anonymous
    /// post's locking key has no message box anyone reads.
    pub async fn tip_post(&mut self, outpoint: &Outpoint, amount: Satoshis) -> Result<PaymentReceipt, ClientError> {
        if amount == 0 {
            return Err(self.reject("Enter a tip of at least 1 satoshi!"));
        }
        let record = match self.state.find(outpoint).cloned() {
            Some(record) => record,
            None => {
                let e = ClientError::PostNotFound(outpoint.clone());
                self.dispatch(BoardEvent::TipFailed(e.to_string()));
                return Err(e);
            }
        };
        let named = PostPayload::from_script(&record.token.locking_script)
            .map(|payload| payload.identity_key.is_some())
            .unwrap_or(false);
        if !named {
            let e = ClientError::PaymentError(format!("post {} names no author to tip", outpoint));
            self.dispatch(BoardEvent::TipFailed(e.to_string()));
            return Err(e);
        }
        let recipient = record.identity_key;

        self.dispatch(BoardEvent::TipStarted);
        match self.payments.send_payment(&recipient, amount).await {
            Ok(receipt) => {
                self.dispatch(BoardEvent::TipSent { recipient, amount });
                Ok(receipt)
            }
            Err(e) => {
                error!("Failed to tip {}: {}", recipient, e);
                let e = match e {
                    ClientError::PaymentError(_) => e,
                    other => ClientError::PaymentError(other.to_string()),
                };
                self.dispatch(BoardEvent::TipFailed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Accepts every tip waiting for this wallet, one notification each.
    pub async fn poll_incoming_tips(&mut self) -> Result<Vec<IncomingPayment>, ClientError> {
        let incoming = match self.payments.list_incoming().await {
            Ok(incoming) => incoming,
            Err(e) => {
                error!("Failed to list incoming tips: {}", e);
                self.dispatch(BoardEvent::PaymentFailed(e.to_string()));
                return Err(e);
            }
        };

        let mut accepted = Vec::with_capacity(incoming.len());
        for payment in incoming {
            match self.payments.accept(&payment).await {
                Ok(()) => {
                    info!("Accepted tip of {} satoshis from {}", payment.amount, payment.sender);
                    self.dispatch(BoardEvent::TipReceived {
                        sender: payment.sender.clone(),
                        amount: payment.amount,
                    });
                    accepted.push(payment);
                }
                Err(ClientError::IntegrityError(reason)) => {
                    warn!("Rejected payment {}: {}", payment.message_id, reason);
                }
                Err(e) => {
                    error!("Failed to accept payment {}: {}", payment.message_id, e);
                    self.dispatch(BoardEvent::PaymentFailed(e.to_string()));
                    return Err(e);
                }
            }
        }
        Ok(accepted)
    }
}
