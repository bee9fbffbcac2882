//! Topic manager deciding which outputs of a submitted action are tracked.

use crate::errors::NodeError;
use crate::metrics::{OUTPUTS_ADMITTED, OUTPUTS_REMOVED, TRACKED_OUTPUTS};
use crate::storage::OverlayStore;
use postboard_core::post::PostPayload;
use postboard_core::pushdrop::verify_spend;
use postboard_core::{Action, ActionInput, ActionOutput, LookupOutput, Outpoint, PushDropToken};
use tracing::{debug, info, warn};

/// What a submission changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Admittance {
    /// Indexes of the action's outputs now tracked
    pub admitted: Vec<u32>,
    /// Previously tracked outputs the action spent
    pub removed: Vec<Outpoint>,
}

/// Tracks Postboard tokens under one topic.
#[derive(Clone)]
pub struct TopicManager {
    topic: String,
    store: OverlayStore,
}

/// Checks that an output is a signed Postboard token.
pub fn check_output(output: &ActionOutput) -> Result<(), NodeError> {
    if output.satoshis == 0 {
        return Err(NodeError::InvalidAction("output carries no satoshis".to_string()));
    }
    let token = PushDropToken::decode(&output.locking_script)?;
    PostPayload::from_fields(&token.fields)?;
    Ok(token.verify()?)
}

/// Checks that `input` validly spends the tracked `output`.
pub fn check_spend(output: &LookupOutput, input: &ActionInput) -> Result<(), NodeError> {
    if input.locking_script != output.output_script || input.satoshis != output.satoshis {
        return Err(NodeError::InvalidAction(
            "input does not match the tracked output".to_string(),
        ));
    }
    let token = PushDropToken::decode(&output.output_script)?;
    Ok(verify_spend(&token.locking_public_key, input)?)
}

impl TopicManager {
    /// Creates a topic manager writing to `store`.
    pub fn new(topic: &str, store: OverlayStore) -> Self {
        Self {
            topic: topic.to_string(),
            store,
        }
    }

    /// The topic name.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Applies an action: removes the tracked outputs it spends, then admits
    /// its valid Postboard outputs.
    pub fn submit(&self, action: &Action) -> Result<Admittance, NodeError> {
        if !action.has_valid_txid() {
            return Err(NodeError::InvalidAction(format!(
                "txid {} does not match the action body",
                action.txid
            )));
        }

        let mut admittance = Admittance::default();

        for input in &action.inputs {
            let outpoint = input.outpoint();
            let stored = match self.store.get_output(&outpoint)? {
                Some(stored) if stored.topic == self.topic => stored,
                _ => continue,
            };
            match check_spend(&stored.output, input) {
                Ok(()) => {
                    self.store.remove_output(&outpoint)?;
                    admittance.removed.push(outpoint);
                }
                Err(e) => warn!("Ignoring spend of {}: {}", outpoint, e),
            }
        }

        for (index, output) in action.outputs.iter().enumerate() {
            let index = index as u32;
            if let Err(e) = check_output(output) {
                debug!("Output {}.{} not admitted: {}", action.txid, index, e);
                continue;
            }
            let lookup_output = LookupOutput {
                txid: action.txid.clone(),
                output_index: index,
                output_script: output.locking_script.clone(),
                satoshis: output.satoshis,
            };
            if self.store.insert_output(&self.topic, &lookup_output)? {
                admittance.admitted.push(index);
            }
        }

        OUTPUTS_ADMITTED.inc_by(admittance.admitted.len() as f64);
        OUTPUTS_REMOVED.inc_by(admittance.removed.len() as f64);
        TRACKED_OUTPUTS.set(self.store.output_count()? as f64);

        info!(
            "Action {}: admitted {:?}, removed {}",
            action.txid,
            admittance.admitted,
            admittance.removed.len()
        );
        Ok(admittance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Keypair, PublicKey, SecretKey, Signer};
    use postboard_core::pushdrop::{pay_to_public_key, unlocking_script};
    use postboard_core::types::spend_preimage;
    use postboard_core::{Script, Signature};
    use tempfile::tempdir;

    fn keypair(seed: u8) -> Keypair {
        let secret = SecretKey::from_bytes(&[seed; 32]).unwrap();
        let public = PublicKey::from(&secret);
        Keypair { secret, public }
    }

    fn post_output(keypair: &Keypair, text: &str) -> ActionOutput {
        ActionOutput {
            satoshis: 1000,
            locking_script: PushDropToken::create(PostPayload::anonymous(text.to_string()).to_fields(), keypair)
                .to_script(),
            description: "New Postboard post".to_string(),
        }
    }

    fn spend(keypair: &Keypair, txid: &str, output: &ActionOutput) -> ActionInput {
        let preimage = spend_preimage(txid, 0, output.satoshis, &output.locking_script);
        let signature: Signature = keypair.sign(&preimage).into();
        ActionInput {
            txid: txid.to_string(),
            output_index: 0,
            satoshis: output.satoshis,
            locking_script: output.locking_script.clone(),
            unlocking_script: unlocking_script(&signature),
            spending_description: "Redeem".to_string(),
        }
    }

    fn manager() -> (tempfile::TempDir, TopicManager) {
        let dir = tempdir().unwrap();
        let store = OverlayStore::new(dir.path()).unwrap();
        (dir, TopicManager::new("Postboard", store))
    }

    #[test]
    fn test_admits_only_postboard_tokens() {
        let (_dir, manager) = manager();
        let author = keypair(1);
        let action = Action::new(
            vec![],
            vec![
                post_output(&author, "hello"),
                ActionOutput {
                    satoshis: 5,
                    locking_script: pay_to_public_key(&author.public),
                    description: "change".to_string(),
                },
                ActionOutput {
                    satoshis: 5,
                    locking_script: PushDropToken::create(vec![b"other".to_vec(), b"x".to_vec()], &author)
                        .to_script(),
                    description: "foreign".to_string(),
                },
            ],
            "post",
            1,
        )
        .unwrap();

        let admittance = manager.submit(&action).unwrap();
        assert_eq!(admittance.admitted, vec![0]);
        assert!(admittance.removed.is_empty());

        // Submitting again admits nothing new
        assert!(manager.submit(&action).unwrap().admitted.is_empty());
    }

    #[test]
    fn test_rejects_tampered_txid() {
        let (_dir, manager) = manager();
        let mut action = Action::new(vec![], vec![post_output(&keypair(1), "hi")], "post", 1).unwrap();
        action.outputs[0].satoshis = 2000;
        assert!(matches!(manager.submit(&action), Err(NodeError::InvalidAction(_))));
    }

    #[test]
    fn test_rejects_forged_field_signature() {
        let (_dir, manager) = manager();
        let mut token = PushDropToken::create(PostPayload::anonymous("real".to_string()).to_fields(), &keypair(1));
        token.fields[1] = b"forged".to_vec();
        let output = ActionOutput {
            satoshis: 10,
            locking_script: token.to_script(),
            description: String::new(),
        };
        let action = Action::new(vec![], vec![output], "post", 1).unwrap();
        assert!(manager.submit(&action).unwrap().admitted.is_empty());
    }

    #[test]
    fn test_valid_spend_removes_output() {
        let (_dir, manager) = manager();
        let author = keypair(1);
        let output = post_output(&author, "bye");
        let post = Action::new(vec![], vec![output.clone()], "post", 1).unwrap();
        manager.submit(&post).unwrap();

        let redeem = Action::new(vec![spend(&author, &post.txid, &output)], vec![], "redeem", 2).unwrap();
        let admittance = manager.submit(&redeem).unwrap();
        assert_eq!(admittance.removed, vec![Outpoint::new(post.txid.clone(), 0)]);
        assert!(manager.store.list_outputs("Postboard").unwrap().is_empty());
    }

    #[test]
    fn test_foreign_spend_is_ignored() {
        let (_dir, manager) = manager();
        let output = post_output(&keypair(1), "mine");
        let post = Action::new(vec![], vec![output.clone()], "post", 1).unwrap();
        manager.submit(&post).unwrap();

        let thief = Action::new(vec![spend(&keypair(2), &post.txid, &output)], vec![], "steal", 2).unwrap();
        assert!(manager.submit(&thief).unwrap().removed.is_empty());

        let mut lying = spend(&keypair(1), &post.txid, &output);
        lying.locking_script = Script(vec![0xac]);
        let lying = Action::new(vec![lying], vec![], "lie", 3).unwrap();
        assert!(manager.submit(&lying).unwrap().removed.is_empty());
        assert_eq!(manager.store.list_outputs("Postboard").unwrap().len(), 1);
    }
}
