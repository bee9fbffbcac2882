//! Tests for the node crate.

use postboard_node::storage::OverlayStore;
use postboard_node::{NodeConfig, NodeState};
use postboard_core::wire::LookupRequest;
use postboard_core::{Action, ActionOutput, PostPayload, PushDropToken};
use ed25519_dalek::{Keypair, PublicKey, SecretKey};
use tempfile::tempdir;

fn keypair(seed: u8) -> Keypair {
    let secret = SecretKey::from_bytes(&[seed; 32]).unwrap();
    let public = PublicKey::from(&secret);
    Keypair { secret, public }
}

fn post(text: &str, nonce: u64) -> Action {
    let script = PushDropToken::create(PostPayload::anonymous(text.to_string()).to_fields(), &keypair(1)).to_script();
    Action::new(
        vec![],
        vec![ActionOutput {
            satoshis: 10,
            locking_script: script,
            description: String::new(),
        }],
        "post",
        nonce,
    )
    .unwrap()
}

fn list_all(state: &NodeState) -> Vec<String> {
    state
        .lookup
        .lookup(&LookupRequest {
            provider: "Postboard".to_string(),
            query: serde_json::json!({}),
        })
        .unwrap()
        .into_iter()
        .map(|output| output.txid)
        .collect()
}

/// Tests that tracked outputs survive a node restart in order.
#[test]
fn test_outputs_persist_across_restart() {
    let dir = tempdir().unwrap();
    let config = NodeConfig::default();
    let first = post("first", 1);
    let second = post("second", 2);

    {
        let state = NodeState::open(dir.path(), &config.overlay).unwrap();
        state.topics.submit(&first).unwrap();
        state.topics.submit(&second).unwrap();
    }

    let state = NodeState::open(dir.path(), &config.overlay).unwrap();
    assert_eq!(list_all(&state), vec![second.txid.clone(), first.txid.clone()]);

    let third = post("third", 3);
    state.topics.submit(&third).unwrap();
    assert_eq!(list_all(&state)[0], third.txid);
}

/// Tests that one store can back several topics without mixing them.
#[test]
fn test_topics_share_a_store() {
    let dir = tempdir().unwrap();
    let store = OverlayStore::new(dir.path()).unwrap();
    let mut other = NodeConfig::default().overlay;
    other.topic = "Other".to_string();
    other.provider = "Other".to_string();

    let postboard = NodeState::with_store(store.clone(), &NodeConfig::default().overlay);
    let elsewhere = NodeState::with_store(store, &other);

    postboard.topics.submit(&post("here", 1)).unwrap();
    assert_eq!(list_all(&postboard).len(), 1);
    assert!(elsewhere
        .lookup
        .lookup(&LookupRequest {
            provider: "Other".to_string(),
            query: serde_json::json!({}),
        })
        .unwrap()
        .is_empty());
}
