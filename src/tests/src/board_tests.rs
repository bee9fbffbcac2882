//! End to end tests of the board against a live node.

use crate::{board, spawn_node};
use ed25519_dalek::{Keypair, PublicKey, SecretKey};
use postboard_cli::{ClientError, HttpOverlay, LocalWallet, NotificationLevel, OverlayService, SigningService};
use postboard_core::post::{sign_linkage, POSTBOARD_KEY_ID, POSTBOARD_PROTOCOL_ID, POSTBOARD_TOPIC};
use postboard_core::{Action, ActionOutput, PostPayload, PostStatus, PushDropToken};

fn keypair(seed: u8) -> Keypair {
    let secret = SecretKey::from_bytes(&[seed; 32]).unwrap();
    let public = PublicKey::from(&secret);
    Keypair { secret, public }
}

/// Tests posting, listing, tipping and redeeming between two wallets.
#[tokio::test]
async fn test_post_tip_redeem_flow() {
    let node = spawn_node().await.unwrap();
    let alice_wallet = LocalWallet::new().unwrap();
    let alice_key = alice_wallet.identity_key_hex().unwrap();
    let bob_wallet = LocalWallet::new().unwrap();
    let bob_key = bob_wallet.identity_key_hex().unwrap();
    let mut alice = board(alice_wallet, &node.url);
    let mut bob = board(bob_wallet, &node.url);

    // Alice posts
    let record = alice.create_post("hello", 1000).await.unwrap();
    assert_eq!(record.status, PostStatus::Pending);
    assert_eq!(alice.state().posts.len(), 1);

    // Bob sees it
    let posts = bob.load_posts().await.unwrap().to_vec();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].post, "hello");
    assert_eq!(posts[0].sats, 1000);
    assert_eq!(posts[0].identity_key, alice_key);
    assert_eq!(posts[0].status, PostStatus::Confirmed);
    assert_eq!(posts[0].outpoint(), record.outpoint());

    // Bob tips it; his board is unchanged
    let receipt = bob.tip_post(&record.outpoint(), 50).await.unwrap();
    assert_eq!(receipt.recipient, alice_key);
    assert_eq!(bob.state().posts, posts);

    // Alice collects the tip exactly once
    alice.take_notifications();
    let tips = alice.poll_incoming_tips().await.unwrap();
    assert_eq!(tips.len(), 1);
    assert_eq!(tips[0].amount, 50);
    assert_eq!(tips[0].sender, bob_key);
    let notifications = alice.take_notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].level, NotificationLevel::Info);
    assert!(alice.poll_incoming_tips().await.unwrap().is_empty());

    // Bob cannot redeem Alice's post
    assert!(matches!(
        bob.redeem_post(&record.outpoint()).await,
        Err(ClientError::RedemptionError(_))
    ));
    assert_eq!(bob.state().posts.len(), 1);

    // Alice redeems and the post is gone for everyone
    alice.redeem_post(&record.outpoint()).await.unwrap();
    assert!(alice.state().posts.is_empty());
    assert!(bob.load_posts().await.unwrap().is_empty());
}

/// Tests that posts claiming someone else's identity never reach the board.
#[tokio::test]
async fn test_spoofed_identity_is_filtered() {
    let node = spawn_node().await.unwrap();
    let victim = LocalWallet::new().unwrap();
    let mut reader = board(LocalWallet::new().unwrap(), &node.url);

    // Mallory links her own locking key but names the victim's identity
    let mallory_identity = keypair(20);
    let mallory_locking = keypair(21);
    let linkage = sign_linkage(
        &mallory_identity,
        POSTBOARD_PROTOCOL_ID,
        POSTBOARD_KEY_ID,
        &mallory_locking.public,
    );
    let payload = PostPayload::with_identity(victim.identity_key_hex().unwrap(), "I am the victim".to_string(), linkage);
    let action = Action::new(
        vec![],
        vec![ActionOutput {
            satoshis: 10,
            locking_script: PushDropToken::create(payload.to_fields(), &mallory_locking).to_script(),
            description: "spoof".to_string(),
        }],
        "spoof",
        rand::random(),
    )
    .unwrap();

    // The overlay admits it; only the board's linkage check rejects it
    let overlay = HttpOverlay::new(&node.url);
    let receipt = overlay.submit(&action, &[POSTBOARD_TOPIC.to_string()]).await.unwrap();
    assert_eq!(receipt.admitted, vec![0]);

    // An honest post next to it survives
    let mut victim_board = board(victim, &node.url);
    victim_board.create_post("the real one", 20).await.unwrap();

    let posts = reader.load_posts().await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].post, "the real one");
}

/// Tests that an unreachable overlay keeps the previous board.
#[tokio::test]
async fn test_unreachable_overlay_keeps_posts() {
    let node = spawn_node().await.unwrap();
    let wallet = LocalWallet::new().unwrap();
    let mut live = board(wallet.clone(), &node.url);
    live.create_post("still here", 5).await.unwrap();
    live.load_posts().await.unwrap();

    // Nothing listens on port 9 locally
    let mut offline = board(wallet, "http://127.0.0.1:9");
    assert!(matches!(offline.load_posts().await, Err(ClientError::LoadError(_))));
    assert!(offline.state().posts.is_empty());
    assert!(!offline.state().posts_loading);
    assert_eq!(offline.state().notifications[0].level, NotificationLevel::Error);

    assert!(matches!(
        offline.create_post("lost", 5).await,
        Err(ClientError::NetworkError(_))
    ));
    assert!(offline.state().posts.is_empty());
    assert_eq!(live.state().posts.len(), 1);
}

/// Tests that the lookup error object reaches the client intact.
#[tokio::test]
async fn test_lookup_error_object() {
    let node = spawn_node().await.unwrap();
    let overlay = HttpOverlay::new(&node.url);

    match overlay.lookup("NoSuchProvider", serde_json::json!({})).await {
        Err(ClientError::LookupError { code, .. }) => assert_eq!(code, "ERR_LOOKUP_SERVICE_NOT_SUPPORTED"),
        other => panic!("unexpected lookup result: {:?}", other),
    }
}

/// Tests that the wallet's actions are what the node expects.
#[tokio::test]
async fn test_wallet_actions_are_admitted() {
    let node = spawn_node().await.unwrap();
    let wallet = LocalWallet::new().unwrap();
    let overlay = HttpOverlay::new(&node.url);

    let script = wallet
        .create_locking_script(
            PostPayload::anonymous("anon".to_string()).to_fields(),
            POSTBOARD_PROTOCOL_ID,
            POSTBOARD_KEY_ID,
        )
        .await
        .unwrap();
    let action = wallet
        .create_action(postboard_cli::services::ActionRequest {
            outputs: vec![ActionOutput {
                satoshis: 1,
                locking_script: script,
                description: "anonymous".to_string(),
            }],
            description: "anonymous post".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let receipt = overlay.submit(&action, &[POSTBOARD_TOPIC.to_string()]).await.unwrap();
    assert_eq!(receipt.admitted, vec![0]);

    let mut reader = board(LocalWallet::new().unwrap(), &node.url);
    let posts = reader.load_posts().await.unwrap();
    assert_eq!(posts.len(), 1);
    // Anonymous posts are attributed to their locking key
    assert_eq!(posts[0].identity_key.len(), 64);
    assert_ne!(posts[0].identity_key, wallet.identity_key_hex().unwrap());
}
