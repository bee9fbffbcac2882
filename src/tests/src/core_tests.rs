//! Tests for the core crate.

use ed25519_dalek::{Keypair, PublicKey, SecretKey};
use postboard_core::post::{sign_linkage, POSTBOARD_KEY_ID, POSTBOARD_PROTOCOL_ID};
use postboard_core::{DecodedPost, LookupOutput, PostPayload, PostStatus, PushDropToken};

fn keypair(seed: u8) -> Keypair {
    let secret = SecretKey::from_bytes(&[seed; 32]).unwrap();
    let public = PublicKey::from(&secret);
    Keypair { secret, public }
}

fn lookup_output(payload: &PostPayload, locking: &Keypair) -> LookupOutput {
    LookupOutput {
        txid: "ab".repeat(32),
        output_index: 0,
        output_script: PushDropToken::create(payload.to_fields(), locking).to_script(),
        satoshis: 1234,
    }
}

/// Tests that a linked post decodes into the record the board shows.
#[test]
fn test_linked_post_to_record() {
    let identity = keypair(1);
    let locking = keypair(2);
    let linkage = sign_linkage(&identity, POSTBOARD_PROTOCOL_ID, POSTBOARD_KEY_ID, &locking.public);
    let payload = PostPayload::with_identity(hex::encode(identity.public.as_bytes()), "gm".to_string(), linkage);

    let decoded = DecodedPost::decode(lookup_output(&payload, &locking)).unwrap();
    decoded.verify_signature().unwrap();
    decoded.verify_linkage(POSTBOARD_PROTOCOL_ID, POSTBOARD_KEY_ID).unwrap();

    let record = decoded.into_record();
    assert_eq!(record.post, "gm");
    assert_eq!(record.sats, 1234);
    assert_eq!(record.identity_key, hex::encode(identity.public.as_bytes()));
    assert_eq!(record.status, PostStatus::Confirmed);
    assert_eq!(record.token.satoshis, 1234);
}

/// Tests that non-ASCII and long posts survive the codec.
#[test]
fn test_unicode_and_long_posts() {
    let locking = keypair(3);
    let texts = vec!["héllo wörld ✨".to_string(), "x".repeat(300), "y".repeat(70_000)];
    for text in texts {
        let payload = PostPayload::anonymous(text.clone());
        let decoded = DecodedPost::decode(lookup_output(&payload, &locking)).unwrap();
        decoded.verify_signature().unwrap();
        assert_eq!(decoded.payload.text, text);
    }
}

/// Tests that a linkage made for another key does not transfer.
#[test]
fn test_linkage_is_bound_to_locking_key() {
    let identity = keypair(4);
    let linkage = sign_linkage(&identity, POSTBOARD_PROTOCOL_ID, POSTBOARD_KEY_ID, &keypair(5).public);
    let payload = PostPayload::with_identity(hex::encode(identity.public.as_bytes()), "moved".to_string(), linkage);

    let decoded = DecodedPost::decode(lookup_output(&payload, &keypair(6))).unwrap();
    decoded.verify_signature().unwrap();
    assert!(decoded.verify_linkage(POSTBOARD_PROTOCOL_ID, POSTBOARD_KEY_ID).is_err());
}
