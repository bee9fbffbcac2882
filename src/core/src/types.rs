//! Core types for Postboard tokens and the actions that carry them.

use crate::errors::CoreError;
use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Satoshi amount carried by an output.
pub type Satoshis = u64;

/// Signature, represented as a 64-byte array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// Parses a signature from raw bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.len() != 64 {
            return Err(CoreError::SerializationError(format!(
                "invalid signature length: {} (expected 64)",
                bytes.len()
            )));
        }
        let mut signature = [0u8; 64];
        signature.copy_from_slice(bytes);
        Ok(Signature(signature))
    }

    /// Converts into the ed25519 signature type for verification.
    pub fn to_ed25519(&self) -> Result<ed25519_dalek::Signature, CoreError> {
        ed25519_dalek::Signature::try_from(&self.0[..])
            .map_err(|e| CoreError::SignatureVerificationFailed(e.to_string()))
    }
}

impl From<ed25519_dalek::Signature> for Signature {
    fn from(signature: ed25519_dalek::Signature) -> Self {
        Signature(signature.to_bytes())
    }
}

// Signatures travel as hex strings in JSON bodies
impl Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(&encoded).map_err(serde::de::Error::custom)?;
        Signature::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

/// A raw script, carried as hex on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Script(pub Vec<u8>);

impl Script {
    /// Parses a script from its hex form.
    pub fn from_hex(encoded: &str) -> Result<Self, CoreError> {
        Ok(Script(hex::decode(encoded)?))
    }

    /// Returns the hex form of the script.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Returns the raw script bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns true if the script is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        Script::from_hex(&encoded).map_err(serde::de::Error::custom)
    }
}

/// Identifies a single output of an action.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outpoint {
    /// The action (transaction) id
    pub txid: String,
    /// The output index inside the action
    pub output_index: u32,
}

impl Outpoint {
    /// Creates a new outpoint.
    pub fn new(txid: impl Into<String>, output_index: u32) -> Self {
        Self {
            txid: txid.into(),
            output_index,
        }
    }
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.txid, self.output_index)
    }
}

/// Handle on the signed output that backs a post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRef {
    /// The action id that created the output
    pub txid: String,
    /// The output index inside that action
    pub output_index: u32,
    /// The locking script of the output
    pub locking_script: Script,
    /// The value locked in the output
    pub satoshis: Satoshis,
}

impl TokenRef {
    /// Returns the outpoint this token refers to.
    pub fn outpoint(&self) -> Outpoint {
        Outpoint::new(self.txid.clone(), self.output_index)
    }
}

/// Where a post sits in its lifecycle. Redeemed posts are removed, not marked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Created locally, not yet seen in a lookup
    Pending,
    /// Returned by the overlay lookup
    Confirmed,
}

/// A post as shown on the board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    /// The post text
    pub post: String,
    /// The value locked in the post token
    pub sats: Satoshis,
    /// Hex identity key of the author
    pub identity_key: String,
    /// The token backing the post
    pub token: TokenRef,
    /// Lifecycle status
    pub status: PostStatus,
}

impl PostRecord {
    /// Returns the outpoint of the backing token.
    pub fn outpoint(&self) -> Outpoint {
        self.token.outpoint()
    }
}

impl fmt::Display for PostRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Post {{ post: {:?}, sats: {}, identity_key: {}, outpoint: {} }}",
            self.post,
            self.sats,
            self.identity_key,
            self.outpoint()
        )
    }
}

/// An output created by an action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutput {
    /// The output value
    pub satoshis: Satoshis,
    /// The locking script
    pub locking_script: Script,
    /// Human readable description
    #[serde(default)]
    pub description: String,
}

/// An input consumed by an action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInput {
    /// The action id of the output being spent
    pub txid: String,
    /// The output index being spent
    pub output_index: u32,
    /// The value of the output being spent
    pub satoshis: Satoshis,
    /// The locking script of the output being spent
    pub locking_script: Script,
    /// The script that unlocks it
    pub unlocking_script: Script,
    /// Why the input was spent
    #[serde(default)]
    pub spending_description: String,
}

impl ActionInput {
    /// Returns the outpoint this input spends.
    pub fn outpoint(&self) -> Outpoint {
        Outpoint::new(self.txid.clone(), self.output_index)
    }
}

/// A transaction as produced by the signing service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Hex SHA-256 of the action body
    pub txid: String,
    /// Inputs consumed
    #[serde(default)]
    pub inputs: Vec<ActionInput>,
    /// Outputs created
    #[serde(default)]
    pub outputs: Vec<ActionOutput>,
    /// Human readable description
    #[serde(default)]
    pub description: String,
    /// Random value that keeps otherwise identical actions apart
    pub nonce: u64,
}

#[derive(Serialize)]
struct ActionBody<'a> {
    inputs: &'a [ActionInput],
    outputs: &'a [ActionOutput],
    description: &'a str,
    nonce: u64,
}

impl Action {
    /// Creates a new action and computes its id.
    pub fn new(
        inputs: Vec<ActionInput>,
        outputs: Vec<ActionOutput>,
        description: impl Into<String>,
        nonce: u64,
    ) -> Result<Self, CoreError> {
        let mut action = Self {
            txid: String::new(),
            inputs,
            outputs,
            description: description.into(),
            nonce,
        };
        action.txid = action.compute_txid()?;
        Ok(action)
    }

    /// Computes the id from the current body.
    pub fn compute_txid(&self) -> Result<String, CoreError> {
        let body = ActionBody {
            inputs: &self.inputs,
            outputs: &self.outputs,
            description: &self.description,
            nonce: self.nonce,
        };
        let bytes = bincode::serialize(&body)
            .map_err(|e| CoreError::SerializationError(e.to_string()))?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    /// Checks that the stored id matches the body.
    pub fn has_valid_txid(&self) -> bool {
        matches!(self.compute_txid(), Ok(txid) if txid == self.txid)
    }

    /// Builds the token handle for one of this action's outputs.
    pub fn token_ref(&self, output_index: u32) -> Option<TokenRef> {
        self.outputs.get(output_index as usize).map(|output| TokenRef {
            txid: self.txid.clone(),
            output_index,
            locking_script: output.locking_script.clone(),
            satoshis: output.satoshis,
        })
    }
}

/// Domain separator for spend signatures.
const SPEND_DOMAIN: &[u8] = b"postboard-spend";

/// Computes the message a spender signs to unlock an output.
pub fn spend_preimage(
    txid: &str,
    output_index: u32,
    satoshis: Satoshis,
    locking_script: &Script,
) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(SPEND_DOMAIN);
    hasher.update(txid.as_bytes());

    let mut index_bytes = [0u8; 4];
    LittleEndian::write_u32(&mut index_bytes, output_index);
    hasher.update(index_bytes);

    let mut sats_bytes = [0u8; 8];
    LittleEndian::write_u64(&mut sats_bytes, satoshis);
    hasher.update(sats_bytes);

    hasher.update(locking_script.as_bytes());
    hasher.finalize().to_vec()
}

/// An output returned by the overlay lookup service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupOutput {
    /// The action id
    pub txid: String,
    /// The output index
    pub output_index: u32,
    /// The locking script of the output
    pub output_script: Script,
    /// The output value
    pub satoshis: Satoshis,
}

impl LookupOutput {
    /// Returns the token handle for this output.
    pub fn token_ref(&self) -> TokenRef {
        TokenRef {
            txid: self.txid.clone(),
            output_index: self.output_index,
            locking_script: self.output_script.clone(),
            satoshis: self.satoshis,
        }
    }
}

/// Parses a hex encoded ed25519 public key.
pub fn public_key_from_hex(encoded: &str) -> Result<ed25519_dalek::PublicKey, CoreError> {
    let bytes = hex::decode(encoded)?;
    ed25519_dalek::PublicKey::from_bytes(&bytes)
        .map_err(|e| CoreError::InvalidPublicKey(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_output() -> ActionOutput {
        ActionOutput {
            satoshis: 1000,
            locking_script: Script(vec![0x51, 0xac]),
            description: "New Postboard post".to_string(),
        }
    }

    #[test]
    fn test_action_txid_is_deterministic() {
        let a = Action::new(vec![], vec![sample_output()], "post", 7).unwrap();
        let b = Action::new(vec![], vec![sample_output()], "post", 7).unwrap();
        assert_eq!(a.txid, b.txid);
        assert_eq!(a.txid.len(), 64);
        assert!(a.has_valid_txid());

        // A different nonce separates otherwise identical actions
        let c = Action::new(vec![], vec![sample_output()], "post", 8).unwrap();
        assert_ne!(a.txid, c.txid);
    }

    #[test]
    fn test_tampered_action_has_invalid_txid() {
        let mut action = Action::new(vec![], vec![sample_output()], "post", 1).unwrap();
        action.outputs[0].satoshis = 1;
        assert!(!action.has_valid_txid());
    }

    #[test]
    fn test_token_ref_from_action() {
        let action = Action::new(vec![], vec![sample_output()], "post", 1).unwrap();
        let token = action.token_ref(0).unwrap();
        assert_eq!(token.txid, action.txid);
        assert_eq!(token.satoshis, 1000);
        assert!(action.token_ref(1).is_none());
    }

    #[test]
    fn test_script_and_signature_travel_as_hex() {
        let output = sample_output();
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["lockingScript"], "51ac");

        let signature = Signature([7u8; 64]);
        let encoded = serde_json::to_string(&signature).unwrap();
        let decoded: Signature = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, signature);

        assert!(serde_json::from_str::<Signature>("\"abcd\"").is_err());
    }

    #[test]
    fn test_spend_preimage_commits_to_outpoint() {
        let script = Script(vec![1, 2, 3]);
        let base = spend_preimage("aa", 0, 1000, &script);
        assert_ne!(base, spend_preimage("aa", 1, 1000, &script));
        assert_ne!(base, spend_preimage("aa", 0, 999, &script));
        assert_ne!(base, spend_preimage("bb", 0, 1000, &script));
        assert_eq!(base, spend_preimage("aa", 0, 1000, &script));
    }
}
