//! Postboard payload fields and identity linkage.
//!
//! A post token carries either `[prefix, text]` or
//! `[prefix, identityKey, text, linkage]`. The linkage field is the identity
//! key's signature over the locking key, which lets a reader check that the
//! claimed author really controls the key the post is locked to.

use crate::errors::CoreError;
use crate::pushdrop::PushDropToken;
use crate::types::{public_key_from_hex, LookupOutput, PostRecord, PostStatus, Script, Signature};
use ed25519_dalek::{Keypair, PublicKey, Signer, Verifier};

/// Namespace prefix carried in the first field of every post token.
pub const POSTBOARD_PREFIX: &str = "postboard";

/// Overlay topic posts are submitted under.
pub const POSTBOARD_TOPIC: &str = "Postboard";

/// Overlay lookup provider that answers post queries.
pub const POSTBOARD_PROVIDER: &str = "Postboard";

/// Protocol id used to derive post locking keys.
pub const POSTBOARD_PROTOCOL_ID: &str = "postboard";

/// Key id used to derive post locking keys.
pub const POSTBOARD_KEY_ID: &str = "1";

const LINKAGE_DOMAIN: &[u8] = b"postboard-linkage";

/// The message an identity key signs to vouch for a locking key.
pub fn linkage_message(protocol_id: &str, key_id: &str, locking_key: &PublicKey) -> Vec<u8> {
    let mut message = Vec::with_capacity(LINKAGE_DOMAIN.len() + protocol_id.len() + key_id.len() + 34);
    message.extend_from_slice(LINKAGE_DOMAIN);
    message.extend_from_slice(protocol_id.as_bytes());
    message.push(0);
    message.extend_from_slice(key_id.as_bytes());
    message.push(0);
    message.extend_from_slice(locking_key.as_bytes());
    message
}

/// Signs a linkage between `identity` and `locking_key`.
pub fn sign_linkage(identity: &Keypair, protocol_id: &str, key_id: &str, locking_key: &PublicKey) -> Signature {
    identity
        .sign(&linkage_message(protocol_id, key_id, locking_key))
        .into()
}

/// Checks a linkage signature.
pub fn verify_linkage(
    identity_key: &PublicKey,
    protocol_id: &str,
    key_id: &str,
    locking_key: &PublicKey,
    linkage: &Signature,
) -> Result<(), CoreError> {
    identity_key
        .verify(&linkage_message(protocol_id, key_id, locking_key), &linkage.to_ed25519()?)
        .map_err(|e| CoreError::SignatureVerificationFailed(format!("key linkage: {}", e)))
}

/// The fields of a post token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostPayload {
    /// Hex identity key of the author, if the author chose to reveal one
    pub identity_key: Option<String>,
    /// The post text
    pub text: String,
    /// Identity signature over the locking key
    pub linkage: Option<Signature>,
}

impl PostPayload {
    /// A payload that names its author.
    pub fn with_identity(identity_key: String, text: String, linkage: Signature) -> Self {
        Self {
            identity_key: Some(identity_key),
            text,
            linkage: Some(linkage),
        }
    }

    /// A payload whose author is only the locking key.
    pub fn anonymous(text: String) -> Self {
        Self {
            identity_key: None,
            text,
            linkage: None,
        }
    }

    /// Lays the payload out as token fields.
    pub fn to_fields(&self) -> Vec<Vec<u8>> {
        let mut fields = vec![POSTBOARD_PREFIX.as_bytes().to_vec()];
        if let Some(identity_key) = &self.identity_key {
            fields.push(identity_key.as_bytes().to_vec());
        }
        fields.push(self.text.as_bytes().to_vec());
        if let Some(linkage) = &self.linkage {
            fields.push(linkage.0.to_vec());
        }
        fields
    }

    /// Reads the payload of a post token's locking script.
    pub fn from_script(script: &Script) -> Result<Self, CoreError> {
        Self::from_fields(&PushDropToken::decode(script)?.fields)
    }

    /// Reads a payload back from token fields.
    pub fn from_fields(fields: &[Vec<u8>]) -> Result<Self, CoreError> {
        let prefix = fields.first().ok_or(CoreError::InvalidFieldCount {
            expected: "2 or 4".to_string(),
            actual: 0,
        })?;
        if prefix.as_slice() != POSTBOARD_PREFIX.as_bytes() {
            return Err(CoreError::UnknownPrefix(String::from_utf8_lossy(prefix).into_owned()));
        }

        match fields.len() {
            2 => Ok(Self::anonymous(utf8_field(fields, 1)?)),
            4 => Ok(Self {
                identity_key: Some(utf8_field(fields, 1)?),
                text: utf8_field(fields, 2)?,
                linkage: Some(Signature::from_slice(&fields[3])?),
            }),
            n => Err(CoreError::InvalidFieldCount {
                expected: "2 or 4".to_string(),
                actual: n,
            }),
        }
    }
}

fn utf8_field(fields: &[Vec<u8>], index: usize) -> Result<String, CoreError> {
    String::from_utf8(fields[index].clone()).map_err(|_| CoreError::InvalidUtf8 { index })
}

/// A post decoded from a lookup result, before any integrity filtering.
#[derive(Clone, Debug)]
pub struct DecodedPost {
    /// The decoded token
    pub token: PushDropToken,
    /// The decoded payload
    pub payload: PostPayload,
    /// The lookup result it came from
    pub output: LookupOutput,
}

impl DecodedPost {
    /// Decodes a lookup result into a post.
    pub fn decode(output: LookupOutput) -> Result<Self, CoreError> {
        let token = PushDropToken::decode(&output.output_script)?;
        let payload = PostPayload::from_fields(&token.fields)?;
        Ok(Self { token, payload, output })
    }

    /// Checks the field signature made by the locking key.
    pub fn verify_signature(&self) -> Result<(), CoreError> {
        self.token.verify()
    }

    /// Checks that the named identity vouches for the locking key derived
    /// for `protocol_id`/`key_id`.
    ///
    /// Posts without an identity key are authored by the locking key itself
    /// and pass trivially.
    pub fn verify_linkage(&self, protocol_id: &str, key_id: &str) -> Result<(), CoreError> {
        let identity_hex = match &self.payload.identity_key {
            Some(key) => key,
            None => return Ok(()),
        };
        let linkage = self.payload.linkage.as_ref().ok_or_else(|| {
            CoreError::SignatureVerificationFailed("identity key without linkage".to_string())
        })?;
        let identity_key = public_key_from_hex(identity_hex)?;
        verify_linkage(
            &identity_key,
            protocol_id,
            key_id,
            &self.token.locking_public_key,
            linkage,
        )
    }

    /// The author's identity key, falling back to the locking key.
    pub fn identity_key(&self) -> String {
        self.payload
            .identity_key
            .clone()
            .unwrap_or_else(|| self.token.locking_key_hex())
    }

    /// Converts into a confirmed board record.
    pub fn into_record(self) -> PostRecord {
        let identity_key = self.identity_key();
        PostRecord {
            post: self.payload.text,
            sats: self.output.satoshis,
            identity_key,
            token: self.output.token_ref(),
            status: PostStatus::Confirmed,
        }
    }
}
