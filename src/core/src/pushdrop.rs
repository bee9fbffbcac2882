//! PushDrop token codec.
//!
//! A PushDrop locking script locks an output to a public key while carrying
//! an ordered list of data fields that are dropped from the stack before
//! the signature check runs:
//!
//! ```text
//! <lockingPubKey> OP_CHECKSIG <field_1> ... <field_n> <fieldSignature> OP_2DROP ... [OP_DROP]
//! ```
//!
//! `fieldSignature` is made by the locking key over the push encoding of
//! the fields, so a decoder can tell whether the payload was written by
//! the key holder.

use crate::errors::CoreError;
use crate::types::{spend_preimage, ActionInput, Script, Signature};
use byteorder::{ByteOrder, LittleEndian};
use ed25519_dalek::{Keypair, PublicKey, Signer, Verifier};

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_2DROP: u8 = 0x6d;
pub const OP_DROP: u8 = 0x75;
pub const OP_CHECKSIG: u8 = 0xac;

/// A decoded PushDrop token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushDropToken {
    /// The key the output is locked to
    pub locking_public_key: PublicKey,
    /// The data fields, in order
    pub fields: Vec<Vec<u8>>,
    /// The locking key's signature over the fields
    pub signature: Signature,
}

impl PushDropToken {
    /// Signs the fields with the locking keypair.
    pub fn create(fields: Vec<Vec<u8>>, keypair: &Keypair) -> Self {
        let signature = keypair.sign(&field_message(&fields));
        Self {
            locking_public_key: keypair.public,
            fields,
            signature: signature.into(),
        }
    }

    /// Encodes the token into a locking script.
    pub fn to_script(&self) -> Script {
        let mut script = Vec::new();
        write_push(&mut script, self.locking_public_key.as_bytes());
        script.push(OP_CHECKSIG);
        for field in &self.fields {
            write_push(&mut script, field);
        }
        write_push(&mut script, &self.signature.0);

        let mut remaining = self.fields.len() + 1;
        while remaining > 1 {
            script.push(OP_2DROP);
            remaining -= 2;
        }
        if remaining == 1 {
            script.push(OP_DROP);
        }
        Script(script)
    }

    /// Decodes a locking script. Does not check the field signature.
    pub fn decode(script: &Script) -> Result<Self, CoreError> {
        let bytes = script.as_bytes();
        let mut offset = 0;

        let key_bytes = read_push(bytes, &mut offset)?.ok_or_else(|| malformed(0, "expected locking key push"))?;
        let locking_public_key = PublicKey::from_bytes(&key_bytes)
            .map_err(|e| CoreError::InvalidPublicKey(e.to_string()))?;

        if bytes.get(offset) != Some(&OP_CHECKSIG) {
            return Err(malformed(offset, "expected OP_CHECKSIG"));
        }
        offset += 1;

        let mut pushes = Vec::new();
        while let Some(data) = read_push(bytes, &mut offset)? {
            pushes.push(data);
        }

        let mut dropped = 0;
        while offset < bytes.len() {
            match bytes[offset] {
                OP_2DROP => dropped += 2,
                OP_DROP => dropped += 1,
                _ => return Err(malformed(offset, "unexpected opcode after fields")),
            }
            offset += 1;
        }
        if dropped != pushes.len() {
            return Err(malformed(
                offset,
                &format!("{} pushes but {} dropped", pushes.len(), dropped),
            ));
        }

        let signature_bytes = pushes.pop().ok_or_else(|| malformed(offset, "missing field signature"))?;
        let signature = Signature::from_slice(&signature_bytes)?;

        Ok(Self {
            locking_public_key,
            fields: pushes,
            signature,
        })
    }

    /// Checks the field signature against the locking key.
    pub fn verify(&self) -> Result<(), CoreError> {
        let signature = self.signature.to_ed25519()?;
        self.locking_public_key
            .verify(&field_message(&self.fields), &signature)
            .map_err(|e| CoreError::SignatureVerificationFailed(e.to_string()))
    }

    /// Hex form of the locking key.
    pub fn locking_key_hex(&self) -> String {
        hex::encode(self.locking_public_key.as_bytes())
    }
}

/// The bytes the field signature covers.
fn field_message(fields: &[Vec<u8>]) -> Vec<u8> {
    let mut message = Vec::new();
    for field in fields {
        write_push(&mut message, field);
    }
    message
}

fn malformed(offset: usize, reason: &str) -> CoreError {
    CoreError::MalformedScript {
        offset,
        reason: reason.to_string(),
    }
}

/// Appends a minimally encoded data push.
pub fn write_push(script: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len == 0 {
        script.push(OP_0);
        return;
    } else if len < OP_PUSHDATA1 as usize {
        script.push(len as u8);
    } else if len <= u8::MAX as usize {
        script.push(OP_PUSHDATA1);
        script.push(len as u8);
    } else if len <= u16::MAX as usize {
        script.push(OP_PUSHDATA2);
        let mut buf = [0u8; 2];
        LittleEndian::write_u16(&mut buf, len as u16);
        script.extend_from_slice(&buf);
    } else {
        script.push(OP_PUSHDATA4);
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, len as u32);
        script.extend_from_slice(&buf);
    }
    script.extend_from_slice(data);
}

/// Reads a data push at `offset`. Returns `None` if the next opcode is not a push.
pub fn read_push(script: &[u8], offset: &mut usize) -> Result<Option<Vec<u8>>, CoreError> {
    let start = *offset;
    let opcode = match script.get(start) {
        Some(op) => *op,
        None => return Ok(None),
    };

    let (len, header) = match opcode {
        OP_0 => (0, 1),
        0x01..=0x4b => (opcode as usize, 1),
        OP_PUSHDATA1 => {
            let len = *script.get(start + 1).ok_or_else(|| malformed(start, "truncated PUSHDATA1"))?;
            (len as usize, 2)
        }
        OP_PUSHDATA2 => {
            let raw = script.get(start + 1..start + 3).ok_or_else(|| malformed(start, "truncated PUSHDATA2"))?;
            (LittleEndian::read_u16(raw) as usize, 3)
        }
        OP_PUSHDATA4 => {
            let raw = script.get(start + 1..start + 5).ok_or_else(|| malformed(start, "truncated PUSHDATA4"))?;
            (LittleEndian::read_u32(raw) as usize, 5)
        }
        _ => return Ok(None),
    };

    let data_start = start + header;
    let data = script
        .get(data_start..data_start + len)
        .ok_or_else(|| malformed(start, "push runs past end of script"))?;
    *offset = data_start + len;
    Ok(Some(data.to_vec()))
}

/// Builds a pay-to-public-key script.
pub fn pay_to_public_key(public_key: &PublicKey) -> Script {
    let mut script = Vec::new();
    write_push(&mut script, public_key.as_bytes());
    script.push(OP_CHECKSIG);
    Script(script)
}

/// Builds an unlocking script from a spend signature.
pub fn unlocking_script(signature: &Signature) -> Script {
    let mut script = Vec::new();
    write_push(&mut script, &signature.0);
    Script(script)
}

/// Extracts the spend signature from an unlocking script.
pub fn parse_unlocking_script(script: &Script) -> Result<Signature, CoreError> {
    let mut offset = 0;
    let data = read_push(script.as_bytes(), &mut offset)?
        .ok_or_else(|| malformed(0, "expected signature push"))?;
    if offset != script.as_bytes().len() {
        return Err(malformed(offset, "trailing bytes after signature"));
    }
    Signature::from_slice(&data)
}

/// Checks that an input's unlocking script was signed by `locking_public_key`.
pub fn verify_spend(locking_public_key: &PublicKey, input: &ActionInput) -> Result<(), CoreError> {
    let signature = parse_unlocking_script(&input.unlocking_script)?.to_ed25519()?;
    let preimage = spend_preimage(
        &input.txid,
        input.output_index,
        input.satoshis,
        &input.locking_script,
    );
    locking_public_key
        .verify(&preimage, &signature)
        .map_err(|e| CoreError::SignatureVerificationFailed(e.to_string()))
}
