//! RocksDB storage for admitted outputs and message boxes.
//!
//! Key layout:
//! - `meta/seq`, `meta/msg`: big-endian u64 counters
//! - `out/<seq>`: an admitted output, ordered by admission
//! - `idx/<txid>.<index>`: the sequence number of an admitted output
//! - `msg/<recipient>\0<box>\0<id>`: a message waiting in a box

use crate::errors::NodeError;
use byteorder::{BigEndian, ByteOrder};
use postboard_core::wire::PeerMessage;
use postboard_core::{LookupOutput, Outpoint};
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const OUTPUT_SEQ_KEY: &[u8] = b"meta/seq";
const MESSAGE_SEQ_KEY: &[u8] = b"meta/msg";
const OUTPUT_PREFIX: &[u8] = b"out/";
const INDEX_PREFIX: &[u8] = b"idx/";
const MESSAGE_PREFIX: &[u8] = b"msg/";

/// An output admitted under a topic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOutput {
    /// Topic the output was admitted under
    pub topic: String,
    /// The output itself
    pub output: LookupOutput,
}

/// A message held for its recipient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct StoredMessage {
    message_id: u64,
    sender: String,
    body: String,
}

/// A wrapper around RocksDB for the overlay's outputs and messages.
#[derive(Clone)]
pub struct OverlayStore {
    /// The RocksDB instance
    db: Arc<Mutex<DB>>,
}

fn sequence_bytes(seq: u64) -> [u8; 8] {
    let mut bytes = [0u8; 8];
    BigEndian::write_u64(&mut bytes, seq);
    bytes
}

fn output_key(seq: u64) -> Vec<u8> {
    [OUTPUT_PREFIX, &sequence_bytes(seq)[..]].concat()
}

fn index_key(outpoint: &Outpoint) -> Vec<u8> {
    [INDEX_PREFIX, outpoint.to_string().as_bytes()].concat()
}

fn message_box_prefix(recipient: &str, message_box: &str) -> Vec<u8> {
    let mut key = MESSAGE_PREFIX.to_vec();
    key.extend_from_slice(recipient.as_bytes());
    key.push(0);
    key.extend_from_slice(message_box.as_bytes());
    key.push(0);
    key
}

fn recipient_prefix(recipient: &str) -> Vec<u8> {
    let mut key = MESSAGE_PREFIX.to_vec();
    key.extend_from_slice(recipient.as_bytes());
    key.push(0);
    key
}

impl OverlayStore {
    /// Opens or creates a store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, NodeError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path)?;

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, DB>, NodeError> {
        self.db
            .lock()
            .map_err(|_| NodeError::StorageError("database lock poisoned".to_string()))
    }

    fn read_counter(db: &DB, key: &[u8]) -> Result<u64, NodeError> {
        Ok(db
            .get(key)?
            .filter(|bytes| bytes.len() == 8)
            .map(|bytes| BigEndian::read_u64(&bytes))
            .unwrap_or(0))
    }

    /// Collects every entry under `prefix`, in key order.
    fn scan(db: &DB, prefix: &[u8]) -> Result<Vec<(Box<[u8]>, Box<[u8]>)>, NodeError> {
        let mut entries = Vec::new();
        for item in db.iterator(IteratorMode::From(prefix, Direction::Forward)) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key, value));
        }
        Ok(entries)
    }

    /// Admits an output. Returns false if it was already admitted.
    pub fn insert_output(&self, topic: &str, output: &LookupOutput) -> Result<bool, NodeError> {
        let db = self.lock()?;
        let outpoint = Outpoint::new(output.txid.clone(), output.output_index);
        if db.get(index_key(&outpoint))?.is_some() {
            return Ok(false);
        }

        let seq = Self::read_counter(&db, OUTPUT_SEQ_KEY)? + 1;
        let stored = StoredOutput {
            topic: topic.to_string(),
            output: output.clone(),
        };

        let mut batch = WriteBatch::default();
        batch.put(output_key(seq), bincode::serialize(&stored)?);
        batch.put(index_key(&outpoint), sequence_bytes(seq));
        batch.put(OUTPUT_SEQ_KEY, sequence_bytes(seq));
        db.write(batch)?;

        debug!("Stored output {} as #{}", outpoint, seq);
        Ok(true)
    }

    /// Retrieves an admitted output.
    pub fn get_output(&self, outpoint: &Outpoint) -> Result<Option<StoredOutput>, NodeError> {
        let db = self.lock()?;
        let seq = match db.get(index_key(outpoint))? {
            Some(seq) => seq,
            None => return Ok(None),
        };
        match db.get([OUTPUT_PREFIX, &seq[..]].concat())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Removes an admitted output. Returns false if it was not present.
    pub fn remove_output(&self, outpoint: &Outpoint) -> Result<bool, NodeError> {
        let db = self.lock()?;
        let seq = match db.get(index_key(outpoint))? {
            Some(seq) => seq,
            None => return Ok(false),
        };

        let mut batch = WriteBatch::default();
        batch.delete([OUTPUT_PREFIX, &seq[..]].concat());
        batch.delete(index_key(outpoint));
        db.write(batch)?;

        debug!("Removed output {}", outpoint);
        Ok(true)
    }

    /// Lists the outputs admitted under `topic`, newest first.
    pub fn list_outputs(&self, topic: &str) -> Result<Vec<LookupOutput>, NodeError> {
        let db = self.lock()?;
        let mut outputs = Vec::new();
        for (_, value) in Self::scan(&db, OUTPUT_PREFIX)?.into_iter().rev() {
            let stored: StoredOutput = bincode::deserialize(&value)?;
            if stored.topic == topic {
                outputs.push(stored.output);
            }
        }
        Ok(outputs)
    }

    /// Counts admitted outputs across all topics.
    pub fn output_count(&self) -> Result<usize, NodeError> {
        let db = self.lock()?;
        Ok(Self::scan(&db, OUTPUT_PREFIX)?.len())
    }

    /// Puts a message into `recipient`'s box and returns its id.
    pub fn put_message(
        &self,
        recipient: &str,
        message_box: &str,
        sender: &str,
        body: &str,
    ) -> Result<u64, NodeError> {
        let db = self.lock()?;
        let message_id = Self::read_counter(&db, MESSAGE_SEQ_KEY)? + 1;
        let stored = StoredMessage {
            message_id,
            sender: sender.to_string(),
            body: body.to_string(),
        };

        let mut key = message_box_prefix(recipient, message_box);
        key.extend_from_slice(&sequence_bytes(message_id));

        let mut batch = WriteBatch::default();
        batch.put(key, bincode::serialize(&stored)?);
        batch.put(MESSAGE_SEQ_KEY, sequence_bytes(message_id));
        db.write(batch)?;
        Ok(message_id)
    }

    /// Lists the messages in one of `recipient`'s boxes, oldest first.
    pub fn list_messages(&self, recipient: &str, message_box: &str) -> Result<Vec<PeerMessage>, NodeError> {
        let db = self.lock()?;
        Self::scan(&db, &message_box_prefix(recipient, message_box))?
            .into_iter()
            .map(|(_, value)| {
                let stored: StoredMessage = bincode::deserialize(&value)?;
                Ok(PeerMessage {
                    message_id: stored.message_id,
                    sender: stored.sender,
                    body: stored.body,
                })
            })
            .collect()
    }

    /// Deletes the listed messages from any of `recipient`'s boxes.
    ///
    /// Ids belonging to other recipients are ignored. Returns how many were deleted.
    pub fn acknowledge_messages(&self, recipient: &str, message_ids: &[u64]) -> Result<usize, NodeError> {
        let db = self.lock()?;
        let mut batch = WriteBatch::default();
        let mut removed = 0;
        for (key, _) in Self::scan(&db, &recipient_prefix(recipient))? {
            if key.len() < 8 {
                continue;
            }
            let message_id = BigEndian::read_u64(&key[key.len() - 8..]);
            if message_ids.contains(&message_id) {
                batch.delete(&key);
                removed += 1;
            }
        }
        db.write(batch)?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postboard_core::Script;
    use tempfile::tempdir;

    fn output(txid: &str, index: u32) -> LookupOutput {
        LookupOutput {
            txid: txid.to_string(),
            output_index: index,
            output_script: Script(vec![0x51, 0xac]),
            satoshis: 100,
        }
    }

    #[test]
    fn test_outputs_are_listed_newest_first() {
        let dir = tempdir().unwrap();
        let store = OverlayStore::new(dir.path()).unwrap();

        assert!(store.insert_output("Postboard", &output("aa", 0)).unwrap());
        assert!(store.insert_output("Postboard", &output("bb", 0)).unwrap());
        assert!(store.insert_output("Other", &output("cc", 0)).unwrap());
        assert!(!store.insert_output("Postboard", &output("aa", 0)).unwrap());

        let listed: Vec<String> = store
            .list_outputs("Postboard")
            .unwrap()
            .into_iter()
            .map(|o| o.txid)
            .collect();
        assert_eq!(listed, vec!["bb", "aa"]);
        assert_eq!(store.output_count().unwrap(), 3);
    }

    #[test]
    fn test_remove_output() {
        let dir = tempdir().unwrap();
        let store = OverlayStore::new(dir.path()).unwrap();
        store.insert_output("Postboard", &output("aa", 1)).unwrap();

        let outpoint = Outpoint::new("aa", 1);
        let stored = store.get_output(&outpoint).unwrap().unwrap();
        assert_eq!(stored.topic, "Postboard");
        assert_eq!(stored.output, output("aa", 1));

        assert!(store.remove_output(&outpoint).unwrap());
        assert!(!store.remove_output(&outpoint).unwrap());
        assert!(store.get_output(&outpoint).unwrap().is_none());
        assert!(store.list_outputs("Postboard").unwrap().is_empty());
    }

    #[test]
    fn test_store_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = OverlayStore::new(dir.path()).unwrap();
            store.insert_output("Postboard", &output("aa", 0)).unwrap();
        }
        let store = OverlayStore::new(dir.path()).unwrap();
        store.insert_output("Postboard", &output("bb", 0)).unwrap();

        let listed = store.list_outputs("Postboard").unwrap();
        assert_eq!(listed[0].txid, "bb");
        assert_eq!(listed[1].txid, "aa");
    }

    #[test]
    fn test_message_boxes_are_per_recipient() {
        let dir = tempdir().unwrap();
        let store = OverlayStore::new(dir.path()).unwrap();

        let first = store.put_message("alice", "tips", "bob", "one").unwrap();
        let second = store.put_message("alice", "tips", "carol", "two").unwrap();
        let other = store.put_message("bob", "tips", "alice", "three").unwrap();
        store.put_message("alice", "notes", "bob", "four").unwrap();

        let inbox = store.list_messages("alice", "tips").unwrap();
        let ids: Vec<u64> = inbox.iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(inbox[1].sender, "carol");

        // Someone else's id is left alone
        assert_eq!(store.acknowledge_messages("alice", &[first, other]).unwrap(), 1);
        assert_eq!(store.list_messages("alice", "tips").unwrap().len(), 1);
        assert_eq!(store.list_messages("bob", "tips").unwrap().len(), 1);
        assert_eq!(store.list_messages("alice", "notes").unwrap().len(), 1);
    }
}
