//! Incremental sync metadata: per-column blob hashes, delta update payloads
//! and save time stamps.
//!
//! None of this is read by the game; it lets a server skip resending slabs
//! a client already holds.

use super::keys::{sum, KEY_BLOB_HASH, KEY_CHUNK_TIME_STAMP, KEY_DELTA_UPDATE, KEY_DELTA_UPDATE_TIME_STAMP};
use super::{ChunkPos, KeyValueStore, SubChunkPos, World};
use crate::config::Dimension;
use crate::error::{WorldError, WorldResult};
use serde::{Deserialize, Serialize};

const BLOB_HASH_RECORD_LEN: usize = 9;

/// Content hash of one serialised sub chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobHash {
    /// Absolute slab index.
    pub y: i8,
    pub hash: u64,
}

fn decode_blob_hashes(data: &[u8]) -> WorldResult<Vec<BlobHash>> {
    if data.len() % BLOB_HASH_RECORD_LEN != 0 {
        return Err(WorldError::InvalidBlobHashRecord(data.len()));
    }
    Ok(data
        .chunks_exact(BLOB_HASH_RECORD_LEN)
        .map(|record| {
            let mut hash = [0u8; 8];
            hash.copy_from_slice(&record[1..]);
            BlobHash {
                y: record[0] as i8,
                hash: u64::from_le_bytes(hash),
            }
        })
        .collect())
}

fn encode_blob_hashes(hashes: &[BlobHash]) -> Vec<u8> {
    let mut data = Vec::with_capacity(hashes.len() * BLOB_HASH_RECORD_LEN);
    for entry in hashes {
        data.push(entry.y as u8);
        data.extend_from_slice(&entry.hash.to_le_bytes());
    }
    data
}

impl<S: KeyValueStore> World<S> {
    fn put_or_delete(&self, key: &[u8], value: &[u8]) -> WorldResult<()> {
        if value.is_empty() {
            self.store.delete(key)?;
        } else {
            self.store.put(key, value)?;
        }
        Ok(())
    }

    // ─── Blob hashes ────────────────────────────────────────────────────────

    /// Every stored blob hash of a column. Empty when none are stored.
    pub fn load_blob_hash(&self, dimension: Dimension, pos: ChunkPos) -> WorldResult<Vec<BlobHash>> {
        match self.store.get(&sum(dimension, pos, KEY_BLOB_HASH))? {
            Some(data) => decode_blob_hashes(&data),
            None => Ok(Vec::new()),
        }
    }

    pub fn load_sub_chunk_blob_hash(&self, dimension: Dimension, pos: SubChunkPos) -> WorldResult<Option<u64>> {
        let hashes = self.load_blob_hash(dimension, pos.chunk())?;
        Ok(hashes
            .iter()
            .find(|entry| entry.y == pos.y as i8)
            .map(|entry| entry.hash))
    }

    /// Replace the whole blob hash record of a column. An empty list deletes it.
    pub fn save_blob_hash(&self, dimension: Dimension, pos: ChunkPos, hashes: &[BlobHash]) -> WorldResult<()> {
        let key = sum(dimension, pos, KEY_BLOB_HASH);
        self.put_or_delete(&key, &encode_blob_hashes(hashes))
    }

    /// Set the blob hash of one slab, keeping the others. This is a
    /// read-modify-write of the column record: concurrent calls for the same
    /// column must be serialised by the caller.
    pub fn save_single_blob_hash(&self, dimension: Dimension, pos: SubChunkPos, hash: u64) -> WorldResult<()> {
        let chunk_pos = pos.chunk();
        let y = pos.y as i8;
        let mut hashes = self.load_blob_hash(dimension, chunk_pos)?;
        match hashes.iter_mut().find(|entry| entry.y == y) {
            Some(entry) => entry.hash = hash,
            None => hashes.push(BlobHash { y, hash }),
        }
        self.save_blob_hash(dimension, chunk_pos, &hashes)
    }

    // ─── Delta updates ──────────────────────────────────────────────────────

    pub fn load_delta_update(&self, dimension: Dimension, pos: ChunkPos) -> WorldResult<Option<Vec<u8>>> {
        Ok(self.store.get(&sum(dimension, pos, KEY_DELTA_UPDATE))?)
    }

    /// Store an opaque delta payload. An empty payload deletes it.
    pub fn save_delta_update(&self, dimension: Dimension, pos: ChunkPos, payload: &[u8]) -> WorldResult<()> {
        self.put_or_delete(&sum(dimension, pos, KEY_DELTA_UPDATE), payload)
    }

    // ─── Time stamps ────────────────────────────────────────────────────────

    fn load_time_stamp_by_key(&self, key: &[u8]) -> WorldResult<Option<i64>> {
        let Some(data) = self.store.get(key)? else {
            return Ok(None);
        };
        if data.is_empty() {
            return Ok(None);
        }
        let bytes: [u8; 8] = data
            .as_slice()
            .try_into()
            .map_err(|_| WorldError::InvalidTimeStamp(data.len()))?;
        Ok(Some(i64::from_le_bytes(bytes)))
    }

    fn save_time_stamp_by_key(&self, key: &[u8], time_stamp: i64) -> WorldResult<()> {
        if time_stamp == 0 {
            self.store.delete(key)?;
            return Ok(());
        }
        self.store.put(key, &time_stamp.to_le_bytes())?;
        Ok(())
    }

    /// Time stamp of the last save of a column, `None` if never recorded.
    pub fn load_time_stamp(&self, dimension: Dimension, pos: ChunkPos) -> WorldResult<Option<i64>> {
        self.load_time_stamp_by_key(&sum(dimension, pos, &[KEY_CHUNK_TIME_STAMP]))
    }

    /// Record a save time stamp. Zero deletes it.
    pub fn save_time_stamp(&self, dimension: Dimension, pos: ChunkPos, time_stamp: i64) -> WorldResult<()> {
        self.save_time_stamp_by_key(&sum(dimension, pos, &[KEY_CHUNK_TIME_STAMP]), time_stamp)
    }

    pub fn load_delta_update_time_stamp(&self, dimension: Dimension, pos: ChunkPos) -> WorldResult<Option<i64>> {
        self.load_time_stamp_by_key(&sum(dimension, pos, KEY_DELTA_UPDATE_TIME_STAMP))
    }

    pub fn save_delta_update_time_stamp(
        &self,
        dimension: Dimension,
        pos: ChunkPos,
        time_stamp: i64,
    ) -> WorldResult<()> {
        self.save_time_stamp_by_key(&sum(dimension, pos, KEY_DELTA_UPDATE_TIME_STAMP), time_stamp)
    }
}
