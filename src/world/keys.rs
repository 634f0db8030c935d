//! Database key layout.
//!
//! Per-chunk keys start with the chunk index: x and z as little-endian i32,
//! followed by the dimension id as a little-endian i32 unless the dimension
//! is the overworld. A tag byte or string follows; sub chunk keys add the
//! absolute slab Y as one byte.

use super::ChunkPos;
use crate::config::Dimension;

pub const KEY_SUB_CHUNK_DATA: u8 = b'/';
pub const KEY_VERSION: u8 = b',';
/// Replaced by [`KEY_VERSION`]; still checked when loading.
pub const KEY_VERSION_OLD: u8 = b'v';
/// Concatenated little-endian NBT compounds, not an NBT list.
pub const KEY_BLOCK_ENTITIES: u8 = b'1';
pub const KEY_ENTITIES: u8 = b'2';
/// Little-endian i32 generation state of the chunk.
pub const KEY_FINALISATION: u8 = b'6';
/// 512-byte heightmap followed by the 3D biome stream.
pub const KEY_3D_DATA: u8 = b'+';
/// Legacy 2D heightmap and biomes, only ever deleted.
pub const KEY_2D_DATA: u8 = b'-';
pub const KEY_CHECKSUMS: u8 = b';';

pub const KEY_CHUNK_TIME_STAMP: u8 = b'T';
pub const KEY_DELTA_UPDATE_TIME_STAMP: &[u8] = b"dutsp";
pub const KEY_DELTA_UPDATE: &[u8] = b"dup";
pub const KEY_BLOB_HASH: &[u8] = b"blobhashprefix";

/// Chunk format version written under [`KEY_VERSION`].
pub const CHUNK_VERSION: u8 = 40;

pub const FINALISATION_GENERATED: u32 = 1;
pub const FINALISATION_POPULATED: u32 = 2;

/// The key prefix shared by every per-chunk key. 8 bytes in the overworld,
/// 12 elsewhere.
pub fn index(dimension: Dimension, pos: ChunkPos) -> Vec<u8> {
    let mut key = Vec::with_capacity(12 + KEY_BLOB_HASH.len());
    key.extend_from_slice(&pos.x.to_le_bytes());
    key.extend_from_slice(&pos.z.to_le_bytes());
    if dimension.id() != 0 {
        key.extend_from_slice(&dimension.id().to_le_bytes());
    }
    key
}

/// [`index`] followed by `suffix`.
pub fn sum(dimension: Dimension, pos: ChunkPos, suffix: &[u8]) -> Vec<u8> {
    let mut key = index(dimension, pos);
    key.extend_from_slice(suffix);
    key
}

pub fn sub_chunk_key(dimension: Dimension, pos: ChunkPos, y_index: i8) -> Vec<u8> {
    sum(dimension, pos, &[KEY_SUB_CHUNK_DATA, y_index as u8])
}
