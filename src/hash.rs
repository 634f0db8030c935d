//! Network block hashes.
//!
//! When runtime IDs are hashes, the ID of a state is the FNV1a-32 of its
//! little-endian NBT form `{name, states}` with states sorted by key.

use crate::block_state::{canonical_state_bytes, Properties};
use std::io;

/// FNV-1a 32-bit offset basis.
pub const FNV1_32_INIT: u32 = 0x811c_9dc5;
/// FNV-1a 32-bit prime.
pub const FNV1_32_PRIME: u32 = 0x0100_0193;

const FNV1_64_INIT: u64 = 0xcbf2_9ce4_8422_2325;
const FNV1_64_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Name of the placeholder block substituted for unrecognised states.
pub const UNKNOWN_BLOCK_NAME: &str = "minecraft:unknown";
/// Runtime ID of [`UNKNOWN_BLOCK_NAME`]: -2 as an unsigned 32-bit integer.
pub const UNKNOWN_RUNTIME_ID: u32 = -2i32 as u32;

pub fn fnv1a_32(data: &[u8]) -> u32 {
    let mut hash = FNV1_32_INIT;
    for &byte in data {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(FNV1_32_PRIME);
    }
    hash
}

/// FNV-1 (multiply, then xor) over 64 bits. Dense tables are ordered by this
/// hash of the block name.
pub fn fnv1_64(data: &[u8]) -> u64 {
    let mut hash = FNV1_64_INIT;
    for &byte in data {
        hash = hash.wrapping_mul(FNV1_64_PRIME);
        hash ^= byte as u64;
    }
    hash
}

/// Network hash of a block state. Independent of property insertion order.
/// Fails when a string of the state is too long to encode.
pub fn hash_state(name: &str, properties: &Properties) -> io::Result<u32> {
    if name == UNKNOWN_BLOCK_NAME {
        return Ok(UNKNOWN_RUNTIME_ID);
    }
    Ok(fnv1a_32(&canonical_state_bytes(name, properties)?))
}

/// [`hash_state`] for a state whose canonical bytes are already known.
pub(crate) fn hash_canonical(name: &str, canonical: &[u8]) -> u32 {
    if name == UNKNOWN_BLOCK_NAME {
        UNKNOWN_RUNTIME_ID
    } else {
        fnv1a_32(canonical)
    }
}
