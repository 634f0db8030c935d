//! Chunk persistence over a [`KeyValueStore`].

pub mod keys;
mod store;
mod sync;

pub use store::{KeyValueStore, MemoryStore};
pub use sync::BlobHash;

use crate::chunk::{self, Chunk, Encoding, SerialisedData, SubChunk};
use crate::config::Dimension;
use crate::error::{CodecError, WorldError, WorldResult};
use crate::nbt;
use crate::table::RuntimeTable;
use keys::*;
use quartz_nbt::{NbtCompound, NbtTag};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const HEIGHTMAP_LEN: usize = 512;

/// Horizontal chunk coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        ChunkPos { x, z }
    }
}

/// Sub chunk coordinates. `y` is the absolute slab index, so -4 is the
/// lowest overworld slab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubChunkPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl SubChunkPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        SubChunkPos { x, y, z }
    }

    pub fn chunk(&self) -> ChunkPos {
        ChunkPos::new(self.x, self.z)
    }
}

/// A Bedrock world database: chunks, biomes and block entities stored in a
/// [`KeyValueStore`] and decoded against a shared [`RuntimeTable`].
pub struct World<S> {
    store: S,
    table: Arc<RuntimeTable>,
}

impl<S: KeyValueStore> World<S> {
    pub fn new(store: S, table: Arc<RuntimeTable>) -> Self {
        World { store, table }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn table(&self) -> &Arc<RuntimeTable> {
        &self.table
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn chunk_exists(&self, dimension: Dimension, pos: ChunkPos) -> WorldResult<bool> {
        Ok(self.store.has(&sum(dimension, pos, &[KEY_VERSION]))?
            || self.store.has(&sum(dimension, pos, &[KEY_VERSION_OLD]))?)
    }

    fn write_markers(&self, dimension: Dimension, pos: ChunkPos, finalisation: u32) -> WorldResult<()> {
        self.store
            .put(&sum(dimension, pos, &[KEY_VERSION]), &[CHUNK_VERSION])?;
        self.store.put(
            &sum(dimension, pos, &[KEY_FINALISATION]),
            &finalisation.to_le_bytes(),
        )?;
        Ok(())
    }

    // ─── Chunks ─────────────────────────────────────────────────────────────

    /// Raw sub chunk payloads of a chunk, bottom first, or `None` if the
    /// chunk has never been saved. Missing sub chunks are empty payloads.
    pub fn load_chunk_payload(
        &self,
        dimension: Dimension,
        pos: ChunkPos,
    ) -> WorldResult<Option<Vec<Vec<u8>>>> {
        if !self.chunk_exists(dimension, pos)? {
            return Ok(None);
        }
        let range = dimension.range();
        let base = range.min() >> 4;
        (0..range.sub_chunk_count())
            .map(|i| -> WorldResult<Vec<u8>> {
                let key = sub_chunk_key(dimension, pos, (i as i32 + base) as i8);
                Ok(self.store.get(&key)?.unwrap_or_default())
            })
            .collect::<WorldResult<Vec<_>>>()
            .map(Some)
    }

    pub fn load_chunk(&self, dimension: Dimension, pos: ChunkPos) -> WorldResult<Option<Chunk>> {
        let Some(sub_chunks) = self.load_chunk_payload(dimension, pos)? else {
            return Ok(None);
        };
        let biomes = match self.load_biomes(dimension, pos) {
            Ok(biomes) => biomes.unwrap_or_default(),
            Err(WorldError::InvalidBiomePayload(len)) => {
                tracing::warn!(x = pos.x, z = pos.z, len, "ignoring short biome payload");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let data = SerialisedData { sub_chunks, biomes };
        Ok(Some(chunk::disk_decode(&data, dimension.range(), &self.table)?))
    }

    /// Write raw sub chunk payloads with the version and finalisation
    /// markers. Empty payloads delete their key.
    pub fn save_chunk_payload(
        &self,
        dimension: Dimension,
        pos: ChunkPos,
        sub_chunks: &[Vec<u8>],
    ) -> WorldResult<()> {
        self.write_markers(dimension, pos, FINALISATION_POPULATED)?;

        let base = dimension.range().min() >> 4;
        for (i, payload) in sub_chunks.iter().enumerate() {
            let key = sub_chunk_key(dimension, pos, (i as i32 + base) as i8);
            if payload.is_empty() {
                self.store.delete(&key)?;
            } else {
                self.store.put(&key, payload)?;
            }
        }
        Ok(())
    }

    /// Encode and store a chunk and its biomes. Compact the chunk first to
    /// keep the payloads small.
    pub fn save_chunk(&self, dimension: Dimension, pos: ChunkPos, chunk: &Chunk) -> WorldResult<()> {
        let data = chunk::encode(chunk, Encoding::Disk(&self.table))?;
        self.save_biomes(dimension, pos, &data.biomes)?;
        self.save_chunk_payload(dimension, pos, &data.sub_chunks)
    }

    /// Remove every record of a chunk: its markers, sub chunks, biomes,
    /// entities, block entities, checksums and sync metadata. Deleting a
    /// chunk that was never saved is not an error.
    pub fn delete_chunk(&self, dimension: Dimension, pos: ChunkPos) -> WorldResult<()> {
        for tag in [
            KEY_VERSION,
            KEY_VERSION_OLD,
            KEY_FINALISATION,
            KEY_3D_DATA,
            KEY_2D_DATA,
            KEY_CHECKSUMS,
            KEY_BLOCK_ENTITIES,
            KEY_ENTITIES,
            KEY_CHUNK_TIME_STAMP,
        ] {
            self.store.delete(&sum(dimension, pos, &[tag]))?;
        }
        for suffix in [KEY_DELTA_UPDATE, KEY_DELTA_UPDATE_TIME_STAMP, KEY_BLOB_HASH] {
            self.store.delete(&sum(dimension, pos, suffix))?;
        }

        let range = dimension.range();
        for y in range.min() >> 4..=range.max() >> 4 {
            self.store.delete(&sub_chunk_key(dimension, pos, y as i8))?;
        }
        tracing::debug!(dimension = dimension.id(), x = pos.x, z = pos.z, "deleted chunk");
        Ok(())
    }

    // ─── Sub chunks ─────────────────────────────────────────────────────────

    /// Load one sub chunk. A slab outside the dimension's range, or missing
    /// from a chunk that was never saved, is `None`; a missing slab of a
    /// saved chunk is an empty sub chunk.
    pub fn load_sub_chunk(&self, dimension: Dimension, pos: SubChunkPos) -> WorldResult<Option<SubChunk>> {
        let range = dimension.range();
        if pos.y < range.min() >> 4 || pos.y > range.max() >> 4 {
            return Ok(None);
        }

        let chunk_pos = pos.chunk();
        let data = self
            .store
            .get(&sub_chunk_key(dimension, chunk_pos, pos.y as i8))?
            .unwrap_or_default();
        if data.is_empty() {
            if self.chunk_exists(dimension, chunk_pos)? {
                return Ok(Some(SubChunk::new(self.table.air_runtime_id())));
            }
            return Ok(None);
        }

        let (sub, _) = chunk::decode_sub_chunk(
            &mut data.as_slice(),
            self.table.air_runtime_id(),
            Encoding::Disk(&self.table),
        )?;
        Ok(Some(sub))
    }

    /// Store one sub chunk, or delete it when `sub` is `None`.
    pub fn save_sub_chunk(
        &self,
        dimension: Dimension,
        pos: SubChunkPos,
        sub: Option<&SubChunk>,
    ) -> WorldResult<()> {
        let chunk_pos = pos.chunk();
        let key = sub_chunk_key(dimension, chunk_pos, pos.y as i8);
        let Some(sub) = sub else {
            self.store.delete(&key)?;
            return Ok(());
        };

        self.write_markers(dimension, chunk_pos, FINALISATION_GENERATED)?;

        let range = dimension.range();
        let index = (pos.y - (range.min() >> 4)).max(0) as usize;
        let payload = chunk::encode_sub_chunk(sub, range, index, Encoding::Disk(&self.table))?;
        self.store.put(&key, &payload)?;
        Ok(())
    }

    // ─── Biomes ─────────────────────────────────────────────────────────────

    /// The biome stream of a chunk with its heightmap stripped.
    pub fn load_biomes(&self, dimension: Dimension, pos: ChunkPos) -> WorldResult<Option<Vec<u8>>> {
        let Some(data) = self.store.get(&sum(dimension, pos, &[KEY_3D_DATA]))? else {
            return Ok(None);
        };
        if data.len() <= HEIGHTMAP_LEN {
            return Err(WorldError::InvalidBiomePayload(data.len()));
        }
        Ok(Some(data[HEIGHTMAP_LEN..].to_vec()))
    }

    /// Store a biome stream behind a zeroed heightmap. An empty stream
    /// deletes the key.
    pub fn save_biomes(&self, dimension: Dimension, pos: ChunkPos, payload: &[u8]) -> WorldResult<()> {
        let key = sum(dimension, pos, &[KEY_3D_DATA]);
        if payload.is_empty() {
            self.store.delete(&key)?;
            return Ok(());
        }
        let mut data = vec![0u8; HEIGHTMAP_LEN + payload.len()];
        data[HEIGHTMAP_LEN..].copy_from_slice(payload);
        self.store.put(&key, &data)?;
        Ok(())
    }

    // ─── Block entities ─────────────────────────────────────────────────────

    pub fn load_block_entities_payload(&self, dimension: Dimension, pos: ChunkPos) -> WorldResult<Vec<u8>> {
        Ok(self
            .store
            .get(&sum(dimension, pos, &[KEY_BLOCK_ENTITIES]))?
            .unwrap_or_default())
    }

    pub fn save_block_entities_payload(
        &self,
        dimension: Dimension,
        pos: ChunkPos,
        payload: &[u8],
    ) -> WorldResult<()> {
        let key = sum(dimension, pos, &[KEY_BLOCK_ENTITIES]);
        if payload.is_empty() {
            self.store.delete(&key)?;
        } else {
            self.store.put(&key, payload)?;
        }
        Ok(())
    }

    /// Decode the block entities of a chunk. Namespaced `id`s are rewritten
    /// to the bare capitalised form (`minecraft:chest` becomes `Chest`). A
    /// record that fails to decode ends the list; the records before it are
    /// still returned.
    pub fn load_block_entities(&self, dimension: Dimension, pos: ChunkPos) -> WorldResult<Vec<NbtCompound>> {
        let payload = self.load_block_entities_payload(dimension, pos)?;
        let mut source = payload.as_slice();
        let mut entities = Vec::new();

        while !source.is_empty() {
            match nbt::read_compound(&mut source) {
                Ok((_, mut entity)) => {
                    normalise_block_entity_id(&mut entity);
                    entities.push(entity);
                }
                Err(e) => {
                    tracing::warn!(
                        x = pos.x,
                        z = pos.z,
                        decoded = entities.len(),
                        error = %e,
                        "stopping at malformed block entity record"
                    );
                    break;
                }
            }
        }
        Ok(entities)
    }

    pub fn save_block_entities(
        &self,
        dimension: Dimension,
        pos: ChunkPos,
        entities: &[NbtCompound],
    ) -> WorldResult<()> {
        let mut payload = Vec::new();
        for entity in entities {
            nbt::write_compound(&mut payload, "", entity).map_err(CodecError::from)?;
        }
        self.save_block_entities_payload(dimension, pos, &payload)
    }
}

fn normalise_block_entity_id(entity: &mut NbtCompound) {
    let Some(NbtTag::String(id)) = entity.inner().get("id") else {
        return;
    };
    let Some(bare) = id.strip_prefix("minecraft:") else {
        return;
    };
    let mut chars = bare.chars();
    let normalised: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    entity.insert("id", normalised);
}
