use super::paletted_storage::PalettedStorage;
use super::sub_chunk::SubChunk;
use crate::config::Range;
use rayon::prelude::*;
use std::sync::Arc;

/// A vertical column of sub chunks spanning a [`Range`], with one 3D biome
/// storage per sub chunk.
///
/// Biome storages are reference counted: consecutive slabs decoded from a
/// "same as previous" marker share one storage until either is written.
///
/// Positions outside the range read as air and writes to them are ignored.
#[derive(Debug, Clone)]
pub struct Chunk {
    range: Range,
    air: u32,
    pub(crate) sub_chunks: Vec<SubChunk>,
    pub(crate) biomes: Vec<Arc<PalettedStorage>>,
}

impl Chunk {
    pub fn new(air: u32, range: Range) -> Self {
        let count = range.sub_chunk_count();
        let biome = Arc::new(PalettedStorage::uniform(0));
        Chunk {
            range,
            air,
            sub_chunks: (0..count).map(|_| SubChunk::new(air)).collect(),
            biomes: vec![biome; count],
        }
    }

    pub fn range(&self) -> Range {
        self.range
    }

    pub fn air(&self) -> u32 {
        self.air
    }

    pub fn sub_chunks(&self) -> &[SubChunk] {
        &self.sub_chunks
    }

    pub fn biome_storages(&self) -> &[Arc<PalettedStorage>] {
        &self.biomes
    }

    /// Sub chunk index for an absolute Y. Rounds toward negative infinity.
    #[inline]
    pub fn sub_index(&self, y: i32) -> i32 {
        (y - self.range.min()) >> 4
    }

    /// Lowest absolute Y of the sub chunk at `index`.
    #[inline]
    pub fn sub_y(&self, index: i32) -> i32 {
        (index << 4) + self.range.min()
    }

    fn slot(&self, y: i32) -> Option<usize> {
        if y < self.range.min() || y > self.range.max() {
            return None;
        }
        let index = self.sub_index(y) as usize;
        (index < self.sub_chunks.len()).then_some(index)
    }

    pub fn sub_chunk(&self, y: i32) -> Option<&SubChunk> {
        self.slot(y).map(|i| &self.sub_chunks[i])
    }

    pub fn sub_chunk_mut(&mut self, y: i32) -> Option<&mut SubChunk> {
        self.slot(y).map(move |i| &mut self.sub_chunks[i])
    }

    pub fn block(&self, x: u8, y: i32, z: u8, layer: u8) -> u32 {
        match self.sub_chunk(y) {
            Some(sub) => sub.block(x, (y & 15) as u8, z, layer),
            None => self.air,
        }
    }

    pub fn set_block(&mut self, x: u8, y: i32, z: u8, layer: u8, block: u32) {
        if let Some(sub) = self.sub_chunk_mut(y) {
            sub.set_block(x, (y & 15) as u8, z, layer, block);
        }
    }

    /// Every sub chunk's blocks for one layer, bottom first, 4096 per slab.
    pub fn blocks(&self, layer: u8) -> Vec<Vec<u32>> {
        self.sub_chunks.iter().map(|sub| sub.blocks(layer)).collect()
    }

    /// Replace a layer slab by slab, bottom first, with the same per-slab
    /// contract as [`SubChunk::set_blocks`]: a short slab only overwrites its
    /// leading cells and values past 4096 are ignored. Extra slabs are
    /// ignored and missing ones are left untouched.
    pub fn set_blocks(&mut self, layer: u8, blocks: &[Vec<u32>]) {
        for (sub, slab) in self.sub_chunks.iter_mut().zip(blocks) {
            sub.set_blocks(layer, slab);
        }
    }

    pub fn biome(&self, x: u8, y: i32, z: u8) -> u32 {
        match self.slot(y) {
            Some(i) => self.biomes[i].at(x, (y & 15) as u8, z),
            None => 0,
        }
    }

    /// Set a biome, detaching the slab's storage first if it is shared.
    pub fn set_biome(&mut self, x: u8, y: i32, z: u8, biome: u32) {
        if let Some(i) = self.slot(y) {
            Arc::make_mut(&mut self.biomes[i]).set(x, (y & 15) as u8, z, biome);
        }
    }

    /// Compact every layer of every sub chunk. Call before encoding.
    pub fn compact(&mut self) {
        self.sub_chunks.par_iter_mut().for_each(SubChunk::compact);
    }

    /// Index of the highest sub chunk holding anything but air. Returns 0,
    /// not a sentinel, when every sub chunk is empty.
    pub fn highest_filled_sub_chunk(&self) -> usize {
        (1..self.sub_chunks.len())
            .rev()
            .find(|&i| !self.sub_chunks[i].is_empty())
            .unwrap_or(0)
    }

    /// Block equality over range, air and every sub chunk. Biomes are not
    /// compared.
    pub fn equals(&self, other: &Chunk) -> bool {
        self.range == other.range
            && self.air == other.air
            && self.sub_chunks.len() == other.sub_chunks.len()
            && self
                .sub_chunks
                .iter()
                .zip(&other.sub_chunks)
                .all(|(a, b)| a.equals(b))
    }
}
