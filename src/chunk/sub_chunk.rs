use super::palette::CELL_COUNT;
use super::paletted_storage::PalettedStorage;

/// One 16x16x16 slab of a chunk: a primary block layer followed by
/// optional overlay layers (water logging and similar).
///
/// Layers are allocated lazily. A layer that does not exist reads as air.
#[derive(Debug, Clone)]
pub struct SubChunk {
    air: u32,
    layers: Vec<PalettedStorage>,
}

impl SubChunk {
    pub fn new(air: u32) -> Self {
        SubChunk {
            air,
            layers: Vec::new(),
        }
    }

    pub(crate) fn from_layers(air: u32, layers: Vec<PalettedStorage>) -> Self {
        SubChunk { air, layers }
    }

    pub fn air(&self) -> u32 {
        self.air
    }

    pub fn layers(&self) -> &[PalettedStorage] {
        &self.layers
    }

    pub fn layer(&self, layer: u8) -> Option<&PalettedStorage> {
        self.layers.get(layer as usize)
    }

    /// Mutable access to a layer, allocating air-filled layers up to and
    /// including `layer` if needed.
    pub fn layer_mut(&mut self, layer: u8) -> &mut PalettedStorage {
        while self.layers.len() <= layer as usize {
            self.layers.push(PalettedStorage::uniform(self.air));
        }
        &mut self.layers[layer as usize]
    }

    pub fn block(&self, x: u8, y: u8, z: u8, layer: u8) -> u32 {
        match self.layers.get(layer as usize) {
            Some(storage) => storage.at(x, y, z),
            None => self.air,
        }
    }

    /// Set a block. Writing air into a layer that does not exist yet is a
    /// no-op.
    pub fn set_block(&mut self, x: u8, y: u8, z: u8, layer: u8, block: u32) {
        if self.layers.len() <= layer as usize && block == self.air {
            return;
        }
        self.layer_mut(layer).set(x, y, z, block);
    }

    /// All 4096 blocks of a layer in XZY order.
    pub fn blocks(&self, layer: u8) -> Vec<u32> {
        match self.layers.get(layer as usize) {
            Some(storage) => storage.values(),
            None => vec![self.air; CELL_COUNT],
        }
    }

    /// Replace a whole layer with 4096 blocks in XZY order. A shorter slice
    /// only overwrites the leading cells.
    pub fn set_blocks(&mut self, layer: u8, blocks: &[u32]) {
        if self.layers.len() <= layer as usize && blocks.iter().all(|&b| b == self.air) {
            return;
        }
        if blocks.len() >= CELL_COUNT {
            let storage = PalettedStorage::from_values(blocks);
            *self.layer_mut(layer) = storage;
            return;
        }
        let storage = self.layer_mut(layer);
        for (cell, &block) in blocks.iter().enumerate() {
            let (x, z, y) = ((cell >> 8) as u8, ((cell >> 4) & 15) as u8, (cell & 15) as u8);
            storage.set(x, y, z, block);
        }
    }

    /// True when every layer holds nothing but air.
    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(|layer| layer.is_uniform(self.air))
    }

    pub fn compact(&mut self) {
        for layer in &mut self.layers {
            layer.compact();
        }
    }

    /// Value equality, treating missing layers as air.
    pub fn equals(&self, other: &SubChunk) -> bool {
        let count = self.layers.len().max(other.layers.len());
        (0..count).all(|i| match (self.layers.get(i), other.layers.get(i)) {
            (Some(a), Some(b)) => a.equals(b),
            (Some(a), None) => a.is_uniform(other.air),
            (None, Some(b)) => b.is_uniform(self.air),
            (None, None) => true,
        })
    }
}
