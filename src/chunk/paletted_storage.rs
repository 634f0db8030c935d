use super::palette::{Palette, PaletteSize, CELL_COUNT};
use crate::error::{CodecError, CodecResult};
use rustc_hash::FxHashMap;

/// A 16x16x16 volume of u32 values stored as bit-packed indices into a
/// [`Palette`].
///
/// Cells are addressed in XZY order: offset `(x << 8) | (z << 4) | y`. Each
/// u32 word holds `32 / bits` indices, lowest bits first.
#[derive(Debug, Clone)]
pub struct PalettedStorage {
    indices: Vec<u32>,
    palette: Palette,
}

#[inline]
fn offset(x: u8, y: u8, z: u8) -> usize {
    (((x & 15) as usize) << 8) | (((z & 15) as usize) << 4) | (y & 15) as usize
}

#[inline]
fn read_index(words: &[u32], size: PaletteSize, offset: usize) -> u32 {
    let per_word = size.indices_per_word();
    if per_word == 0 {
        return 0;
    }
    let shift = (offset % per_word) * size.bits() as usize;
    (words[offset / per_word] >> shift) & size.mask()
}

#[inline]
fn write_index(words: &mut [u32], size: PaletteSize, offset: usize, index: u32) {
    let per_word = size.indices_per_word();
    if per_word == 0 {
        return;
    }
    let shift = (offset % per_word) * size.bits() as usize;
    let mask = size.mask();
    let word = &mut words[offset / per_word];
    *word = (*word & !(mask << shift)) | ((index & mask) << shift);
}

impl PalettedStorage {
    /// A storage where every cell holds `value`.
    pub fn uniform(value: u32) -> Self {
        PalettedStorage {
            indices: Vec::new(),
            palette: Palette::new(PaletteSize::ZERO, vec![value]),
        }
    }

    /// Assemble a storage from decoded words and palette, checking that the
    /// word count matches the palette width and that every index resolves.
    pub fn from_parts(indices: Vec<u32>, palette: Palette) -> CodecResult<Self> {
        let size = palette.size();
        if indices.len() != size.word_count() {
            return Err(CodecError::InvalidBitsPerIndex(size.bits()));
        }
        if palette.is_empty() {
            return Err(CodecError::InvalidPaletteCount {
                count: 0,
                bits: size.bits(),
            });
        }
        let storage = PalettedStorage { indices, palette };
        if size.bits() != 0 {
            let len = storage.palette.len();
            for cell in 0..CELL_COUNT {
                let index = read_index(&storage.indices, size, cell);
                if index as usize >= len {
                    return Err(CodecError::PaletteIndexOutOfRange { index, len });
                }
            }
        }
        Ok(storage)
    }

    /// Build a storage from 4096 values in XZY order.
    pub fn from_values(values: &[u32]) -> Self {
        let mut lookup: FxHashMap<u32, u32> = FxHashMap::default();
        let mut palette_values = Vec::new();
        let cell_indices: Vec<u32> = values
            .iter()
            .take(CELL_COUNT)
            .map(|&value| {
                *lookup.entry(value).or_insert_with(|| {
                    palette_values.push(value);
                    palette_values.len() as u32 - 1
                })
            })
            .collect();

        if palette_values.is_empty() {
            return PalettedStorage::uniform(0);
        }
        let size = PaletteSize::for_len(palette_values.len());
        let mut indices = vec![0u32; size.word_count()];
        for (cell, &index) in cell_indices.iter().enumerate() {
            write_index(&mut indices, size, cell, index);
        }
        PalettedStorage {
            indices,
            palette: Palette::new(size, palette_values),
        }
    }

    #[inline]
    pub fn size(&self) -> PaletteSize {
        self.palette.size()
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// The packed index words, as written to the wire.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    fn palette_index(&self, cell: usize) -> u32 {
        read_index(&self.indices, self.palette.size(), cell)
    }

    #[inline]
    fn value_at(&self, cell: usize) -> u32 {
        self.palette.values()[self.palette_index(cell) as usize]
    }

    pub fn at(&self, x: u8, y: u8, z: u8) -> u32 {
        self.value_at(offset(x, y, z))
    }

    pub fn set(&mut self, x: u8, y: u8, z: u8, value: u32) {
        let cell = offset(x, y, z);
        let index = match self.palette.index_of(value) {
            Some(index) => index,
            None => {
                let previous = self.palette.size();
                let (index, resized) = self.palette.add(value);
                if resized {
                    self.repack(previous);
                }
                index
            }
        };
        write_index(&mut self.indices, self.palette.size(), cell, index);
    }

    /// Rewrite every index from `previous` width into the palette's current width.
    fn repack(&mut self, previous: PaletteSize) {
        let size = self.palette.size();
        let mut indices = vec![0u32; size.word_count()];
        if previous.bits() != 0 {
            for cell in 0..CELL_COUNT {
                write_index(&mut indices, size, cell, read_index(&self.indices, previous, cell));
            }
        }
        self.indices = indices;
    }

    /// All 4096 values in XZY order.
    pub fn values(&self) -> Vec<u32> {
        (0..CELL_COUNT).map(|cell| self.value_at(cell)).collect()
    }

    /// Drop palette entries no cell uses, merge duplicates and shrink to the
    /// narrowest width. Never changes the value of any cell.
    pub fn compact(&mut self) {
        let old_size = self.palette.size();
        let mut used = vec![false; self.palette.len()];
        for cell in 0..CELL_COUNT {
            used[self.palette_index(cell) as usize] = true;
        }

        let mut by_value: FxHashMap<u32, u32> = FxHashMap::default();
        let mut values = Vec::with_capacity(self.palette.len());
        let conversion: Vec<u32> = self
            .palette
            .values()
            .iter()
            .zip(&used)
            .map(|(&value, &used)| {
                if !used {
                    return 0;
                }
                *by_value.entry(value).or_insert_with(|| {
                    values.push(value);
                    values.len() as u32 - 1
                })
            })
            .collect();

        let size = PaletteSize::for_len(values.len());
        let mut indices = vec![0u32; size.word_count()];
        if size.bits() != 0 {
            for cell in 0..CELL_COUNT {
                let old = read_index(&self.indices, old_size, cell);
                write_index(&mut indices, size, cell, conversion[old as usize]);
            }
        }
        self.indices = indices;
        self.palette = Palette::new(size, values);
    }

    /// Whether every cell holds `value`.
    pub fn is_uniform(&self, value: u32) -> bool {
        if self.palette.values().iter().all(|&v| v == value) {
            return true;
        }
        (0..CELL_COUNT).all(|cell| self.value_at(cell) == value)
    }

    /// Value equality: true when every cell resolves to the same value,
    /// whatever the width or palette order of either side.
    pub fn equals(&self, other: &PalettedStorage) -> bool {
        if self.size().bits() == 0 && other.size().bits() == 0 {
            return self.palette.values()[0] == other.palette.values()[0];
        }
        if self.indices == other.indices && self.palette == other.palette {
            return true;
        }
        (0..CELL_COUNT).all(|cell| self.value_at(cell) == other.value_at(cell))
    }
}

impl PartialEq for PalettedStorage {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for PalettedStorage {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_uniform_storage() {
        let storage = PalettedStorage::uniform(7);
        assert_eq!(storage.size().bits(), 0);
        assert!(storage.indices().is_empty());
        assert_eq!(storage.at(3, 15, 9), 7);
        assert!(storage.is_uniform(7));
    }

    #[test]
    fn test_set_then_get() {
        let mut storage = PalettedStorage::uniform(0);
        storage.set(1, 2, 3, 42);
        assert_eq!(storage.at(1, 2, 3), 42);
        assert_eq!(storage.at(3, 2, 1), 0);
        assert_eq!(storage.size().bits(), 1);
    }

    #[test]
    fn test_growth_preserves_existing_cells() {
        let mut storage = PalettedStorage::uniform(0);
        let mut expected = vec![0u32; CELL_COUNT];
        // 300 distinct values walk the width up through 1..=16 bits.
        for i in 0..300u32 {
            let cell = (i as usize * 13) % CELL_COUNT;
            let (x, z, y) = ((cell >> 8) as u8, ((cell >> 4) & 15) as u8, (cell & 15) as u8);
            storage.set(x, y, z, i + 1);
            expected[cell] = i + 1;
        }
        assert_eq!(storage.size().bits(), 16);
        assert_eq!(storage.values(), expected);
    }

    #[test]
    fn test_random_last_write_wins() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut storage = PalettedStorage::uniform(0);
        let mut expected = vec![0u32; CELL_COUNT];
        for _ in 0..10_000 {
            let (x, y, z) = (rng.gen_range(0..16u8), rng.gen_range(0..16u8), rng.gen_range(0..16u8));
            let value = rng.gen_range(0..40u32);
            storage.set(x, y, z, value);
            expected[offset(x, y, z)] = value;
        }
        assert_eq!(storage.values(), expected);
    }

    #[test]
    fn test_compact_shrinks_and_keeps_values() {
        let mut storage = PalettedStorage::uniform(0);
        for v in 1..20u32 {
            storage.set(0, 0, 0, v);
        }
        storage.set(5, 5, 5, 3);
        let before = storage.values();
        assert_eq!(storage.size().bits(), 5);

        storage.compact();
        assert_eq!(storage.values(), before);
        assert_eq!(storage.palette().values(), &[0, 3, 19][..]);
        assert_eq!(storage.size().bits(), 2);

        let once = storage.clone();
        storage.compact();
        assert_eq!(storage.palette(), once.palette());
        assert_eq!(storage.indices(), once.indices());
    }

    #[test]
    fn test_compact_to_single_value() {
        let mut storage = PalettedStorage::uniform(0);
        storage.set(2, 2, 2, 9);
        storage.set(2, 2, 2, 0);
        storage.compact();
        assert_eq!(storage.size().bits(), 0);
        assert_eq!(storage.palette().values(), &[0][..]);
    }

    #[test]
    fn test_compact_merges_duplicate_palette_values() {
        let mut indices = vec![0u32; PaletteSize::new(1).unwrap().word_count()];
        write_index(&mut indices, PaletteSize::new(1).unwrap(), 17, 1);
        let palette = Palette::new(PaletteSize::new(1).unwrap(), vec![5, 5]);
        let mut storage = PalettedStorage::from_parts(indices, palette).unwrap();
        storage.compact();
        assert_eq!(storage.size().bits(), 0);
        assert!(storage.is_uniform(5));
    }

    #[test]
    fn test_equals_ignores_representation() {
        let mut a = PalettedStorage::uniform(1);
        a.set(0, 0, 0, 2);
        a.set(0, 0, 0, 1);
        let b = PalettedStorage::uniform(1);
        assert_ne!(a.size(), b.size());
        assert!(a.equals(&b));
        assert_eq!(a, b);

        let mut c = PalettedStorage::uniform(1);
        c.set(4, 4, 4, 3);
        assert!(!c.equals(&b));
    }

    #[test]
    fn test_from_values_roundtrip() {
        let values: Vec<u32> = (0..CELL_COUNT as u32).map(|i| i % 7).collect();
        let storage = PalettedStorage::from_values(&values);
        assert_eq!(storage.size().bits(), 3);
        assert_eq!(storage.values(), values);
    }

    #[test]
    fn test_from_parts_rejects_out_of_range_index() {
        let size = PaletteSize::new(2).unwrap();
        let mut indices = vec![0u32; size.word_count()];
        write_index(&mut indices, size, 100, 3);
        let result = PalettedStorage::from_parts(indices, Palette::new(size, vec![1, 2, 3]));
        assert!(matches!(
            result,
            Err(CodecError::PaletteIndexOutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn test_indices_do_not_span_words() {
        // 5 bits: 6 indices per word, top 2 bits unused.
        let size = PaletteSize::new(5).unwrap();
        let mut words = vec![0u32; size.word_count()];
        for cell in 0..CELL_COUNT {
            write_index(&mut words, size, cell, 31);
        }
        let (last, full) = words.split_last().unwrap();
        assert!(full.iter().all(|&w| w == 0x3FFF_FFFF));
        assert_eq!(*last, 0x000F_FFFF);
        assert_eq!(read_index(&words, size, 4095), 31);
    }
}
