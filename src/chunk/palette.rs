/// Number of bits each cell index occupies in a [`PalettedStorage`](super::PalettedStorage).
///
/// Only the widths the game writes are representable. Indices never span two
/// words, so widths that do not divide 32 leave padding bits in every word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PaletteSize(u8);

const SIZES: [u8; 10] = [0, 1, 2, 3, 4, 5, 6, 8, 16, 32];

/// Cells in a 16x16x16 volume.
pub const CELL_COUNT: usize = 4096;

impl PaletteSize {
    pub const ZERO: PaletteSize = PaletteSize(0);
    pub const MAX: PaletteSize = PaletteSize(32);

    pub fn new(bits: u8) -> Option<Self> {
        SIZES.contains(&bits).then_some(PaletteSize(bits))
    }

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn indices_per_word(self) -> usize {
        if self.0 == 0 {
            0
        } else {
            32 / self.0 as usize
        }
    }

    /// Number of u32 words needed to hold every cell index.
    pub fn word_count(self) -> usize {
        match self.indices_per_word() {
            0 => 0,
            per_word => CELL_COUNT.div_ceil(per_word),
        }
    }

    #[inline]
    pub(crate) fn mask(self) -> u32 {
        match self.0 {
            0 => 0,
            32 => u32::MAX,
            bits => (1u32 << bits) - 1,
        }
    }

    /// Largest palette this width can address.
    pub fn capacity(self) -> u64 {
        1u64 << self.0
    }

    /// The next wider size, or `None` at 32 bits.
    pub fn increase(self) -> Option<Self> {
        SIZES.iter().copied().find(|&s| s > self.0).map(PaletteSize)
    }

    /// The narrowest size able to address `len` palette entries.
    pub fn for_len(len: usize) -> Self {
        SIZES
            .iter()
            .copied()
            .map(PaletteSize)
            .find(|size| size.capacity() >= len as u64)
            .unwrap_or(PaletteSize::MAX)
    }
}

/// Ordered list of the distinct values a storage refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    size: PaletteSize,
    values: Vec<u32>,
}

impl Palette {
    pub fn new(size: PaletteSize, values: Vec<u32>) -> Self {
        Palette { size, values }
    }

    #[inline]
    pub fn size(&self) -> PaletteSize {
        self.size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[u32] {
        &self.values
    }

    #[inline]
    pub fn value(&self, index: u32) -> Option<u32> {
        self.values.get(index as usize).copied()
    }

    pub fn index_of(&self, value: u32) -> Option<u32> {
        self.values.iter().position(|&v| v == value).map(|i| i as u32)
    }

    /// Append a value, returning its index and whether the palette outgrew
    /// its current width. The caller must repack indices when it did.
    pub(crate) fn add(&mut self, value: u32) -> (u32, bool) {
        let index = self.values.len() as u32;
        self.values.push(value);
        if self.values.len() as u64 > self.size.capacity() {
            if let Some(next) = self.size.increase() {
                self.size = next;
                return (index, true);
            }
        }
        (index, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_counts_pad_odd_widths() {
        let counts: Vec<usize> = SIZES
            .iter()
            .map(|&b| PaletteSize(b).word_count())
            .collect();
        assert_eq!(counts, vec![0, 128, 256, 410, 512, 683, 820, 1024, 2048, 4096]);
    }

    #[test]
    fn test_for_len() {
        assert_eq!(PaletteSize::for_len(0).bits(), 0);
        assert_eq!(PaletteSize::for_len(1).bits(), 0);
        assert_eq!(PaletteSize::for_len(2).bits(), 1);
        assert_eq!(PaletteSize::for_len(9).bits(), 4);
        assert_eq!(PaletteSize::for_len(65).bits(), 8);
        assert_eq!(PaletteSize::for_len(257).bits(), 16);
        assert_eq!(PaletteSize::for_len(70_000).bits(), 32);
    }

    #[test]
    fn test_invalid_width_rejected() {
        assert!(PaletteSize::new(7).is_none());
        assert!(PaletteSize::new(33).is_none());
        assert_eq!(PaletteSize::new(6).map(|s| s.bits()), Some(6));
    }

    #[test]
    fn test_add_reports_growth() {
        let mut palette = Palette::new(PaletteSize::ZERO, vec![10]);
        assert_eq!(palette.add(11), (1, true));
        assert_eq!(palette.size().bits(), 1);
        assert_eq!(palette.add(12), (2, true));
        assert_eq!(palette.size().bits(), 2);
        assert_eq!(palette.add(13), (3, false));
        assert_eq!(palette.index_of(12), Some(2));
        assert_eq!(palette.index_of(99), None);
    }
}
