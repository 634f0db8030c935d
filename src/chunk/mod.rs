//! Paletted block and biome storage for chunk columns, and the Disk and
//! Network codecs.
//!
//! A [`Chunk`] is a stack of [`SubChunk`]s, each a set of 16x16x16
//! [`PalettedStorage`] layers. [`encode`] and [`disk_decode`] convert a chunk
//! to and from the values stored in a world database; [`network_encode`] and
//! [`network_decode`] handle the level chunk packet payload.

mod column;
mod decode;
mod encode;
mod encoding;
mod palette;
mod paletted_storage;
mod sub_chunk;

pub use column::Chunk;
pub use decode::{decode_sub_chunk, disk_decode, network_decode};
pub use encode::{
    encode, encode_biomes, encode_sub_chunk, network_encode, SerialisedData, SUB_CHUNK_VERSION,
};
pub use encoding::{Encoding, PaletteKind};
pub use palette::{Palette, PaletteSize, CELL_COUNT};
pub use paletted_storage::PalettedStorage;
pub use sub_chunk::SubChunk;
