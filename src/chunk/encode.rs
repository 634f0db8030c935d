use super::column::Chunk;
use super::encoding::{Encoding, PaletteKind};
use super::paletted_storage::PalettedStorage;
use super::sub_chunk::SubChunk;
use crate::config::Range;
use crate::error::{CodecError, CodecResult};
use byteorder::{LittleEndian, WriteBytesExt};
use rayon::prelude::*;
use std::sync::Arc;

/// Version of every sub chunk this crate writes.
pub const SUB_CHUNK_VERSION: u8 = 9;

/// Storage header value meaning "same as the previous storage".
pub(crate) const SAME_AS_PREVIOUS: u8 = 0x7f;

/// A chunk split into the values stored under its per-sub-chunk keys and its
/// biome key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerialisedData {
    /// One payload per sub chunk, bottom first.
    pub sub_chunks: Vec<Vec<u8>>,
    pub biomes: Vec<u8>,
}

/// Encode every sub chunk and the biome stream of a chunk. Sub chunks are
/// encoded in parallel; with the Disk encoding, empty ones become empty
/// payloads so their keys can be deleted.
pub fn encode(chunk: &Chunk, encoding: Encoding<'_>) -> CodecResult<SerialisedData> {
    let range = chunk.range();
    let sub_chunks = chunk
        .sub_chunks()
        .par_iter()
        .enumerate()
        .map(|(index, sub)| {
            if matches!(encoding, Encoding::Disk(_)) && sub.is_empty() {
                return Ok(Vec::new());
            }
            encode_sub_chunk(sub, range, index, encoding)
        })
        .collect::<CodecResult<Vec<_>>>()?;

    Ok(SerialisedData {
        sub_chunks,
        biomes: encode_biomes(chunk, encoding)?,
    })
}

/// Encode one sub chunk. `index` is its position in the chunk, bottom first.
pub fn encode_sub_chunk(
    sub: &SubChunk,
    range: Range,
    index: usize,
    encoding: Encoding<'_>,
) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(1024);
    write_sub_chunk(&mut buf, sub, range, index, encoding)?;
    Ok(buf)
}

fn write_sub_chunk(
    dest: &mut Vec<u8>,
    sub: &SubChunk,
    range: Range,
    index: usize,
    encoding: Encoding<'_>,
) -> CodecResult<()> {
    let layers = u8::try_from(sub.layers().len())
        .map_err(|_| CodecError::TooManyLayers(sub.layers().len()))?;
    let y_index = (index as i32 + (range.min() >> 4)) as u8;
    dest.extend_from_slice(&[SUB_CHUNK_VERSION, layers, y_index]);
    for storage in sub.layers() {
        write_storage(dest, storage, None, encoding, PaletteKind::Block)?;
    }
    Ok(())
}

/// Encode the biome storages of a chunk, writing a one-byte marker for each
/// slab equal to the slab below it.
pub fn encode_biomes(chunk: &Chunk, encoding: Encoding<'_>) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(512);
    write_biomes(&mut buf, chunk.biome_storages(), encoding)?;
    Ok(buf)
}

fn write_biomes(
    dest: &mut Vec<u8>,
    biomes: &[Arc<PalettedStorage>],
    encoding: Encoding<'_>,
) -> CodecResult<()> {
    let mut previous: Option<&Arc<PalettedStorage>> = None;
    for biome in biomes {
        write_storage(dest, biome, previous.map(|p| &**p), encoding, PaletteKind::Biome)?;
        previous = Some(biome);
    }
    Ok(())
}

fn write_storage(
    dest: &mut Vec<u8>,
    storage: &PalettedStorage,
    previous: Option<&PalettedStorage>,
    encoding: Encoding<'_>,
    kind: PaletteKind,
) -> CodecResult<()> {
    if let Some(previous) = previous {
        if std::ptr::eq(storage, previous) || storage.equals(previous) {
            dest.push(SAME_AS_PREVIOUS << 1 | encoding.network_flag());
            return Ok(());
        }
    }

    dest.push(storage.size().bits() << 1 | encoding.network_flag());
    dest.reserve(storage.indices().len() * 4);
    for &word in storage.indices() {
        dest.write_u32::<LittleEndian>(word)?;
    }
    encoding.encode_palette(dest, storage.palette(), kind)
}

/// Encode a chunk for a level chunk packet: the sub chunks up to the highest
/// filled one, the biome stream and an empty border block list. Returns the
/// payload and the number of sub chunks it holds.
pub fn network_encode(chunk: &Chunk) -> CodecResult<(Vec<u8>, usize)> {
    let count = chunk.highest_filled_sub_chunk() + 1;
    let range = chunk.range();

    let mut payload = Vec::with_capacity(count * 1024);
    for (index, sub) in chunk.sub_chunks()[..count].iter().enumerate() {
        write_sub_chunk(&mut payload, sub, range, index, Encoding::Network)?;
    }
    write_biomes(&mut payload, chunk.biome_storages(), Encoding::Network)?;
    // Border blocks, never present.
    payload.push(0);

    Ok((payload, count))
}
