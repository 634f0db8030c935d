use super::column::Chunk;
use super::encode::{SerialisedData, SAME_AS_PREVIOUS};
use super::encoding::{Encoding, PaletteKind};
use super::palette::PaletteSize;
use super::paletted_storage::PalettedStorage;
use super::sub_chunk::SubChunk;
use crate::config::Range;
use crate::error::{CodecError, CodecResult};
use crate::table::RuntimeTable;
use byteorder::{LittleEndian, ReadBytesExt};
use rayon::prelude::*;
use std::sync::Arc;

/// Decode a chunk read from disk. Missing or empty sub chunk payloads leave
/// the slab empty; an empty biome stream leaves default biomes.
pub fn disk_decode(data: &SerialisedData, range: Range, table: &RuntimeTable) -> CodecResult<Chunk> {
    let air = table.air_runtime_id();
    let encoding = Encoding::Disk(table);
    let mut chunk = Chunk::new(air, range);

    let count = chunk.sub_chunks.len();
    let decoded = data
        .sub_chunks
        .par_iter()
        .take(count)
        .map(|payload| {
            if payload.is_empty() {
                return Ok(None);
            }
            decode_sub_chunk(&mut payload.as_slice(), air, encoding).map(|(sub, _)| Some(sub))
        })
        .collect::<CodecResult<Vec<_>>>()?;

    for (slot, sub) in chunk.sub_chunks.iter_mut().zip(decoded) {
        if let Some(sub) = sub {
            *slot = sub;
        }
    }

    if !data.biomes.is_empty() {
        decode_biomes(&mut data.biomes.as_slice(), &mut chunk, encoding)?;
    }
    Ok(chunk)
}

/// Decode a level chunk payload holding `count` sub chunks followed by the
/// biome stream. Trailing bytes (border blocks) are ignored.
pub fn network_decode(air: u32, payload: &[u8], count: usize, range: Range) -> CodecResult<Chunk> {
    let mut chunk = Chunk::new(air, range);
    let max = chunk.sub_chunks.len();
    if count > max {
        return Err(CodecError::TooManySubChunks { count, max });
    }

    let mut source = payload;
    for index in 0..count {
        let (sub, _) = decode_sub_chunk(&mut source, air, Encoding::Network)?;
        chunk.sub_chunks[index] = sub;
    }
    decode_biomes(&mut source, &mut chunk, Encoding::Network)?;
    Ok(chunk)
}

/// Decode one sub chunk, returning it with the absolute slab index stored in
/// its header when the format has one (version 9).
pub fn decode_sub_chunk(
    source: &mut &[u8],
    air: u32,
    encoding: Encoding<'_>,
) -> CodecResult<(SubChunk, Option<i8>)> {
    let version = source.read_u8()?;
    match version {
        1 => {
            let storage = decode_block_storage(source, encoding)?;
            Ok((SubChunk::from_layers(air, vec![storage]), None))
        }
        8 | 9 => {
            let layer_count = source.read_u8()?;
            let y_index = if version == 9 {
                Some(source.read_i8()?)
            } else {
                None
            };
            let mut layers = Vec::with_capacity(layer_count as usize);
            for _ in 0..layer_count {
                layers.push(decode_block_storage(source, encoding)?);
            }
            Ok((SubChunk::from_layers(air, layers), y_index))
        }
        other => Err(CodecError::UnsupportedSubChunkVersion(other)),
    }
}

fn decode_block_storage(source: &mut &[u8], encoding: Encoding<'_>) -> CodecResult<PalettedStorage> {
    decode_storage(source, encoding, PaletteKind::Block)?.ok_or(CodecError::PreviousStorageMissing)
}

/// Decode the biome stream into `chunk`. A "same as previous" marker shares
/// the storage of the slab below. If the stream ends early the remaining
/// slabs keep their default biomes.
fn decode_biomes(source: &mut &[u8], chunk: &mut Chunk, encoding: Encoding<'_>) -> CodecResult<()> {
    for index in 0..chunk.biomes.len() {
        if source.is_empty() {
            tracing::debug!(decoded = index, total = chunk.biomes.len(), "biome stream ended early");
            break;
        }
        chunk.biomes[index] = match decode_storage(source, encoding, PaletteKind::Biome)? {
            Some(storage) => Arc::new(storage),
            None if index == 0 => return Err(CodecError::PreviousStorageMissing),
            None => Arc::clone(&chunk.biomes[index - 1]),
        };
    }
    Ok(())
}

/// Decode one paletted storage. `None` is the "same as previous" marker.
fn decode_storage(
    source: &mut &[u8],
    encoding: Encoding<'_>,
    kind: PaletteKind,
) -> CodecResult<Option<PalettedStorage>> {
    let bits = source.read_u8()? >> 1;
    if bits == SAME_AS_PREVIOUS {
        return Ok(None);
    }
    let size = PaletteSize::new(bits).ok_or(CodecError::InvalidBitsPerIndex(bits))?;

    let mut words = vec![0u32; size.word_count()];
    source.read_u32_into::<LittleEndian>(&mut words)?;
    let palette = encoding.decode_palette(source, size, kind)?;
    PalettedStorage::from_parts(words, palette).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_state::BlockState;
    use crate::chunk::encode::{encode, encode_biomes, encode_sub_chunk, network_encode};
    use crate::config::Dimension;
    use crate::hash::UNKNOWN_RUNTIME_ID;

    fn table() -> RuntimeTable {
        RuntimeTable::build(
            vec![
                BlockState::new("minecraft:air"),
                BlockState::new("minecraft:stone"),
                BlockState::new("minecraft:water").with_property("liquid_depth", 0),
            ],
            true,
        )
        .unwrap()
    }

    fn id(table: &RuntimeTable, name: &str) -> u32 {
        table
            .state_to_runtime_id(name, &Default::default())
            .unwrap()
    }

    #[test]
    fn test_sub_chunk_roundtrip_with_overlay() {
        let table = table();
        let (air, stone, water) = (table.air_runtime_id(), id(&table, "minecraft:stone"), id(&table, "minecraft:water"));
        let mut sub = SubChunk::new(air);
        sub.set_block(1, 2, 3, 0, stone);
        sub.set_block(1, 2, 3, 1, water);

        for encoding in [Encoding::Disk(&table), Encoding::Network] {
            let bytes = encode_sub_chunk(&sub, Dimension::Overworld.range(), 4, encoding).unwrap();
            let (decoded, y_index) = decode_sub_chunk(&mut bytes.as_slice(), air, encoding).unwrap();
            assert_eq!(y_index, Some(0));
            assert!(decoded.equals(&sub));
            assert_eq!(decoded.block(1, 2, 3, 1), water);
        }
    }

    #[test]
    fn test_version_one_and_eight() {
        let table = table();
        let stone = id(&table, "minecraft:stone");
        // version 1: a single storage, 0 bits, palette value stone
        let mut v1 = vec![1u8, 0 << 1 | 1];
        crate::binary::write_varint32(&mut v1, stone as i32).unwrap();
        let (sub, y_index) = decode_sub_chunk(&mut v1.as_slice(), 0, Encoding::Network).unwrap();
        assert_eq!(y_index, None);
        assert_eq!(sub.block(15, 15, 15, 0), stone);

        // version 8: layer count, no index
        let mut v8 = vec![8u8, 1, 1];
        crate::binary::write_varint32(&mut v8, stone as i32).unwrap();
        let (sub, y_index) = decode_sub_chunk(&mut v8.as_slice(), 0, Encoding::Network).unwrap();
        assert_eq!(y_index, None);
        assert_eq!(sub.block(0, 0, 0, 0), stone);
    }

    #[test]
    fn test_unsupported_version() {
        let data = [2u8, 0, 0];
        assert!(matches!(
            decode_sub_chunk(&mut &data[..], 0, Encoding::Network),
            Err(CodecError::UnsupportedSubChunkVersion(2))
        ));
    }

    #[test]
    fn test_truncated_storage_is_error() {
        let table = table();
        let mut sub = SubChunk::new(table.air_runtime_id());
        sub.set_block(0, 0, 0, 0, id(&table, "minecraft:stone"));
        let bytes = encode_sub_chunk(&sub, Dimension::Overworld.range(), 0, Encoding::Network).unwrap();
        let truncated = &bytes[..bytes.len() / 2];
        assert!(matches!(
            decode_sub_chunk(&mut &truncated[..], 0, Encoding::Network),
            Err(CodecError::Io(_))
        ));
    }

    #[test]
    fn test_invalid_width_is_error() {
        let data = [9u8, 1, 0, 7 << 1];
        assert!(matches!(
            decode_sub_chunk(&mut &data[..], 0, Encoding::Network),
            Err(CodecError::InvalidBitsPerIndex(7))
        ));
    }

    #[test]
    fn test_block_layer_cannot_refer_to_previous() {
        let data = [9u8, 1, 0, 0xFF];
        assert!(matches!(
            decode_sub_chunk(&mut &data[..], 0, Encoding::Network),
            Err(CodecError::PreviousStorageMissing)
        ));
    }

    #[test]
    fn test_first_biome_cannot_refer_to_previous() {
        let mut chunk = Chunk::new(0, Dimension::Nether.range());
        let data = [0xFFu8];
        assert!(matches!(
            decode_biomes(&mut &data[..], &mut chunk, Encoding::Network),
            Err(CodecError::PreviousStorageMissing)
        ));
    }

    #[test]
    fn test_biome_markers_share_storage() {
        let mut chunk = Chunk::new(0, Dimension::Nether.range());
        chunk.set_biome(4, 4, 4, 8);
        let bytes = encode_biomes(&chunk, Encoding::Network).unwrap();

        let mut decoded = Chunk::new(0, Dimension::Nether.range());
        decode_biomes(&mut bytes.as_slice(), &mut decoded, Encoding::Network).unwrap();
        assert_eq!(decoded.biome(4, 4, 4), 8);
        assert_eq!(decoded.biome(4, 20, 4), 0);
        assert!(Arc::ptr_eq(&decoded.biomes[1], &decoded.biomes[7]));

        decoded.set_biome(0, 16, 0, 2);
        assert_eq!(decoded.biome(0, 16, 0), 2);
        assert_eq!(decoded.biome(0, 32, 0), 0);
    }

    #[test]
    fn test_disk_roundtrip_and_unknown_entries() {
        let table = table();
        let air = table.air_runtime_id();
        let mut chunk = Chunk::new(air, Dimension::Overworld.range());
        chunk.set_block(0, -64, 0, 0, id(&table, "minecraft:stone"));
        chunk.set_block(5, 200, 5, 0, UNKNOWN_RUNTIME_ID);
        chunk.set_biome(0, 0, 0, 12);

        let data = encode(&chunk, Encoding::Disk(&table)).unwrap();
        let decoded = disk_decode(&data, chunk.range(), &table).unwrap();
        assert!(decoded.equals(&chunk));
        assert_eq!(decoded.block(5, 200, 5, 0), UNKNOWN_RUNTIME_ID);
        assert_eq!(decoded.biome(0, 0, 0), 12);
    }

    #[test]
    fn test_disk_decode_without_biomes() {
        let table = table();
        let data = SerialisedData {
            sub_chunks: vec![Vec::new(); 4],
            biomes: Vec::new(),
        };
        let chunk = disk_decode(&data, Dimension::End.range(), &table).unwrap();
        assert_eq!(chunk.block(0, 0, 0, 0), table.air_runtime_id());
        assert_eq!(chunk.biome(0, 0, 0), 0);
    }

    #[test]
    fn test_network_roundtrip() {
        let air = 0;
        let mut chunk = Chunk::new(air, Dimension::Overworld.range());
        chunk.set_block(1, 0, 1, 0, 77);
        chunk.set_block(1, 1, 1, 1, 78);
        chunk.set_biome(1, 0, 1, 3);

        let (payload, count) = network_encode(&chunk).unwrap();
        let decoded = network_decode(air, &payload, count, chunk.range()).unwrap();
        assert!(decoded.equals(&chunk));
        assert_eq!(decoded.biome(1, 0, 1), 3);
    }

    #[test]
    fn test_network_decode_rejects_excess_count() {
        assert!(matches!(
            network_decode(0, &[], 9, Dimension::Nether.range()),
            Err(CodecError::TooManySubChunks { count: 9, max: 8 })
        ));
    }
}
