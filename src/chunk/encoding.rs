use crate::binary::{read_varint32, write_varint32};
use crate::block_state::{BlockState, Properties, PropertyValue};
use crate::error::{CodecError, CodecResult};
use crate::hash::{UNKNOWN_BLOCK_NAME, UNKNOWN_RUNTIME_ID};
use crate::nbt;
use crate::table::RuntimeTable;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use quartz_nbt::{NbtCompound, NbtTag};

use super::palette::{Palette, PaletteSize, CELL_COUNT};

/// Wire format of a chunk.
///
/// Disk writes fixed-width little-endian integers and describes every block
/// palette entry as an NBT compound, so it needs the table that gives runtime
/// IDs their meaning. Network writes varints and bare runtime IDs, relying on
/// both ends sharing one table.
#[derive(Debug, Clone, Copy)]
pub enum Encoding<'a> {
    Disk(&'a RuntimeTable),
    Network,
}

/// What the values in a palette refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteKind {
    Block,
    Biome,
}

impl Encoding<'_> {
    /// Low bit of every storage header.
    #[inline]
    pub(crate) fn network_flag(self) -> u8 {
        match self {
            Encoding::Disk(_) => 0,
            Encoding::Network => 1,
        }
    }

    pub(crate) fn encode_palette(
        self,
        dest: &mut Vec<u8>,
        palette: &Palette,
        kind: PaletteKind,
    ) -> CodecResult<()> {
        match self {
            Encoding::Disk(table) => {
                if palette.size().bits() != 0 {
                    dest.write_u32::<LittleEndian>(palette.len() as u32)?;
                }
                for &value in palette.values() {
                    match kind {
                        PaletteKind::Block => write_block_entry(dest, value, table)?,
                        PaletteKind::Biome => dest.write_u32::<LittleEndian>(value)?,
                    }
                }
            }
            Encoding::Network => {
                if palette.size().bits() != 0 {
                    write_varint32(dest, palette.len() as i32)?;
                }
                for &value in palette.values() {
                    write_varint32(dest, value as i32)?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn decode_palette(
        self,
        source: &mut &[u8],
        size: PaletteSize,
        kind: PaletteKind,
    ) -> CodecResult<Palette> {
        let count: i64 = if size.bits() == 0 {
            1
        } else {
            match self {
                Encoding::Disk(_) => source.read_u32::<LittleEndian>()? as i64,
                Encoding::Network => read_varint32(source)? as i64,
            }
        };
        let limit = size.capacity().min(CELL_COUNT as u64) as i64;
        if count <= 0 || count > limit {
            return Err(CodecError::InvalidPaletteCount {
                count,
                bits: size.bits(),
            });
        }

        let mut values = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let value = match self {
                Encoding::Disk(table) => match kind {
                    PaletteKind::Block => read_block_entry(source, table)?,
                    PaletteKind::Biome => source.read_u32::<LittleEndian>()?,
                },
                Encoding::Network => read_varint32(source)? as u32,
            };
            values.push(value);
        }
        Ok(Palette::new(size, values))
    }
}

fn write_block_entry(dest: &mut Vec<u8>, runtime_id: u32, table: &RuntimeTable) -> CodecResult<()> {
    match table.runtime_id_to_state(runtime_id) {
        Some(state) => state.write_disk_entry(dest)?,
        None if runtime_id == UNKNOWN_RUNTIME_ID => {
            BlockState::new(UNKNOWN_BLOCK_NAME).write_disk_entry(dest)?
        }
        None => return Err(CodecError::UnknownRuntimeId(runtime_id)),
    }
    Ok(())
}

/// Read one Disk palette entry and resolve it against the table. States the
/// table does not know resolve to [`UNKNOWN_RUNTIME_ID`] instead of failing.
fn read_block_entry(source: &mut &[u8], table: &RuntimeTable) -> CodecResult<u32> {
    let (_, entry) = nbt::read_compound(source)?;
    resolve_block_entry(&entry, table)
}

pub(crate) fn resolve_block_entry(entry: &NbtCompound, table: &RuntimeTable) -> CodecResult<u32> {
    let name = match entry.inner().get("name") {
        Some(NbtTag::String(name)) => name.to_lowercase(),
        _ => String::new(),
    };

    let mut properties = Properties::new();
    match entry.inner().get("states") {
        None => {}
        Some(NbtTag::Compound(states)) => {
            for (key, value) in states.inner() {
                match PropertyValue::from_nbt(value) {
                    Some(value) => {
                        properties.insert(key.as_str().into(), value);
                    }
                    None => {
                        tracing::warn!(block = %name, property = %key, "unsupported block property type");
                        return Ok(UNKNOWN_RUNTIME_ID);
                    }
                }
            }
        }
        Some(_) => return Err(CodecError::MalformedNbt("invalid state in block entry".into())),
    }

    match table.state_to_runtime_id(&name, &properties) {
        Some(runtime_id) => Ok(runtime_id),
        None => {
            // Old tools saved nameless entries often enough that reporting them is noise.
            if !name.is_empty() {
                let version = match entry.inner().get("version") {
                    Some(NbtTag::Int(v)) => *v,
                    _ => 0,
                };
                tracing::warn!(
                    state = %BlockState::new(name.as_str()).with_properties(properties),
                    version,
                    "cannot find runtime ID of block state, substituting unknown block"
                );
            }
            Ok(UNKNOWN_RUNTIME_ID)
        }
    }
}
