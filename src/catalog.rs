//! Loading the vanilla block state catalog.
//!
//! The catalog is a big-endian NBT compound, usually gzipped, whose `blocks`
//! list holds one `{name, states, version}` compound per block state in
//! dense runtime ID order.

use crate::block_state::BlockState;
use crate::config::TableOptions;
use crate::error::TableError;
use crate::table::RuntimeTable;
use flate2::read::GzDecoder;
use quartz_nbt::io::Flavor;
use quartz_nbt::{NbtCompound, NbtList, NbtTag};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub fn is_gzipped(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

fn read_root(data: &[u8]) -> Result<NbtCompound, TableError> {
    let (root, _) = if is_gzipped(data) {
        let reader = std::io::BufReader::with_capacity(1 << 16, data);
        let mut gz = GzDecoder::new(reader);
        quartz_nbt::io::read_nbt(&mut gz, Flavor::Uncompressed)?
    } else {
        let mut source = data;
        quartz_nbt::io::read_nbt(&mut source, Flavor::Uncompressed)?
    };
    Ok(root)
}

/// Decode every block state of a catalog, in file order.
pub fn read_catalog(data: &[u8]) -> Result<Vec<BlockState>, TableError> {
    let root = read_root(data)?;
    let blocks = root
        .get::<_, &NbtList>("blocks")
        .map_err(|e| TableError::CorruptCatalog(format!("failed to get blocks: {}", e)))?;

    let mut states = Vec::with_capacity(blocks.len());
    for (i, tag) in blocks.iter().enumerate() {
        match tag {
            NbtTag::Compound(compound) => states.push(BlockState::from_nbt(compound)?),
            _ => {
                return Err(TableError::CorruptCatalog(format!(
                    "catalog entry {} is not a compound",
                    i
                )))
            }
        }
    }
    tracing::debug!(states = states.len(), "read block catalog");
    Ok(states)
}

/// Read a catalog and build a table from it in one step.
pub fn load_table(data: &[u8], options: &TableOptions) -> Result<RuntimeTable, TableError> {
    RuntimeTable::with_options(read_catalog(data)?, options)
}
