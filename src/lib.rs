//! Block runtime ID tables, paletted sub-chunk storage and the Disk and
//! Network chunk codecs for Bedrock-format worlds.

pub mod binary;
pub mod block_state;
pub mod catalog;
pub mod chunk;
pub mod config;
pub mod error;
pub mod handle;
pub mod hash;
pub mod nbt;
pub mod table;
pub mod world;

pub use block_state::{BlockState, Properties, PropertyValue, CURRENT_BLOCK_VERSION};
pub use catalog::{load_table, read_catalog};
pub use chunk::{
    disk_decode, encode, network_decode, network_encode, Chunk, Encoding, PalettedStorage,
    SerialisedData, SubChunk,
};
pub use config::{Dimension, Range, TableOptions};
pub use error::{CodecError, ConfigError, StoreError, TableError, WorldError};
pub use handle::{Handle, HandleArena};
pub use hash::{UNKNOWN_BLOCK_NAME, UNKNOWN_RUNTIME_ID};
pub use table::{BlockEntry, RuntimeTable, StateEnum};
pub use world::{BlobHash, ChunkPos, KeyValueStore, MemoryStore, SubChunkPos, World};
