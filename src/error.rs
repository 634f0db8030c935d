use std::error::Error as StdError;

/// Errors raised while building or extending a [`RuntimeTable`](crate::RuntimeTable).
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// The catalog contains data that cannot produce a trustworthy table.
    /// Only returned while constructing a table; callers should stop startup.
    #[error("corrupt block catalog: {0}")]
    CorruptCatalog(String),
    #[error("block state {0} is already registered")]
    AlreadyRegistered(String),
    /// The state has a name, key or value longer than NBT can encode.
    #[error("block state cannot be encoded: {0}")]
    InvalidState(String),
    #[error("catalog NBT error: {0}")]
    Nbt(#[from] quartz_nbt::io::NbtIoError),
}

/// Errors raised while decoding or encoding sub-chunk and biome streams.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("truncated or unreadable stream: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported sub chunk version {0}")]
    UnsupportedSubChunkVersion(u8),
    #[error("invalid bits per index {0}")]
    InvalidBitsPerIndex(u8),
    #[error("invalid palette entry count {count} for {bits} bits per index")]
    InvalidPaletteCount { count: i64, bits: u8 },
    #[error("palette index {index} out of range for palette of length {len}")]
    PaletteIndexOutOfRange { index: u32, len: usize },
    #[error("first storage in stream refers to a previous storage")]
    PreviousStorageMissing,
    #[error("malformed NBT: {0}")]
    MalformedNbt(String),
    #[error("runtime ID {0} is not present in the block table")]
    UnknownRuntimeId(u32),
    #[error("payload declares {count} sub chunks but the range holds {max}")]
    TooManySubChunks { count: usize, max: usize },
    #[error("sub chunk holds {0} layers but the header counts at most 255")]
    TooManyLayers(usize),
}

/// Failure reported by a [`KeyValueStore`](crate::world::KeyValueStore) backend.
/// A missing key is not an error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(#[source] Box<dyn StdError + Send + Sync>),
}

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid Y range [{min}, {max}]: min must be a multiple of 16, not above max, and both within [-2048, 2047]")]
    InvalidRange { min: i32, max: i32 },
}

/// Errors raised by the world layer.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("expected more than 512 bytes of 3D data, got {0}")]
    InvalidBiomePayload(usize),
    #[error("blob hash record length {0} is not a multiple of 9")]
    InvalidBlobHashRecord(usize),
    #[error("time stamp record must be 8 bytes, got {0}")]
    InvalidTimeStamp(usize),
}

pub type CodecResult<T> = std::result::Result<T, CodecError>;
pub type WorldResult<T> = std::result::Result<T, WorldError>;
