use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Options controlling how a [`RuntimeTable`](crate::RuntimeTable) assigns IDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOptions {
    /// Runtime IDs are FNV1a hashes of the state rather than dense positions.
    #[serde(default = "default_true")]
    pub use_network_id_hashes: bool,
    /// Prefix added to un-namespaced names when a lookup misses.
    #[serde(default = "default_namespace")]
    pub default_namespace: String,
}

fn default_true() -> bool {
    true
}

fn default_namespace() -> String {
    "minecraft:".to_string()
}

impl Default for TableOptions {
    fn default() -> Self {
        TableOptions {
            use_network_id_hashes: default_true(),
            default_namespace: default_namespace(),
        }
    }
}

impl TableOptions {
    pub fn from_json(settings: &str) -> serde_json::Result<Self> {
        serde_json::from_str(settings)
    }
}

/// Lowest Y a range may start at: slab -128, the smallest signed key byte.
pub const MIN_WORLD_Y: i32 = -2048;
/// Highest Y a range may reach: the top of slab 127.
pub const MAX_WORLD_Y: i32 = 2047;

/// Inclusive vertical range of a chunk column.
///
/// The minimum is aligned to a sub chunk boundary and both ends fit the
/// signed byte that stores a slab index in sub chunk keys and headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RangeBounds")]
pub struct Range {
    min: i32,
    max: i32,
}

#[derive(Deserialize)]
struct RangeBounds {
    min: i32,
    max: i32,
}

impl TryFrom<RangeBounds> for Range {
    type Error = ConfigError;

    fn try_from(bounds: RangeBounds) -> Result<Self, Self::Error> {
        Range::new(bounds.min, bounds.max)
    }
}

impl Range {
    pub fn new(min: i32, max: i32) -> Result<Self, ConfigError> {
        if min > max || min % 16 != 0 || min < MIN_WORLD_Y || max > MAX_WORLD_Y {
            return Err(ConfigError::InvalidRange { min, max });
        }
        Ok(Range { min, max })
    }

    /// Only for bounds known to be valid.
    const fn fixed(min: i32, max: i32) -> Self {
        Range { min, max }
    }

    pub const fn min(&self) -> i32 {
        self.min
    }

    pub const fn max(&self) -> i32 {
        self.max
    }

    /// Distance between the minimum and maximum, so 383 for [-64, 319].
    pub const fn height(&self) -> i32 {
        self.max - self.min
    }

    /// Number of 16-block slabs needed to cover the range.
    pub const fn sub_chunk_count(&self) -> usize {
        ((self.height() >> 4) + 1) as usize
    }
}

/// A world layer with its own Y range and key namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Overworld,
    Nether,
    End,
    Custom(i32),
}

impl Dimension {
    pub fn id(&self) -> i32 {
        match self {
            Dimension::Overworld => 0,
            Dimension::Nether => 1,
            Dimension::End => 2,
            Dimension::Custom(id) => *id,
        }
    }

    pub fn from_id(id: i32) -> Self {
        match id {
            0 => Dimension::Overworld,
            1 => Dimension::Nether,
            2 => Dimension::End,
            other => Dimension::Custom(other),
        }
    }

    pub fn range(&self) -> Range {
        match self {
            Dimension::Nether => Range::fixed(0, 127),
            Dimension::End => Range::fixed(0, 255),
            Dimension::Overworld | Dimension::Custom(_) => Range::fixed(-64, 319),
        }
    }
}
