use crate::error::TableError;
use crate::nbt::{self, TAG_BYTE, TAG_COMPOUND, TAG_END, TAG_INT, TAG_STRING};
use byteorder::{LittleEndian, WriteBytesExt};
use quartz_nbt::{NbtCompound, NbtTag};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};

/// Block state version written by the game for 1.16.0.14 onwards ({1, 16, 0, 14} read as a big endian int).
pub const CURRENT_BLOCK_VERSION: i32 = 18_100_737;

/// A typed block property value. Booleans and bytes share the NBT byte tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Byte(u8),
    Int(i32),
    String(SmolStr),
}

/// Property map, kept sorted by key.
pub type Properties = BTreeMap<SmolStr, PropertyValue>;

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(v) => write!(f, "{}", v),
            PropertyValue::Byte(v) => write!(f, "{}", v),
            PropertyValue::Int(v) => write!(f, "{}", v),
            PropertyValue::String(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<u8> for PropertyValue {
    fn from(v: u8) -> Self {
        PropertyValue::Byte(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.into())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v.into())
    }
}

impl From<SmolStr> for PropertyValue {
    fn from(v: SmolStr) -> Self {
        PropertyValue::String(v)
    }
}

impl PropertyValue {
    pub fn to_nbt(&self) -> NbtTag {
        match self {
            PropertyValue::Bool(v) => NbtTag::Byte(*v as i8),
            PropertyValue::Byte(v) => NbtTag::Byte(*v as i8),
            PropertyValue::Int(v) => NbtTag::Int(*v),
            PropertyValue::String(v) => NbtTag::String(v.to_string()),
        }
    }

    /// Convert an NBT tag found in a `states` compound. Only byte, int and
    /// string tags are valid property values.
    pub fn from_nbt(tag: &NbtTag) -> Option<Self> {
        match tag {
            NbtTag::Byte(v) => Some(PropertyValue::Byte(*v as u8)),
            NbtTag::Int(v) => Some(PropertyValue::Int(*v)),
            NbtTag::String(v) => Some(PropertyValue::String(v.as_str().into())),
            _ => None,
        }
    }

    fn write_le<W: Write>(&self, dest: &mut W, key: &str) -> io::Result<()> {
        match self {
            PropertyValue::Bool(v) => {
                dest.write_u8(TAG_BYTE)?;
                nbt::write_string(dest, key)?;
                dest.write_u8(*v as u8)
            }
            PropertyValue::Byte(v) => {
                dest.write_u8(TAG_BYTE)?;
                nbt::write_string(dest, key)?;
                dest.write_u8(*v)
            }
            PropertyValue::Int(v) => {
                dest.write_u8(TAG_INT)?;
                nbt::write_string(dest, key)?;
                dest.write_i32::<LittleEndian>(*v)
            }
            PropertyValue::String(v) => {
                dest.write_u8(TAG_STRING)?;
                nbt::write_string(dest, key)?;
                nbt::write_string(dest, v)
            }
        }
    }
}

/// Write the little-endian NBT compound `{name, states[, version]}` with
/// sorted state keys. Without a version this is the exact input of the
/// network block hash.
pub fn write_state_nbt<W: Write>(
    dest: &mut W,
    name: &str,
    properties: &Properties,
    version: Option<i32>,
) -> io::Result<()> {
    dest.write_u8(TAG_COMPOUND)?;
    nbt::write_string(dest, "")?;

    dest.write_u8(TAG_STRING)?;
    nbt::write_string(dest, "name")?;
    nbt::write_string(dest, name)?;

    dest.write_u8(TAG_COMPOUND)?;
    nbt::write_string(dest, "states")?;
    for (key, value) in properties {
        value.write_le(dest, key)?;
    }
    dest.write_u8(TAG_END)?;

    if let Some(version) = version {
        dest.write_u8(TAG_INT)?;
        nbt::write_string(dest, "version")?;
        dest.write_i32::<LittleEndian>(version)?;
    }

    dest.write_u8(TAG_END)
}

/// Canonical bytes identifying a state: the hash input, also used as the
/// exact-match key of the runtime table. Fails for a name, key or string
/// value longer than 65535 bytes, which NBT cannot describe.
pub fn canonical_state_bytes(name: &str, properties: &Properties) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(32 + name.len() + properties.len() * 16);
    write_state_nbt(&mut buf, name, properties, None)?;
    Ok(buf)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockState {
    pub name: SmolStr,
    pub properties: Properties,
    pub version: i32,
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.properties.is_empty() {
            write!(f, "[")?;
            for (i, (key, value)) in self.properties.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}={}", key, value)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

impl BlockState {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        BlockState {
            name: name.into(),
            properties: Properties::new(),
            version: CURRENT_BLOCK_VERSION,
        }
    }

    pub fn get_name(&self) -> &str {
        self.name.as_str()
    }

    pub fn with_property(mut self, key: impl Into<SmolStr>, value: impl Into<PropertyValue>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn set_property(&mut self, key: impl Into<SmolStr>, value: impl Into<PropertyValue>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn remove_property(&mut self, key: &str) {
        self.properties.remove(key);
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn canonical_bytes(&self) -> io::Result<Vec<u8>> {
        canonical_state_bytes(&self.name, &self.properties)
    }

    /// Write this state as a Disk palette entry.
    pub fn write_disk_entry<W: Write>(&self, dest: &mut W) -> io::Result<()> {
        write_state_nbt(dest, &self.name, &self.properties, Some(self.version))
    }

    pub fn to_nbt(&self) -> NbtCompound {
        let mut compound = NbtCompound::new();
        compound.insert("name", self.name.to_string());

        let mut states = NbtCompound::new();
        for (key, value) in &self.properties {
            states.insert(key.to_string(), value.to_nbt());
        }
        compound.insert("states", states);
        compound.insert("version", self.version);
        compound
    }

    /// Parse a `{name, states, version}` compound. A missing `states` tag
    /// yields no properties and a missing `version` yields zero; a state of
    /// any type other than byte, int or string is rejected.
    pub fn from_nbt(compound: &NbtCompound) -> Result<Self, TableError> {
        let name: SmolStr = compound
            .get::<_, &String>("name")
            .map_err(|e| TableError::CorruptCatalog(format!("failed to get name: {}", e)))?
            .as_str()
            .into();

        let mut properties = Properties::new();
        if let Ok(states) = compound.get::<_, &NbtCompound>("states") {
            for (key, value) in states.inner() {
                let value = PropertyValue::from_nbt(value).ok_or_else(|| {
                    TableError::CorruptCatalog(format!(
                        "invalid block property type for property {} of {}",
                        key, name
                    ))
                })?;
                properties.insert(key.as_str().into(), value);
            }
        }

        let version = compound.get::<_, i32>("version").unwrap_or(0);

        Ok(BlockState {
            name,
            properties,
            version,
        })
    }
}
