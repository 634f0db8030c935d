//! Little-endian NBT as written by Bedrock worlds.
//!
//! Tags are the `quartz_nbt` types; only the byte order differs from Java
//! NBT. Strings carry a u16 length, lists and arrays an i32 length.

use crate::error::{CodecError, CodecResult};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use quartz_nbt::{NbtCompound, NbtList, NbtTag};
use std::io::{self, Read, Write};

pub const TAG_END: u8 = 0;
pub const TAG_BYTE: u8 = 1;
pub const TAG_SHORT: u8 = 2;
pub const TAG_INT: u8 = 3;
pub const TAG_LONG: u8 = 4;
pub const TAG_FLOAT: u8 = 5;
pub const TAG_DOUBLE: u8 = 6;
pub const TAG_BYTE_ARRAY: u8 = 7;
pub const TAG_STRING: u8 = 8;
pub const TAG_LIST: u8 = 9;
pub const TAG_COMPOUND: u8 = 10;
pub const TAG_INT_ARRAY: u8 = 11;
pub const TAG_LONG_ARRAY: u8 = 12;

const MAX_DEPTH: usize = 512;

pub fn tag_id(tag: &NbtTag) -> u8 {
    match tag {
        NbtTag::Byte(_) => TAG_BYTE,
        NbtTag::Short(_) => TAG_SHORT,
        NbtTag::Int(_) => TAG_INT,
        NbtTag::Long(_) => TAG_LONG,
        NbtTag::Float(_) => TAG_FLOAT,
        NbtTag::Double(_) => TAG_DOUBLE,
        NbtTag::ByteArray(_) => TAG_BYTE_ARRAY,
        NbtTag::String(_) => TAG_STRING,
        NbtTag::List(_) => TAG_LIST,
        NbtTag::Compound(_) => TAG_COMPOUND,
        NbtTag::IntArray(_) => TAG_INT_ARRAY,
        NbtTag::LongArray(_) => TAG_LONG_ARRAY,
    }
}

// ─── Read Path ──────────────────────────────────────────────────────────────

/// Read a named root compound.
pub fn read_compound<R: Read>(source: &mut R) -> CodecResult<(String, NbtCompound)> {
    let root_id = source.read_u8()?;
    if root_id != TAG_COMPOUND {
        return Err(CodecError::MalformedNbt(format!(
            "root tag must be a compound, found type {}",
            root_id
        )));
    }
    let name = read_string(source)?;
    match read_tag_body(source, TAG_COMPOUND, 0)? {
        NbtTag::Compound(compound) => Ok((name, compound)),
        _ => Err(CodecError::MalformedNbt("root tag is not a compound".into())),
    }
}

pub(crate) fn read_string<R: Read>(source: &mut R) -> CodecResult<String> {
    let len = source.read_u16::<LittleEndian>()? as usize;
    let mut bytes = vec![0; len];
    source.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| CodecError::MalformedNbt(format!("invalid string: {}", e)))
}

fn read_len<R: Read>(source: &mut R) -> CodecResult<usize> {
    let len = source.read_i32::<LittleEndian>()?;
    if len < 0 {
        return Err(CodecError::MalformedNbt(format!("negative length {}", len)));
    }
    Ok(len as usize)
}

fn read_tag_body<R: Read>(source: &mut R, id: u8, depth: usize) -> CodecResult<NbtTag> {
    if depth > MAX_DEPTH {
        return Err(CodecError::MalformedNbt("nesting too deep".into()));
    }

    let tag = match id {
        TAG_BYTE => NbtTag::Byte(source.read_i8()?),
        TAG_SHORT => NbtTag::Short(source.read_i16::<LittleEndian>()?),
        TAG_INT => NbtTag::Int(source.read_i32::<LittleEndian>()?),
        TAG_LONG => NbtTag::Long(source.read_i64::<LittleEndian>()?),
        TAG_FLOAT => NbtTag::Float(source.read_f32::<LittleEndian>()?),
        TAG_DOUBLE => NbtTag::Double(source.read_f64::<LittleEndian>()?),
        TAG_BYTE_ARRAY => {
            let len = read_len(source)?;
            let mut array = Vec::with_capacity(len.min(4096));
            for _ in 0..len {
                array.push(source.read_i8()?);
            }
            NbtTag::ByteArray(array)
        }
        TAG_STRING => NbtTag::String(read_string(source)?),
        TAG_LIST => {
            let type_id = source.read_u8()?;
            let len = read_len(source)?;
            if type_id > TAG_LONG_ARRAY || (type_id == TAG_END && len > 0) {
                return Err(CodecError::MalformedNbt(format!(
                    "invalid list element type {}",
                    type_id
                )));
            }
            let mut list = NbtList::new();
            for _ in 0..len {
                list.push(read_tag_body(source, type_id, depth + 1)?);
            }
            NbtTag::List(list)
        }
        TAG_COMPOUND => {
            let mut compound = NbtCompound::new();
            let mut tag_id = source.read_u8()?;
            while tag_id != TAG_END {
                let name = read_string(source)?;
                let tag = read_tag_body(source, tag_id, depth + 1)?;
                compound.insert(name, tag);
                tag_id = source.read_u8()?;
            }
            NbtTag::Compound(compound)
        }
        TAG_INT_ARRAY => {
            let len = read_len(source)?;
            let mut array = Vec::with_capacity(len.min(4096));
            for _ in 0..len {
                array.push(source.read_i32::<LittleEndian>()?);
            }
            NbtTag::IntArray(array)
        }
        TAG_LONG_ARRAY => {
            let len = read_len(source)?;
            let mut array = Vec::with_capacity(len.min(4096));
            for _ in 0..len {
                array.push(source.read_i64::<LittleEndian>()?);
            }
            NbtTag::LongArray(array)
        }
        other => {
            return Err(CodecError::MalformedNbt(format!(
                "invalid tag type {}",
                other
            )))
        }
    };

    Ok(tag)
}

// ─── Write Path ─────────────────────────────────────────────────────────────

/// Write a named root compound.
pub fn write_compound<W: Write>(dest: &mut W, name: &str, compound: &NbtCompound) -> io::Result<()> {
    dest.write_u8(TAG_COMPOUND)?;
    write_string(dest, name)?;
    write_compound_body(dest, compound)
}

pub(crate) fn write_string<W: Write>(dest: &mut W, value: &str) -> io::Result<()> {
    let len = u16::try_from(value.len()).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, "NBT string longer than 65535 bytes")
    })?;
    dest.write_u16::<LittleEndian>(len)?;
    dest.write_all(value.as_bytes())
}

fn write_len<W: Write>(dest: &mut W, len: usize) -> io::Result<()> {
    let len = i32::try_from(len)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "NBT sequence too long"))?;
    dest.write_i32::<LittleEndian>(len)
}

fn write_compound_body<W: Write>(dest: &mut W, compound: &NbtCompound) -> io::Result<()> {
    for (key, value) in compound.inner() {
        dest.write_u8(tag_id(value))?;
        write_string(dest, key)?;
        write_tag_body(dest, value)?;
    }
    dest.write_u8(TAG_END)
}

fn write_tag_body<W: Write>(dest: &mut W, tag: &NbtTag) -> io::Result<()> {
    match tag {
        NbtTag::Byte(v) => dest.write_i8(*v),
        NbtTag::Short(v) => dest.write_i16::<LittleEndian>(*v),
        NbtTag::Int(v) => dest.write_i32::<LittleEndian>(*v),
        NbtTag::Long(v) => dest.write_i64::<LittleEndian>(*v),
        NbtTag::Float(v) => dest.write_f32::<LittleEndian>(*v),
        NbtTag::Double(v) => dest.write_f64::<LittleEndian>(*v),
        NbtTag::ByteArray(values) => {
            write_len(dest, values.len())?;
            for v in values {
                dest.write_i8(*v)?;
            }
            Ok(())
        }
        NbtTag::String(v) => write_string(dest, v),
        NbtTag::List(list) => {
            let element_id = list.iter().next().map(tag_id).unwrap_or(TAG_END);
            dest.write_u8(element_id)?;
            write_len(dest, list.len())?;
            for element in list.iter() {
                if tag_id(element) != element_id {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "NBT list elements must share one type",
                    ));
                }
                write_tag_body(dest, element)?;
            }
            Ok(())
        }
        NbtTag::Compound(compound) => write_compound_body(dest, compound),
        NbtTag::IntArray(values) => {
            write_len(dest, values.len())?;
            for v in values {
                dest.write_i32::<LittleEndian>(*v)?;
            }
            Ok(())
        }
        NbtTag::LongArray(values) => {
            write_len(dest, values.len())?;
            for v in values {
                dest.write_i64::<LittleEndian>(*v)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_layout_is_little_endian() {
        let mut compound = NbtCompound::new();
        compound.insert("12", NbtTag::Int(7));
        let mut buf = Vec::new();
        write_compound(&mut buf, "", &compound).unwrap();
        assert_eq!(buf, vec![10, 0, 0, 3, 2, 0, b'1', b'2', 7, 0, 0, 0, 0]);
    }

    #[test]
    fn test_nested_compound_roundtrip() {
        let mut inner = NbtCompound::new();
        inner.insert("facing", NbtTag::String("north".to_string()));
        inner.insert("open", NbtTag::Byte(1));
        let mut root = NbtCompound::new();
        root.insert("id", NbtTag::String("Chest".to_string()));
        root.insert("x", NbtTag::Int(-12));
        root.insert("state", NbtTag::Compound(inner));
        root.insert(
            "Items",
            NbtTag::List(NbtList::from(vec![NbtTag::Short(3), NbtTag::Short(4)])),
        );
        root.insert("heights", NbtTag::LongArray(vec![1, -2, 3]));

        let mut buf = Vec::new();
        write_compound(&mut buf, "root", &root).unwrap();
        let (name, decoded) = read_compound(&mut buf.as_slice()).unwrap();
        assert_eq!(name, "root");
        assert_eq!(decoded, root);
    }

    #[test]
    fn test_truncated_input_is_error() {
        let mut compound = NbtCompound::new();
        compound.insert("name", NbtTag::String("minecraft:stone".to_string()));
        let mut buf = Vec::new();
        write_compound(&mut buf, "", &compound).unwrap();
        buf.truncate(buf.len() - 4);
        assert!(read_compound(&mut buf.as_slice()).is_err());
    }

    #[test]
    fn test_non_compound_root_rejected() {
        let data = [TAG_INT, 0, 0, 1, 0, 0, 0];
        assert!(matches!(
            read_compound(&mut &data[..]),
            Err(CodecError::MalformedNbt(_))
        ));
    }
}
