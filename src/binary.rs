//! LEB128 varints used by the network encoding.

use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Write unsigned VarInt (LEB128).
pub fn write_varuint32<W: Write>(dest: &mut W, mut value: u32) -> io::Result<()> {
    loop {
        if value & !0x7F == 0 {
            return dest.write_u8(value as u8);
        }
        dest.write_u8((value & 0x7F | 0x80) as u8)?;
        value >>= 7;
    }
}

/// Write signed VarInt (ZigZag + LEB128).
pub fn write_varint32<W: Write>(dest: &mut W, value: i32) -> io::Result<()> {
    let encoded = ((value << 1) ^ (value >> 31)) as u32;
    write_varuint32(dest, encoded)
}

pub fn read_varuint32<R: Read>(source: &mut R) -> io::Result<u32> {
    let mut value: u32 = 0;
    for shift in (0..35).step_by(7) {
        let b = source.read_u8()?;
        value |= ((b & 0x7F) as u32) << shift;
        if b & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(io::Error::new(io::ErrorKind::InvalidData, "varuint32 overflows 5 bytes"))
}

pub fn read_varint32<R: Read>(source: &mut R) -> io::Result<i32> {
    let raw = read_varuint32(source)?;
    Ok((raw >> 1) as i32 ^ -((raw & 1) as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zigzag(value: i32) -> Vec<u8> {
        let mut buf = Vec::new();
        write_varint32(&mut buf, value).unwrap();
        buf
    }

    #[test]
    fn test_zigzag_layout() {
        assert_eq!(zigzag(0), vec![0]);
        assert_eq!(zigzag(-1), vec![1]);
        assert_eq!(zigzag(1), vec![2]);
        assert_eq!(zigzag(64), vec![0x80, 0x01]);
        assert_eq!(zigzag(-2), vec![3]);
    }

    #[test]
    fn test_extremes_decode() {
        for value in [i32::MIN, i32::MAX, -2, 300, -300] {
            let buf = zigzag(value);
            assert_eq!(read_varint32(&mut buf.as_slice()).unwrap(), value);
        }
        let mut buf = Vec::new();
        write_varuint32(&mut buf, u32::MAX).unwrap();
        assert_eq!(buf.len(), 5);
        assert_eq!(read_varuint32(&mut buf.as_slice()).unwrap(), u32::MAX);
    }

    #[test]
    fn test_overlong_varint_rejected() {
        let data = [0xFFu8; 6];
        assert!(read_varuint32(&mut &data[..]).is_err());
    }
}
