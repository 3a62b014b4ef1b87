//! Little-endian packer/unpacker for gesture assets
//!
//! Field encodings:
//! - integers and floats: little-endian, fixed width
//! - strings: `u16` byte length followed by UTF-8 bytes, at most
//!   [`MAX_STRING_LEN`] bytes; longer strings are refused on pack
//! - UUIDs: 16 raw bytes

use std::io::{self, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use uuid::Uuid;

use super::types::{GestureError, GestureResult, MAX_STRING_LEN};

pub const U8_SIZE: usize = 1;
pub const U32_SIZE: usize = 4;
pub const F32_SIZE: usize = 4;
pub const UUID_SIZE: usize = 16;
/// Upper bound for a packed string, length prefix included
pub const MAX_STRING_SIZE: usize = 2 + MAX_STRING_LEN;

/// Writes gesture fields to any byte sink
pub struct Packer<W: Write> {
    out: W,
    written: usize,
}

impl<W: Write> Packer<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    /// Bytes written so far
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn pack_u8(&mut self, value: u8) -> io::Result<()> {
        self.out.write_u8(value)?;
        self.written += U8_SIZE;
        Ok(())
    }

    pub fn pack_u32(&mut self, value: u32) -> io::Result<()> {
        self.out.write_u32::<LittleEndian>(value)?;
        self.written += U32_SIZE;
        Ok(())
    }

    pub fn pack_f32(&mut self, value: f32) -> io::Result<()> {
        self.out.write_f32::<LittleEndian>(value)?;
        self.written += F32_SIZE;
        Ok(())
    }

    /// Nothing is written when `value` is over the string limit
    pub fn pack_string(&mut self, value: &str, what: &'static str) -> GestureResult<()> {
        if value.len() > MAX_STRING_LEN {
            return Err(GestureError::StringTooLong {
                field: what,
                len: value.len(),
            });
        }
        self.out.write_u16::<LittleEndian>(value.len() as u16)?;
        self.out.write_all(value.as_bytes())?;
        self.written += 2 + value.len();
        Ok(())
    }

    pub fn pack_uuid(&mut self, value: &Uuid) -> io::Result<()> {
        self.out.write_all(value.as_bytes())?;
        self.written += UUID_SIZE;
        Ok(())
    }
}

/// Reads gesture fields from a byte slice, reporting failures with the byte
/// offset and the field being read.
pub struct Unpacker<'a> {
    rest: &'a [u8],
    total: usize,
}

impl<'a> Unpacker<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            rest: data,
            total: data.len(),
        }
    }

    /// Offset of the next unread byte
    pub fn offset(&self) -> usize {
        self.total - self.rest.len()
    }

    pub fn remaining(&self) -> usize {
        self.rest.len()
    }

    pub fn malformed(&self, reason: impl Into<String>) -> GestureError {
        GestureError::MalformedAsset {
            offset: self.offset(),
            reason: reason.into(),
        }
    }

    fn truncated(&self, what: &str) -> GestureError {
        self.malformed(format!("truncated while reading {}", what))
    }

    pub fn unpack_u8(&mut self, what: &str) -> GestureResult<u8> {
        self.rest.read_u8().map_err(|_| self.truncated(what))
    }

    pub fn unpack_u32(&mut self, what: &str) -> GestureResult<u32> {
        if self.rest.len() < U32_SIZE {
            return Err(self.truncated(what));
        }
        self.rest
            .read_u32::<LittleEndian>()
            .map_err(|_| self.truncated(what))
    }

    pub fn unpack_f32(&mut self, what: &str) -> GestureResult<f32> {
        if self.rest.len() < F32_SIZE {
            return Err(self.truncated(what));
        }
        self.rest
            .read_f32::<LittleEndian>()
            .map_err(|_| self.truncated(what))
    }

    pub fn unpack_string(&mut self, what: &str) -> GestureResult<String> {
        if self.rest.len() < 2 {
            return Err(self.truncated(what));
        }
        let len = self
            .rest
            .read_u16::<LittleEndian>()
            .map_err(|_| self.truncated(what))? as usize;
        if len > MAX_STRING_LEN {
            return Err(self.malformed(format!(
                "{} is {} bytes long (max {})",
                what, len, MAX_STRING_LEN
            )));
        }
        if self.rest.len() < len {
            return Err(self.truncated(what));
        }
        let (bytes, rest) = self.rest.split_at(len);
        let text = std::str::from_utf8(bytes)
            .map_err(|_| self.malformed(format!("{} is not valid UTF-8", what)))?
            .to_string();
        self.rest = rest;
        Ok(text)
    }

    pub fn unpack_uuid(&mut self, what: &str) -> GestureResult<Uuid> {
        if self.rest.len() < UUID_SIZE {
            return Err(self.truncated(what));
        }
        let (bytes, rest) = self.rest.split_at(UUID_SIZE);
        let id = Uuid::from_slice(bytes).map_err(|_| self.malformed(format!("bad {}", what)))?;
        self.rest = rest;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_layout() {
        let mut packer = Packer::new(Vec::new());
        packer.pack_u32(0x0403_0201).unwrap();
        packer.pack_u8(9).unwrap();
        packer.pack_string("hi", "trigger").unwrap();
        assert_eq!(packer.written(), 4 + 1 + 2 + 2);
        assert_eq!(packer.into_inner(), vec![1, 2, 3, 4, 9, 2, 0, b'h', b'i']);
    }

    #[test]
    fn test_unpack_fields() {
        let id = Uuid::from_u128(0x1234);
        let mut packer = Packer::new(Vec::new());
        packer.pack_f32(1.5).unwrap();
        packer.pack_uuid(&id).unwrap();
        packer.pack_string("wave", "name").unwrap();
        let bytes = packer.into_inner();

        let mut unpacker = Unpacker::new(&bytes);
        assert_eq!(unpacker.unpack_f32("seconds").unwrap(), 1.5);
        assert_eq!(unpacker.unpack_uuid("asset id").unwrap(), id);
        assert_eq!(unpacker.unpack_string("name").unwrap(), "wave");
        assert_eq!(unpacker.remaining(), 0);
        assert_eq!(unpacker.offset(), bytes.len());
    }

    #[test]
    fn test_long_string_refused() {
        let mut packer = Packer::new(Vec::new());
        packer.pack_string(&"a".repeat(MAX_STRING_LEN), "name").unwrap();
        assert_eq!(packer.written(), MAX_STRING_SIZE);

        // 'é' is two bytes; 128 of them overshoot by one
        let err = packer.pack_string(&"é".repeat(128), "chat text").unwrap_err();
        assert!(matches!(
            err,
            GestureError::StringTooLong {
                field: "chat text",
                len: 256
            }
        ));
        assert_eq!(packer.written(), MAX_STRING_SIZE);
        assert_eq!(packer.into_inner().len(), MAX_STRING_SIZE);
    }

    #[test]
    fn test_truncated_u32() {
        let mut unpacker = Unpacker::new(&[1, 2]);
        let err = unpacker.unpack_u32("step type").unwrap_err();
        assert!(matches!(err, GestureError::MalformedAsset { offset: 0, .. }));
        assert!(err.to_string().contains("step type"));
    }

    #[test]
    fn test_truncated_string_body() {
        let mut unpacker = Unpacker::new(&[5, 0, b'a', b'b']);
        assert!(unpacker.unpack_string("trigger").is_err());
    }

    #[test]
    fn test_oversized_string_rejected() {
        let mut data = vec![0xFF, 0x01];
        data.extend(std::iter::repeat(b'a').take(511));
        let mut unpacker = Unpacker::new(&data);
        let err = unpacker.unpack_string("chat text").unwrap_err();
        assert!(err.to_string().contains("max 255"));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let mut unpacker = Unpacker::new(&[2, 0, 0xC3, 0x28]);
        let err = unpacker.unpack_string("name").unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn test_truncated_uuid() {
        let mut unpacker = Unpacker::new(&[0u8; 15]);
        assert!(unpacker.unpack_uuid("asset id").is_err());
    }
}
