//! Binary reader for zero-copy parsing of byte slices.
//!
//! This module provides [`BinaryReader`], a cursor-like type that efficiently
//! reads binary data from a byte slice without copying. All multi-byte reads
//! are little-endian, matching the on-disk layout of every format in this
//! workspace.

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use zerocopy::FromBytes;

use crate::{Error, Result};

/// A binary reader that provides zero-copy reading from a byte slice.
///
/// Maintains a cursor position and reads data without copying where possible.
/// Reading past the end of the buffer is a hard error, never a silent
/// truncation - codecs that need to detect an optional trailing section
/// compare [`position`](Self::position) against [`len`](Self::len) instead
/// of probing with a read.
///
/// # Example
///
/// ```
/// use riftfile_common::BinaryReader;
///
/// let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
/// let mut reader = BinaryReader::new(&data);
///
/// assert_eq!(reader.read_u32().unwrap(), 0x04030201);
/// assert_eq!(reader.read_u32().unwrap(), 0x08070605);
/// assert!(reader.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BinaryReader<'a> {
    /// Create a new reader from a byte slice.
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Create a new reader starting at a specific position.
    #[inline]
    pub const fn new_at(data: &'a [u8], position: usize) -> Self {
        Self { data, position }
    }

    /// Get the current position in the buffer.
    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Get the total length of the underlying buffer.
    #[inline]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Get the number of bytes remaining to read.
    #[inline]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Check if there are no more bytes to read.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Seek to an absolute position.
    #[inline]
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    /// Advance the position by a number of bytes.
    #[inline]
    pub fn advance(&mut self, count: usize) {
        self.position = self.position.saturating_add(count);
    }

    /// Get the full underlying buffer regardless of cursor position.
    #[inline]
    pub const fn raw(&self) -> &'a [u8] {
        self.data
    }

    /// Peek at bytes without advancing the position.
    #[inline]
    pub fn peek_bytes(&self, count: usize) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(Error::UnexpectedEof {
                needed: count,
                available: self.remaining(),
            });
        }
        Ok(&self.data[self.position..self.position + count])
    }

    /// Peek at a u32 without advancing.
    #[inline]
    pub fn peek_u32(&self) -> Result<u32> {
        let bytes = self.peek_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read bytes and advance the position.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let bytes = self.peek_bytes(count)?;
        self.position += count;
        Ok(bytes)
    }

    /// Read a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_bytes(1).map(|b| b[0])
    }

    /// Read a signed byte.
    #[inline]
    pub fn read_i8(&mut self) -> Result<i8> {
        self.read_u8().map(|b| b as i8)
    }

    /// Read a boolean (non-zero = true).
    #[inline]
    pub fn read_bool(&mut self) -> Result<bool> {
        self.read_u8().map(|b| b != 0)
    }

    /// Read a little-endian u16.
    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Read a little-endian i16.
    #[inline]
    pub fn read_i16(&mut self) -> Result<i16> {
        let bytes = self.read_bytes(2)?;
        Ok(i16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Read a little-endian u32.
    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a little-endian i32.
    #[inline]
    pub fn read_i32(&mut self) -> Result<i32> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a little-endian f32.
    #[inline]
    pub fn read_f32(&mut self) -> Result<f32> {
        let bytes = self.read_bytes(4)?;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read `count` consecutive u16 values.
    pub fn read_u16_array(&mut self, count: usize) -> Result<Vec<u16>> {
        let bytes = self.read_bytes(count * 2)?;
        Ok(bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect())
    }

    /// Read `count` consecutive u32 values.
    pub fn read_u32_array(&mut self, count: usize) -> Result<Vec<u32>> {
        let bytes = self.read_bytes(count * 4)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Read `count` consecutive f32 values.
    pub fn read_f32_array(&mut self, count: usize) -> Result<Vec<f32>> {
        let bytes = self.read_bytes(count * 4)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Read two f32 values as a [`Vec2`].
    #[inline]
    pub fn read_vec2(&mut self) -> Result<Vec2> {
        Ok(Vec2::new(self.read_f32()?, self.read_f32()?))
    }

    /// Read three f32 values as a [`Vec3`].
    #[inline]
    pub fn read_vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    /// Read four f32 values as a [`Vec4`].
    #[inline]
    pub fn read_vec4(&mut self) -> Result<Vec4> {
        Ok(Vec4::new(
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        ))
    }

    /// Read `count` consecutive [`Vec3`] values.
    pub fn read_vec3_array(&mut self, count: usize) -> Result<Vec<Vec3>> {
        let floats = self.read_f32_array(count * 3)?;
        Ok(floats
            .chunks_exact(3)
            .map(|c| Vec3::new(c[0], c[1], c[2]))
            .collect())
    }

    /// Read four f32 values (x, y, z, w order) as a [`Quat`].
    #[inline]
    pub fn read_quat(&mut self) -> Result<Quat> {
        Ok(Quat::from_xyzw(
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        ))
    }

    /// Read 16 f32 values stored row-major on disk as a [`Mat4`].
    pub fn read_mtx4(&mut self) -> Result<Mat4> {
        let floats = self.read_f32_array(16)?;
        let mut array = [0.0f32; 16];
        array.copy_from_slice(&floats);
        // On-disk rows become glam columns, so transpose after loading.
        Ok(Mat4::from_cols_array(&array).transpose())
    }

    /// Read a null-terminated string (exclusive of the terminator).
    pub fn read_cstring(&mut self) -> Result<&'a str> {
        let start = self.position;
        let remaining = &self.data[self.position.min(self.data.len())..];

        let null_pos =
            memchr::memchr(0, remaining).ok_or(Error::MissingNullTerminator)?;

        let string_bytes = &remaining[..null_pos];
        self.position = start + null_pos + 1; // Skip the null terminator

        std::str::from_utf8(string_bytes).map_err(Error::Utf8)
    }

    /// Read a raw string of a specific length, without trimming.
    pub fn read_string(&mut self, length: usize) -> Result<&'a str> {
        let bytes = self.read_bytes(length)?;
        std::str::from_utf8(bytes).map_err(Error::Utf8)
    }

    /// Read a u32 length prefix followed by that many bytes, decoded as
    /// UTF-8 with invalid sequences replaced.
    pub fn read_sized_string(&mut self) -> Result<String> {
        let length = self.read_u32()? as usize;
        let bytes = self.read_bytes(length)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a string from a fixed-size null-padded buffer, trimming
    /// everything from the first null onward.
    pub fn read_padded_string(&mut self, width: usize) -> Result<String> {
        let bytes = self.read_bytes(width)?;
        let null_pos = memchr::memchr(0, bytes).unwrap_or(width);
        Ok(String::from_utf8_lossy(&bytes[..null_pos]).into_owned())
    }

    /// Read a struct using zerocopy.
    ///
    /// The struct must implement `FromBytes` from the zerocopy crate.
    #[inline]
    pub fn read_struct<T: FromBytes>(&mut self) -> Result<T> {
        let size = std::mem::size_of::<T>();
        let bytes = self.read_bytes(size)?;
        T::read_from_bytes(bytes).map_err(|_| Error::UnexpectedEof {
            needed: size,
            available: bytes.len(),
        })
    }

    /// Expect specific magic bytes.
    pub fn expect_magic(&mut self, expected: &[u8]) -> Result<()> {
        let actual = self.read_bytes(expected.len())?;
        if actual != expected {
            return Err(Error::InvalidMagic {
                expected: expected.to_vec(),
                actual: actual.to_vec(),
            });
        }
        Ok(())
    }

    /// Resolve an i32 offset field stored relative to its own position.
    ///
    /// Reads the field, then computes `field_position + stored`. The cursor
    /// ends up 4 bytes past the field as usual; callers that jump to the
    /// resolved position are responsible for seeking back.
    pub fn read_relative_offset(&mut self) -> Result<usize> {
        let field_position = self.position;
        let stored = self.read_i32()?;
        let resolved = field_position as i64 + stored as i64;
        if resolved < 0 || resolved as usize > self.data.len() {
            return Err(Error::InconsistentOffset {
                field_position,
                stored,
                resolved,
                len: self.data.len(),
            });
        }
        Ok(resolved as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_primitives() {
        let data = [
            0x01u8, 0x02, 0x03, 0x04, // u32: 0x04030201
            0xFF, 0xFF, 0xFF, 0xFF, // u32: 0xFFFFFFFF
        ];
        let mut reader = BinaryReader::new(&data);

        assert_eq!(reader.read_u32().unwrap(), 0x04030201);
        assert_eq!(reader.read_u32().unwrap(), 0xFFFFFFFF);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_read_cstring() {
        let data = b"hello\0world\0";
        let mut reader = BinaryReader::new(data);

        assert_eq!(reader.read_cstring().unwrap(), "hello");
        assert_eq!(reader.read_cstring().unwrap(), "world");
    }

    #[test]
    fn test_read_padded_string() {
        let data = b"ROOT\0\0\0\0";
        let mut reader = BinaryReader::new(data);

        assert_eq!(reader.read_padded_string(8).unwrap(), "ROOT");
        assert!(reader.is_empty());
    }

    #[test]
    fn test_read_sized_string() {
        let mut data = vec![5u8, 0, 0, 0];
        data.extend_from_slice(b"rift!");
        let mut reader = BinaryReader::new(&data);

        assert_eq!(reader.read_sized_string().unwrap(), "rift!");
    }

    #[test]
    fn test_peek_does_not_advance() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let reader = BinaryReader::new(&data);

        assert_eq!(reader.peek_u32().unwrap(), 0x04030201);
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_eof_error() {
        let data = [0x01, 0x02];
        let mut reader = BinaryReader::new(&data);

        assert!(matches!(
            reader.read_u32(),
            Err(Error::UnexpectedEof {
                needed: 4,
                available: 2
            })
        ));
    }

    #[test]
    fn test_relative_offset_resolves_from_field_position() {
        // Field at position 4 stores 8, so the target is byte 12.
        let mut data = vec![0u8; 16];
        data[4..8].copy_from_slice(&8i32.to_le_bytes());
        let mut reader = BinaryReader::new_at(&data, 4);

        assert_eq!(reader.read_relative_offset().unwrap(), 12);
        assert_eq!(reader.position(), 8);
    }

    #[test]
    fn test_relative_offset_out_of_bounds() {
        let mut data = vec![0u8; 8];
        data[0..4].copy_from_slice(&100i32.to_le_bytes());
        let mut reader = BinaryReader::new(&data);

        assert!(matches!(
            reader.read_relative_offset(),
            Err(Error::InconsistentOffset { stored: 100, .. })
        ));
    }

    #[test]
    fn test_read_mtx4_row_major() {
        let mut data = Vec::new();
        for v in 0..16 {
            data.extend_from_slice(&(v as f32).to_le_bytes());
        }
        let mut reader = BinaryReader::new(&data);
        let m = reader.read_mtx4().unwrap();

        // First on-disk row is (0, 1, 2, 3): row 0 of the matrix.
        assert_eq!(m.row(0), glam::Vec4::new(0.0, 1.0, 2.0, 3.0));
        assert_eq!(m.row(3), glam::Vec4::new(12.0, 13.0, 14.0, 15.0));
    }
}
