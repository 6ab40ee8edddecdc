//! Binary writer with seek-and-patch support.
//!
//! The offset-heavy formats in this workspace are written in two passes:
//! fixed-size records first with placeholder offsets, then the variable
//! length data, then a seek back to patch each offset once the final layout
//! is known. [`BinaryWriter`] supports this directly via [`seek`]
//! (BinaryWriter::seek) and the `patch_*_at` helpers.

use std::io::{Cursor, Seek, SeekFrom, Write};

use byteorder::{WriteBytesExt, LE};
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

use crate::Result;

/// A cursor-based little-endian binary writer over a growable buffer.
///
/// Writing past the current end grows the buffer; seeking backward and
/// writing overwrites in place, which is how placeholder offsets get
/// backfilled.
#[derive(Debug, Default)]
pub struct BinaryWriter {
    cursor: Cursor<Vec<u8>>,
}

impl BinaryWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current write position.
    #[inline]
    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    /// Seek to an absolute position.
    #[inline]
    pub fn seek(&mut self, position: usize) {
        self.cursor.set_position(position as u64);
    }

    /// Total bytes written so far (independent of cursor position).
    #[inline]
    pub fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    /// Check whether nothing has been written yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }

    /// Consume the writer, returning the full buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.cursor.into_inner()
    }

    /// Borrow the buffer written so far.
    pub fn as_bytes(&self) -> &[u8] {
        self.cursor.get_ref()
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.cursor.write_all(bytes)?;
        Ok(())
    }

    /// Write `count` zero bytes.
    pub fn pad(&mut self, count: usize) -> Result<()> {
        const ZEROS: [u8; 32] = [0u8; 32];
        let mut remaining = count;
        while remaining > 0 {
            let chunk = remaining.min(ZEROS.len());
            self.cursor.write_all(&ZEROS[..chunk])?;
            remaining -= chunk;
        }
        Ok(())
    }

    /// Write a u8.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.cursor.write_u8(value)?;
        Ok(())
    }

    /// Write a bool as a single byte.
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(value as u8)
    }

    /// Write a little-endian u16.
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.cursor.write_u16::<LE>(value)?;
        Ok(())
    }

    /// Write a little-endian i16.
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.cursor.write_i16::<LE>(value)?;
        Ok(())
    }

    /// Write a little-endian u32.
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.cursor.write_u32::<LE>(value)?;
        Ok(())
    }

    /// Write a little-endian i32.
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.cursor.write_i32::<LE>(value)?;
        Ok(())
    }

    /// Write a little-endian f32.
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.cursor.write_f32::<LE>(value)?;
        Ok(())
    }

    /// Write a [`Vec2`] as two f32 values.
    pub fn write_vec2(&mut self, value: Vec2) -> Result<()> {
        self.write_f32(value.x)?;
        self.write_f32(value.y)
    }

    /// Write a [`Vec3`] as three f32 values.
    pub fn write_vec3(&mut self, value: Vec3) -> Result<()> {
        self.write_f32(value.x)?;
        self.write_f32(value.y)?;
        self.write_f32(value.z)
    }

    /// Write a [`Vec4`] as four f32 values.
    pub fn write_vec4(&mut self, value: Vec4) -> Result<()> {
        self.write_f32(value.x)?;
        self.write_f32(value.y)?;
        self.write_f32(value.z)?;
        self.write_f32(value.w)
    }

    /// Write a [`Quat`] as four f32 values in x, y, z, w order.
    pub fn write_quat(&mut self, value: Quat) -> Result<()> {
        self.write_f32(value.x)?;
        self.write_f32(value.y)?;
        self.write_f32(value.z)?;
        self.write_f32(value.w)
    }

    /// Write a [`Mat4`] as 16 f32 values in row-major order.
    pub fn write_mtx4(&mut self, value: &Mat4) -> Result<()> {
        for v in value.transpose().to_cols_array() {
            self.write_f32(v)?;
        }
        Ok(())
    }

    /// Write a u32 length prefix followed by the string bytes.
    pub fn write_sized_string(&mut self, value: &str) -> Result<()> {
        self.write_u32(value.len() as u32)?;
        self.write_bytes(value.as_bytes())
    }

    /// Write a string followed by a null terminator.
    pub fn write_cstring(&mut self, value: &str) -> Result<()> {
        self.write_bytes(value.as_bytes())?;
        self.write_u8(0)
    }

    /// Write a string into a fixed-width null-padded field.
    ///
    /// Strings longer than `width - 1` are truncated so the field always
    /// keeps at least one null byte.
    pub fn write_padded_string(&mut self, value: &str, width: usize) -> Result<()> {
        let bytes = value.as_bytes();
        let take = bytes.len().min(width.saturating_sub(1));
        self.write_bytes(&bytes[..take])?;
        self.pad(width - take)
    }

    /// Overwrite a u32 at an earlier position, preserving the cursor.
    pub fn patch_u32_at(&mut self, position: usize, value: u32) -> Result<()> {
        let saved = self.cursor.position();
        self.cursor.seek(SeekFrom::Start(position as u64))?;
        self.cursor.write_u32::<LE>(value)?;
        self.cursor.set_position(saved);
        Ok(())
    }

    /// Overwrite an i32 at an earlier position, preserving the cursor.
    pub fn patch_i32_at(&mut self, position: usize, value: i32) -> Result<()> {
        let saved = self.cursor.position();
        self.cursor.seek(SeekFrom::Start(position as u64))?;
        self.cursor.write_i32::<LE>(value)?;
        self.cursor.set_position(saved);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BinaryReader;

    #[test]
    fn test_write_then_read_primitives() {
        let mut w = BinaryWriter::new();
        w.write_u32(0xDEADBEEF).unwrap();
        w.write_i16(-7).unwrap();
        w.write_f32(1.5).unwrap();

        let bytes = w.into_bytes();
        let mut r = BinaryReader::new(&bytes);
        assert_eq!(r.read_u32().unwrap(), 0xDEADBEEF);
        assert_eq!(r.read_i16().unwrap(), -7);
        assert_eq!(r.read_f32().unwrap(), 1.5);
    }

    #[test]
    fn test_patch_u32_preserves_cursor() {
        let mut w = BinaryWriter::new();
        w.write_u32(0).unwrap(); // placeholder
        w.write_u32(42).unwrap();
        w.patch_u32_at(0, 0x1234).unwrap();
        assert_eq!(w.position(), 8);

        let bytes = w.into_bytes();
        let mut r = BinaryReader::new(&bytes);
        assert_eq!(r.read_u32().unwrap(), 0x1234);
        assert_eq!(r.read_u32().unwrap(), 42);
    }

    #[test]
    fn test_padded_string_always_terminated() {
        let mut w = BinaryWriter::new();
        w.write_padded_string("a_very_long_joint_name", 8).unwrap();
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 8);
        assert_eq!(bytes[7], 0);

        let mut r = BinaryReader::new(&bytes);
        assert_eq!(r.read_padded_string(8).unwrap(), "a_very_");
    }

    #[test]
    fn test_mtx4_round_trip() {
        let m = Mat4::from_cols_array(&[
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, //
            9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0,
        ]);
        let mut w = BinaryWriter::new();
        w.write_mtx4(&m).unwrap();
        let bytes = w.into_bytes();
        let mut r = BinaryReader::new(&bytes);
        assert_eq!(r.read_mtx4().unwrap(), m);
    }
}
