//! Big-endian read cursor.

use crate::error::{DecodeError, DecodeResult};

/// Read cursor over a byte slice. All reads are big-endian.
///
/// Seeks are unchecked; the next read reports [`DecodeError::OutOfBounds`]
/// if the position has left the buffer.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current byte position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total length of the underlying data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Bytes left between the position and the end of the data.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Seek to an absolute position.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Move forward `n` bytes without reading them.
    pub fn skip(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n);
    }

    /// A second cursor over the same data, positioned at `pos`.
    #[must_use]
    pub fn at(&self, pos: usize) -> Self {
        Self {
            data: self.data,
            pos,
        }
    }

    pub fn read_bytes(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read a 4-byte chunk tag.
    pub fn read_tag(&mut self) -> DecodeResult<[u8; 4]> {
        self.read_array()
    }

    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> DecodeResult<i8> {
        Ok(i8::from_be_bytes(self.read_array()?))
    }

    pub fn read_u16(&mut self) -> DecodeResult<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> DecodeResult<i16> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> DecodeResult<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> DecodeResult<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> DecodeResult<f32> {
        Ok(f32::from_be_bytes(self.read_array()?))
    }

    /// Read three consecutive floats.
    pub fn read_vec3(&mut self) -> DecodeResult<glam::Vec3> {
        Ok(glam::Vec3::new(
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        ))
    }

    /// Read `count` items with `read`.
    pub fn read_n<T>(
        &mut self,
        count: usize,
        mut read: impl FnMut(&mut Self) -> DecodeResult<T>,
    ) -> DecodeResult<Vec<T>> {
        // Cap the preallocation so a corrupt count fails on the read, not the allocation.
        let mut items = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            items.push(read(self)?);
        }
        Ok(items)
    }

    /// Read a fixed-length string. Bytes are taken as Latin-1.
    pub fn read_fixed_string(&mut self, len: usize) -> DecodeResult<String> {
        Ok(self.read_bytes(len)?.iter().map(|&b| b as char).collect())
    }

    /// Read bytes up to and including a NUL terminator.
    pub fn read_cstring(&mut self) -> DecodeResult<String> {
        let start = self.pos;
        let tail = self.data.get(start..).unwrap_or_default();
        let Some(len) = tail.iter().position(|&b| b == 0) else {
            return Err(DecodeError::OutOfBounds {
                offset: start,
                need: tail.len() + 1,
                len: self.data.len(),
            });
        };
        let bytes = self.read_bytes(len)?;
        self.pos += 1;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn ensure(&self, n: usize) -> DecodeResult<()> {
        match self.pos.checked_add(n) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(DecodeError::OutOfBounds {
                offset: self.pos,
                need: n,
                len: self.data.len(),
            }),
        }
    }
}

/// Big-endian byte buffer builder for synthetic test inputs.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct Writer {
    buf: Vec<u8>,
}

#[cfg(test)]
impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.bytes(&v.to_be_bytes())
    }

    pub fn i16(&mut self, v: i16) -> &mut Self {
        self.bytes(&v.to_be_bytes())
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.bytes(&v.to_be_bytes())
    }

    pub fn f32(&mut self, v: f32) -> &mut Self {
        self.bytes(&v.to_be_bytes())
    }

    /// Zero-fill up to an absolute position.
    pub fn pad_to(&mut self, pos: usize) -> &mut Self {
        if self.buf.len() < pos {
            self.buf.resize(pos, 0);
        }
        self
    }

    pub fn patch_u32(&mut self, pos: usize, v: u32) {
        self.buf[pos..pos + 4].copy_from_slice(&v.to_be_bytes());
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn reads_big_endian() {
        let data = [
            0x12, 0x34, 0xff, 0xfe, 0x3f, 0x80, 0x00, 0x00, 0x80, 0x00, 0x00, 0x01,
        ];
        let mut c = ByteCursor::new(&data);
        assert_eq!(c.read_u16().unwrap(), 0x1234);
        assert_eq!(c.read_i16().unwrap(), -2);
        assert!((c.read_f32().unwrap() - 1.0).abs() < f32::EPSILON);
        assert_eq!(c.read_i32().unwrap(), i32::MIN + 1);
        assert!(c.is_empty());
    }

    #[test]
    fn out_of_bounds_reports_offset() {
        let data = [0u8; 3];
        let mut c = ByteCursor::new(&data);
        c.read_u16().unwrap();
        let err = c.read_u16().unwrap_err();
        assert!(matches!(
            err,
            DecodeError::OutOfBounds {
                offset: 2,
                need: 2,
                len: 3
            }
        ));
        // A failed read does not move the cursor.
        assert_eq!(c.position(), 2);
        assert_eq!(c.read_u8().unwrap(), 0);
    }

    #[test]
    fn seek_is_unchecked_until_read() {
        let data = [1u8, 2, 3];
        let mut c = ByteCursor::new(&data);
        c.seek(100);
        assert_eq!(c.position(), 100);
        assert!(c.read_u8().is_err());
        c.seek(2);
        assert_eq!(c.read_u8().unwrap(), 3);
    }

    #[test]
    fn strings() {
        let data = b"INF1abc\0rest";
        let mut c = ByteCursor::new(data);
        assert_eq!(c.read_fixed_string(4).unwrap(), "INF1");
        assert_eq!(c.read_cstring().unwrap(), "abc");
        assert_eq!(c.position(), 8);
        // No terminator before the end.
        assert!(c.read_cstring().is_err());
    }

    #[test]
    fn read_n_collects_in_order() {
        let data = [0, 1, 0, 2, 0, 3];
        let mut c = ByteCursor::new(&data);
        assert_eq!(c.read_n(3, ByteCursor::read_u16).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn writer_round_trips_through_cursor() {
        let mut w = Writer::new();
        w.u8(7).u16(0xbeef).u32(0).f32(2.5).pad_to(16);
        w.patch_u32(3, 0xdead_beef);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 16);
        let mut c = ByteCursor::new(&bytes);
        assert_eq!(c.read_u8().unwrap(), 7);
        assert_eq!(c.read_u16().unwrap(), 0xbeef);
        assert_eq!(c.read_u32().unwrap(), 0xdead_beef);
        assert!((c.read_f32().unwrap() - 2.5).abs() < f32::EPSILON);
    }

    proptest! {
        #[test]
        fn reads_never_pass_the_end(len in 0usize..64, pos in 0usize..80, width in 1usize..8) {
            let data = vec![0xaau8; len];
            let mut c = ByteCursor::new(&data);
            c.seek(pos);
            let result = c.read_bytes(width);
            prop_assert_eq!(result.is_ok(), pos + width <= len);
        }
    }
}
