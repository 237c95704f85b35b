//! Little-endian primitives shared by every record codec.

use std::borrow::Cow;
use std::io::{Read, Write};

use crate::read::ReadError;

pub type Vec3 = [f32; 3];

pub struct ByteReader<'s> {
    buf: &'s [u8],
    pos: usize,
}

impl<'s> ByteReader<'s> {
    pub fn new(buf: &'s [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn take(&mut self, len: usize) -> Result<&'s [u8], ReadError> {
        if self.remaining() < len {
            return Err(ReadError::Truncated {
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], ReadError> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, ReadError> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16(&mut self) -> Result<u16, ReadError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> Result<u32, ReadError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn f32(&mut self) -> Result<f32, ReadError> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    pub fn vec2(&mut self) -> Result<[f32; 2], ReadError> {
        Ok([self.f32()?, self.f32()?])
    }

    pub fn vec3(&mut self) -> Result<Vec3, ReadError> {
        Ok([self.f32()?, self.f32()?, self.f32()?])
    }

    pub fn fixed_str<const N: usize>(&mut self) -> Result<FixedStr<N>, ReadError> {
        Ok(FixedStr(self.array()?))
    }

    /// Read `count` homogeneous records, failing before allocating if the
    /// buffer cannot possibly hold them.
    pub fn records<T: Record>(&mut self, count: usize) -> Result<Vec<T>, ReadError> {
        let needed = count.saturating_mul(T::ENCODED_LEN);
        if self.remaining() < needed {
            return Err(ReadError::Truncated {
                offset: self.pos,
                needed,
                available: self.remaining(),
            });
        }
        (0..count).map(|_| T::read(self)).collect()
    }
}

#[derive(Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn zeroes(&mut self, len: usize) {
        self.buf.resize(self.buf.len() + len, 0);
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn u16(&mut self, v: u16) {
        self.bytes(&v.to_le_bytes());
    }

    pub fn u32(&mut self, v: u32) {
        self.bytes(&v.to_le_bytes());
    }

    pub fn f32(&mut self, v: f32) {
        self.bytes(&v.to_le_bytes());
    }

    pub fn vec2(&mut self, v: [f32; 2]) {
        v.into_iter().for_each(|c| self.f32(c));
    }

    pub fn vec3(&mut self, v: Vec3) {
        v.into_iter().for_each(|c| self.f32(c));
    }

    pub fn fixed_str<const N: usize>(&mut self, s: &FixedStr<N>) {
        self.bytes(&s.0);
    }

    pub fn records<T: Record>(&mut self, records: &[T]) {
        records.iter().for_each(|r| r.write(self));
    }

    /// Overwrite an already written u32 at `offset`.
    pub fn patch_u32(&mut self, offset: usize, v: u32) {
        self.buf[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// A fixed-width on-disk record.
pub trait Record: Sized {
    const ENCODED_LEN: usize;

    fn read(r: &mut ByteReader<'_>) -> Result<Self, ReadError>;
    fn write(&self, w: &mut ByteWriter);
}

/// NUL-padded text field of exactly `N` bytes.
///
/// The raw bytes are kept as-is, so garbage after the terminator survives a
/// decode/encode cycle.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedStr<const N: usize>(pub [u8; N]);

impl<const N: usize> FixedStr<N> {
    /// Text up to the first NUL. Longer input is truncated to `N` bytes.
    pub fn new(text: &str) -> Self {
        let mut raw = [0; N];
        let len = text.len().min(N);
        raw[..len].copy_from_slice(&text.as_bytes()[..len]);
        Self(raw)
    }

    pub fn as_str(&self) -> Cow<'_, str> {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(N);
        String::from_utf8_lossy(&self.0[..end])
    }

    pub fn is_empty(&self) -> bool {
        self.0.first().is_none_or(|&b| b == 0)
    }
}

impl<const N: usize> Default for FixedStr<N> {
    fn default() -> Self {
        Self([0; N])
    }
}

impl<const N: usize> std::fmt::Debug for FixedStr<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl<const N: usize> From<&str> for FixedStr<N> {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl Record for Vec3 {
    const ENCODED_LEN: usize = 12;

    fn read(r: &mut ByteReader<'_>) -> Result<Self, ReadError> {
        r.vec3()
    }

    fn write(&self, w: &mut ByteWriter) {
        w.vec3(*self);
    }
}

pub fn read_to_vec(read: &mut dyn Read) -> std::io::Result<Vec<u8>> {
    let mut buf = vec![];
    read.read_to_end(&mut buf)?;
    Ok(buf)
}

pub fn write_all(write: &mut dyn Write, bytes: &[u8]) -> std::io::Result<()> {
    write.write_all(bytes)?;
    write.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_str_stops_at_nul() {
        let mut raw = [0u8; 8];
        raw[..3].copy_from_slice(b"abc");
        raw[4] = b'z';
        let s = FixedStr(raw);
        assert_eq!(s.as_str(), "abc");
        assert!(!s.is_empty());
        assert!(FixedStr::<8>::default().is_empty());
    }

    #[test]
    fn fixed_str_truncates_long_text() {
        let s = FixedStr::<4>::new("lionhead");
        assert_eq!(s.0, *b"lion");
        assert_eq!(s.as_str(), "lion");
    }

    #[test]
    fn reader_reports_truncation() {
        let mut r = ByteReader::new(&[1, 0, 0]);
        match r.u32() {
            Err(ReadError::Truncated { offset, needed, available }) => {
                assert_eq!((offset, needed, available), (0, 4, 3));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn scalars_are_little_endian() {
        let mut w = ByteWriter::new();
        w.u16(0x0102);
        w.u32(0x03040506);
        w.f32(1.0);
        let bytes = w.into_inner();
        assert_eq!(&bytes[..6], &[0x02, 0x01, 0x06, 0x05, 0x04, 0x03]);
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.u16().unwrap(), 0x0102);
        assert_eq!(r.u32().unwrap(), 0x03040506);
        assert_eq!(r.f32().unwrap(), 1.0);
        assert!(r.is_empty());
    }
}
