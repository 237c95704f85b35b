//! Self-describing vertex layout records.
//!
//! Every stride is a 0x88-byte record: a `u32` attribute count, that many
//! `(kind, size class)` pairs, then a reserved tail filling the remainder.
//! Stride 0 lays out the base vertex array. SKIN models follow it with one
//! single-attribute stride per bone-index / bone-weight channel.

use crate::io::{ByteReader, ByteWriter, Record};
use crate::read::ReadError;

pub const STRIDE_RECORD_LEN: usize = 0x88;
/// Most attribute pairs a single stride record has room for.
pub const MAX_ATTRIBUTES: usize = (STRIDE_RECORD_LEN - 4) / 8;
pub const SKIN_CHANNELS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Position,
    Uv,
    Normal,
    BoneIndex,
    BoneWeight,
    Other(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeClass {
    Float,
    Tuple,
    Point3D,
    Byte,
    Other(u32),
}

impl AttributeKind {
    pub const fn raw(self) -> u32 {
        match self {
            Self::Position => 0,
            Self::Uv => 1,
            Self::Normal => 2,
            Self::BoneIndex => 3,
            Self::BoneWeight => 4,
            Self::Other(v) => v,
        }
    }

    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Position,
            1 => Self::Uv,
            2 => Self::Normal,
            3 => Self::BoneIndex,
            4 => Self::BoneWeight,
            v => Self::Other(v),
        }
    }
}

impl SizeClass {
    pub const fn raw(self) -> u32 {
        match self {
            Self::Float => 0,
            Self::Tuple => 1,
            Self::Point3D => 2,
            Self::Byte => 3,
            Self::Other(v) => v,
        }
    }

    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Float,
            1 => Self::Tuple,
            2 => Self::Point3D,
            3 => Self::Byte,
            v => Self::Other(v),
        }
    }

    /// Returns the byte size of one attribute of this class.
    pub const fn size(self) -> Option<usize> {
        match self {
            Self::Float => Some(4),
            Self::Tuple => Some(8),
            Self::Point3D => Some(12),
            Self::Byte => Some(1),
            Self::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub kind: AttributeKind,
    pub size: SizeClass,
}

impl Attribute {
    pub const fn new(kind: AttributeKind, size: SizeClass) -> Self {
        Self { kind, size }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stride {
    pub attributes: Vec<Attribute>,
    /// Tail bytes after the attribute pairs, kept for byte-exact output.
    pub reserved: Vec<u8>,
}

impl Stride {
    pub fn new(attributes: Vec<Attribute>) -> Self {
        let reserved = vec![0; Self::reserved_len(attributes.len())];
        Self { attributes, reserved }
    }

    /// Length of the reserved tail after `count` attribute pairs. Zero once
    /// the pairs fill the record; [`crate::Model::validate`] rejects strides
    /// with more than [`MAX_ATTRIBUTES`].
    pub const fn reserved_len(count: usize) -> usize {
        STRIDE_RECORD_LEN.saturating_sub(4 + 8 * count)
    }

    /// Layout of the base vertex array.
    pub fn base(has_normal: bool, uv_count: usize) -> Self {
        let mut attributes = vec![Attribute::new(AttributeKind::Position, SizeClass::Point3D)];
        if has_normal {
            attributes.push(Attribute::new(AttributeKind::Normal, SizeClass::Point3D));
        }
        attributes.extend(
            std::iter::repeat_n(Attribute::new(AttributeKind::Uv, SizeClass::Tuple), uv_count),
        );
        Self::new(attributes)
    }

    /// The eight single-channel strides describing a skin's bone table.
    pub fn skin_channels() -> Vec<Self> {
        let index = Attribute::new(AttributeKind::BoneIndex, SizeClass::Byte);
        let weight = Attribute::new(AttributeKind::BoneWeight, SizeClass::Float);
        std::iter::repeat_n(index, SKIN_CHANNELS)
            .chain(std::iter::repeat_n(weight, SKIN_CHANNELS))
            .map(|a| Self::new(vec![a]))
            .collect()
    }

    /// Bytes per vertex covered by this stride.
    pub fn width(&self) -> usize {
        self.attributes.iter().filter_map(|a| a.size.size()).sum()
    }
}

impl Record for Stride {
    const ENCODED_LEN: usize = STRIDE_RECORD_LEN;

    fn read(r: &mut ByteReader<'_>) -> Result<Self, ReadError> {
        let start = r.position();
        let count = r.u32()? as usize;
        if count > MAX_ATTRIBUTES {
            return Err(ReadError::InvalidStride {
                offset: start,
                reason: format!("{count} attributes do not fit in a stride record"),
            });
        }
        let mut attributes = Vec::with_capacity(count);
        for _ in 0..count {
            let kind = AttributeKind::from_raw(r.u32()?);
            let size = SizeClass::from_raw(r.u32()?);
            if size.size().is_none() {
                return Err(ReadError::InvalidStride {
                    offset: start,
                    reason: format!("unknown size class {}", size.raw()),
                });
            }
            attributes.push(Attribute { kind, size });
        }
        let reserved = r.take(Self::reserved_len(count))?.to_vec();
        Ok(Self { attributes, reserved })
    }

    fn write(&self, w: &mut ByteWriter) {
        w.u32(self.attributes.len() as u32);
        for a in self.attributes.iter() {
            w.u32(a.kind.raw());
            w.u32(a.size.raw());
        }
        let reserved_len = Self::reserved_len(self.attributes.len());
        let kept = self.reserved.len().min(reserved_len);
        w.bytes(&self.reserved[..kept]);
        w.zeroes(reserved_len - kept);
    }
}

pub fn parse_stride(buf: &[u8]) -> Result<Stride, ReadError> {
    Stride::read(&mut ByteReader::new(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_stride_width() {
        assert_eq!(Stride::base(true, 1).width(), 32);
        assert_eq!(Stride::base(false, 0).width(), 12);
        assert_eq!(Stride::base(true, 3).width(), 48);
    }

    #[test]
    fn record_is_always_0x88() {
        for stride in [Stride::base(true, 2), Stride::new(vec![])] {
            let mut w = ByteWriter::new();
            stride.write(&mut w);
            assert_eq!(w.len(), STRIDE_RECORD_LEN);
            let back = parse_stride(&w.into_inner()).unwrap();
            assert_eq!(back, stride);
        }
    }

    #[test]
    fn skin_channels_layout() {
        let strides = Stride::skin_channels();
        assert_eq!(strides.len(), 8);
        assert!(strides[..4].iter().all(|s| s.width() == 1));
        assert!(strides[4..].iter().all(|s| s.width() == 4));
        assert_eq!(strides[0].reserved.len(), 0x7C);
    }

    #[test]
    fn rejects_overlong_attribute_list() {
        let mut w = ByteWriter::new();
        w.u32(17);
        w.zeroes(STRIDE_RECORD_LEN - 4);
        assert!(matches!(
            parse_stride(&w.into_inner()),
            Err(ReadError::InvalidStride { .. })
        ));
    }

    #[test]
    fn oversized_attribute_list_has_no_tail() {
        let position = Attribute::new(AttributeKind::Position, SizeClass::Point3D);
        let stride = Stride::new(vec![position; MAX_ATTRIBUTES + 1]);
        assert!(stride.reserved.is_empty());
        assert_eq!(Stride::reserved_len(MAX_ATTRIBUTES), 4);
        assert_eq!(Stride::reserved_len(usize::MAX / 16), 0);
    }

    #[test]
    fn rejects_unknown_size_class() {
        let mut stride = Stride::base(false, 0);
        stride.attributes[0].size = SizeClass::Other(42);
        let mut w = ByteWriter::new();
        stride.write(&mut w);
        assert!(matches!(
            parse_stride(&w.into_inner()),
            Err(ReadError::InvalidStride { .. })
        ));
    }

    #[test]
    fn reserved_tail_is_preserved() {
        let mut stride = Stride::base(true, 1);
        stride.reserved[5] = 0x5A;
        let mut w = ByteWriter::new();
        stride.write(&mut w);
        assert_eq!(parse_stride(&w.into_inner()).unwrap().reserved[5], 0x5A);
    }
}
