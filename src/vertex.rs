use crate::io::{ByteReader, ByteWriter, Vec3};
use crate::read::ReadError;
use crate::stride::{AttributeKind, SizeClass, Stride, SKIN_CHANNELS};
use crate::write::WriteError;

pub const MAX_UV_SETS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Option<Vec3>,
    pub uvs: Vec<[f32; 2]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Position,
    Normal,
    Uv,
}

/// Stride 0 validated into the sequence of fields it assigns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    slots: Vec<Slot>,
    width: usize,
}

impl VertexLayout {
    pub fn from_stride(stride: &Stride) -> Result<Self, ReadError> {
        let mut slots = Vec::with_capacity(stride.attributes.len());
        for a in stride.attributes.iter() {
            let slot = match (a.kind, a.size) {
                (AttributeKind::Position, SizeClass::Point3D) => Slot::Position,
                (AttributeKind::Normal, SizeClass::Point3D) => Slot::Normal,
                (AttributeKind::Uv, SizeClass::Tuple) => Slot::Uv,
                (kind, size) => {
                    return Err(ReadError::InvalidVertexLayout(format!(
                        "{kind:?} stored as {size:?}"
                    )));
                }
            };
            if slot != Slot::Uv && slots.contains(&slot) {
                return Err(ReadError::InvalidVertexLayout(format!("{slot:?} declared twice")));
            }
            slots.push(slot);
        }
        if !slots.contains(&Slot::Position) {
            return Err(ReadError::InvalidVertexLayout(
                "base stride has no position".to_string(),
            ));
        }
        let layout = Self { slots, width: stride.width() };
        if layout.uv_count() > MAX_UV_SETS {
            return Err(ReadError::InvalidVertexLayout(format!(
                "{} uv sets, at most {MAX_UV_SETS} supported",
                layout.uv_count()
            )));
        }
        Ok(layout)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn has_normal(&self) -> bool {
        self.slots.contains(&Slot::Normal)
    }

    pub fn uv_count(&self) -> usize {
        self.slots.iter().filter(|s| **s == Slot::Uv).count()
    }

    pub fn read_vertex(&self, r: &mut ByteReader<'_>) -> Result<Vertex, ReadError> {
        let mut v = Vertex::default();
        for slot in self.slots.iter() {
            match slot {
                Slot::Position => v.position = r.vec3()?,
                Slot::Normal => v.normal = Some(r.vec3()?),
                Slot::Uv => v.uvs.push(r.vec2()?),
            }
        }
        Ok(v)
    }

    /// Whether `v` carries exactly the fields this layout stores.
    pub fn matches(&self, v: &Vertex) -> bool {
        v.normal.is_some() == self.has_normal() && v.uvs.len() == self.uv_count()
    }

    pub fn write_vertex(&self, v: &Vertex, w: &mut ByteWriter) -> Result<(), WriteError> {
        if !self.matches(v) {
            return Err(WriteError::VertexShape {
                has_normal: v.normal.is_some(),
                uvs: v.uvs.len(),
            });
        }
        let mut uvs = v.uvs.iter();
        for slot in self.slots.iter() {
            match slot {
                Slot::Position => w.vec3(v.position),
                // checked by `matches` above
                Slot::Normal => w.vec3(v.normal.unwrap_or_default()),
                Slot::Uv => w.vec2(uvs.next().copied().unwrap_or_default()),
            }
        }
        Ok(())
    }
}

/// Decode one vertex by walking the attributes `stride` declares, in order.
pub fn decode_vertex(stride: &Stride, bytes: &[u8]) -> Result<Vertex, ReadError> {
    VertexLayout::from_stride(stride)?.read_vertex(&mut ByteReader::new(bytes))
}

pub fn read_vertices(
    r: &mut ByteReader<'_>,
    stride: &Stride,
    count: usize,
) -> Result<Vec<Vertex>, ReadError> {
    let layout = VertexLayout::from_stride(stride)?;
    let needed = count.saturating_mul(layout.width());
    let bytes = r.take(needed)?;
    let mut vr = ByteReader::new(bytes);
    (0..count).map(|_| layout.read_vertex(&mut vr)).collect()
}

/// Per-vertex bone influences of a SKIN model.
///
/// On disk this is channel-major: each of the eight channel strides covers
/// every vertex before the next channel starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkinTable {
    pub bone_indices: Vec<[u8; SKIN_CHANNELS]>,
    pub bone_weights: Vec<[f32; SKIN_CHANNELS]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Index(usize),
    Weight(usize),
}

fn skin_channels(strides: &[Stride]) -> Result<Vec<Channel>, ReadError> {
    let (mut n_index, mut n_weight) = (0, 0);
    let mut out = Vec::with_capacity(strides.len());
    for stride in strides.iter() {
        let channel = match stride.attributes.as_slice() {
            [a] if a.kind == AttributeKind::BoneIndex && a.size == SizeClass::Byte => {
                n_index += 1;
                Channel::Index(n_index - 1)
            }
            [a] if a.kind == AttributeKind::BoneWeight && a.size == SizeClass::Float => {
                n_weight += 1;
                Channel::Weight(n_weight - 1)
            }
            other => {
                return Err(ReadError::InvalidVertexLayout(format!(
                    "not a bone table channel: {other:?}"
                )));
            }
        };
        out.push(channel);
    }
    if n_index != SKIN_CHANNELS || n_weight != SKIN_CHANNELS {
        return Err(ReadError::InvalidVertexLayout(format!(
            "bone table needs {SKIN_CHANNELS} index and {SKIN_CHANNELS} weight channels, \
             found {n_index} and {n_weight}"
        )));
    }
    Ok(out)
}

impl SkinTable {
    /// Every vertex bound fully to bone 0.
    pub fn rigid(n_vertices: usize) -> Self {
        Self {
            bone_indices: vec![[0; SKIN_CHANNELS]; n_vertices],
            bone_weights: vec![[1.0, 0.0, 0.0, 0.0]; n_vertices],
        }
    }

    pub fn len(&self) -> usize {
        self.bone_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bone_indices.is_empty()
    }

    pub fn read(
        r: &mut ByteReader<'_>,
        channel_strides: &[Stride],
        n_vertices: usize,
    ) -> Result<Self, ReadError> {
        let mut table = Self::rigid(n_vertices);
        for channel in skin_channels(channel_strides)? {
            match channel {
                Channel::Index(c) => {
                    let bytes = r.take(n_vertices)?;
                    for (row, b) in table.bone_indices.iter_mut().zip(bytes) {
                        row[c] = *b;
                    }
                }
                Channel::Weight(c) => {
                    for row in table.bone_weights.iter_mut() {
                        row[c] = r.f32()?;
                    }
                }
            }
        }
        Ok(table)
    }

    pub fn write(
        &self,
        channel_strides: &[Stride],
        w: &mut ByteWriter,
    ) -> Result<(), WriteError> {
        if self.bone_indices.len() != self.bone_weights.len() {
            return Err(WriteError::CountMismatch {
                what: "bone weights",
                declared: self.bone_indices.len(),
                actual: self.bone_weights.len(),
            });
        }
        let channels = skin_channels(channel_strides).map_err(WriteError::Layout)?;
        for channel in channels {
            match channel {
                Channel::Index(c) => self.bone_indices.iter().for_each(|row| w.u8(row[c])),
                Channel::Weight(c) => self.bone_weights.iter().for_each(|row| w.f32(row[c])),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stride::Attribute;

    fn floats(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    #[test]
    fn decodes_position_normal_uv() {
        let bytes = floats(&[1.0, 2.0, 3.0, 0.0, 1.0, 0.0, 0.25, 0.75]);
        let v = decode_vertex(&Stride::base(true, 1), &bytes).unwrap();
        assert_eq!(v.position, [1.0, 2.0, 3.0]);
        assert_eq!(v.normal, Some([0.0, 1.0, 0.0]));
        assert_eq!(v.uvs, vec![[0.25, 0.75]]);
    }

    #[test]
    fn follows_declared_attribute_order() {
        let bytes = floats(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let pos_first = Stride::new(vec![
            Attribute::new(AttributeKind::Position, SizeClass::Point3D),
            Attribute::new(AttributeKind::Normal, SizeClass::Point3D),
            Attribute::new(AttributeKind::Uv, SizeClass::Tuple),
        ]);
        let uv_first = Stride::new(vec![
            Attribute::new(AttributeKind::Uv, SizeClass::Tuple),
            Attribute::new(AttributeKind::Normal, SizeClass::Point3D),
            Attribute::new(AttributeKind::Position, SizeClass::Point3D),
        ]);
        assert_eq!(pos_first.width(), uv_first.width());

        let a = decode_vertex(&pos_first, &bytes).unwrap();
        let b = decode_vertex(&uv_first, &bytes).unwrap();
        assert_ne!(a, b);
        assert_eq!(b.uvs, vec![[1.0, 2.0]]);
        assert_eq!(b.normal, Some([3.0, 4.0, 5.0]));
        assert_eq!(b.position, [6.0, 7.0, 8.0]);
    }

    #[test]
    fn rejects_mismatched_size_class() {
        let stride = Stride::new(vec![Attribute::new(AttributeKind::Position, SizeClass::Tuple)]);
        assert!(matches!(
            VertexLayout::from_stride(&stride),
            Err(ReadError::InvalidVertexLayout(_))
        ));
    }

    #[test]
    fn base_stride_needs_a_position() {
        assert!(matches!(
            VertexLayout::from_stride(&Stride::new(vec![])),
            Err(ReadError::InvalidVertexLayout(_))
        ));
        let uv_only = Stride::new(vec![Attribute::new(AttributeKind::Uv, SizeClass::Tuple)]);
        assert!(VertexLayout::from_stride(&uv_only).is_err());
        let twice = Stride::new(vec![
            Attribute::new(AttributeKind::Position, SizeClass::Point3D),
            Attribute::new(AttributeKind::Position, SizeClass::Point3D),
        ]);
        assert!(VertexLayout::from_stride(&twice).is_err());
    }

    #[test]
    fn empty_stride_cannot_claim_vertices() {
        let mut r = ByteReader::new(&[]);
        assert!(read_vertices(&mut r, &Stride::new(vec![]), 2_000_000).is_err());
    }

    #[test]
    fn rejects_too_many_uv_sets() {
        assert!(VertexLayout::from_stride(&Stride::base(true, 4)).is_err());
        assert!(VertexLayout::from_stride(&Stride::base(true, 3)).is_ok());
    }

    #[test]
    fn write_checks_vertex_shape() {
        let layout = VertexLayout::from_stride(&Stride::base(true, 1)).unwrap();
        let v = Vertex { position: [0.0; 3], normal: None, uvs: vec![[0.0, 0.0]] };
        let mut w = ByteWriter::new();
        assert!(matches!(
            layout.write_vertex(&v, &mut w),
            Err(WriteError::VertexShape { has_normal: false, uvs: 1 })
        ));
    }

    #[test]
    fn skin_table_is_channel_major() {
        let table = SkinTable {
            bone_indices: vec![[1, 2, 3, 4], [5, 6, 7, 8]],
            bone_weights: vec![[0.5, 0.5, 0.0, 0.0], [1.0, 0.0, 0.0, 0.0]],
        };
        let strides = Stride::skin_channels();
        let mut w = ByteWriter::new();
        table.write(&strides, &mut w).unwrap();
        let bytes = w.into_inner();
        assert_eq!(bytes.len(), 2 * 4 + 2 * 4 * 4);
        assert_eq!(&bytes[..8], &[1, 5, 2, 6, 3, 7, 4, 8]);
        assert_eq!(&bytes[8..12], &0.5f32.to_le_bytes());
        assert_eq!(&bytes[12..16], &1.0f32.to_le_bytes());

        let back = SkinTable::read(&mut ByteReader::new(&bytes), &strides, 2).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn skin_table_needs_all_channels() {
        let strides = Stride::skin_channels();
        assert!(SkinTable::read(&mut ByteReader::new(&[]), &strides[..7], 0).is_err());
    }
}
