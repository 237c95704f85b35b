use crate::io::{ByteReader, ByteWriter, FixedStr, Record, Vec3};
use crate::material::MaterialRef;
use crate::read::ReadError;
use crate::records::Transform;
use crate::summary::{ModelSummary, ModelType};

/// Fixed part of a mesh description, before its inline material refs.
pub const MESH_DESCRIPTION_FIXED_LEN: usize = 0xD8;

#[derive(Debug, Clone, PartialEq)]
pub struct MeshDescription {
    pub faces_count: u32,
    pub indices_offset: u32,
    pub indices_size: u32,
    pub vertex_offset: u32,
    pub vertex_size: u32,
    pub transform: Transform,
    pub box_min: Vec3,
    pub box_max: Vec3,
    pub centroid: Vec3,
    pub height: f32,
    pub radius: f32,
    pub volume: f32,
    /// Written as 2 for the first LOD and 1 for the others.
    pub reserved_flag: u32,
    /// 1 (most detailed) to 4.
    pub lod_level: u32,
    pub name: FixedStr<64>,
    pub point: Vec3,
    pub reserved_tail: [u8; 12],
    pub material_refs: Vec<MaterialRef>,
}

impl Default for MeshDescription {
    fn default() -> Self {
        Self {
            faces_count: 0,
            indices_offset: 0,
            indices_size: 0,
            vertex_offset: 0,
            vertex_size: 0,
            transform: Transform::IDENTITY,
            box_min: [0.0; 3],
            box_max: [0.0; 3],
            centroid: [0.0; 3],
            height: 0.0,
            radius: 0.0,
            volume: 0.0,
            reserved_flag: 2,
            lod_level: 1,
            name: FixedStr::default(),
            point: [0.0; 3],
            reserved_tail: [0; 12],
            material_refs: vec![],
        }
    }
}

impl MeshDescription {
    pub fn encoded_len(&self) -> usize {
        MESH_DESCRIPTION_FIXED_LEN + self.material_refs.len() * MaterialRef::ENCODED_LEN
    }

    pub fn read(r: &mut ByteReader<'_>) -> Result<Self, ReadError> {
        let faces_count = r.u32()?;
        let indices_offset = r.u32()?;
        let indices_size = r.u32()?;
        let vertex_offset = r.u32()?;
        let vertex_size = r.u32()?;
        let transform = Transform::read(r)?;
        let box_min = r.vec3()?;
        let box_max = r.vec3()?;
        let centroid = r.vec3()?;
        let height = r.f32()?;
        let radius = r.f32()?;
        let volume = r.f32()?;
        let material_refs_count = r.u32()? as usize;
        let reserved_flag = r.u32()?;
        let lod_level = r.u32()?;
        let name = r.fixed_str()?;
        let point = r.vec3()?;
        let reserved_tail = r.array()?;
        let material_refs = r.records(material_refs_count)?;
        Ok(Self {
            faces_count,
            indices_offset,
            indices_size,
            vertex_offset,
            vertex_size,
            transform,
            box_min,
            box_max,
            centroid,
            height,
            radius,
            volume,
            reserved_flag,
            lod_level,
            name,
            point,
            reserved_tail,
            material_refs,
        })
    }

    /// Writes the fixed fields with a refs count taken from the actual list.
    pub fn write(&self, w: &mut ByteWriter) {
        w.u32(self.faces_count);
        w.u32(self.indices_offset);
        w.u32(self.indices_size);
        w.u32(self.vertex_offset);
        w.u32(self.vertex_size);
        self.transform.write(w);
        w.vec3(self.box_min);
        w.vec3(self.box_max);
        w.vec3(self.centroid);
        w.f32(self.height);
        w.f32(self.radius);
        w.f32(self.volume);
        w.u32(self.material_refs.len() as u32);
        w.u32(self.reserved_flag);
        w.u32(self.lod_level);
        w.fixed_str(&self.name);
        w.vec3(self.point);
        w.bytes(&self.reserved_tail);
        w.records(&self.material_refs);
    }

    /// Checks that the material refs cover `[0, faces_count)` in order,
    /// without gaps or overlaps. Returns the first offending ref index.
    pub fn check_face_partition(&self) -> Result<(), usize> {
        let mut next = 0;
        for (i, mref) in self.material_refs.iter().enumerate() {
            if mref.faces_offset != next {
                return Err(i);
            }
            next = mref.faces_end();
        }
        if next != self.faces_count {
            return Err(self.material_refs.len());
        }
        Ok(())
    }
}

pub fn parse_mesh_descriptions(
    buf: &[u8],
    summary: &ModelSummary,
) -> Result<Vec<MeshDescription>, ReadError> {
    let mut r = ByteReader::new(buf);
    read_mesh_descriptions(&mut r, summary.mesh_description_count as usize)
}

pub fn read_mesh_descriptions(
    r: &mut ByteReader<'_>,
    count: usize,
) -> Result<Vec<MeshDescription>, ReadError> {
    if r.remaining() < count.saturating_mul(MESH_DESCRIPTION_FIXED_LEN) {
        return Err(ReadError::Truncated {
            offset: r.position(),
            needed: count * MESH_DESCRIPTION_FIXED_LEN,
            available: r.remaining(),
        });
    }
    (0..count).map(|_| MeshDescription::read(r)).collect()
}

/// How a model's index buffer encodes faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Three indices per face.
    TriangleList,
    /// Face `i` is the window `[i, i + 1, i + 2]`; odd faces have their
    /// first two indices swapped to keep a consistent winding.
    TriangleStrip,
}

impl From<ModelType> for Topology {
    fn from(t: ModelType) -> Self {
        match t {
            ModelType::Model => Self::TriangleList,
            ModelType::Skin => Self::TriangleStrip,
        }
    }
}

impl Topology {
    pub fn index_count(self, n_faces: usize) -> usize {
        match (self, n_faces) {
            (_, 0) => 0,
            (Self::TriangleList, n) => n * 3,
            (Self::TriangleStrip, n) => n + 2,
        }
    }

    /// Split an index run into `n_faces` triangles. Returns `None` if the
    /// run is too short.
    pub fn faces(self, indices: &[u16], n_faces: usize) -> Option<Vec<[u16; 3]>> {
        if indices.len() < self.index_count(n_faces) {
            return None;
        }
        let faces = match self {
            Self::TriangleList => indices
                .chunks_exact(3)
                .take(n_faces)
                .map(|c| [c[0], c[1], c[2]])
                .collect(),
            Self::TriangleStrip => indices
                .windows(3)
                .take(n_faces)
                .enumerate()
                .map(|(i, w)| if i % 2 == 0 { [w[0], w[1], w[2]] } else { [w[1], w[0], w[2]] })
                .collect(),
        };
        Some(faces)
    }

    /// Inverse of [`Topology::faces`].
    ///
    /// For strips the faces must already be in strip order: only the third
    /// corner of every face after the first is stored.
    pub fn indices(self, faces: &[[u16; 3]]) -> Vec<u16> {
        match self {
            Self::TriangleList => faces.iter().flatten().copied().collect(),
            Self::TriangleStrip => {
                let mut out = Vec::with_capacity(self.index_count(faces.len()));
                for (i, f) in faces.iter().enumerate() {
                    let f = if i % 2 == 0 { *f } else { [f[1], f[0], f[2]] };
                    if i == 0 {
                        out.extend_from_slice(&f);
                    } else {
                        out.push(f[2]);
                    }
                }
                out
            }
        }
    }
}

/// How SKIN meshes address their strips in the shared index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StripOffsets {
    /// Offsets and sizes are exact and every material ref is its own strip.
    /// This is what [`crate::encode`] writes.
    #[default]
    Exact,
    /// Older exporters wrote two more indices per group than they declared,
    /// so recorded offsets lag behind the data. Each mesh is read as a
    /// single strip of `faces_count` faces, starting two indices after its
    /// recorded offset unless that offset is zero.
    Legacy,
}

impl StripOffsets {
    /// Where the strip of a mesh recorded at `indices_offset` really starts.
    pub fn mesh_start(self, indices_offset: u32) -> usize {
        match (self, indices_offset) {
            (Self::Legacy, offset) if offset > 0 => offset as usize + 2,
            (_, offset) => offset as usize,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh_with_refs(faces_count: u32, ranges: &[(u32, u32)]) -> MeshDescription {
        MeshDescription {
            faces_count,
            material_refs: ranges
                .iter()
                .map(|&(faces_offset, faces_size)| MaterialRef {
                    faces_offset,
                    faces_size,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn fixed_part_is_0xd8() {
        let mut w = ByteWriter::new();
        MeshDescription::default().write(&mut w);
        assert_eq!(w.len(), MESH_DESCRIPTION_FIXED_LEN);
    }

    #[test]
    fn refs_are_inline() {
        let mut mesh = mesh_with_refs(3, &[(0, 1), (1, 2)]);
        mesh.name = "hull".into();
        let mut w = ByteWriter::new();
        mesh.write(&mut w);
        let bytes = w.into_inner();
        assert_eq!(bytes.len(), mesh.encoded_len());
        assert_eq!(&bytes[0x74..0x78], &2u32.to_le_bytes());
        let back = MeshDescription::read(&mut ByteReader::new(&bytes)).unwrap();
        assert_eq!(back, mesh);
    }

    #[test]
    fn parses_declared_count() {
        let mut w = ByteWriter::new();
        mesh_with_refs(1, &[(0, 1)]).write(&mut w);
        mesh_with_refs(0, &[]).write(&mut w);
        let summary = ModelSummary { mesh_description_count: 2, ..Default::default() };
        let meshes = parse_mesh_descriptions(&w.into_inner(), &summary).unwrap();
        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes[0].material_refs.len(), 1);

        let summary = ModelSummary { mesh_description_count: 3, ..Default::default() };
        let mut w = ByteWriter::new();
        mesh_with_refs(0, &[]).write(&mut w);
        assert!(parse_mesh_descriptions(&w.into_inner(), &summary).is_err());
    }

    #[test]
    fn face_partition() {
        assert!(mesh_with_refs(5, &[(0, 2), (2, 3)]).check_face_partition().is_ok());
        assert_eq!(mesh_with_refs(5, &[(0, 2), (3, 2)]).check_face_partition(), Err(1));
        assert_eq!(mesh_with_refs(5, &[(0, 2), (1, 4)]).check_face_partition(), Err(1));
        assert_eq!(mesh_with_refs(6, &[(0, 2), (2, 3)]).check_face_partition(), Err(2));
        assert!(mesh_with_refs(0, &[]).check_face_partition().is_ok());
    }

    #[test]
    fn triangle_list_faces() {
        let faces = Topology::TriangleList.faces(&[0, 1, 2, 2, 3, 0], 2).unwrap();
        assert_eq!(faces, vec![[0, 1, 2], [2, 3, 0]]);
        assert!(Topology::TriangleList.faces(&[0, 1, 2], 2).is_none());
    }

    #[test]
    fn strip_swaps_odd_faces_only() {
        let strip = [10, 11, 12, 13, 14];
        let faces = Topology::TriangleStrip.faces(&strip, 3).unwrap();
        assert_eq!(faces[0], [10, 11, 12]);
        assert_eq!(faces[1], [12, 11, 13]);
        assert_eq!(faces[2], [12, 13, 14]);
    }

    #[test]
    fn legacy_strips_start_two_late() {
        assert_eq!(StripOffsets::Legacy.mesh_start(0), 0);
        assert_eq!(StripOffsets::Legacy.mesh_start(4), 6);
        assert_eq!(StripOffsets::Exact.mesh_start(4), 4);
    }

    #[test]
    fn strip_encoding_inverts_decoding() {
        let strip = vec![0, 1, 2, 3, 4, 5];
        let faces = Topology::TriangleStrip.faces(&strip, 4).unwrap();
        assert_eq!(Topology::TriangleStrip.indices(&faces), strip);
        assert_eq!(Topology::TriangleStrip.index_count(4), 6);
        assert_eq!(Topology::TriangleList.index_count(4), 12);
    }
}
