use crate::io::{ByteReader, ByteWriter, Record, Vec3};
use crate::read::ReadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelType {
    /// Static mesh.
    Model,
    /// Rigged mesh with bones and a bone/weight table.
    Skin,
}

impl ModelType {
    pub const fn raw(self) -> u32 {
        match self {
            Self::Model => 2,
            Self::Skin => 3,
        }
    }

    pub fn from_raw(raw: u32) -> Result<Self, ReadError> {
        match raw {
            2 => Ok(Self::Model),
            3 => Ok(Self::Skin),
            other => Err(ReadError::UnsupportedType(other)),
        }
    }
}

/// Per-file counts and aggregate bounds, directly after the file header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSummary {
    pub box_min: Vec3,
    pub box_max: Vec3,
    pub centroid: Vec3,
    pub height: f32,
    pub radius: f32,
    pub reserved_f32: f32,
    pub volume: f32,
    pub point: Vec3,
    pub material_definition_count: u32,
    pub mesh_description_count: u32,
    pub bone_count: u32,
    pub entity_count: u32,
    pub unknown_count: u32,
    pub collision_point_count: u32,
    pub reserved_a: [u8; 20],
    pub vertex_count: u32,
    pub stride_count: u32,
    /// Raw type discriminator, see [`ModelSummary::model_type`].
    pub model_type: u32,
    pub index_count: u32,
    pub reserved_b: [u8; 4],
}

impl Default for ModelSummary {
    fn default() -> Self {
        Self {
            box_min: [0.0; 3],
            box_max: [0.0; 3],
            centroid: [0.0; 3],
            height: 0.0,
            radius: 0.0,
            reserved_f32: 0.0,
            volume: 0.0,
            point: [0.0; 3],
            material_definition_count: 0,
            mesh_description_count: 0,
            bone_count: 0,
            entity_count: 0,
            unknown_count: 0,
            collision_point_count: 0,
            reserved_a: [0; 20],
            vertex_count: 0,
            stride_count: 0,
            model_type: ModelType::Model.raw(),
            index_count: 0,
            reserved_b: [0; 4],
        }
    }
}

impl ModelSummary {
    pub fn model_type(&self) -> Result<ModelType, ReadError> {
        ModelType::from_raw(self.model_type)
    }
}

impl Record for ModelSummary {
    const ENCODED_LEN: usize = 0x80;

    fn read(r: &mut ByteReader<'_>) -> Result<Self, ReadError> {
        Ok(Self {
            box_min: r.vec3()?,
            box_max: r.vec3()?,
            centroid: r.vec3()?,
            height: r.f32()?,
            radius: r.f32()?,
            reserved_f32: r.f32()?,
            volume: r.f32()?,
            point: r.vec3()?,
            material_definition_count: r.u32()?,
            mesh_description_count: r.u32()?,
            bone_count: r.u32()?,
            entity_count: r.u32()?,
            unknown_count: r.u32()?,
            collision_point_count: r.u32()?,
            reserved_a: r.array()?,
            vertex_count: r.u32()?,
            stride_count: r.u32()?,
            model_type: r.u32()?,
            index_count: r.u32()?,
            reserved_b: r.array()?,
        })
    }

    fn write(&self, w: &mut ByteWriter) {
        w.vec3(self.box_min);
        w.vec3(self.box_max);
        w.vec3(self.centroid);
        w.f32(self.height);
        w.f32(self.radius);
        w.f32(self.reserved_f32);
        w.f32(self.volume);
        w.vec3(self.point);
        w.u32(self.material_definition_count);
        w.u32(self.mesh_description_count);
        w.u32(self.bone_count);
        w.u32(self.entity_count);
        w.u32(self.unknown_count);
        w.u32(self.collision_point_count);
        w.bytes(&self.reserved_a);
        w.u32(self.vertex_count);
        w.u32(self.stride_count);
        w.u32(self.model_type);
        w.u32(self.index_count);
        w.bytes(&self.reserved_b);
    }
}

pub fn parse_summary(buf: &[u8]) -> Result<ModelSummary, ReadError> {
    ModelSummary::read(&mut ByteReader::new(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_len_matches_layout() {
        let mut w = ByteWriter::new();
        ModelSummary::default().write(&mut w);
        assert_eq!(w.len(), ModelSummary::ENCODED_LEN);
    }

    #[test]
    fn type_is_checked_lazily() {
        let summary = ModelSummary { model_type: 7, ..Default::default() };
        let mut w = ByteWriter::new();
        summary.write(&mut w);
        let parsed = parse_summary(&w.into_inner()).unwrap();
        assert_eq!(parsed.model_type, 7);
        assert!(matches!(parsed.model_type(), Err(ReadError::UnsupportedType(7))));
    }

    #[test]
    fn reserved_regions_survive() {
        let summary = ModelSummary {
            reserved_a: [0xAB; 20],
            reserved_b: [1, 2, 3, 4],
            model_type: ModelType::Skin.raw(),
            ..Default::default()
        };
        let mut w = ByteWriter::new();
        summary.write(&mut w);
        assert_eq!(parse_summary(&w.into_inner()).unwrap(), summary);
    }
}
