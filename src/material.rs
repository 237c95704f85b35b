use crate::io::{ByteReader, ByteWriter, FixedStr, Record};
use crate::read::ReadError;

pub type TextureName = FixedStr<64>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterialDefinition {
    pub diffuse_map: TextureName,
    pub light_map: TextureName,
    pub growth_map: TextureName,
    pub specular_map: TextureName,
    pub animated_texture: TextureName,
    pub normal_map: TextureName,
    pub material_type: TextureName,
}

impl MaterialDefinition {
    /// Texture slots in on-disk order, paired with a display label.
    pub fn textures(&self) -> [(&'static str, &TextureName); 6] {
        [
            ("diffuse", &self.diffuse_map),
            ("light", &self.light_map),
            ("growth", &self.growth_map),
            ("specular", &self.specular_map),
            ("animated", &self.animated_texture),
            ("normal", &self.normal_map),
        ]
    }
}

impl Record for MaterialDefinition {
    const ENCODED_LEN: usize = 0x1C0;

    fn read(r: &mut ByteReader<'_>) -> Result<Self, ReadError> {
        Ok(Self {
            diffuse_map: r.fixed_str()?,
            light_map: r.fixed_str()?,
            growth_map: r.fixed_str()?,
            specular_map: r.fixed_str()?,
            animated_texture: r.fixed_str()?,
            normal_map: r.fixed_str()?,
            material_type: r.fixed_str()?,
        })
    }

    fn write(&self, w: &mut ByteWriter) {
        w.fixed_str(&self.diffuse_map);
        w.fixed_str(&self.light_map);
        w.fixed_str(&self.growth_map);
        w.fixed_str(&self.specular_map);
        w.fixed_str(&self.animated_texture);
        w.fixed_str(&self.normal_map);
        w.fixed_str(&self.material_type);
    }
}

/// Binds a face/vertex/index sub-range of a mesh to one material definition.
///
/// Offsets are absolute into the model's shared arrays, except
/// `faces_offset` which counts from the owning mesh's first face.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MaterialRef {
    /// Index into [`crate::Model::materials`].
    pub material_definition: u32,
    pub indices_offset: u32,
    pub indices_size: u32,
    pub vertex_offset: u32,
    pub vertex_size: u32,
    pub faces_offset: u32,
    pub faces_size: u32,
    pub reserved: f32,
}

impl MaterialRef {
    pub fn faces_end(&self) -> u32 {
        self.faces_offset + self.faces_size
    }
}

impl Record for MaterialRef {
    const ENCODED_LEN: usize = 0x20;

    fn read(r: &mut ByteReader<'_>) -> Result<Self, ReadError> {
        Ok(Self {
            material_definition: r.u32()?,
            indices_offset: r.u32()?,
            indices_size: r.u32()?,
            vertex_offset: r.u32()?,
            vertex_size: r.u32()?,
            faces_offset: r.u32()?,
            faces_size: r.u32()?,
            reserved: r.f32()?,
        })
    }

    fn write(&self, w: &mut ByteWriter) {
        w.u32(self.material_definition);
        w.u32(self.indices_offset);
        w.u32(self.indices_size);
        w.u32(self.vertex_offset);
        w.u32(self.vertex_size);
        w.u32(self.faces_offset);
        w.u32(self.faces_size);
        w.f32(self.reserved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_record_layout() {
        let mat = MaterialDefinition {
            diffuse_map: "stone.dds".into(),
            normal_map: "stone_n.dds".into(),
            material_type: "_rock_".into(),
            ..Default::default()
        };
        let mut w = ByteWriter::new();
        mat.write(&mut w);
        let bytes = w.into_inner();
        assert_eq!(bytes.len(), MaterialDefinition::ENCODED_LEN);
        assert_eq!(&bytes[..9], b"stone.dds");
        assert_eq!(&bytes[5 * 64..5 * 64 + 11], b"stone_n.dds");
        assert_eq!(&bytes[6 * 64..6 * 64 + 6], b"_rock_");

        let back = MaterialDefinition::read(&mut ByteReader::new(&bytes)).unwrap();
        assert_eq!(back, mat);
        assert_eq!(back.textures()[0].1.as_str(), "stone.dds");
        assert!(back.textures()[1].1.is_empty());
    }

    #[test]
    fn material_ref_layout() {
        let mref = MaterialRef { material_definition: 1, faces_size: 9, ..Default::default() };
        let mut w = ByteWriter::new();
        mref.write(&mut w);
        let bytes = w.into_inner();
        assert_eq!(bytes.len(), MaterialRef::ENCODED_LEN);
        assert_eq!(&bytes[24..28], &9u32.to_le_bytes());
    }
}
