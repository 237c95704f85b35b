//! Assemble a [`Model`] from per-mesh source geometry.
//!
//! Each source mesh's faces are grouped by material. Every group gets its own
//! de-duplicated run of vertices and its own index run, and both are appended
//! to the model-wide arrays, so offsets accumulate across groups and meshes.

use crate::HashMap;
use crate::header::{FileHeader, FileVersion};
use crate::io::{FixedStr, Vec3};
use crate::material::{MaterialDefinition, MaterialRef};
use crate::mesh::{MeshDescription, Topology};
use crate::model::Model;
use crate::records::{Bone, Entity, ModelCleave, Point, Transform};
use crate::stride::{SKIN_CHANNELS, Stride};
use crate::summary::{ModelSummary, ModelType};
use crate::vertex::{SkinTable, Vertex};
use crate::write::WriteError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFace {
    /// Indices into [`SourceMesh::vertices`].
    pub vertices: [u32; 3],
    /// Index into the builder's materials.
    pub material: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceMesh {
    pub name: String,
    pub lod_level: u32,
    pub transform: Transform,
    pub vertices: Vec<Vertex>,
    /// For SKIN models the faces of each material must already form a
    /// strip: every face after the first shares an edge with the previous
    /// one in alternating winding.
    pub faces: Vec<SourceFace>,
    /// Bone influences, one row per source vertex. Skins without one are
    /// bound rigidly to bone 0.
    pub skin: Option<SkinTable>,
}

impl SourceMesh {
    pub fn new(name: &str, vertices: Vec<Vertex>, faces: Vec<SourceFace>) -> Self {
        Self {
            name: name.to_string(),
            lod_level: 1,
            transform: Transform::IDENTITY,
            vertices,
            faces,
            skin: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    min: Vec3,
    max: Vec3,
    centroid: Vec3,
    radius: f32,
}

impl Bounds {
    fn of(points: &[Vec3]) -> Self {
        if points.is_empty() {
            return Self { min: [0.0; 3], max: [0.0; 3], centroid: [0.0; 3], radius: 0.0 };
        }
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        let mut sum = [0.0f64; 3];
        for p in points {
            for c in 0..3 {
                min[c] = min[c].min(p[c]);
                max[c] = max[c].max(p[c]);
                sum[c] += p[c] as f64;
            }
        }
        let n = points.len() as f64;
        let centroid = sum.map(|s| (s / n) as f32);
        let radius = points.iter().map(|p| distance(*p, centroid)).fold(0.0, f32::max);
        Self { min, max, centroid, radius }
    }
}

fn distance(a: Vec3, b: Vec3) -> f32 {
    let d = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
    (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
}

/// Enclosed volume of a closed triangle mesh.
fn mesh_volume(vertices: &[Vertex], faces: &[SourceFace]) -> f32 {
    let signed: f64 = faces
        .iter()
        .map(|f| {
            let [a, b, c] = f.vertices.map(|i| vertices[i as usize].position.map(f64::from));
            let cross = [
                b[1] * c[2] - b[2] * c[1],
                b[2] * c[0] - b[0] * c[2],
                b[0] * c[1] - b[1] * c[0],
            ];
            (a[0] * cross[0] + a[1] * cross[1] + a[2] * cross[2]) / 6.0
        })
        .sum();
    signed.abs() as f32
}

#[derive(Debug, Clone)]
pub struct ModelBuilder {
    version: FileVersion,
    model_type: ModelType,
    materials: Vec<MaterialDefinition>,
    meshes: Vec<SourceMesh>,
    bones: Vec<Bone>,
    entities: Vec<Entity>,
    unknowns: Vec<Point>,
    collision_points: Vec<Point>,
    cleaves: Vec<ModelCleave>,
}

impl ModelBuilder {
    pub fn new(model_type: ModelType) -> Self {
        Self {
            version: FileVersion::V5,
            model_type,
            materials: vec![],
            meshes: vec![],
            bones: vec![],
            entities: vec![],
            unknowns: vec![],
            collision_points: vec![],
            cleaves: vec![],
        }
    }

    pub fn with_version(mut self, version: FileVersion) -> Self {
        self.version = version;
        self
    }

    /// Returns the index material refs use to point at `material`.
    pub fn add_material(&mut self, material: MaterialDefinition) -> u32 {
        self.materials.push(material);
        self.materials.len() as u32 - 1
    }

    pub fn add_mesh(&mut self, mesh: SourceMesh) -> Result<(), WriteError> {
        let idx = self.meshes.len();
        let fail = |reason: String| WriteError::InvalidMesh { mesh: Some(idx), reason };
        if !(1..=4).contains(&mesh.lod_level) {
            return Err(fail(format!("lod level {} outside 1..=4", mesh.lod_level)));
        }
        let n_vertices = mesh.vertices.len();
        if let Some(f) = mesh.faces.iter().find(|f| f.vertices.iter().any(|&v| v as usize >= n_vertices)) {
            return Err(fail(format!("face {:?} past {n_vertices} vertices", f.vertices)));
        }
        if let Some(skin) = &mesh.skin {
            if skin.len() != n_vertices || skin.bone_weights.len() != n_vertices {
                return Err(WriteError::CountMismatch {
                    what: "source bone influences",
                    declared: skin.len(),
                    actual: n_vertices,
                });
            }
        }
        self.meshes.push(mesh);
        Ok(())
    }

    pub fn with_mesh(mut self, mesh: SourceMesh) -> Result<Self, WriteError> {
        self.add_mesh(mesh)?;
        Ok(self)
    }

    /// Bones keep their insertion order; it is their id in the bone table.
    pub fn add_bone(&mut self, bone: Bone) {
        self.bones.push(bone);
    }

    pub fn add_entity(&mut self, name: &str, transform: Transform) {
        self.entities.push(Entity { transform, name: FixedStr::new(name) });
    }

    pub fn add_unknown_point(&mut self, position: Vec3) {
        self.unknowns.push(Point { position });
    }

    pub fn add_collision_point(&mut self, position: Vec3) {
        self.collision_points.push(Point { position });
    }

    pub fn add_cleave(&mut self, cleave: ModelCleave) {
        self.cleaves.push(cleave);
    }

    pub fn build(mut self) -> Result<Model, WriteError> {
        if self.meshes.is_empty() {
            return Err(WriteError::NoMeshes);
        }
        // Lower LODs first, keeping insertion order within a level.
        self.meshes.sort_by_key(|m| m.lod_level);

        let first_vertex = self.meshes.iter().flat_map(|m| m.vertices.first()).next();
        let has_normal = first_vertex.is_some_and(|v| v.normal.is_some());
        let uv_count = first_vertex.map_or(0, |v| v.uvs.len());

        let topology = Topology::from(self.model_type);
        let is_skin = self.model_type == ModelType::Skin;
        let mut model = Model {
            header: FileHeader::new(self.version),
            materials: std::mem::take(&mut self.materials),
            strides: vec![Stride::base(has_normal, uv_count)],
            skin: is_skin.then(SkinTable::default),
            ..Default::default()
        };
        if is_skin {
            model.strides.extend(Stride::skin_channels());
        }

        for (mesh_idx, src) in self.meshes.iter().enumerate() {
            let desc = link_mesh(&mut model, topology, mesh_idx, src)?;
            model.meshes.push(desc);
        }

        let first = &model.meshes[0];
        model.summary = ModelSummary {
            box_min: first.box_min,
            box_max: first.box_max,
            centroid: first.centroid,
            height: first.height,
            radius: first.radius,
            volume: first.volume,
            point: first.box_max,
            model_type: self.model_type.raw(),
            ..Default::default()
        };
        model.bones = self.bones;
        model.entities = self.entities;
        model.unknowns = self.unknowns;
        model.collision_points = self.collision_points;
        model.cleaves = self.cleaves;
        model.summary = model.synced_summary();
        model.validate()?;
        Ok(model)
    }
}

fn link_mesh(
    model: &mut Model,
    topology: Topology,
    mesh_idx: usize,
    src: &SourceMesh,
) -> Result<MeshDescription, WriteError> {
    let fail = |reason: String| WriteError::InvalidMesh { mesh: Some(mesh_idx), reason };
    let mut desc = MeshDescription {
        name: FixedStr::new(&src.name),
        lod_level: src.lod_level,
        reserved_flag: if src.lod_level > 1 { 1 } else { 2 },
        transform: src.transform,
        vertex_offset: model.vertices.len() as u32,
        indices_offset: model.indices.len() as u32,
        ..Default::default()
    };

    let mut groups: HashMap<u32, Vec<&SourceFace>> = HashMap::default();
    for face in src.faces.iter() {
        groups.entry(face.material).or_default().push(face);
    }
    let mut materials: Vec<u32> = groups.keys().copied().collect();
    materials.sort_unstable();

    let mut faces_offset = 0;
    for material in materials {
        let faces = &groups[&material];
        let vertex_offset = model.vertices.len();
        let mut remap: HashMap<u32, usize> = HashMap::default();
        let mut group_faces = Vec::with_capacity(faces.len());
        for face in faces.iter() {
            let mut out = [0u16; 3];
            for (dst, &v) in out.iter_mut().zip(face.vertices.iter()) {
                let global = *remap.entry(v).or_insert_with(|| {
                    model.vertices.push(src.vertices[v as usize].clone());
                    if let Some(table) = model.skin.as_mut() {
                        let (bones, weights) = match &src.skin {
                            Some(s) => (s.bone_indices[v as usize], s.bone_weights[v as usize]),
                            None => ([0; SKIN_CHANNELS], [1.0, 0.0, 0.0, 0.0]),
                        };
                        table.bone_indices.push(bones);
                        table.bone_weights.push(weights);
                    }
                    model.vertices.len() - 1
                });
                *dst = u16::try_from(global)
                    .map_err(|_| WriteError::TooManyVertices(model.vertices.len()))?;
            }
            group_faces.push(out);
        }

        let indices = topology.indices(&group_faces);
        if topology.faces(&indices, group_faces.len()).as_ref() != Some(&group_faces) {
            return Err(fail(format!("faces of material {material} do not form a strip")));
        }
        let mref = MaterialRef {
            material_definition: material,
            indices_offset: model.indices.len() as u32,
            indices_size: indices.len() as u32,
            vertex_offset: vertex_offset as u32,
            vertex_size: (model.vertices.len() - vertex_offset) as u32,
            faces_offset,
            faces_size: group_faces.len() as u32,
            reserved: 0.0,
        };
        faces_offset += mref.faces_size;
        model.indices.extend(indices);
        desc.material_refs.push(mref);
    }

    desc.faces_count = faces_offset;
    desc.vertex_size = model.vertices.len() as u32 - desc.vertex_offset;
    desc.indices_size = model.indices.len() as u32 - desc.indices_offset;

    let positions: Vec<Vec3> = src.vertices.iter().map(|v| v.position).collect();
    let bounds = Bounds::of(&positions);
    desc.box_min = bounds.min;
    desc.box_max = bounds.max;
    desc.centroid = bounds.centroid;
    desc.radius = bounds.radius;
    desc.height = bounds.max[1];
    desc.point = bounds.max;
    desc.volume = mesh_volume(&src.vertices, &src.faces);
    Ok(desc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32, z: f32) -> Vertex {
        Vertex { position: [x, y, z], normal: Some([0.0, 0.0, 1.0]), uvs: vec![[x, y]] }
    }

    fn face(vertices: [u32; 3], material: u32) -> SourceFace {
        SourceFace { vertices, material }
    }

    fn quad(material_b: u32) -> SourceMesh {
        SourceMesh::new(
            "quad",
            vec![v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(1.0, 1.0, 0.0), v(0.0, 1.0, 0.0)],
            vec![face([0, 1, 2], 0), face([2, 3, 0], material_b)],
        )
    }

    #[test]
    fn groups_faces_by_material() {
        let mut b = ModelBuilder::new(ModelType::Model);
        b.add_material(MaterialDefinition::default());
        b.add_material(MaterialDefinition::default());
        let model = b.with_mesh(quad(1)).unwrap().build().unwrap();

        let mesh = &model.meshes[0];
        assert_eq!(mesh.faces_count, 2);
        assert_eq!(mesh.material_refs.len(), 2);
        // vertices 0 and 2 are shared by both groups and get duplicated
        assert_eq!(model.vertices.len(), 6);
        assert_eq!(mesh.material_refs[1].vertex_offset, 3);
        assert_eq!(mesh.material_refs[1].faces_offset, 1);
        assert_eq!(model.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(model.mesh_faces(0).unwrap(), vec![[0, 1, 2], [3, 4, 5]]);
        assert!(mesh.check_face_partition().is_ok());
    }

    #[test]
    fn shared_material_shares_vertices() {
        let mut b = ModelBuilder::new(ModelType::Model);
        b.add_material(MaterialDefinition::default());
        let model = b.with_mesh(quad(0)).unwrap().build().unwrap();
        assert_eq!(model.vertices.len(), 4);
        assert_eq!(model.indices, vec![0, 1, 2, 2, 3, 0]);
        assert_eq!(model.summary.vertex_count, 4);
        assert_eq!(model.summary.index_count, 6);
    }

    #[test]
    fn offsets_accumulate_across_meshes() {
        let mut b = ModelBuilder::new(ModelType::Model);
        b.add_material(MaterialDefinition::default());
        let mut lod2 = quad(0);
        lod2.lod_level = 2;
        b.add_mesh(lod2).unwrap();
        b.add_mesh(quad(0)).unwrap();
        let model = b.build().unwrap();

        assert_eq!(model.meshes[0].lod_level, 1);
        assert_eq!(model.meshes[0].reserved_flag, 2);
        assert_eq!(model.meshes[1].reserved_flag, 1);
        assert_eq!(model.meshes[1].vertex_offset, 4);
        assert_eq!(model.meshes[1].indices_offset, 6);
        assert_eq!(&model.indices[6..], &[4, 5, 6, 6, 7, 4]);
        assert_eq!(model.mesh_faces(1).unwrap(), vec![[0, 1, 2], [2, 3, 0]]);
    }

    #[test]
    fn skin_uses_strips_and_bone_table() {
        let mut b = ModelBuilder::new(ModelType::Skin).with_version(FileVersion::V6);
        b.add_material(MaterialDefinition::default());
        b.add_bone(Bone::default());
        let mesh = SourceMesh::new(
            "arm",
            vec![v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(0.0, 1.0, 0.0), v(1.0, 1.0, 0.0)],
            vec![face([0, 1, 2], 0), face([2, 1, 3], 0)],
        );
        let model = b.with_mesh(mesh).unwrap().build().unwrap();

        assert_eq!(model.indices, vec![0, 1, 2, 3]);
        assert_eq!(model.strides.len(), 9);
        assert_eq!(model.skin.as_ref().unwrap().len(), 4);
        assert_eq!(model.mesh_faces(0).unwrap(), vec![[0, 1, 2], [2, 1, 3]]);
    }

    #[test]
    fn skin_rejects_non_strip_faces() {
        let mut b = ModelBuilder::new(ModelType::Skin);
        b.add_material(MaterialDefinition::default());
        let err = b.with_mesh(quad(0)).unwrap().build().unwrap_err();
        assert!(matches!(err, WriteError::InvalidMesh { mesh: Some(0), .. }));
    }

    #[test]
    fn bounds_and_volume() {
        // unit tetrahedron corner: volume 1/6
        let mesh = SourceMesh::new(
            "tet",
            vec![v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(0.0, 1.0, 0.0), v(0.0, 0.0, 1.0)],
            vec![
                face([0, 2, 1], 0),
                face([0, 1, 3], 0),
                face([0, 3, 2], 0),
                face([1, 2, 3], 0),
            ],
        );
        let mut b = ModelBuilder::new(ModelType::Model);
        b.add_material(MaterialDefinition::default());
        let model = b.with_mesh(mesh).unwrap().build().unwrap();
        let desc = &model.meshes[0];
        assert_eq!(desc.box_min, [0.0; 3]);
        assert_eq!(desc.box_max, [1.0; 3]);
        assert_eq!(desc.centroid, [0.25; 3]);
        assert_eq!(desc.height, 1.0);
        assert!((desc.volume - 1.0 / 6.0).abs() < 1e-6);
        assert_eq!(model.summary.box_max, [1.0; 3]);
    }

    #[test]
    fn rejects_bad_source_faces() {
        let mut b = ModelBuilder::new(ModelType::Model);
        let bad = SourceMesh::new("bad", vec![v(0.0, 0.0, 0.0)], vec![face([0, 1, 2], 0)]);
        assert!(b.add_mesh(bad).is_err());
        assert!(matches!(ModelBuilder::new(ModelType::Model).build(), Err(WriteError::NoMeshes)));
    }

    #[test]
    fn unknown_material_fails_validation() {
        let b = ModelBuilder::new(ModelType::Model);
        let err = b.with_mesh(quad(0)).unwrap().build().unwrap_err();
        assert!(matches!(err, WriteError::InvalidMesh { .. }));
    }
}
