use crate::header::{FileHeader, FileVersion};
use crate::material::{MaterialDefinition, MaterialRef};
use crate::mesh::{MeshDescription, StripOffsets, Topology};
use crate::stride::MAX_ATTRIBUTES;
use crate::read::ReadError;
use crate::records::{Bone, Entity, ModelCleave, Point};
use crate::stride::Stride;
use crate::summary::{ModelSummary, ModelType};
use crate::vertex::{SkinTable, VertexLayout, Vertex};
use crate::write::WriteError;

/// A whole BWM file.
///
/// Fields are in on-disk order. Counts stored in [`ModelSummary`] and the
/// size fields of [`FileHeader`] are rewritten from the actual contents on
/// encode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub header: FileHeader,
    pub summary: ModelSummary,
    pub materials: Vec<MaterialDefinition>,
    pub meshes: Vec<MeshDescription>,
    pub bones: Vec<Bone>,
    pub entities: Vec<Entity>,
    pub unknowns: Vec<Point>,
    pub collision_points: Vec<Point>,
    pub strides: Vec<Stride>,
    pub vertices: Vec<Vertex>,
    /// Present when the file declares bone table strides after stride 0.
    pub skin: Option<SkinTable>,
    pub indices: Vec<u16>,
    /// Version 6 trailer. Ignored when writing version 5.
    pub cleaves: Vec<ModelCleave>,
}

impl Model {
    pub fn version(&self) -> Result<FileVersion, ReadError> {
        Ok(self.header.file_version()?)
    }

    pub fn model_type(&self) -> Result<ModelType, ReadError> {
        self.summary.model_type()
    }

    pub fn topology(&self) -> Result<Topology, ReadError> {
        Ok(self.model_type()?.into())
    }

    /// Triangles of one material ref, relative to the owning mesh's first
    /// vertex.
    pub fn ref_faces(
        &self,
        mesh: &MeshDescription,
        mref: &MaterialRef,
    ) -> Result<Vec<[u32; 3]>, ReadError> {
        let topology = self.topology()?;
        let start = mref.indices_offset as usize;
        let end = start + mref.indices_size as usize;
        let run = self.indices.get(start..end).ok_or(ReadError::InvalidRange {
            what: "material ref indices",
            start,
            end,
            len: self.indices.len(),
        })?;
        let faces = topology
            .faces(run, mref.faces_size as usize)
            .ok_or(ReadError::InvalidRange {
                what: "material ref faces",
                start,
                end: start + topology.index_count(mref.faces_size as usize),
                len: end,
            })?;
        faces.into_iter().map(|f| mesh_local(mesh, f)).collect()
    }

    /// All triangles of mesh `mesh_idx` in face order, with vertex indices
    /// local to the mesh.
    pub fn mesh_faces(&self, mesh_idx: usize) -> Result<Vec<[u32; 3]>, ReadError> {
        self.mesh_faces_with(mesh_idx, StripOffsets::Exact)
    }

    /// Like [`Model::mesh_faces`], reading SKIN strips as `offsets` says.
    /// MODEL files ignore `offsets`.
    pub fn mesh_faces_with(
        &self,
        mesh_idx: usize,
        offsets: StripOffsets,
    ) -> Result<Vec<[u32; 3]>, ReadError> {
        let mesh = self.meshes.get(mesh_idx).ok_or(ReadError::InvalidRange {
            what: "mesh",
            start: mesh_idx,
            end: mesh_idx + 1,
            len: self.meshes.len(),
        })?;
        let topology = self.topology()?;
        if topology == Topology::TriangleList || offsets == StripOffsets::Exact {
            let mut out = Vec::with_capacity(mesh.faces_count as usize);
            for mref in mesh.material_refs.iter() {
                out.extend(self.ref_faces(mesh, mref)?);
            }
            return Ok(out);
        }

        let start = offsets.mesh_start(mesh.indices_offset);
        let n_faces = mesh.faces_count as usize;
        let end = start + topology.index_count(n_faces);
        let run = self.indices.get(start..end).ok_or(ReadError::InvalidRange {
            what: "mesh strip",
            start,
            end,
            len: self.indices.len(),
        })?;
        let faces = topology.faces(run, n_faces).unwrap_or_default();
        faces.into_iter().map(|f| mesh_local(mesh, f)).collect()
    }

    /// The slice of the shared vertex array owned by `mesh`.
    pub fn mesh_vertices(&self, mesh: &MeshDescription) -> Option<&[Vertex]> {
        let start = mesh.vertex_offset as usize;
        self.vertices.get(start..start + mesh.vertex_size as usize)
    }

    /// The summary with every count taken from the actual arrays.
    pub fn synced_summary(&self) -> ModelSummary {
        ModelSummary {
            material_definition_count: self.materials.len() as u32,
            mesh_description_count: self.meshes.len() as u32,
            bone_count: self.bones.len() as u32,
            entity_count: self.entities.len() as u32,
            unknown_count: self.unknowns.len() as u32,
            collision_point_count: self.collision_points.len() as u32,
            vertex_count: self.vertices.len() as u32,
            stride_count: self.strides.len() as u32,
            index_count: self.indices.len() as u32,
            ..self.summary
        }
    }

    /// Checks every cross-reference and count the encoder relies on.
    pub fn validate(&self) -> Result<(), WriteError> {
        self.model_type().map_err(WriteError::Layout)?;
        if let Some((stride, s)) = self
            .strides
            .iter()
            .enumerate()
            .find(|(_, s)| s.attributes.len() > MAX_ATTRIBUTES)
        {
            return Err(WriteError::OversizedStride { stride, attributes: s.attributes.len() });
        }
        let base = self.strides.first().ok_or(WriteError::MissingBaseStride)?;
        let layout = VertexLayout::from_stride(base).map_err(WriteError::Layout)?;
        if let Some(v) = self.vertices.iter().find(|v| !layout.matches(v)) {
            return Err(WriteError::VertexShape {
                has_normal: v.normal.is_some(),
                uvs: v.uvs.len(),
            });
        }
        if self.vertices.len() > u16::MAX as usize + 1 {
            return Err(WriteError::TooManyVertices(self.vertices.len()));
        }
        match (&self.skin, self.strides.len() > 1) {
            (Some(table), true) => {
                check_count("skin table rows", table.len(), self.vertices.len())?;
                check_count("bone weights", table.bone_weights.len(), table.len())?;
            }
            (None, false) => {}
            (Some(_), false) => return Err(WriteError::SkinTableMismatch),
            (None, true) => return Err(WriteError::SkinTableMismatch),
        }
        if let Some(&idx) = self.indices.iter().find(|&&i| i as usize >= self.vertices.len()) {
            return Err(WriteError::InvalidMesh {
                mesh: None,
                reason: format!("index {idx} past {} vertices", self.vertices.len()),
            });
        }
        for (i, mesh) in self.meshes.iter().enumerate() {
            self.validate_mesh(i, mesh)?;
        }
        Ok(())
    }

    fn validate_mesh(&self, i: usize, mesh: &MeshDescription) -> Result<(), WriteError> {
        let fail = |reason: String| WriteError::InvalidMesh { mesh: Some(i), reason };
        check_range(mesh.vertex_offset, mesh.vertex_size, self.vertices.len())
            .map_err(|r| fail(format!("vertex range {r}")))?;
        check_range(mesh.indices_offset, mesh.indices_size, self.indices.len())
            .map_err(|r| fail(format!("index range {r}")))?;
        mesh.check_face_partition()
            .map_err(|r| fail(format!("material ref {r} breaks the face partition")))?;
        for (r, mref) in mesh.material_refs.iter().enumerate() {
            if mref.material_definition as usize >= self.materials.len() {
                return Err(fail(format!(
                    "material ref {r} points at material {} of {}",
                    mref.material_definition,
                    self.materials.len()
                )));
            }
            check_range(mref.vertex_offset, mref.vertex_size, self.vertices.len())
                .map_err(|e| fail(format!("material ref {r} vertex range {e}")))?;
            check_range(mref.indices_offset, mref.indices_size, self.indices.len())
                .map_err(|e| fail(format!("material ref {r} index range {e}")))?;
        }
        Ok(())
    }
}

/// Rebase a face from the shared vertex array onto the mesh's first vertex.
fn mesh_local(mesh: &MeshDescription, face: [u16; 3]) -> Result<[u32; 3], ReadError> {
    let mut local = [0; 3];
    for (dst, idx) in local.iter_mut().zip(face) {
        *dst = (idx as u32)
            .checked_sub(mesh.vertex_offset)
            .ok_or(ReadError::InvalidRange {
                what: "face vertex",
                start: idx as usize,
                end: idx as usize + 1,
                len: mesh.vertex_offset as usize,
            })?;
    }
    Ok(local)
}

fn check_count(what: &'static str, declared: usize, actual: usize) -> Result<(), WriteError> {
    if declared != actual {
        return Err(WriteError::CountMismatch { what, declared, actual });
    }
    Ok(())
}

fn check_range(offset: u32, size: u32, len: usize) -> Result<(), String> {
    let end = offset as usize + size as usize;
    if end > len {
        return Err(format!("{offset}..{end} exceeds {len}"));
    }
    Ok(())
}
