use std::io::Write;

use tracing::{debug, warn};

use crate::header::{FileHeader, FileVersion};
use crate::io::{ByteWriter, Record};
use crate::model::Model;
use crate::read::ReadError;
use crate::vertex::VertexLayout;

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("Model is not encodable: {0}")]
    Layout(ReadError),
    #[error("{what}: declared {declared}, actual {actual}")]
    CountMismatch {
        what: &'static str,
        declared: usize,
        actual: usize,
    },
    #[error("Invalid mesh {mesh:?}: {reason}")]
    InvalidMesh { mesh: Option<usize>, reason: String },
    #[error("Vertex shape (normal: {has_normal}, uv sets: {uvs}) does not match stride 0")]
    VertexShape { has_normal: bool, uvs: usize },
    #[error("Stride {stride} has {attributes} attributes, more than a record holds")]
    OversizedStride { stride: usize, attributes: usize },
    #[error("Model has no stride describing its vertices")]
    MissingBaseStride,
    #[error("Bone table presence does not match the bone table strides")]
    SkinTableMismatch,
    #[error("{0} vertices cannot be addressed by 16-bit indices")]
    TooManyVertices(usize),
    #[error("No source meshes provided")]
    NoMeshes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BwmWriterSettings {
    /// Write this format version instead of the one in the model's header.
    ///
    /// Converting to version 5 drops the cleave trailer.
    pub version: Option<FileVersion>,
}

/// Offsets of the derived header fields.
const SIZE_OFFSET: usize = 0x28;
const METADATA_SIZE_OFFSET: usize = 0x34;

pub fn encode(model: &Model) -> Result<Vec<u8>, WriteError> {
    encode_with_settings(Default::default(), model)
}

pub fn encode_with_settings(
    settings: BwmWriterSettings,
    model: &Model,
) -> Result<Vec<u8>, WriteError> {
    model.validate()?;
    let version = match settings.version {
        Some(version) => version,
        None => model
            .header
            .file_version()
            .map_err(|e| WriteError::Layout(e.into()))?,
    };
    let mut header = model.header;
    header.version = version.number();
    header.size = 0;
    header.metadata_size = 0;
    let summary = model.synced_summary();
    debug!(
        version = version.number(),
        materials = summary.material_definition_count,
        meshes = summary.mesh_description_count,
        vertices = summary.vertex_count,
        indices = summary.index_count,
        "encoding BWM"
    );

    let mut w = ByteWriter::new();
    w.bytes(header.to_le().as_bytes());
    summary.write(&mut w);
    w.records(&model.materials);
    for mesh in model.meshes.iter() {
        mesh.write(&mut w);
    }
    w.records(&model.bones);
    w.records(&model.entities);
    w.records(&model.unknowns);
    w.records(&model.collision_points);
    w.records(&model.strides);
    let metadata_size = w.len() - FileHeader::encoded_len();

    // validate() guarantees stride 0 exists and matches every vertex
    let layout = VertexLayout::from_stride(&model.strides[0]).map_err(WriteError::Layout)?;
    for v in model.vertices.iter() {
        layout.write_vertex(v, &mut w)?;
    }
    if let Some(table) = &model.skin {
        table.write(&model.strides[1..], &mut w)?;
    }
    model.indices.iter().for_each(|i| w.u16(*i));

    if version.has_cleaves() {
        w.u32(model.cleaves.len() as u32);
        w.records(&model.cleaves);
    } else if !model.cleaves.is_empty() {
        warn!(count = model.cleaves.len(), "version 5 has no cleave trailer, dropping cleaves");
    }

    let size = w.len();
    w.patch_u32(SIZE_OFFSET, size as u32);
    w.patch_u32(METADATA_SIZE_OFFSET, metadata_size as u32);
    Ok(w.into_inner())
}

pub fn write_to(model: &Model, write: &mut dyn Write) -> Result<(), WriteError> {
    write_to_with_settings(Default::default(), model, write)
}

pub fn write_to_with_settings(
    settings: BwmWriterSettings,
    model: &Model,
    write: &mut dyn Write,
) -> Result<(), WriteError> {
    let bytes = encode_with_settings(settings, model)?;
    crate::io::write_all(write, &bytes)?;
    Ok(())
}
