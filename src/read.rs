use std::io::Read;

use tracing::{debug, warn};

use crate::header::{FileHeader, HeaderParseError};
use crate::io::{ByteReader, Record};
use crate::material::MaterialDefinition;
use crate::mesh::read_mesh_descriptions;
use crate::model::Model;
use crate::records::{Bone, Entity, ModelCleave, Point};
use crate::stride::Stride;
use crate::summary::{ModelSummary, ModelType};
use crate::vertex::{read_vertices, SkinTable};

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot decode header: {0}")]
    Header(#[source] HeaderParseError),
    #[error("Unsupported model type: {0}")]
    UnsupportedType(u32),
    #[error("Data ends too early at {offset:#x}: needed {needed} bytes, {available} left")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("Invalid stride record at {offset:#x}: {reason}")]
    InvalidStride { offset: usize, reason: String },
    #[error("Invalid vertex layout: {0}")]
    InvalidVertexLayout(String),
    #[error("Invalid {what} range {start}..{end} (length {len})")]
    InvalidRange {
        what: &'static str,
        start: usize,
        end: usize,
        len: usize,
    },
    #[error("Header declares {declared} bytes, buffer holds {actual}")]
    SizeMismatch { declared: usize, actual: usize },
    #[error("Unexpected extra data: {0} bytes")]
    TooMuchData(usize),
}

impl From<HeaderParseError> for ReadError {
    fn from(e: HeaderParseError) -> Self {
        match e {
            HeaderParseError::Truncated { available } => Self::Truncated {
                offset: 0,
                needed: FileHeader::encoded_len(),
                available,
            },
            e => Self::Header(e),
        }
    }
}

impl ReadError {
    /// Whether the input is not a BWM file at all, as opposed to a damaged
    /// or unsupported one.
    pub fn is_bad_magic(&self) -> bool {
        matches!(
            self,
            Self::Header(HeaderParseError::BadMagic | HeaderParseError::BadMagicNumber(_))
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BwmReaderSettings {
    /// Fail if the header's `size` field disagrees with the buffer length.
    pub verify_file_size: bool,
    /// Accept bytes after the last record instead of failing.
    pub allow_trailing_data: bool,
}

impl Default for BwmReaderSettings {
    fn default() -> Self {
        Self {
            verify_file_size: false,
            allow_trailing_data: false,
        }
    }
}

/// Decode a complete BWM file held in memory.
pub fn decode(buf: &[u8]) -> Result<Model, ReadError> {
    decode_with_settings(Default::default(), buf)
}

pub fn decode_with_settings(
    settings: BwmReaderSettings,
    buf: &[u8],
) -> Result<Model, ReadError> {
    let mut r = ByteReader::new(buf);
    let header = FileHeader::from_bytes(r.take(FileHeader::encoded_len())?)?;
    let version = header.file_version()?;
    let declared = header.size as usize;
    if declared != buf.len() {
        if settings.verify_file_size {
            return Err(ReadError::SizeMismatch { declared, actual: buf.len() });
        }
        warn!(declared, actual = buf.len(), "file size field disagrees with buffer");
    }

    let summary = ModelSummary::read(&mut r)?;
    let model_type = summary.model_type()?;
    debug!(
        version = version.number(),
        ?model_type,
        materials = summary.material_definition_count,
        meshes = summary.mesh_description_count,
        vertices = summary.vertex_count,
        strides = summary.stride_count,
        indices = summary.index_count,
        "decoding BWM"
    );

    let materials: Vec<MaterialDefinition> =
        r.records(summary.material_definition_count as usize)?;
    let meshes = read_mesh_descriptions(&mut r, summary.mesh_description_count as usize)?;
    let bones: Vec<Bone> = r.records(summary.bone_count as usize)?;
    let entities: Vec<Entity> = r.records(summary.entity_count as usize)?;
    let unknowns: Vec<Point> = r.records(summary.unknown_count as usize)?;
    let collision_points: Vec<Point> = r.records(summary.collision_point_count as usize)?;
    let strides: Vec<Stride> = r.records(summary.stride_count as usize)?;

    let base = strides.first().ok_or_else(|| {
        ReadError::InvalidVertexLayout("file declares no strides".to_string())
    })?;
    let vertex_count = summary.vertex_count as usize;
    let vertices = read_vertices(&mut r, base, vertex_count)?;
    let skin = match strides.get(1..) {
        Some(channels) if !channels.is_empty() => {
            Some(SkinTable::read(&mut r, channels, vertex_count)?)
        }
        _ => {
            if model_type == ModelType::Skin {
                debug!("skin without bone table strides");
            }
            None
        }
    };

    let index_count = summary.index_count as usize;
    let index_bytes = r.take(index_count.saturating_mul(2))?;
    let indices = index_bytes
        .chunks_exact(2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .collect();

    let cleaves: Vec<ModelCleave> = if version.has_cleaves() {
        let count = r.u32()? as usize;
        r.records(count)?
    } else {
        vec![]
    };

    if !r.is_empty() {
        if !settings.allow_trailing_data {
            return Err(ReadError::TooMuchData(r.remaining()));
        }
        warn!(bytes = r.remaining(), "ignoring trailing data");
    }

    Ok(Model {
        header,
        summary,
        materials,
        meshes,
        bones,
        entities,
        unknowns,
        collision_points,
        strides,
        vertices,
        skin,
        indices,
        cleaves,
    })
}

/// Read everything from `read` and decode it.
pub fn read_from(read: &mut dyn Read) -> Result<Model, ReadError> {
    read_from_with_settings(Default::default(), read)
}

pub fn read_from_with_settings(
    settings: BwmReaderSettings,
    read: &mut dyn Read,
) -> Result<Model, ReadError> {
    let buf = crate::io::read_to_vec(read)?;
    decode_with_settings(settings, &buf)
}

/// Sniff the header without decoding the rest.
pub fn is_bwm_file(read: &mut dyn Read) -> Result<bool, ReadError> {
    let mut buf = [0; FileHeader::encoded_len()];
    match read.read_exact(&mut buf) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(false),
        Err(e) => return Err(e.into()),
    }
    match FileHeader::from_bytes(&buf) {
        Ok(_) | Err(HeaderParseError::UnsupportedVersion(_)) => Ok(true),
        Err(_) => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::FileVersion;

    #[test]
    fn empty_buffer_is_truncated() {
        assert!(matches!(decode(&[]), Err(ReadError::Truncated { .. })));
    }

    #[test]
    fn foreign_file_is_bad_magic() {
        let mut buf = vec![0u8; 0x200];
        buf[..4].copy_from_slice(b"RIFF");
        let err = decode(&buf).unwrap_err();
        assert!(err.is_bad_magic());
    }

    #[test]
    fn positionless_stride_is_rejected_before_allocating() {
        let mut w = crate::io::ByteWriter::new();
        w.bytes(FileHeader::new(FileVersion::V5).as_bytes());
        let summary = ModelSummary {
            vertex_count: 2_000_000,
            stride_count: 1,
            ..Default::default()
        };
        summary.write(&mut w);
        Stride::new(vec![]).write(&mut w);
        assert!(matches!(
            decode(&w.into_inner()),
            Err(ReadError::InvalidVertexLayout(_))
        ));
    }

    #[test]
    fn short_header_is_truncation() {
        let err = ReadError::from(FileHeader::from_bytes(&[0; 0x20]).unwrap_err());
        assert!(matches!(
            err,
            ReadError::Truncated { offset: 0, needed: 0x38, available: 0x20 }
        ));
    }

    #[test]
    fn sniffing() {
        let header = FileHeader::new(FileVersion::V5);
        assert!(is_bwm_file(&mut header.as_bytes()).unwrap());
        assert!(!is_bwm_file(&mut &b"LiOnHeAd"[..]).unwrap());
        let mut old = header;
        old.version = 3;
        assert!(is_bwm_file(&mut old.as_bytes()).unwrap());
    }
}
