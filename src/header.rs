#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C, packed)]
pub struct FileHeader {
    pub magic: [u8; 40],
    /// Total encoded length of the file.
    pub size: u32,
    pub magic_number: u32,
    pub version: u32,
    /// Bytes between the end of this header and the start of vertex data.
    pub metadata_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileVersion {
    V5,
    V6,
}

#[derive(Debug, thiserror::Error)]
pub enum HeaderParseError {
    #[error("Bytes array cannot be reinterpreted/cast: {0}")]
    Bytemuck(bytemuck::PodCastError),
    #[error("Signature not found in magic string")]
    BadMagic,
    #[error("Wrong magic number: {0:#010x}")]
    BadMagicNumber(u32),
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u32),
    #[error("Header needs 0x38 bytes, only {available} available")]
    Truncated { available: usize },
}

impl FileVersion {
    pub const fn number(self) -> u32 {
        match self {
            Self::V5 => 5,
            Self::V6 => 6,
        }
    }

    pub const fn from_number(version: u32) -> Option<Self> {
        match version {
            5 => Some(Self::V5),
            6 => Some(Self::V6),
            _ => None,
        }
    }

    /// Whether the cleave trailer follows the index array.
    pub const fn has_cleaves(self) -> bool {
        self.number() > 5
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new(FileVersion::V5)
    }
}

impl FileHeader {
    pub const fn encoded_len() -> usize {
        std::mem::size_of::<Self>()
    }

    pub fn new(version: FileVersion) -> Self {
        let mut magic = [0; 40];
        magic[..crate::MAGIC.len()].copy_from_slice(crate::MAGIC);
        Self {
            magic,
            size: 0,
            magic_number: crate::MAGIC_NUMBER,
            version: version.number(),
            metadata_size: 0,
        }
    }

    /// Decode and validate the header at the start of `buf`.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, HeaderParseError> {
        let raw = buf
            .get(..Self::encoded_len())
            .ok_or(HeaderParseError::Truncated { available: buf.len() })?;
        let raw_header: &FileHeader = bytemuck::try_from_bytes(raw)
            .map_err(HeaderParseError::Bytemuck)?;
        let header = raw_header.to_le();
        header.validate()?;
        Ok(header)
    }

    pub fn validate(&self) -> Result<FileVersion, HeaderParseError> {
        if !contains_signature(&self.magic) {
            return Err(HeaderParseError::BadMagic);
        }
        if self.magic_number != crate::MAGIC_NUMBER {
            return Err(HeaderParseError::BadMagicNumber(self.magic_number));
        }
        self.file_version()
    }

    pub fn file_version(&self) -> Result<FileVersion, HeaderParseError> {
        FileVersion::from_number(self.version)
            .ok_or(HeaderParseError::UnsupportedVersion(self.version))
    }

    pub fn to_le(&self) -> Self {
        Self {
            magic: self.magic,
            size: self.size.to_le(),
            magic_number: self.magic_number.to_le(),
            version: self.version.to_le(),
            metadata_size: self.metadata_size.to_le(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

fn contains_signature(magic: &[u8]) -> bool {
    magic.windows(crate::MAGIC.len()).any(|w| w == crate::MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_0x38_bytes() {
        assert_eq!(FileHeader::encoded_len(), 0x38);
    }

    #[test]
    fn fresh_header_validates() {
        let header = FileHeader::new(FileVersion::V6);
        let parsed = FileHeader::from_bytes(header.as_bytes()).unwrap();
        assert_eq!(parsed.validate().unwrap(), FileVersion::V6);
    }

    #[test]
    fn signature_may_be_offset() {
        let mut header = FileHeader::new(FileVersion::V5);
        header.magic = [b' '; 40];
        header.magic[3..3 + crate::MAGIC.len()].copy_from_slice(crate::MAGIC);
        assert!(FileHeader::from_bytes(header.as_bytes()).is_ok());
    }

    #[test]
    fn short_buffer_is_truncated() {
        let header = FileHeader::new(FileVersion::V5);
        assert!(matches!(
            FileHeader::from_bytes(&header.as_bytes()[..0x37]),
            Err(HeaderParseError::Truncated { available: 0x37 })
        ));
    }

    #[test]
    fn rejects_bad_magic_string() {
        let mut header = FileHeader::new(FileVersion::V5);
        header.magic[0] = b'X';
        assert!(matches!(
            FileHeader::from_bytes(header.as_bytes()),
            Err(HeaderParseError::BadMagic)
        ));
    }

    #[test]
    fn rejects_bad_magic_number() {
        let mut header = FileHeader::new(FileVersion::V5);
        header.magic_number = 0xDEADBEEF;
        assert!(matches!(
            FileHeader::from_bytes(header.as_bytes()),
            Err(HeaderParseError::BadMagicNumber(0xDEADBEEF))
        ));
    }

    #[test]
    fn rejects_old_versions() {
        let mut header = FileHeader::new(FileVersion::V5);
        header.version = 4;
        assert!(matches!(
            FileHeader::from_bytes(header.as_bytes()),
            Err(HeaderParseError::UnsupportedVersion(4))
        ));
    }
}
