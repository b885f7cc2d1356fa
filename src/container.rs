//! Asset container envelope.
//!
//! # Layout
//! ```text
//! 0x00  type_tag      [u8; 4]   ITEX | MESH | IENV
//! 0x04  version       u32 LE    see `version.rs`
//! 0x08  metadata_len  u32 LE
//! 0x0C  payload_len   u32 LE
//! 0x10  metadata      metadata_len bytes, UTF-8 JSON
//! ....  payload       payload_len bytes
//! ```
//!
//! The envelope codec does not interpret the tag or version.  Matching a
//! container to the codec that can decode it is done by
//! [`AssetFile::asset_type`] and by each codec's `read_*_info`.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;
use tracing::trace;

use crate::error::{to_u32, AssetError, Result};
use crate::version::{IENV_VERSION, ITEX_VERSION, MESH_VERSION};

/// Size of the fixed envelope header in bytes.
pub const HEADER_SIZE: usize = 16;

pub const TAG_TEXTURE:     [u8; 4] = *b"ITEX";
pub const TAG_MESH:        [u8; 4] = *b"MESH";
pub const TAG_ENVIRONMENT: [u8; 4] = *b"IENV";

/// The asset kinds this build can decode.  Each one is bound to exactly one
/// type tag and one version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetType {
    Texture,
    Mesh,
    Environment,
}

impl AssetType {
    #[inline]
    pub fn tag(self) -> [u8; 4] {
        match self {
            AssetType::Texture     => TAG_TEXTURE,
            AssetType::Mesh        => TAG_MESH,
            AssetType::Environment => TAG_ENVIRONMENT,
        }
    }

    #[inline]
    pub fn version(self) -> u32 {
        match self {
            AssetType::Texture     => ITEX_VERSION,
            AssetType::Mesh        => MESH_VERSION,
            AssetType::Environment => IENV_VERSION,
        }
    }

    pub fn from_tag(tag: &[u8; 4]) -> Option<Self> {
        match tag {
            t if t == &TAG_TEXTURE     => Some(AssetType::Texture),
            t if t == &TAG_MESH        => Some(AssetType::Mesh),
            t if t == &TAG_ENVIRONMENT => Some(AssetType::Environment),
            _                          => None,
        }
    }

    /// Human-readable name (diagnostics only).
    pub fn name(self) -> &'static str {
        match self {
            AssetType::Texture     => "texture",
            AssetType::Mesh        => "mesh",
            AssetType::Environment => "environment",
        }
    }
}

/// One serialized asset: type tag, version, JSON metadata and binary payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    pub type_tag: [u8; 4],
    pub version:  u32,
    /// JSON description of how to interpret `payload`.
    pub metadata: String,
    /// Raw or compressed asset data.
    pub payload:  Vec<u8>,
}

impl AssetFile {
    pub fn new(asset_type: AssetType, metadata: String, payload: Vec<u8>) -> Self {
        Self {
            type_tag: asset_type.tag(),
            version:  asset_type.version(),
            metadata,
            payload,
        }
    }

    /// Resolve the (tag, version) pair to the codec that owns it.
    ///
    /// An unknown tag, or a known tag with any other version, is a
    /// [`AssetError::VersionMismatch`]; there is no fallback.
    pub fn asset_type(&self) -> Result<AssetType> {
        match AssetType::from_tag(&self.type_tag) {
            Some(ty) if ty.version() == self.version => Ok(ty),
            Some(ty) => Err(self.mismatch(ty)),
            None => Err(AssetError::VersionMismatch {
                expected_tag:     [0; 4],
                expected_version: 0,
                found_tag:        self.type_tag,
                found_version:    self.version,
            }),
        }
    }

    /// Fail unless this container is exactly `expected` at its current version.
    pub fn expect_type(&self, expected: AssetType) -> Result<()> {
        if self.type_tag != expected.tag() || self.version != expected.version() {
            return Err(self.mismatch(expected));
        }
        Ok(())
    }

    fn mismatch(&self, expected: AssetType) -> AssetError {
        AssetError::VersionMismatch {
            expected_tag:     expected.tag(),
            expected_version: expected.version(),
            found_tag:        self.type_tag,
            found_version:    self.version,
        }
    }

    /// Write the envelope.  Only sink errors and lengths beyond `u32` fail.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        let metadata_len = to_u32(self.metadata.len(), "metadata")?;
        let payload_len  = to_u32(self.payload.len(), "payload")?;

        writer.write_all(&self.type_tag)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_u32::<LittleEndian>(metadata_len)?;
        writer.write_u32::<LittleEndian>(payload_len)?;
        writer.write_all(self.metadata.as_bytes())?;
        writer.write_all(&self.payload)?;
        writer.flush()?;

        trace!(metadata_len, payload_len, "wrote asset container");
        Ok(())
    }

    /// Read one envelope.
    ///
    /// Declared lengths are never trusted for allocation: each section is
    /// read through [`Read::take`] and a shortfall is reported as
    /// [`AssetError::TruncatedInput`].
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let header = read_section(&mut reader, HEADER_SIZE as u64, "container header")?;
        let mut cursor = Cursor::new(header);

        let mut type_tag = [0u8; 4];
        cursor.read_exact(&mut type_tag)?;
        let version      = cursor.read_u32::<LittleEndian>()?;
        let metadata_len = cursor.read_u32::<LittleEndian>()?;
        let payload_len  = cursor.read_u32::<LittleEndian>()?;

        let metadata = read_section(&mut reader, metadata_len as u64, "metadata")?;
        let metadata = String::from_utf8(metadata)?;
        let payload  = read_section(&mut reader, payload_len as u64, "payload")?;

        trace!(metadata_len, payload_len, "read asset container");
        Ok(Self { type_tag, version, metadata, payload })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.metadata.len() + self.payload.len());
        self.write_to(&mut out)?;
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read_from(bytes)
    }
}

/// Read exactly `len` bytes, or report how many were actually available.
fn read_section<R: Read>(reader: &mut R, len: u64, context: &'static str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut buf)?;
    if (buf.len() as u64) < len {
        return Err(AssetError::TruncatedInput {
            context,
            needed:    len,
            available: buf.len() as u64,
        });
    }
    Ok(buf)
}

/// Write `file` to `path`, replacing any existing file.
pub fn save_binary_file<P: AsRef<Path>>(path: P, file: &AssetFile) -> Result<()> {
    let out = BufWriter::new(File::create(path)?);
    file.write_to(out)
}

/// Read one container from `path`.
pub fn load_binary_file<P: AsRef<Path>>(path: P) -> Result<AssetFile> {
    AssetFile::read_from(BufReader::new(File::open(path)?))
}
