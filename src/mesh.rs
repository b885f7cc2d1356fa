//! Mesh codec (`MESH`).
//!
//! # Metadata
//! ```text
//! vertex_format        "PNTV32"
//! compression_mode     "None" | "LZ4", covers both segments
//! vertex_count         number of vertices
//! index_count          number of indices
//! index_bits           16 | 32, width of one unsigned index
//! index_binary_offset  payload offset where the index segment starts
//! ```
//!
//! # Payload
//! ```text
//! [0, index_binary_offset)          vertex segment
//! [index_binary_offset, len)        index segment
//! ```
//! Each segment is encoded independently, so its stored length depends on
//! compression.  `index_binary_offset` is produced by [`pack_mesh`] and never
//! authored by the caller.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::{
    append_segment, check_decoded_size, compress_bound, get_codec, segment_slice, CompressionMode,
};
use crate::container::{AssetFile, AssetType};
use crate::error::{check_len, to_u32, AssetError, Result};
use crate::metadata::{from_json, lenient_int, to_json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VertexFormat {
    /// Position (3) - Normal (3) - Tangent (3) - UV (2), all 32-bit float.
    #[default]
    PNTV32,
    Unknown,
}

impl VertexFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            VertexFormat::PNTV32  => "PNTV32",
            VertexFormat::Unknown => "Unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "PNTV32" => VertexFormat::PNTV32,
            _        => VertexFormat::Unknown,
        }
    }

    /// Size of one interleaved vertex, 0 for an unknown format.
    pub fn vertex_byte_size(self) -> usize {
        match self {
            VertexFormat::PNTV32  => std::mem::size_of::<PNTV32Vertex>(),
            VertexFormat::Unknown => 0,
        }
    }
}

impl From<String> for VertexFormat {
    fn from(s: String) -> Self { VertexFormat::parse(&s) }
}

impl From<VertexFormat> for String {
    fn from(f: VertexFormat) -> Self { f.as_str().to_string() }
}

/// One [`VertexFormat::PNTV32`] vertex.  Use `bytemuck::cast_slice` to pass a
/// `&[PNTV32Vertex]` to [`pack_mesh`] or to view an unpacked buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct PNTV32Vertex {
    pub position: [f32; 3],
    pub normal:   [f32; 3],
    pub tangent:  [f32; 3],
    pub uv:       [f32; 2],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshInfo {
    pub format:              VertexFormat,
    pub compression:         CompressionMode,
    pub vertex_count:        u32,
    pub index_count:         u32,
    pub index_bits:          u8,
    /// Output of [`pack_mesh`], input of [`unpack_mesh`].
    pub index_binary_offset: u32,
}

impl Default for MeshInfo {
    fn default() -> Self {
        Self {
            format:              VertexFormat::PNTV32,
            compression:         CompressionMode::Lz4,
            vertex_count:        0,
            index_count:         0,
            index_bits:          32,
            index_binary_offset: 0,
        }
    }
}

impl MeshInfo {
    /// Decompressed size of the vertex buffer.
    pub fn vertex_bytes(&self) -> usize {
        self.vertex_count as usize * self.format.vertex_byte_size()
    }

    /// Decompressed size of the index buffer.
    pub fn index_bytes(&self) -> usize {
        self.index_count as usize * (self.index_bits as usize / 8)
    }

    /// Fail with [`AssetError::CorruptPayload`] if either segment of `file`
    /// cannot decode to the sizes the counts declare.
    pub fn check_plausible(&self, file: &AssetFile) -> Result<()> {
        let split = self.index_binary_offset as usize;
        let vertex_src = segment_slice(&file.payload, 0, split, "vertex segment")?;
        let index_src  = segment_slice(&file.payload, split, file.payload.len(), "index segment")?;

        let vertex_bytes = self.vertex_count as u64 * self.format.vertex_byte_size() as u64;
        let index_bytes  = self.index_count as u64 * (self.index_bits as u64 / 8);
        check_decoded_size(self.compression, vertex_src.len(), vertex_bytes, "vertex segment")?;
        check_decoded_size(self.compression, index_src.len(), index_bytes, "index segment")
    }
}

/// Check everything [`pack_mesh`] relies on.
pub fn validate_mesh_info(info: &MeshInfo) -> Result<()> {
    if !matches!(info.index_bits, 16 | 32) {
        return Err(AssetError::Validation(format!("index_bits must be 16 or 32, got {}", info.index_bits)));
    }
    if !matches!(info.compression, CompressionMode::None | CompressionMode::Lz4) {
        return Err(AssetError::Validation("unsupported compression mode".into()));
    }
    if info.format != VertexFormat::PNTV32 {
        return Err(AssetError::Validation(format!("unsupported vertex format {}", info.format.as_str())));
    }
    if info.vertex_count == 0 {
        return Err(AssetError::Validation("vertex_count must be non-zero".into()));
    }
    if info.index_count == 0 {
        return Err(AssetError::Validation("index_count must be non-zero".into()));
    }
    Ok(())
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct MeshMetadata {
    vertex_format:       VertexFormat,
    compression_mode:    CompressionMode,
    #[serde(deserialize_with = "lenient_int")]
    vertex_count:        u32,
    #[serde(deserialize_with = "lenient_int")]
    index_count:         u32,
    #[serde(deserialize_with = "lenient_int")]
    index_bits:          u8,
    #[serde(deserialize_with = "lenient_int")]
    index_binary_offset: u32,
}

pub fn read_mesh_info(file: &AssetFile) -> Result<MeshInfo> {
    file.expect_type(AssetType::Mesh)?;
    let meta: MeshMetadata = from_json(&file.metadata)?;

    Ok(MeshInfo {
        format:              meta.vertex_format,
        compression:         meta.compression_mode,
        vertex_count:        meta.vertex_count,
        index_count:         meta.index_count,
        index_bits:          meta.index_bits,
        index_binary_offset: meta.index_binary_offset,
    })
}

/// Decode both segments into `dst_vertices` (`info.vertex_bytes()` long) and
/// `dst_indices` (`info.index_bytes()` long).
pub fn unpack_mesh(
    info:         &MeshInfo,
    file:         &AssetFile,
    dst_vertices: &mut [u8],
    dst_indices:  &mut [u8],
) -> Result<()> {
    file.expect_type(AssetType::Mesh)?;
    validate_mesh_info(info)?;
    check_len("vertex destination", info.vertex_bytes(), dst_vertices.len())?;
    check_len("index destination", info.index_bytes(), dst_indices.len())?;

    let split = info.index_binary_offset as usize;
    let vertex_src = segment_slice(&file.payload, 0, split, "vertex segment")?;
    let index_src  = segment_slice(&file.payload, split, file.payload.len(), "index segment")?;

    let codec = get_codec(info.compression);
    codec.decompress_into(vertex_src, dst_vertices)?;
    codec.decompress_into(index_src, dst_indices)?;
    Ok(())
}

/// Pack vertex and index buffers into a `MESH` container.
///
/// The vertex segment is written first; its stored length becomes
/// `index_binary_offset` and the index segment follows immediately.
pub fn pack_mesh(info: &MeshInfo, vertices: &[u8], indices: &[u8]) -> Result<AssetFile> {
    validate_mesh_info(info)?;
    check_len("vertex data", info.vertex_bytes(), vertices.len())?;
    check_len("index data", info.index_bytes(), indices.len())?;

    let mut payload = Vec::with_capacity(match info.compression {
        CompressionMode::None => vertices.len() + indices.len(),
        CompressionMode::Lz4  => compress_bound(vertices.len()) + compress_bound(indices.len()),
    });
    let vertex_seg = append_segment(info.compression, None, vertices, &mut payload)?;
    let index_binary_offset = to_u32(vertex_seg.len, "vertex segment")?;
    let index_seg = append_segment(info.compression, None, indices, &mut payload)?;
    payload.shrink_to_fit();

    debug!(
        vertex_count = info.vertex_count,
        index_count = info.index_count,
        vertex_stored = vertex_seg.len,
        index_stored = index_seg.len,
        mode = vertex_seg.mode.as_str(),
        "packed mesh"
    );

    let meta = MeshMetadata {
        vertex_format:    info.format,
        compression_mode: vertex_seg.mode,
        vertex_count:     info.vertex_count,
        index_count:      info.index_count,
        index_bits:       info.index_bits,
        index_binary_offset,
    };
    Ok(AssetFile::new(AssetType::Mesh, to_json(&meta)?, payload))
}
