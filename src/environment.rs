//! Environment map codec (`IENV`).
//!
//! An environment holds three images that are always stored LZ4-compressed:
//! the HDR source, its diffuse irradiance map and its prefiltered specular
//! map.
//!
//! # Payload
//! ```text
//! [0, irradiance_offset)                  HDR segment
//! [irradiance_offset, specular_offset)    irradiance segment
//! [specular_offset, len)                  specular segment
//! ```
//! Both offsets are derived by [`pack_environment`] from the compressed
//! lengths and written into metadata.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::{append_segment, check_decoded_size, segment_slice, Codec, CompressionMode, Lz4Codec};
use crate::container::{AssetFile, AssetType};
use crate::error::{check_len, to_u32, AssetError, Result};
use crate::metadata::{from_json, lenient_int, to_json, Extents};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentInfo {
    /// Ignored by [`pack_environment`]; environments are always LZ4.
    pub compression:       CompressionMode,
    /// Width and height of the HDR source image.
    pub hdr_extents:       [u32; 2],
    pub hdr_bytes:         u32,
    /// Face extent of the irradiance map.
    pub irradiance_size:   u32,
    pub irradiance_bytes:  u32,
    /// Output of [`pack_environment`].
    pub irradiance_offset: u32,
    /// Face extent of the specular map.
    pub specular_size:     u32,
    pub specular_bytes:    u32,
    /// Output of [`pack_environment`].
    pub specular_offset:   u32,
}

impl EnvironmentInfo {
    /// Fail with [`AssetError::CorruptPayload`] if any segment of `file`
    /// cannot decode to its declared `*_bytes` size.
    pub fn check_plausible(&self, file: &AssetFile) -> Result<()> {
        let payload = &file.payload;
        let irradiance_at = self.irradiance_offset as usize;
        let specular_at = self.specular_offset as usize;

        for (context, start, end, declared) in [
            ("HDR segment", 0, irradiance_at, self.hdr_bytes),
            ("irradiance segment", irradiance_at, specular_at, self.irradiance_bytes),
            ("specular segment", specular_at, payload.len(), self.specular_bytes),
        ] {
            let src = segment_slice(payload, start, end, context)?;
            check_decoded_size(CompressionMode::Lz4, src.len(), declared as u64, context)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct EnvironmentMetadata {
    compression_mode:  CompressionMode,
    hdr_extents:       Extents,
    #[serde(deserialize_with = "lenient_int")]
    hdr_bytes:         u32,
    #[serde(deserialize_with = "lenient_int")]
    irradiance_size:   u32,
    #[serde(deserialize_with = "lenient_int")]
    irradiance_bytes:  u32,
    #[serde(deserialize_with = "lenient_int")]
    irradiance_offset: u32,
    #[serde(deserialize_with = "lenient_int")]
    specular_size:     u32,
    #[serde(deserialize_with = "lenient_int")]
    specular_bytes:    u32,
    #[serde(deserialize_with = "lenient_int")]
    specular_offset:   u32,
}

/// Parse environment metadata.  The returned `compression` is always LZ4,
/// whatever the metadata says.
pub fn read_environment_info(file: &AssetFile) -> Result<EnvironmentInfo> {
    file.expect_type(AssetType::Environment)?;
    let meta: EnvironmentMetadata = from_json(&file.metadata)?;

    Ok(EnvironmentInfo {
        compression:       CompressionMode::Lz4,
        hdr_extents:       [meta.hdr_extents.x, meta.hdr_extents.y],
        hdr_bytes:         meta.hdr_bytes,
        irradiance_size:   meta.irradiance_size,
        irradiance_bytes:  meta.irradiance_bytes,
        irradiance_offset: meta.irradiance_offset,
        specular_size:     meta.specular_size,
        specular_bytes:    meta.specular_bytes,
        specular_offset:   meta.specular_offset,
    })
}

/// Decode the three segments.  Each destination must be exactly as long as
/// the matching `*_bytes` field.
pub fn unpack_environment(
    info:           &EnvironmentInfo,
    file:           &AssetFile,
    dst_hdr:        &mut [u8],
    dst_irradiance: &mut [u8],
    dst_specular:   &mut [u8],
) -> Result<()> {
    file.expect_type(AssetType::Environment)?;
    check_len("HDR destination", info.hdr_bytes as usize, dst_hdr.len())?;
    check_len("irradiance destination", info.irradiance_bytes as usize, dst_irradiance.len())?;
    check_len("specular destination", info.specular_bytes as usize, dst_specular.len())?;

    let payload = &file.payload;
    let irradiance_at = info.irradiance_offset as usize;
    let specular_at = info.specular_offset as usize;

    let hdr_src        = segment_slice(payload, 0, irradiance_at, "HDR segment")?;
    let irradiance_src = segment_slice(payload, irradiance_at, specular_at, "irradiance segment")?;
    let specular_src   = segment_slice(payload, specular_at, payload.len(), "specular segment")?;

    Lz4Codec.decompress_into(hdr_src, dst_hdr)?;
    Lz4Codec.decompress_into(irradiance_src, dst_irradiance)?;
    Lz4Codec.decompress_into(specular_src, dst_specular)?;
    Ok(())
}

/// Compress HDR, irradiance and specular data, in that order, into an `IENV`
/// container.
pub fn pack_environment(
    info:       &EnvironmentInfo,
    hdr:        &[u8],
    irradiance: &[u8],
    specular:   &[u8],
) -> Result<AssetFile> {
    for (name, size) in [
        ("hdr_bytes", info.hdr_bytes),
        ("irradiance_bytes", info.irradiance_bytes),
        ("specular_bytes", info.specular_bytes),
    ] {
        if size == 0 {
            return Err(AssetError::Validation(format!("{name} must be non-zero")));
        }
    }
    check_len("HDR data", info.hdr_bytes as usize, hdr.len())?;
    check_len("irradiance data", info.irradiance_bytes as usize, irradiance.len())?;
    check_len("specular data", info.specular_bytes as usize, specular.len())?;

    let mut payload = Vec::new();
    let hdr_seg = append_segment(CompressionMode::Lz4, None, hdr, &mut payload)?;
    let irradiance_offset = to_u32(payload.len(), "HDR segment")?;
    let irradiance_seg = append_segment(CompressionMode::Lz4, None, irradiance, &mut payload)?;
    let specular_offset = to_u32(payload.len(), "irradiance segment")?;
    let specular_seg = append_segment(CompressionMode::Lz4, None, specular, &mut payload)?;
    to_u32(payload.len(), "environment payload")?;

    debug!(
        hdr = hdr_seg.len,
        irradiance = irradiance_seg.len,
        specular = specular_seg.len,
        irradiance_offset,
        specular_offset,
        "packed environment"
    );

    let meta = EnvironmentMetadata {
        compression_mode: CompressionMode::Lz4,
        hdr_extents:      Extents { x: info.hdr_extents[0], y: info.hdr_extents[1], z: 0 },
        hdr_bytes:        info.hdr_bytes,
        irradiance_size:  info.irradiance_size,
        irradiance_bytes: info.irradiance_bytes,
        irradiance_offset,
        specular_size:    info.specular_size,
        specular_bytes:   info.specular_bytes,
        specular_offset,
    };
    Ok(AssetFile::new(AssetType::Environment, to_json(&meta)?, payload))
}
