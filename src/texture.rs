//! Texture codec (`ITEX`).
//!
//! # Metadata
//! ```text
//! format            "RGBA8" (anything else reads as Unknown)
//! color_space       "sRGB" | "RGB", optional, defaults to RGB
//! compression_mode  "None" | "LZ4"
//! extents           { x: width, y: height }
//! byte_size         decompressed size of the pixel data
//! mip_levels        number of mip levels stored
//! ```
//!
//! # Payload
//! One segment holding the pixel data, either raw or one LZ4 block.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::{append_segment, check_decoded_size, get_codec, CompressionMode, CompressionPolicy};
use crate::container::{AssetFile, AssetType};
use crate::error::{check_len, AssetError, Result};
use crate::metadata::{from_json, lenient_int, to_json, Extents};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TextureFormat {
    #[default]
    Unknown,
    RGBA8,
}

impl TextureFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            TextureFormat::RGBA8   => "RGBA8",
            TextureFormat::Unknown => "Unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "RGBA8" => TextureFormat::RGBA8,
            _       => TextureFormat::Unknown,
        }
    }

    /// Bytes per texel, or `None` for an unknown format.
    pub fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            TextureFormat::RGBA8   => Some(4),
            TextureFormat::Unknown => None,
        }
    }
}

impl From<String> for TextureFormat {
    fn from(s: String) -> Self { TextureFormat::parse(&s) }
}

impl From<TextureFormat> for String {
    fn from(f: TextureFormat) -> Self { f.as_str().to_string() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColorSpace {
    Unknown,
    SRGB,
    #[default]
    RGB,
}

impl ColorSpace {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorSpace::SRGB    => "sRGB",
            ColorSpace::RGB     => "RGB",
            ColorSpace::Unknown => "Unknown",
        }
    }

    /// Accepts the legacy `"SRGB"` spelling as well.
    pub fn parse(s: &str) -> Self {
        match s {
            "sRGB" | "SRGB" => ColorSpace::SRGB,
            "RGB"           => ColorSpace::RGB,
            _               => ColorSpace::Unknown,
        }
    }
}

impl From<String> for ColorSpace {
    fn from(s: String) -> Self { ColorSpace::parse(&s) }
}

impl From<ColorSpace> for String {
    fn from(c: ColorSpace) -> Self { c.as_str().to_string() }
}

/// Description of a packed texture.
///
/// When packing, `compression` is a request: the stored mode may fall back
/// to `None` if LZ4 does not pay off.  [`read_texture_info`] always returns
/// the mode that was actually stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureInfo {
    pub format:      TextureFormat,
    pub color_space: ColorSpace,
    /// Width, height, depth.  Depth is carried but unused.
    pub extents:     [u32; 3],
    /// Size of the pixel data after decompression.
    pub byte_size:   u64,
    pub mip_levels:  u32,
    pub compression: CompressionMode,
}

impl Default for TextureInfo {
    fn default() -> Self {
        Self {
            format:      TextureFormat::Unknown,
            color_space: ColorSpace::RGB,
            extents:     [0; 3],
            byte_size:   0,
            mip_levels:  1,
            compression: CompressionMode::Lz4,
        }
    }
}

impl TextureInfo {
    /// A single-level RGBA8 texture of `width` × `height`.
    pub fn rgba8(width: u32, height: u32, color_space: ColorSpace) -> Self {
        let mut info = Self {
            format: TextureFormat::RGBA8,
            color_space,
            extents: [width, height, 0],
            ..Self::default()
        };
        info.byte_size = info.expected_byte_size().unwrap_or(0);
        info
    }

    /// `width × height × bytes_per_pixel` for the base level, if the format is known.
    pub fn expected_byte_size(&self) -> Option<u64> {
        let bpp = self.format.bytes_per_pixel()? as u64;
        Some(self.extents[0] as u64 * self.extents[1] as u64 * bpp)
    }

    /// Fail with [`AssetError::CorruptPayload`] if `file`'s payload cannot
    /// decode to `byte_size` bytes.
    pub fn check_plausible(&self, file: &AssetFile) -> Result<()> {
        check_decoded_size(self.compression, file.payload.len(), self.byte_size, "texture segment")
    }

    fn byte_len(&self) -> Result<usize> {
        usize::try_from(self.byte_size).map_err(|_| {
            AssetError::Validation(format!("texture byte_size {} does not fit in memory", self.byte_size))
        })
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct TextureMetadata {
    format:           TextureFormat,
    color_space:      ColorSpace,
    compression_mode: CompressionMode,
    extents:          Extents,
    #[serde(deserialize_with = "lenient_int")]
    byte_size:        u64,
    #[serde(deserialize_with = "lenient_int")]
    mip_levels:       u32,
}

/// Parse texture metadata.  Fails with [`AssetError::VersionMismatch`] unless
/// the container is an `ITEX` at the current version.
pub fn read_texture_info(file: &AssetFile) -> Result<TextureInfo> {
    file.expect_type(AssetType::Texture)?;
    let meta: TextureMetadata = from_json(&file.metadata)?;

    Ok(TextureInfo {
        format:      meta.format,
        color_space: meta.color_space,
        extents:     [meta.extents.x, meta.extents.y, meta.extents.z],
        byte_size:   meta.byte_size,
        mip_levels:  meta.mip_levels,
        compression: meta.compression_mode,
    })
}

/// Decode the pixel data into `dst`, which must be exactly `info.byte_size` long.
pub fn unpack_texture(info: &TextureInfo, file: &AssetFile, dst: &mut [u8]) -> Result<()> {
    file.expect_type(AssetType::Texture)?;
    check_len("texture destination", info.byte_len()?, dst.len())?;
    get_codec(info.compression).decompress_into(&file.payload, dst)
}

/// Pack pixel data with the default [`CompressionPolicy`].
pub fn pack_texture(info: &TextureInfo, pixel_data: &[u8]) -> Result<AssetFile> {
    pack_texture_with_policy(info, pixel_data, &CompressionPolicy::default())
}

/// Pack pixel data into an `ITEX` container.
///
/// LZ4 output whose ratio exceeds `policy.max_ratio` is discarded and the
/// raw pixels are stored; the metadata then says `"None"`.
pub fn pack_texture_with_policy(
    info:       &TextureInfo,
    pixel_data: &[u8],
    policy:     &CompressionPolicy,
) -> Result<AssetFile> {
    if info.byte_size == 0 {
        return Err(AssetError::Validation("texture byte_size must be non-zero".into()));
    }
    check_len("pixel data", info.byte_len()?, pixel_data.len())?;

    let mut payload = Vec::new();
    let segment = append_segment(info.compression, Some(policy), pixel_data, &mut payload)?;

    debug!(
        width = info.extents[0],
        height = info.extents[1],
        byte_size = info.byte_size,
        stored = segment.len,
        mode = segment.mode.as_str(),
        "packed texture"
    );

    let meta = TextureMetadata {
        format:           info.format,
        color_space:      info.color_space,
        compression_mode: segment.mode,
        extents:          Extents { x: info.extents[0], y: info.extents[1], z: info.extents[2] },
        byte_size:        info.byte_size,
        mip_levels:       info.mip_levels,
    };
    Ok(AssetFile::new(AssetType::Texture, to_json(&meta)?, payload))
}
