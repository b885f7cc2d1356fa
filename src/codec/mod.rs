//! Compression adapter.
//!
//! # Wire format
//! LZ4 segments are raw LZ4 blocks with no size prefix and no frame header.
//! The decompressed size of every segment is recorded in the asset metadata,
//! so decoders always know the exact output length up front.
//!
//! # Mode bookkeeping
//! [`append_segment`] returns the mode it actually used.  Asset codecs write
//! that value into metadata, never the mode the caller asked for, so the
//! metadata always describes the stored bytes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AssetError, Result};

/// Compressed/original ratio above which compression is discarded.
pub const DEFAULT_MAX_COMPRESSION_RATIO: f64 = 0.8;

/// Largest decompressed/compressed ratio an LZ4 block can reach.
pub const LZ4_MAX_EXPANSION: u64 = 255;

// ── CompressionMode ──────────────────────────────────────────────────────────

/// How a payload segment is stored.  Serialized as `"None"` / `"LZ4"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CompressionMode {
    #[default]
    None,
    Lz4,
}

impl CompressionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CompressionMode::None => "None",
            CompressionMode::Lz4  => "LZ4",
        }
    }

    /// Parse the metadata spelling.  Anything unrecognised reads as `None`;
    /// callers must not rely on this for round-tripping.
    pub fn parse(s: &str) -> Self {
        match s {
            "LZ4" => CompressionMode::Lz4,
            _     => CompressionMode::None,
        }
    }

    /// Parse from a CLI string (case-insensitive, strict).
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(CompressionMode::None),
            "lz4"  => Some(CompressionMode::Lz4),
            _      => None,
        }
    }
}

impl From<String> for CompressionMode {
    fn from(s: String) -> Self {
        CompressionMode::parse(&s)
    }
}

impl From<CompressionMode> for String {
    fn from(mode: CompressionMode) -> Self {
        mode.as_str().to_string()
    }
}

// ── CompressionPolicy ────────────────────────────────────────────────────────

/// Decides whether a compressed segment is kept or replaced by raw bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionPolicy {
    /// Largest `compressed / original` ratio still worth storing compressed.
    pub max_ratio: f64,
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self { max_ratio: DEFAULT_MAX_COMPRESSION_RATIO }
    }
}

impl CompressionPolicy {
    /// `max_ratio` must lie in `(0, 1]`.
    pub fn new(max_ratio: f64) -> Result<Self> {
        if !(max_ratio > 0.0 && max_ratio <= 1.0) {
            return Err(AssetError::Validation(format!(
                "compression ratio must be in (0, 1], got {max_ratio}"
            )));
        }
        Ok(Self { max_ratio })
    }

    pub fn worth_compressing(&self, original_size: usize, compressed_size: usize) -> bool {
        if original_size == 0 {
            return false;
        }
        compressed_size as f64 / original_size as f64 <= self.max_ratio
    }
}

// ── Codec trait ──────────────────────────────────────────────────────────────

pub trait Codec: Send + Sync {
    fn mode(&self) -> CompressionMode;

    /// Encode `src` and append it to `dst`.  Returns the appended length.
    /// On error `dst` is left as it was.
    fn compress_into(&self, src: &[u8], dst: &mut Vec<u8>) -> Result<usize>;

    /// Decode `src` so that it fills `dst` exactly.
    fn decompress_into(&self, src: &[u8], dst: &mut [u8]) -> Result<()>;
}

pub struct NoneCodec;
impl Codec for NoneCodec {
    fn mode(&self) -> CompressionMode { CompressionMode::None }

    fn compress_into(&self, src: &[u8], dst: &mut Vec<u8>) -> Result<usize> {
        dst.extend_from_slice(src);
        Ok(src.len())
    }

    fn decompress_into(&self, src: &[u8], dst: &mut [u8]) -> Result<()> {
        if src.len() < dst.len() {
            return Err(AssetError::TruncatedInput {
                context:   "raw segment",
                needed:    dst.len() as u64,
                available: src.len() as u64,
            });
        }
        if src.len() > dst.len() {
            return Err(AssetError::CorruptPayload(format!(
                "raw segment holds {} bytes, expected {}",
                src.len(),
                dst.len()
            )));
        }
        dst.copy_from_slice(src);
        Ok(())
    }
}

pub struct Lz4Codec;
impl Codec for Lz4Codec {
    fn mode(&self) -> CompressionMode { CompressionMode::Lz4 }

    fn compress_into(&self, src: &[u8], dst: &mut Vec<u8>) -> Result<usize> {
        // Stage into a worst-case region, then cut back to what was written.
        let start = dst.len();
        dst.resize(start + compress_bound(src.len()), 0);
        match lz4_flex::block::compress_into(src, &mut dst[start..]) {
            Ok(written) => {
                dst.truncate(start + written);
                Ok(written)
            }
            Err(e) => {
                dst.truncate(start);
                Err(AssetError::CompressionFailure(e.to_string()))
            }
        }
    }

    fn decompress_into(&self, src: &[u8], dst: &mut [u8]) -> Result<()> {
        let written = lz4_flex::block::decompress_into(src, dst)
            .map_err(|e| AssetError::CorruptPayload(e.to_string()))?;
        if written != dst.len() {
            return Err(AssetError::CorruptPayload(format!(
                "LZ4 segment decoded to {} bytes, expected {}",
                written,
                dst.len()
            )));
        }
        Ok(())
    }
}

/// Resolve a mode to its codec.
pub fn get_codec(mode: CompressionMode) -> Box<dyn Codec> {
    match mode {
        CompressionMode::None => Box::new(NoneCodec),
        CompressionMode::Lz4  => Box::new(Lz4Codec),
    }
}

// ── Adapter functions ────────────────────────────────────────────────────────

/// Upper bound on the LZ4 output size for `len` input bytes.
#[inline]
pub fn compress_bound(len: usize) -> usize {
    lz4_flex::block::get_maximum_output_size(len)
}

/// LZ4-compress `bytes` into a new buffer sized to the result.
pub fn compress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    Lz4Codec.compress_into(bytes, &mut out)?;
    Ok(out)
}

/// LZ4-decompress `bytes`, which must decode to exactly `expected_size` bytes.
pub fn decompress(bytes: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; expected_size];
    Lz4Codec.decompress_into(bytes, &mut out)?;
    Ok(out)
}

/// [`CompressionPolicy::worth_compressing`] with the default 0.8 ratio.
pub fn worth_compressing(original_size: usize, compressed_size: usize) -> bool {
    CompressionPolicy::default().worth_compressing(original_size, compressed_size)
}

/// One segment appended to a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Mode the stored bytes are actually encoded with.
    pub mode: CompressionMode,
    /// Stored length in bytes.
    pub len:  usize,
}

/// Append `src` to `dst` using `requested`.
///
/// With a `policy`, an LZ4 result that does not pay for itself is rolled
/// back and `src` is stored raw instead; the returned [`Segment::mode`] then
/// reads `None`.
pub fn append_segment(
    requested: CompressionMode,
    policy:    Option<&CompressionPolicy>,
    src:       &[u8],
    dst:       &mut Vec<u8>,
) -> Result<Segment> {
    let start = dst.len();
    let codec = get_codec(requested);
    let len = codec.compress_into(src, dst)?;

    if codec.mode() == CompressionMode::Lz4 {
        if let Some(policy) = policy {
            if !policy.worth_compressing(src.len(), len) {
                debug!(
                    original = src.len(),
                    compressed = len,
                    max_ratio = policy.max_ratio,
                    "compression not worth it, storing raw"
                );
                dst.truncate(start);
                let len = NoneCodec.compress_into(src, dst)?;
                return Ok(Segment { mode: CompressionMode::None, len });
            }
        }
    }
    Ok(Segment { mode: codec.mode(), len })
}

/// Reject a declared decompressed size that `stored` bytes in `mode` cannot
/// produce.  Run this before sizing buffers from untrusted metadata.
pub fn check_decoded_size(
    mode:     CompressionMode,
    stored:   usize,
    declared: u64,
    context:  &'static str,
) -> Result<()> {
    let stored = stored as u64;
    let plausible = match mode {
        CompressionMode::None => declared == stored,
        CompressionMode::Lz4  => declared <= stored.saturating_mul(LZ4_MAX_EXPANSION),
    };
    if !plausible {
        return Err(AssetError::CorruptPayload(format!(
            "{context} declares {declared} bytes but {stored} {} bytes cannot hold that",
            mode.as_str()
        )));
    }
    Ok(())
}

/// Bounds-checked `payload[start..end]`.
pub(crate) fn segment_slice<'a>(
    payload: &'a [u8],
    start:   usize,
    end:     usize,
    context: &'static str,
) -> Result<&'a [u8]> {
    if start > end {
        return Err(AssetError::CorruptPayload(format!(
            "{context} starts at {start} but ends at {end}"
        )));
    }
    if end > payload.len() {
        return Err(AssetError::TruncatedInput {
            context,
            needed:    end as u64,
            available: payload.len() as u64,
        });
    }
    Ok(&payload[start..end])
}
