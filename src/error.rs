//! Error type shared by every codec in the crate.
//!
//! Every failure is reported to the caller of the failing operation.  Nothing
//! is retried internally: compression and decompression are deterministic, so
//! a second attempt would fail the same way.

use std::io;
use std::string::FromUtf8Error;
use thiserror::Error;

use crate::version::format_version;

#[derive(Error, Debug)]
pub enum AssetError {
    /// The container's type tag or version does not belong to the codec
    /// that was asked to decode it.
    #[error(
        "Type/version mismatch: expected {} {}, found {} {}",
        tag_str(.expected_tag), version_str(.expected_version),
        tag_str(.found_tag), version_str(.found_version)
    )]
    VersionMismatch {
        expected_tag:     [u8; 4],
        expected_version: u32,
        found_tag:        [u8; 4],
        found_version:    u32,
    },

    /// An envelope field or payload segment runs past the available bytes.
    #[error("Truncated input while reading {context}: needed {needed} bytes, {available} available")]
    TruncatedInput {
        context:   &'static str,
        needed:    u64,
        available: u64,
    },

    /// A caller-supplied Info struct violates an invariant before packing.
    #[error("Invalid asset description: {0}")]
    Validation(String),

    /// A caller-supplied slice does not have the size the Info struct implies.
    #[error("Buffer size mismatch for {buffer}: expected {expected} bytes, got {actual}")]
    BufferSize {
        buffer:   &'static str,
        expected: u64,
        actual:   u64,
    },

    #[error("Compression error: {0}")]
    CompressionFailure(String),

    #[error("Corrupt payload: {0}")]
    CorruptPayload(String),

    #[error("Malformed metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Metadata is not valid UTF-8: {0}")]
    MetadataEncoding(#[from] FromUtf8Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, AssetError>;

/// Printable form of a 4-byte type tag; non-ASCII bytes are escaped.
pub fn tag_str(tag: &[u8; 4]) -> String {
    tag.iter().flat_map(|b| std::ascii::escape_default(*b)).map(char::from).collect()
}

fn version_str(version: &u32) -> String {
    format_version(*version)
}

/// Convert a host size to a 32-bit on-disk field.
pub(crate) fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| AssetError::Validation(format!("{what} of {value} bytes exceeds the 32-bit format limit")))
}

/// Fail with [`AssetError::BufferSize`] unless `actual == expected`.
pub(crate) fn check_len(buffer: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(AssetError::BufferSize {
            buffer,
            expected: expected as u64,
            actual:   actual as u64,
        });
    }
    Ok(())
}
