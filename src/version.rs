//! Format version numbers.
//!
//! A version is `major.minor.patch`, packed into a `u32`:
//!
//! ```text
//! bits 31..24  reserved, always zero
//! bits 23..16  major
//! bits 15..8   minor
//! bits  7..0   patch
//! ```
//!
//! Decoders accept exactly one version per asset type; there is no
//! migration between versions.

/// Version of the texture (`ITEX`) metadata/payload layout.
pub const ITEX_VERSION: u32 = pack_version(1, 0, 0);
/// Version of the mesh (`MESH`) metadata/payload layout.
pub const MESH_VERSION: u32 = pack_version(0, 0, 1);
/// Version of the environment map (`IENV`) metadata/payload layout.
pub const IENV_VERSION: u32 = pack_version(0, 0, 1);

#[inline]
pub const fn pack_version(major: u8, minor: u8, patch: u8) -> u32 {
    ((major as u32) << 16) | ((minor as u32) << 8) | patch as u32
}

#[inline]
pub const fn major_version(version: u32) -> u8 {
    ((version >> 16) & 0xFF) as u8
}

#[inline]
pub const fn minor_version(version: u32) -> u8 {
    ((version >> 8) & 0xFF) as u8
}

#[inline]
pub const fn patch_version(version: u32) -> u8 {
    (version & 0xFF) as u8
}

/// Split a packed version back into `(major, minor, patch)`.
#[inline]
pub const fn unpack_version(version: u32) -> (u8, u8, u8) {
    (major_version(version), minor_version(version), patch_version(version))
}

/// `major.minor.patch`, for diagnostics only.
pub fn format_version(version: u32) -> String {
    let (major, minor, patch) = unpack_version(version);
    format!("{major}.{minor}.{patch}")
}
