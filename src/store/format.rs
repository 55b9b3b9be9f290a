//! Zarr v2 layout constants and node path helpers.

use crate::util::{Error, Result};

/// Zarr format version written into every metadata document.
pub const ZARR_FORMAT: u8 = 2;

/// Key of the group metadata document.
pub const ZGROUP_KEY: &str = ".zgroup";

/// Key of the array metadata document.
pub const ZARRAY_KEY: &str = ".zarray";

/// Key of the user attributes document.
pub const ZATTRS_KEY: &str = ".zattrs";

/// Memory order of written chunks.
pub const ORDER_C: &str = "C";

/// Target uncompressed chunk size used when none is configured (1 MiB).
pub const DEFAULT_CHUNK_BYTES: usize = 1 << 20;

/// Join a node path and a child name.
#[inline]
pub fn join_key(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", path, name)
    }
}

/// Last segment of a node path (empty for the root).
#[inline]
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or("")
}

/// Absolute node path as `zarrs` expects it (`/` for the root).
#[inline]
pub fn node_path(path: &str) -> String {
    format!("/{}", path)
}

/// Validate a child node name.
pub fn check_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.contains('/')
        || name == "."
        || name == ".."
        || name.starts_with(".z")
        || name == "zarr.json"
    {
        return Err(Error::InvalidMetadata(format!("invalid node name '{}'", name)));
    }
    Ok(())
}
