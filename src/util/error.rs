//! Error types for the ply-zarr library.

use std::path::PathBuf;
use thiserror::Error;
use zarrs::array::{ArrayCreateError, ArrayError};
use zarrs::filesystem::FilesystemStoreCreateError;
use zarrs::group::GroupCreateError;
use zarrs::storage::StorageError;

/// Main error type for ply-zarr operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Cell block type has no fixed or variable arity list encoding
    #[error("Unsupported cell type: {0}")]
    UnsupportedCellType(String),

    /// Mesh has zero points
    #[error("Mesh has no points")]
    EmptyMesh,

    /// Attributes object does not follow the header schema
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    /// Header declares a property that has no array in the store
    #[error("Missing array for {element}.{property} at '{path}'")]
    MissingArray {
        element: String,
        property: String,
        path: String,
    },

    /// Rows found in the store disagree with the declared element size
    #[error("Element '{element}' declares {declared} rows, store holds {found}")]
    SizeMismatch {
        element: String,
        declared: usize,
        found: usize,
    },

    /// Mesh content is inconsistent (lengths, indices, dimensions)
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// Group does not exist at the given path
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// Array does not exist at the given path
    #[error("Array not found: {0}")]
    ArrayNotFound(String),

    /// Node already exists where a new one was requested
    #[error("Path already exists: {0}")]
    AlreadyExists(String),

    /// Store node or array metadata that this crate cannot use
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Feature of the store or PLY format that is not implemented
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// PLY text could not be parsed
    #[error("Invalid PLY: {0}")]
    InvalidPly(String),

    /// Root directory of a directory store is missing
    #[error("Store root not found: {0}")]
    StoreNotFound(PathBuf),

    /// Key/value storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Array metadata could not be created or parsed
    #[error("Array metadata error: {0}")]
    ArrayCreate(#[from] ArrayCreateError),

    /// Array chunks could not be encoded or decoded
    #[error("Array error: {0}")]
    Array(#[from] ArrayError),

    /// Group metadata could not be created or parsed
    #[error("Group metadata error: {0}")]
    GroupCreate(#[from] GroupCreateError),

    /// Filesystem store could not be opened
    #[error("Directory store error: {0}")]
    DirectoryStore(#[from] FilesystemStoreCreateError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a malformed header error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedHeader(msg.into())
    }

    /// Create an invalid mesh error.
    pub fn invalid_mesh(msg: impl Into<String>) -> Self {
        Self::InvalidMesh(msg.into())
    }

    /// Create an invalid PLY error.
    pub fn invalid_ply(msg: impl Into<String>) -> Self {
        Self::InvalidPly(msg.into())
    }
}

/// Result type alias for ply-zarr operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::EmptyMesh;
        assert!(e.to_string().contains("no points"));

        let e = Error::SizeMismatch {
            element: "face".into(),
            declared: 12,
            found: 10,
        };
        assert!(e.to_string().contains("12"));
        assert!(e.to_string().contains("10"));

        let e = Error::MissingArray {
            element: "vertex".into(),
            property: "z".into(),
            path: "points/z".into(),
        };
        assert!(e.to_string().contains("vertex.z"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
