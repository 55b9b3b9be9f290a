//! Key/value storage underneath a group hierarchy.
//!
//! Storage is provided by `zarrs`: [`MemoryStore`] for scratch hierarchies
//! and [`FilesystemStore`] for directories on disk. Groups and arrays share
//! one [`Storage`] handle.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use zarrs::storage::{
    ListableStorageTraits, ReadableStorageTraits, ReadableWritableListableStorage, StoreKey,
    StorePrefix, WritableStorageTraits,
};

pub use zarrs::filesystem::FilesystemStore;
pub use zarrs::storage::store::MemoryStore;

use crate::util::{Error, Result};

/// Shared handle on a readable, writable and listable store.
pub type Storage = ReadableWritableListableStorage;

/// Fresh in-memory store.
pub fn memory_store() -> Storage {
    Arc::new(MemoryStore::new())
}

/// Filesystem store rooted at `root`, creating the directory if needed.
pub fn create_directory_store(root: impl AsRef<Path>) -> Result<Storage> {
    let root = root.as_ref();
    fs::create_dir_all(root)?;
    Ok(Arc::new(FilesystemStore::new(root)?))
}

/// Filesystem store over the existing directory `root`.
pub fn open_directory_store(root: impl AsRef<Path>) -> Result<Storage> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(Error::StoreNotFound(root.to_path_buf()));
    }
    Ok(Arc::new(FilesystemStore::new(root)?))
}

pub(crate) fn store_key(key: &str) -> Result<StoreKey> {
    StoreKey::new(key).map_err(|e| Error::InvalidMetadata(e.to_string()))
}

/// Prefix covering every key below the node at `path`.
pub(crate) fn node_prefix(path: &str) -> Result<StorePrefix> {
    if path.is_empty() {
        return Ok(StorePrefix::root());
    }
    StorePrefix::new(format!("{}/", path)).map_err(|e| Error::InvalidMetadata(e.to_string()))
}

/// Check if a value exists under `key`.
pub(crate) fn contains_key(storage: &Storage, key: &str) -> Result<bool> {
    Ok(storage.get(&store_key(key)?)?.is_some())
}

/// Remove the value under `key`, if any.
pub(crate) fn erase_key(storage: &Storage, key: &str) -> Result<()> {
    let key = store_key(key)?;
    if storage.get(&key)?.is_some() {
        storage.erase(&key)?;
    }
    Ok(())
}

/// Remove the node at `path` and everything below it.
pub(crate) fn erase_node(storage: &Storage, path: &str) -> Result<()> {
    storage.erase_prefix(&node_prefix(path)?)?;
    Ok(())
}

/// Immediate children of the node at `path`: `(keys, sub-node names)`, sorted.
pub(crate) fn list_node(storage: &Storage, path: &str) -> Result<(Vec<String>, Vec<String>)> {
    let listing = storage.list_dir(&node_prefix(path)?)?;
    let skip = if path.is_empty() { 0 } else { path.len() + 1 };
    let tail = |full: &str| full.get(skip..).unwrap_or("").trim_end_matches('/').to_string();

    let mut keys: Vec<String> = listing.keys().iter().map(|k| tail(k.as_str())).collect();
    let mut nodes: Vec<String> = listing
        .prefixes()
        .iter()
        .map(|p| tail(p.as_str()))
        .filter(|name| !name.is_empty())
        .collect();
    keys.sort();
    nodes.sort();
    Ok((keys, nodes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(storage: &Storage) {
        storage.set(&store_key("a/.zgroup").unwrap(), b"{}".to_vec().into()).unwrap();
        storage.set(&store_key("a/b/.zarray").unwrap(), b"{}".to_vec().into()).unwrap();
        storage.set(&store_key("a/b/0").unwrap(), vec![1u8, 2, 3].into()).unwrap();
        storage.set(&store_key("ab/.zgroup").unwrap(), b"{}".to_vec().into()).unwrap();

        assert!(contains_key(storage, "a/b/0").unwrap());
        assert!(!contains_key(storage, "a/b/1").unwrap());

        let (keys, nodes) = list_node(storage, "").unwrap();
        assert!(keys.is_empty());
        assert_eq!(nodes, vec!["a", "ab"]);
        let (keys, nodes) = list_node(storage, "a").unwrap();
        assert_eq!(keys, vec![".zgroup"]);
        assert_eq!(nodes, vec!["b"]);

        erase_node(storage, "a").unwrap();
        assert!(!contains_key(storage, "a/b/0").unwrap());
        assert!(contains_key(storage, "ab/.zgroup").unwrap());

        erase_key(storage, "ab/.zgroup").unwrap();
        assert!(!contains_key(storage, "ab/.zgroup").unwrap());
        erase_key(storage, "ab/.zgroup").unwrap();
    }

    #[test]
    fn test_memory_store() {
        exercise(&memory_store());
    }

    #[test]
    fn test_directory_store() {
        let dir = tempfile::tempdir().unwrap();
        let storage = create_directory_store(dir.path().join("mesh.zarr")).unwrap();
        exercise(&storage);
        assert!(open_directory_store(dir.path().join("mesh.zarr")).is_ok());
    }

    #[test]
    fn test_directory_store_open_missing() {
        let dir = tempfile::tempdir().unwrap();
        let result = open_directory_store(dir.path().join("nope"));
        assert!(matches!(result, Err(Error::StoreNotFound(_))));
    }

    #[test]
    fn test_invalid_key() {
        assert!(matches!(store_key("/leading"), Err(Error::InvalidMetadata(_))));
    }
}
