//! Hierarchical chunked array store (Zarr v2 layout).
//!
//! A store is a flat key/value space; groups and arrays are conventions
//! over it:
//!
//! ```text
//! root/
//!  ├── .zgroup            {"zarr_format": 2}
//!  ├── .zattrs            user attributes (JSON object)
//!  └── points/
//!      ├── .zgroup
//!      └── x/
//!          ├── .zarray    shape, chunks, dtype, compressor, fill_value, order
//!          ├── 0          chunk payloads, keyed by chunk grid index
//!          └── 1
//! ```
//!
//! Storage, codecs and chunk handling come from `zarrs`; [`Group`] and
//! [`Array`] are thin handles over it. Backends are [`MemoryStore`] and
//! [`FilesystemStore`], shared through a [`Storage`] handle.

mod format;
mod storage;
mod compression;
mod metadata;
mod array;
mod group;

pub use format::*;
pub use storage::*;
pub use compression::*;
pub use metadata::*;
pub use array::*;
pub use group::*;
