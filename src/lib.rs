//! # ply-zarr
//!
//! Store PLY meshes in Zarr v2 groups.
//!
//! The PLY header (ordered elements with typed scalar and list properties)
//! is kept as a JSON attributes object on the target group, and the mesh
//! data as chunked arrays below it:
//!
//! ```text
//! group
//!  ├── 4
//!  │   └── vertex_indices (6, 4) int32
//!  └── points
//!      ├── color (8,) float
//!      ├── x (8,) double
//!      ├── y (8,) double
//!      └── z (8,) double
//! ```
//!
//! ## Modules
//!
//! - [`util`] - Scalar types, typed columns, errors
//! - [`store`] - Chunked array store: groups, arrays, backends
//! - [`mesh`] - Mesh value type
//! - [`ply`] - PLY header model, attribute codec, ASCII PLY I/O
//! - [`mapper`] - Header elements <-> store arrays
//! - [`adapter`] - `write` / `read` entry points
//!
//! ## Example
//!
//! ```ignore
//! use ply_zarr::prelude::*;
//!
//! let mesh = read_ply(std::io::BufReader::new(std::fs::File::open("cube.ply")?))?;
//! let group = Group::create(create_directory_store("cube.zarr")?, "")?;
//! write(&group, &mesh)?;
//! assert_eq!(read(&group)?, mesh);
//! ```

pub mod util;
pub mod store;
pub mod mesh;
pub mod ply;
pub mod mapper;
pub mod adapter;

// Re-export commonly used types
pub use util::{Column, Error, Result, ScalarType};
pub use adapter::{read, read_header, to_ply, write, write_with, WriteOptions};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Column, Element, Error, Result, ScalarType};
    pub use crate::store::{
        create_directory_store, memory_store, open_directory_store, Array, ArrayOptions, Compression,
        FilesystemStore, Group, MemoryStore, Storage,
    };
    pub use crate::mesh::{CellBlock, CellType, Mesh};
    pub use crate::ply::{read_ply, write_ply, Header, PropertyDescriptor, ElementDescriptor};
    pub use crate::adapter::{read, read_header, to_ply, write, write_with, WriteOptions};
}
