//! Mesh <-> store group round trip.
//!
//! ```ignore
//! use ply_zarr::prelude::*;
//!
//! let group = Group::create(create_directory_store("cube.zarr")?, "")?;
//! write(&group, &mesh)?;
//! let back = read(&group)?;
//! ```

use std::io::Write;

use tracing::debug;

use crate::mapper::{assemble_mesh, read_arrays, write_arrays};
use crate::mesh::Mesh;
use crate::ply::{derive_header, deserialize, is_provenance, serialize, write_ply, Header};
use crate::store::{ArrayOptions, Compression, Group, DEFAULT_CHUNK_BYTES};
use crate::util::Result;

/// Settings for [`write_with`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteOptions {
    /// Target uncompressed chunk size in bytes.
    pub chunk_bytes: usize,
    /// Chunk compressor.
    pub compression: Compression,
    /// Extra header comments, stored after the provenance comment.
    /// Earlier provenance comments are dropped.
    pub comments: Vec<String>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            chunk_bytes: DEFAULT_CHUNK_BYTES,
            compression: Compression::default(),
            comments: Vec::new(),
        }
    }
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target chunk size (clamped to at least one byte).
    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = chunk_bytes.max(1);
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Append a header comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comments.push(comment.into());
        self
    }

    /// Array-level subset of these options.
    pub fn array_options(&self) -> ArrayOptions {
        ArrayOptions {
            chunk_bytes: self.chunk_bytes,
            compression: self.compression,
        }
    }
}

/// Write `mesh` into `group` with default options; returns the stored header.
pub fn write(group: &Group, mesh: &Mesh) -> Result<Header> {
    write_with(group, mesh, &WriteOptions::default())
}

/// Write `mesh` into `group`, replacing its previous children and attributes.
///
/// Nothing is touched when the header cannot be derived. A failure while
/// writing arrays may leave the group partially populated.
pub fn write_with(group: &Group, mesh: &Mesh, options: &WriteOptions) -> Result<Header> {
    let mut header = derive_header(mesh)?;
    header
        .comments
        .extend(options.comments.iter().filter(|c| !is_provenance(c)).cloned());
    let attrs = serialize(&header);

    group.clear()?;
    group.set_attrs(&attrs)?;
    write_arrays(group, mesh, &header, &options.array_options())?;
    debug!(
        group = group.path(),
        points = mesh.num_points(),
        cells = mesh.num_cells(),
        "wrote mesh"
    );
    Ok(header)
}

/// Decode the header stored in the attributes of `group`.
pub fn read_header(group: &Group) -> Result<Header> {
    deserialize(&group.attrs()?)
}

/// Read the mesh stored in `group`.
pub fn read(group: &Group) -> Result<Mesh> {
    let header = read_header(group)?;
    let raw = read_arrays(group, &header)?;
    let mesh = assemble_mesh(&raw, &header)?;
    debug!(
        group = group.path(),
        points = mesh.num_points(),
        cells = mesh.num_cells(),
        "read mesh"
    );
    Ok(mesh)
}

/// Read the mesh stored in `group` and write it as ASCII PLY, keeping the
/// stored comments.
pub fn to_ply<W: Write>(group: &Group, writer: W) -> Result<()> {
    let header = read_header(group)?;
    let mesh = assemble_mesh(&read_arrays(group, &header)?, &header)?;
    write_ply(&mesh, &header.comments, writer)
}
