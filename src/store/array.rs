//! Chunked n-dimensional arrays on top of `zarrs`.
//!
//! Arrays are written chunked along the first axis only; every chunk spans
//! the full extent of the remaining axes and the last chunk is padded with
//! the fill value. Reading accepts whatever chunk grid, byte order and
//! compressor `zarrs` can decode.

use tracing::trace;
use zarrs::array::Array as ZarrArray;
use zarrs::storage::ReadableWritableListableStorageTraits;

use super::compression::Compression;
use super::format::*;
use super::metadata::array_metadata;
use super::storage::{contains_key, erase_node, Storage};
use crate::util::{with_scalar_type, Column, Element, Error, Result, ScalarType};

/// Options used when creating an array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArrayOptions {
    /// Target uncompressed size of one chunk in bytes.
    pub chunk_bytes: usize,
    /// Chunk compressor.
    pub compression: Compression,
}

impl Default for ArrayOptions {
    fn default() -> Self {
        Self {
            chunk_bytes: DEFAULT_CHUNK_BYTES,
            compression: Compression::default(),
        }
    }
}

impl ArrayOptions {
    /// Rows per chunk for rows of `row_bytes` bytes, never zero.
    pub fn chunk_rows(&self, row_bytes: usize, rows: usize) -> usize {
        let by_size = (self.chunk_bytes / row_bytes.max(1)).max(1);
        by_size.min(rows.max(1))
    }
}

/// Handle on an array stored under a node path.
pub struct Array {
    inner: ZarrArray<dyn ReadableWritableListableStorageTraits>,
    path: String,
    shape: Vec<usize>,
    ty: ScalarType,
}

impl Array {
    /// Create an empty array at `path`, replacing whatever node was there.
    pub(crate) fn create(
        storage: Storage,
        path: String,
        shape: &[usize],
        ty: ScalarType,
        options: &ArrayOptions,
    ) -> Result<Self> {
        if shape.is_empty() || shape.len() > 2 {
            return Err(Error::Unsupported(format!("arrays of rank {}", shape.len())));
        }
        let row_bytes = shape[1..].iter().product::<usize>() * ty.num_bytes();
        let mut chunks = shape.to_vec();
        chunks[0] = options.chunk_rows(row_bytes, shape[0]);
        let metadata = array_metadata(shape, &chunks, ty, options.compression)?;

        erase_node(&storage, &path)?;
        let inner = ZarrArray::new_with_metadata(storage, &node_path(&path), metadata)?;
        inner.store_metadata()?;
        trace!(path = %path, ?shape, ?chunks, "created array");
        Ok(Self {
            inner,
            path,
            shape: shape.to_vec(),
            ty,
        })
    }

    /// Open the array stored at `path`.
    pub fn open(storage: Storage, path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if !contains_key(&storage, &join_key(&path, ZARRAY_KEY))? {
            return Err(Error::ArrayNotFound(path));
        }
        let inner = ZarrArray::open(storage, &node_path(&path))?;
        let ty = ScalarType::from_data_type(inner.data_type()).ok_or_else(|| {
            Error::Unsupported(format!("data type {:?} of array '{}'", inner.data_type(), path))
        })?;
        let shape = inner.shape().iter().map(|&n| n as usize).collect();
        Ok(Self { inner, path, shape, ty })
    }

    /// Node path of this array.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Name of this array (last path segment).
    #[inline]
    pub fn name(&self) -> &str {
        base_name(&self.path)
    }

    /// Array shape.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Shape of the first chunk.
    pub fn chunks(&self) -> Result<Vec<usize>> {
        let origin = vec![0u64; self.shape.len()];
        let chunk_shape = self.inner.chunk_shape(&origin)?;
        Ok(chunk_shape.iter().map(|c| c.get() as usize).collect())
    }

    /// Number of rows (extent of the first axis).
    #[inline]
    pub fn len(&self) -> usize {
        self.shape[0]
    }

    /// Check if the array has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scalar type of the stored values.
    #[inline]
    pub fn scalar_type(&self) -> ScalarType {
        self.ty
    }

    /// Metadata document as decoded by `zarrs`.
    #[inline]
    pub fn metadata(&self) -> &zarrs::array::ArrayMetadata {
        self.inner.metadata()
    }

    fn check_type<T: Element>(&self) -> Result<()> {
        if T::SCALAR_TYPE != self.ty {
            return Err(Error::InvalidMetadata(format!(
                "array '{}' holds {}, requested {}",
                self.path,
                self.ty,
                T::SCALAR_TYPE
            )));
        }
        Ok(())
    }

    /// Write every value, in C order.
    pub fn write<T: Element>(&self, data: &[T]) -> Result<()> {
        self.check_type::<T>()?;
        let expected: usize = self.shape.iter().product();
        if data.len() != expected {
            return Err(Error::InvalidMetadata(format!(
                "{} values for shape {:?} of '{}'",
                data.len(),
                self.shape,
                self.path
            )));
        }
        if expected > 0 {
            self.inner
                .store_array_subset_elements::<T>(&self.inner.subset_all(), data)?;
        }
        trace!(path = %self.path, values = expected, "wrote array");
        Ok(())
    }

    /// Read every value as `T`; the stored type must match.
    pub fn read<T: Element>(&self) -> Result<Vec<T>> {
        self.check_type::<T>()?;
        if self.shape.iter().product::<usize>() == 0 {
            return Ok(Vec::new());
        }
        Ok(self
            .inner
            .retrieve_array_subset_elements::<T>(&self.inner.subset_all())?)
    }

    /// Read every value, in C order.
    pub fn read_column(&self) -> Result<Column> {
        with_scalar_type!(self.ty, T => Ok(T::into_column(self.read::<T>()?)))
    }
}
