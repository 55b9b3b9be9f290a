//! `.zarray` and `.zgroup` documents, built in numcodecs form and handed to `zarrs`.

use serde_json::{json, Value};
use zarrs::array::ArrayMetadata;
use zarrs::group::GroupMetadata;

use super::compression::Compression;
use super::format::*;
use crate::util::{Error, Result, ScalarType};

/// Zarr v2 group document.
pub fn group_metadata() -> Result<GroupMetadata> {
    let doc = json!({ "zarr_format": ZARR_FORMAT });
    serde_json::from_value(doc).map_err(|e| Error::InvalidMetadata(e.to_string()))
}

/// Zarr v2 array document for a C-order array with a zero fill value.
pub fn array_metadata(
    shape: &[usize],
    chunks: &[usize],
    ty: ScalarType,
    compression: Compression,
) -> Result<ArrayMetadata> {
    serde_json::from_value(array_document(shape, chunks, ty, compression))
        .map_err(|e| Error::InvalidMetadata(e.to_string()))
}

fn array_document(shape: &[usize], chunks: &[usize], ty: ScalarType, compression: Compression) -> Value {
    let fill_value = if ty.is_float() { json!(0.0) } else { json!(0) };
    json!({
        "zarr_format": ZARR_FORMAT,
        "shape": shape,
        "chunks": chunks,
        "dtype": ty.zarr_dtype(),
        "compressor": compression.to_json(),
        "fill_value": fill_value,
        "order": ORDER_C,
        "filters": null
    })
}
