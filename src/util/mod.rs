//! Utility types shared by the store, header and mesh layers.
//!
//! - [`ScalarType`] / [`Element`] - numeric type tags and their Rust types
//! - [`Column`] - owned typed vector of property values
//! - [`Error`] / [`Result`] - error handling

mod scalar_type;
mod column;
mod error;

pub use scalar_type::*;
pub use column::*;
pub(crate) use column::{with_column, with_scalar_type};
pub use error::*;
