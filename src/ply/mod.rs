//! PLY header model, its JSON attribute codec and ASCII PLY I/O.
//!
//! - [`Header`] - ordered elements with typed scalar/list properties
//! - [`derive_header`] / [`serialize`] / [`deserialize`] - header codec
//! - [`read_ply`] / [`write_ply`] - ASCII bodies

mod header;
mod codec;
mod ascii;

pub use header::*;
pub use codec::*;
pub use ascii::*;
