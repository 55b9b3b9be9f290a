//! Chunk compressors.
//!
//! A [`Compression`] is the `compressor` entry of a `.zarray` document in
//! numcodecs form; `zarrs` does the encoding. Any compressor `zarrs` knows
//! (`blosc`, `zstd`, ...) is accepted when reading.

use serde_json::{json, Value};

/// Compressor applied to every chunk of a written array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    /// Chunks are stored raw.
    None,
    /// numcodecs `zlib` with level 1-9.
    Zlib(u32),
    /// numcodecs `gzip` with level 1-9.
    Gzip(u32),
    /// numcodecs `blosc` (lz4, byte shuffle) with level 1-9, as written by zarr-python.
    Blosc(u32),
}

impl Default for Compression {
    fn default() -> Self {
        Self::Zlib(1)
    }
}

impl Compression {
    /// Map a CLI style level onto a compressor (`<= 0` disables compression).
    pub fn from_level(level: i32) -> Self {
        if level <= 0 {
            Self::None
        } else {
            Self::Zlib(level.clamp(1, 9) as u32)
        }
    }

    /// The `compressor` entry of `.zarray`.
    pub fn to_json(self) -> Value {
        match self {
            Self::None => Value::Null,
            Self::Zlib(level) => json!({ "id": "zlib", "level": level.clamp(1, 9) }),
            Self::Gzip(level) => json!({ "id": "gzip", "level": level.clamp(1, 9) }),
            Self::Blosc(level) => json!({
                "id": "blosc",
                "cname": "lz4",
                "clevel": level.clamp(1, 9),
                "shuffle": 1,
                "blocksize": 0
            }),
        }
    }
}
