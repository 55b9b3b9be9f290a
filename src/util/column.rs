//! Typed columns - one owned vector of values per property.

use std::fmt::Write as _;
use std::ops::Range;

use super::{Element, Error, Result, ScalarType};

/// An owned, typed vector of property values.
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    Int8(Vec<i8>),
    Uint8(Vec<u8>),
    Int16(Vec<i16>),
    Uint16(Vec<u16>),
    Int32(Vec<i32>),
    Uint32(Vec<u32>),
    Int64(Vec<i64>),
    Uint64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

/// Run `$body` with `$v` bound to the inner vector of any column variant.
macro_rules! with_column {
    ($col:expr, $v:ident => $body:expr) => {
        match $col {
            Column::Int8($v) => $body,
            Column::Uint8($v) => $body,
            Column::Int16($v) => $body,
            Column::Uint16($v) => $body,
            Column::Int32($v) => $body,
            Column::Uint32($v) => $body,
            Column::Int64($v) => $body,
            Column::Uint64($v) => $body,
            Column::Float32($v) => $body,
            Column::Float64($v) => $body,
        }
    };
}

/// Run `$body` with `$T` bound to the Rust type of a scalar type tag.
macro_rules! with_scalar_type {
    ($ty:expr, $T:ident => $body:expr) => {
        match $ty {
            ScalarType::Int8 => {
                type $T = i8;
                $body
            }
            ScalarType::Uint8 => {
                type $T = u8;
                $body
            }
            ScalarType::Int16 => {
                type $T = i16;
                $body
            }
            ScalarType::Uint16 => {
                type $T = u16;
                $body
            }
            ScalarType::Int32 => {
                type $T = i32;
                $body
            }
            ScalarType::Uint32 => {
                type $T = u32;
                $body
            }
            ScalarType::Int64 => {
                type $T = i64;
                $body
            }
            ScalarType::Uint64 => {
                type $T = u64;
                $body
            }
            ScalarType::Float32 => {
                type $T = f32;
                $body
            }
            ScalarType::Float64 => {
                type $T = f64;
                $body
            }
        }
    };
}

pub(crate) use with_column;
pub(crate) use with_scalar_type;

impl Column {
    /// Create an empty column of the given type.
    pub fn empty(ty: ScalarType) -> Self {
        Self::with_capacity(ty, 0)
    }

    /// Create an empty column with room for `n` values.
    pub fn with_capacity(ty: ScalarType, n: usize) -> Self {
        with_scalar_type!(ty, T => T::into_column(Vec::<T>::with_capacity(n)))
    }

    /// Create a column of `n` zeros.
    pub fn zeros(ty: ScalarType, n: usize) -> Self {
        with_scalar_type!(ty, T => T::into_column(vec![T::default(); n]))
    }

    /// Scalar type of the stored values.
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Self::Int8(_) => ScalarType::Int8,
            Self::Uint8(_) => ScalarType::Uint8,
            Self::Int16(_) => ScalarType::Int16,
            Self::Uint16(_) => ScalarType::Uint16,
            Self::Int32(_) => ScalarType::Int32,
            Self::Uint32(_) => ScalarType::Uint32,
            Self::Int64(_) => ScalarType::Int64,
            Self::Uint64(_) => ScalarType::Uint64,
            Self::Float32(_) => ScalarType::Float32,
            Self::Float64(_) => ScalarType::Float64,
        }
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        with_column!(self, v => v.len())
    }

    /// Check if the column holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the values as a typed slice.
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::column_slice(self)
    }

    /// Copy of the values in `range`.
    pub fn slice(&self, range: Range<usize>) -> Self {
        with_column!(self, v => Element::into_column(v[range].to_vec()))
    }

    /// Append the values of `other`; both columns must share a type.
    pub fn extend_from(&mut self, other: &Column) -> Result<()> {
        let (ours, theirs) = (self.scalar_type(), other.scalar_type());
        if ours != theirs {
            return Err(Error::invalid_mesh(format!(
                "cannot concatenate {} column with {} column",
                ours, theirs
            )));
        }
        with_column!(self, v => {
            let src = other.as_slice().unwrap_or(&[]);
            v.extend_from_slice(src);
        });
        Ok(())
    }

    /// Values widened (or narrowed, for 64-bit integers) to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            Self::Float64(v) => v.clone(),
            other => with_column!(other, v => v.iter().map(|x| x.to_f64()).collect()),
        }
    }

    /// Parse an ASCII token and append it.
    pub fn push_parsed(&mut self, token: &str) -> Result<()> {
        with_column!(self, v => v.push(parse_token(token)?));
        Ok(())
    }

    /// Append the value at `index` formatted as PLY ASCII text.
    ///
    /// Floats use Rust's shortest round-trip formatting.
    pub fn write_ascii(&self, index: usize, out: &mut String) {
        with_column!(self, v => {
            let _ = write!(out, "{}", v[index]);
        });
    }
}

fn parse_token<T: Element>(token: &str) -> Result<T> {
    token
        .parse::<T>()
        .map_err(|_| Error::invalid_ply(format!("cannot parse '{}' as {}", token, T::SCALAR_TYPE)))
}

macro_rules! impl_from_vec {
    ($($t:ty),*) => {
        $(
            impl From<Vec<$t>> for Column {
                fn from(values: Vec<$t>) -> Self {
                    <$t as Element>::into_column(values)
                }
            }
        )*
    };
}

impl_from_vec!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64);
