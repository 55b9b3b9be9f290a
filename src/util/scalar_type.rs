//! Scalar type tags - the numeric types a PLY property or a store array can hold.

use std::fmt;
use std::str::FromStr;

use zarrs::array::{DataType, ElementOwned};

use super::Column;

/// Numeric type of a PLY property and of the array that stores it.
///
/// This is the single mapping table between PLY header tags, Rust types,
/// Zarr v2 dtype strings and `zarrs` data types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ScalarType {
    Int8 = 0,
    Uint8 = 1,
    Int16 = 2,
    Uint16 = 3,
    Int32 = 4,
    Uint32 = 5,
    Int64 = 6,
    Uint64 = 7,
    Float32 = 8,
    Float64 = 9,
}

impl ScalarType {
    /// All scalar types, in tag order.
    pub const ALL: [ScalarType; 10] = [
        Self::Int8,
        Self::Uint8,
        Self::Int16,
        Self::Uint16,
        Self::Int32,
        Self::Uint32,
        Self::Int64,
        Self::Uint64,
        Self::Float32,
        Self::Float64,
    ];

    /// Size in bytes of a single value.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Int64 | Self::Uint64 | Self::Float64 => 8,
        }
    }

    /// Canonical PLY header tag, as written into headers.
    #[inline]
    pub const fn ply_name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Uint8 => "uint8",
            Self::Int16 => "int16",
            Self::Uint16 => "uint16",
            Self::Int32 => "int32",
            Self::Uint32 => "uint32",
            Self::Int64 => "int64",
            Self::Uint64 => "uint64",
            Self::Float32 => "float",
            Self::Float64 => "double",
        }
    }

    /// Parse a PLY header tag.
    ///
    /// Accepts the canonical tags, the sized float names and the legacy
    /// `char`/`uchar`/`short`/`ushort`/`int`/`uint` spellings.
    pub fn from_ply_name(name: &str) -> Option<Self> {
        Some(match name {
            "int8" | "char" => Self::Int8,
            "uint8" | "uchar" => Self::Uint8,
            "int16" | "short" => Self::Int16,
            "uint16" | "ushort" => Self::Uint16,
            "int32" | "int" => Self::Int32,
            "uint32" | "uint" => Self::Uint32,
            "int64" => Self::Int64,
            "uint64" => Self::Uint64,
            "float" | "float32" => Self::Float32,
            "double" | "float64" => Self::Float64,
            _ => return None,
        })
    }

    /// Zarr v2 typestr (always little-endian when written).
    #[inline]
    pub const fn zarr_dtype(self) -> &'static str {
        match self {
            Self::Int8 => "|i1",
            Self::Uint8 => "|u1",
            Self::Int16 => "<i2",
            Self::Uint16 => "<u2",
            Self::Int32 => "<i4",
            Self::Uint32 => "<u4",
            Self::Int64 => "<i8",
            Self::Uint64 => "<u8",
            Self::Float32 => "<f4",
            Self::Float64 => "<f8",
        }
    }

    /// Scalar type of a `zarrs` data type, `None` for types PLY cannot hold.
    pub fn from_data_type(data_type: &DataType) -> Option<Self> {
        Some(match data_type {
            DataType::Int8 => Self::Int8,
            DataType::UInt8 => Self::Uint8,
            DataType::Int16 => Self::Int16,
            DataType::UInt16 => Self::Uint16,
            DataType::Int32 => Self::Int32,
            DataType::UInt32 => Self::Uint32,
            DataType::Int64 => Self::Int64,
            DataType::UInt64 => Self::Uint64,
            DataType::Float32 => Self::Float32,
            DataType::Float64 => Self::Float64,
            _ => return None,
        })
    }

    /// Returns true for `float`/`double`.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// Returns true for the integer types.
    #[inline]
    pub const fn is_integer(self) -> bool {
        !self.is_float()
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ply_name())
    }
}

impl FromStr for ScalarType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_ply_name(s).ok_or_else(|| format!("unknown type tag '{}'", s))
    }
}

// === Element trait for type-safe array access ===

/// Rust types that can be stored in a PLY property column and a store array.
pub trait Element:
    ElementOwned + Copy + Default + PartialEq + fmt::Debug + fmt::Display + FromStr + Send + Sync + 'static
{
    /// The corresponding scalar type tag.
    const SCALAR_TYPE: ScalarType;

    /// Wrap owned values into a [`Column`].
    fn into_column(values: Vec<Self>) -> Column;

    /// Borrow the values of a column of this type.
    fn column_slice(column: &Column) -> Option<&[Self]>;

    /// Lossy conversion used when a column has to become coordinates.
    fn to_f64(self) -> f64;
}

macro_rules! impl_element {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl Element for $t {
                const SCALAR_TYPE: ScalarType = ScalarType::$variant;

                fn into_column(values: Vec<Self>) -> Column {
                    Column::$variant(values)
                }

                fn column_slice(column: &Column) -> Option<&[Self]> {
                    match column {
                        Column::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_element!(
    i8 => Int8,
    u8 => Uint8,
    i16 => Int16,
    u16 => Uint16,
    i32 => Int32,
    u32 => Uint32,
    i64 => Int64,
    u64 => Uint64,
    f32 => Float32,
    f64 => Float64,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(ScalarType::Uint8.num_bytes(), 1);
        assert_eq!(ScalarType::Int32.num_bytes(), 4);
        assert_eq!(ScalarType::Float32.num_bytes(), 4);
        assert_eq!(ScalarType::Float64.num_bytes(), 8);
        assert_eq!(ScalarType::Float64.zarr_dtype(), "<f8");
        assert_eq!(ScalarType::Uint8.zarr_dtype(), "|u1");
    }

    #[test]
    fn test_ply_names() {
        for ty in ScalarType::ALL {
            assert_eq!(ScalarType::from_ply_name(ty.ply_name()), Some(ty));
        }
        assert_eq!(ScalarType::from_ply_name("uchar"), Some(ScalarType::Uint8));
        assert_eq!(ScalarType::from_ply_name("int"), Some(ScalarType::Int32));
        assert_eq!(ScalarType::from_ply_name("float64"), Some(ScalarType::Float64));
        assert_eq!(ScalarType::from_ply_name("list"), None);
        assert!("bogus".parse::<ScalarType>().is_err());
    }

    #[test]
    fn test_data_types() {
        assert_eq!(ScalarType::from_data_type(&DataType::Float64), Some(ScalarType::Float64));
        assert_eq!(ScalarType::from_data_type(&DataType::UInt8), Some(ScalarType::Uint8));
        assert_eq!(ScalarType::from_data_type(&DataType::Int32), Some(ScalarType::Int32));
        assert_eq!(ScalarType::from_data_type(&DataType::Bool), None);
    }
}
