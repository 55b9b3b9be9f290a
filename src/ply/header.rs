//! PLY header model: ordered elements, each with ordered typed properties.
//!
//! ```text
//! ply
//! format ascii 1.0
//! comment created by ply-zarr v0.1.0, 2026-10-19T10:00:00Z
//! element vertex 8
//! property double x
//! property double y
//! property double z
//! element face 12
//! property list uint8 int32 vertex_indices
//! end_header
//! ```

use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::util::{Error, Result, ScalarType};

/// Name of the per-point element.
pub const VERTEX_ELEMENT: &str = "vertex";

/// Name of the per-cell element.
pub const FACE_ELEMENT: &str = "face";

/// Name of the list property holding cell corner indices.
pub const VERTEX_INDICES: &str = "vertex_indices";

/// Body encoding declared by the `format` line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

impl Encoding {
    /// Keyword used in the `format` line.
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Ascii => "ascii",
            Self::BinaryLittleEndian => "binary_little_endian",
            Self::BinaryBigEndian => "binary_big_endian",
        }
    }
}

/// Value of the `format` line, e.g. `ascii 1.0`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Format {
    pub encoding: Encoding,
    pub version: String,
}

impl Default for Format {
    fn default() -> Self {
        Self {
            encoding: Encoding::Ascii,
            version: "1.0".to_string(),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.encoding.keyword(), self.version)
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let encoding = match parts.next() {
            Some("ascii") => Encoding::Ascii,
            Some("binary_little_endian") => Encoding::BinaryLittleEndian,
            Some("binary_big_endian") => Encoding::BinaryBigEndian,
            other => {
                return Err(Error::malformed(format!("unknown format {:?}", other.unwrap_or(""))));
            }
        };
        let version = parts
            .next()
            .ok_or_else(|| Error::malformed(format!("format '{}' has no version", s)))?;
        if parts.next().is_some() {
            return Err(Error::malformed(format!("trailing tokens in format '{}'", s)));
        }
        Ok(Self {
            encoding,
            version: version.to_string(),
        })
    }
}

/// A typed property of an element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyDescriptor {
    /// One value per element instance.
    Scalar { ty: ScalarType, name: String },
    /// A length-prefixed sequence of values per element instance.
    List {
        count_type: ScalarType,
        value_type: ScalarType,
        name: String,
    },
}

impl PropertyDescriptor {
    /// Create a scalar property.
    pub fn scalar(ty: ScalarType, name: impl Into<String>) -> Self {
        Self::Scalar { ty, name: name.into() }
    }

    /// Create a list property.
    pub fn list(count_type: ScalarType, value_type: ScalarType, name: impl Into<String>) -> Self {
        Self::List {
            count_type,
            value_type,
            name: name.into(),
        }
    }

    /// Property name.
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar { name, .. } | Self::List { name, .. } => name,
        }
    }

    /// Type of the stored values (list items for lists).
    pub fn value_type(&self) -> ScalarType {
        match self {
            Self::Scalar { ty, .. } => *ty,
            Self::List { value_type, .. } => *value_type,
        }
    }

    /// Check if this is a list property.
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List { .. })
    }

    /// Parse the tokens following `property` on a header line.
    pub fn from_tokens(tokens: &[&str]) -> Result<Self> {
        let ty = |tag: &str| {
            ScalarType::from_ply_name(tag)
                .ok_or_else(|| Error::malformed(format!("unknown type tag '{}'", tag)))
        };
        match tokens {
            [tag, name] => Ok(Self::scalar(ty(*tag)?, *name)),
            ["list", count, value, name] => {
                let count_type = ty(*count)?;
                if !count_type.is_integer() {
                    return Err(Error::malformed(format!(
                        "list '{}' has non-integer count type {}",
                        name, count_type
                    )));
                }
                Ok(Self::list(count_type, ty(*value)?, *name))
            }
            _ => Err(Error::malformed(format!(
                "property must be (type, name) or (\"list\", count, value, name), got {:?}",
                tokens
            ))),
        }
    }
}

impl fmt::Display for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar { ty, name } => write!(f, "{} {}", ty, name),
            Self::List {
                count_type,
                value_type,
                name,
            } => write!(f, "list {} {} {}", count_type, value_type, name),
        }
    }
}

/// An element: instance count and ordered properties.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElementDescriptor {
    pub size: usize,
    pub properties: SmallVec<[PropertyDescriptor; 4]>,
}

impl ElementDescriptor {
    /// Create an element without properties.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            properties: SmallVec::new(),
        }
    }

    /// Append a property; names must be unique within the element.
    pub fn add_property(&mut self, property: PropertyDescriptor) -> Result<()> {
        if self.property(property.name()).is_some() {
            return Err(Error::malformed(format!(
                "duplicate property '{}'",
                property.name()
            )));
        }
        self.properties.push(property);
        Ok(())
    }

    /// Find a property by name.
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name() == name)
    }

    /// Check if any property is a list.
    pub fn has_list(&self) -> bool {
        self.properties.iter().any(PropertyDescriptor::is_list)
    }

    /// The list property that defines the arity of each instance:
    /// `vertex_indices` (or `vertex_index`) if present, else the first list.
    pub fn primary_list(&self) -> Option<&PropertyDescriptor> {
        self.properties
            .iter()
            .find(|p| p.is_list() && matches!(p.name(), VERTEX_INDICES | "vertex_index"))
            .or_else(|| self.properties.iter().find(|p| p.is_list()))
    }
}

/// Full PLY header: format, comments and ordered elements.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    pub format: Format,
    pub comments: Vec<String>,
    pub elements: IndexMap<String, ElementDescriptor>,
}

impl Header {
    /// Create an empty ASCII 1.0 header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element; names must be unique within the header.
    pub fn add_element(&mut self, name: impl Into<String>, element: ElementDescriptor) -> Result<()> {
        let name = name.into();
        if self.elements.contains_key(&name) {
            return Err(Error::malformed(format!("duplicate element '{}'", name)));
        }
        self.elements.insert(name, element);
        Ok(())
    }

    /// Find an element by name.
    pub fn element(&self, name: &str) -> Option<&ElementDescriptor> {
        self.elements.get(name)
    }

    /// Read a header from PLY text, consuming input through `end_header`.
    pub fn parse_ply<R: BufRead>(reader: &mut R) -> Result<Self> {
        let mut line = String::new();
        reader.read_line(&mut line)?;
        if line.trim_end() != "ply" {
            return Err(Error::invalid_ply("missing 'ply' magic line"));
        }

        let mut header = Header::new();
        let mut format = None;
        let mut current: Option<String> = None;
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Err(Error::invalid_ply("end of input before 'end_header'"));
            }
            let text = line.trim_end_matches(['\r', '\n']);
            let (keyword, rest) = text.split_once(' ').unwrap_or((text, ""));
            match keyword {
                "format" => format = Some(rest.parse::<Format>()?),
                "comment" => header.comments.push(rest.to_string()),
                "obj_info" => header.comments.push(format!("obj_info {}", rest)),
                "element" => {
                    let tokens: Vec<&str> = rest.split_whitespace().collect();
                    let [name, size] = tokens.as_slice() else {
                        return Err(Error::invalid_ply(format!("bad element line '{}'", text)));
                    };
                    let size = size
                        .parse()
                        .map_err(|_| Error::invalid_ply(format!("bad element size '{}'", size)))?;
                    header.add_element(*name, ElementDescriptor::new(size))?;
                    current = Some(name.to_string());
                }
                "property" => {
                    let element = current
                        .as_ref()
                        .and_then(|name| header.elements.get_mut(name))
                        .ok_or_else(|| Error::invalid_ply("property before any element"))?;
                    let tokens: Vec<&str> = rest.split_whitespace().collect();
                    element.add_property(PropertyDescriptor::from_tokens(&tokens)?)?;
                }
                "end_header" => break,
                "" => continue,
                other => {
                    return Err(Error::invalid_ply(format!("unknown header keyword '{}'", other)));
                }
            }
        }
        header.format = format.ok_or_else(|| Error::invalid_ply("missing 'format' line"))?;
        Ok(header)
    }

    /// Render the header as PLY text, ending with `end_header\n`.
    ///
    /// Integer types are written with their sized names (`uint8`, `int32`, ...)
    /// and floats as `float` / `double`, so aliases such as `uchar`, `int` or
    /// `float32` read by [`Header::parse_ply`] come back in that form.
    pub fn to_ply_string(&self) -> String {
        let mut lines = vec!["ply".to_string(), format!("format {}", self.format)];
        lines.extend(self.comments.iter().map(|c| format!("comment {}", c)));
        for (name, element) in &self.elements {
            lines.push(format!("element {} {}", name, element.size));
            lines.extend(element.properties.iter().map(|p| format!("property {}", p)));
        }
        lines.push("end_header\n".to_string());
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const CUBE_HEADER: &str = "ply
format ascii 1.0
comment made by Greg Turk
comment this file is a cube
element vertex 8
property float x
property float y
property float z
property float color
element face 6
property list uint8 int32 vertex_indices
end_header
";

    #[test]
    fn test_parse_header() {
        let header = Header::parse_ply(&mut Cursor::new(CUBE_HEADER)).unwrap();
        assert_eq!(header.format, Format::default());
        assert_eq!(header.comments, vec!["made by Greg Turk", "this file is a cube"]);
        let names: Vec<&String> = header.elements.keys().collect();
        assert_eq!(names, vec!["vertex", "face"]);

        let vertex = header.element("vertex").unwrap();
        assert_eq!(vertex.size, 8);
        assert_eq!(vertex.properties[3], PropertyDescriptor::scalar(ScalarType::Float32, "color"));
        assert!(!vertex.has_list());

        let face = header.element("face").unwrap();
        assert_eq!(face.size, 6);
        assert_eq!(
            face.primary_list(),
            Some(&PropertyDescriptor::list(ScalarType::Uint8, ScalarType::Int32, "vertex_indices"))
        );
    }

    #[test]
    fn test_header_text_roundtrip() {
        let header = Header::parse_ply(&mut Cursor::new(CUBE_HEADER)).unwrap();
        assert_eq!(header.to_ply_string(), CUBE_HEADER);
    }

    #[test]
    fn test_legacy_names_and_crlf() {
        let text = "ply\r\nformat binary_little_endian 1.0\r\nelement vertex 1\r\nproperty uchar red\r\nend_header\r\n";
        let header = Header::parse_ply(&mut Cursor::new(text)).unwrap();
        assert_eq!(header.format.encoding, Encoding::BinaryLittleEndian);
        assert_eq!(
            header.element("vertex").unwrap().properties[0],
            PropertyDescriptor::scalar(ScalarType::Uint8, "red")
        );
    }

    #[test]
    fn test_legacy_names_text_roundtrip() {
        let legacy = "ply
format ascii 1.0
element vertex 2
property double x
property uchar red
property short s
property uint id
property float32 w
element face 1
property list uchar int vertex_indices
end_header
";
        let sized = "ply
format ascii 1.0
element vertex 2
property double x
property uint8 red
property int16 s
property uint32 id
property float w
element face 1
property list uint8 int32 vertex_indices
end_header
";
        let header = Header::parse_ply(&mut Cursor::new(legacy)).unwrap();
        assert_eq!(header.to_ply_string(), sized);
        let again = Header::parse_ply(&mut Cursor::new(sized)).unwrap();
        assert_eq!(again, header);
        assert_eq!(again.to_ply_string(), sized);
    }

    #[test]
    fn test_parse_errors() {
        let bad = |text: &str| Header::parse_ply(&mut Cursor::new(text.to_string()));
        assert!(matches!(bad("obj\n"), Err(Error::InvalidPly(_))));
        assert!(bad("ply\nformat ascii 1.0\n").is_err());
        assert!(bad("ply\nformat ascii 1.0\nproperty float x\nend_header\n").is_err());
        assert!(bad("ply\nelement vertex 1\nend_header\n").is_err());
        assert!(matches!(
            bad("ply\nformat ascii 1.0\nelement v 1\nproperty float x\nproperty float x\nend_header\n"),
            Err(Error::MalformedHeader(_))
        ));
        assert!(bad("ply\nformat ascii 1.0\nelement f 1\nproperty list float int a\nend_header\n").is_err());
    }

    #[test]
    fn test_format() {
        assert_eq!("ascii 1.0".parse::<Format>().unwrap(), Format::default());
        assert_eq!(
            "binary_big_endian 1.0".parse::<Format>().unwrap().to_string(),
            "binary_big_endian 1.0"
        );
        assert!("".parse::<Format>().is_err());
        assert!("ascii".parse::<Format>().is_err());
        assert!("xml 1.0".parse::<Format>().is_err());
    }
}
