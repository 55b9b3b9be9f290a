//! Header codec: mesh -> header, and header <-> JSON attributes object.
//!
//! The attributes object is the interchange format and its key names are
//! fixed:
//!
//! ```json
//! {
//!   "format": "ascii 1.0",
//!   "comments": ["created by ply-zarr v0.1.0, ..."],
//!   "elements": {
//!     "vertex": {"size": 8, "properties": [["double", "x"], ["double", "y"], ["double", "z"]]},
//!     "face": {"size": 12, "properties": [["list", "uint8", "int32", "vertex_indices"]]}
//!   }
//! }
//! ```

use serde_json::{json, Map, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use super::header::*;
use crate::mesh::{Mesh, COORDINATE_NAMES};
use crate::store::{check_name, Attributes};
use crate::util::{Error, Result, ScalarType};

/// Type of every coordinate column.
pub const COORDINATE_TYPE: ScalarType = ScalarType::Float64;

/// Type of cell corner indices.
pub const INDEX_TYPE: ScalarType = ScalarType::Int32;

/// Type of the per-cell corner count.
pub const COUNT_TYPE: ScalarType = ScalarType::Uint8;

/// Largest arity representable with [`COUNT_TYPE`].
pub const MAX_ARITY: usize = u8::MAX as usize;

/// Provenance comment written into every derived header.
pub fn provenance_comment() -> String {
    let now = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string());
    format!(
        "created by {} v{}, {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        now
    )
}

/// Check if `comment` is a provenance comment written by this crate.
pub fn is_provenance(comment: &str) -> bool {
    comment.starts_with(concat!("created by ", env!("CARGO_PKG_NAME"), " "))
}

/// Data names become array names in the store.
fn check_data_name(kind: &str, name: &str) -> Result<()> {
    check_name(name).map_err(|_| Error::invalid_mesh(format!("{} name '{}' cannot be stored", kind, name)))
}

/// Derive the header describing `mesh`.
///
/// Emits a `vertex` element (coordinates, then point data) and, if the
/// mesh has cells, a `face` element (`vertex_indices`, then cell data).
pub fn derive_header(mesh: &Mesh) -> Result<Header> {
    if mesh.points.is_empty() || mesh.num_points() == 0 {
        return Err(Error::EmptyMesh);
    }
    for block in &mesh.cells {
        let arity = block.arity();
        if block.cell_type.is_volume() || arity == 0 || arity > MAX_ARITY {
            return Err(Error::UnsupportedCellType(block.cell_type.to_string()));
        }
        if block.data.len() % arity != 0 {
            return Err(Error::UnsupportedCellType(format!(
                "{} block with {} indices",
                block.cell_type,
                block.data.len()
            )));
        }
    }
    mesh.validate()?;

    let mut header = Header::new();
    header.comments.push(provenance_comment());

    let mut vertex = ElementDescriptor::new(mesh.num_points());
    for name in &COORDINATE_NAMES[..mesh.dim] {
        vertex.add_property(PropertyDescriptor::scalar(COORDINATE_TYPE, *name))?;
    }
    for (name, column) in &mesh.point_data {
        check_data_name("point data", name)?;
        vertex
            .add_property(PropertyDescriptor::scalar(column.scalar_type(), name.as_str()))
            .map_err(|_| Error::invalid_mesh(format!("duplicate point data '{}'", name)))?;
    }
    header.add_element(VERTEX_ELEMENT, vertex)?;

    let num_cells = mesh.num_cells();
    if num_cells > 0 {
        let mut face = ElementDescriptor::new(num_cells);
        face.add_property(PropertyDescriptor::list(COUNT_TYPE, INDEX_TYPE, VERTEX_INDICES))?;
        for (name, columns) in &mesh.cell_data {
            check_data_name("cell data", name)?;
            let ty = columns
                .first()
                .map(|c| c.scalar_type())
                .ok_or_else(|| Error::invalid_mesh(format!("cell data '{}' has no columns", name)))?;
            if columns.iter().any(|c| c.scalar_type() != ty) {
                return Err(Error::invalid_mesh(format!(
                    "cell data '{}' mixes value types across blocks",
                    name
                )));
            }
            face.add_property(PropertyDescriptor::scalar(ty, name.as_str()))
                .map_err(|_| Error::invalid_mesh(format!("cell data '{}' collides with {}", name, VERTEX_INDICES)))?;
        }
        header.add_element(FACE_ELEMENT, face)?;
    }

    Ok(header)
}

fn property_to_json(property: &PropertyDescriptor) -> Value {
    match property {
        PropertyDescriptor::Scalar { ty, name } => json!([ty.ply_name(), name]),
        PropertyDescriptor::List {
            count_type,
            value_type,
            name,
        } => json!(["list", count_type.ply_name(), value_type.ply_name(), name]),
    }
}

/// Serialize a header into a JSON attributes object.
pub fn serialize(header: &Header) -> Attributes {
    let mut elements = Map::new();
    for (name, element) in &header.elements {
        let properties: Vec<Value> = element.properties.iter().map(property_to_json).collect();
        elements.insert(
            name.clone(),
            json!({ "size": element.size, "properties": properties }),
        );
    }

    let mut attrs = Attributes::new();
    attrs.insert("format".into(), Value::String(header.format.to_string()));
    attrs.insert("comments".into(), json!(header.comments));
    attrs.insert("elements".into(), Value::Object(elements));
    attrs
}

fn property_from_json(element: &str, value: &Value) -> Result<PropertyDescriptor> {
    let items = value.as_array().ok_or_else(|| {
        Error::malformed(format!("property of '{}' is not a tuple: {}", element, value))
    })?;
    let tokens = items
        .iter()
        .map(|item| item.as_str())
        .collect::<Option<Vec<&str>>>()
        .ok_or_else(|| {
            Error::malformed(format!("property of '{}' has non-string items: {}", element, value))
        })?;
    PropertyDescriptor::from_tokens(&tokens)
        .map_err(|e| Error::malformed(format!("element '{}': {}", element, e)))
}

fn element_from_json(name: &str, value: &Value) -> Result<ElementDescriptor> {
    let size = match value.get("size") {
        None => return Err(Error::malformed(format!("element '{}' has no size", name))),
        Some(size) => match (size.as_u64(), size.as_i64()) {
            (Some(n), _) => n as usize,
            (None, Some(n)) => {
                return Err(Error::malformed(format!("element '{}' has negative size {}", name, n)));
            }
            _ => {
                return Err(Error::malformed(format!(
                    "element '{}' has non-integer size {}",
                    name, size
                )));
            }
        },
    };
    let properties = value
        .get("properties")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::malformed(format!("element '{}' has no properties list", name)))?;

    let mut element = ElementDescriptor::new(size);
    for property in properties {
        element
            .add_property(property_from_json(name, property)?)
            .map_err(|e| Error::malformed(format!("element '{}': {}", name, e)))?;
    }
    Ok(element)
}

/// Deserialize a header from a JSON attributes object.
pub fn deserialize(attrs: &Attributes) -> Result<Header> {
    let format = attrs
        .get("format")
        .ok_or_else(|| Error::malformed("missing 'format'"))?
        .as_str()
        .ok_or_else(|| Error::malformed("'format' is not a string"))?
        .parse::<Format>()?;

    let comments = match attrs.get("comments") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|c| c.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::malformed("'comments' holds non-string items"))?,
        Some(_) => return Err(Error::malformed("'comments' is not a list")),
    };

    let elements = attrs
        .get("elements")
        .ok_or_else(|| Error::malformed("missing 'elements'"))?
        .as_object()
        .ok_or_else(|| Error::malformed("'elements' is not an object"))?;

    let mut header = Header {
        format,
        comments,
        ..Default::default()
    };
    for (name, value) in elements {
        header.add_element(name.as_str(), element_from_json(name, value)?)?;
    }
    Ok(header)
}

impl Header {
    /// Serialize into a JSON attributes object.
    pub fn to_attrs(&self) -> Attributes {
        serialize(self)
    }

    /// Deserialize from a JSON attributes object.
    pub fn from_attrs(attrs: &Attributes) -> Result<Self> {
        deserialize(attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::tests::unit_cube;
    use crate::mesh::{CellBlock, CellType};
    use crate::util::Column;
    use std::collections::HashSet;

    fn attrs(value: Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_derive_cube() {
        let header = derive_header(&unit_cube()).unwrap();
        assert!(header.comments[0].starts_with("created by ply-zarr v"));

        let vertex = header.element(VERTEX_ELEMENT).unwrap();
        assert_eq!(vertex.size, 8);
        let names: Vec<&str> = vertex.properties.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
        assert!(vertex.properties.iter().all(|p| p.value_type() == ScalarType::Float64));

        let face = header.element(FACE_ELEMENT).unwrap();
        assert_eq!(face.size, 12);
        assert_eq!(
            face.properties[0],
            PropertyDescriptor::list(ScalarType::Uint8, ScalarType::Int32, VERTEX_INDICES)
        );
    }

    #[test]
    fn test_derive_point_and_cell_data() {
        let mesh = unit_cube()
            .with_point_data("color", vec![0.5f32; 8])
            .with_cell_data("region", vec![Column::from(vec![3u16; 12])]);
        let header = derive_header(&mesh).unwrap();
        let vertex = header.element(VERTEX_ELEMENT).unwrap();
        assert_eq!(vertex.properties[3], PropertyDescriptor::scalar(ScalarType::Float32, "color"));
        let face = header.element(FACE_ELEMENT).unwrap();
        assert_eq!(face.properties[1], PropertyDescriptor::scalar(ScalarType::Uint16, "region"));

        // names are unique within each element and across elements
        for element in header.elements.values() {
            let names: HashSet<&str> = element.properties.iter().map(|p| p.name()).collect();
            assert_eq!(names.len(), element.properties.len());
        }
    }

    #[test]
    fn test_derive_errors() {
        let empty = Mesh::new(Vec::new(), 3, Vec::new());
        assert!(matches!(derive_header(&empty), Err(Error::EmptyMesh)));

        let mut mesh = unit_cube();
        mesh.cells.push(CellBlock::new(CellType::Tetra, vec![0, 1, 2, 3]));
        assert!(matches!(derive_header(&mesh), Err(Error::UnsupportedCellType(_))));

        let mut mesh = unit_cube();
        mesh.cells.push(CellBlock::new(CellType::Polygon(300), vec![0; 300]));
        assert!(matches!(derive_header(&mesh), Err(Error::UnsupportedCellType(_))));

        let mesh = unit_cube().with_cell_data(VERTEX_INDICES, vec![Column::from(vec![0i32; 12])]);
        assert!(matches!(derive_header(&mesh), Err(Error::InvalidMesh(_))));
    }

    #[test]
    fn test_derive_rejects_unstorable_names() {
        for name in ["a/b", "..", ".", ".zattrs", ""] {
            let mesh = unit_cube().with_point_data(name, vec![0.5f32; 8]);
            assert!(matches!(derive_header(&mesh), Err(Error::InvalidMesh(_))), "{:?}", name);
            let mesh = unit_cube().with_cell_data(name, vec![Column::from(vec![1u8; 12])]);
            assert!(matches!(derive_header(&mesh), Err(Error::InvalidMesh(_))), "{:?}", name);
        }
    }

    #[test]
    fn test_is_provenance() {
        assert!(is_provenance(&provenance_comment()));
        assert!(is_provenance("created by ply-zarr v0.0.1, 2020-01-01T00:00:00Z"));
        assert!(!is_provenance("created by hand"));
        assert!(!is_provenance("unit cube"));
    }

    #[test]
    fn test_point_cloud_has_no_face() {
        let mesh = Mesh::new(vec![0.0, 1.0, 2.0, 3.0], 2, Vec::new());
        let header = derive_header(&mesh).unwrap();
        assert_eq!(header.elements.len(), 1);
        let names: Vec<&str> = header.elements[VERTEX_ELEMENT].properties.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn test_serialize_shape() {
        let header = derive_header(&unit_cube()).unwrap();
        let attrs = serialize(&header);
        let keys: Vec<&String> = attrs.keys().collect();
        assert_eq!(keys, vec!["format", "comments", "elements"]);
        assert_eq!(attrs["format"], "ascii 1.0");
        assert_eq!(attrs["elements"]["vertex"]["size"], 8);
        assert_eq!(attrs["elements"]["vertex"]["properties"][0], json!(["double", "x"]));
        assert_eq!(
            attrs["elements"]["face"]["properties"][0],
            json!(["list", "uint8", "int32", "vertex_indices"])
        );
    }

    #[test]
    fn test_header_roundtrip() {
        let mesh = unit_cube()
            .with_point_data("intensity", vec![1i64; 8])
            .with_cell_data("flag", vec![Column::from(vec![1i8; 12])]);
        let header = derive_header(&mesh).unwrap();
        assert_eq!(deserialize(&serialize(&header)).unwrap(), header);

        // through JSON text as well, keeping element and property order
        let text = serde_json::to_string(&header.to_attrs()).unwrap();
        let parsed: Attributes = serde_json::from_str(&text).unwrap();
        assert_eq!(Header::from_attrs(&parsed).unwrap(), header);
    }

    #[test]
    fn test_deserialize_errors() {
        let missing_elements = attrs(json!({ "format": "ascii 1.0", "comments": [] }));
        assert!(matches!(deserialize(&missing_elements), Err(Error::MalformedHeader(_))));

        let missing_format = attrs(json!({ "elements": {} }));
        assert!(matches!(deserialize(&missing_format), Err(Error::MalformedHeader(_))));

        let negative = attrs(json!({
            "format": "ascii 1.0",
            "elements": { "vertex": { "size": -1, "properties": [] } }
        }));
        assert!(matches!(deserialize(&negative), Err(Error::MalformedHeader(_))));

        let three_tuple = attrs(json!({
            "format": "ascii 1.0",
            "elements": { "face": { "size": 1, "properties": [["uint8", "int32", "vertex_indices"]] } }
        }));
        assert!(matches!(deserialize(&three_tuple), Err(Error::MalformedHeader(_))));

        let bad_tag = attrs(json!({
            "format": "ascii 1.0",
            "elements": { "vertex": { "size": 1, "properties": [["complex", "x"]] } }
        }));
        assert!(matches!(deserialize(&bad_tag), Err(Error::MalformedHeader(_))));

        let not_list = attrs(json!({
            "format": "ascii 1.0",
            "elements": { "face": { "size": 1, "properties": [["array", "uint8", "int32", "v"]] } }
        }));
        assert!(matches!(deserialize(&not_list), Err(Error::MalformedHeader(_))));

        let duplicate = attrs(json!({
            "format": "ascii 1.0",
            "elements": { "vertex": { "size": 1, "properties": [["float", "x"], ["double", "x"]] } }
        }));
        assert!(matches!(deserialize(&duplicate), Err(Error::MalformedHeader(_))));
    }

    #[test]
    fn test_deserialize_without_comments() {
        let attrs = attrs(json!({
            "format": "ascii 1.0",
            "elements": { "vertex": { "size": 2, "properties": [["float", "x"]] } }
        }));
        let header = deserialize(&attrs).unwrap();
        assert!(header.comments.is_empty());
        assert_eq!(header.elements[VERTEX_ELEMENT].size, 2);
    }
}
