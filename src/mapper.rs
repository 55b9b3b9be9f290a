//! Array mapper: lays a header's elements out as groups and arrays.
//!
//! - scalar-only elements get one group (`vertex` lives in `points`) with
//!   one 1-D array per property
//! - the list-bearing element (`face`) is split by arity into sibling
//!   groups named `3`, `4`, ... holding a `(rows, arity)` array per list
//!   and a 1-D array per scalar property
//!
//! Cells sharing an arity are concatenated in input order. Cells of
//! different arities come back grouped by ascending arity.

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::mesh::{CellBlock, CellType, Mesh, COORDINATE_NAMES};
use crate::ply::{ElementDescriptor, Header, PropertyDescriptor, VERTEX_ELEMENT};
use crate::store::{check_name, join_key, Array, ArrayOptions, Group};
use crate::util::{Column, Error, Result};

/// Group holding the `vertex` element.
pub const POINTS_GROUP: &str = "points";

/// Rows of one element as read from a store or a PLY body.
#[derive(Clone, Debug, PartialEq)]
pub enum RawElement {
    /// One column per scalar property, in header order.
    Columns(IndexMap<String, Column>),
    /// Rows of a list-bearing element, in blocks of uniform arity.
    Lists(Vec<ArityBlock>),
}

impl RawElement {
    /// Number of rows.
    pub fn rows(&self) -> usize {
        match self {
            Self::Columns(columns) => columns.values().next().map_or(0, Column::len),
            Self::Lists(blocks) => blocks.iter().map(|b| b.rows).sum(),
        }
    }
}

/// Rows of a list-bearing element that all share one list length.
///
/// List columns hold `rows * arity` flattened values, scalar columns hold
/// `rows` values.
#[derive(Clone, Debug, PartialEq)]
pub struct ArityBlock {
    pub arity: usize,
    pub rows: usize,
    pub columns: IndexMap<String, Column>,
}

/// Raw per-element columns, keyed by element name in header order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawElements {
    pub elements: IndexMap<String, RawElement>,
}

/// Group name of a scalar-only element.
pub fn element_group_name(element: &str) -> &str {
    if element == VERTEX_ELEMENT {
        POINTS_GROUP
    } else {
        element
    }
}

fn is_arity_name(name: &str) -> bool {
    name.parse::<usize>().is_ok_and(|n| n.to_string() == name)
}

/// Check that a header can be laid out; returns the list-bearing element.
///
/// At most one element may carry lists, and scalar element groups must
/// neither collide with each other nor look like arity groups.
pub fn check_layout(header: &Header) -> Result<Option<&str>> {
    let mut list_element = None;
    let mut groups = HashSet::new();
    for (name, element) in &header.elements {
        if element.has_list() {
            if let Some(first) = list_element.replace(name.as_str()) {
                return Err(Error::malformed(format!(
                    "elements '{}' and '{}' both carry lists",
                    first, name
                )));
            }
            continue;
        }
        let group = element_group_name(name);
        check_name(group).map_err(|_| Error::malformed(format!("element name '{}' is not storable", name)))?;
        if is_arity_name(group) {
            return Err(Error::malformed(format!(
                "element name '{}' clashes with arity groups",
                name
            )));
        }
        if !groups.insert(group) {
            return Err(Error::malformed(format!(
                "element '{}' maps onto an existing group '{}'",
                name, group
            )));
        }
    }
    Ok(list_element)
}

// ============================================================================
// Writing
// ============================================================================

fn vertex_column(mesh: &Mesh, property: &PropertyDescriptor) -> Result<Column> {
    let name = property.name();
    let column = match COORDINATE_NAMES.iter().position(|c| *c == name) {
        Some(axis) if axis < mesh.dim => Column::from(mesh.coordinate(axis)),
        _ => mesh
            .point_data
            .get(name)
            .cloned()
            .ok_or_else(|| Error::invalid_mesh(format!("mesh has no point data '{}'", name)))?,
    };
    if column.scalar_type() != property.value_type() {
        return Err(Error::invalid_mesh(format!(
            "vertex property '{}' is declared {} but holds {}",
            name,
            property.value_type(),
            column.scalar_type()
        )));
    }
    Ok(column)
}

fn write_scalar_element(
    group: &Group,
    mesh: &Mesh,
    name: &str,
    element: &ElementDescriptor,
    options: &ArrayOptions,
) -> Result<()> {
    if name != VERTEX_ELEMENT {
        return Err(Error::invalid_mesh(format!("mesh has no data for element '{}'", name)));
    }
    let sub = group.require_group(element_group_name(name))?;
    for property in &element.properties {
        let column = vertex_column(mesh, property)?;
        if column.len() != element.size {
            return Err(Error::SizeMismatch {
                element: name.to_string(),
                declared: element.size,
                found: column.len(),
            });
        }
        let array = sub.create_array_from_column(property.name(), &[element.size], &column, options)?;
        debug!(path = array.path(), ty = %array.scalar_type(), rows = element.size, "wrote array");
    }
    Ok(())
}

fn write_list_element(
    group: &Group,
    mesh: &Mesh,
    name: &str,
    element: &ElementDescriptor,
    options: &ArrayOptions,
) -> Result<()> {
    let primary = element
        .primary_list()
        .ok_or_else(|| Error::malformed(format!("element '{}' has no list", name)))?;
    if primary.value_type() != crate::ply::INDEX_TYPE {
        return Err(Error::invalid_mesh(format!(
            "list '{}' must hold {}, header declares {}",
            primary.name(),
            crate::ply::INDEX_TYPE,
            primary.value_type()
        )));
    }
    if mesh.num_cells() != element.size {
        return Err(Error::SizeMismatch {
            element: name.to_string(),
            declared: element.size,
            found: mesh.num_cells(),
        });
    }

    let mut by_arity: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (index, block) in mesh.cells.iter().enumerate() {
        by_arity.entry(block.arity()).or_default().push(index);
    }

    for (arity, blocks) in by_arity {
        let sub = group.require_group(&arity.to_string())?;
        let rows: usize = blocks.iter().map(|&b| mesh.cells[b].len()).sum();
        for property in &element.properties {
            let array = if property == primary {
                let data: Vec<i32> = blocks
                    .iter()
                    .flat_map(|&b| mesh.cells[b].data.iter().copied())
                    .collect();
                sub.create_array(property.name(), &[rows, arity], &data, options)?
            } else if property.is_list() {
                return Err(Error::invalid_mesh(format!(
                    "mesh has no data for list '{}'",
                    property.name()
                )));
            } else {
                let columns = mesh.cell_data.get(property.name()).ok_or_else(|| {
                    Error::invalid_mesh(format!("mesh has no cell data '{}'", property.name()))
                })?;
                let mut column = Column::with_capacity(property.value_type(), rows);
                for &b in &blocks {
                    let part = columns.get(b).ok_or_else(|| {
                        Error::invalid_mesh(format!("cell data '{}' misses block {}", property.name(), b))
                    })?;
                    column.extend_from(part)?;
                }
                sub.create_array_from_column(property.name(), &[rows], &column, options)?
            };
            debug!(path = array.path(), shape = ?array.shape(), "wrote array");
        }
    }
    Ok(())
}

/// Write the arrays described by `header` from `mesh` under `group`.
///
/// Existing arrays are overwritten, so writing the same mesh twice leaves
/// the same content.
pub fn write_arrays(group: &Group, mesh: &Mesh, header: &Header, options: &ArrayOptions) -> Result<()> {
    check_layout(header)?;
    for (name, element) in &header.elements {
        if element.has_list() {
            write_list_element(group, mesh, name, element, options)?;
        } else {
            write_scalar_element(group, mesh, name, element, options)?;
        }
    }
    Ok(())
}

// ============================================================================
// Reading
// ============================================================================

fn missing(element: &str, property: &str, path: String) -> Error {
    Error::MissingArray {
        element: element.to_string(),
        property: property.to_string(),
        path,
    }
}

fn check_shape(array: &Array, expected: &[usize]) -> Result<()> {
    if array.shape() != expected {
        return Err(Error::InvalidMetadata(format!(
            "array '{}' has shape {:?}, expected {:?}",
            array.path(),
            array.shape(),
            expected
        )));
    }
    Ok(())
}

fn read_scalar_element(group: &Group, name: &str, element: &ElementDescriptor) -> Result<RawElement> {
    let group_name = element_group_name(name);
    let group_path = join_key(group.path(), group_name);
    let sub = if group.contains_group(group_name)? {
        Some(group.group(group_name)?)
    } else {
        None
    };

    let mut columns = IndexMap::new();
    for property in &element.properties {
        let property_name = property.name();
        let array = match &sub {
            Some(sub) if sub.contains_array(property_name)? => sub.array(property_name)?,
            _ => return Err(missing(name, property_name, join_key(&group_path, property_name))),
        };
        if array.shape().len() != 1 {
            return Err(Error::InvalidMetadata(format!(
                "array '{}' has rank {}, expected 1",
                array.path(),
                array.shape().len()
            )));
        }
        if array.len() != element.size {
            return Err(Error::SizeMismatch {
                element: name.to_string(),
                declared: element.size,
                found: array.len(),
            });
        }
        columns.insert(property_name.to_string(), array.read_column()?);
    }
    Ok(RawElement::Columns(columns))
}

fn read_list_element(group: &Group, name: &str, element: &ElementDescriptor) -> Result<RawElement> {
    let primary = element
        .primary_list()
        .ok_or_else(|| Error::malformed(format!("element '{}' has no list", name)))?;

    let mut arities: Vec<usize> = group
        .group_keys()?
        .iter()
        .filter(|key| is_arity_name(key))
        .filter_map(|key| key.parse().ok())
        .collect();
    arities.sort_unstable();

    let mut blocks = Vec::with_capacity(arities.len());
    for arity in arities {
        let sub = group.group(&arity.to_string())?;
        if !sub.contains_array(primary.name())? {
            return Err(missing(name, primary.name(), join_key(sub.path(), primary.name())));
        }
        let rows = sub.array(primary.name())?.len();

        let mut columns = IndexMap::new();
        for property in &element.properties {
            if !sub.contains_array(property.name())? {
                return Err(missing(name, property.name(), join_key(sub.path(), property.name())));
            }
            let array = sub.array(property.name())?;
            if property.is_list() {
                check_shape(&array, &[rows, arity])?;
            } else {
                check_shape(&array, &[rows])?;
            }
            columns.insert(property.name().to_string(), array.read_column()?);
        }
        debug!(element = name, arity, rows, "read arity group");
        blocks.push(ArityBlock { arity, rows, columns });
    }

    let found: usize = blocks.iter().map(|b| b.rows).sum();
    if blocks.is_empty() && element.size > 0 {
        return Err(missing(
            name,
            primary.name(),
            join_key(&join_key(group.path(), "<arity>"), primary.name()),
        ));
    }
    if found != element.size {
        return Err(Error::SizeMismatch {
            element: name.to_string(),
            declared: element.size,
            found,
        });
    }
    Ok(RawElement::Lists(blocks))
}

/// Read the raw columns of every element declared in `header`.
pub fn read_arrays(group: &Group, header: &Header) -> Result<RawElements> {
    check_layout(header)?;
    let mut raw = RawElements::default();
    for (name, element) in &header.elements {
        let element_rows = if element.has_list() {
            read_list_element(group, name, element)?
        } else {
            read_scalar_element(group, name, element)?
        };
        raw.elements.insert(name.clone(), element_rows);
    }
    Ok(raw)
}

// ============================================================================
// Assembly
// ============================================================================

fn to_indices(column: &Column) -> Result<Vec<i32>> {
    if let Some(values) = column.as_slice::<i32>() {
        return Ok(values.to_vec());
    }
    column
        .to_f64_vec()
        .into_iter()
        .map(|v| {
            if v.fract() == 0.0 && v >= i32::MIN as f64 && v <= i32::MAX as f64 {
                Ok(v as i32)
            } else {
                Err(Error::invalid_mesh(format!("{} is not a valid point index", v)))
            }
        })
        .collect()
}

fn assemble_points(mesh: &mut Mesh, columns: &IndexMap<String, Column>) -> Result<()> {
    let dim = COORDINATE_NAMES
        .iter()
        .take_while(|c| columns.contains_key(**c))
        .count();
    if dim == 0 {
        return Err(Error::invalid_mesh("vertex element has no 'x' property"));
    }
    let coords: Vec<Vec<f64>> = COORDINATE_NAMES[..dim]
        .iter()
        .map(|c| columns[*c].to_f64_vec())
        .collect();
    let n = coords[0].len();
    if coords.iter().any(|axis| axis.len() != n) {
        return Err(Error::invalid_mesh("coordinate columns differ in length"));
    }
    mesh.dim = dim;
    mesh.points = (0..n).flat_map(|i| coords.iter().map(move |axis| axis[i])).collect();

    for (name, column) in columns {
        if COORDINATE_NAMES[..dim].contains(&name.as_str()) {
            continue;
        }
        if COORDINATE_NAMES.contains(&name.as_str()) {
            return Err(Error::invalid_mesh(format!(
                "coordinate '{}' present without the preceding axes",
                name
            )));
        }
        mesh.point_data.insert(name.clone(), column.clone());
    }
    Ok(())
}

fn assemble_cells(mesh: &mut Mesh, element: &ElementDescriptor, blocks: &[ArityBlock]) -> Result<()> {
    let Some(primary) = element.primary_list() else {
        return Ok(());
    };
    for property in element.properties.iter().filter(|p| p.is_list() && *p != primary) {
        warn!(property = property.name(), "skipping extra list property");
    }

    for block in blocks {
        if block.arity == 0 {
            warn!(rows = block.rows, "skipping cells without corners");
            continue;
        }
        let indices = block
            .columns
            .get(primary.name())
            .ok_or_else(|| Error::invalid_mesh(format!("arity {} block has no '{}'", block.arity, primary.name())))?;
        mesh.cells.push(CellBlock::new(CellType::from_arity(block.arity), to_indices(indices)?));

        for property in element.properties.iter().filter(|p| !p.is_list()) {
            let column = block.columns.get(property.name()).ok_or_else(|| {
                Error::invalid_mesh(format!("arity {} block has no '{}'", block.arity, property.name()))
            })?;
            mesh.cell_data
                .entry(property.name().to_string())
                .or_default()
                .push(column.clone());
        }
    }
    Ok(())
}

/// Recombine raw element columns into a mesh.
///
/// `x`, `y`, `z` of the `vertex` element become the points and its other
/// columns point data; each arity block of the list-bearing element
/// becomes one cell block, with its scalar columns as cell data. Other
/// elements are ignored.
pub fn assemble_mesh(raw: &RawElements, header: &Header) -> Result<Mesh> {
    let mut mesh = Mesh::default();
    match raw.elements.get(VERTEX_ELEMENT) {
        Some(RawElement::Columns(columns)) => assemble_points(&mut mesh, columns)?,
        Some(RawElement::Lists(_)) => {
            return Err(Error::malformed("element 'vertex' carries a list"));
        }
        None => return Err(Error::malformed("header has no 'vertex' element")),
    }

    for (name, element) in &header.elements {
        match raw.elements.get(name) {
            Some(RawElement::Lists(blocks)) => assemble_cells(&mut mesh, element, blocks)?,
            Some(RawElement::Columns(_)) if name != VERTEX_ELEMENT => {
                debug!(element = name.as_str(), "element not mapped onto the mesh");
            }
            _ => {}
        }
    }

    mesh.validate()?;
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::tests::unit_cube;
    use crate::ply::{derive_header, ElementDescriptor};
    use crate::util::ScalarType;

    fn mixed() -> Mesh {
        Mesh::new(
            (0..18).map(f64::from).collect(),
            3,
            vec![
                CellBlock::from_cells(CellType::Quad, &[[0, 1, 2, 3]]),
                CellBlock::from_cells(CellType::Triangle, &[[0, 1, 2], [3, 4, 5]]),
                CellBlock::from_cells(CellType::Quad, &[[2, 3, 4, 5]]),
            ],
        )
    }

    #[test]
    fn test_cube_layout() {
        let root = Group::in_memory().unwrap();
        let mesh = unit_cube();
        let header = derive_header(&mesh).unwrap();
        write_arrays(&root, &mesh, &header, &ArrayOptions::default()).unwrap();

        assert_eq!(root.group_keys().unwrap(), vec!["3", "points"]);
        let points = root.group("points").unwrap();
        assert_eq!(points.array_keys().unwrap(), vec!["x", "y", "z"]);
        assert_eq!(points.array("x").unwrap().shape(), &[8]);
        let tri = root.group("3").unwrap().array("vertex_indices").unwrap();
        assert_eq!(tri.shape(), &[12, 3]);
        assert_eq!(tri.scalar_type(), ScalarType::Int32);

        let raw = read_arrays(&root, &header).unwrap();
        // size invariant
        for (name, element) in &header.elements {
            assert_eq!(raw.elements[name].rows(), element.size);
        }
        assert_eq!(assemble_mesh(&raw, &header).unwrap(), mesh);
    }

    #[test]
    fn test_mixed_arity_grouped_ascending() {
        let root = Group::in_memory().unwrap();
        let mesh = mixed().with_cell_data(
            "id",
            vec![Column::from(vec![0u32]), Column::from(vec![1u32, 2]), Column::from(vec![3u32])],
        );
        let header = derive_header(&mesh).unwrap();
        write_arrays(&root, &mesh, &header, &ArrayOptions::default()).unwrap();
        assert_eq!(root.group_keys().unwrap(), vec!["3", "4", "points"]);

        let quads = root.group("4").unwrap();
        assert_eq!(quads.array("vertex_indices").unwrap().read::<i32>().unwrap(), vec![0, 1, 2, 3, 2, 3, 4, 5]);
        assert_eq!(quads.array("id").unwrap().read::<u32>().unwrap(), vec![0, 3]);

        let back = assemble_mesh(&read_arrays(&root, &header).unwrap(), &header).unwrap();
        let types: Vec<CellType> = back.cells.iter().map(|b| b.cell_type).collect();
        assert_eq!(types, vec![CellType::Triangle, CellType::Quad]);
        assert_eq!(back.cells[1].data, vec![0, 1, 2, 3, 2, 3, 4, 5]);
        assert_eq!(back.cell_data["id"], vec![Column::from(vec![1u32, 2]), Column::from(vec![0u32, 3])]);
    }

    #[test]
    fn test_arity_groups_sort_numerically() {
        let root = Group::in_memory().unwrap();
        let mesh = Mesh::new(
            (0..30).map(f64::from).collect(),
            3,
            vec![
                CellBlock::new(CellType::Polygon(10), (0..10).collect()),
                CellBlock::from_cells(CellType::Triangle, &[[0, 1, 2]]),
            ],
        );
        let header = derive_header(&mesh).unwrap();
        write_arrays(&root, &mesh, &header, &ArrayOptions::default()).unwrap();
        let raw = read_arrays(&root, &header).unwrap();
        let RawElement::Lists(blocks) = &raw.elements["face"] else {
            panic!("face should be a list element");
        };
        let arities: Vec<usize> = blocks.iter().map(|b| b.arity).collect();
        assert_eq!(arities, vec![3, 10]);
    }

    #[test]
    fn test_missing_array() {
        let root = Group::in_memory().unwrap();
        let mesh = unit_cube();
        let header = derive_header(&mesh).unwrap();
        write_arrays(&root, &mesh, &header, &ArrayOptions::default()).unwrap();
        root.group("points").unwrap().remove("y").unwrap();

        match read_arrays(&root, &header) {
            Err(Error::MissingArray { element, property, path }) => {
                assert_eq!(element, "vertex");
                assert_eq!(property, "y");
                assert_eq!(path, "points/y");
            }
            other => panic!("expected MissingArray, got {:?}", other.map(|_| ())),
        }

        root.remove("3").unwrap();
        root.group("points").unwrap().create_array("y", &[8], &[0.0f64; 8], &ArrayOptions::default()).unwrap();
        assert!(matches!(read_arrays(&root, &header), Err(Error::MissingArray { .. })));
    }

    #[test]
    fn test_size_mismatch() {
        let root = Group::in_memory().unwrap();
        let mesh = unit_cube();
        let mut header = derive_header(&mesh).unwrap();
        write_arrays(&root, &mesh, &header, &ArrayOptions::default()).unwrap();
        header.elements["face"].size = 11;
        assert!(matches!(
            read_arrays(&root, &header),
            Err(Error::SizeMismatch { declared: 11, found: 12, .. })
        ));
        assert!(matches!(
            write_arrays(&root, &mesh, &header, &ArrayOptions::default()),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_idempotent() {
        let root = Group::in_memory().unwrap();
        let mesh = mixed();
        let header = derive_header(&mesh).unwrap();
        let opts = ArrayOptions::default();
        write_arrays(&root, &mesh, &header, &opts).unwrap();
        let first = root.tree().unwrap();
        write_arrays(&root, &mesh, &header, &opts).unwrap();
        assert_eq!(root.tree().unwrap(), first);
        assert_eq!(root.group("3").unwrap().array("vertex_indices").unwrap().shape(), &[2, 3]);
    }

    #[test]
    fn test_check_layout() {
        let list = || {
            let mut e = ElementDescriptor::new(1);
            e.add_property(PropertyDescriptor::list(ScalarType::Uint8, ScalarType::Int32, "vertex_indices"))
                .unwrap();
            e
        };
        let mut header = Header::new();
        header.add_element("vertex", ElementDescriptor::new(1)).unwrap();
        header.add_element("face", list()).unwrap();
        assert_eq!(check_layout(&header).unwrap(), Some("face"));

        let mut two_lists = header.clone();
        two_lists.add_element("edge", list()).unwrap();
        assert!(matches!(check_layout(&two_lists), Err(Error::MalformedHeader(_))));

        let mut numeric = header.clone();
        numeric.add_element("3", ElementDescriptor::new(1)).unwrap();
        assert!(check_layout(&numeric).is_err());

        let mut clash = header.clone();
        clash.add_element("points", ElementDescriptor::new(1)).unwrap();
        assert!(check_layout(&clash).is_err());
    }

    #[test]
    fn test_assemble_converts_index_types() {
        let mut header = Header::new();
        let mut vertex = ElementDescriptor::new(3);
        vertex.add_property(PropertyDescriptor::scalar(ScalarType::Float32, "x")).unwrap();
        vertex.add_property(PropertyDescriptor::scalar(ScalarType::Float32, "y")).unwrap();
        header.add_element("vertex", vertex).unwrap();
        let mut face = ElementDescriptor::new(1);
        face.add_property(PropertyDescriptor::list(ScalarType::Uint8, ScalarType::Uint32, "vertex_index"))
            .unwrap();
        header.add_element("face", face).unwrap();

        let mut raw = RawElements::default();
        let mut points = IndexMap::new();
        points.insert("x".to_string(), Column::from(vec![0.0f32, 1.0, 0.0]));
        points.insert("y".to_string(), Column::from(vec![0.0f32, 0.0, 1.0]));
        raw.elements.insert("vertex".into(), RawElement::Columns(points));
        let mut columns = IndexMap::new();
        columns.insert("vertex_index".to_string(), Column::from(vec![0u32, 1, 2]));
        raw.elements.insert(
            "face".into(),
            RawElement::Lists(vec![ArityBlock { arity: 3, rows: 1, columns }]),
        );

        let mesh = assemble_mesh(&raw, &header).unwrap();
        assert_eq!(mesh.dim, 2);
        assert_eq!(mesh.points, vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        assert_eq!(mesh.cells, vec![CellBlock::new(CellType::Triangle, vec![0, 1, 2])]);
    }
}
