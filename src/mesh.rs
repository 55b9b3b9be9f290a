//! Mesh value type exchanged at the adapter boundary.
//!
//! A mesh owns its points, point data and cell blocks; nothing aliases the
//! store's buffers.

use glam::DVec3;
use indexmap::IndexMap;
use std::fmt;

use crate::util::{Column, Error, Result};

/// Names of the coordinate columns, by axis.
pub const COORDINATE_NAMES: [&str; 3] = ["x", "y", "z"];

/// Type label of a cell block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellType {
    Vertex,
    Line,
    Triangle,
    Quad,
    /// Polygon with the given number of corners.
    Polygon(usize),
    Tetra,
    Pyramid,
    Wedge,
    Hexahedron,
}

impl CellType {
    /// Surface cell type for a given number of corners.
    pub fn from_arity(arity: usize) -> Self {
        match arity {
            1 => Self::Vertex,
            2 => Self::Line,
            3 => Self::Triangle,
            4 => Self::Quad,
            n => Self::Polygon(n),
        }
    }

    /// Canonical label: `Polygon(3)` is a `Triangle`, `Polygon(4)` a `Quad`, ...
    pub fn normalized(self) -> Self {
        match self {
            Self::Polygon(n) => Self::from_arity(n),
            other => other,
        }
    }

    /// Number of point indices per cell.
    pub fn arity(self) -> usize {
        match self {
            Self::Vertex => 1,
            Self::Line => 2,
            Self::Triangle => 3,
            Self::Quad | Self::Tetra => 4,
            Self::Pyramid => 5,
            Self::Wedge => 6,
            Self::Hexahedron => 8,
            Self::Polygon(n) => n,
        }
    }

    /// Volume cells have no face list encoding.
    pub fn is_volume(self) -> bool {
        matches!(self, Self::Tetra | Self::Pyramid | Self::Wedge | Self::Hexahedron)
    }

    /// Label as used by mesh libraries (`triangle`, `quad`, `polygon`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Line => "line",
            Self::Triangle => "triangle",
            Self::Quad => "quad",
            Self::Polygon(_) => "polygon",
            Self::Tetra => "tetra",
            Self::Pyramid => "pyramid",
            Self::Wedge => "wedge",
            Self::Hexahedron => "hexahedron",
        }
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Polygon(n) => write!(f, "polygon{}", n),
            other => f.write_str(other.name()),
        }
    }
}

/// A block of cells of one type, stored as a flat `len * arity` index list.
///
/// The constructors store the [normalized](CellType::normalized) label, which
/// is also the label a block gets back when read from a store.
#[derive(Clone, Debug, PartialEq)]
pub struct CellBlock {
    pub cell_type: CellType,
    pub data: Vec<i32>,
}

impl CellBlock {
    /// Create a block from flat indices.
    pub fn new(cell_type: CellType, data: Vec<i32>) -> Self {
        Self {
            cell_type: cell_type.normalized(),
            data,
        }
    }

    /// Create a block from per-cell index tuples.
    pub fn from_cells<const N: usize>(cell_type: CellType, cells: &[[i32; N]]) -> Self {
        Self {
            cell_type: cell_type.normalized(),
            data: cells.iter().flatten().copied().collect(),
        }
    }

    /// Indices per cell.
    #[inline]
    pub fn arity(&self) -> usize {
        self.cell_type.arity()
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        match self.arity() {
            0 => 0,
            n => self.data.len() / n,
        }
    }

    /// Check if the block has no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over cells as index slices.
    pub fn cells(&self) -> impl Iterator<Item = &[i32]> + '_ {
        self.data.chunks_exact(self.arity().max(1))
    }
}

/// Polygon mesh with typed per-point and per-cell attributes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    /// Row-major coordinates, `dim` values per point.
    pub points: Vec<f64>,
    /// Coordinates per point (1 to 3).
    pub dim: usize,
    /// Per-point columns, in declaration order.
    pub point_data: IndexMap<String, Column>,
    /// Cell blocks, in declaration order.
    pub cells: Vec<CellBlock>,
    /// Per-cell columns: one column per cell block.
    pub cell_data: IndexMap<String, Vec<Column>>,
}

impl Mesh {
    /// Create a mesh from row-major coordinates and cell blocks.
    pub fn new(points: Vec<f64>, dim: usize, cells: Vec<CellBlock>) -> Self {
        Self {
            points,
            dim,
            cells,
            ..Default::default()
        }
    }

    /// Create a 3D mesh from points.
    pub fn from_dvec3(points: &[DVec3], cells: Vec<CellBlock>) -> Self {
        let flat = points.iter().flat_map(|p| p.to_array()).collect();
        Self::new(flat, 3, cells)
    }

    /// Attach a per-point column.
    pub fn with_point_data(mut self, name: impl Into<String>, column: impl Into<Column>) -> Self {
        self.point_data.insert(name.into(), column.into());
        self
    }

    /// Attach a per-cell attribute (one column per cell block).
    pub fn with_cell_data(mut self, name: impl Into<String>, columns: Vec<Column>) -> Self {
        self.cell_data.insert(name.into(), columns);
        self
    }

    /// Number of points.
    pub fn num_points(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.points.len() / self.dim
        }
    }

    /// Total number of cells over all blocks.
    pub fn num_cells(&self) -> usize {
        self.cells.iter().map(CellBlock::len).sum()
    }

    /// Coordinate `axis` of every point.
    pub fn coordinate(&self, axis: usize) -> Vec<f64> {
        self.points
            .iter()
            .skip(axis)
            .step_by(self.dim.max(1))
            .copied()
            .collect()
    }

    /// Point `i` padded to 3D.
    pub fn point(&self, i: usize) -> DVec3 {
        let mut p = [0.0; 3];
        for (axis, value) in p.iter_mut().enumerate().take(self.dim) {
            *value = self.points[i * self.dim + axis];
        }
        DVec3::from_array(p)
    }

    /// Axis-aligned bounds, `None` for a mesh without points.
    pub fn bounds(&self) -> Option<(DVec3, DVec3)> {
        let n = self.num_points();
        if n == 0 {
            return None;
        }
        let first = self.point(0);
        Some((1..n).map(|i| self.point(i)).fold((first, first), |(lo, hi), p| {
            (lo.min(p), hi.max(p))
        }))
    }

    /// Check structural consistency: dimension, flat lengths, column lengths
    /// and index ranges.
    pub fn validate(&self) -> Result<()> {
        if !(1..=3).contains(&self.dim) {
            return Err(Error::invalid_mesh(format!(
                "points must have 1 to 3 coordinates, got {}",
                self.dim
            )));
        }
        if self.points.len() % self.dim != 0 {
            return Err(Error::invalid_mesh(format!(
                "{} coordinates do not split into points of dimension {}",
                self.points.len(),
                self.dim
            )));
        }
        let n = self.num_points();
        for (name, column) in &self.point_data {
            if COORDINATE_NAMES.contains(&name.as_str()) {
                return Err(Error::invalid_mesh(format!(
                    "point data '{}' collides with a coordinate name",
                    name
                )));
            }
            if column.len() != n {
                return Err(Error::invalid_mesh(format!(
                    "point data '{}' has {} values for {} points",
                    name,
                    column.len(),
                    n
                )));
            }
        }
        for block in &self.cells {
            let arity = block.arity();
            if arity == 0 || block.data.len() % arity != 0 {
                return Err(Error::invalid_mesh(format!(
                    "{} block has {} indices, not a multiple of {}",
                    block.cell_type,
                    block.data.len(),
                    arity
                )));
            }
            if let Some(&bad) = block.data.iter().find(|&&i| i < 0 || i as usize >= n) {
                return Err(Error::invalid_mesh(format!(
                    "{} block references point {} of {}",
                    block.cell_type, bad, n
                )));
            }
        }
        for (name, columns) in &self.cell_data {
            if columns.len() != self.cells.len() {
                return Err(Error::invalid_mesh(format!(
                    "cell data '{}' has {} columns for {} cell blocks",
                    name,
                    columns.len(),
                    self.cells.len()
                )));
            }
            for (block, column) in self.cells.iter().zip(columns) {
                if column.len() != block.len() {
                    return Err(Error::invalid_mesh(format!(
                        "cell data '{}' has {} values for {} cells",
                        name,
                        column.len(),
                        block.len()
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Unit cube: 8 corners, 12 triangles.
    pub(crate) fn unit_cube() -> Mesh {
        let points = [
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 1.0, 1.0],
            [0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [1.0, 1.0, 0.0],
        ];
        let triangles = [
            [0, 1, 2], [0, 2, 3],
            [7, 6, 5], [7, 5, 4],
            [0, 4, 5], [0, 5, 1],
            [1, 5, 6], [1, 6, 2],
            [2, 6, 7], [2, 7, 3],
            [3, 7, 4], [3, 4, 0],
        ];
        let points: Vec<DVec3> = points.iter().map(|p| DVec3::from_array(*p)).collect();
        Mesh::from_dvec3(&points, vec![CellBlock::from_cells(CellType::Triangle, &triangles)])
    }

    #[test]
    fn test_cell_type() {
        assert_eq!(CellType::from_arity(3), CellType::Triangle);
        assert_eq!(CellType::from_arity(4), CellType::Quad);
        assert_eq!(CellType::from_arity(7), CellType::Polygon(7));
        assert_eq!(CellType::Polygon(7).arity(), 7);
        assert!(CellType::Tetra.is_volume());
        assert!(!CellType::Quad.is_volume());
        assert_eq!(CellType::Polygon(5).to_string(), "polygon5");
    }

    #[test]
    fn test_polygon_labels_normalized() {
        assert_eq!(CellType::Polygon(3).normalized(), CellType::Triangle);
        assert_eq!(CellType::Polygon(4).normalized(), CellType::Quad);
        assert_eq!(CellType::Polygon(2).normalized(), CellType::Line);
        assert_eq!(CellType::Polygon(6).normalized(), CellType::Polygon(6));
        assert_eq!(CellType::Hexahedron.normalized(), CellType::Hexahedron);

        let block = CellBlock::new(CellType::Polygon(3), vec![0, 1, 2]);
        assert_eq!(block.cell_type, CellType::Triangle);
        let block = CellBlock::from_cells(CellType::Polygon(4), &[[0, 1, 2, 3]]);
        assert_eq!(block.cell_type, CellType::Quad);
    }

    #[test]
    fn test_cube() {
        let cube = unit_cube();
        assert_eq!(cube.num_points(), 8);
        assert_eq!(cube.num_cells(), 12);
        assert_eq!(cube.coordinate(0), vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
        assert_eq!(cube.bounds(), Some((DVec3::ZERO, DVec3::ONE)));
        assert_eq!(cube.cells[0].cells().nth(2), Some(&[7, 6, 5][..]));
        cube.validate().unwrap();
    }

    #[test]
    fn test_validate() {
        let mut mesh = unit_cube();
        mesh.cells[0].data[0] = 8;
        assert!(matches!(mesh.validate(), Err(Error::InvalidMesh(_))));

        let mesh = unit_cube().with_point_data("color", vec![1u8; 7]);
        assert!(mesh.validate().is_err());

        let mesh = unit_cube().with_point_data("x", vec![1u8; 8]);
        assert!(mesh.validate().is_err());

        let mesh = unit_cube().with_cell_data("id", vec![Column::from(vec![0i32; 12])]);
        mesh.validate().unwrap();

        let mut mesh = unit_cube();
        mesh.dim = 4;
        assert!(mesh.validate().is_err());
    }
}
