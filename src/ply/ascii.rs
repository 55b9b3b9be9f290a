//! ASCII PLY bodies.
//!
//! Reading keeps the `vertex` element and the first list-bearing element;
//! other elements and extra list properties are parsed and dropped.
//! Consecutive faces of equal arity form one cell block.

use std::fmt::Write as _;
use std::io::{BufRead, Write};
use std::str::SplitWhitespace;

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::codec::{derive_header, is_provenance};
use super::header::*;
use crate::mapper::{assemble_mesh, ArityBlock, RawElement, RawElements};
use crate::mesh::Mesh;
use crate::util::{Column, Error, Result};

struct Tokens<'a> {
    iter: SplitWhitespace<'a>,
    element: &'a str,
}

impl<'a> Tokens<'a> {
    fn next(&mut self) -> Result<&'a str> {
        self.iter.next().ok_or_else(|| {
            Error::invalid_ply(format!("body ends inside element '{}'", self.element))
        })
    }

    fn count(&mut self) -> Result<usize> {
        let token = self.next()?;
        token
            .parse()
            .map_err(|_| Error::invalid_ply(format!("bad list length '{}'", token)))
    }
}

fn read_scalar_rows(tokens: &mut Tokens<'_>, element: &ElementDescriptor) -> Result<RawElement> {
    let mut columns: IndexMap<String, Column> = element
        .properties
        .iter()
        .map(|p| (p.name().to_string(), Column::with_capacity(p.value_type(), element.size)))
        .collect();
    for _ in 0..element.size {
        for column in columns.values_mut() {
            column.push_parsed(tokens.next()?)?;
        }
    }
    Ok(RawElement::Columns(columns))
}

fn read_list_rows(tokens: &mut Tokens<'_>, element: &ElementDescriptor) -> Result<RawElement> {
    let Some(primary) = element.primary_list() else {
        return Ok(RawElement::Lists(Vec::new()));
    };
    let kept: Vec<&PropertyDescriptor> = element
        .properties
        .iter()
        .filter(|p| !p.is_list() || *p == primary)
        .collect();
    let new_block = |arity: usize| ArityBlock {
        arity,
        rows: 0,
        columns: kept
            .iter()
            .map(|p| (p.name().to_string(), Column::empty(p.value_type())))
            .collect(),
    };

    let mut blocks: Vec<ArityBlock> = Vec::new();
    let mut scalars: Vec<&str> = Vec::new();
    let mut indices: Vec<&str> = Vec::new();
    for _ in 0..element.size {
        scalars.clear();
        indices.clear();
        for property in &element.properties {
            if !property.is_list() {
                scalars.push(tokens.next()?);
                continue;
            }
            let count = tokens.count()?;
            for _ in 0..count {
                let token = tokens.next()?;
                if property == primary {
                    indices.push(token);
                }
            }
        }

        let arity = indices.len();
        if blocks.last().map_or(true, |b| b.arity != arity) {
            blocks.push(new_block(arity));
        }
        let Some(block) = blocks.last_mut() else {
            continue;
        };
        let mut scalar = scalars.iter();
        for (property, column) in kept.iter().zip(block.columns.values_mut()) {
            if property.is_list() {
                for token in &indices {
                    column.push_parsed(token)?;
                }
            } else if let Some(token) = scalar.next() {
                column.push_parsed(token)?;
            }
        }
        block.rows += 1;
    }
    Ok(RawElement::Lists(blocks))
}

/// Read an ASCII PLY file, returning its header and mesh.
pub fn read_ply_with_header<R: BufRead>(mut reader: R) -> Result<(Header, Mesh)> {
    let header = Header::parse_ply(&mut reader)?;
    if header.format.encoding != Encoding::Ascii {
        return Err(Error::Unsupported(format!("PLY body encoding {}", header.format)));
    }
    let mut body = String::new();
    reader.read_to_string(&mut body)?;

    let mut iter = body.split_whitespace();
    let mut raw = RawElements::default();
    let mut list_element: Option<&str> = None;
    for (name, element) in &header.elements {
        let mut tokens = Tokens { iter, element: name };
        let rows = if !element.has_list() {
            read_scalar_rows(&mut tokens, element)?
        } else {
            let rows = read_list_rows(&mut tokens, element)?;
            if list_element.is_some() {
                warn!(element = name.as_str(), "skipping second list element");
                iter = tokens.iter;
                continue;
            }
            list_element = Some(name.as_str());
            rows
        };
        iter = tokens.iter;
        debug!(element = name.as_str(), rows = element.size, "read PLY element");
        raw.elements.insert(name.clone(), rows);
    }
    if iter.next().is_some() {
        warn!("trailing data after the last PLY element");
    }

    let mesh = assemble_mesh(&raw, &header)?;
    Ok((header, mesh))
}

/// Read an ASCII PLY file into a mesh.
pub fn read_ply<R: BufRead>(reader: R) -> Result<Mesh> {
    read_ply_with_header(reader).map(|(_, mesh)| mesh)
}

/// Write `mesh` as ASCII PLY.
///
/// The header is derived from the mesh; `comments` are appended after the
/// provenance comment, dropping earlier provenance lines.
pub fn write_ply<W: Write>(mesh: &Mesh, comments: &[String], mut writer: W) -> Result<()> {
    let mut header = derive_header(mesh)?;
    header
        .comments
        .extend(comments.iter().filter(|c| !is_provenance(c)).cloned());
    writer.write_all(header.to_ply_string().as_bytes())?;

    let mut line = String::new();
    for i in 0..mesh.num_points() {
        line.clear();
        for axis in 0..mesh.dim {
            let _ = write!(line, "{} ", mesh.points[i * mesh.dim + axis]);
        }
        for column in mesh.point_data.values() {
            column.write_ascii(i, &mut line);
            line.push(' ');
        }
        finish_line(&mut line);
        writer.write_all(line.as_bytes())?;
    }

    for (b, block) in mesh.cells.iter().enumerate() {
        for (c, cell) in block.cells().enumerate() {
            line.clear();
            let _ = write!(line, "{}", cell.len());
            for index in cell {
                let _ = write!(line, " {}", index);
            }
            for columns in mesh.cell_data.values() {
                line.push(' ');
                columns[b].write_ascii(c, &mut line);
            }
            line.push('\n');
            writer.write_all(line.as_bytes())?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn finish_line(line: &mut String) {
    if line.ends_with(' ') {
        line.pop();
    }
    line.push('\n');
}
