//! Groups: named nodes holding child groups, child arrays and attributes.

use std::fmt::Write as _;

use serde_json::{Map, Value};
use zarrs::group::Group as ZarrGroup;

use super::array::{Array, ArrayOptions};
use super::format::*;
use super::metadata::group_metadata;
use super::storage::{contains_key, erase_key, erase_node, list_node, memory_store, Storage};
use crate::util::{with_column, Column, Element, Error, Result};

/// JSON attributes object of a group.
pub type Attributes = Map<String, Value>;

/// A child of a group - either a Group or an Array.
pub enum Node {
    Group(Group),
    Array(Array),
}

/// Handle on a group stored under a node path.
#[derive(Clone)]
pub struct Group {
    storage: Storage,
    path: String,
}

impl Group {
    /// Create (or reuse) the group at `path`.
    pub fn create(storage: Storage, path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if contains_key(&storage, &join_key(&path, ZARRAY_KEY))? {
            return Err(Error::AlreadyExists(path));
        }
        if !contains_key(&storage, &join_key(&path, ZGROUP_KEY))? {
            let group = ZarrGroup::new_with_metadata(storage.clone(), &node_path(&path), group_metadata()?)?;
            group.store_metadata()?;
        }
        Ok(Self { storage, path })
    }

    /// Open the existing group at `path`.
    pub fn open(storage: Storage, path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if !contains_key(&storage, &join_key(&path, ZGROUP_KEY))? {
            return Err(Error::GroupNotFound(path));
        }
        ZarrGroup::open(storage.clone(), &node_path(&path))?;
        Ok(Self { storage, path })
    }

    /// Root group of a fresh in-memory store.
    pub fn in_memory() -> Result<Self> {
        Self::create(memory_store(), "")
    }

    /// Node path of this group (empty for the root).
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Name of this group (last path segment).
    #[inline]
    pub fn name(&self) -> &str {
        base_name(&self.path)
    }

    /// Underlying storage.
    #[inline]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    fn child_path(&self, name: &str) -> Result<String> {
        check_name(name)?;
        Ok(join_key(&self.path, name))
    }

    /// Check if a child group named `name` exists.
    pub fn contains_group(&self, name: &str) -> Result<bool> {
        let path = self.child_path(name)?;
        contains_key(&self.storage, &join_key(&path, ZGROUP_KEY))
    }

    /// Check if a child array named `name` exists.
    pub fn contains_array(&self, name: &str) -> Result<bool> {
        let path = self.child_path(name)?;
        contains_key(&self.storage, &join_key(&path, ZARRAY_KEY))
    }

    /// Check if a child group or array named `name` exists.
    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.contains_group(name)? || self.contains_array(name)?)
    }

    /// Create a new child group; fails if the name is taken.
    pub fn create_group(&self, name: &str) -> Result<Group> {
        let path = self.child_path(name)?;
        if self.contains(name)? {
            return Err(Error::AlreadyExists(path));
        }
        Group::create(self.storage.clone(), path)
    }

    /// Open the child group `name`, creating it if needed.
    pub fn require_group(&self, name: &str) -> Result<Group> {
        let path = self.child_path(name)?;
        Group::create(self.storage.clone(), path)
    }

    /// Open the existing child group `name`.
    pub fn group(&self, name: &str) -> Result<Group> {
        let path = self.child_path(name)?;
        Group::open(self.storage.clone(), path)
    }

    /// Open the existing child array `name`.
    pub fn array(&self, name: &str) -> Result<Array> {
        let path = self.child_path(name)?;
        Array::open(self.storage.clone(), path)
    }

    /// Write the child array `name` from typed values, replacing any previous node.
    pub fn create_array<T: Element>(
        &self,
        name: &str,
        shape: &[usize],
        data: &[T],
        options: &ArrayOptions,
    ) -> Result<Array> {
        let path = self.child_path(name)?;
        let array = Array::create(self.storage.clone(), path, shape, T::SCALAR_TYPE, options)?;
        array.write(data)?;
        Ok(array)
    }

    /// Write the child array `name` from a column, replacing any previous node.
    pub fn create_array_from_column(
        &self,
        name: &str,
        shape: &[usize],
        column: &Column,
        options: &ArrayOptions,
    ) -> Result<Array> {
        let path = self.child_path(name)?;
        let array = Array::create(self.storage.clone(), path, shape, column.scalar_type(), options)?;
        with_column!(column, v => array.write(v))?;
        Ok(array)
    }

    /// Remove the child `name` and everything below it.
    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.child_path(name)?;
        erase_node(&self.storage, &path)
    }

    /// Remove every child and the attributes, keeping the group itself.
    pub fn clear(&self) -> Result<()> {
        let (keys, nodes) = list_node(&self.storage, &self.path)?;
        for name in nodes {
            erase_node(&self.storage, &join_key(&self.path, &name))?;
        }
        for key in keys.iter().filter(|k| *k != ZGROUP_KEY) {
            erase_key(&self.storage, &join_key(&self.path, key))?;
        }
        Ok(())
    }

    /// Names of child groups and arrays, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        let (_, nodes) = list_node(&self.storage, &self.path)?;
        let mut keys = Vec::new();
        for name in nodes {
            if check_name(&name).is_ok() && self.contains(&name)? {
                keys.push(name);
            }
        }
        Ok(keys)
    }

    /// Names of child groups, sorted.
    pub fn group_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for name in self.keys()? {
            if self.contains_group(&name)? {
                keys.push(name);
            }
        }
        Ok(keys)
    }

    /// Names of child arrays, sorted.
    pub fn array_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for name in self.keys()? {
            if self.contains_array(&name)? {
                keys.push(name);
            }
        }
        Ok(keys)
    }

    /// Iterate over all children, returning either Group or Array.
    pub fn children(&self) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        for name in self.keys()? {
            if self.contains_group(&name)? {
                nodes.push(Node::Group(self.group(&name)?));
            } else {
                nodes.push(Node::Array(self.array(&name)?));
            }
        }
        Ok(nodes)
    }

    /// Attributes object (empty if none was written).
    pub fn attrs(&self) -> Result<Attributes> {
        let group = ZarrGroup::open(self.storage.clone(), &node_path(&self.path))?;
        Ok(group.attributes().clone())
    }

    /// Replace the attributes object.
    pub fn set_attrs(&self, attrs: &Attributes) -> Result<()> {
        erase_key(&self.storage, &join_key(&self.path, ZATTRS_KEY))?;
        let mut group = ZarrGroup::open(self.storage.clone(), &node_path(&self.path))?;
        *group.attributes_mut() = attrs.clone();
        group.store_metadata()?;
        Ok(())
    }

    /// Merge top-level keys into the attributes object.
    pub fn update_attrs(&self, attrs: Attributes) -> Result<()> {
        let mut current = self.attrs()?;
        for (key, value) in attrs {
            current.insert(key, value);
        }
        self.set_attrs(&current)
    }

    /// Render the hierarchy below this group as a tree.
    pub fn tree(&self) -> Result<String> {
        let mut out = String::new();
        let label = if self.path.is_empty() { "/" } else { self.name() };
        let _ = writeln!(out, "{}", label);
        self.tree_into(&mut out, "")?;
        Ok(out)
    }

    fn tree_into(&self, out: &mut String, indent: &str) -> Result<()> {
        let children = self.children()?;
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            let last = i + 1 == count;
            let branch = if last { " └── " } else { " ├── " };
            match child {
                Node::Group(group) => {
                    let _ = writeln!(out, "{}{}{}", indent, branch, group.name());
                    let next = format!("{}{}", indent, if last { "     " } else { " │   " });
                    group.tree_into(out, &next)?;
                }
                Node::Array(array) => {
                    let shape = match array.shape() {
                        [n] => format!("({},)", n),
                        dims => format!(
                            "({})",
                            dims.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
                        ),
                    };
                    let _ = writeln!(
                        out,
                        "{}{}{} {} {}",
                        indent,
                        branch,
                        array.name(),
                        shape,
                        array.scalar_type()
                    );
                }
            }
        }
        Ok(())
    }
}
