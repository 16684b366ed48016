//! Property nodes - Identity, kind, and per-node stored state
//!
//! ## Table of Contents
//! 1. PropertyId - Arena handle
//! 2. PropertyKind - Behavioral variant
//! 3. PropertyNode - Stored node state with read accessors

use crate::types::PropertyType;
use crate::value::PropertyValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Handle to a property inside a [`PropertyTree`](crate::PropertyTree).
///
/// Ids are never reused within a tree, so a handle kept across a `destroy`
/// simply stops resolving instead of aliasing a new node.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PropertyId(pub(crate) u64);

/// Behavioral variant of a property node.
///
/// The variant decides how a node's own value and its children's values stay
/// synchronized; it plays the role the subclass hierarchy played in the
/// original widget toolkit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyKind {
    /// Leaf holding a single value, no child synchronization
    Scalar,
    /// Value is an ordered sequence kept index-aligned with children
    List,
    /// Value is a mapping keyed by child names
    Dict,
    /// Organizational container with no value of its own
    Group,
}

impl PropertyKind {
    /// Container kinds react to child value changes
    pub fn is_container(self) -> bool {
        !matches!(self, PropertyKind::Scalar)
    }
}

/// Stored state of one property node.
///
/// Nodes are read through [`PropertyTree::get`](crate::PropertyTree::get);
/// every mutation goes through the tree so notifications and child
/// synchronization cannot be bypassed.
#[derive(Debug, Clone)]
pub struct PropertyNode {
    pub(crate) kind: PropertyKind,
    pub(crate) ty: PropertyType,
    pub(crate) name: String,
    pub(crate) title: String,
    pub(crate) value: PropertyValue,
    pub(crate) attributes: HashMap<String, PropertyValue>,
    pub(crate) parent: Option<PropertyId>,
    pub(crate) children: Vec<PropertyId>,
    pub(crate) visible: bool,
    pub(crate) self_visible: bool,
}

impl PropertyNode {
    pub(crate) fn new(kind: PropertyKind, ty: PropertyType, name: String) -> Self {
        Self {
            kind,
            ty,
            name,
            title: String::new(),
            value: PropertyValue::Null,
            attributes: HashMap::new(),
            parent: None,
            children: Vec::new(),
            visible: true,
            self_visible: true,
        }
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Factory-assigned type tag
    pub fn property_type(&self) -> PropertyType {
        self.ty
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display title, falling back to the name when no title is set
    pub fn title(&self) -> &str {
        if self.title.is_empty() {
            &self.name
        } else {
            &self.title
        }
    }

    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    /// Attribute lookup; a missing key yields [`PropertyValue::Null`]
    pub fn attribute(&self, name: &str) -> PropertyValue {
        self.attributes.get(name).cloned().unwrap_or_default()
    }

    /// All attributes in arbitrary order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn parent(&self) -> Option<PropertyId> {
        self.parent
    }

    /// Direct children in insertion order
    pub fn children(&self) -> &[PropertyId] {
        &self.children
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_self_visible(&self) -> bool {
        self.self_visible
    }
}
