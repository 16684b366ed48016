//! PropertyTree - Arena holding the property hierarchy and all operations
//!
//! ## Table of Contents
//! 1. PropertyTree - Arena, creation, lookup
//! 2. Naming, attributes, visibility
//! 3. Structure (add/remove/index/find children)
//! 4. Values (per-kind set_value, value_string, child synchronization)
//! 5. Destruction
//! 6. Traversal helpers

use crate::events::Observers;
use crate::property::{PropertyId, PropertyKind, PropertyNode};
use crate::types::PropertyType;
use crate::value::PropertyValue;
use std::collections::HashMap;

/// Arena owning every property node and dispatching notifications.
///
/// Properties are created standalone (as roots), attached with
/// [`add_child`](Self::add_child), and addressed through [`PropertyId`]
/// handles. All mutation happens here so value synchronization between
/// containers and their children cannot be bypassed.
///
/// Handles passed to any method must belong to this tree and still be alive;
/// violating that is a caller bug and panics. Lookups that can legitimately
/// miss (a name, an attribute, a position) return `Option` or a null value
/// instead.
#[derive(Default)]
pub struct PropertyTree {
    nodes: HashMap<PropertyId, PropertyNode>,
    roots: Vec<PropertyId>,
    next_id: u64,
    pub(crate) observers: Observers,
}

impl PropertyTree {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Creation and lookup
    // ========================================================================

    /// Create a standalone property of the given kind. The new property is a
    /// root until attached to a parent.
    pub fn create(
        &mut self,
        kind: PropertyKind,
        ty: PropertyType,
        name: impl Into<String>,
    ) -> PropertyId {
        self.next_id += 1;
        let id = PropertyId(self.next_id);
        let name = name.into();
        tracing::trace!("Created {:?} property {:?} '{}'", kind, id, name);
        self.nodes.insert(id, PropertyNode::new(kind, ty, name));
        self.roots.push(id);
        id
    }

    /// Create a leaf property holding a single value
    pub fn create_scalar(&mut self, ty: PropertyType, name: impl Into<String>) -> PropertyId {
        self.create(PropertyKind::Scalar, ty, name)
    }

    /// Create a property whose value is an ordered sequence aligned with its
    /// children by index
    pub fn create_list(&mut self, name: impl Into<String>) -> PropertyId {
        self.create(PropertyKind::List, PropertyType::LIST, name)
    }

    /// Create a property whose value is a mapping keyed by child names
    pub fn create_dict(&mut self, name: impl Into<String>) -> PropertyId {
        self.create(PropertyKind::Dict, PropertyType::DICT, name)
    }

    /// Create an organizational container with no value of its own
    pub fn create_group(&mut self, name: impl Into<String>) -> PropertyId {
        self.create(PropertyKind::Group, PropertyType::GROUP, name)
    }

    /// Get a node by id
    pub fn get(&self, id: PropertyId) -> Option<&PropertyNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: PropertyId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of live properties
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parentless properties in creation/detach order
    pub fn roots(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.roots.iter().copied()
    }

    fn node(&self, id: PropertyId) -> &PropertyNode {
        self.nodes.get(&id).expect("property id not in tree")
    }

    fn node_mut(&mut self, id: PropertyId) -> &mut PropertyNode {
        self.nodes.get_mut(&id).expect("property id not in tree")
    }

    // ========================================================================
    // Naming, attributes, visibility
    // ========================================================================

    pub fn kind(&self, id: PropertyId) -> PropertyKind {
        self.node(id).kind
    }

    pub fn property_type(&self, id: PropertyId) -> PropertyType {
        self.node(id).ty
    }

    /// Assign the factory type tag
    pub fn set_property_type(&mut self, id: PropertyId, ty: PropertyType) {
        self.node_mut(id).ty = ty;
    }

    pub fn name(&self, id: PropertyId) -> &str {
        &self.node(id).name
    }

    /// Rename a property. Pure storage, no notification; a dict parent picks
    /// the new name up on the next synchronization.
    pub fn set_name(&mut self, id: PropertyId, name: impl Into<String>) {
        self.node_mut(id).name = name.into();
    }

    /// Display title, falling back to the name when no title is set
    pub fn title(&self, id: PropertyId) -> &str {
        self.node(id).title()
    }

    pub fn set_title(&mut self, id: PropertyId, title: impl Into<String>) {
        self.node_mut(id).title = title.into();
    }

    /// Attribute lookup; a missing key yields [`PropertyValue::Null`]
    pub fn attribute(&self, id: PropertyId, name: &str) -> PropertyValue {
        self.node(id).attribute(name)
    }

    pub fn set_attribute(
        &mut self,
        id: PropertyId,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) {
        self.node_mut(id).attributes.insert(name.into(), value.into());
    }

    pub fn remove_attribute(&mut self, id: PropertyId, name: &str) -> Option<PropertyValue> {
        self.node_mut(id).attributes.remove(name)
    }

    pub fn is_visible(&self, id: PropertyId) -> bool {
        self.node(id).visible
    }

    pub fn set_visible(&mut self, id: PropertyId, visible: bool) {
        self.node_mut(id).visible = visible;
    }

    pub fn is_self_visible(&self, id: PropertyId) -> bool {
        self.node(id).self_visible
    }

    pub fn set_self_visible(&mut self, id: PropertyId, visible: bool) {
        self.node_mut(id).self_visible = visible;
    }

    // ========================================================================
    // Structure
    // ========================================================================

    pub fn parent(&self, id: PropertyId) -> Option<PropertyId> {
        self.node(id).parent
    }

    /// Direct children in insertion order
    pub fn children(&self, id: PropertyId) -> &[PropertyId] {
        &self.node(id).children
    }

    /// Attach `child` under `parent`.
    ///
    /// The child must currently be parentless; attaching an already-parented
    /// property is a caller bug and panics. Fires a child-inserted
    /// notification on the parent after the structure is updated.
    pub fn add_child(&mut self, parent: PropertyId, child: PropertyId) {
        assert!(
            self.node(child).parent.is_none(),
            "property {:?} already has a parent",
            child
        );
        tracing::trace!("Attaching {:?} under {:?}", child, parent);
        self.roots.retain(|&r| r != child);
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parent = Some(parent);
        self.on_child_add(parent, child);
        self.dispatch_child_inserted(parent, child, parent);
    }

    /// Detach `child` from `parent`.
    ///
    /// The child must belong to `parent`; removing through the wrong parent
    /// is a caller bug and panics. The detached child becomes a root again
    /// and keeps its subtree. Fires a child-removed notification on the
    /// parent.
    pub fn remove_child(&mut self, parent: PropertyId, child: PropertyId) {
        assert_eq!(
            self.node(child).parent,
            Some(parent),
            "property {:?} belongs to a different parent",
            child
        );
        let Some(pos) = self.node(parent).children.iter().position(|&c| c == child) else {
            return;
        };
        tracing::trace!("Detaching {:?} from {:?}", child, parent);
        self.node_mut(child).parent = None;
        self.node_mut(parent).children.remove(pos);
        self.roots.push(child);
        self.on_child_remove(parent, child);
        self.dispatch_child_removed(parent, child, Some(parent));
    }

    /// Detach from the current parent, if any
    pub fn remove_from_parent(&mut self, id: PropertyId) {
        if let Some(parent) = self.node(id).parent {
            self.remove_child(parent, id);
        }
    }

    /// Detach every child. Iterates a snapshot of the child list, which
    /// mutates as children detach.
    pub fn remove_all_children(&mut self, id: PropertyId) {
        let snapshot = self.node(id).children.clone();
        for child in snapshot {
            self.remove_child(id, child);
        }
    }

    /// Position of `child` among `parent`'s direct children
    pub fn index_child(&self, parent: PropertyId, child: PropertyId) -> Option<usize> {
        self.node(parent).children.iter().position(|&c| c == child)
    }

    /// Find a direct child by name. Group properties search through nested
    /// groups as well, scanning children in order and returning the first
    /// match: each child is name-checked before its group subtree is
    /// descended into.
    pub fn find_child(&self, parent: PropertyId, name: &str) -> Option<PropertyId> {
        match self.node(parent).kind {
            PropertyKind::Group => self.find_child_in_group(parent, name),
            _ => self
                .node(parent)
                .children
                .iter()
                .copied()
                .find(|&c| self.node(c).name == name),
        }
    }

    fn find_child_in_group(&self, group: PropertyId, name: &str) -> Option<PropertyId> {
        for &child in &self.node(group).children {
            if self.node(child).name == name {
                return Some(child);
            }
            if self.node(child).kind == PropertyKind::Group {
                if let Some(found) = self.find_child(child, name) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Set the value of a child found by name; silently does nothing when no
    /// such child exists.
    ///
    /// Group properties recurse into nested groups and set every matching
    /// non-group child at any depth. Unlike [`find_child`](Self::find_child)
    /// there is no short-circuit: two leaves sharing a name at different
    /// nesting levels both receive the value.
    pub fn set_child_value(
        &mut self,
        parent: PropertyId,
        name: &str,
        value: impl Into<PropertyValue>,
    ) {
        let value = value.into();
        match self.node(parent).kind {
            PropertyKind::Group => self.set_group_child_value(parent, name, value),
            _ => {
                if let Some(child) = self.find_child(parent, name) {
                    self.set_value(child, value);
                }
            }
        }
    }

    fn set_group_child_value(&mut self, group: PropertyId, name: &str, value: PropertyValue) {
        let children = self.node(group).children.clone();
        for child in children {
            if self.node(child).kind == PropertyKind::Group {
                self.set_child_value(child, name, value.clone());
            } else if self.node(child).name == name {
                self.set_value(child, value.clone());
            }
        }
    }

    // Kind-specific bookkeeping when a child attaches or detaches. For
    // container kinds the parent link itself is the subscription: value
    // changes bubble to the parent only while the link exists.
    fn on_child_add(&mut self, parent: PropertyId, child: PropertyId) {
        if self.node(parent).kind.is_container() {
            tracing::trace!("Container {:?} now tracks {:?}", parent, child);
        }
    }

    fn on_child_remove(&mut self, parent: PropertyId, child: PropertyId) {
        if self.node(parent).kind.is_container() {
            tracing::trace!("Container {:?} no longer tracks {:?}", parent, child);
        }
    }

    // ========================================================================
    // Values
    // ========================================================================

    pub fn value(&self, id: PropertyId) -> &PropertyValue {
        &self.node(id).value
    }

    /// Store a new value, honoring the per-kind synchronization policy.
    ///
    /// Scalars notify only when the value actually differs. Lists and dicts
    /// additionally distribute the new value to their children, then always
    /// fire their own notification: replacing the aggregate is a signal in
    /// itself even when every element compares equal. Groups hold no value
    /// and ignore the call entirely.
    pub fn set_value(&mut self, id: PropertyId, value: impl Into<PropertyValue>) {
        let value = value.into();
        match self.node(id).kind {
            PropertyKind::Scalar => self.set_scalar_value(id, value),
            PropertyKind::List => self.set_list_value(id, value),
            PropertyKind::Dict => self.set_dict_value(id, value),
            PropertyKind::Group => {}
        }
    }

    fn set_scalar_value(&mut self, id: PropertyId, value: PropertyValue) {
        if self.node(id).value == value {
            return;
        }
        self.node_mut(id).value = value;
        self.emit_value_changed(id, id);
    }

    fn set_list_value(&mut self, id: PropertyId, value: PropertyValue) {
        if self.node(id).value == value {
            return;
        }
        // the raw variant is stored; children receive a padded copy
        self.node_mut(id).value = value;
        let mut seq = self.node(id).value.to_list();
        let children = self.node(id).children.clone();
        while seq.len() < children.len() {
            seq.push(PropertyValue::Null);
        }
        for (i, child) in children.into_iter().enumerate() {
            self.set_value(child, seq[i].clone());
        }
        self.emit_value_changed(id, id);
    }

    fn set_dict_value(&mut self, id: PropertyId, value: PropertyValue) {
        if self.node(id).value == value {
            return;
        }
        self.node_mut(id).value = value;
        let map = self.node(id).value.to_map();
        let children = self.node(id).children.clone();
        for child in children {
            let entry = map
                .get(self.node(child).name.as_str())
                .cloned()
                .unwrap_or_default();
            self.set_value(child, entry);
        }
        self.emit_value_changed(id, id);
    }

    /// Human-readable rendering of the value. List properties render their
    /// children as `"(a, b, )"`, trailing separator included; everything
    /// else uses the value's default stringification.
    pub fn value_string(&self, id: PropertyId) -> String {
        match self.node(id).kind {
            PropertyKind::List => {
                let mut text = String::from("(");
                for &child in &self.node(id).children {
                    text.push_str(&self.value_string(child));
                    text.push_str(", ");
                }
                text.push(')');
                text
            }
            _ => self.node(id).value.to_string(),
        }
    }

    // Fire a value-changed notification on `emitter` labeled with `changed`,
    // then let the parent container react. The label differs from the
    // emitter only when a group forwards a child's change.
    fn emit_value_changed(&mut self, emitter: PropertyId, changed: PropertyId) {
        self.dispatch_value_changed(emitter, changed);
        if let Some(parent) = self.node(emitter).parent {
            self.child_value_changed(parent, changed);
        }
    }

    // The container's reaction to a notification from a direct child. The
    // payload is whatever the child emitted, which for a group child is a
    // property from deeper in the tree.
    fn child_value_changed(&mut self, container: PropertyId, changed: PropertyId) {
        match self.node(container).kind {
            PropertyKind::Scalar => {}
            PropertyKind::List => self.list_child_value_changed(container, changed),
            PropertyKind::Dict => self.dict_child_value_changed(container, changed),
            PropertyKind::Group => self.emit_value_changed(container, changed),
        }
    }

    fn list_child_value_changed(&mut self, list: PropertyId, changed: PropertyId) {
        // forwarded grandchildren are not direct children and are ignored
        let Some(i) = self.index_child(list, changed) else {
            return;
        };
        let mut seq = self.node(list).value.to_list();
        while seq.len() < i + 1 {
            seq.push(PropertyValue::Null);
        }
        if seq[i] != self.node(changed).value {
            seq[i] = self.node(changed).value.clone();
            self.node_mut(list).value = PropertyValue::List(seq);
            self.emit_value_changed(list, list);
        }
    }

    fn dict_child_value_changed(&mut self, dict: PropertyId, changed: PropertyId) {
        let mut map = self.node(dict).value.to_map();
        let name = self.node(changed).name.clone();
        let old = map.get(&name).cloned().unwrap_or_default();
        if self.node(changed).value != old {
            map.insert(name, self.node(changed).value.clone());
            self.node_mut(dict).value = PropertyValue::Map(map);
            self.emit_value_changed(dict, dict);
        }
    }

    // ========================================================================
    // Destruction
    // ========================================================================

    /// Destroy a property and its whole subtree.
    ///
    /// The dying property first announces its own removal (its parent may
    /// still be attached at that point), then detaches every child from a
    /// snapshot, detaches itself, and finally destroys the detached children
    /// recursively before releasing storage. Observers registered on
    /// destroyed properties are dropped.
    pub fn destroy(&mut self, id: PropertyId) {
        tracing::debug!("Destroying property {:?} '{}'", id, self.node(id).name);
        let parent = self.node(id).parent;
        self.dispatch_child_removed(id, id, parent);

        let children = self.node(id).children.clone();
        for &child in &children {
            self.remove_child(id, child);
        }
        self.remove_from_parent(id);
        for child in children {
            self.destroy(child);
        }

        self.nodes.remove(&id);
        self.roots.retain(|&r| r != id);
        self.observers.clear_property(id);
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Ancestors from the immediate parent up to the root
    pub fn ancestors(&self, id: PropertyId) -> Vec<PropertyId> {
        let mut result = Vec::new();
        let mut current = self.node(id).parent;
        while let Some(ancestor) = current {
            result.push(ancestor);
            current = self.node(ancestor).parent;
        }
        result
    }

    /// Every property below `id`, depth-first
    pub fn descendants(&self, id: PropertyId) -> Vec<PropertyId> {
        let mut result = Vec::new();
        let mut stack = self.node(id).children.clone();
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.node(current).children.iter().copied());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ValueList, ValueMap};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn scalar(tree: &mut PropertyTree, name: impl Into<String>) -> PropertyId {
        tree.create_scalar(PropertyType::INT, name)
    }

    #[test]
    fn test_title_falls_back_to_name() {
        let mut tree = PropertyTree::new();
        let p = scalar(&mut tree, "speed");
        assert_eq!(tree.title(p), "speed");
        tree.set_title(p, "Walk Speed");
        assert_eq!(tree.title(p), "Walk Speed");
        tree.set_title(p, "");
        assert_eq!(tree.title(p), "speed");
    }

    #[test]
    fn test_set_value_equality_gate() {
        let mut tree = PropertyTree::new();
        let p = scalar(&mut tree, "speed");
        let fired = Rc::new(RefCell::new(0));
        let sink = fired.clone();
        tree.on_value_changed(p, move |_, _| *sink.borrow_mut() += 1);

        tree.set_value(p, 5);
        tree.set_value(p, 5);
        assert_eq!(*fired.borrow(), 1);
        assert_eq!(tree.value(p), &PropertyValue::Int(5));

        tree.set_value(p, 6);
        assert_eq!(*fired.borrow(), 2);
    }

    #[test]
    fn test_add_remove_child_restores_state_and_notifies_once() {
        let mut tree = PropertyTree::new();
        let parent = scalar(&mut tree, "parent");
        let child = scalar(&mut tree, "child");

        let inserted = Rc::new(RefCell::new(Vec::new()));
        let removed = Rc::new(RefCell::new(Vec::new()));
        let ins_sink = inserted.clone();
        let rem_sink = removed.clone();
        tree.on_child_inserted(parent, move |_, c, p| ins_sink.borrow_mut().push((c, p)));
        tree.on_child_removed(parent, move |_, c, p| rem_sink.borrow_mut().push((c, p)));

        tree.add_child(parent, child);
        assert_eq!(tree.children(parent), &[child]);
        assert_eq!(tree.parent(child), Some(parent));
        assert!(!tree.roots().any(|r| r == child));

        tree.remove_child(parent, child);
        assert!(tree.children(parent).is_empty());
        assert_eq!(tree.parent(child), None);
        assert!(tree.roots().any(|r| r == child));

        assert_eq!(inserted.borrow().as_slice(), &[(child, parent)]);
        assert_eq!(removed.borrow().as_slice(), &[(child, Some(parent))]);
    }

    #[test]
    #[should_panic(expected = "already has a parent")]
    fn test_add_child_twice_panics() {
        let mut tree = PropertyTree::new();
        let a = scalar(&mut tree, "a");
        let b = scalar(&mut tree, "b");
        let child = scalar(&mut tree, "child");
        tree.add_child(a, child);
        tree.add_child(b, child);
    }

    #[test]
    #[should_panic(expected = "different parent")]
    fn test_remove_child_through_wrong_parent_panics() {
        let mut tree = PropertyTree::new();
        let a = scalar(&mut tree, "a");
        let b = scalar(&mut tree, "b");
        let child = scalar(&mut tree, "child");
        tree.add_child(a, child);
        tree.remove_child(b, child);
    }

    #[test]
    fn test_find_child_on_non_group_is_direct_only() {
        let mut tree = PropertyTree::new();
        let parent = scalar(&mut tree, "parent");
        let mid = scalar(&mut tree, "mid");
        let deep = scalar(&mut tree, "deep");
        tree.add_child(parent, mid);
        tree.add_child(mid, deep);

        assert_eq!(tree.find_child(parent, "mid"), Some(mid));
        assert_eq!(tree.find_child(parent, "deep"), None);
        assert_eq!(tree.index_child(parent, mid), Some(0));
        assert_eq!(tree.index_child(parent, deep), None);
    }

    #[test]
    fn test_set_child_value_direct_only_and_silent_miss() {
        let mut tree = PropertyTree::new();
        let parent = scalar(&mut tree, "parent");
        let child = scalar(&mut tree, "x");
        tree.add_child(parent, child);

        tree.set_child_value(parent, "x", 7);
        assert_eq!(tree.value(child), &PropertyValue::Int(7));

        // unknown names are ignored
        tree.set_child_value(parent, "y", 9);
        assert_eq!(tree.value(child), &PropertyValue::Int(7));
    }

    // ------------------------------------------------------------------
    // List properties
    // ------------------------------------------------------------------

    #[test]
    fn test_list_set_value_distributes_and_notifies_once() {
        let mut tree = PropertyTree::new();
        let list = tree.create_list("pos");
        let c0 = scalar(&mut tree, "x");
        let c1 = scalar(&mut tree, "y");
        tree.add_child(list, c0);
        tree.add_child(list, c1);

        let fired = Rc::new(RefCell::new(0));
        let sink = fired.clone();
        tree.on_value_changed(list, move |_, _| *sink.borrow_mut() += 1);

        tree.set_value(list, ValueList::from([1.into(), 2.into()]));
        assert_eq!(tree.value(c0), &PropertyValue::Int(1));
        assert_eq!(tree.value(c1), &PropertyValue::Int(2));
        assert_eq!(*fired.borrow(), 1);
        assert_eq!(tree.value_string(list), "(1, 2, )");
    }

    #[test]
    fn test_list_value_string_trailing_separator() {
        let mut tree = PropertyTree::new();
        let list = tree.create_list("l");
        assert_eq!(tree.value_string(list), "()");

        let only = scalar(&mut tree, "only");
        tree.add_child(list, only);
        tree.set_value(only, 7);
        assert_eq!(tree.value_string(list), "(7, )");
    }

    #[test]
    fn test_nested_list_value_string() {
        let mut tree = PropertyTree::new();
        let outer = tree.create_list("outer");
        let inner = tree.create_list("inner");
        let leaf = scalar(&mut tree, "leaf");
        tree.add_child(inner, leaf);
        tree.add_child(outer, inner);
        tree.set_value(leaf, 1);
        assert_eq!(tree.value_string(outer), "((1, ), )");
    }

    #[test]
    fn test_list_pads_short_sequences() {
        let mut tree = PropertyTree::new();
        let list = tree.create_list("l");
        let c0 = scalar(&mut tree, "x");
        let c1 = scalar(&mut tree, "y");
        tree.add_child(list, c0);
        tree.add_child(list, c1);
        tree.set_value(c1, 9);

        tree.set_value(list, ValueList::from([5.into()]));
        assert_eq!(tree.value(c0), &PropertyValue::Int(5));
        assert_eq!(tree.value(c1), &PropertyValue::Null);
        // the stored aggregate is the raw variant, not the padded copy
        assert_eq!(tree.value(list), &PropertyValue::List(vec![5.into()]));
    }

    #[test]
    fn test_list_set_non_list_value_nulls_children() {
        let mut tree = PropertyTree::new();
        let list = tree.create_list("l");
        let c0 = scalar(&mut tree, "x");
        tree.add_child(list, c0);
        tree.set_value(c0, 3);

        let fired = Rc::new(RefCell::new(0));
        let sink = fired.clone();
        tree.on_value_changed(list, move |_, _| *sink.borrow_mut() += 1);

        tree.set_value(list, "oops");
        assert_eq!(tree.value(c0), &PropertyValue::Null);
        assert_eq!(tree.value(list), &PropertyValue::from("oops"));
        assert_eq!(*fired.borrow(), 1);
    }

    #[test]
    fn test_list_child_edit_feeds_aggregate() {
        let mut tree = PropertyTree::new();
        let list = tree.create_list("l");
        let c0 = scalar(&mut tree, "x");
        let c1 = scalar(&mut tree, "y");
        tree.add_child(list, c0);
        tree.add_child(list, c1);

        let fired = Rc::new(RefCell::new(0));
        let sink = fired.clone();
        tree.on_value_changed(list, move |_, _| *sink.borrow_mut() += 1);

        tree.set_value(c1, 4);
        assert_eq!(
            tree.value(list),
            &PropertyValue::List(vec![PropertyValue::Null, 4.into()])
        );
        assert_eq!(*fired.borrow(), 1);

        // equal child values do not re-notify the aggregate
        tree.set_value(c1, 4);
        assert_eq!(*fired.borrow(), 1);
    }

    #[test]
    fn test_detached_child_stops_feeding_list() {
        let mut tree = PropertyTree::new();
        let list = tree.create_list("l");
        let c0 = scalar(&mut tree, "x");
        tree.add_child(list, c0);
        tree.remove_child(list, c0);

        let fired = Rc::new(RefCell::new(0));
        let sink = fired.clone();
        tree.on_value_changed(list, move |_, _| *sink.borrow_mut() += 1);

        tree.set_value(c0, 11);
        assert_eq!(tree.value(list), &PropertyValue::Null);
        assert_eq!(*fired.borrow(), 0);
    }

    // ------------------------------------------------------------------
    // Dict properties
    // ------------------------------------------------------------------

    #[test]
    fn test_dict_set_value_distributes_by_name() {
        let mut tree = PropertyTree::new();
        let dict = tree.create_dict("d");
        let x = scalar(&mut tree, "x");
        let y = scalar(&mut tree, "y");
        tree.add_child(dict, x);
        tree.add_child(dict, y);
        tree.set_value(y, 2);

        let fired = Rc::new(RefCell::new(0));
        let sink = fired.clone();
        tree.on_value_changed(dict, move |_, _| *sink.borrow_mut() += 1);

        let mut map = ValueMap::new();
        map.insert("x".into(), 1.into());
        tree.set_value(dict, map.clone());

        assert_eq!(tree.value(x), &PropertyValue::Int(1));
        // names missing from the mapping reset their children
        assert_eq!(tree.value(y), &PropertyValue::Null);
        assert_eq!(*fired.borrow(), 1);

        // replacing with an equal mapping is a no-op
        tree.set_value(dict, map);
        assert_eq!(*fired.borrow(), 1);
    }

    #[test]
    fn test_dict_child_edit_updates_mapping() {
        let mut tree = PropertyTree::new();
        let dict = tree.create_dict("d");
        let x = scalar(&mut tree, "x");
        tree.add_child(dict, x);

        let fired = Rc::new(RefCell::new(0));
        let sink = fired.clone();
        tree.on_value_changed(dict, move |_, _| *sink.borrow_mut() += 1);

        tree.set_value(x, 3);
        let map = tree.value(dict).to_map();
        assert_eq!(map.get("x"), Some(&PropertyValue::Int(3)));
        assert_eq!(*fired.borrow(), 1);

        tree.set_value(x, 3);
        assert_eq!(*fired.borrow(), 1);
    }

    // ------------------------------------------------------------------
    // Group properties
    // ------------------------------------------------------------------

    #[test]
    fn test_group_ignores_set_value() {
        let mut tree = PropertyTree::new();
        let group = tree.create_group("g");
        let fired = Rc::new(RefCell::new(0));
        let sink = fired.clone();
        tree.on_value_changed(group, move |_, _| *sink.borrow_mut() += 1);

        tree.set_value(group, 5);
        assert_eq!(tree.value(group), &PropertyValue::Null);
        assert_eq!(*fired.borrow(), 0);
    }

    #[test]
    fn test_group_find_child_recurses_in_scan_order() {
        let mut tree = PropertyTree::new();
        let group = tree.create_group("g");
        let sub = tree.create_group("sub");
        let nested = scalar(&mut tree, "n");
        let direct = scalar(&mut tree, "n");
        tree.add_child(sub, nested);
        tree.add_child(group, sub);
        tree.add_child(group, direct);

        // the subgroup comes first in scan order, so its leaf wins over the
        // later direct child with the same name
        assert_eq!(tree.find_child(group, "n"), Some(nested));
        assert_eq!(tree.find_child(group, "sub"), Some(sub));
        assert_eq!(tree.find_child(group, "absent"), None);
    }

    #[test]
    fn test_group_set_child_value_hits_every_level() {
        let mut tree = PropertyTree::new();
        let group = tree.create_group("g");
        let sub = tree.create_group("sub");
        let nested = scalar(&mut tree, "n");
        let direct = scalar(&mut tree, "n");
        tree.add_child(sub, nested);
        tree.add_child(group, sub);
        tree.add_child(group, direct);

        // unlike find_child there is no short-circuit: both same-named
        // leaves receive the value
        tree.set_child_value(group, "n", 8);
        assert_eq!(tree.value(nested), &PropertyValue::Int(8));
        assert_eq!(tree.value(direct), &PropertyValue::Int(8));
        assert_eq!(tree.find_child(group, "n"), Some(nested));
    }

    #[test]
    fn test_group_forwards_child_notifications() {
        let mut tree = PropertyTree::new();
        let group = tree.create_group("g");
        let leaf = scalar(&mut tree, "leaf");
        tree.add_child(group, leaf);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        tree.on_value_changed(group, move |_, changed| sink.borrow_mut().push(changed));

        tree.set_value(leaf, 1);
        // the notification is labeled with the child, not the group
        assert_eq!(seen.borrow().as_slice(), &[leaf]);
        assert_eq!(tree.value(group), &PropertyValue::Null);
    }

    #[test]
    fn test_dict_over_group_keys_by_forwarded_name() {
        let mut tree = PropertyTree::new();
        let dict = tree.create_dict("d");
        let group = tree.create_group("g");
        let leaf = scalar(&mut tree, "depth");
        tree.add_child(group, leaf);
        tree.add_child(dict, group);

        tree.set_value(leaf, 42);
        // the group is transparent, so the dict keys the entry by the
        // grandchild's name
        let map = tree.value(dict).to_map();
        assert_eq!(map.get("depth"), Some(&PropertyValue::Int(42)));
    }

    #[test]
    fn test_list_ignores_forwarded_grandchild() {
        let mut tree = PropertyTree::new();
        let list = tree.create_list("l");
        let group = tree.create_group("g");
        let leaf = scalar(&mut tree, "leaf");
        tree.add_child(group, leaf);
        tree.add_child(list, group);

        let fired = Rc::new(RefCell::new(0));
        let sink = fired.clone();
        tree.on_value_changed(list, move |_, _| *sink.borrow_mut() += 1);

        tree.set_value(leaf, 1);
        // the forwarded grandchild is not a direct child of the list
        assert_eq!(tree.value(list), &PropertyValue::Null);
        assert_eq!(*fired.borrow(), 0);
    }

    #[test]
    fn test_scalar_parent_does_not_aggregate() {
        let mut tree = PropertyTree::new();
        let parent = scalar(&mut tree, "parent");
        let child = scalar(&mut tree, "child");
        tree.add_child(parent, child);

        let fired = Rc::new(RefCell::new(0));
        let sink = fired.clone();
        tree.on_value_changed(parent, move |_, _| *sink.borrow_mut() += 1);

        tree.set_value(child, 1);
        assert_eq!(tree.value(parent), &PropertyValue::Null);
        assert_eq!(*fired.borrow(), 0);
    }

    // ------------------------------------------------------------------
    // Destruction and mass removal
    // ------------------------------------------------------------------

    #[test]
    fn test_destroy_notifies_children_before_final_detach() {
        let mut tree = PropertyTree::new();
        let grandparent = scalar(&mut tree, "gp");
        let parent = scalar(&mut tree, "p");
        let c0 = scalar(&mut tree, "c0");
        let c1 = scalar(&mut tree, "c1");
        tree.add_child(grandparent, parent);
        tree.add_child(parent, c0);
        tree.add_child(parent, c1);

        let log: Rc<RefCell<Vec<(&str, PropertyId, Option<PropertyId>)>>> =
            Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        tree.on_child_removed(parent, move |_, c, p| sink.borrow_mut().push(("p", c, p)));
        let sink = log.clone();
        tree.on_child_removed(grandparent, move |_, c, p| sink.borrow_mut().push(("gp", c, p)));

        tree.destroy(parent);

        let events = log.borrow();
        assert_eq!(
            events.as_slice(),
            &[
                // the dying property announces itself while still attached
                ("p", parent, Some(grandparent)),
                ("p", c0, Some(parent)),
                ("p", c1, Some(parent)),
                // the final detach arrives through the grandparent last
                ("gp", parent, Some(grandparent)),
            ]
        );
        drop(events);

        assert!(tree.children(grandparent).is_empty());
        assert!(!tree.contains(parent));
        assert!(!tree.contains(c0));
        assert!(!tree.contains(c1));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.roots().collect::<Vec<_>>(), vec![grandparent]);
    }

    #[test]
    fn test_destroy_root_announces_with_no_parent() {
        let mut tree = PropertyTree::new();
        let root = scalar(&mut tree, "root");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        tree.on_child_removed(root, move |_, c, p| sink.borrow_mut().push((c, p)));

        tree.destroy(root);
        assert_eq!(seen.borrow().as_slice(), &[(root, None)]);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_remove_all_children_detaches_everything() {
        let mut tree = PropertyTree::new();
        let parent = scalar(&mut tree, "parent");
        let kids: Vec<_> = (0..3).map(|i| scalar(&mut tree, format!("c{}", i))).collect();
        for &k in &kids {
            tree.add_child(parent, k);
        }

        let fired = Rc::new(RefCell::new(0));
        let sink = fired.clone();
        tree.on_child_removed(parent, move |_, _, _| *sink.borrow_mut() += 1);

        tree.remove_all_children(parent);
        assert!(tree.children(parent).is_empty());
        assert_eq!(*fired.borrow(), 3);
        for &k in &kids {
            assert_eq!(tree.parent(k), None);
            assert!(tree.contains(k));
        }
    }

    // ------------------------------------------------------------------
    // Attributes, visibility, traversal, subscriptions
    // ------------------------------------------------------------------

    #[test]
    fn test_attributes_round_trip_and_missing_key() {
        let mut tree = PropertyTree::new();
        let p = scalar(&mut tree, "p");
        tree.set_attribute(p, "minimum", 0);
        tree.set_attribute(p, "maximum", 100);

        assert_eq!(tree.attribute(p, "minimum"), PropertyValue::Int(0));
        assert_eq!(tree.attribute(p, "absent"), PropertyValue::Null);
        assert_eq!(tree.get(p).unwrap().attributes().count(), 2);

        assert_eq!(tree.remove_attribute(p, "maximum"), Some(PropertyValue::Int(100)));
        assert_eq!(tree.attribute(p, "maximum"), PropertyValue::Null);
    }

    #[test]
    fn test_visibility_flags() {
        let mut tree = PropertyTree::new();
        let p = scalar(&mut tree, "p");
        assert!(tree.is_visible(p));
        assert!(tree.is_self_visible(p));
        tree.set_visible(p, false);
        tree.set_self_visible(p, false);
        assert!(!tree.is_visible(p));
        assert!(!tree.is_self_visible(p));
    }

    #[test]
    fn test_ancestors_and_descendants() {
        let mut tree = PropertyTree::new();
        let a = scalar(&mut tree, "a");
        let b = scalar(&mut tree, "b");
        let c = scalar(&mut tree, "c");
        tree.add_child(a, b);
        tree.add_child(b, c);

        assert_eq!(tree.ancestors(c), vec![b, a]);
        assert_eq!(tree.ancestors(a), Vec::<PropertyId>::new());
        let mut down = tree.descendants(a);
        down.sort();
        let mut expected = vec![b, c];
        expected.sort();
        assert_eq!(down, expected);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut tree = PropertyTree::new();
        let p = scalar(&mut tree, "p");
        let fired = Rc::new(RefCell::new(0));
        let sink = fired.clone();
        let observer = tree.on_value_changed(p, move |_, _| *sink.borrow_mut() += 1);

        tree.set_value(p, 1);
        assert!(tree.unsubscribe(observer));
        tree.set_value(p, 2);
        assert_eq!(*fired.borrow(), 1);
        assert!(!tree.unsubscribe(observer));
    }

    #[test]
    fn test_observer_reads_consistent_state_during_dispatch() {
        let mut tree = PropertyTree::new();
        let list = tree.create_list("l");
        let x = scalar(&mut tree, "x");
        let y = scalar(&mut tree, "y");
        tree.add_child(list, x);
        tree.add_child(list, y);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        tree.on_value_changed(x, move |t, changed| {
            // a callback can read siblings mid-cascade
            sink.borrow_mut()
                .push((t.value(changed).clone(), t.value_string(changed)));
        });

        tree.set_value(x, 5);
        assert_eq!(
            seen.borrow().as_slice(),
            &[(PropertyValue::Int(5), "5".to_string())]
        );
    }
}
