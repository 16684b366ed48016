//! Observer registration and notification dispatch
//!
//! ## Table of Contents
//! 1. Callback type aliases
//! 2. ObserverId - Registration handle
//! 3. Observers - Per-property registries for the three channels
//! 4. Registration and dispatch on PropertyTree
//!
//! Each property exposes three notification channels: value-changed,
//! child-inserted, and child-removed. Observers register against a specific
//! property; there is no global dispatch. Callbacks run synchronously at the
//! emission point and receive a shared borrow of the tree, so they observe
//! fully-consistent state and cannot mutate the tree re-entrantly.

use crate::property::PropertyId;
use crate::tree::PropertyTree;
use std::collections::HashMap;

/// Value-changed callback. The second argument is the property whose value
/// changed, which for group properties is the forwarded child rather than
/// the group itself.
pub type ValueChangedFn = Box<dyn FnMut(&PropertyTree, PropertyId)>;

/// Child-inserted callback, called with (child, parent)
pub type ChildInsertedFn = Box<dyn FnMut(&PropertyTree, PropertyId, PropertyId)>;

/// Child-removed callback, called with (child, parent). The parent is `None`
/// when a property being destroyed announces its own removal and has no
/// parent at that point.
pub type ChildRemovedFn = Box<dyn FnMut(&PropertyTree, PropertyId, Option<PropertyId>)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Channel {
    ValueChanged,
    ChildInserted,
    ChildRemoved,
}

/// Handle returned by a registration, used to unsubscribe
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObserverId {
    target: PropertyId,
    channel: Channel,
    token: u64,
}

/// Per-property observer registries
#[derive(Default)]
pub(crate) struct Observers {
    next_token: u64,
    value_changed: HashMap<PropertyId, Vec<(u64, ValueChangedFn)>>,
    child_inserted: HashMap<PropertyId, Vec<(u64, ChildInsertedFn)>>,
    child_removed: HashMap<PropertyId, Vec<(u64, ChildRemovedFn)>>,
}

impl Observers {
    fn next_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    /// Drop every registration targeting a destroyed property
    pub(crate) fn clear_property(&mut self, id: PropertyId) {
        self.value_changed.remove(&id);
        self.child_inserted.remove(&id);
        self.child_removed.remove(&id);
    }
}

impl PropertyTree {
    /// Observe value changes on `target`.
    ///
    /// The callback receives the property whose value changed; for a group
    /// target this is the child the group forwarded.
    pub fn on_value_changed<F>(&mut self, target: PropertyId, callback: F) -> ObserverId
    where
        F: FnMut(&PropertyTree, PropertyId) + 'static,
    {
        assert!(self.contains(target), "cannot observe a property that is not in the tree");
        let token = self.observers.next_token();
        self.observers
            .value_changed
            .entry(target)
            .or_default()
            .push((token, Box::new(callback)));
        ObserverId {
            target,
            channel: Channel::ValueChanged,
            token,
        }
    }

    /// Observe children being attached to `target`
    pub fn on_child_inserted<F>(&mut self, target: PropertyId, callback: F) -> ObserverId
    where
        F: FnMut(&PropertyTree, PropertyId, PropertyId) + 'static,
    {
        assert!(self.contains(target), "cannot observe a property that is not in the tree");
        let token = self.observers.next_token();
        self.observers
            .child_inserted
            .entry(target)
            .or_default()
            .push((token, Box::new(callback)));
        ObserverId {
            target,
            channel: Channel::ChildInserted,
            token,
        }
    }

    /// Observe children being detached from `target`, and `target`'s own
    /// removal notice when it is destroyed
    pub fn on_child_removed<F>(&mut self, target: PropertyId, callback: F) -> ObserverId
    where
        F: FnMut(&PropertyTree, PropertyId, Option<PropertyId>) + 'static,
    {
        assert!(self.contains(target), "cannot observe a property that is not in the tree");
        let token = self.observers.next_token();
        self.observers
            .child_removed
            .entry(target)
            .or_default()
            .push((token, Box::new(callback)));
        ObserverId {
            target,
            channel: Channel::ChildRemoved,
            token,
        }
    }

    /// Remove a registration. Returns false when it was already gone, for
    /// example because its target has been destroyed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        match id.channel {
            Channel::ValueChanged => Self::remove_token(&mut self.observers.value_changed, id),
            Channel::ChildInserted => Self::remove_token(&mut self.observers.child_inserted, id),
            Channel::ChildRemoved => Self::remove_token(&mut self.observers.child_removed, id),
        }
    }

    fn remove_token<F>(registry: &mut HashMap<PropertyId, Vec<(u64, F)>>, id: ObserverId) -> bool {
        let Some(callbacks) = registry.get_mut(&id.target) else {
            return false;
        };
        let before = callbacks.len();
        callbacks.retain(|(token, _)| *token != id.token);
        callbacks.len() != before
    }

    // ------------------------------------------------------------------
    // Dispatch. The emitter's callback list is taken out of the registry
    // for the duration of the calls so the tree can be reborrowed shared.
    // ------------------------------------------------------------------

    pub(crate) fn dispatch_value_changed(&mut self, emitter: PropertyId, changed: PropertyId) {
        let Some(mut callbacks) = self.observers.value_changed.remove(&emitter) else {
            return;
        };
        for (_, callback) in callbacks.iter_mut() {
            callback(self, changed);
        }
        if let Some(rest) = self.observers.value_changed.remove(&emitter) {
            callbacks.extend(rest);
        }
        self.observers.value_changed.insert(emitter, callbacks);
    }

    pub(crate) fn dispatch_child_inserted(
        &mut self,
        emitter: PropertyId,
        child: PropertyId,
        parent: PropertyId,
    ) {
        let Some(mut callbacks) = self.observers.child_inserted.remove(&emitter) else {
            return;
        };
        for (_, callback) in callbacks.iter_mut() {
            callback(self, child, parent);
        }
        if let Some(rest) = self.observers.child_inserted.remove(&emitter) {
            callbacks.extend(rest);
        }
        self.observers.child_inserted.insert(emitter, callbacks);
    }

    pub(crate) fn dispatch_child_removed(
        &mut self,
        emitter: PropertyId,
        child: PropertyId,
        parent: Option<PropertyId>,
    ) {
        let Some(mut callbacks) = self.observers.child_removed.remove(&emitter) else {
            return;
        };
        for (_, callback) in callbacks.iter_mut() {
            callback(self, child, parent);
        }
        if let Some(rest) = self.observers.child_removed.remove(&emitter) {
            callbacks.extend(rest);
        }
        self.observers.child_removed.insert(emitter, callbacks);
    }
}
