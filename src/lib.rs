//! # eustress-proptree
//!
//! Property-tree data model backing the Studio properties panel: a hierarchy
//! of named, typed property nodes that hold values, notify observers of
//! changes, and keep composite values synchronized with their children.
//! Rendering and input handling live in the widget layer; this crate is only
//! the model.
//!
//! ## Features
//! - `PropertyTree`: arena owning the hierarchy, all mutation and dispatch
//! - `PropertyValue`: closed variant type with equality-gated notifications
//! - `PropertyKind`: scalar, list (index-synced), dict (name-synced), group
//! - Per-property publish-subscribe for value-changed, child-inserted, and
//!   child-removed notifications
//! - `PropertyType`: integer tags shared with the editor-type factory
//!
//! ## Table of Contents
//! 1. Error types (`error`)
//! 2. Notification channels (`events`)
//! 3. Node identity and storage (`property`)
//! 4. Tree operations (`tree`)
//! 5. Type tags (`types`)
//! 6. Values (`value`)

mod error;
mod events;
mod property;
mod tree;
mod types;
mod value;

pub use error::*;
pub use events::*;
pub use property::*;
pub use tree::*;
pub use types::*;
pub use value::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{PropertyError, Result};
    pub use crate::events::ObserverId;
    pub use crate::property::{PropertyId, PropertyKind, PropertyNode};
    pub use crate::tree::PropertyTree;
    pub use crate::types::PropertyType;
    pub use crate::value::{PropertyValue, ValueList, ValueMap};
}
