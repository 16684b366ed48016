//! Property type tags
//!
//! ## Table of Contents
//! 1. PropertyType - Integer tag for registered property types
//! 2. Built-in tag constants

use serde::{Deserialize, Serialize};

/// Integer tag identifying a registered property type.
///
/// Tags are assigned by the owning factory when it registers editor types;
/// the model only stores them, except for [`PropertyType::GROUP`] which it
/// uses to recognize organizational nodes. Custom editor types start at
/// [`PropertyType::USER`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyType(pub i32);

impl PropertyType {
    /// Unregistered / placeholder type
    pub const NONE: Self = Self(0);
    /// Boolean checkbox editor
    pub const BOOL: Self = Self(1);
    /// Integer spinbox editor
    pub const INT: Self = Self(2);
    /// Floating point spinbox editor
    pub const FLOAT: Self = Self(3);
    /// Line edit editor
    pub const STRING: Self = Self(4);
    /// Index-synchronized composite
    pub const LIST: Self = Self(5);
    /// Name-synchronized composite
    pub const DICT: Self = Self(6);
    /// Organizational container, no value of its own
    pub const GROUP: Self = Self(7);

    /// First tag available for factory-registered custom types
    pub const USER: Self = Self(256);

    /// Tag for the nth factory-registered custom type
    pub fn user(offset: i32) -> Self {
        Self(Self::USER.0 + offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_tags_do_not_collide_with_builtins() {
        assert!(PropertyType::user(0).0 > PropertyType::GROUP.0);
        assert_eq!(PropertyType::user(3), PropertyType(259));
    }
}
