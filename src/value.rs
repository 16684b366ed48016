//! PropertyValue - Dynamically typed value stored by every property
//!
//! ## Table of Contents
//! 1. PropertyValue - Closed variant enum
//! 2. Coercions (to_list / to_map)
//! 3. Display (default stringification)
//! 4. From / TryFrom conversions
//! 5. JSON interop

use crate::error::{PropertyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered sequence value, index-aligned with a list property's children
pub type ValueList = Vec<PropertyValue>;

/// Name-keyed mapping value, keyed by a dict property's child names.
/// BTreeMap keeps key order deterministic, matching the sorted QMap the
/// original widget toolkit used.
pub type ValueMap = BTreeMap<String, PropertyValue>;

/// Dynamically typed value held by a property or attribute.
///
/// Equality on this enum is what decides whether a value-changed
/// notification fires: storing an equal value is a guaranteed no-op.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// Empty variant, also the value of a missing attribute or map entry
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Ordered sequence (list property aggregate)
    List(ValueList),
    /// Name-keyed mapping (dict property aggregate)
    Map(ValueMap),
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// Variant name, used in conversion error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Null => "null",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Int(_) => "int",
            PropertyValue::Float(_) => "float",
            PropertyValue::String(_) => "string",
            PropertyValue::List(_) => "list",
            PropertyValue::Map(_) => "map",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ValueList> {
        match self {
            PropertyValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            PropertyValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Coerce to a sequence. Non-list variants coerce to an empty sequence,
    /// which is what lets a list property treat any stored value uniformly
    /// when distributing to children.
    pub fn to_list(&self) -> ValueList {
        match self {
            PropertyValue::List(l) => l.clone(),
            _ => ValueList::new(),
        }
    }

    /// Coerce to a mapping. Non-map variants coerce to an empty mapping.
    pub fn to_map(&self) -> ValueMap {
        match self {
            PropertyValue::Map(m) => m.clone(),
            _ => ValueMap::new(),
        }
    }
}

impl fmt::Display for PropertyValue {
    /// Default stringification: scalars render directly, Null and the
    /// composite variants render empty. List properties build their own
    /// parenthesized form from children instead.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => Ok(()),
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Int(i) => write!(f, "{}", i),
            PropertyValue::Float(v) => write!(f, "{}", v),
            PropertyValue::String(s) => f.write_str(s),
            PropertyValue::List(_) | PropertyValue::Map(_) => Ok(()),
        }
    }
}

// ============================================================================
// From conversions (construction)
// ============================================================================

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Int(i as i64)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Int(i)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<ValueList> for PropertyValue {
    fn from(l: ValueList) -> Self {
        PropertyValue::List(l)
    }
}

impl From<ValueMap> for PropertyValue {
    fn from(m: ValueMap) -> Self {
        PropertyValue::Map(m)
    }
}

// ============================================================================
// TryFrom conversions (extraction, widget layer)
// ============================================================================

macro_rules! try_from_value {
    ($target:ty, $variant:ident, $expected:literal) => {
        impl TryFrom<PropertyValue> for $target {
            type Error = PropertyError;

            fn try_from(value: PropertyValue) -> Result<Self> {
                match value {
                    PropertyValue::$variant(v) => Ok(v),
                    other => Err(PropertyError::ValueType {
                        expected: $expected,
                        actual: other.type_name(),
                    }),
                }
            }
        }
    };
}

try_from_value!(bool, Bool, "bool");
try_from_value!(i64, Int, "int");
try_from_value!(f64, Float, "float");
try_from_value!(String, String, "string");
try_from_value!(ValueList, List, "list");
try_from_value!(ValueMap, Map, "map");

// ============================================================================
// JSON interop
// ============================================================================

impl PropertyValue {
    /// Convert to a `serde_json::Value` for widget layers that speak JSON
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PropertyValue::Null => serde_json::Value::Null,
            PropertyValue::Bool(b) => serde_json::json!(b),
            PropertyValue::Int(i) => serde_json::json!(i),
            PropertyValue::Float(f) => serde_json::json!(f),
            PropertyValue::String(s) => serde_json::json!(s),
            PropertyValue::List(l) => {
                serde_json::Value::Array(l.iter().map(|v| v.to_json()).collect())
            }
            PropertyValue::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Build from a `serde_json::Value`. Integral JSON numbers map to `Int`,
    /// the rest to `Float`.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => PropertyValue::Null,
            serde_json::Value::Bool(b) => PropertyValue::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    PropertyValue::Int(i)
                } else {
                    PropertyValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => PropertyValue::String(s.clone()),
            serde_json::Value::Array(a) => {
                PropertyValue::List(a.iter().map(PropertyValue::from_json).collect())
            }
            serde_json::Value::Object(o) => PropertyValue::Map(
                o.iter()
                    .map(|(k, v)| (k.clone(), PropertyValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}
