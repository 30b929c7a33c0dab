//! Core value types that flow between nodes.
//!
//! The host graph is dynamically typed, so values are a closed enum:
//! - Wildcard ports accept any variant and pass it on untouched
//! - Pattern matching replaces runtime type recovery
//! - serde handles the tagged representation for metadata dumps

use crate::core::bundle::{Bundle, BundleArity};
use crate::core::tensor::ImageBatch;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Values that can flow between nodes.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum Value {
    /// Batch of images
    Image(ImageBatch),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Boolean value
    Boolean(bool),
    /// Ordered list of values
    Array(Vec<Value>),
    /// Hub bundle of optional values
    Bundle(Bundle),
    /// Absence of a value
    None,
}

/// Port types used to check values at node boundaries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "inner")]
pub enum PortType {
    Image,
    Integer,
    Float,
    String,
    Boolean,
    /// List of a specific type
    Array(Box<PortType>),
    /// Bundle handle of a specific arity
    Bundle(BundleArity),
    /// Accepts any type
    Any,
}

// ============================================================================
// Value Implementation
// ============================================================================

impl Value {
    /// Get the port type of this value.
    pub fn get_type(&self) -> PortType {
        match self {
            Value::Image(_) => PortType::Image,
            Value::Integer(_) => PortType::Integer,
            Value::Float(_) => PortType::Float,
            Value::String(_) => PortType::String,
            Value::Boolean(_) => PortType::Boolean,
            Value::Array(arr) => match arr.first() {
                Some(first) => PortType::Array(Box::new(first.get_type())),
                None => PortType::Array(Box::new(PortType::Any)),
            },
            Value::Bundle(bundle) => PortType::Bundle(bundle.arity()),
            Value::None => PortType::Any,
        }
    }

    /// Try to get this value as an image batch.
    pub fn as_image(&self) -> Option<&ImageBatch> {
        if let Value::Image(img) = self {
            Some(img)
        } else {
            None
        }
    }

    /// Try to get this value as an integer.
    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    /// Try to get this value as a float.
    /// Integers are automatically converted to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_string(&self) -> Option<&str> {
        if let Value::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// Try to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Boolean(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    /// Try to get this value as an array reference.
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        if let Value::Array(arr) = self {
            Some(arr)
        } else {
            None
        }
    }

    /// Try to get this value as a bundle.
    pub fn as_bundle(&self) -> Option<&Bundle> {
        if let Value::Bundle(bundle) = self {
            Some(bundle)
        } else {
            None
        }
    }

    /// Check if this value is None.
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Representation used inside containers, where strings are quoted.
    fn repr(&self) -> String {
        match self {
            Value::String(s) => format!("{:?}", s),
            other => other.to_string(),
        }
    }
}

/// Default value-to-text conversion.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Image(img) => write!(f, "Image{}", img.shape()),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{:?}", fl),
            Value::String(s) => f.write_str(s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Array(arr) => {
                let items: Vec<String> = arr.iter().map(Value::repr).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Bundle(bundle) => {
                let items: Vec<String> = bundle.slots().iter().map(Value::repr).collect();
                write!(f, "{}[{}]", bundle.arity(), items.join(", "))
            }
            Value::None => write!(f, "None"),
        }
    }
}

impl From<ImageBatch> for Value {
    fn from(batch: ImageBatch) -> Self {
        Value::Image(batch)
    }
}

impl From<Bundle> for Value {
    fn from(bundle: Bundle) -> Self {
        Value::Bundle(bundle)
    }
}

// ============================================================================
// PortType Implementation
// ============================================================================

impl PortType {
    /// Check if a value matches this port type.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (PortType::Any, _) => true,
            (PortType::Image, Value::Image(_)) => true,
            (PortType::Integer, Value::Integer(_)) => true,
            (PortType::Float, Value::Float(_)) => true,
            // Integer can be used where float is expected
            (PortType::Float, Value::Integer(_)) => true,
            (PortType::String, Value::String(_)) => true,
            (PortType::Boolean, Value::Boolean(_)) => true,
            (PortType::Array(inner), Value::Array(arr)) => arr.iter().all(|v| inner.matches(v)),
            (PortType::Bundle(arity), Value::Bundle(bundle)) => bundle.arity() == *arity,
            _ => false,
        }
    }

    /// Get a human-readable name for this type.
    pub fn display_name(&self) -> String {
        match self {
            PortType::Image => "IMAGE".to_string(),
            PortType::Integer => "INT".to_string(),
            PortType::Float => "FLOAT".to_string(),
            PortType::String => "STRING".to_string(),
            PortType::Boolean => "BOOLEAN".to_string(),
            PortType::Array(inner) => format!("LIST<{}>", inner.display_name()),
            PortType::Bundle(arity) => arity.handle_name().to_string(),
            PortType::Any => "*".to_string(),
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
