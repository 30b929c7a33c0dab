//! Node module.
//!
//! Contains the node registry and built-in node implementations.

pub mod registry;
pub mod builtin;

pub use registry::{FilterRegistry, FilterFactory, RegistryBuilder};
