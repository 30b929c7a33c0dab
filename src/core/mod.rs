//! Core types and traits for jk-nodes.
//!
//! This module contains the foundational types every node builds on:
//! - Value types and the image tensor
//! - Resampling kernels and hub bundles
//! - Port definitions and constraints
//! - Node traits and metadata
//! - Error types
//! - Execution and validation contexts

pub mod types;
pub mod tensor;
pub mod resample;
pub mod bundle;
pub mod port;
pub mod error;
pub mod context;
pub mod node;

// Re-export commonly used types
pub use types::{Value, PortType};
pub use tensor::{ImageBatch, ImageShape};
pub use resample::ResizeMethod;
pub use bundle::{Bundle, BundleArity};
pub use port::{PortDefinition, PortDirection, ParameterDefinition, Constraint, UiHint};
pub use error::{JkError, NodeId, ValidationError, ExecutionError, ValidationReport};
pub use context::{ValidationContext, ExecutionContext, NodeOutput};
pub use node::{FilterNode, NodeMetadata, Category};
