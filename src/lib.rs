//! # jk-nodes - Utility Nodes for Image Generation Graphs
//!
//! A pack of small, stateless nodes for node-graph image generation
//! pipelines. Each node is one pure operation over its inputs:
//!
//! - **Image geometry**: resize, center crop, concatenate two images,
//!   stack batches, inspect shapes
//! - **Text**: trimmed text entry, value-to-text conversion, text preview
//! - **Utilities**: aspect-ratio to SDXL resolution, and hub
//!   concentrators/deconcentrators that route several values through one
//!   connection
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use jk_nodes::prelude::*;
//! use std::collections::HashMap;
//!
//! let registry = FilterRegistry::with_builtins();
//! let invoker = NodeInvoker::new(&registry);
//!
//! let mut inputs = HashMap::new();
//! inputs.insert("image".to_string(), Value::Image(ImageBatch::zeros((1, 512, 768, 3))));
//!
//! let output = invoker.invoke("get_image_shape", inputs, HashMap::new())?;
//! assert_eq!(output.display, Some(vec!["[1, 512, 768, 3]".to_string()]));
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: values, image tensors, resampling, bundles, ports, node trait, errors
//! - [`execution`]: boundary validation and single node invocation
//! - [`filters`]: node registry and built-in nodes
//! - [`config`]: pack configuration loaded from TOML

#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod execution;
pub mod filters;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use jk_nodes::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::types::{PortType, Value};
    pub use crate::core::tensor::{ImageBatch, ImageShape};
    pub use crate::core::resample::ResizeMethod;
    pub use crate::core::bundle::{Bundle, BundleArity};

    // Node traits and types
    pub use crate::core::node::{Category, FilterNode, NodeMetadata};

    // Port definitions
    pub use crate::core::port::{Constraint, ParameterDefinition, PortDefinition, UiHint};

    // Contexts
    pub use crate::core::context::{ExecutionContext, NodeOutput, ValidationContext};

    // Errors
    pub use crate::core::error::{
        ExecutionError, JkError, NodeId, ValidationError, ValidationReport, ValidationWarning,
    };

    // Configuration
    pub use crate::config::{ConfigError, PackConfig};

    // Execution
    pub use crate::execution::invoke::{invoke_node, NodeInvoker};

    // Registry
    pub use crate::filters::registry::{FilterFactory, FilterRegistry, RegistryBuilder, RegistryEntry};

    // Built-in nodes
    pub use crate::filters::builtin::{
        // Image
        CenterCropImage, ConcatenateImages, GetImageShape, ResizeImage, StackImagesToBatch,
        // Text
        InputText, PreviewText, ToText,
        // Utils
        AspectRatioToSize, Concentrator, Deconcentrator,
    };
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::collections::HashMap;

    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
        assert_eq!(super::NAME, "jk-nodes");
    }

    #[test]
    fn test_registry_with_builtins() {
        let registry = FilterRegistry::with_builtins();

        assert_eq!(registry.len(), 13);
        for id in [
            "resize_image",
            "center_crop_image",
            "concatenate_images",
            "stack_images_to_batch",
            "get_image_shape",
            "input_text",
            "to_text",
            "preview_text",
            "sdxl_aspect_ratio_to_width_height",
            "concentrator_6to1",
            "concentrator_8to1",
            "deconcentrator_1to6",
            "deconcentrator_1to8",
        ] {
            assert!(registry.contains(id), "{}", id);
        }
    }

    #[test]
    fn test_pipeline_resolve_then_resize_then_shape() {
        let registry = FilterRegistry::with_builtins();
        let invoker = NodeInvoker::new(&registry);

        let mut params = HashMap::new();
        params.insert("aspect_ratio".to_string(), Value::String("2:1".to_string()));
        let size = invoker.invoke("sdxl_aspect_ratio_to_width_height", HashMap::new(), params).unwrap();

        let mut inputs = HashMap::new();
        inputs.insert("image".to_string(), Value::Image(ImageBatch::filled((1, 32, 32, 3), 0.25)));
        let mut params = HashMap::new();
        params.insert("width".to_string(), Value::Integer(size.get("width").unwrap().as_integer().unwrap() / 16));
        params.insert("height".to_string(), Value::Integer(size.get("height").unwrap().as_integer().unwrap() / 16));
        params.insert("method".to_string(), Value::String("nearest".to_string()));
        let resized = invoker.invoke("resize_image", inputs, params).unwrap();

        let shape = invoker
            .invoke("get_image_shape", resized.values.into_iter().collect(), HashMap::new())
            .unwrap();
        // 2:1 resolves to 1448x728
        assert_eq!(shape.display, Some(vec!["[1, 45, 90, 3]".to_string()]));
    }

    #[test]
    fn test_preview_text_through_invoker() {
        let registry = FilterRegistry::with_builtins();
        let mut inputs = HashMap::new();
        inputs.insert(
            "any".to_string(),
            Value::Array(vec![Value::Integer(1), Value::Boolean(true)]),
        );

        let output = NodeInvoker::new(&registry)
            .invoke("preview_text", inputs, HashMap::new())
            .unwrap();
        assert_eq!(output.display, Some(vec!["1".to_string(), "true".to_string()]));
    }
}
