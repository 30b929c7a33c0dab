//! FilterNode trait and node metadata.
//!
//! Every node is a stateless operation with a two-phase contract: `validate`
//! checks the resolved inputs and parameters, `execute` produces outputs.

use crate::core::context::{ExecutionContext, ValidationContext};
use crate::core::error::{ExecutionError, ValidationError};
use crate::core::port::{ParameterDefinition, PortDefinition};
use serde::Serialize;

/// Category for organizing nodes in the host's menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Image geometry and inspection
    Image,
    /// Text input, conversion and preview
    Text,
    /// Resolution helpers and bundling
    Utils,
}

impl Category {
    /// Get the display name for this category.
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Image => "Image",
            Category::Text => "Text",
            Category::Utils => "Utils",
        }
    }

    /// Menu path below a category root, e.g. `"jk Nodes/image"`.
    pub fn path(&self, root: &str) -> String {
        format!("{}/{}", root, self.display_name().to_lowercase())
    }

    /// Get all categories in display order.
    pub fn all() -> &'static [Category] {
        &[Category::Image, Category::Text, Category::Utils]
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Utils
    }
}

/// Metadata describing a node.
///
/// Holds everything the host needs to list the node, draw its widgets and
/// check values at its boundary.
#[derive(Debug, Clone, Serialize)]
pub struct NodeMetadata {
    /// Unique identifier for this node type (e.g., "resize_image")
    pub id: String,
    /// Human-readable name (e.g., "Resize Image")
    pub name: String,
    /// Category for menu organization
    pub category: Category,
    /// Detailed description
    pub description: String,
    /// Version string
    pub version: String,
    /// Author or source
    pub author: String,

    /// Input port definitions
    pub inputs: Vec<PortDefinition>,
    /// Output port definitions
    pub outputs: Vec<PortDefinition>,
    /// Parameter definitions
    pub parameters: Vec<ParameterDefinition>,

    /// Whether the node emits a display payload
    pub output_node: bool,
    /// Whether inputs arrive as whole lists rather than one element at a time
    pub input_is_list: bool,
}

impl NodeMetadata {
    /// Create a new metadata builder.
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> NodeMetadataBuilder {
        NodeMetadataBuilder::new(id, name)
    }

    /// Get all input port names.
    pub fn input_names(&self) -> Vec<&str> {
        self.inputs.iter().map(|p| p.name.as_str()).collect()
    }

    /// Get all output port names.
    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|p| p.name.as_str()).collect()
    }

    /// Get all parameter names.
    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    /// Find an input port by name.
    pub fn get_input(&self, name: &str) -> Option<&PortDefinition> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Find an output port by name.
    pub fn get_output(&self, name: &str) -> Option<&PortDefinition> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Find a parameter by name.
    pub fn get_parameter(&self, name: &str) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Builder for NodeMetadata.
pub struct NodeMetadataBuilder {
    id: String,
    name: String,
    category: Category,
    description: String,
    version: String,
    author: String,
    inputs: Vec<PortDefinition>,
    outputs: Vec<PortDefinition>,
    parameters: Vec<ParameterDefinition>,
    output_node: bool,
    input_is_list: bool,
}

impl NodeMetadataBuilder {
    /// Create a new builder with required fields.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: Category::default(),
            description: String::new(),
            version: "1.0.0".to_string(),
            author: "jk".to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            parameters: Vec::new(),
            output_node: false,
            input_is_list: false,
        }
    }

    /// Set the category.
    pub fn category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the author.
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Add an input port.
    pub fn input(mut self, port: PortDefinition) -> Self {
        self.inputs.push(port);
        self
    }

    /// Add several input ports.
    pub fn inputs(mut self, ports: impl IntoIterator<Item = PortDefinition>) -> Self {
        self.inputs.extend(ports);
        self
    }

    /// Add an output port.
    pub fn output(mut self, port: PortDefinition) -> Self {
        self.outputs.push(port);
        self
    }

    /// Add several output ports.
    pub fn outputs(mut self, ports: impl IntoIterator<Item = PortDefinition>) -> Self {
        self.outputs.extend(ports);
        self
    }

    /// Add a parameter.
    pub fn parameter(mut self, param: ParameterDefinition) -> Self {
        self.parameters.push(param);
        self
    }

    /// Mark as an output node that emits a display payload.
    pub fn output_node(mut self) -> Self {
        self.output_node = true;
        self
    }

    /// Receive inputs as whole lists.
    pub fn input_is_list(mut self) -> Self {
        self.input_is_list = true;
        self
    }

    /// Build the metadata.
    pub fn build(self) -> NodeMetadata {
        NodeMetadata {
            id: self.id,
            name: self.name,
            category: self.category,
            description: self.description,
            version: self.version,
            author: self.author,
            inputs: self.inputs,
            outputs: self.outputs,
            parameters: self.parameters,
            output_node: self.output_node,
            input_is_list: self.input_is_list,
        }
    }
}

/// The core trait for nodes.
///
/// # Design
///
/// 1. **Validation Phase** (`validate`): called after the invoker has checked
///    types, ranges and enumerations. Nodes use it for checks that depend on
///    several values at once, or on parsing a value.
///
/// 2. **Execution Phase** (`execute`): reads inputs, computes, and sets every
///    declared output.
///
/// Nodes hold no per-call state; `Send + Sync` lets a host share them.
///
/// # Example Implementation
///
/// ```ignore
/// #[derive(Debug, Clone)]
/// struct Invert;
///
/// impl FilterNode for Invert {
///     fn metadata(&self) -> NodeMetadata {
///         NodeMetadata::builder("invert_image", "Invert Image")
///             .category(Category::Image)
///             .input(PortDefinition::input("image", PortType::Image))
///             .output(PortDefinition::output("image", PortType::Image))
///             .build()
///     }
///
///     fn validate(&self, _ctx: &ValidationContext) -> Result<(), ValidationError> {
///         Ok(())
///     }
///
///     fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
///         let image = ctx.get_input_image("image")?;
///         let inverted = image.view().mapv(|v| 1.0 - v);
///         ctx.set_output_image("image", ImageBatch::new(inverted))
///     }
///
///     fn clone_box(&self) -> Box<dyn FilterNode> {
///         Box::new(self.clone())
///     }
/// }
/// ```
pub trait FilterNode: Send + Sync {
    /// Get the metadata for this node.
    ///
    /// Called during registration and on every invocation; must return
    /// consistent values.
    fn metadata(&self) -> NodeMetadata;

    /// Validate the resolved inputs and parameters.
    fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidationError>;

    /// Execute the node.
    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError>;

    /// Clone this node into a boxed trait object.
    fn clone_box(&self) -> Box<dyn FilterNode>;
}

impl Clone for Box<dyn FilterNode> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PortType;

    #[test]
    fn test_metadata_builder() {
        let metadata = NodeMetadata::builder("preview_text", "Preview Text")
            .category(Category::Text)
            .description("Show values as text")
            .input(PortDefinition::input("any", PortType::Any))
            .output(PortDefinition::output("text", PortType::String))
            .output_node()
            .input_is_list()
            .build();

        assert_eq!(metadata.id, "preview_text");
        assert_eq!(metadata.category, Category::Text);
        assert_eq!(metadata.input_names(), ["any"]);
        assert_eq!(metadata.output_names(), ["text"]);
        assert!(metadata.output_node);
        assert!(metadata.input_is_list);
        assert!(metadata.get_parameter("text").is_none());
    }

    #[test]
    fn test_builder_defaults() {
        let metadata = NodeMetadata::builder("x", "X").build();
        assert!(!metadata.output_node);
        assert!(!metadata.input_is_list);
        assert_eq!(metadata.category, Category::Utils);
    }

    #[test]
    fn test_category_path() {
        assert_eq!(Category::Image.path("jk Nodes"), "jk Nodes/image");
        assert_eq!(Category::Utils.display_name(), "Utils");
        assert_eq!(Category::all().len(), 3);
    }
}
