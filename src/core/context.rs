//! Execution and validation contexts.
//!
//! Contexts carry the resolved inputs and parameters of one node invocation.
//! The execution context also collects the outputs and the optional display
//! payload the node produces.

use crate::core::bundle::Bundle;
use crate::core::error::{ExecutionError, NodeId, ValidationError};
use crate::core::tensor::ImageBatch;
use crate::core::types::{PortType, Value};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;

/// Context provided during node validation.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    /// ID of the invocation being validated.
    pub node_id: NodeId,
    inputs: HashMap<String, Value>,
    parameters: HashMap<String, Value>,
}

impl ValidationContext {
    /// Create a new validation context.
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            inputs: HashMap::new(),
            parameters: HashMap::new(),
        }
    }

    /// Add an input value to the context.
    pub fn add_input(&mut self, name: impl Into<String>, value: Value) {
        self.inputs.insert(name.into(), value);
    }

    /// Add a parameter value to the context.
    pub fn add_parameter(&mut self, name: impl Into<String>, value: Value) {
        self.parameters.insert(name.into(), value);
    }

    // ========================================================================
    // Input Getters
    // ========================================================================

    /// Get an input value by name.
    pub fn get_input(&self, name: &str) -> Result<&Value, ValidationError> {
        self.inputs.get(name).ok_or_else(|| ValidationError::MissingRequiredInput {
            node_id: self.node_id,
            port: name.to_string(),
        })
    }

    /// Get an input as an image batch.
    pub fn get_input_image(&self, name: &str) -> Result<&ImageBatch, ValidationError> {
        let value = self.get_input(name)?;
        value.as_image().ok_or_else(|| ValidationError::TypeMismatch {
            port: name.to_string(),
            expected: PortType::Image,
            got: value.get_type(),
        })
    }

    /// Check if an input exists.
    pub fn has_input(&self, name: &str) -> bool {
        self.inputs.contains_key(name)
    }

    // ========================================================================
    // Parameter Getters
    // ========================================================================

    /// Get a parameter value by name.
    pub fn get_parameter(&self, name: &str) -> Result<&Value, ValidationError> {
        self.parameters.get(name).ok_or_else(|| ValidationError::ConstraintViolation {
            node_id: self.node_id,
            parameter: name.to_string(),
            error: "Parameter not set".to_string(),
        })
    }

    fn typed_parameter<'a, T>(
        &'a self,
        name: &str,
        expected: PortType,
        get: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<T, ValidationError> {
        let value = self.get_parameter(name)?;
        get(value).ok_or_else(|| ValidationError::TypeMismatch {
            port: name.to_string(),
            expected,
            got: value.get_type(),
        })
    }

    /// Get a parameter as an integer.
    pub fn get_integer(&self, name: &str) -> Result<i64, ValidationError> {
        self.typed_parameter(name, PortType::Integer, Value::as_integer)
    }

    /// Get a parameter as a float.
    pub fn get_float(&self, name: &str) -> Result<f64, ValidationError> {
        self.typed_parameter(name, PortType::Float, Value::as_float)
    }

    /// Get a parameter as a string.
    pub fn get_string(&self, name: &str) -> Result<&str, ValidationError> {
        self.typed_parameter(name, PortType::String, Value::as_string)
    }

    /// Get a parameter as a boolean.
    pub fn get_bool(&self, name: &str) -> Result<bool, ValidationError> {
        self.typed_parameter(name, PortType::Boolean, Value::as_bool)
    }

    /// Check if a parameter exists.
    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }
}

/// Context provided during node execution.
#[derive(Debug)]
pub struct ExecutionContext {
    /// ID of the invocation being executed.
    pub node_id: NodeId,
    inputs: HashMap<String, Value>,
    parameters: HashMap<String, Value>,
    /// Outputs in the order the node set them.
    outputs: IndexMap<String, Value>,
    /// Text shown by the host next to an output node.
    display: Option<Vec<String>>,
}

impl ExecutionContext {
    /// Create a new execution context.
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            inputs: HashMap::new(),
            parameters: HashMap::new(),
            outputs: IndexMap::new(),
            display: None,
        }
    }

    /// Add an input value to the context.
    pub fn add_input(&mut self, name: impl Into<String>, value: Value) {
        self.inputs.insert(name.into(), value);
    }

    /// Add a parameter value to the context.
    pub fn add_parameter(&mut self, name: impl Into<String>, value: Value) {
        self.parameters.insert(name.into(), value);
    }

    /// Get all outputs.
    pub fn outputs(&self) -> &IndexMap<String, Value> {
        &self.outputs
    }

    /// Take the outputs and the display payload.
    pub fn into_parts(self) -> (IndexMap<String, Value>, Option<Vec<String>>) {
        (self.outputs, self.display)
    }

    // ========================================================================
    // Input Getters
    // ========================================================================

    /// Get an input value by name.
    pub fn get_input(&self, name: &str) -> Result<&Value, ExecutionError> {
        self.inputs.get(name).ok_or_else(|| ExecutionError::MissingInput {
            node_id: self.node_id,
            port: name.to_string(),
        })
    }

    /// Get an optional input; absent and `Value::None` both yield `None`.
    pub fn get_input_optional(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name).filter(|v| !v.is_none())
    }

    /// Get an input as an image batch.
    pub fn get_input_image(&self, name: &str) -> Result<&ImageBatch, ExecutionError> {
        self.get_input(name)?
            .as_image()
            .ok_or_else(|| ExecutionError::NodeExecution {
                node_id: self.node_id,
                error: format!("Input '{}' is not an image", name),
            })
    }

    /// Get an optional input as an image batch.
    pub fn get_input_image_optional(&self, name: &str) -> Option<&ImageBatch> {
        self.inputs.get(name).and_then(Value::as_image)
    }

    /// Get an input as a bundle.
    pub fn get_input_bundle(&self, name: &str) -> Result<&Bundle, ExecutionError> {
        self.get_input(name)?
            .as_bundle()
            .ok_or_else(|| ExecutionError::NodeExecution {
                node_id: self.node_id,
                error: format!("Input '{}' is not a bundle", name),
            })
    }

    /// Check if an input exists.
    pub fn has_input(&self, name: &str) -> bool {
        self.inputs.contains_key(name)
    }

    // ========================================================================
    // Parameter Getters
    // ========================================================================

    /// Get a parameter value by name.
    pub fn get_parameter(&self, name: &str) -> Result<&Value, ExecutionError> {
        self.parameters.get(name).ok_or_else(|| ExecutionError::MissingParameter {
            node_id: self.node_id,
            parameter: name.to_string(),
        })
    }

    fn typed_parameter<'a, T>(
        &'a self,
        name: &str,
        kind: &str,
        get: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<T, ExecutionError> {
        get(self.get_parameter(name)?).ok_or_else(|| ExecutionError::NodeExecution {
            node_id: self.node_id,
            error: format!("Parameter '{}' is not {}", name, kind),
        })
    }

    /// Get a parameter as an integer.
    pub fn get_integer(&self, name: &str) -> Result<i64, ExecutionError> {
        self.typed_parameter(name, "an integer", Value::as_integer)
    }

    /// Get a parameter as a float.
    pub fn get_float(&self, name: &str) -> Result<f64, ExecutionError> {
        self.typed_parameter(name, "a float", Value::as_float)
    }

    /// Get a parameter as a string.
    pub fn get_string(&self, name: &str) -> Result<&str, ExecutionError> {
        self.typed_parameter(name, "a string", Value::as_string)
    }

    /// Get a parameter as a boolean.
    pub fn get_bool(&self, name: &str) -> Result<bool, ExecutionError> {
        self.typed_parameter(name, "a boolean", Value::as_bool)
    }

    /// Check if a parameter exists.
    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    // ========================================================================
    // Output Setters
    // ========================================================================

    /// Set an output value.
    pub fn set_output(&mut self, name: impl Into<String>, value: Value) -> Result<(), ExecutionError> {
        self.outputs.insert(name.into(), value);
        Ok(())
    }

    /// Set an output image batch.
    pub fn set_output_image(&mut self, name: impl Into<String>, image: ImageBatch) -> Result<(), ExecutionError> {
        self.set_output(name, Value::Image(image))
    }

    /// Check if an output has been set.
    pub fn has_output(&self, name: &str) -> bool {
        self.outputs.contains_key(name)
    }

    /// Set the display payload.
    pub fn set_display(&mut self, lines: Vec<String>) {
        self.display = Some(lines);
    }

    /// The display payload, if any.
    pub fn display(&self) -> Option<&[String]> {
        self.display.as_deref()
    }
}

/// Convert ValidationContext to ExecutionContext.
impl From<ValidationContext> for ExecutionContext {
    fn from(val_ctx: ValidationContext) -> Self {
        let mut exec_ctx = ExecutionContext::new(val_ctx.node_id);
        exec_ctx.inputs = val_ctx.inputs;
        exec_ctx.parameters = val_ctx.parameters;
        exec_ctx
    }
}

/// Result of one node invocation.
#[derive(Debug, Clone, Serialize)]
pub struct NodeOutput {
    /// Output values, in the node's declared order.
    pub values: IndexMap<String, Value>,
    /// Display payload of output nodes.
    pub display: Option<Vec<String>>,
}

impl NodeOutput {
    /// Get an output by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Get an output by position.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get_index(index).map(|(_, v)| v)
    }

    /// Number of outputs.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the node produced no outputs.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Output values in order, without names.
    pub fn into_values(self) -> Vec<Value> {
        self.values.into_values().collect()
    }
}
