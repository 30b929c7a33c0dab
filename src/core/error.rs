//! Error types for jk-nodes.
//!
//! Errors are split by phase: boundary validation (before a node runs) and
//! execution. Both carry the id of the node invocation that raised them.

use crate::config::ConfigError;
use crate::core::types::PortType;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier of one node invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Top-level error type.
#[derive(Error, Debug)]
pub enum JkError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised at the node boundary, before execution.
#[derive(Error, Debug, Clone, Serialize)]
pub enum ValidationError {
    #[error("Type mismatch on '{port}': expected {expected}, got {got}")]
    TypeMismatch {
        port: String,
        expected: PortType,
        got: PortType,
    },

    #[error("Missing required input '{port}' on node {node_id}")]
    MissingRequiredInput { node_id: NodeId, port: String },

    #[error("Constraint violation on node {node_id}, parameter '{parameter}': {error}")]
    ConstraintViolation {
        node_id: NodeId,
        parameter: String,
        error: String,
    },

    #[error("Custom validation failed on node {node_id}: {error}")]
    CustomValidation { node_id: NodeId, error: String },

    #[error("Unknown node type '{0}'")]
    UnknownNode(String),

    #[error("{0}")]
    Other(String),
}

/// Errors during node execution.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Node {node_id} execution failed: {error}")]
    NodeExecution { node_id: NodeId, error: String },

    #[error("Missing input '{port}' for node {node_id}")]
    MissingInput { node_id: NodeId, port: String },

    #[error("Missing parameter '{parameter}' for node {node_id}")]
    MissingParameter { node_id: NodeId, parameter: String },

    #[error("Output '{port}' was not set by node {node_id}")]
    OutputNotSet { node_id: NodeId, port: String },

    #[error("Input image dimensions do not match for images: {inputs:?}")]
    DimensionMismatch { node_id: NodeId, inputs: Vec<String> },

    #[error("At least one input image must be provided")]
    NoInputs { node_id: NodeId },

    #[error("Cannot concatenate images on node {node_id}: {error}")]
    ShapeMismatch { node_id: NodeId, error: String },

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("{0}")]
    Other(String),
}

// ============================================================================
// Error Utilities
// ============================================================================

impl ValidationError {
    /// Get suggestion for fixing this error.
    pub fn suggested_fix(&self) -> Option<String> {
        match self {
            ValidationError::TypeMismatch { port, expected, .. } => {
                Some(format!("Connect a {} value to '{}'", expected, port))
            }
            ValidationError::MissingRequiredInput { port, .. } => {
                Some(format!("Connect an output to the '{}' input", port))
            }
            ValidationError::ConstraintViolation { parameter, error, .. } => {
                Some(format!("Adjust '{}': {}", parameter, error))
            }
            ValidationError::UnknownNode(_) => {
                Some("Use 'list' to see registered nodes".to_string())
            }
            _ => None,
        }
    }
}

/// Result type alias for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// ============================================================================
// Validation Report
// ============================================================================

/// Every problem found while checking one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// Whether validation passed without errors.
    pub success: bool,
    /// List of errors found.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<ValidationWarning>,
}

/// Non-fatal validation warning.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationWarning {
    /// Warning message.
    pub message: String,
    /// Suggestion for addressing the warning.
    pub suggestion: Option<String>,
}

impl ValidationReport {
    /// Create a new empty report (success).
    pub fn new() -> Self {
        Self {
            success: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error to the report.
    pub fn add_error(&mut self, error: ValidationError) {
        self.success = false;
        self.errors.push(error);
    }

    /// Add a warning to the report.
    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Whether the node may run.
    pub fn can_execute(&self) -> bool {
        self.success
    }

    /// Get a human-readable summary.
    pub fn summary(&self) -> String {
        if self.success {
            if self.warnings.is_empty() {
                "✓ Inputs are valid".to_string()
            } else {
                format!("✓ Inputs are valid with {} warning(s)", self.warnings.len())
            }
        } else {
            format!("✗ Validation failed with {} error(s)", self.errors.len())
        }
    }

    /// Get detailed error messages with suggestions.
    pub fn detailed_errors(&self) -> Vec<String> {
        self.errors
            .iter()
            .enumerate()
            .map(|(i, error)| {
                let mut msg = format!("{}. {}", i + 1, error);
                if let Some(fix) = error.suggested_fix() {
                    msg.push_str(&format!("\n   → Suggestion: {}", fix));
                }
                msg
            })
            .collect()
    }

    /// Consume the report, returning its first error if there is one.
    pub fn into_result(mut self) -> ValidationResult<Vec<ValidationWarning>> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(self.errors.remove(0))
        }
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_display() {
        let id = NodeId::new();
        assert_eq!(format!("{}", id).len(), 8);
    }

    #[test]
    fn test_dimension_mismatch_names_inputs() {
        let error = ExecutionError::DimensionMismatch {
            node_id: NodeId::new(),
            inputs: vec!["images_2".to_string(), "images_4".to_string()],
        };
        let msg = error.to_string();
        assert!(msg.contains("\"images_2\""));
        assert!(msg.contains("\"images_4\""));
    }

    #[test]
    fn test_validation_error_suggestions() {
        let error = ValidationError::MissingRequiredInput {
            node_id: NodeId::new(),
            port: "image".to_string(),
        };
        assert!(error.suggested_fix().unwrap().contains("image"));
    }

    #[test]
    fn test_validation_report() {
        let mut report = ValidationReport::new();
        assert!(report.can_execute());

        report.add_error(ValidationError::UnknownNode("nope".to_string()));
        report.add_error(ValidationError::Other("second".to_string()));
        assert!(!report.can_execute());
        assert_eq!(report.detailed_errors().len(), 2);
        assert!(report.summary().contains("2 error"));

        let first = report.into_result().unwrap_err();
        assert!(matches!(first, ValidationError::UnknownNode(_)));
    }
}
