//! Port definitions and constraints for node inputs/outputs.
//!
//! Ports define the interface of a node - what data it accepts and produces.
//! Each port has a type and optional constraints checked at the boundary,
//! before the node runs.

use crate::core::types::{PortType, Value};
use serde::Serialize;

/// Direction of a port (input or output).
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

/// Definition of a node port (input or output).
#[derive(Debug, Clone, Serialize)]
pub struct PortDefinition {
    /// Unique name within the node (used in code)
    pub name: String,
    /// Human-readable name (used in UI)
    pub display_name: String,
    /// Type of data this port accepts/produces
    pub port_type: PortType,
    /// Direction (input or output)
    pub direction: PortDirection,
    /// Whether this port is optional
    pub optional: bool,
    /// Description for documentation and tooltips
    pub description: String,
    /// Constraints that values must satisfy
    pub constraints: Vec<Constraint>,
}

/// UI hints for parameter display.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "widget", content = "options")]
pub enum UiHint {
    /// Default input widget based on type
    Default,
    /// Slider for numeric values
    Slider,
    /// Dropdown for selecting from options
    Dropdown {
        /// Available options
        options: Vec<String>,
    },
    /// Text input field
    TextInput {
        /// Allow multiple lines
        multiline: bool,
    },
    /// Checkbox for booleans
    Checkbox,
    /// Spin box for integers
    SpinBox,
}

/// Definition of a node parameter (widget value).
///
/// Parameters are set in the property panel rather than connected to
/// other nodes, and always have a default.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterDefinition {
    /// Unique name within the node
    pub name: String,
    /// Human-readable name
    pub display_name: String,
    /// Type of the parameter
    pub param_type: PortType,
    /// Default value
    pub default_value: Value,
    /// Description for documentation
    pub description: String,
    /// Constraints for validation
    pub constraints: Vec<Constraint>,
    /// UI widget hint
    pub ui_hint: UiHint,
}

/// Constraints that can be applied to port/parameter values.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", content = "params")]
pub enum Constraint {
    /// Numeric value must be within range [min, max]
    Range { min: f64, max: f64 },
    /// Value must be one of the specified options
    OneOf(Vec<Value>),
}

// ============================================================================
// PortDefinition Builder Pattern
// ============================================================================

impl PortDefinition {
    /// Create a new input port definition.
    pub fn input(name: impl Into<String>, port_type: PortType) -> Self {
        Self::new(name.into(), port_type, PortDirection::Input)
    }

    /// Create a new output port definition.
    pub fn output(name: impl Into<String>, port_type: PortType) -> Self {
        Self::new(name.into(), port_type, PortDirection::Output)
    }

    fn new(name: String, port_type: PortType, direction: PortDirection) -> Self {
        Self {
            display_name: name_to_display(&name),
            name,
            port_type,
            direction,
            optional: false,
            description: String::new(),
            constraints: Vec::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Mark this port as optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Check a value against this port's constraints (not its type).
    pub fn check_constraints(&self, value: &Value) -> Result<(), String> {
        self.constraints.iter().try_for_each(|c| c.validate(value))
    }
}

// ============================================================================
// ParameterDefinition Builder Pattern
// ============================================================================

impl ParameterDefinition {
    /// Create a new parameter definition.
    pub fn new(name: impl Into<String>, param_type: PortType, default_value: Value) -> Self {
        let name = name.into();
        Self {
            display_name: name_to_display(&name),
            name,
            param_type,
            default_value,
            description: String::new(),
            constraints: Vec::new(),
            ui_hint: UiHint::Default,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a range constraint and set UI hint to slider.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.constraints.push(Constraint::Range { min, max });
        if matches!(self.ui_hint, UiHint::Default) {
            self.ui_hint = UiHint::Slider;
        }
        self
    }

    /// Restrict a string parameter to a fixed set of choices shown as a dropdown.
    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options: Vec<String> = choices.into_iter().map(Into::into).collect();
        self.constraints.push(Constraint::OneOf(
            options.iter().cloned().map(Value::String).collect(),
        ));
        self.ui_hint = UiHint::Dropdown { options };
        self
    }

    /// Set the UI hint.
    pub fn with_ui_hint(mut self, ui_hint: UiHint) -> Self {
        self.ui_hint = ui_hint;
        self
    }

    /// Check a value against this parameter's constraints (not its type).
    pub fn check_constraints(&self, value: &Value) -> Result<(), String> {
        self.constraints.iter().try_for_each(|c| c.validate(value))
    }
}

/// Convert snake_case name to Title Case display name.
fn name_to_display(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Constraint Validation
// ============================================================================

impl Constraint {
    /// Validate a value against this constraint.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        match self {
            Constraint::Range { min, max } => {
                if let Some(num) = value.as_float() {
                    if num < *min || num > *max {
                        return Err(format!("Value {} is out of range [{}, {}]", num, min, max));
                    }
                }
            }

            Constraint::OneOf(options) => {
                if !options.contains(value) {
                    let allowed: Vec<String> = options.iter().map(|o| o.to_string()).collect();
                    return Err(format!(
                        "Value '{}' is not one of [{}]",
                        value,
                        allowed.join(", ")
                    ));
                }
            }
        }

        Ok(())
    }
}

impl Default for UiHint {
    fn default() -> Self {
        UiHint::Default
    }
}
