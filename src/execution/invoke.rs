//! Single node invocation.
//!
//! The invoker is the host-facing entry point: it resolves a node by ID,
//! checks the supplied values against the node's declared ports and
//! parameters, runs the node, and returns its outputs in declaration order.

use crate::core::context::{ExecutionContext, NodeOutput, ValidationContext};
use crate::core::error::{
    ExecutionError, JkError, NodeId, ValidationError, ValidationReport, ValidationWarning,
};
use crate::core::node::{FilterNode, NodeMetadata};
use crate::core::types::Value;
use crate::filters::registry::FilterRegistry;
use indexmap::IndexMap;
use log::{debug, warn};
use std::collections::HashMap;

/// Invokes registered nodes by ID.
pub struct NodeInvoker<'a> {
    registry: &'a FilterRegistry,
}

impl<'a> NodeInvoker<'a> {
    /// Create an invoker over `registry`.
    pub fn new(registry: &'a FilterRegistry) -> Self {
        Self { registry }
    }

    /// Run node `id` once with the given inputs and parameters.
    pub fn invoke(
        &self,
        id: &str,
        inputs: HashMap<String, Value>,
        parameters: HashMap<String, Value>,
    ) -> Result<NodeOutput, JkError> {
        let node = self.create(id)?;
        invoke_node(node.as_ref(), inputs, parameters)
    }

    /// Check a call to node `id` without running it.
    ///
    /// The report lists every boundary problem, followed by the node's own
    /// validation error when the boundary checks pass.
    pub fn check(
        &self,
        id: &str,
        inputs: HashMap<String, Value>,
        parameters: HashMap<String, Value>,
    ) -> Result<ValidationReport, JkError> {
        let node = self.create(id)?;
        let metadata = node.metadata();
        let (ctx, mut report) = resolve_boundary(&metadata, NodeId::new(), inputs, parameters);
        if report.can_execute() {
            if let Err(error) = node.validate(&ctx) {
                report.add_error(error);
            }
        }
        Ok(report)
    }

    fn create(&self, id: &str) -> Result<Box<dyn FilterNode>, ValidationError> {
        self.registry
            .create(id)
            .ok_or_else(|| ValidationError::UnknownNode(id.to_string()))
    }
}

/// Run `node` once.
///
/// Values are checked against the node's metadata first; the first boundary
/// error aborts the call before the node sees any data.
pub fn invoke_node(
    node: &dyn FilterNode,
    inputs: HashMap<String, Value>,
    parameters: HashMap<String, Value>,
) -> Result<NodeOutput, JkError> {
    let metadata = node.metadata();
    let node_id = NodeId::new();
    debug!("Invoking '{}' as {}", metadata.id, node_id);

    let (ctx, report) = resolve_boundary(&metadata, node_id, inputs, parameters);
    report.into_result()?;
    node.validate(&ctx)?;

    let mut exec_ctx = ExecutionContext::from(ctx);
    node.execute(&mut exec_ctx)?;

    let (mut produced, display) = exec_ctx.into_parts();
    let mut values = IndexMap::with_capacity(metadata.outputs.len());
    for port in &metadata.outputs {
        let value = produced
            .shift_remove(&port.name)
            .ok_or_else(|| ExecutionError::OutputNotSet {
                node_id,
                port: port.name.clone(),
            })?;
        values.insert(port.name.clone(), value);
    }
    for name in produced.keys() {
        warn!("Node '{}' set undeclared output '{}'", metadata.id, name);
    }

    debug!("Node '{}' produced {} output(s)", metadata.id, values.len());
    Ok(NodeOutput { values, display })
}

/// Match supplied values to declared ports and parameters.
///
/// Optional inputs given as `Value::None` count as absent. Missing parameters
/// take their defaults. Names the node does not declare are dropped with a
/// warning.
fn resolve_boundary(
    metadata: &NodeMetadata,
    node_id: NodeId,
    mut inputs: HashMap<String, Value>,
    mut parameters: HashMap<String, Value>,
) -> (ValidationContext, ValidationReport) {
    let mut ctx = ValidationContext::new(node_id);
    let mut report = ValidationReport::new();

    for port in &metadata.inputs {
        let supplied = inputs.remove(&port.name);
        let supplied = if port.optional {
            supplied.filter(|v| !v.is_none())
        } else {
            supplied
        };

        match supplied {
            Some(value) => {
                if !port.port_type.matches(&value) {
                    report.add_error(ValidationError::TypeMismatch {
                        port: port.name.clone(),
                        expected: port.port_type.clone(),
                        got: value.get_type(),
                    });
                } else if let Err(error) = port.check_constraints(&value) {
                    report.add_error(ValidationError::ConstraintViolation {
                        node_id,
                        parameter: port.name.clone(),
                        error,
                    });
                } else {
                    ctx.add_input(port.name.clone(), value);
                }
            }
            None if port.optional => {}
            None => report.add_error(ValidationError::MissingRequiredInput {
                node_id,
                port: port.name.clone(),
            }),
        }
    }

    for param in &metadata.parameters {
        let value = parameters
            .remove(&param.name)
            .unwrap_or_else(|| param.default_value.clone());

        if !param.param_type.matches(&value) {
            report.add_error(ValidationError::TypeMismatch {
                port: param.name.clone(),
                expected: param.param_type.clone(),
                got: value.get_type(),
            });
        } else if let Err(error) = param.check_constraints(&value) {
            report.add_error(ValidationError::ConstraintViolation {
                node_id,
                parameter: param.name.clone(),
                error,
            });
        } else {
            ctx.add_parameter(param.name.clone(), value);
        }
    }

    let undeclared = inputs
        .into_keys()
        .map(|name| ("input", name))
        .chain(parameters.into_keys().map(|name| ("parameter", name)));
    for (kind, name) in undeclared {
        warn!("Ignoring undeclared {} '{}' for node '{}'", kind, name, metadata.id);
        report.add_warning(ValidationWarning {
            message: format!("Node '{}' has no {} named '{}'", metadata.id, kind, name),
            suggestion: None,
        });
    }

    (ctx, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bundle::{Bundle, BundleArity};
    use crate::core::node::Category;
    use crate::core::port::PortDefinition;
    use crate::core::tensor::ImageBatch;
    use crate::core::types::PortType;

    fn args(pairs: Vec<(&str, Value)>) -> HashMap<String, Value> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn image(shape: (usize, usize, usize, usize)) -> Value {
        Value::Image(ImageBatch::zeros(shape))
    }

    #[test]
    fn test_unknown_node() {
        let registry = FilterRegistry::with_builtins();
        let err = NodeInvoker::new(&registry)
            .invoke("nope", HashMap::new(), HashMap::new())
            .unwrap_err();
        assert!(matches!(err, JkError::Validation(ValidationError::UnknownNode(id)) if id == "nope"));
    }

    #[test]
    fn test_resize_defaults() {
        let registry = FilterRegistry::with_builtins();
        let out = NodeInvoker::new(&registry)
            .invoke(
                "resize_image",
                args(vec![("image", image((1, 16, 16, 3)))]),
                args(vec![("method", Value::String("bilinear".into()))]),
            )
            .unwrap();

        let resized = out.get("image").unwrap().as_image().unwrap();
        assert_eq!(resized.shape().as_tuple(), (1, 512, 512, 3));
        assert!(out.display.is_none());
    }

    #[test]
    fn test_resize_rejects_out_of_range_dimensions() {
        let registry = FilterRegistry::with_builtins();
        let invoker = NodeInvoker::new(&registry);

        for bad in [0, 1_000_001] {
            let err = invoker
                .invoke(
                    "resize_image",
                    args(vec![("image", image((1, 4, 4, 3)))]),
                    args(vec![("height", Value::Integer(bad))]),
                )
                .unwrap_err();
            assert!(matches!(
                err,
                JkError::Validation(ValidationError::ConstraintViolation { ref parameter, .. }) if parameter == "height"
            ));
        }
    }

    #[test]
    fn test_rejects_unknown_enumerations() {
        let registry = FilterRegistry::with_builtins();
        let invoker = NodeInvoker::new(&registry);

        let err = invoker
            .invoke(
                "resize_image",
                args(vec![("image", image((1, 4, 4, 3)))]),
                args(vec![("method", Value::String("cubic".into()))]),
            )
            .unwrap_err();
        assert!(matches!(err, JkError::Validation(ValidationError::ConstraintViolation { .. })));

        let err = invoker
            .invoke(
                "sdxl_aspect_ratio_to_width_height",
                HashMap::new(),
                args(vec![("aspect_ratio", Value::String("5:3".into()))]),
            )
            .unwrap_err();
        assert!(matches!(err, JkError::Validation(ValidationError::ConstraintViolation { .. })));
    }

    #[test]
    fn test_type_mismatch_and_missing_input() {
        let registry = FilterRegistry::with_builtins();
        let invoker = NodeInvoker::new(&registry);

        let err = invoker
            .invoke("get_image_shape", args(vec![("image", Value::Integer(1))]), HashMap::new())
            .unwrap_err();
        assert!(matches!(err, JkError::Validation(ValidationError::TypeMismatch { .. })));

        let err = invoker
            .invoke("get_image_shape", HashMap::new(), HashMap::new())
            .unwrap_err();
        assert!(matches!(err, JkError::Validation(ValidationError::MissingRequiredInput { .. })));
    }

    #[test]
    fn test_check_collects_every_problem() {
        let registry = FilterRegistry::with_builtins();
        let report = NodeInvoker::new(&registry)
            .check(
                "resize_image",
                args(vec![("extra", Value::Boolean(true))]),
                args(vec![("width", Value::Integer(0)), ("method", Value::String("x".into()))]),
            )
            .unwrap();

        assert!(!report.can_execute());
        // missing image, width out of range, unknown method
        assert_eq!(report.errors.len(), 3);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_shape_outputs_in_order_with_display() {
        let registry = FilterRegistry::with_builtins();
        let out = NodeInvoker::new(&registry)
            .invoke("get_image_shape", args(vec![("image", image((1, 512, 768, 3)))]), HashMap::new())
            .unwrap();

        let names: Vec<&str> = out.values.keys().map(String::as_str).collect();
        assert_eq!(names, ["B", "H", "W", "C"]);
        assert_eq!(
            out.clone().into_values(),
            vec![Value::Integer(1), Value::Integer(512), Value::Integer(768), Value::Integer(3)]
        );
        assert_eq!(out.display, Some(vec!["[1, 512, 768, 3]".to_string()]));
    }

    #[test]
    fn test_stack_through_invoker() {
        let registry = FilterRegistry::with_builtins();
        let invoker = NodeInvoker::new(&registry);

        let out = invoker
            .invoke(
                "stack_images_to_batch",
                args(vec![
                    ("images_1", image((2, 64, 64, 3))),
                    ("images_2", Value::None),
                    ("images_3", image((3, 64, 64, 3))),
                ]),
                HashMap::new(),
            )
            .unwrap();
        assert_eq!(out.get("image").unwrap().as_image().unwrap().len(), 5);

        let err = invoker
            .invoke(
                "stack_images_to_batch",
                args(vec![("images_1", image((2, 64, 64, 3))), ("images_2", image((2, 32, 32, 3)))]),
                HashMap::new(),
            )
            .unwrap_err();
        match err {
            JkError::Execution(ExecutionError::DimensionMismatch { inputs, .. }) => {
                assert_eq!(inputs, vec!["images_2".to_string()]);
            }
            other => panic!("unexpected error: {}", other),
        }

        let err = invoker
            .invoke("stack_images_to_batch", HashMap::new(), HashMap::new())
            .unwrap_err();
        assert!(matches!(err, JkError::Execution(ExecutionError::NoInputs { .. })));
    }

    #[test]
    fn test_bundle_arity_checked_at_boundary() {
        let registry = FilterRegistry::with_builtins();
        let err = NodeInvoker::new(&registry)
            .invoke(
                "deconcentrator_1to6",
                args(vec![("hub_6in1", Value::Bundle(Bundle::empty(BundleArity::Eight)))]),
                HashMap::new(),
            )
            .unwrap_err();
        assert!(matches!(err, JkError::Validation(ValidationError::TypeMismatch { .. })));
    }

    #[test]
    fn test_hub_round_trip_through_invoker() {
        let registry = FilterRegistry::with_builtins();
        let invoker = NodeInvoker::new(&registry);

        let packed = invoker
            .invoke(
                "concentrator_6to1",
                args(vec![("any_2", Value::Integer(2)), ("any_5", image((1, 2, 2, 1)))]),
                HashMap::new(),
            )
            .unwrap();
        let unpacked = invoker
            .invoke("deconcentrator_1to6", packed.values.into_iter().collect(), HashMap::new())
            .unwrap()
            .into_values();

        assert_eq!(unpacked.len(), 6);
        assert_eq!(unpacked[1], Value::Integer(2));
        assert_eq!(unpacked[4], image((1, 2, 2, 1)));
        assert!(unpacked[0].is_none() && unpacked[5].is_none());
    }

    #[test]
    fn test_to_text_accepts_none() {
        let registry = FilterRegistry::with_builtins();
        let out = NodeInvoker::new(&registry)
            .invoke("to_text", args(vec![("any", Value::None)]), HashMap::new())
            .unwrap();
        assert_eq!(out.get("text"), Some(&Value::String("None".into())));
    }

    #[derive(Debug, Clone)]
    struct Forgetful;

    impl FilterNode for Forgetful {
        fn metadata(&self) -> NodeMetadata {
            NodeMetadata::builder("forgetful", "Forgetful")
                .category(Category::Utils)
                .output(PortDefinition::output("value", PortType::Any))
                .build()
        }

        fn validate(&self, _ctx: &ValidationContext) -> Result<(), ValidationError> {
            Ok(())
        }

        fn execute(&self, _ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
            Ok(())
        }

        fn clone_box(&self) -> Box<dyn FilterNode> {
            Box::new(self.clone())
        }
    }

    #[test]
    fn test_missing_output_is_an_error() {
        let err = invoke_node(&Forgetful, HashMap::new(), HashMap::new()).unwrap_err();
        assert!(matches!(err, JkError::Execution(ExecutionError::OutputNotSet { ref port, .. }) if port == "value"));
    }
}
