//! Text nodes: InputText, ToText, PreviewText

use crate::core::context::{ExecutionContext, ValidationContext};
use crate::core::error::{ExecutionError, ValidationError};
use crate::core::node::{Category, FilterNode, NodeMetadata};
use crate::core::port::{ParameterDefinition, PortDefinition, UiHint};
use crate::core::types::{PortType, Value};
use crate::filters::registry::FilterRegistry;

/// Register text nodes.
pub fn register(registry: &mut FilterRegistry) {
    registry.register(|| Box::new(InputText));
    registry.register(|| Box::new(ToText));
    registry.register(|| Box::new(PreviewText));
}

/// Multiline text entry, trimmed.
#[derive(Debug, Clone)]
pub struct InputText;

impl FilterNode for InputText {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("input_text", "Input Text")
            .description("Enter text; leading and trailing whitespace is removed")
            .category(Category::Text)
            .output(PortDefinition::output("text", PortType::String))
            .parameter(
                ParameterDefinition::new("text", PortType::String, Value::String(String::new()))
                    .with_ui_hint(UiHint::TextInput { multiline: true }),
            )
            .build()
    }

    fn validate(&self, _ctx: &ValidationContext) -> Result<(), ValidationError> {
        Ok(())
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        let text = ctx.get_string("text")?.trim().to_string();
        ctx.set_output("text", Value::String(text))
    }

    fn clone_box(&self) -> Box<dyn FilterNode> {
        Box::new(self.clone())
    }
}

/// Converts any value to its text form.
#[derive(Debug, Clone)]
pub struct ToText;

impl FilterNode for ToText {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("to_text", "Convert To Text")
            .description("Convert any value to text")
            .category(Category::Text)
            .input(PortDefinition::input("any", PortType::Any))
            .output(PortDefinition::output("text", PortType::String))
            .build()
    }

    fn validate(&self, _ctx: &ValidationContext) -> Result<(), ValidationError> {
        Ok(())
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        let text = ctx.get_input("any")?.to_string();
        ctx.set_output("text", Value::String(text))
    }

    fn clone_box(&self) -> Box<dyn FilterNode> {
        Box::new(self.clone())
    }
}

/// Shows a list of values as text.
///
/// The whole list arrives at once; a single value counts as a one-element
/// list.
#[derive(Debug, Clone)]
pub struct PreviewText;

impl FilterNode for PreviewText {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("preview_text", "Preview As Text")
            .description("Convert each value to text and display it")
            .category(Category::Text)
            .input(PortDefinition::input("any", PortType::Any))
            .output(PortDefinition::output("text", PortType::Array(Box::new(PortType::String))))
            .output_node()
            .input_is_list()
            .build()
    }

    fn validate(&self, _ctx: &ValidationContext) -> Result<(), ValidationError> {
        Ok(())
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        let lines: Vec<String> = match ctx.get_input("any")? {
            Value::Array(items) => items.iter().map(Value::to_string).collect(),
            single => vec![single.to_string()],
        };

        ctx.set_output(
            "text",
            Value::Array(lines.iter().cloned().map(Value::String).collect()),
        )?;
        ctx.set_display(lines);
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn FilterNode> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::NodeId;
    use crate::core::tensor::ImageBatch;

    fn run(node: &dyn FilterNode, input: Option<Value>, text: Option<&str>) -> ExecutionContext {
        let mut ctx = ExecutionContext::new(NodeId::new());
        if let Some(value) = input {
            ctx.add_input("any", value);
        }
        if let Some(text) = text {
            ctx.add_parameter("text", Value::String(text.to_string()));
        }
        node.execute(&mut ctx).unwrap();
        ctx
    }

    #[test]
    fn test_input_text_trims() {
        let ctx = run(&InputText, None, Some("  hello\n world \n\t"));
        assert_eq!(ctx.outputs()["text"], Value::String("hello\n world".into()));

        let ctx = run(&InputText, None, Some(""));
        assert_eq!(ctx.outputs()["text"], Value::String(String::new()));
    }

    #[test]
    fn test_to_text() {
        let cases = [
            (Value::Integer(42), "42"),
            (Value::Float(0.5), "0.5"),
            (Value::Boolean(false), "false"),
            (Value::String("as is".into()), "as is"),
            (Value::None, "None"),
            (Value::Image(ImageBatch::zeros((1, 4, 4, 3))), "Image[1, 4, 4, 3]"),
        ];
        for (value, expected) in cases {
            let ctx = run(&ToText, Some(value), None);
            assert_eq!(ctx.outputs()["text"], Value::String(expected.into()));
        }
    }

    #[test]
    fn test_preview_text_list() {
        let values = Value::Array(vec![Value::Integer(1), Value::String("two".into()), Value::Float(3.0)]);
        let ctx = run(&PreviewText, Some(values), None);

        assert_eq!(ctx.display().unwrap(), ["1", "two", "3.0"]);
        assert_eq!(
            ctx.outputs()["text"],
            Value::Array(vec![
                Value::String("1".into()),
                Value::String("two".into()),
                Value::String("3.0".into()),
            ])
        );
    }

    #[test]
    fn test_preview_text_single_value() {
        let ctx = run(&PreviewText, Some(Value::Integer(7)), None);
        assert_eq!(ctx.display().unwrap(), ["7"]);

        let ctx = run(&PreviewText, Some(Value::Array(Vec::new())), None);
        assert!(ctx.display().unwrap().is_empty());
    }

    #[test]
    fn test_preview_metadata_flags() {
        let metadata = PreviewText.metadata();
        assert!(metadata.output_node);
        assert!(metadata.input_is_list);
        assert!(!ToText.metadata().output_node);
    }
}
