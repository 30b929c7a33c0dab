//! Utility nodes: aspect-ratio resolver, concentrators and deconcentrators

use crate::config::PackConfig;
use crate::core::bundle::{Bundle, BundleArity};
use crate::core::context::{ExecutionContext, ValidationContext};
use crate::core::error::{ExecutionError, ValidationError};
use crate::core::node::{Category, FilterNode, NodeMetadata};
use crate::core::port::{ParameterDefinition, PortDefinition};
use crate::core::types::{PortType, Value};
use crate::filters::registry::FilterRegistry;
use std::fmt;
use std::str::FromStr;

/// Register utility nodes.
pub fn register(registry: &mut FilterRegistry, config: &PackConfig) {
    let target_pixels = config.target_pixels;
    registry.register(move || Box::new(AspectRatioToSize::new(target_pixels)));
    for arity in BundleArity::ALL {
        registry.register(move || Box::new(Concentrator::new(arity)));
    }
    for arity in BundleArity::ALL {
        registry.register(move || Box::new(Deconcentrator::new(arity)));
    }
}

// ============================================================================
// Aspect Ratios
// ============================================================================

/// Aspect-ratio labels offered by the resolver, widest to tallest after `1:1`.
pub const ASPECT_RATIOS: [&str; 15] = [
    "1:1", "4:1", "21:9", "2:1", "16:9", "3:2", "4:3", "5:4", "4:5", "3:4", "2:3", "9:16", "1:2", "9:21", "1:4",
];

/// A `W:H` ratio of two positive integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Width divided by height.
    pub fn value(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("Invalid aspect ratio '{}': expected W:H with positive integers", s);
        let (width, height) = s.split_once(':').ok_or_else(invalid)?;
        let width: u32 = width.trim().parse().map_err(|_| invalid())?;
        let height: u32 = height.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

/// Round to a multiple of 8: down when `n mod 8 < 4`, up otherwise.
pub fn approx_multiple_of_8(n: i64) -> i64 {
    let rem = n.rem_euclid(8);
    if rem < 4 {
        n - rem
    } else {
        n + 8 - rem
    }
}

/// `(width, height)` with the given ratio and about `target_pixels` pixels.
///
/// Both sides are multiples of 8 and at least 8. Width is derived from the
/// height before that height is snapped to a multiple of 8, so `21:9` gives
/// `(1560, 672)` rather than the `(1568, 672)` of snapping first.
pub fn calc_resolution(ratio: AspectRatio, target_pixels: u64) -> (i64, i64) {
    let aspect = ratio.value();
    let height = (target_pixels as f64 / aspect).sqrt().round();
    let width = (height * aspect).round();

    (
        approx_multiple_of_8(width as i64).max(8),
        approx_multiple_of_8(height as i64).max(8),
    )
}

/// Maps an aspect-ratio label to a width and height near a pixel budget.
#[derive(Debug, Clone)]
pub struct AspectRatioToSize {
    target_pixels: u64,
}

impl AspectRatioToSize {
    /// Resolver aiming at `target_pixels` pixels.
    pub fn new(target_pixels: u64) -> Self {
        Self { target_pixels }
    }
}

impl Default for AspectRatioToSize {
    fn default() -> Self {
        Self::new(PackConfig::default().target_pixels)
    }
}

impl FilterNode for AspectRatioToSize {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("sdxl_aspect_ratio_to_width_height", "SDXL - Aspect Ratio To Width & Height")
            .description("Width and height of an aspect ratio at the SDXL pixel budget, in multiples of 8")
            .category(Category::Utils)
            .output(PortDefinition::output("width", PortType::Integer))
            .output(PortDefinition::output("height", PortType::Integer))
            .parameter(
                ParameterDefinition::new("aspect_ratio", PortType::String, Value::String(ASPECT_RATIOS[0].to_string()))
                    .with_description("Width:height")
                    .with_choices(ASPECT_RATIOS),
            )
            .build()
    }

    fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidationError> {
        ctx.get_string("aspect_ratio")?
            .parse::<AspectRatio>()
            .map_err(|error| ValidationError::ConstraintViolation {
                node_id: ctx.node_id,
                parameter: "aspect_ratio".to_string(),
                error,
            })?;
        Ok(())
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        let ratio: AspectRatio = ctx
            .get_string("aspect_ratio")?
            .parse()
            .map_err(|error| ExecutionError::NodeExecution {
                node_id: ctx.node_id,
                error,
            })?;

        let (width, height) = calc_resolution(ratio, self.target_pixels);
        ctx.set_output("width", Value::Integer(width))?;
        ctx.set_output("height", Value::Integer(height))
    }

    fn clone_box(&self) -> Box<dyn FilterNode> {
        Box::new(self.clone())
    }
}

// ============================================================================
// Hub Bundles
// ============================================================================

fn slot_input(index: usize) -> String {
    format!("any_{}", index)
}

/// Packs `any_1..any_N` into one bundle.
#[derive(Debug, Clone)]
pub struct Concentrator {
    arity: BundleArity,
}

impl Concentrator {
    pub fn new(arity: BundleArity) -> Self {
        Self { arity }
    }
}

impl FilterNode for Concentrator {
    fn metadata(&self) -> NodeMetadata {
        let slots = self.arity.slots();
        NodeMetadata::builder(
            format!("concentrator_{}to1", slots),
            format!("Concentrator ({}To1)", slots),
        )
        .description(format!("Route up to {} values through one connection", slots))
        .category(Category::Utils)
        .inputs((1..=slots).map(|i| PortDefinition::input(slot_input(i), PortType::Any).optional()))
        .output(PortDefinition::output(self.arity.port_name(), PortType::Bundle(self.arity)))
        .build()
    }

    fn validate(&self, _ctx: &ValidationContext) -> Result<(), ValidationError> {
        Ok(())
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        let values = (1..=self.arity.slots()).map(|i| ctx.get_input_optional(&slot_input(i)).cloned());
        let bundle = Bundle::pack(self.arity, values).map_err(|error| ExecutionError::NodeExecution {
            node_id: ctx.node_id,
            error,
        })?;
        ctx.set_output(self.arity.port_name(), Value::Bundle(bundle))
    }

    fn clone_box(&self) -> Box<dyn FilterNode> {
        Box::new(self.clone())
    }
}

/// Unpacks a bundle onto outputs `1..N`.
#[derive(Debug, Clone)]
pub struct Deconcentrator {
    arity: BundleArity,
}

impl Deconcentrator {
    pub fn new(arity: BundleArity) -> Self {
        Self { arity }
    }
}

impl FilterNode for Deconcentrator {
    fn metadata(&self) -> NodeMetadata {
        let slots = self.arity.slots();
        NodeMetadata::builder(
            format!("deconcentrator_1to{}", slots),
            format!("Deconcentrator (1To{})", slots),
        )
        .description(format!("Split a {} back into its {} values", self.arity, slots))
        .category(Category::Utils)
        .input(PortDefinition::input(self.arity.port_name(), PortType::Bundle(self.arity)))
        .outputs((1..=slots).map(|i| PortDefinition::output(i.to_string(), PortType::Any)))
        .build()
    }

    fn validate(&self, _ctx: &ValidationContext) -> Result<(), ValidationError> {
        Ok(())
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        let bundle = ctx.get_input_bundle(self.arity.port_name())?;
        if bundle.arity() != self.arity {
            return Err(ExecutionError::NodeExecution {
                node_id: ctx.node_id,
                error: format!("Expected {}, got {}", self.arity, bundle.arity()),
            });
        }

        let values = bundle.clone().unpack();
        for (i, value) in values.into_iter().enumerate() {
            ctx.set_output((i + 1).to_string(), value)?;
        }
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
    use proptest::prelude::*;

    #[test]
    fn test_aspect_ratio_parsing() {
        assert_eq!("16:9".parse::<AspectRatio>().unwrap(), AspectRatio { width: 16, height: 9 });
        assert!("16x9".parse::<AspectRatio>().is_err());
        assert!("0:1".parse::<AspectRatio>().is_err());
        assert!("a:b".parse::<AspectRatio>().is_err());
        for label in ASPECT_RATIOS {
            assert_eq!(label.parse::<AspectRatio>().unwrap().to_string(), label);
        }
    }

    #[test]
    fn test_approx_multiple_of_8() {
        assert_eq!(approx_multiple_of_8(0), 0);
        assert_eq!(approx_multiple_of_8(3), 0);
        assert_eq!(approx_multiple_of_8(4), 8);
        assert_eq!(approx_multiple_of_8(1021), 1024);
        assert_eq!(approx_multiple_of_8(1019), 1016);
        assert_eq!(approx_multiple_of_8(-3), 0);
        assert_eq!(approx_multiple_of_8(-5), -8);
    }

    #[test]
    fn test_square_resolution() {
        let square = AspectRatio { width: 1, height: 1 };
        assert_eq!(calc_resolution(square, 1024 * 1024), (1024, 1024));
    }

    #[test]
    fn test_known_resolutions() {
        let resolve = |label: &str| calc_resolution(label.parse().unwrap(), 1024 * 1024);
        assert_eq!(resolve("4:1"), (2048, 512));
        assert_eq!(resolve("1:4"), (512, 2048));
        assert_eq!(resolve("16:9"), (1368, 768));
    }

    #[test]
    fn test_width_follows_unsnapped_height() {
        // height 670.4 rounds to 670, width 1563.3 to 1563; both snap afterwards
        let resolution = calc_resolution("21:9".parse().unwrap(), 1024 * 1024);
        assert_eq!(resolution, (1560, 672));
    }

    #[test]
    fn test_every_label_resolves() {
        for label in ASPECT_RATIOS {
            let ratio: AspectRatio = label.parse().unwrap();
            let (width, height) = calc_resolution(ratio, 1024 * 1024);
            assert!(width > 0 && height > 0, "{}", label);
            assert_eq!(width % 8, 0, "{}", label);
            assert_eq!(height % 8, 0, "{}", label);

            let pixels = (width * height) as f64;
            assert!((pixels / (1024.0 * 1024.0) - 1.0).abs() < 0.05, "{}", label);
            if ratio.width > ratio.height {
                assert!(width > height, "{}", label);
            }
        }
    }

    #[test]
    fn test_tiny_budget_stays_positive() {
        let (width, height) = calc_resolution(AspectRatio { width: 1, height: 4 }, 16);
        assert_eq!((width, height), (8, 8));
    }

    #[test]
    fn test_resolver_node() {
        let mut ctx = ExecutionContext::new(NodeId::new());
        ctx.add_parameter("aspect_ratio", Value::String("1:1".into()));
        AspectRatioToSize::default().execute(&mut ctx).unwrap();

        let (outputs, display) = ctx.into_parts();
        assert_eq!(outputs["width"], Value::Integer(1024));
        assert_eq!(outputs["height"], Value::Integer(1024));
        assert!(display.is_none());
    }

    #[test]
    fn test_resolver_node_rejects_bad_label() {
        let mut ctx = ValidationContext::new(NodeId::new());
        ctx.add_parameter("aspect_ratio", Value::String("7".into()));
        assert!(matches!(
            AspectRatioToSize::default().validate(&ctx),
            Err(ValidationError::ConstraintViolation { .. })
        ));
    }

    #[test]
    fn test_hub_metadata() {
        let six = Concentrator::new(BundleArity::Six).metadata();
        assert_eq!(six.id, "concentrator_6to1");
        assert_eq!(six.inputs.len(), 6);
        assert!(six.inputs.iter().all(|p| p.optional));
        assert_eq!(six.output_names(), ["hub_6in1"]);

        let eight = Deconcentrator::new(BundleArity::Eight).metadata();
        assert_eq!(eight.id, "deconcentrator_1to8");
        assert_eq!(eight.input_names(), ["hub_8in1"]);
        assert_eq!(eight.output_names(), ["1", "2", "3", "4", "5", "6", "7", "8"]);
    }

    fn round_trip(arity: BundleArity, values: &[Option<Value>]) -> Vec<Value> {
        let mut ctx = ExecutionContext::new(NodeId::new());
        for (i, value) in values.iter().enumerate() {
            if let Some(value) = value {
                ctx.add_input(slot_input(i + 1), value.clone());
            }
        }
        Concentrator::new(arity).execute(&mut ctx).unwrap();
        let (mut outputs, _) = ctx.into_parts();
        let bundle = outputs.shift_remove(arity.port_name()).unwrap();

        let mut ctx = ExecutionContext::new(NodeId::new());
        ctx.add_input(arity.port_name(), bundle);
        Deconcentrator::new(arity).execute(&mut ctx).unwrap();
        let (outputs, _) = ctx.into_parts();
        outputs.into_values().collect()
    }

    #[test]
    fn test_hub_round_trip_keeps_gaps() {
        let values = vec![
            None,
            Some(Value::Integer(1)),
            None,
            Some(Value::String("x".into())),
            Some(Value::Boolean(true)),
            None,
        ];
        let out = round_trip(BundleArity::Six, &values);
        assert_eq!(
            out,
            vec![
                Value::None,
                Value::Integer(1),
                Value::None,
                Value::String("x".into()),
                Value::Boolean(true),
                Value::None,
            ]
        );
    }

    #[test]
    fn test_deconcentrator_rejects_other_arity() {
        let mut ctx = ExecutionContext::new(NodeId::new());
        ctx.add_input("hub_6in1", Value::Bundle(Bundle::empty(BundleArity::Eight)));
        assert!(Deconcentrator::new(BundleArity::Six).execute(&mut ctx).is_err());
    }

    proptest! {
        #[test]
        fn prop_approx_multiple_of_8(n in -1_000_000i64..1_000_000) {
            let m = approx_multiple_of_8(n);
            prop_assert_eq!(m % 8, 0);
            prop_assert!((m - n).abs() <= 4);
        }

        #[test]
        fn prop_hub_round_trip(values in prop::collection::vec(prop::option::of(any::<i64>()), 8)) {
            let values: Vec<Option<Value>> = values.into_iter().map(|v| v.map(Value::Integer)).collect();
            let out = round_trip(BundleArity::Eight, &values);
            let expected: Vec<Value> = values.into_iter().map(|v| v.unwrap_or(Value::None)).collect();
            prop_assert_eq!(out, expected);
        }
    }
}
