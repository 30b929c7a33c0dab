//! Image geometry nodes: resize, center crop, concatenate, stack, shape

use crate::config::PackConfig;
use crate::core::context::{ExecutionContext, ValidationContext};
use crate::core::error::{ExecutionError, NodeId, ValidationError};
use crate::core::node::{Category, FilterNode, NodeMetadata};
use crate::core::port::{ParameterDefinition, PortDefinition, UiHint};
use crate::core::resample::{resize_batch, resize_element, ResizeMethod};
use crate::core::tensor::ImageBatch;
use crate::core::types::{PortType, Value};
use crate::filters::registry::FilterRegistry;
use ndarray::{s, Array3, ArrayView3, Axis, ErrorKind, ShapeError};
use std::fmt;
use std::str::FromStr;

/// Largest accepted resize dimension.
const MAX_DIMENSION: f64 = 1_000_000.0;

/// Register image nodes.
pub fn register(registry: &mut FilterRegistry, config: &PackConfig) {
    let slots = config.stack_slots;
    registry.register(|| Box::new(ResizeImage));
    registry.register(|| Box::new(CenterCropImage));
    registry.register(|| Box::new(ConcatenateImages));
    registry.register(move || Box::new(StackImagesToBatch::new(slots)));
    registry.register(|| Box::new(GetImageShape));
}

fn method_parameter() -> ParameterDefinition {
    ParameterDefinition::new("method", PortType::String, Value::String(ResizeMethod::default().to_string()))
        .with_description("Resampling method")
        .with_choices(ResizeMethod::names())
}

fn parse_method(ctx: &ValidationContext) -> Result<ResizeMethod, ValidationError> {
    ctx.get_string("method")?
        .parse()
        .map_err(|error| ValidationError::ConstraintViolation {
            node_id: ctx.node_id,
            parameter: "method".to_string(),
            error,
        })
}

fn resize_method(ctx: &ExecutionContext) -> Result<ResizeMethod, ExecutionError> {
    ctx.get_string("method")?
        .parse()
        .map_err(|error| ExecutionError::NodeExecution {
            node_id: ctx.node_id,
            error,
        })
}

fn first_element<'a>(ctx: &'a ExecutionContext, port: &str) -> Result<ArrayView3<'a, f32>, ExecutionError> {
    ctx.get_input_image(port)?
        .element(0)
        .ok_or_else(|| ExecutionError::NodeExecution {
            node_id: ctx.node_id,
            error: format!("Input '{}' is an empty batch", port),
        })
}

fn dimension(ctx: &ExecutionContext, name: &str) -> Result<usize, ExecutionError> {
    let value = ctx.get_integer(name)?;
    usize::try_from(value)
        .ok()
        .filter(|&size| size > 0)
        .ok_or_else(|| ExecutionError::NodeExecution {
            node_id: ctx.node_id,
            error: format!("Parameter '{}' must be a positive size, got {}", name, value),
        })
}

fn require_pixels(ctx: &ValidationContext, port: &str) -> Result<(), ValidationError> {
    let shape = ctx.get_input_image(port)?.shape();
    if shape.height == 0 || shape.width == 0 {
        return Err(ValidationError::CustomValidation {
            node_id: ctx.node_id,
            error: format!("Input '{}' has no pixels ({}x{})", port, shape.width, shape.height),
        });
    }
    Ok(())
}

// ============================================================================
// Geometry
// ============================================================================

/// Side on which the second image is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Right,
    Down,
    Left,
    Up,
}

impl Direction {
    /// All directions, in menu order.
    pub const ALL: [Direction; 4] = [Direction::Right, Direction::Down, Direction::Left, Direction::Up];

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Right => "right",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Up => "up",
        }
    }

    /// Axis of a `(height, width, channels)` image the images are joined on.
    pub fn axis(&self) -> Axis {
        match self {
            Direction::Right | Direction::Left => Axis(1),
            Direction::Down | Direction::Up => Axis(0),
        }
    }

    /// Whether the second image is placed before the first.
    pub fn second_first(&self) -> bool {
        matches!(self, Direction::Left | Direction::Up)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| format!("Unknown direction '{}': expected right, down, left or up", s))
    }
}

/// A rectangle inside an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub top: usize,
    pub left: usize,
    pub height: usize,
    pub width: usize,
}

/// Largest centered window of `height` x `width` with width/height equal to `aspect_ratio`.
///
/// Odd leftover pixels end up on the right (or bottom) side. An image with
/// no pixels is returned whole.
pub fn center_crop_window(height: usize, width: usize, aspect_ratio: f64) -> CropWindow {
    if height == 0 || width == 0 {
        return CropWindow { top: 0, left: 0, height, width };
    }

    let current = width as f64 / height as f64;
    if current > aspect_ratio {
        let new_width = ((height as f64 * aspect_ratio).round() as usize).clamp(1, width);
        CropWindow {
            top: 0,
            left: (width - new_width) / 2,
            height,
            width: new_width,
        }
    } else {
        let new_height = ((width as f64 / aspect_ratio).round() as usize).clamp(1, height);
        CropWindow {
            top: (height - new_height) / 2,
            left: 0,
            height: new_height,
            width,
        }
    }
}

/// Crop every element of a batch to the centered window of `aspect_ratio`.
pub fn center_crop(batch: &ImageBatch, aspect_ratio: f64) -> ImageBatch {
    let shape = batch.shape();
    let window = center_crop_window(shape.height, shape.width, aspect_ratio);
    if window.height == shape.height && window.width == shape.width {
        return batch.clone();
    }

    let view = batch.view();
    let cropped = view.slice(s![
        ..,
        window.top..window.top + window.height,
        window.left..window.left + window.width,
        ..
    ]);
    ImageBatch::new(cropped.to_owned())
}

/// Size `(height, width)` of `second` after scaling it to match `first` across the join axis.
///
/// The along-axis extent is truncated and never below one pixel.
pub fn matched_size(first: (usize, usize), second: (usize, usize), direction: Direction) -> (usize, usize) {
    let (first_height, first_width) = first;
    let second_aspect = second.1 as f64 / second.0 as f64;
    match direction {
        Direction::Right | Direction::Left => {
            let width = (first_height as f64 * second_aspect) as usize;
            (first_height, width.max(1))
        }
        Direction::Down | Direction::Up => {
            let height = (first_width as f64 / second_aspect) as usize;
            (height.max(1), first_width)
        }
    }
}

/// Join two `(height, width, channels)` images.
///
/// With `match_size`, `second` is first resized with `method` to the size
/// given by [`matched_size`]. Fails when the images disagree across the
/// join axis or on channel count, and when size matching meets an image
/// without pixels.
pub fn concatenate_images(
    first: ArrayView3<'_, f32>,
    second: ArrayView3<'_, f32>,
    direction: Direction,
    method: ResizeMethod,
    match_size: bool,
) -> Result<Array3<f32>, ShapeError> {
    let first = first.view();
    let resized;
    let second = if match_size {
        let (first_height, first_width, _) = first.dim();
        let (second_height, second_width, _) = second.dim();
        if [first_height, first_width, second_height, second_width].contains(&0) {
            return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape));
        }
        let (height, width) = matched_size(
            (first_height, first_width),
            (second_height, second_width),
            direction,
        );
        resized = resize_element(second, height, width, method);
        resized.view()
    } else {
        second.view()
    };

    let (head, tail) = if direction.second_first() {
        (second, first)
    } else {
        (first, second)
    };
    ndarray::concatenate(direction.axis(), &[head, tail])
}

/// Concatenate batches along the batch axis.
///
/// `inputs` pairs each batch with the name reported on mismatch. Every batch
/// must share the first one's height, width and channel count.
pub fn stack_images(node_id: NodeId, inputs: &[(&str, &ImageBatch)]) -> Result<ImageBatch, ExecutionError> {
    let (_, reference) = inputs.first().ok_or(ExecutionError::NoInputs { node_id })?;
    let expected = reference.shape().element_shape();

    let mismatched: Vec<String> = inputs
        .iter()
        .filter(|(_, batch)| batch.shape().element_shape() != expected)
        .map(|(name, _)| name.to_string())
        .collect();
    if !mismatched.is_empty() {
        return Err(ExecutionError::DimensionMismatch {
            node_id,
            inputs: mismatched,
        });
    }

    if let [(_, only)] = inputs {
        return Ok((*only).clone());
    }

    let views: Vec<_> = inputs.iter().map(|(_, batch)| batch.view()).collect();
    let stacked = ndarray::concatenate(Axis(0), &views)
        .map_err(|e| ExecutionError::ImageProcessing(e.to_string()))?;
    Ok(ImageBatch::new(stacked))
}

// ============================================================================
// Nodes
// ============================================================================

/// Resizes every image of a batch.
#[derive(Debug, Clone)]
pub struct ResizeImage;

impl FilterNode for ResizeImage {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("resize_image", "Resize Image")
            .description("Resize every image of the batch to the given height and width")
            .category(Category::Image)
            .input(PortDefinition::input("image", PortType::Image).with_description("Input images"))
            .output(PortDefinition::output("image", PortType::Image).with_description("Resized images"))
            .parameter(
                ParameterDefinition::new("height", PortType::Integer, Value::Integer(512))
                    .with_description("Target height in pixels")
                    .with_ui_hint(UiHint::SpinBox)
                    .with_range(1.0, MAX_DIMENSION),
            )
            .parameter(
                ParameterDefinition::new("width", PortType::Integer, Value::Integer(512))
                    .with_description("Target width in pixels")
                    .with_ui_hint(UiHint::SpinBox)
                    .with_range(1.0, MAX_DIMENSION),
            )
            .parameter(method_parameter())
            .build()
    }

    fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidationError> {
        parse_method(ctx)?;
        Ok(())
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        let image = ctx.get_input_image("image")?;
        let height = dimension(ctx, "height")?;
        let width = dimension(ctx, "width")?;
        let method = resize_method(ctx)?;

        let resized = resize_batch(image, height, width, method);
        ctx.set_output_image("image", resized)
    }

    fn clone_box(&self) -> Box<dyn FilterNode> {
        Box::new(self.clone())
    }
}

/// Crops every image of a batch to a centered window of a given aspect ratio.
#[derive(Debug, Clone)]
pub struct CenterCropImage;

impl FilterNode for CenterCropImage {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("center_crop_image", "Center Crop Image")
            .description("Crop the largest centered region with the given width/height ratio")
            .category(Category::Image)
            .input(PortDefinition::input("image", PortType::Image).with_description("Input images"))
            .output(PortDefinition::output("image", PortType::Image).with_description("Cropped images"))
            .parameter(
                ParameterDefinition::new("aspect_ratio", PortType::Float, Value::Float(1.0))
                    .with_description("Width divided by height of the crop")
                    .with_range(0.1, 10.0),
            )
            .build()
    }

    fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidationError> {
        require_pixels(ctx, "image")
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        let image = ctx.get_input_image("image")?;
        let aspect_ratio = ctx.get_float("aspect_ratio")?;

        let cropped = center_crop(image, aspect_ratio);
        ctx.set_output_image("image", cropped)
    }

    fn clone_box(&self) -> Box<dyn FilterNode> {
        Box::new(self.clone())
    }
}

/// Attaches the first image of one batch to the first image of another.
#[derive(Debug, Clone)]
pub struct ConcatenateImages;

impl FilterNode for ConcatenateImages {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("concatenate_images", "Concat Images")
            .description("Concatenates image2 to image1 in the specified direction")
            .category(Category::Image)
            .input(PortDefinition::input("image1", PortType::Image).with_description("Base image"))
            .input(PortDefinition::input("image2", PortType::Image).with_description("Image to attach"))
            .output(PortDefinition::output("image", PortType::Image).with_description("Single joined image"))
            .parameter(method_parameter())
            .parameter(
                ParameterDefinition::new("direction", PortType::String, Value::String("right".to_string()))
                    .with_description("Side of image1 where image2 goes")
                    .with_choices(Direction::ALL.iter().map(Direction::as_str)),
            )
            .parameter(
                ParameterDefinition::new("match_image_size", PortType::Boolean, Value::Boolean(true))
                    .with_description("Scale image2 to image1's size across the join")
                    .with_ui_hint(UiHint::Checkbox),
            )
            .build()
    }

    fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidationError> {
        parse_method(ctx)?;
        ctx.get_string("direction")?
            .parse::<Direction>()
            .map_err(|error| ValidationError::ConstraintViolation {
                node_id: ctx.node_id,
                parameter: "direction".to_string(),
                error,
            })?;

        for port in ["image1", "image2"] {
            if ctx.get_input_image(port)?.is_empty() {
                return Err(ValidationError::CustomValidation {
                    node_id: ctx.node_id,
                    error: format!("Input '{}' is an empty batch", port),
                });
            }
            require_pixels(ctx, port)?;
        }
        Ok(())
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        let node_id = ctx.node_id;
        let method = resize_method(ctx)?;
        let direction: Direction = ctx
            .get_string("direction")?
            .parse()
            .map_err(|error| ExecutionError::NodeExecution { node_id, error })?;
        let match_size = ctx.get_bool("match_image_size")?;

        let first = first_element(ctx, "image1")?;
        let second = first_element(ctx, "image2")?;

        let joined = concatenate_images(first, second, direction, method, match_size)
            .map_err(|e| ExecutionError::ShapeMismatch {
                node_id,
                error: e.to_string(),
            })?;
        ctx.set_output_image("image", ImageBatch::from_element(joined))
    }

    fn clone_box(&self) -> Box<dyn FilterNode> {
        Box::new(self.clone())
    }
}

/// Joins up to `slots` optional batches into one batch.
#[derive(Debug, Clone)]
pub struct StackImagesToBatch {
    slots: usize,
}

impl StackImagesToBatch {
    /// Node with `slots` optional inputs named `images_1..images_N`.
    pub fn new(slots: usize) -> Self {
        Self { slots }
    }

    fn slot_names(&self) -> impl Iterator<Item = String> {
        (1..=self.slots).map(|i| format!("images_{}", i))
    }
}

impl Default for StackImagesToBatch {
    fn default() -> Self {
        Self::new(PackConfig::default().stack_slots)
    }
}

impl FilterNode for StackImagesToBatch {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("stack_images_to_batch", "Stack Images To Batch")
            .description("Concatenate the connected image batches along the batch axis")
            .category(Category::Image)
            .inputs(
                self.slot_names()
                    .map(|name| PortDefinition::input(name, PortType::Image).optional()),
            )
            .output(PortDefinition::output("image", PortType::Image).with_description("Stacked batch"))
            .build()
    }

    fn validate(&self, _ctx: &ValidationContext) -> Result<(), ValidationError> {
        Ok(())
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        let names: Vec<String> = self.slot_names().collect();
        let provided: Vec<(&str, &ImageBatch)> = names
            .iter()
            .filter_map(|name| {
                ctx.get_input_image_optional(name)
                    .map(|batch| (name.as_str(), batch))
            })
            .collect();

        let stacked = stack_images(ctx.node_id, &provided)?;
        ctx.set_output_image("image", stacked)
    }

    fn clone_box(&self) -> Box<dyn FilterNode> {
        Box::new(self.clone())
    }
}

/// Reports the four dimensions of a batch.
#[derive(Debug, Clone)]
pub struct GetImageShape;

impl FilterNode for GetImageShape {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("get_image_shape", "Get Image Shape")
            .description("Get the shape of an image batch")
            .category(Category::Image)
            .input(PortDefinition::input("image", PortType::Image))
            .outputs(
                ["B", "H", "W", "C"]
                    .into_iter()
                    .map(|name| PortDefinition::output(name, PortType::Integer)),
            )
            .output_node()
            .build()
    }

    fn validate(&self, _ctx: &ValidationContext) -> Result<(), ValidationError> {
        Ok(())
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        let shape = ctx.get_input_image("image")?.shape();

        ctx.set_output("B", Value::Integer(shape.batch as i64))?;
        ctx.set_output("H", Value::Integer(shape.height as i64))?;
        ctx.set_output("W", Value::Integer(shape.width as i64))?;
        ctx.set_output("C", Value::Integer(shape.channels as i64))?;
        ctx.set_display(vec![shape.to_string()]);
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn FilterNode> {
        Box::new(self.clone())
    }
}
