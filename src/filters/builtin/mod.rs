//! Built-in node implementations.
//!
//! This module contains every node that ships with jk-nodes.

pub mod image;
pub mod text;
pub mod utils;

use crate::config::PackConfig;
use crate::filters::registry::FilterRegistry;

/// Register all built-in nodes.
pub fn register_all(registry: &mut FilterRegistry, config: &PackConfig) {
    self::image::register(registry, config);
    text::register(registry);
    utils::register(registry, config);
}

// Re-export for direct access
pub use self::image::{CenterCropImage, ConcatenateImages, GetImageShape, ResizeImage, StackImagesToBatch};
pub use self::text::{InputText, PreviewText, ToText};
pub use self::utils::{AspectRatioToSize, Concentrator, Deconcentrator};
