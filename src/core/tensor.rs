//! Image batches as dense `f32` tensors.
//!
//! Images travel between nodes as a single 4-D array with logical shape
//! `(batch, height, width, channels)`. Samples are nominally normalized to
//! `[0, 1]`. The array is shared behind an `Arc`, so cloning a batch to feed
//! several downstream nodes never copies pixel data.

use crate::core::error::ExecutionError;
use image::{DynamicImage, ImageBuffer};
use ndarray::{Array3, Array4, ArrayView3, ArrayView4, Axis};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// The four dimensions of an image batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageShape {
    /// Number of images in the batch
    pub batch: usize,
    /// Height in pixels
    pub height: usize,
    /// Width in pixels
    pub width: usize,
    /// Samples per pixel
    pub channels: usize,
}

impl ImageShape {
    /// Create a shape from its four dimensions.
    pub const fn new(batch: usize, height: usize, width: usize, channels: usize) -> Self {
        Self {
            batch,
            height,
            width,
            channels,
        }
    }

    /// Shape of one element of the batch, `(height, width, channels)`.
    pub fn element_shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, self.channels)
    }

    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Dimensions as a `(batch, height, width, channels)` tuple.
    pub fn as_tuple(&self) -> (usize, usize, usize, usize) {
        (self.batch, self.height, self.width, self.channels)
    }
}

impl From<(usize, usize, usize, usize)> for ImageShape {
    fn from((batch, height, width, channels): (usize, usize, usize, usize)) -> Self {
        Self::new(batch, height, width, channels)
    }
}

impl fmt::Display for ImageShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.batch, self.height, self.width, self.channels
        )
    }
}

/// A batch of images sharing height, width and channel count.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBatch {
    data: Arc<Array4<f32>>,
}

impl ImageBatch {
    /// Wrap an existing `(batch, height, width, channels)` array.
    pub fn new(data: Array4<f32>) -> Self {
        Self {
            data: Arc::new(data),
        }
    }

    /// A batch filled with zeros.
    pub fn zeros(shape: impl Into<ImageShape>) -> Self {
        Self::new(Array4::zeros(shape.into().as_tuple()))
    }

    /// A batch where every sample has the same value.
    pub fn filled(shape: impl Into<ImageShape>, value: f32) -> Self {
        Self::new(Array4::from_elem(shape.into().as_tuple(), value))
    }

    /// Build a batch by evaluating `f` at every `(b, y, x, c)` index.
    pub fn from_fn<F>(shape: impl Into<ImageShape>, f: F) -> Self
    where
        F: FnMut((usize, usize, usize, usize)) -> f32,
    {
        Self::new(Array4::from_shape_fn(shape.into().as_tuple(), f))
    }

    /// Build a one-element batch from a single `(height, width, channels)` image.
    pub fn from_element(element: Array3<f32>) -> Self {
        Self::new(element.insert_axis(Axis(0)))
    }

    /// Dimensions of this batch.
    pub fn shape(&self) -> ImageShape {
        let (batch, height, width, channels) = self.data.dim();
        ImageShape::new(batch, height, width, channels)
    }

    /// Number of images in the batch.
    pub fn len(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// Whether the batch holds no images.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the whole tensor.
    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    /// Borrow one element of the batch.
    pub fn element(&self, index: usize) -> Option<ArrayView3<'_, f32>> {
        (index < self.len()).then(|| self.data.index_axis(Axis(0), index))
    }

    /// Iterate over the elements of the batch in order.
    pub fn elements(&self) -> impl Iterator<Item = ArrayView3<'_, f32>> {
        self.data.outer_iter()
    }

    /// Convert a decoded image into a one-element batch.
    ///
    /// Grey, grey+alpha and RGBA images keep their channel layout; every other
    /// color type is converted to RGB. 8-bit samples are scaled to `[0, 1]`.
    pub fn from_dynamic_image(image: &DynamicImage) -> Self {
        let width = image.width() as usize;
        let height = image.height() as usize;
        let (channels, raw) = match image.color().channel_count() {
            1 => (1, image.to_luma8().into_raw()),
            2 => (2, image.to_luma_alpha8().into_raw()),
            4 => (4, image.to_rgba8().into_raw()),
            _ => (3, image.to_rgb8().into_raw()),
        };

        Self::from_fn((1, height, width, channels), |(_, y, x, c)| {
            raw[(y * width + x) * channels + c] as f32 / 255.0
        })
    }

    /// Convert one element of the batch back into an 8-bit image.
    pub fn to_dynamic_image(&self, index: usize) -> Result<DynamicImage, ExecutionError> {
        let element = self.element(index).ok_or_else(|| {
            ExecutionError::ImageProcessing(format!(
                "batch index {} out of range for {} image(s)",
                index,
                self.len()
            ))
        })?;
        let (height, width, channels) = element.dim();
        let raw: Vec<u8> = element.iter().copied().map(to_u8).collect();
        let (width, height) = (width as u32, height as u32);

        let image = match channels {
            1 => ImageBuffer::from_raw(width, height, raw).map(DynamicImage::ImageLuma8),
            2 => ImageBuffer::from_raw(width, height, raw).map(DynamicImage::ImageLumaA8),
            3 => ImageBuffer::from_raw(width, height, raw).map(DynamicImage::ImageRgb8),
            4 => ImageBuffer::from_raw(width, height, raw).map(DynamicImage::ImageRgba8),
            _ => None,
        };

        image.ok_or_else(|| {
            ExecutionError::ImageProcessing(format!(
                "cannot encode an image with {} channel(s)",
                channels
            ))
        })
    }
}

/// Images serialize as their shape; sample data never leaves the process.
impl Serialize for ImageBatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.shape().serialize(serializer)
    }
}

/// Quantize a normalized sample to 8 bits: clip to `[0, 255]`, then truncate.
pub(crate) fn to_u8(sample: f32) -> u8 {
    (sample * 255.0).clamp(0.0, 255.0) as u8
}
