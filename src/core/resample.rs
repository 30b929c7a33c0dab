//! Resampling of image batches.
//!
//! `lanczos` goes through 8-bit planes and the `image` crate's Lanczos-3
//! filter. Every other method samples the `f32` data directly with a
//! separable kernel using half-pixel centers (corners are not aligned), so
//! no precision is lost to quantization.

use crate::core::tensor::{to_u8, ImageBatch};
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use ndarray::{Array3, Array4, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cubic convolution coefficient.
const CUBIC_A: f64 = -0.75;

/// Interpolation method used when resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeMethod {
    /// Lanczos-3 on 8-bit planes
    Lanczos,
    /// Nearest neighbour, sampling the top-left of each source cell
    Nearest,
    /// Linear interpolation along each axis
    Bilinear,
    /// Cubic convolution along each axis
    Bicubic,
    /// Average of the covered source cells
    Area,
    /// Nearest neighbour, sampling each source cell's center
    NearestExact,
}

impl ResizeMethod {
    /// All methods in the order they are offered to users.
    pub const ALL: [ResizeMethod; 6] = [
        ResizeMethod::Lanczos,
        ResizeMethod::Nearest,
        ResizeMethod::Bilinear,
        ResizeMethod::Bicubic,
        ResizeMethod::Area,
        ResizeMethod::NearestExact,
    ];

    /// Name used in parameters and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResizeMethod::Lanczos => "lanczos",
            ResizeMethod::Nearest => "nearest",
            ResizeMethod::Bilinear => "bilinear",
            ResizeMethod::Bicubic => "bicubic",
            ResizeMethod::Area => "area",
            ResizeMethod::NearestExact => "nearest-exact",
        }
    }

    /// Names of all methods.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|m| m.as_str()).collect()
    }

    fn kernel(&self) -> Option<Kernel> {
        match self {
            ResizeMethod::Lanczos => None,
            ResizeMethod::Nearest => Some(Kernel::Nearest),
            ResizeMethod::NearestExact => Some(Kernel::NearestExact),
            ResizeMethod::Bilinear => Some(Kernel::Linear),
            ResizeMethod::Bicubic => Some(Kernel::Cubic),
            ResizeMethod::Area => Some(Kernel::Area),
        }
    }
}

impl Default for ResizeMethod {
    fn default() -> Self {
        ResizeMethod::Lanczos
    }
}

impl fmt::Display for ResizeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResizeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Unknown resize method '{}': expected one of {}",
                    s,
                    Self::names().join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, Copy)]
enum Kernel {
    Nearest,
    NearestExact,
    Linear,
    Cubic,
    Area,
}

/// Source samples and weights contributing to one output coordinate.
type Taps = Vec<(usize, f32)>;

/// Resize every element of a batch to `height` x `width`.
///
/// Elements are resized independently; the channel count is unchanged.
pub fn resize_batch(
    batch: &ImageBatch,
    height: usize,
    width: usize,
    method: ResizeMethod,
) -> ImageBatch {
    let shape = batch.shape();
    let mut out = Array4::zeros((shape.batch, height, width, shape.channels));
    for (index, element) in batch.elements().enumerate() {
        out.index_axis_mut(Axis(0), index)
            .assign(&resize_element(element, height, width, method));
    }
    ImageBatch::new(out)
}

/// Resize a single `(height, width, channels)` image.
pub fn resize_element(
    src: ArrayView3<'_, f32>,
    height: usize,
    width: usize,
    method: ResizeMethod,
) -> Array3<f32> {
    match method.kernel() {
        Some(kernel) => resize_separable(src, height, width, kernel),
        None => resize_lanczos(src, height, width),
    }
}

fn resize_separable(src: ArrayView3<'_, f32>, height: usize, width: usize, kernel: Kernel) -> Array3<f32> {
    let (in_height, in_width, channels) = src.dim();

    // Rows first, then columns.
    let mut rows = Array3::<f32>::zeros((height, in_width, channels));
    for (y, taps) in axis_taps(in_height, height, kernel).iter().enumerate() {
        let mut row = rows.index_axis_mut(Axis(0), y);
        for &(sy, weight) in taps {
            row.scaled_add(weight, &src.index_axis(Axis(0), sy));
        }
    }

    let mut out = Array3::<f32>::zeros((height, width, channels));
    for (x, taps) in axis_taps(in_width, width, kernel).iter().enumerate() {
        let mut column = out.index_axis_mut(Axis(1), x);
        for &(sx, weight) in taps {
            column.scaled_add(weight, &rows.index_axis(Axis(1), sx));
        }
    }
    out
}

fn resize_lanczos(src: ArrayView3<'_, f32>, height: usize, width: usize) -> Array3<f32> {
    let (in_height, in_width, channels) = src.dim();
    let mut out = Array3::<f32>::zeros((height, width, channels));

    for channel in 0..channels {
        let plane = src.index_axis(Axis(2), channel);
        let gray = GrayImage::from_fn(in_width as u32, in_height as u32, |x, y| {
            Luma([to_u8(plane[[y as usize, x as usize]])])
        });
        let resized = imageops::resize(&gray, width as u32, height as u32, FilterType::Lanczos3);

        let mut dst = out.index_axis_mut(Axis(2), channel);
        for (x, y, pixel) in resized.enumerate_pixels() {
            dst[[y as usize, x as usize]] = pixel[0] as f32 / 255.0;
        }
    }
    out
}

/// Compute the taps for every output coordinate along one axis.
fn axis_taps(in_len: usize, out_len: usize, kernel: Kernel) -> Vec<Taps> {
    if in_len == 0 {
        return vec![Vec::new(); out_len];
    }

    let scale = in_len as f64 / out_len as f64;
    let last = in_len - 1;

    (0..out_len)
        .map(|dst| match kernel {
            Kernel::Nearest => {
                let src = (dst as f64 * scale).floor() as usize;
                vec![(src.min(last), 1.0)]
            }
            Kernel::NearestExact => {
                let src = ((dst as f64 + 0.5) * scale).floor() as usize;
                vec![(src.min(last), 1.0)]
            }
            Kernel::Linear => {
                let src = ((dst as f64 + 0.5) * scale - 0.5).max(0.0);
                let i0 = (src.floor() as usize).min(last);
                let i1 = (i0 + 1).min(last);
                let frac = (src - i0 as f64) as f32;
                vec![(i0, 1.0 - frac), (i1, frac)]
            }
            Kernel::Cubic => {
                let src = (dst as f64 + 0.5) * scale - 0.5;
                let base = src.floor();
                let weights = cubic_weights(src - base);
                weights
                    .iter()
                    .enumerate()
                    .map(|(k, &weight)| {
                        let index = (base as i64 - 1 + k as i64).clamp(0, last as i64) as usize;
                        (index, weight as f32)
                    })
                    .collect()
            }
            Kernel::Area => {
                let start = dst * in_len / out_len;
                let end = ((dst + 1) * in_len + out_len - 1) / out_len;
                let weight = 1.0 / (end - start) as f32;
                (start..end).map(|i| (i, weight)).collect()
            }
        })
        .collect()
}

/// Weights of the four taps around a sample at fractional offset `t`.
fn cubic_weights(t: f64) -> [f64; 4] {
    let near = |x: f64| ((CUBIC_A + 2.0) * x - (CUBIC_A + 3.0)) * x * x + 1.0;
    let far = |x: f64| ((CUBIC_A * x - 5.0 * CUBIC_A) * x + 8.0 * CUBIC_A) * x - 4.0 * CUBIC_A;
    [far(t + 1.0), near(t), near(1.0 - t), far(2.0 - t)]
}
