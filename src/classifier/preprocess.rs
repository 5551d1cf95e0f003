//! Raw upload bytes to model-ready input tensor.

use image::imageops::{self, FilterType};
use tract_onnx::prelude::*;

use crate::error::ImageError;

/// Side length of the square model input.
pub const IMAGE_SIZE: u32 = 32;

/// Number of color channels fed to the model.
pub const CHANNELS: usize = 3;

/// Normalized `f32[1, 32, 32, 3]` input tensor in NHWC layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor(tract_ndarray::Array4<f32>);

impl ImageTensor {
    /// Expected tensor shape.
    pub const SHAPE: [usize; 4] = [1, IMAGE_SIZE as usize, IMAGE_SIZE as usize, CHANNELS];

    /// Wrap an array, checking it has the model input shape.
    #[cfg(test)]
    pub fn from_array(array: tract_ndarray::Array4<f32>) -> Option<Self> {
        (array.shape() == Self::SHAPE.as_slice()).then_some(Self(array))
    }

    /// Tensor shape, always [`Self::SHAPE`].
    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    /// Value at (y, x, channel) of the single batch entry.
    pub fn pixel(&self, y: usize, x: usize, channel: usize) -> f32 {
        self.0[[0, y, x, channel]]
    }

    /// Flat view over all values in row-major order.
    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.0.iter().copied()
    }

    /// Copy into a runtime tensor.
    pub fn to_tensor(&self) -> Tensor {
        self.0.clone().into_tensor()
    }
}

/// Decode an image, force 3-channel RGB, resize to 32x32 and scale to [0, 1].
///
/// Alpha and palette information is dropped during the RGB conversion. The
/// resize ignores aspect ratio and uses bicubic (Catmull-Rom) resampling.
pub fn preprocess(bytes: &[u8]) -> Result<ImageTensor, ImageError> {
    let image = image::load_from_memory(bytes)?;
    let rgb = image.to_rgb8();
    let resized = imageops::resize(&rgb, IMAGE_SIZE, IMAGE_SIZE, FilterType::CatmullRom);

    let side = IMAGE_SIZE as usize;
    let array = tract_ndarray::Array4::from_shape_fn((1, side, side, CHANNELS), |(_, y, x, c)| {
        let pixel = resized.get_pixel(x as u32, y as u32);
        pixel[c] as f32 / 255.0
    });

    Ok(ImageTensor(array))
}
