//! Image to tensor conversion
//!
//! Turns a decoded image into the `[1, size, size, 3]` float tensor the
//! models consume: RGB pixels, bilinear resize, scaled to `[0, 1]`.

use candle_core::{Device, Tensor};
use image::imageops::{self, FilterType};
use image::DynamicImage;
use snapclass_core::{Error, Result};
use tracing::debug;

/// Batched, normalized model input.
///
/// Owns its tensor; dropping it releases the memory.
#[derive(Debug)]
pub struct PreprocessedTensor {
    tensor: Tensor,
    size: usize,
}

impl PreprocessedTensor {
    /// Wrap an NHWC tensor, checking it is a single square RGB image
    pub fn from_tensor(tensor: Tensor) -> Result<Self> {
        let size = match tensor.dims() {
            &[1, h, w, 3] if h == w && h > 0 => h,
            dims => {
                return Err(Error::shape_mismatch(format!(
                    "expected [1, s, s, 3] input, got {:?}",
                    dims
                )))
            }
        };
        Ok(Self { tensor, size })
    }

    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    /// Spatial side length
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dims(&self) -> &[usize] {
        self.tensor.dims()
    }
}

/// Converts images into model input tensors
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    device: Device,
    filter: FilterType,
}

impl ImagePreprocessor {
    pub fn new(device: Device) -> Self {
        Self {
            device,
            filter: FilterType::Triangle,
        }
    }

    /// Decode raw file bytes into an image
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(bytes).map_err(|e| Error::decode(e.to_string()))
    }

    /// Resize and normalize a decoded image to `target_size x target_size`
    pub fn preprocess(&self, image: &DynamicImage, target_size: usize) -> Result<PreprocessedTensor> {
        if target_size == 0 {
            return Err(Error::shape_mismatch("target size must be positive"));
        }
        let side = u32::try_from(target_size).map_err(|_| {
            Error::shape_mismatch(format!("target size {} is too large", target_size))
        })?;

        let rgb = image.to_rgb8();
        if rgb.width() == 0 || rgb.height() == 0 {
            return Err(Error::decode("image has no pixels"));
        }

        let resized = imageops::resize(&rgb, side, side, self.filter);
        let pixels: Vec<f32> = resized.into_raw().into_iter().map(f32::from).collect();

        let tensor = Tensor::from_vec(pixels, (target_size, target_size, 3), &self.device)
            .and_then(|t| t.affine(1.0 / 255.0, 0.0))
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| Error::internal(format!("Failed to build input tensor: {}", e)))?;

        debug!(
            source_width = image.width(),
            source_height = image.height(),
            target_size,
            "Preprocessed image"
        );

        PreprocessedTensor::from_tensor(tensor)
    }

    /// Decode and preprocess on the blocking pool
    pub async fn preprocess_bytes(
        &self,
        bytes: impl Into<Vec<u8>>,
        target_size: usize,
    ) -> Result<PreprocessedTensor> {
        let bytes = bytes.into();
        let this = self.clone();

        tokio::task::spawn_blocking(move || {
            let image = Self::decode(&bytes)?;
            this.preprocess(&image, target_size)
        })
        .await
        .map_err(|e| Error::internal(format!("Preprocessing task failed: {}", e)))?
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new(Device::Cpu)
    }
}
