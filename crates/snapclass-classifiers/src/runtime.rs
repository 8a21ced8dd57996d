//! Extension points for the tensor/inference runtime.
//!
//! The lifecycle manager and executor only talk to these traits, so a backend
//! (Candle, ONNX, a test double) can be swapped without touching the pipeline.

use crate::model_config::ArtifactLocation;
use async_trait::async_trait;
use candle_core::Tensor;
use snapclass_core::{Error, Result};
use tracing::warn;

/// Runtime able to turn an artifact location into a usable model
#[async_trait]
pub trait InferenceRuntime: Send + Sync {
    /// Fetch and parse the artifact at `location`
    async fn load_model(&self, location: &ArtifactLocation) -> Result<Box<dyn ModelHandle>>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// A model loaded by an [`InferenceRuntime`]
pub trait ModelHandle: Send + Sync {
    /// Declared input shape, `None` for dynamic dimensions
    fn input_shape(&self) -> Vec<Option<i64>>;

    /// Run one forward pass
    fn predict(&self, input: &Tensor) -> Result<Box<dyn TensorHandle>>;
}

/// Output of a forward pass. Dropping the handle releases its memory.
#[async_trait]
pub trait TensorHandle: Send + Sync {
    /// Copy the output values out as a flat vector
    async fn data(&self) -> Result<Vec<f32>>;
}

/// Spatial input requirements parsed from a model's declared shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl InputShape {
    pub const CHANNELS: usize = 3;

    /// Parse a `[batch, height, width, channels]` declaration.
    ///
    /// Only the height is required. Width and channels fall back to a square
    /// RGB input when undeclared; a non-square or non-RGB declaration is kept
    /// as declared and logged, since preprocessing always produces square RGB.
    pub fn from_declared(dims: &[Option<i64>]) -> Result<Self> {
        let height = match dims.get(1).copied().flatten() {
            Some(h) if h > 0 => h as usize,
            Some(h) => {
                return Err(Error::shape_inference(format!(
                    "declared input height {} is not positive (shape {:?})",
                    h, dims
                )))
            }
            None => {
                return Err(Error::shape_inference(format!(
                    "model does not declare an input height (shape {:?})",
                    dims
                )))
            }
        };

        let positive = |idx: usize| {
            dims.get(idx)
                .copied()
                .flatten()
                .filter(|d| *d > 0)
                .map(|d| d as usize)
        };
        let width = positive(2).unwrap_or(height);
        let channels = positive(3).unwrap_or(Self::CHANNELS);

        if width != height || channels != Self::CHANNELS {
            warn!(
                height,
                width,
                channels,
                "Model declares a non-square or non-RGB input; using height as input size"
            );
        }

        Ok(Self {
            height,
            width,
            channels,
        })
    }

    /// Side length the preprocessor resizes to
    pub fn input_size(&self) -> usize {
        self.height
    }
}
