//! Forward pass execution

use crate::lifecycle::LoadedModel;
use crate::preprocess::PreprocessedTensor;
use snapclass_core::{Error, Result};
use std::time::Instant;
use tracing::debug;

/// Model output aligned index-for-index with the model's labels
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityVector {
    values: Vec<f32>,
}

impl ProbabilityVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.values
    }
}

/// Runs a preprocessed tensor through a loaded model
#[derive(Debug, Clone, Copy, Default)]
pub struct InferenceExecutor;

impl InferenceExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Run one forward pass.
    ///
    /// Takes the input by value: it is released when this call returns, on
    /// every path, together with the model's output tensor.
    pub async fn predict(
        &self,
        model: &LoadedModel,
        input: PreprocessedTensor,
    ) -> Result<ProbabilityVector> {
        let expected = model.input_size();
        if input.size() != expected {
            return Err(Error::shape_mismatch(format!(
                "model '{}' expects {}x{} input, got {:?}",
                model.id(),
                expected,
                expected,
                input.dims()
            )));
        }

        let start = Instant::now();
        let output = model.handle().predict(input.tensor())?;
        drop(input);

        let values = output.data().await?;
        drop(output);

        let latency_us = start.elapsed().as_micros() as u64;
        metrics::histogram!("snapclass_inference_latency_us").record(latency_us as f64);
        debug!(model = model.id(), latency_us, "Forward pass complete");

        let labels = model.labels().len();
        if values.len() != labels {
            return Err(Error::shape_mismatch(format!(
                "model '{}' produced {} outputs for {} labels",
                model.id(),
                values.len(),
                labels
            )));
        }

        Ok(ProbabilityVector::new(values))
    }
}
