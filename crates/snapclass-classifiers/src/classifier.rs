//! Image classification entry point
//!
//! Handles an image-selection event end to end: gate on a ready model,
//! preprocess, run inference, pick the top-1 label and publish the outcome.

use crate::events::EventBus;
use crate::executor::InferenceExecutor;
use crate::lifecycle::{LoadedModel, ModelLifecycle};
use crate::preprocess::ImagePreprocessor;
use crate::selector::select;
use snapclass_core::{ClassificationResult, Notification, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Classifies images against whichever model is currently ready
pub struct ImageClassifier {
    lifecycle: Arc<ModelLifecycle>,
    preprocessor: ImagePreprocessor,
    executor: InferenceExecutor,
}

impl ImageClassifier {
    pub fn new(lifecycle: Arc<ModelLifecycle>, preprocessor: ImagePreprocessor) -> Self {
        Self {
            lifecycle,
            preprocessor,
            executor: InferenceExecutor::new(),
        }
    }

    pub fn lifecycle(&self) -> &Arc<ModelLifecycle> {
        &self.lifecycle
    }

    fn events(&self) -> &EventBus {
        self.lifecycle.events()
    }

    /// Classify one image file.
    ///
    /// Returns `Ok(None)` without publishing anything when no model is ready.
    /// Failures are published as `error: <detail>` and leave the model state
    /// untouched.
    pub async fn classify(&self, image: impl Into<Vec<u8>>) -> Result<Option<ClassificationResult>> {
        let Some(model) = self.lifecycle.current() else {
            debug!(status = %self.lifecycle.status(), "No model ready; ignoring image");
            return Ok(None);
        };

        let start = Instant::now();
        match self.run(&model, image.into()).await {
            Ok(result) => {
                info!(
                    model = model.id(),
                    label = %result.label,
                    confidence = result.confidence_percent,
                    latency_us = start.elapsed().as_micros() as u64,
                    "Image classified"
                );
                metrics::counter!("snapclass_classifications_total", "outcome" => "ok")
                    .increment(1);
                self.events().publish(Notification::Result(result.clone()));
                Ok(Some(result))
            }
            Err(err) => {
                warn!(model = model.id(), error = %err, "Classification failed");
                metrics::counter!("snapclass_classifications_total", "outcome" => err.kind())
                    .increment(1);
                self.events().publish(Notification::failure(&err));
                Err(err)
            }
        }
    }

    async fn run(&self, model: &LoadedModel, bytes: Vec<u8>) -> Result<ClassificationResult> {
        let input = self
            .preprocessor
            .preprocess_bytes(bytes, model.input_size())
            .await?;
        let probabilities = self.executor.predict(model, input).await?;
        select(model.labels(), probabilities.as_slice())
    }
}
