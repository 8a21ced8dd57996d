//! snapclass Classifiers
//!
//! Model lifecycle and image classification pipeline.
//!
//! The pieces, leaf-first:
//! - [`ModelRegistry`]: static map from model id to artifact and labels
//! - [`ImagePreprocessor`]: image to `[1, s, s, 3]` tensor in `[0, 1]`
//! - [`ModelLifecycle`]: owns the current model, last selection wins
//! - [`InferenceExecutor`]: one forward pass to a probability vector
//! - [`select`]: top-1 label with first-index tie-breaking
//!
//! [`ImageClassifier`] wires them together for an image-selection event.
//! Inference backends plug in through [`InferenceRuntime`]; [`CandleRuntime`]
//! is the bundled one.

pub mod candle_runtime;
pub mod classifier;
pub mod events;
pub mod executor;
pub mod lifecycle;
pub mod model_config;
pub mod preprocess;
pub mod registry;
pub mod runtime;
pub mod selector;

pub use candle_runtime::{ArtifactConfig, CandleRuntime, DeviceType};
pub use classifier::ImageClassifier;
pub use events::EventBus;
pub use executor::{InferenceExecutor, ProbabilityVector};
pub use lifecycle::{LoadOutcome, LoadedModel, ModelLifecycle};
pub use model_config::{ArtifactLocation, ModelEntry, RegistryConfig};
pub use preprocess::{ImagePreprocessor, PreprocessedTensor};
pub use registry::{ModelDescriptor, ModelRegistry};
pub use runtime::{InferenceRuntime, InputShape, ModelHandle, TensorHandle};
pub use selector::select;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::ImageClassifier;
    pub use crate::lifecycle::{LoadOutcome, ModelLifecycle};
    pub use crate::registry::ModelRegistry;
    pub use crate::runtime::InferenceRuntime;
    pub use snapclass_core::{ClassificationResult, ModelStatus, Notification};
}
