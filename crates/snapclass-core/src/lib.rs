//! snapclass Core
//!
//! Core types shared across snapclass components.
//!
//! This crate provides:
//! - The error taxonomy for model loading, preprocessing and inference
//! - Classification results and their user-facing rendering
//! - Status and result notifications consumed by the presentation layer

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ClassificationResult, ModelStatus, Notification};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{ClassificationResult, ModelStatus, Notification};
}
