//! Core types for snapclass

use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-1 prediction reported to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Winning label from the model's vocabulary
    pub label: String,

    /// Confidence in percent, rounded to one decimal place
    pub confidence_percent: f64,
}

impl ClassificationResult {
    /// Create a result from a label and an already rounded percentage
    pub fn new(label: impl Into<String>, confidence_percent: f64) -> Self {
        Self {
            label: label.into(),
            confidence_percent,
        }
    }

    /// Create a result from a raw probability in `[0, 1]`
    pub fn from_probability(label: impl Into<String>, probability: f32) -> Self {
        Self::new(label, round_percent(probability))
    }
}

impl fmt::Display for ClassificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.1}%)", self.label, self.confidence_percent)
    }
}

/// Convert a probability to a percentage rounded to one decimal place
pub fn round_percent(probability: f32) -> f64 {
    (f64::from(probability) * 1000.0).round() / 10.0
}

/// Observable state of the model lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ModelStatus {
    /// No model has been selected yet
    Idle,

    /// A model artifact is being fetched and parsed
    Loading { model_id: String },

    /// A model is loaded and accepting images
    Ready { model_id: String, input_size: usize },

    /// The latest selection failed
    Failed { model_id: String, error: String },
}

impl ModelStatus {
    /// Whether classification is currently possible
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// Model the status refers to, if any
    pub fn model_id(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Loading { model_id }
            | Self::Ready { model_id, .. }
            | Self::Failed { model_id, .. } => Some(model_id),
        }
    }
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Loading { .. } => f.write_str("loading"),
            Self::Ready { .. } => f.write_str("ready"),
            Self::Failed { error, .. } => write!(f, "error: {}", error),
        }
    }
}

/// Message published to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Model lifecycle transition, shown on the status surface
    Status(ModelStatus),

    /// Classification outcome, shown on the result surface
    Result(ClassificationResult),

    /// Classification failure, shown on the status surface
    Failure { detail: String },
}

impl Notification {
    /// Build a failure notification from any displayable error
    pub fn failure(err: impl fmt::Display) -> Self {
        Self::Failure {
            detail: err.to_string(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => status.fmt(f),
            Self::Result(result) => result.fmt(f),
            Self::Failure { detail } => write!(f, "error: {}", detail),
        }
    }
}
