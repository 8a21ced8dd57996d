//! Error types for snapclass

/// Result type alias using snapclass's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for snapclass operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The selected model id is not in the registry
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// Artifact fetch or parse failure
    #[error("failed to load model: {0}")]
    Load(String),

    /// The loaded model does not declare a usable input size
    #[error("cannot infer input shape: {0}")]
    ShapeInference(String),

    /// The image could not be read as pixel data
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// Tensor and model dimensions disagree
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new unknown-model error
    pub fn unknown_model(id: impl Into<String>) -> Self {
        Self::UnknownModel(id.into())
    }

    /// Create a new load error
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    /// Create a new shape inference error
    pub fn shape_inference(msg: impl Into<String>) -> Self {
        Self::ShapeInference(msg.into())
    }

    /// Create a new decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new shape mismatch error
    pub fn shape_mismatch(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short stable name of the variant, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownModel(_) => "unknown_model",
            Self::Load(_) => "load",
            Self::ShapeInference(_) => "shape_inference",
            Self::Decode(_) => "decode",
            Self::ShapeMismatch(_) => "shape_mismatch",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }
}
