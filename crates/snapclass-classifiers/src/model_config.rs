//! Model registry file format

use serde::{Deserialize, Serialize};
use snapclass_core::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Registry document listing every selectable model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_version")]
    pub version: String,

    /// Model selected at startup
    #[serde(default)]
    pub default_model: Option<String>,

    pub models: HashMap<String, ModelEntry>,
}

/// Configuration for a single model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Model description
    #[serde(default)]
    pub description: String,

    /// Where the artifact lives
    pub source: ArtifactLocation,

    /// Output vocabulary, index = output unit
    pub labels: Vec<String>,
}

/// Location of a model artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ArtifactLocation {
    /// Directory on the local filesystem
    Local { path: PathBuf },

    /// Repository on the HuggingFace Hub
    HuggingFace {
        repo: String,
        #[serde(default = "default_revision")]
        revision: String,
    },
}

impl ArtifactLocation {
    /// Local artifact directory
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local { path: path.into() }
    }

    /// HuggingFace repository at `main`
    pub fn hugging_face(repo: impl Into<String>) -> Self {
        Self::HuggingFace {
            repo: repo.into(),
            revision: default_revision(),
        }
    }
}

impl fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { path } => write!(f, "{}", path.display()),
            Self::HuggingFace { repo, revision } => write!(f, "hf://{}@{}", repo, revision),
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_revision() -> String {
    "main".to_string()
}

impl RegistryConfig {
    /// Parse a registry document from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Invalid model registry: {}", e)))
    }

    /// Load a registry document from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read model registry {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&contents)
    }
}
