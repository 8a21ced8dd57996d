//! Static registry of selectable models

use crate::model_config::{ArtifactLocation, RegistryConfig};
use snapclass_core::{Error, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Immutable description of a registered model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
    pub id: String,
    pub description: String,
    pub artifact: ArtifactLocation,
    pub labels: Arc<[String]>,
}

impl ModelDescriptor {
    pub fn new(
        id: impl Into<String>,
        artifact: ArtifactLocation,
        labels: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            artifact,
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.labels.is_empty() {
            return Err(Error::config(format!(
                "Model '{}' declares no labels",
                self.id
            )));
        }

        let mut seen = HashSet::new();
        for label in self.labels.iter() {
            if !seen.insert(label.as_str()) {
                return Err(Error::config(format!(
                    "Model '{}' declares label '{}' more than once",
                    self.id, label
                )));
            }
        }

        Ok(())
    }
}

/// Registry mapping model ids to their descriptors
///
/// Contents are fixed once constructed; lookups never mutate.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: BTreeMap<String, Arc<ModelDescriptor>>,
    default_model: Option<String>,
}

impl ModelRegistry {
    /// Build a registry from descriptors, validating labels and the default
    pub fn new(
        descriptors: impl IntoIterator<Item = ModelDescriptor>,
        default_model: Option<String>,
    ) -> Result<Self> {
        let mut models = BTreeMap::new();

        for descriptor in descriptors {
            descriptor.validate()?;
            let id = descriptor.id.clone();
            if models.insert(id.clone(), Arc::new(descriptor)).is_some() {
                return Err(Error::config(format!("Model '{}' registered twice", id)));
            }
        }

        if models.is_empty() {
            return Err(Error::config("Model registry is empty"));
        }

        if let Some(default) = &default_model {
            if !models.contains_key(default) {
                return Err(Error::config(format!(
                    "Default model '{}' is not registered",
                    default
                )));
            }
        }

        Ok(Self {
            models,
            default_model,
        })
    }

    /// The stock catalog shipped with the web models
    pub fn builtin() -> Self {
        let models = [
            ModelDescriptor::new(
                "catdog",
                ArtifactLocation::local("web_models/catdog"),
                ["cat", "dog"],
            ),
            ModelDescriptor::new(
                "orange",
                ArtifactLocation::local("web_models/orange"),
                ["fresh_orange", "rotten_orange", "sweet_orange"],
            ),
        ];

        Self {
            models: models
                .into_iter()
                .map(|d| (d.id.clone(), Arc::new(d)))
                .collect(),
            default_model: Some("catdog".to_string()),
        }
    }

    /// Build a registry from a parsed registry document
    pub fn from_config(config: RegistryConfig) -> Result<Self> {
        let descriptors = config.models.into_iter().map(|(id, entry)| ModelDescriptor {
            id,
            description: entry.description,
            artifact: entry.source,
            labels: entry.labels.into(),
        });

        let registry = Self::new(descriptors, config.default_model)?;
        info!(
            models = registry.len(),
            version = %config.version,
            "Model registry initialized"
        );
        Ok(registry)
    }

    /// Build a registry from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::from_config(RegistryConfig::from_yaml(yaml)?)
    }

    /// Load a registry from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_config(RegistryConfig::from_file(path)?)
    }

    /// Look up a model by id
    pub fn describe(&self, id: &str) -> Result<Arc<ModelDescriptor>> {
        self.models
            .get(id)
            .cloned()
            .ok_or_else(|| Error::unknown_model(id))
    }

    /// Registered ids in sorted order
    pub fn model_ids(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    /// Model to select at startup, if any
    pub fn default_model_id(&self) -> Option<&str> {
        self.default_model.as_deref()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let registry = ModelRegistry::builtin();
        assert_eq!(registry.model_ids(), vec!["catdog", "orange"]);
        assert_eq!(registry.default_model_id(), Some("catdog"));

        let orange = registry.describe("orange").unwrap();
        assert_eq!(
            orange.labels.as_ref(),
            ["fresh_orange", "rotten_orange", "sweet_orange"]
        );
        assert_eq!(orange.artifact, ArtifactLocation::local("web_models/orange"));
    }

    #[test]
    fn test_describe_unknown() {
        let registry = ModelRegistry::builtin();
        let err = registry.describe("zebra").unwrap_err();
        assert!(matches!(err, Error::UnknownModel(id) if id == "zebra"));
    }

    #[test]
    fn test_describe_shares_labels() {
        let registry = ModelRegistry::builtin();
        let a = registry.describe("catdog").unwrap();
        let b = registry.describe("catdog").unwrap();
        assert!(Arc::ptr_eq(&a.labels, &b.labels));
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
default_model: birds
models:
  birds:
    source:
      type: local
      path: ./models/birds
    labels: [sparrow, robin, crow]
"#;
        let registry = ModelRegistry::from_yaml(yaml).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.describe("birds").unwrap().labels.len(), 3);
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let result = ModelRegistry::new(
            [ModelDescriptor::new(
                "dup",
                ArtifactLocation::local("./dup"),
                ["cat", "cat"],
            )],
            None,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_labels_rejected() {
        let result = ModelRegistry::new(
            [ModelDescriptor::new(
                "empty",
                ArtifactLocation::local("./empty"),
                Vec::<String>::new(),
            )],
            None,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_unregistered_default_rejected() {
        let result = ModelRegistry::new(
            [ModelDescriptor::new(
                "catdog",
                ArtifactLocation::local("./catdog"),
                ["cat", "dog"],
            )],
            Some("orange".to_string()),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.yaml");
        std::fs::write(
            &path,
            "models:\n  catdog:\n    source:\n      type: local\n      path: ./catdog\n    labels: [cat, dog]\n",
        )
        .unwrap();

        let registry = ModelRegistry::from_file(&path).unwrap();
        assert_eq!(registry.model_ids(), vec!["catdog"]);
        assert_eq!(registry.default_model_id(), None);
    }
}
