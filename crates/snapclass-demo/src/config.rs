//! Demo configuration

use crate::cli::Cli;
use serde::{Deserialize, Serialize};
use snapclass_classifiers::{DeviceType, ModelRegistry};
use std::path::{Path, PathBuf};

/// Demo configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Model registry YAML; the built-in catalog when unset
    #[serde(default)]
    pub registry: Option<PathBuf>,

    /// Inference device
    #[serde(default = "default_device")]
    pub device: String,

    /// Model selected on startup; the registry default when unset
    #[serde(default)]
    pub default_model: Option<String>,

    /// Notification buffer per subscriber
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl DemoConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &Cli) -> anyhow::Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        if let Some(registry) = &cli.registry {
            config.registry = Some(registry.clone());
        }

        if let Some(device) = &cli.device {
            config.device = device.clone();
        }

        if let Some(model) = cli.command.model() {
            config.default_model = Some(model.to_string());
        }

        Ok(config)
    }

    pub fn device_type(&self) -> anyhow::Result<DeviceType> {
        Ok(self.device.parse()?)
    }

    pub fn build_registry(&self) -> anyhow::Result<ModelRegistry> {
        match &self.registry {
            Some(path) => Ok(ModelRegistry::from_file(path)?),
            None => Ok(ModelRegistry::builtin()),
        }
    }

    /// Model to select first: explicit choice, then the registry default
    pub fn startup_model<'a>(&'a self, registry: &'a ModelRegistry) -> Option<&'a str> {
        self.default_model
            .as_deref()
            .or_else(|| registry.default_model_id())
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            registry: None,
            device: default_device(),
            default_model: None,
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_event_capacity() -> usize {
    1024
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults_without_file() {
        let cli = Cli::parse_from(["snapclass-demo", "models"]);
        let config = DemoConfig::load("/nonexistent/snapclass.yaml", &cli).unwrap();

        assert_eq!(config.device, "cpu");
        assert_eq!(config.event_capacity, 1024);
        assert_eq!(config.device_type().unwrap(), DeviceType::Cpu);

        let registry = config.build_registry().unwrap();
        assert_eq!(config.startup_model(&registry), Some("catdog"));
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapclass.yaml");
        std::fs::write(
            &path,
            "device: cuda:1\ndefault_model: catdog\nevent_capacity: 16\n",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "snapclass-demo",
            "--device",
            "cpu",
            "interactive",
            "--model",
            "orange",
        ]);
        let config = DemoConfig::load(path.to_str().unwrap(), &cli).unwrap();

        assert_eq!(config.device, "cpu");
        assert_eq!(config.default_model.as_deref(), Some("orange"));
        assert_eq!(config.event_capacity, 16);
    }

    #[test]
    fn test_invalid_device_rejected() {
        let config = DemoConfig {
            device: "tpu".into(),
            ..Default::default()
        };
        assert!(config.device_type().is_err());
    }

    #[test]
    fn test_missing_registry_file_rejected() {
        let config = DemoConfig {
            registry: Some(PathBuf::from("/nonexistent/models.yaml")),
            ..Default::default()
        };
        assert!(config.build_registry().is_err());
    }
}
