//! Candle-backed inference runtime
//!
//! An artifact is a directory holding:
//! - `config.json` with the declared `input_shape`, the `conv_channels` of each
//!   feature stage and `num_classes`
//! - `model.safetensors` with `features.{i}.weight|bias` and
//!   `classifier.weight|bias`
//!
//! The network is a compact CNN: per stage `conv3x3 -> relu -> maxpool2`,
//! then global average pooling, a linear head and softmax.

use crate::model_config::ArtifactLocation;
use crate::runtime::{InferenceRuntime, ModelHandle, TensorHandle};
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{conv2d, linear, Conv2d, Conv2dConfig, Linear, Module, VarBuilder};
use serde::{Deserialize, Serialize};
use snapclass_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

pub const CONFIG_FILE: &str = "config.json";
pub const WEIGHTS_FILE: &str = "model.safetensors";

/// Device type for inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceType {
    /// CPU inference (always available)
    #[default]
    Cpu,
    /// CUDA GPU inference (if available)
    Cuda(usize),
    /// Metal (Apple Silicon)
    Metal(usize),
}

impl FromStr for DeviceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, index) = match s.split_once(':') {
            Some((kind, idx)) => {
                let idx = idx
                    .parse::<usize>()
                    .map_err(|_| Error::config(format!("Invalid device index in '{}'", s)))?;
                (kind, idx)
            }
            None => (s, 0),
        };

        match kind.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda(index)),
            "metal" | "mps" => Ok(Self::Metal(index)),
            other => Err(Error::config(format!("Unknown device '{}'", other))),
        }
    }
}

/// Create Candle device from device type
pub fn create_device(device_type: DeviceType) -> Result<Device> {
    match device_type {
        DeviceType::Cpu => Ok(Device::Cpu),
        DeviceType::Cuda(idx) => Device::new_cuda(idx)
            .map_err(|e| Error::config(format!("Failed to create CUDA device: {}", e))),
        DeviceType::Metal(idx) => Device::new_metal(idx)
            .map_err(|e| Error::config(format!("Failed to create Metal device: {}", e))),
    }
}

/// Contents of an artifact's `config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Declared `[batch, height, width, channels]`; `null` marks a dynamic dim
    pub input_shape: Vec<Option<i64>>,

    /// Output channels of each convolution stage
    #[serde(default = "default_conv_channels")]
    pub conv_channels: Vec<usize>,

    pub num_classes: usize,
}

fn default_conv_channels() -> Vec<usize> {
    vec![16, 32]
}

/// Runtime that loads artifacts into Candle models
pub struct CandleRuntime {
    device: Device,
}

impl CandleRuntime {
    pub fn new(device_type: DeviceType) -> Result<Self> {
        Ok(Self {
            device: create_device(device_type)?,
        })
    }

    pub fn cpu() -> Self {
        Self {
            device: Device::Cpu,
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

#[async_trait]
impl InferenceRuntime for CandleRuntime {
    async fn load_model(&self, location: &ArtifactLocation) -> Result<Box<dyn ModelHandle>> {
        let location = location.clone();
        let device = self.device.clone();

        let model = tokio::task::spawn_blocking(move || {
            let dir = resolve_artifact_dir(&location)?;
            CompactCnn::load(&dir, &device)
        })
        .await
        .map_err(|e| Error::internal(format!("Model load task failed: {}", e)))??;

        Ok(Box::new(model))
    }

    fn name(&self) -> &str {
        "candle"
    }
}

/// Resolve an artifact location to a local directory, downloading if needed
fn resolve_artifact_dir(location: &ArtifactLocation) -> Result<PathBuf> {
    match location {
        ArtifactLocation::Local { path } => {
            if !path.is_dir() {
                return Err(Error::load(format!(
                    "Artifact directory does not exist: {}",
                    path.display()
                )));
            }
            Ok(path.clone())
        }
        ArtifactLocation::HuggingFace { repo, revision } => {
            download_from_huggingface(repo, revision)
        }
    }
}

#[cfg(feature = "hf-hub")]
fn download_from_huggingface(repo: &str, revision: &str) -> Result<PathBuf> {
    use hf_hub::{api::sync::Api, Repo, RepoType};

    info!("Downloading model from HuggingFace: {} @ {}", repo, revision);

    let api = Api::new()
        .map_err(|e| Error::load(format!("Failed to initialize HuggingFace API: {}", e)))?;
    let repo_obj = api.repo(Repo::with_revision(
        repo.to_string(),
        RepoType::Model,
        revision.to_string(),
    ));

    let mut config_path = None;
    for file in [CONFIG_FILE, WEIGHTS_FILE] {
        tracing::debug!("Downloading {}", file);
        let path = repo_obj
            .get(file)
            .map_err(|e| Error::load(format!("Failed to download {}: {}", file, e)))?;
        if file == CONFIG_FILE {
            config_path = Some(path);
        }
    }

    // Both files land in the same snapshot directory of the hf cache
    config_path
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::load("Invalid HuggingFace cache path"))
}

#[cfg(not(feature = "hf-hub"))]
fn download_from_huggingface(_repo: &str, _revision: &str) -> Result<PathBuf> {
    Err(Error::load(
        "HuggingFace artifacts require the 'hf-hub' feature",
    ))
}

/// Compact convolutional image classifier
pub struct CompactCnn {
    config: ArtifactConfig,
    features: Vec<Conv2d>,
    classifier: Linear,
    device: Device,
}

impl CompactCnn {
    /// Load an artifact directory
    pub fn load(dir: &Path, device: &Device) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        let raw = std::fs::read_to_string(&config_path).map_err(|e| {
            Error::load(format!("Failed to read {}: {}", config_path.display(), e))
        })?;
        let config: ArtifactConfig = serde_json::from_str(&raw).map_err(|e| {
            Error::load(format!("Failed to parse {}: {}", config_path.display(), e))
        })?;

        let weights_path = dir.join(WEIGHTS_FILE);
        if !weights_path.exists() {
            return Err(Error::load(format!(
                "Weights file not found: {}",
                weights_path.display()
            )));
        }

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)
                .map_err(|e| Error::load(format!("Failed to load weights: {}", e)))?
        };

        let model = Self::from_var_builder(config, vb, device)?;
        info!(
            dir = %dir.display(),
            stages = model.features.len(),
            classes = model.config.num_classes,
            "Loaded Candle classifier"
        );
        Ok(model)
    }

    /// Build the network from an arbitrary weight source
    pub fn from_var_builder(config: ArtifactConfig, vb: VarBuilder, device: &Device) -> Result<Self> {
        if config.num_classes == 0 {
            return Err(Error::load("Artifact declares zero output classes"));
        }

        let conv_cfg = Conv2dConfig {
            padding: 1,
            ..Default::default()
        };

        let mut in_channels = 3;
        let mut features = Vec::with_capacity(config.conv_channels.len());
        for (i, &out_channels) in config.conv_channels.iter().enumerate() {
            let conv = conv2d(in_channels, out_channels, 3, conv_cfg, vb.pp(format!("features.{}", i)))
                .map_err(|e| Error::load(format!("Failed to load features.{}: {}", i, e)))?;
            features.push(conv);
            in_channels = out_channels;
        }

        let classifier = linear(in_channels, config.num_classes, vb.pp("classifier"))
            .map_err(|e| Error::load(format!("Failed to load classifier head: {}", e)))?;

        Ok(Self {
            config,
            features,
            classifier,
            device: device.clone(),
        })
    }

    fn forward(&self, input: &Tensor) -> candle_core::Result<Tensor> {
        // NHWC -> NCHW
        let mut x = input
            .to_device(&self.device)?
            .permute((0, 3, 1, 2))?
            .contiguous()?;

        for conv in &self.features {
            x = conv.forward(&x)?.relu()?;
            if x.dim(2)? >= 2 && x.dim(3)? >= 2 {
                x = x.max_pool2d(2)?;
            }
        }

        let pooled = x.mean(D::Minus1)?.mean(D::Minus1)?;
        let logits = self.classifier.forward(&pooled)?;
        candle_nn::ops::softmax(&logits, D::Minus1)
    }
}

impl ModelHandle for CompactCnn {
    fn input_shape(&self) -> Vec<Option<i64>> {
        self.config.input_shape.clone()
    }

    fn predict(&self, input: &Tensor) -> Result<Box<dyn TensorHandle>> {
        let output = self
            .forward(input)
            .map_err(|e| Error::internal(format!("Model forward pass failed: {}", e)))?;
        Ok(Box::new(CandleTensor { tensor: output }))
    }
}

/// Output tensor of a Candle forward pass
pub struct CandleTensor {
    tensor: Tensor,
}

#[async_trait]
impl TensorHandle for CandleTensor {
    async fn data(&self) -> Result<Vec<f32>> {
        self.tensor
            .flatten_all()
            .and_then(|t| t.to_dtype(DType::F32))
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(|e| Error::internal(format!("Failed to read model output: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn write_artifact(dir: &Path, input_size: i64, head_bias: &[f32]) {
        let config = ArtifactConfig {
            input_shape: vec![None, Some(input_size), Some(input_size), Some(3)],
            conv_channels: vec![4],
            num_classes: head_bias.len(),
        };
        std::fs::write(dir.join(CONFIG_FILE), serde_json::to_string(&config).unwrap()).unwrap();

        let device = Device::Cpu;
        let mut tensors = HashMap::new();
        tensors.insert(
            "features.0.weight".to_string(),
            Tensor::zeros((4, 3, 3, 3), DType::F32, &device).unwrap(),
        );
        tensors.insert(
            "features.0.bias".to_string(),
            Tensor::zeros(4, DType::F32, &device).unwrap(),
        );
        tensors.insert(
            "classifier.weight".to_string(),
            Tensor::zeros((head_bias.len(), 4), DType::F32, &device).unwrap(),
        );
        tensors.insert(
            "classifier.bias".to_string(),
            Tensor::new(head_bias, &device).unwrap(),
        );
        candle_core::safetensors::save(&tensors, dir.join(WEIGHTS_FILE)).unwrap();
    }

    #[test]
    fn test_device_parsing() {
        assert_eq!("cpu".parse::<DeviceType>().unwrap(), DeviceType::Cpu);
        assert_eq!("cuda".parse::<DeviceType>().unwrap(), DeviceType::Cuda(0));
        assert_eq!("cuda:1".parse::<DeviceType>().unwrap(), DeviceType::Cuda(1));
        assert_eq!("MPS".parse::<DeviceType>().unwrap(), DeviceType::Metal(0));
        assert!("tpu".parse::<DeviceType>().is_err());
        assert!("cuda:x".parse::<DeviceType>().is_err());
    }

    #[test]
    fn test_artifact_config_defaults() {
        let config: ArtifactConfig =
            serde_json::from_str(r#"{"input_shape": [null, 64, 64, 3], "num_classes": 2}"#)
                .unwrap();
        assert_eq!(config.input_shape, vec![None, Some(64), Some(64), Some(3)]);
        assert_eq!(config.conv_channels, vec![16, 32]);
    }

    #[tokio::test]
    async fn test_load_and_predict() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(dir.path(), 8, &[0.0, 1.0]);

        let runtime = CandleRuntime::cpu();
        let model = runtime
            .load_model(&ArtifactLocation::local(dir.path()))
            .await
            .unwrap();
        assert_eq!(model.input_shape(), vec![None, Some(8), Some(8), Some(3)]);

        let input = Tensor::ones((1, 8, 8, 3), DType::F32, &Device::Cpu).unwrap();
        let output = model.predict(&input).unwrap();
        let probs = output.data().await.unwrap();

        assert_eq!(probs.len(), 2);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!((probs[1] - 0.731_058_6).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_missing_artifact_is_load_error() {
        let runtime = CandleRuntime::cpu();
        let result = runtime
            .load_model(&ArtifactLocation::local("/nonexistent/snapclass/model"))
            .await;
        assert!(matches!(result, Err(Error::Load(_))));
    }

    #[tokio::test]
    async fn test_corrupt_config_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();

        let runtime = CandleRuntime::cpu();
        let result = runtime.load_model(&ArtifactLocation::local(dir.path())).await;
        assert!(matches!(result, Err(Error::Load(_))));
    }
}
