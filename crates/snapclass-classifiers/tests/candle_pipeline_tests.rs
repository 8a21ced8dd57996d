//! End-to-end tests against the Candle runtime
//!
//! Builds tiny safetensors artifacts on disk and drives them through the
//! full select-then-classify path.


use candle_core::{DType, Device, Tensor};
use mock_runtime::png_bytes;
use snapclass_classifiers::candle_runtime::{CONFIG_FILE, WEIGHTS_FILE};
use snapclass_classifiers::{
    ArtifactConfig, ArtifactLocation, CandleRuntime, EventBus, ImageClassifier, ImagePreprocessor,
    ModelDescriptor, ModelLifecycle, ModelRegistry,
};
use snapclass_core::{Error, ModelStatus};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Zero conv weights, so the softmax of `head_bias` is the output for any image
fn write_artifact(dir: &Path, input_size: i64, head_bias: &[f32]) {
    let config = ArtifactConfig {
        input_shape: vec![None, Some(input_size), Some(input_size), Some(3)],
        conv_channels: vec![4, 8],
        num_classes: head_bias.len(),
    };
    std::fs::write(dir.join(CONFIG_FILE), serde_json::to_string(&config).unwrap()).unwrap();

    let device = Device::Cpu;
    let mut tensors = HashMap::new();
    for (i, (cin, cout)) in [(3, 4), (4, 8)].into_iter().enumerate() {
        tensors.insert(
            format!("features.{}.weight", i),
            Tensor::zeros((cout, cin, 3, 3), DType::F32, &device).unwrap(),
        );
        tensors.insert(
            format!("features.{}.bias", i),
            Tensor::zeros(cout, DType::F32, &device).unwrap(),
        );
    }
    tensors.insert(
        "classifier.weight".to_string(),
        Tensor::zeros((head_bias.len(), 8), DType::F32, &device).unwrap(),
    );
    tensors.insert(
        "classifier.bias".to_string(),
        Tensor::new(head_bias, &device).unwrap(),
    );
    candle_core::safetensors::save(&tensors, dir.join(WEIGHTS_FILE)).unwrap();
}

fn classifier_for(registry: ModelRegistry) -> (Arc<ModelLifecycle>, ImageClassifier) {
    let lifecycle = Arc::new(ModelLifecycle::new(
        Arc::new(registry),
        Arc::new(CandleRuntime::cpu()),
        Arc::new(EventBus::default()),
    ));
    let classifier = ImageClassifier::new(Arc::clone(&lifecycle), ImagePreprocessor::default());
    (lifecycle, classifier)
}

#[tokio::test]
async fn test_candle_model_classifies_image() {
    let dir = tempfile::tempdir().unwrap();
    write_artifact(dir.path(), 8, &[0.0, 1.0]);

    let registry = ModelRegistry::new(
        [ModelDescriptor::new(
            "catdog",
            ArtifactLocation::local(dir.path()),
            ["cat", "dog"],
        )],
        None,
    )
    .unwrap();
    let (lifecycle, classifier) = classifier_for(registry);

    lifecycle.select_model("catdog").await.unwrap();
    assert_eq!(
        lifecycle.status(),
        ModelStatus::Ready {
            model_id: "catdog".into(),
            input_size: 8
        }
    );

    let result = classifier
        .classify(png_bytes(37, 21))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.to_string(), "dog (73.1%)");
}

#[tokio::test]
async fn test_switching_between_candle_models() {
    let catdog = tempfile::tempdir().unwrap();
    let orange = tempfile::tempdir().unwrap();
    write_artifact(catdog.path(), 8, &[1.0, 0.0]);
    write_artifact(orange.path(), 12, &[0.0, 0.0, 2.0]);

    let yaml = format!(
        r#"
version: "1.0"
default_model: catdog
models:
  catdog:
    source:
      type: local
      path: {}
    labels: [cat, dog]
  orange:
    source:
      type: local
      path: {}
    labels: [fresh_orange, rotten_orange, sweet_orange]
"#,
        catdog.path().display(),
        orange.path().display()
    );
    let (lifecycle, classifier) = classifier_for(ModelRegistry::from_yaml(&yaml).unwrap());

    lifecycle.select_model("catdog").await.unwrap();
    let first = classifier.classify(png_bytes(10, 10)).await.unwrap().unwrap();
    assert_eq!(first.label, "cat");

    lifecycle.select_model("orange").await.unwrap();
    assert_eq!(lifecycle.current().unwrap().input_size(), 12);
    let second = classifier.classify(png_bytes(10, 10)).await.unwrap().unwrap();
    assert_eq!(second.label, "sweet_orange");
    assert!(second.confidence_percent > 70.0);
}

#[tokio::test]
async fn test_missing_candle_artifact_fails_selection() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ModelRegistry::new(
        [ModelDescriptor::new(
            "catdog",
            ArtifactLocation::local(dir.path().join("missing")),
            ["cat", "dog"],
        )],
        None,
    )
    .unwrap();
    let (lifecycle, classifier) = classifier_for(registry);

    let err = lifecycle.select_model("catdog").await.unwrap_err();
    assert!(matches!(err, Error::Load(_)));
    assert!(lifecycle.status().to_string().starts_with("error: "));
    assert!(classifier.classify(png_bytes(4, 4)).await.unwrap().is_none());
}
