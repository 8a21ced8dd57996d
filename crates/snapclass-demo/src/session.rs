//! Event driver standing in for a user interface
//!
//! Turns text commands into model-selection and image-selection events and
//! prints every notification the pipeline publishes.

use snapclass_classifiers::{
    CandleRuntime, EventBus, ImageClassifier, ImagePreprocessor, ModelLifecycle, ModelRegistry,
};
use snapclass_core::Notification;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::DemoConfig;

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SelectModel(String),
    SelectImage(PathBuf),
    Status,
    Quit,
}

impl Command {
    /// Parse a command line; blank lines yield `Ok(None)`
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (line, ""),
        };

        let command = match (verb, arg) {
            ("model", id) if !id.is_empty() => Self::SelectModel(id.to_string()),
            ("image", path) if !path.is_empty() => Self::SelectImage(PathBuf::from(path)),
            ("status", "") => Self::Status,
            ("quit" | "exit", "") => Self::Quit,
            _ => {
                return Err(format!(
                    "unrecognised command '{}' (expected: model <id>, image <path>, status, quit)",
                    line
                ))
            }
        };
        Ok(Some(command))
    }
}

/// The pipeline plus the handles a UI would hold on to
pub struct Session {
    lifecycle: Arc<ModelLifecycle>,
    classifier: ImageClassifier,
    pending: Vec<JoinHandle<snapclass_core::Result<snapclass_classifiers::LoadOutcome>>>,
}

impl Session {
    /// Wire registry, Candle runtime and event bus from configuration
    pub fn from_config(config: &DemoConfig, registry: ModelRegistry) -> anyhow::Result<Self> {
        let runtime = CandleRuntime::new(config.device_type()?)?;
        let preprocessor = ImagePreprocessor::new(runtime.device().clone());
        let lifecycle = Arc::new(ModelLifecycle::new(
            Arc::new(registry),
            Arc::new(runtime),
            Arc::new(EventBus::new(config.event_capacity)),
        ));
        Ok(Self::new(lifecycle, preprocessor))
    }

    pub fn new(lifecycle: Arc<ModelLifecycle>, preprocessor: ImagePreprocessor) -> Self {
        let classifier = ImageClassifier::new(Arc::clone(&lifecycle), preprocessor);
        Self {
            lifecycle,
            classifier,
            pending: Vec::new(),
        }
    }

    pub fn lifecycle(&self) -> &Arc<ModelLifecycle> {
        &self.lifecycle
    }

    /// Print notifications until the bus closes
    pub fn spawn_printer(&self) -> JoinHandle<()> {
        let rx = self.lifecycle.subscribe();
        tokio::spawn(print_notifications(rx))
    }

    /// Handle one command; returns `false` on quit
    pub async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::SelectModel(id) => {
                // Do not wait: a later selection may supersede this one
                self.pending.retain(|task| !task.is_finished());
                self.pending.push(self.lifecycle.spawn_select(id));
            }
            Command::SelectImage(path) => match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    if let Ok(None) = self.classifier.classify(bytes).await {
                        println!("(no model ready: {})", self.lifecycle.status());
                    }
                }
                Err(e) => println!("error: cannot read {}: {}", path.display(), e),
            },
            Command::Status => println!("{}", self.lifecycle.status()),
            Command::Quit => return false,
        }
        true
    }

    /// Wait for every outstanding model selection to settle
    pub async fn settle(&mut self) {
        for task in self.pending.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "Model selection task failed");
            }
        }
    }
}

async fn print_notifications(mut rx: broadcast::Receiver<Notification>) {
    loop {
        match rx.recv().await {
            Ok(notification) => println!("{}", notification),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Notification printer lagged");
            }
            Err(RecvError::Closed) => {
                debug!("Notification bus closed");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("model catdog").unwrap(),
            Some(Command::SelectModel("catdog".into()))
        );
        assert_eq!(
            Command::parse("  image  photos/my cat.png ").unwrap(),
            Some(Command::SelectImage(PathBuf::from("photos/my cat.png")))
        );
        assert_eq!(Command::parse("status").unwrap(), Some(Command::Status));
        assert_eq!(Command::parse("exit").unwrap(), Some(Command::Quit));
        assert_eq!(Command::parse("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Command::parse("model").is_err());
        assert!(Command::parse("image").is_err());
        assert!(Command::parse("status now").is_err());
        assert!(Command::parse("dance").is_err());
    }

    #[tokio::test]
    async fn test_unknown_model_is_reported() {
        let lifecycle = Arc::new(ModelLifecycle::new(
            Arc::new(ModelRegistry::builtin()),
            Arc::new(CandleRuntime::cpu()),
            Arc::new(EventBus::default()),
        ));
        let mut rx = lifecycle.subscribe();
        let mut session = Session::new(Arc::clone(&lifecycle), ImagePreprocessor::default());

        assert!(session.handle(Command::SelectModel("zebra".into())).await);
        session.settle().await;

        assert_eq!(
            rx.recv().await.unwrap().to_string(),
            "error: unknown model: zebra"
        );
        assert_eq!(lifecycle.status().to_string(), "idle");
        assert!(!session.handle(Command::Quit).await);
    }
}
