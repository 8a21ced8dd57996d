//! Model lifecycle management
//!
//! The [`ModelLifecycle`] owns the single "current" model and drives the
//! `Idle -> Loading -> Ready | Failed` state machine. Every selection takes a
//! fresh generation number; when a load resolves, it may only write state if
//! its generation is still the latest one. A slow load that finishes after a
//! newer selection is discarded, so the most recent selection always wins.

use crate::events::EventBus;
use crate::registry::{ModelDescriptor, ModelRegistry};
use crate::runtime::{InferenceRuntime, InputShape, ModelHandle};
use parking_lot::Mutex;
use snapclass_core::{Error, ModelStatus, Notification, Result};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A model that finished loading and passed shape inference
pub struct LoadedModel {
    descriptor: Arc<ModelDescriptor>,
    handle: Box<dyn ModelHandle>,
    shape: InputShape,
    generation: u64,
}

impl LoadedModel {
    /// Wrap a runtime handle, parsing its declared input shape
    pub fn new(
        descriptor: Arc<ModelDescriptor>,
        handle: Box<dyn ModelHandle>,
        generation: u64,
    ) -> Result<Self> {
        let shape = InputShape::from_declared(&handle.input_shape())?;
        Ok(Self {
            descriptor,
            handle,
            shape,
            generation,
        })
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    /// Square side length the model expects
    pub fn input_size(&self) -> usize {
        self.shape.input_size()
    }

    pub fn shape(&self) -> InputShape {
        self.shape
    }

    /// Output vocabulary, shared with the registry descriptor
    pub fn labels(&self) -> &[String] {
        &self.descriptor.labels
    }

    pub fn descriptor(&self) -> &Arc<ModelDescriptor> {
        &self.descriptor
    }

    pub fn handle(&self) -> &dyn ModelHandle {
        self.handle.as_ref()
    }

    /// Selection generation that produced this model
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("id", &self.descriptor.id)
            .field("shape", &self.shape)
            .field("labels", &self.descriptor.labels)
            .field("generation", &self.generation)
            .finish()
    }
}

/// How a `select_model` call resolved
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// This selection is now the current model
    Ready(Arc<LoadedModel>),

    /// A newer selection was made while this one was loading; its result was dropped
    Superseded { model_id: String, generation: u64 },
}

impl LoadOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn model(&self) -> Option<&Arc<LoadedModel>> {
        match self {
            Self::Ready(model) => Some(model),
            Self::Superseded { .. } => None,
        }
    }
}

struct LifecycleInner {
    status: ModelStatus,
    current: Option<Arc<LoadedModel>>,
    generation: u64,
}

/// Owner of the current model and its load state
pub struct ModelLifecycle {
    registry: Arc<ModelRegistry>,
    runtime: Arc<dyn InferenceRuntime>,
    events: Arc<EventBus>,
    inner: Mutex<LifecycleInner>,
}

impl ModelLifecycle {
    pub fn new(
        registry: Arc<ModelRegistry>,
        runtime: Arc<dyn InferenceRuntime>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            registry,
            runtime,
            events,
            inner: Mutex::new(LifecycleInner {
                status: ModelStatus::Idle,
                current: None,
                generation: 0,
            }),
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Subscribe to lifecycle and classification notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.events.subscribe()
    }

    /// Current state snapshot
    pub fn status(&self) -> ModelStatus {
        self.inner.lock().status.clone()
    }

    /// The ready model, or `None` while idle, loading or failed
    pub fn current(&self) -> Option<Arc<LoadedModel>> {
        let inner = self.inner.lock();
        if inner.status.is_ready() {
            inner.current.clone()
        } else {
            None
        }
    }

    /// Select and load a model.
    ///
    /// Resolves to [`LoadOutcome::Superseded`] when another selection was made
    /// before this load finished; the stale model is dropped without touching
    /// state.
    ///
    /// An unregistered id is rejected before it counts as a selection: the
    /// error is published and the current state is left as it was. If this
    /// future is dropped mid-load while still the latest selection, the
    /// lifecycle settles in `Failed`.
    pub async fn select_model(&self, id: &str) -> Result<LoadOutcome> {
        let descriptor = match self.registry.describe(id) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                warn!(model = id, "Selected model is not registered");
                metrics::counter!("snapclass_model_loads_total", "outcome" => err.kind())
                    .increment(1);
                self.events.publish(Notification::failure(&err));
                return Err(err);
            }
        };

        let generation = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            self.transition(
                &mut inner,
                ModelStatus::Loading {
                    model_id: id.to_string(),
                },
            );
            inner.generation
        };
        let mut pending = PendingLoad::new(self, id, generation);

        info!(
            model = id,
            generation,
            runtime = self.runtime.name(),
            artifact = %descriptor.artifact,
            "Loading model"
        );

        let loaded = match self.runtime.load_model(&descriptor.artifact).await {
            Ok(handle) => LoadedModel::new(descriptor, handle, generation),
            Err(err) => Err(err),
        };

        let mut inner = self.inner.lock();
        pending.settled();

        if inner.generation != generation {
            debug!(
                model = id,
                generation,
                latest = inner.generation,
                succeeded = loaded.is_ok(),
                "Discarding superseded model load"
            );
            metrics::counter!("snapclass_model_loads_total", "outcome" => "superseded")
                .increment(1);
            return Ok(LoadOutcome::Superseded {
                model_id: id.to_string(),
                generation,
            });
        }

        match loaded {
            Ok(model) => {
                let model = Arc::new(model);
                let input_size = model.input_size();
                // Replacing the previous model releases it once no caller holds it
                inner.current = Some(Arc::clone(&model));
                self.transition(
                    &mut inner,
                    ModelStatus::Ready {
                        model_id: id.to_string(),
                        input_size,
                    },
                );
                info!(model = id, generation, input_size, "Model ready");
                metrics::counter!("snapclass_model_loads_total", "outcome" => "ready").increment(1);
                Ok(LoadOutcome::Ready(model))
            }
            Err(err) => {
                warn!(model = id, generation, error = %err, "Model load failed");
                self.fail(&mut inner, id, &err);
                Err(err)
            }
        }
    }

    /// Start a selection in the background.
    ///
    /// Useful for event handlers that should not wait on the load; a later
    /// selection still wins regardless of which task finishes first.
    pub fn spawn_select(self: &Arc<Self>, id: impl Into<String>) -> JoinHandle<Result<LoadOutcome>> {
        let this = Arc::clone(self);
        let id = id.into();
        tokio::spawn(async move { this.select_model(&id).await })
    }

    fn transition(&self, inner: &mut LifecycleInner, status: ModelStatus) {
        inner.status = status.clone();
        self.events.publish(Notification::Status(status));
    }

    fn fail(&self, inner: &mut LifecycleInner, id: &str, err: &Error) {
        inner.current = None;
        self.transition(
            inner,
            ModelStatus::Failed {
                model_id: id.to_string(),
                error: err.to_string(),
            },
        );
        metrics::counter!("snapclass_model_loads_total", "outcome" => err.kind()).increment(1);
    }
}

/// Marks a load as in flight until its completion has been handled.
///
/// Dropped while armed (caller timed out, task aborted, runtime panicked),
/// it fails the lifecycle if its generation is still the latest.
struct PendingLoad<'a> {
    lifecycle: &'a ModelLifecycle,
    model_id: &'a str,
    generation: u64,
    armed: bool,
}

impl<'a> PendingLoad<'a> {
    fn new(lifecycle: &'a ModelLifecycle, model_id: &'a str, generation: u64) -> Self {
        Self {
            lifecycle,
            model_id,
            generation,
            armed: true,
        }
    }

    fn settled(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingLoad<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let mut inner = self.lifecycle.inner.lock();
        if inner.generation != self.generation {
            return;
        }

        let err = Error::load(format!(
            "load of '{}' was abandoned before it finished",
            self.model_id
        ));
        warn!(model = self.model_id, generation = self.generation, "Model load abandoned");
        self.lifecycle.fail(&mut inner, self.model_id, &err);
    }
}
