use super::runtime::ShutdownTrigger;
use super::types::{ComponentState, ShutdownReason};
use crate::camera::FrameSource;
use crate::card::CardResult;
use crate::classifier::ClassifierRegistry;
use crate::config::CardcamConfig;
use crate::error::Result;
use crate::events::{CardcamEvent, EventBus};
use crate::pipeline::{PipelineStatsSnapshot, PipelineWorker, SetupReport};
use crate::thresholds::ConfidenceThresholds;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info};

/// Main application coordinator owning the frame source and the pipeline
pub struct CardcamOrchestrator {
    pub(super) config: CardcamConfig,
    pub(super) registry: ClassifierRegistry,
    pub(super) event_bus: Arc<EventBus>,
    pub(super) thresholds: Arc<ConfidenceThresholds>,
    pub(super) worker: PipelineWorker,

    // Components
    pub(super) frame_source: Option<Arc<dyn FrameSource>>,
    pub(super) synthetic_frames: bool,
    pub(super) setup_report: Option<SetupReport>,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_trigger: ShutdownTrigger,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
}

impl CardcamOrchestrator {
    /// Create a new orchestrator with the given configuration and the
    /// classifiers available for setup
    pub async fn new(config: CardcamConfig, registry: ClassifierRegistry) -> Result<Self> {
        let event_bus = Arc::new(EventBus::new(config.system.event_bus_capacity));
        let thresholds = Arc::new(ConfidenceThresholds::new(
            config.classifier.suit_threshold,
            config.classifier.rank_threshold,
        )?);
        let worker = PipelineWorker::spawn(&config.pipeline, Arc::clone(&thresholds));
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        info!(
            "Orchestrator created with {} registered classifiers",
            registry.names().len()
        );

        Ok(Self {
            config,
            registry,
            event_bus,
            thresholds,
            worker,
            frame_source: None,
            synthetic_frames: false,
            setup_report: None,
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_trigger: ShutdownTrigger::new(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
        })
    }

    /// Use this frame source instead of building one during setup
    pub fn set_frame_source(&mut self, source: Arc<dyn FrameSource>) {
        self.frame_source = Some(source);
    }

    /// Prefer generated frames over a hardware capture backend
    pub fn set_synthetic_frames(&mut self, synthetic: bool) {
        self.synthetic_frames = synthetic;
    }

    /// Register the result callback, replacing any previous one
    pub fn set_result_handler<F>(&self, handler: F)
    where
        F: Fn(Option<CardResult>) + Send + Sync + 'static,
    {
        self.worker.sink().set_handler(handler);
    }

    /// Shared confidence thresholds; changes apply to the next gate check
    pub fn thresholds(&self) -> Arc<ConfidenceThresholds> {
        Arc::clone(&self.thresholds)
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn config(&self) -> &CardcamConfig {
        &self.config
    }

    pub fn setup_report(&self) -> Option<&SetupReport> {
        self.setup_report.as_ref()
    }

    pub fn pipeline_stats(&self) -> PipelineStatsSnapshot {
        self.worker.stats()
    }

    pub fn is_capturing(&self) -> bool {
        self.frame_source
            .as_ref()
            .map(|source| source.is_capturing())
            .unwrap_or(false)
    }

    /// Handle that makes `run` return, usable from any task
    pub fn shutdown_trigger(&self) -> ShutdownTrigger {
        self.shutdown_trigger.clone()
    }

    pub(super) fn publish(&self, event: CardcamEvent) {
        if let Err(e) = self.event_bus.publish(event) {
            debug!("Event not delivered: {}", e);
        }
    }
}
