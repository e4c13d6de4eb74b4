use super::{CardcamOrchestrator, ComponentState};
use crate::camera::FrameSourceBuilder;
use crate::error::{CardcamError, Result, SetupError};
use crate::events::CardcamEvent;
use crate::pipeline::{ClassifierSelection, SetupReport};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{error, info, warn};

impl CardcamOrchestrator {
    /// One-time initialisation of the frame source and both classifiers.
    ///
    /// Component failures are logged and published but do not fail setup:
    /// a missing classifier makes every frame yield no result, a missing
    /// frame source means no frames arrive.
    pub async fn setup(&mut self) -> Result<SetupReport> {
        if let Some(report) = &self.setup_report {
            warn!("Setup already completed");
            return Ok(report.clone());
        }

        info!("Setting up Cardcam system components");
        self.set_component_state("camera", ComponentState::Starting).await;
        self.set_component_state("pipeline", ComponentState::Starting).await;

        if self.frame_source.is_none() {
            let built = FrameSourceBuilder::new()
                .config(self.config.camera.clone())
                .synthetic(self.synthetic_frames)
                .build();

            match built {
                Ok(source) => self.frame_source = Some(source),
                Err(e) => {
                    let failure = SetupError::FrameSource {
                        details: e.to_string(),
                    };
                    error!("Camera setup failed: {}", failure);
                    self.publish(CardcamEvent::SetupFailed {
                        component: "camera".to_string(),
                        error: failure.to_string(),
                    });
                }
            }
        }

        let camera_state = match &self.frame_source {
            Some(source) => {
                info!("Using '{}' frame source", source.name());
                ComponentState::Stopped
            }
            None => ComponentState::Failed,
        };
        self.set_component_state("camera", camera_state).await;

        let selection = ClassifierSelection {
            suit: self.config.classifier.suit_model.clone(),
            rank: self.config.classifier.rank_model.clone(),
        };
        let report = self.worker.setup(self.registry.clone(), selection).await?;

        for failure in &report.failures {
            self.publish(CardcamEvent::SetupFailed {
                component: "classifier".to_string(),
                error: failure.to_string(),
            });
        }

        // The worker runs either way; an incomplete setup only means empty results
        self.set_component_state("pipeline", ComponentState::Running).await;

        info!(
            "Setup finished (suit classifier ready: {}, rank classifier ready: {})",
            report.suit_ready, report.rank_ready
        );
        self.setup_report = Some(report.clone());
        Ok(report)
    }

    /// Begin delivering frames into the pipeline. Idempotent.
    pub async fn start(&self) -> Result<()> {
        if self.setup_report.is_none() {
            return Err(CardcamError::system("setup() must complete before start()"));
        }

        let Some(source) = &self.frame_source else {
            warn!("No frame source available, nothing to start");
            return Ok(());
        };

        if source.is_capturing() {
            warn!("Capture already running");
            return Ok(());
        }

        self.set_component_state("camera", ComponentState::Starting).await;

        if let Err(e) = source.start(self.worker.handle().frame_handler()).await {
            error!("Failed to start frame source: {}", e);
            self.set_component_state("camera", ComponentState::Failed).await;
            self.publish(CardcamEvent::SystemError {
                component: "camera".to_string(),
                error: e.to_string(),
            });
            return Err(e);
        }

        self.set_component_state("camera", ComponentState::Running).await;
        self.publish(CardcamEvent::CaptureStateChanged {
            capturing: true,
            timestamp: SystemTime::now(),
        });
        info!("Capture started");
        Ok(())
    }

    /// Stop delivering frames. Frames already queued still get an outcome.
    /// Idempotent.
    pub async fn stop(&self) -> Result<()> {
        let Some(source) = self.frame_source.as_ref().map(Arc::clone) else {
            return Ok(());
        };

        if !source.is_capturing() {
            info!("Capture already stopped");
            return Ok(());
        }

        self.set_component_state("camera", ComponentState::Stopping).await;
        source.stop().await?;
        self.set_component_state("camera", ComponentState::Stopped).await;

        self.publish(CardcamEvent::CaptureStateChanged {
            capturing: false,
            timestamp: SystemTime::now(),
        });
        info!("Capture stopped");
        Ok(())
    }
}
