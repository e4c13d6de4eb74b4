use super::{CardcamOrchestrator, ComponentState};
use crate::error::Result;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

impl CardcamOrchestrator {
    /// Perform graceful shutdown: stop frame delivery, then drain the pipeline
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        let mut exit_code = 0;

        match timeout(Duration::from_secs(10), self.stop()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("Error stopping camera: {}", e);
                self.set_component_state("camera", ComponentState::Failed).await;
                exit_code = 1;
            }
            Err(_) => {
                error!("camera component stop timeout");
                self.set_component_state("camera", ComponentState::Failed).await;
                exit_code = 1;
            }
        }

        self.set_component_state("pipeline", ComponentState::Stopping).await;
        match self.worker.shutdown().await {
            Ok(()) => {
                self.set_component_state("pipeline", ComponentState::Stopped).await;
            }
            Err(e) => {
                error!("Error stopping pipeline: {}", e);
                self.set_component_state("pipeline", ComponentState::Failed).await;
                exit_code = 1;
            }
        }

        let stats = self.worker.stats();
        info!(
            "Pipeline processed {} frames ({} cards, {:.1}% recognised, {} dropped)",
            stats.frames_processed,
            stats.cards_recognized,
            stats.recognition_rate() * 100.0,
            stats.frames_dropped
        );

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }
}
