use super::{CardcamOrchestrator, ShutdownReason};
use crate::error::{CardcamError, Result};
use crate::events::CardcamEvent;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info};

/// One-shot shutdown request shared between signal handlers and callers
#[derive(Clone)]
pub struct ShutdownTrigger {
    sender: Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>,
}

impl ShutdownTrigger {
    pub(super) fn new(sender: oneshot::Sender<ShutdownReason>) -> Self {
        Self {
            sender: Arc::new(Mutex::new(Some(sender))),
        }
    }

    /// Returns false if shutdown was already requested
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        match self.sender.lock().take() {
            Some(sender) => sender.send(reason).is_ok(),
            None => false,
        }
    }
}

impl CardcamOrchestrator {
    /// Run until a shutdown signal or request arrives, then shut down
    pub async fn run(&mut self) -> Result<i32> {
        info!("Cardcam system is running");

        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| CardcamError::system("Shutdown receiver already taken"))?;

        self.setup_signal_handlers();

        let shutdown_reason = shutdown_receiver
            .await
            .map_err(|_| CardcamError::system("Shutdown channel closed unexpectedly"))?;

        info!("Shutdown initiated: {:?}", shutdown_reason);
        self.publish(CardcamEvent::ShutdownRequested {
            timestamp: SystemTime::now(),
            reason: format!("{:?}", shutdown_reason),
        });

        let exit_code = self.shutdown().await?;

        info!("Cardcam system shutdown complete");
        Ok(exit_code)
    }

    /// Set up signal handlers for graceful shutdown
    fn setup_signal_handlers(&self) {
        #[cfg(unix)]
        {
            let trigger = self.shutdown_trigger.clone();
            tokio::spawn(async move {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        if sigterm.recv().await.is_some() {
                            info!("Received SIGTERM signal");
                            trigger.trigger(ShutdownReason::Signal("SIGTERM".to_string()));
                        }
                    }
                    Err(e) => error!("Failed to register SIGTERM handler: {}", e),
                }
            });
        }

        let trigger = self.shutdown_trigger.clone();
        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                trigger.trigger(ShutdownReason::Signal("SIGINT".to_string()));
            }
        });
    }
}
