use super::source::FrameSource;
use crate::config::CameraConfig;
use crate::error::{CameraError, Result};
use crate::frame::{FrameFormat, FrameHandler, FrameRef};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Timer-driven frame source producing BGRA test patterns.
///
/// Used when no capture backend is compiled in. The frame buffer is reused
/// between callbacks, like a real capture ring.
pub struct SyntheticCamera {
    config: CameraConfig,
    frame_counter: Arc<AtomicU64>,
    is_running: Arc<AtomicBool>,
    capture_task: Mutex<Option<JoinHandle<()>>>,
}

impl SyntheticCamera {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.fps == 0 {
            return Err(CameraError::Configuration {
                details: "Synthetic camera fps must be greater than 0".to_string(),
            }
            .into());
        }

        info!(
            "Initializing synthetic camera ({}x{} @ {}fps, {:?})",
            config.resolution.0, config.resolution.1, config.fps, config.orientation
        );

        Ok(Self {
            config,
            frame_counter: Arc::new(AtomicU64::new(0)),
            is_running: Arc::new(AtomicBool::new(false)),
            capture_task: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }
}

#[async_trait]
impl FrameSource for SyntheticCamera {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn start(&self, handler: FrameHandler) -> Result<()> {
        let mut capture_task = self.capture_task.lock().await;

        if self.is_running.swap(true, Ordering::SeqCst) {
            warn!("Synthetic camera is already capturing");
            return Ok(());
        }

        let config = self.config.clone();
        let is_running = Arc::clone(&self.is_running);
        let frame_counter = Arc::clone(&self.frame_counter);

        let task = tokio::spawn(async move {
            let (width, height) = config.resolution;
            let frame_interval = Duration::from_millis((1000 / config.fps as u64).max(1));
            let mut interval_timer = tokio::time::interval(frame_interval);
            let frame_len =
                width as usize * height as usize * FrameFormat::Bgra32.bytes_per_pixel();
            let mut buffer = vec![0u8; frame_len];

            info!("Synthetic capture loop started");

            while is_running.load(Ordering::SeqCst) {
                interval_timer.tick().await;

                if !is_running.load(Ordering::SeqCst) {
                    break;
                }

                let frame_id = frame_counter.fetch_add(1, Ordering::SeqCst);
                buffer.fill((frame_id % 256) as u8);

                trace!("Generated synthetic frame {} ({}x{})", frame_id, width, height);

                handler(FrameRef {
                    id: frame_id,
                    timestamp: SystemTime::now(),
                    data: &buffer,
                    width,
                    height,
                    format: FrameFormat::Bgra32,
                    orientation: config.orientation,
                });
            }

            info!("Synthetic capture loop stopped");
        });

        *capture_task = Some(task);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut capture_task = self.capture_task.lock().await;

        if !self.is_running.swap(false, Ordering::SeqCst) {
            debug!("Synthetic camera is not capturing");
            return Ok(());
        }

        info!("Stopping synthetic camera");

        if let Some(task) = capture_task.take() {
            match tokio::time::timeout(Duration::from_secs(3), task).await {
                Ok(Ok(())) => debug!("Synthetic capture task completed"),
                Ok(Err(e)) => error!("Error waiting for synthetic capture task: {}", e),
                Err(_) => warn!("Synthetic capture task did not complete within timeout"),
            }
        }

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    fn frame_count(&self) -> u64 {
        self.frame_counter.load(Ordering::SeqCst)
    }
}
