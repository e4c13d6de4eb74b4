use super::source::FrameSource;
use super::synthetic::SyntheticCamera;
use crate::config::CameraConfig;
use crate::error::{CardcamError, Result};
use std::sync::Arc;
use tracing::info;

/// Picks the frame source for the current build
pub struct FrameSourceBuilder {
    config: Option<CameraConfig>,
    synthetic: bool,
}

impl FrameSourceBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            synthetic: false,
        }
    }

    pub fn config(mut self, config: CameraConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use generated frames even when a capture backend is available
    pub fn synthetic(mut self, synthetic: bool) -> Self {
        self.synthetic = synthetic;
        self
    }

    pub fn build(self) -> Result<Arc<dyn FrameSource>> {
        let config = self
            .config
            .ok_or_else(|| CardcamError::system("Camera configuration must be specified"))?;

        #[cfg(all(target_os = "linux", feature = "camera"))]
        {
            if !self.synthetic {
                let camera = super::gst::GstCamera::new(config)?;
                return Ok(Arc::new(camera));
            }
        }

        if !self.synthetic {
            info!("No capture backend compiled in, using synthetic frames");
        }

        Ok(Arc::new(SyntheticCamera::new(config)?))
    }
}

impl Default for FrameSourceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
