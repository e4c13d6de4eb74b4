use super::source::FrameSource;
use crate::config::CameraConfig;
use crate::error::{CameraError, Result};
use crate::frame::{FrameFormat, FrameHandler, FrameRef};
use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, trace, warn};

/// GStreamer v4l2 capture delivering MJPEG frames
pub struct GstCamera {
    config: CameraConfig,
    frame_counter: Arc<AtomicU64>,
    is_running: AtomicBool,
    pipeline: Pipeline,
}

impl GstCamera {
    pub fn new(config: CameraConfig) -> Result<Self> {
        info!(
            "Initializing GStreamer camera for device {} ({}x{} @ {}fps)",
            config.index, config.resolution.0, config.resolution.1, config.fps
        );

        gstreamer::init().map_err(|e| CameraError::Configuration {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        let pipeline_desc = build_pipeline_string(&config);
        info!("Creating GStreamer pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| CameraError::Configuration {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| CameraError::Configuration {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        // Fail setup rather than the first start() if the device is absent
        pipeline
            .set_state(gstreamer::State::Ready)
            .map_err(|e| CameraError::Configuration {
                details: format!("Camera device not ready: {}", e),
            })?;
        let _ = pipeline.set_state(gstreamer::State::Null);

        Ok(Self {
            config,
            frame_counter: Arc::new(AtomicU64::new(0)),
            is_running: AtomicBool::new(false),
            pipeline,
        })
    }

    fn appsink(&self) -> Result<AppSink> {
        let sink = self
            .pipeline
            .by_name("sink")
            .ok_or_else(|| CameraError::Configuration {
                details: "Pipeline has no appsink".to_string(),
            })?
            .downcast::<AppSink>()
            .map_err(|_| CameraError::Configuration {
                details: "Failed to downcast to AppSink".to_string(),
            })?;
        Ok(sink)
    }
}

fn build_pipeline_string(config: &CameraConfig) -> String {
    let (width, height) = config.resolution;

    format!(
        "v4l2src device=/dev/video{} io-mode=mmap do-timestamp=true ! \
         image/jpeg,width={},height={},framerate={}/1 ! \
         queue max-size-buffers=2 leaky=downstream ! \
         appsink name=sink sync=false max-buffers=2 drop=true qos=false enable-last-sample=false",
        config.index, width, height, config.fps
    )
}

#[async_trait]
impl FrameSource for GstCamera {
    fn name(&self) -> &str {
        "gstreamer"
    }

    async fn start(&self, handler: FrameHandler) -> Result<()> {
        if self.is_running.swap(true, Ordering::SeqCst) {
            warn!("GStreamer camera capture is already running");
            return Ok(());
        }

        info!("Starting GStreamer camera capture");

        let appsink = match self.appsink() {
            Ok(sink) => sink,
            Err(e) => {
                self.is_running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let frame_counter = Arc::clone(&self.frame_counter);
        let fallback_size = self.config.resolution;
        let orientation = self.config.orientation;

        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let sample = appsink
                        .pull_sample()
                        .map_err(|_| gstreamer::FlowError::Eos)?;
                    let buffer = sample.buffer().ok_or(gstreamer::FlowError::Error)?;
                    let map = buffer
                        .map_readable()
                        .map_err(|_| gstreamer::FlowError::Error)?;

                    let (width, height) = sample
                        .caps()
                        .and_then(|caps| caps.structure(0))
                        .and_then(|s| {
                            Some((s.get::<i32>("width").ok()?, s.get::<i32>("height").ok()?))
                        })
                        .map(|(w, h)| (w as u32, h as u32))
                        .unwrap_or(fallback_size);

                    let frame_id = frame_counter.fetch_add(1, Ordering::SeqCst);
                    trace!("Captured MJPEG frame {} ({} bytes)", frame_id, map.len());

                    // The mapped buffer goes back to GStreamer when this returns
                    handler(FrameRef {
                        id: frame_id,
                        timestamp: SystemTime::now(),
                        data: map.as_slice(),
                        width,
                        height,
                        format: FrameFormat::Mjpeg,
                        orientation,
                    });

                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        if let Err(e) = self.pipeline.set_state(gstreamer::State::Playing) {
            self.is_running.store(false, Ordering::SeqCst);
            return Err(CameraError::CaptureStream {
                details: format!("Failed to start GStreamer pipeline: {}", e),
            }
            .into());
        }

        info!("GStreamer pipeline started successfully");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if !self.is_running.swap(false, Ordering::SeqCst) {
            debug!("GStreamer camera capture is not running");
            return Ok(());
        }

        info!("Stopping GStreamer camera capture");
        self.pipeline
            .set_state(gstreamer::State::Null)
            .map_err(|e| CameraError::CaptureStream {
                details: format!("Failed to stop GStreamer pipeline: {}", e),
            })?;

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    fn frame_count(&self) -> u64 {
        self.frame_counter.load(Ordering::SeqCst)
    }
}
