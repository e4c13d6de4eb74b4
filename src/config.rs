use crate::frame::Orientation;
use crate::thresholds::{DEFAULT_RANK_THRESHOLD, DEFAULT_SUIT_THRESHOLD};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CardcamConfig {
    pub camera: CameraConfig,
    pub classifier: ClassifierConfig,
    pub pipeline: PipelineConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Camera device index (e.g., 0 for /dev/video0)
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Camera resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Frames per second
    #[serde(default = "default_camera_fps")]
    pub fps: u32,

    /// Orientation reported with every frame
    #[serde(default)]
    pub orientation: Orientation,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Registered name of the suit classifier
    #[serde(default = "default_suit_model")]
    pub suit_model: String,

    /// Registered name of the rank classifier
    #[serde(default = "default_rank_model")]
    pub rank_model: String,

    /// Minimum suit confidence
    #[serde(default = "default_suit_threshold")]
    pub suit_threshold: f32,

    /// Minimum rank confidence
    #[serde(default = "default_rank_threshold")]
    pub rank_threshold: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Frames allowed to wait for the worker; later arrivals are dropped
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// Upper bound on a single classifier call
    #[serde(default = "default_stage_timeout_ms")]
    pub stage_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl CardcamConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.index", default_camera_index())?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("camera.orientation", "up")?
            .set_default("classifier.suit_model", default_suit_model())?
            .set_default("classifier.rank_model", default_rank_model())?
            .set_default("classifier.suit_threshold", default_suit_threshold() as f64)?
            .set_default("classifier.rank_threshold", default_rank_threshold() as f64)?
            .set_default("pipeline.queue_depth", default_queue_depth() as i64)?
            .set_default("pipeline.stage_timeout_ms", default_stage_timeout_ms())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // CARDCAM_CLASSIFIER__SUIT_THRESHOLD=0.9
            .add_source(
                Environment::with_prefix("CARDCAM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: CardcamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        for (name, value) in [
            ("suit_threshold", self.classifier.suit_threshold),
            ("rank_threshold", self.classifier.rank_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Message(format!(
                    "Classifier {} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.classifier.suit_model.trim().is_empty()
            || self.classifier.rank_model.trim().is_empty()
        {
            return Err(ConfigError::Message(
                "Classifier model names must not be empty".to_string(),
            ));
        }

        if self.pipeline.queue_depth == 0 {
            return Err(ConfigError::Message(
                "Pipeline queue_depth must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.stage_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Pipeline stage_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for CardcamConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                index: default_camera_index(),
                resolution: default_camera_resolution(),
                fps: default_camera_fps(),
                orientation: Orientation::default(),
            },
            classifier: ClassifierConfig {
                suit_model: default_suit_model(),
                rank_model: default_rank_model(),
                suit_threshold: default_suit_threshold(),
                rank_threshold: default_rank_threshold(),
            },
            pipeline: PipelineConfig {
                queue_depth: default_queue_depth(),
                stage_timeout_ms: default_stage_timeout_ms(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
            },
        }
    }
}

// Default value functions
fn default_camera_index() -> u32 {
    0
}
fn default_camera_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_camera_fps() -> u32 {
    30
}

fn default_suit_model() -> String {
    "suit classifier".to_string()
}
fn default_rank_model() -> String {
    "rank classifier".to_string()
}
fn default_suit_threshold() -> f32 {
    DEFAULT_SUIT_THRESHOLD
}
fn default_rank_threshold() -> f32 {
    DEFAULT_RANK_THRESHOLD
}

fn default_queue_depth() -> usize {
    1
}
fn default_stage_timeout_ms() -> u64 {
    2000
}

fn default_event_bus_capacity() -> usize {
    100
}
