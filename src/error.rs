use crate::card::LabelKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardcamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),

    #[error("Threshold error: {0}")]
    Threshold(#[from] ThresholdError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl CardcamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Failure of a single classifier invocation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassificationError {
    #[error("Malformed frame: {details}")]
    MalformedFrame { details: String },

    #[error("Classifier backend unavailable: {details}")]
    BackendUnavailable { details: String },

    #[error("Classification timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Inference failed: {details}")]
    Inference { details: String },
}

/// Failure while bringing up the camera or a classifier
#[derive(Error, Debug, Clone)]
pub enum SetupError {
    #[error("No classifier registered under '{name}'")]
    UnknownClassifier { name: String },

    #[error("Classifier '{name}' failed to load: {details}")]
    ClassifierLoad { name: String, details: String },

    #[error("Frame source unavailable: {details}")]
    FrameSource { details: String },
}

#[derive(Error, Debug, Clone)]
pub enum CameraError {
    #[error("Camera configuration error: {details}")]
    Configuration { details: String },

    #[error("Capture stream error: {details}")]
    CaptureStream { details: String },
}

#[derive(Error, Debug, Clone)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event channel closed")]
    ChannelClosed,
}

/// A classifier emitted a label outside the closed vocabulary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{label}' is not a valid {kind} label")]
pub struct InvalidLabel {
    pub label: String,
    pub kind: LabelKind,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThresholdError {
    #[error("{stage} threshold {value} is outside [0, 1]")]
    OutOfRange { stage: LabelKind, value: f32 },
}

pub type Result<T> = std::result::Result<T, CardcamError>;
