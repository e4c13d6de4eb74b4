//! Classifier service seam.
//!
//! A classifier turns one frame into a list of labelled confidences for a
//! single concern (suit or rank). How it does so is its own business.

mod registry;
mod fixed;

pub use fixed::{StaticClassifier, StaticResponse};
pub use registry::ClassifierRegistry;

use crate::error::{ClassificationError, SetupError};
use crate::frame::FrameData;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One labelled confidence from a classifier invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub label: String,
    /// Confidence in `[0, 1]`
    pub confidence: f32,
}

impl Observation {
    pub fn new<S: Into<String>>(label: S, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Identifier the classifier was registered under
    fn name(&self) -> &str;

    /// One-time warm-up run during pipeline setup
    async fn prepare(&self) -> Result<(), SetupError> {
        Ok(())
    }

    /// Classify a frame. Implementations may run on their own threads or
    /// accelerators; the caller awaits the result.
    async fn classify(&self, frame: &FrameData) -> Result<Vec<Observation>, ClassificationError>;
}

/// Highest-confidence observation.
///
/// Input order is not trusted. On equal confidence the earliest entry wins,
/// and a NaN confidence never wins.
pub fn top_observation(observations: &[Observation]) -> Option<&Observation> {
    let mut best: Option<&Observation> = None;

    for observation in observations {
        if observation.confidence.is_nan() {
            continue;
        }
        match best {
            Some(current) if observation.confidence <= current.confidence => {}
            _ => best = Some(observation),
        }
    }

    best
}
