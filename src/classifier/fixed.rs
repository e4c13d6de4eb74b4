use super::{Classifier, Observation};
use crate::error::{ClassificationError, SetupError};
use crate::frame::FrameData;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::trace;

/// What a [`StaticClassifier`] answers with
#[derive(Debug, Clone)]
pub enum StaticResponse {
    Observations(Vec<Observation>),
    Fail(ClassificationError),
}

/// Classifier that answers every frame with a preset response.
///
/// Stands in for a model backend in dry runs and tests, and records which
/// frames it was asked about.
pub struct StaticClassifier {
    name: String,
    response: Mutex<StaticResponse>,
    latency: Option<Duration>,
    prepare_failure: Option<String>,
    calls: AtomicUsize,
    seen_frames: Mutex<Vec<u64>>,
}

impl StaticClassifier {
    pub fn new<S: Into<String>>(name: S, observations: Vec<Observation>) -> Self {
        Self::with_response(name, StaticResponse::Observations(observations))
    }

    pub fn failing<S: Into<String>>(name: S, error: ClassificationError) -> Self {
        Self::with_response(name, StaticResponse::Fail(error))
    }

    pub fn with_response<S: Into<String>>(name: S, response: StaticResponse) -> Self {
        Self {
            name: name.into(),
            response: Mutex::new(response),
            latency: None,
            prepare_failure: None,
            calls: AtomicUsize::new(0),
            seen_frames: Mutex::new(Vec::new()),
        }
    }

    /// Simulated inference time per call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make setup-time preparation fail with the given reason
    pub fn with_prepare_failure<S: Into<String>>(mut self, details: S) -> Self {
        self.prepare_failure = Some(details.into());
        self
    }

    pub fn set_response(&self, response: StaticResponse) {
        *self.response.lock() = response;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Ids of the frames classified so far, in call order
    pub fn seen_frames(&self) -> Vec<u64> {
        self.seen_frames.lock().clone()
    }
}

#[async_trait]
impl Classifier for StaticClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn prepare(&self) -> Result<(), SetupError> {
        match &self.prepare_failure {
            Some(details) => Err(SetupError::ClassifierLoad {
                name: self.name.clone(),
                details: details.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn classify(&self, frame: &FrameData) -> Result<Vec<Observation>, ClassificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_frames.lock().push(frame.id);
        trace!("Classifier '{}' invoked for frame {}", self.name, frame.id);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let response = self.response.lock().clone();
        match response {
            StaticResponse::Observations(observations) => Ok(observations),
            StaticResponse::Fail(error) => Err(error),
        }
    }
}
