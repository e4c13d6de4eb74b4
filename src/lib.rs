pub mod app;
pub mod camera;
pub mod card;
pub mod classifier;
pub mod config;
pub mod error;
pub mod events;
pub mod frame;
pub mod pipeline;
pub mod thresholds;

pub use app::{CardcamOrchestrator, ComponentState, ShutdownReason, ShutdownTrigger};
pub use camera::{FrameSource, FrameSourceBuilder, SyntheticCamera};
pub use card::{validate, CardLabel, CardResult, LabelKind, Rank, Suit, ValidatedLabel};
pub use classifier::{
    top_observation, Classifier, ClassifierRegistry, Observation, StaticClassifier, StaticResponse,
};
pub use config::CardcamConfig;
pub use error::{CardcamError, ClassificationError, InvalidLabel, Result, SetupError};
pub use events::{CardcamEvent, EventBus, EventFilter, EventReceiver};
pub use frame::{FrameData, FrameFormat, FrameHandler, FrameRef, Orientation};
pub use pipeline::{
    ClassifierSelection, PipelineHandle, PipelineStatsSnapshot, PipelineWorker, ResultSink,
    SetupReport, StageRejection, StagedInferencePipeline,
};
pub use thresholds::ConfidenceThresholds;
