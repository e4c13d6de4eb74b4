mod sink;
mod stages;
mod stats;
mod worker;
#[cfg(test)]
mod tests;

pub use sink::{ResultHandler, ResultSink};
pub use stages::{StageRejection, StagedInferencePipeline};
pub use stats::{PipelineStats, PipelineStatsSnapshot};
pub use worker::{ClassifierSelection, PipelineHandle, PipelineWorker, SetupReport};
