use super::sink::ResultSink;
use super::stages::StagedInferencePipeline;
use super::stats::{PipelineStats, PipelineStatsSnapshot};
use crate::classifier::{Classifier, ClassifierRegistry};
use crate::config::PipelineConfig;
use crate::error::{CardcamError, Result, SetupError};
use crate::frame::{FrameData, FrameHandler, FrameRef};
use crate::thresholds::ConfidenceThresholds;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Slack on top of the worst-case frame when joining the worker
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Names of the two classifiers to resolve at setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierSelection {
    pub suit: String,
    pub rank: String,
}

/// Outcome of pipeline setup
#[derive(Debug, Clone, Default)]
pub struct SetupReport {
    pub suit_ready: bool,
    pub rank_ready: bool,
    pub failures: Vec<SetupError>,
}

impl SetupReport {
    pub fn is_ready(&self) -> bool {
        self.suit_ready && self.rank_ready
    }
}

enum ControlCommand {
    Setup {
        registry: ClassifierRegistry,
        selection: ClassifierSelection,
        reply: oneshot::Sender<SetupReport>,
    },
}

/// Producer side of the frame queue. Cheap to clone.
#[derive(Clone)]
pub struct PipelineHandle {
    frame_tx: mpsc::Sender<FrameData>,
    stats: Arc<PipelineStats>,
}

impl PipelineHandle {
    /// Hand a frame to the pipeline.
    ///
    /// The borrowed bytes are copied before this returns, and only when the
    /// queue has room; a full queue drops the frame. Returns whether the
    /// frame was accepted.
    pub fn submit(&self, frame: FrameRef<'_>) -> bool {
        match self.frame_tx.try_reserve() {
            Ok(permit) => {
                permit.send(frame.snapshot());
                PipelineStats::bump(&self.stats.frames_submitted);
                true
            }
            Err(TrySendError::Full(())) => {
                PipelineStats::bump(&self.stats.frames_dropped);
                trace!("Pipeline busy, dropping frame {}", frame.id);
                false
            }
            Err(TrySendError::Closed(())) => {
                debug!("Pipeline worker gone, discarding frame {}", frame.id);
                false
            }
        }
    }

    /// Callback suitable for a frame source
    pub fn frame_handler(&self) -> FrameHandler {
        let handle = self.clone();
        Arc::new(move |frame: FrameRef<'_>| {
            handle.submit(frame);
        })
    }
}

/// Serial worker running setup, both inference stages and result delivery.
///
/// Everything that touches pipeline state happens on one tokio task, one
/// frame at a time, in arrival order.
pub struct PipelineWorker {
    control_tx: mpsc::Sender<ControlCommand>,
    handle: PipelineHandle,
    sink: Arc<ResultSink>,
    stats: Arc<PipelineStats>,
    cancellation: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    join_timeout: Duration,
}

impl PipelineWorker {
    /// Spawn the worker task on the current runtime
    pub fn spawn(config: &PipelineConfig, thresholds: Arc<ConfidenceThresholds>) -> Self {
        let (control_tx, control_rx) = mpsc::channel(4);
        let (frame_tx, frame_rx) = mpsc::channel(config.queue_depth.max(1));
        let sink = Arc::new(ResultSink::new());
        let stats = Arc::new(PipelineStats::new());
        let cancellation = CancellationToken::new();
        let stage_timeout = Duration::from_millis(config.stage_timeout_ms);

        let context = WorkerContext {
            thresholds,
            stage_timeout,
            stats: Arc::clone(&stats),
            sink: Arc::clone(&sink),
        };

        info!(
            "Spawning pipeline worker (queue depth {}, stage timeout {}ms)",
            config.queue_depth, config.stage_timeout_ms
        );
        let task = tokio::spawn(run_worker(context, control_rx, frame_rx, cancellation.clone()));

        Self {
            control_tx,
            handle: PipelineHandle {
                frame_tx,
                stats: Arc::clone(&stats),
            },
            sink,
            stats,
            cancellation,
            task: Mutex::new(Some(task)),
            // A frame in flight may still run both stages to their timeout
            join_timeout: stage_timeout * 2 + SHUTDOWN_GRACE,
        }
    }

    pub fn handle(&self) -> PipelineHandle {
        self.handle.clone()
    }

    pub fn sink(&self) -> Arc<ResultSink> {
        Arc::clone(&self.sink)
    }

    pub fn stats(&self) -> PipelineStatsSnapshot {
        self.stats.snapshot()
    }

    /// Resolve and prepare both classifiers on the worker.
    ///
    /// Classifier failures are not errors here: they are reported, and the
    /// affected stage yields no result for every frame.
    pub async fn setup(
        &self,
        registry: ClassifierRegistry,
        selection: ClassifierSelection,
    ) -> Result<SetupReport> {
        let (reply, response) = oneshot::channel();

        self.control_tx
            .send(ControlCommand::Setup {
                registry,
                selection,
                reply,
            })
            .await
            .map_err(|_| CardcamError::component("pipeline", "Worker is not running"))?;

        response
            .await
            .map_err(|_| CardcamError::component("pipeline", "Worker dropped setup request"))
    }

    pub fn is_running(&self) -> bool {
        !self.cancellation.is_cancelled()
    }

    /// Stop the worker after the frame in flight, if any.
    ///
    /// Frames still queued are answered with no result.
    pub async fn shutdown(&self) -> Result<()> {
        if self.cancellation.is_cancelled() {
            debug!("Pipeline worker already stopped");
            return Ok(());
        }

        info!("Stopping pipeline worker");
        self.cancellation.cancel();

        if let Some(task) = self.task.lock().await.take() {
            match tokio::time::timeout(self.join_timeout, task).await {
                Ok(Ok(())) => info!("Pipeline worker stopped"),
                Ok(Err(e)) => {
                    error!("Pipeline worker task failed: {}", e);
                    return Err(CardcamError::component("pipeline".to_string(), e.to_string()));
                }
                Err(_) => {
                    warn!(
                        "Pipeline worker did not stop within {}ms",
                        self.join_timeout.as_millis()
                    );
                    return Err(CardcamError::component("pipeline", "Worker stop timeout"));
                }
            }
        }

        Ok(())
    }
}

impl Drop for PipelineWorker {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

struct WorkerContext {
    thresholds: Arc<ConfidenceThresholds>,
    stage_timeout: Duration,
    stats: Arc<PipelineStats>,
    sink: Arc<ResultSink>,
}

async fn run_worker(
    context: WorkerContext,
    mut control_rx: mpsc::Receiver<ControlCommand>,
    mut frame_rx: mpsc::Receiver<FrameData>,
    cancellation: CancellationToken,
) {
    info!("Pipeline worker started");

    let mut pipeline = StagedInferencePipeline::unconfigured(
        Arc::clone(&context.thresholds),
        context.stage_timeout,
        Arc::clone(&context.stats),
    );

    loop {
        tokio::select! {
            biased;
            _ = cancellation.cancelled() => break,
            command = control_rx.recv() => match command {
                Some(ControlCommand::Setup { registry, selection, reply }) => {
                    let (next, report) = configure(&context, &registry, &selection).await;
                    pipeline = next;
                    if reply.send(report).is_err() {
                        debug!("Setup requester went away before the report was sent");
                    }
                }
                None => break,
            },
            frame = frame_rx.recv() => match frame {
                Some(frame) => {
                    let outcome = pipeline.process(&frame).await;
                    PipelineStats::bump(&context.stats.frames_processed);
                    context.sink.deliver(outcome);
                }
                None => break,
            },
        }
    }

    // Every accepted frame gets an answer
    frame_rx.close();
    let mut drained = 0usize;
    while let Ok(frame) = frame_rx.try_recv() {
        trace!("Answering queued frame {} with no result", frame.id);
        PipelineStats::bump(&context.stats.frames_processed);
        context.sink.deliver(None);
        drained += 1;
    }
    if drained > 0 {
        debug!("Answered {} queued frames during shutdown", drained);
    }

    info!("Pipeline worker ended");
}

async fn configure(
    context: &WorkerContext,
    registry: &ClassifierRegistry,
    selection: &ClassifierSelection,
) -> (StagedInferencePipeline, SetupReport) {
    info!(
        "Setting up pipeline with suit classifier '{}' and rank classifier '{}'",
        selection.suit, selection.rank
    );

    let mut failures = Vec::new();
    let suit = load_classifier(registry, &selection.suit, &mut failures).await;
    let rank = load_classifier(registry, &selection.rank, &mut failures).await;

    let report = SetupReport {
        suit_ready: suit.is_some(),
        rank_ready: rank.is_some(),
        failures,
    };

    if report.is_ready() {
        info!("Pipeline setup complete");
    } else {
        warn!("Pipeline setup incomplete; frames will yield no result");
    }

    let pipeline = StagedInferencePipeline::new(
        suit,
        rank,
        Arc::clone(&context.thresholds),
        context.stage_timeout,
        Arc::clone(&context.stats),
    );

    (pipeline, report)
}

async fn load_classifier(
    registry: &ClassifierRegistry,
    name: &str,
    failures: &mut Vec<SetupError>,
) -> Option<Arc<dyn Classifier>> {
    let classifier = match registry.resolve(name) {
        Ok(classifier) => classifier,
        Err(e) => {
            error!("Classifier setup failed: {}", e);
            failures.push(e);
            return None;
        }
    };

    match classifier.prepare().await {
        Ok(()) => {
            debug!("Classifier '{}' ready", name);
            Some(classifier)
        }
        Err(e) => {
            error!("Classifier setup failed: {}", e);
            failures.push(e);
            None
        }
    }
}
