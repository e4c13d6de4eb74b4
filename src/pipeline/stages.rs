use super::stats::PipelineStats;
use crate::card::{CardLabel, CardResult, LabelKind, Rank, Suit};
use crate::classifier::{top_observation, Classifier};
use crate::error::{ClassificationError, InvalidLabel};
use crate::frame::FrameData;
use crate::thresholds::ConfidenceThresholds;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

/// Why a stage did not yield a label.
///
/// Only used for logging and counters; every variant means "no result" to
/// the consumer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageRejection {
    #[error("classifier not configured")]
    Unavailable,

    #[error("classification failed: {0}")]
    ClassificationFailed(ClassificationError),

    #[error("no observations")]
    NoObservations,

    #[error("{0}")]
    InvalidLabel(InvalidLabel),

    #[error("confidence {confidence:.3} below threshold {threshold:.3}")]
    LowConfidence { confidence: f32, threshold: f32 },
}

/// Suit-then-rank inference for a single frame.
///
/// The rank classifier only runs once the suit stage has passed, and always
/// sees the same frame the suit classifier saw.
pub struct StagedInferencePipeline {
    suit_classifier: Option<Arc<dyn Classifier>>,
    rank_classifier: Option<Arc<dyn Classifier>>,
    thresholds: Arc<ConfidenceThresholds>,
    stage_timeout: Duration,
    stats: Arc<PipelineStats>,
}

impl StagedInferencePipeline {
    pub fn new(
        suit_classifier: Option<Arc<dyn Classifier>>,
        rank_classifier: Option<Arc<dyn Classifier>>,
        thresholds: Arc<ConfidenceThresholds>,
        stage_timeout: Duration,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            suit_classifier,
            rank_classifier,
            thresholds,
            stage_timeout,
            stats,
        }
    }

    /// Pipeline with no classifiers; every frame resolves to no result
    pub fn unconfigured(
        thresholds: Arc<ConfidenceThresholds>,
        stage_timeout: Duration,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self::new(None, None, thresholds, stage_timeout, stats)
    }

    pub fn is_configured(&self) -> bool {
        self.suit_classifier.is_some() && self.rank_classifier.is_some()
    }

    /// Run both stages and produce the frame's outcome
    pub async fn process(&self, frame: &FrameData) -> Option<CardResult> {
        let suit = match self.suit_stage(frame).await {
            Ok(suit) => suit,
            Err(rejection) => {
                PipelineStats::bump(&self.stats.suit_rejections);
                debug!("Frame {} rejected at suit stage: {}", frame.id, rejection);
                return None;
            }
        };

        PipelineStats::bump(&self.stats.rank_invocations);
        let rank = match self.rank_stage(frame).await {
            Ok(rank) => rank,
            Err(rejection) => {
                PipelineStats::bump(&self.stats.rank_rejections);
                debug!(
                    "Frame {} rejected at rank stage (suit {}): {}",
                    frame.id, suit, rejection
                );
                return None;
            }
        };

        let card = CardResult::new(suit, rank);
        PipelineStats::bump(&self.stats.cards_recognized);
        debug!("Frame {} recognised as {}", frame.id, card);
        Some(card)
    }

    pub async fn suit_stage(&self, frame: &FrameData) -> Result<Suit, StageRejection> {
        self.run_stage(self.suit_classifier.as_ref(), frame).await
    }

    pub async fn rank_stage(&self, frame: &FrameData) -> Result<Rank, StageRejection> {
        self.run_stage(self.rank_classifier.as_ref(), frame).await
    }

    async fn run_stage<L: CardLabel>(
        &self,
        classifier: Option<&Arc<dyn Classifier>>,
        frame: &FrameData,
    ) -> Result<L, StageRejection> {
        let classifier = classifier.ok_or(StageRejection::Unavailable)?;

        if !frame.validate_size() {
            return Err(StageRejection::ClassificationFailed(
                ClassificationError::MalformedFrame {
                    details: format!(
                        "{} bytes for {}x{} {:?}",
                        frame.data.len(),
                        frame.width,
                        frame.height,
                        frame.format
                    ),
                },
            ));
        }

        let classified = tokio::time::timeout(self.stage_timeout, classifier.classify(frame)).await;
        let observations = match classified {
            Ok(result) => result.map_err(StageRejection::ClassificationFailed)?,
            Err(_) => {
                return Err(StageRejection::ClassificationFailed(ClassificationError::Timeout {
                    timeout_ms: self.stage_timeout.as_millis() as u64,
                }))
            }
        };

        let top = top_observation(&observations).ok_or(StageRejection::NoObservations)?;
        trace!(
            "{} stage top observation for frame {}: {} ({:.3})",
            L::KIND,
            frame.id,
            top.label,
            top.confidence
        );

        gate::<L>(&top.label, top.confidence, self.thresholds.get(L::KIND))
    }
}

/// Label and confidence checks; a stage passes only if both do
fn gate<L: CardLabel>(label: &str, confidence: f32, threshold: f32) -> Result<L, StageRejection> {
    let value = L::validate(label).map_err(StageRejection::InvalidLabel)?;

    if confidence < threshold {
        return Err(StageRejection::LowConfidence {
            confidence,
            threshold,
        });
    }

    Ok(value)
}

impl std::fmt::Debug for StagedInferencePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedInferencePipeline")
            .field("suit_classifier", &self.suit_classifier.as_ref().map(|c| c.name().to_string()))
            .field("rank_classifier", &self.rank_classifier.as_ref().map(|c| c.name().to_string()))
            .field("suit_threshold", &self.thresholds.get(LabelKind::Suit))
            .field("rank_threshold", &self.thresholds.get(LabelKind::Rank))
            .field("stage_timeout", &self.stage_timeout)
            .finish()
    }
}
