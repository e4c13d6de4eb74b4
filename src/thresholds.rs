use crate::card::LabelKind;
use crate::error::ThresholdError;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::info;

pub const DEFAULT_SUIT_THRESHOLD: f32 = 0.99;
pub const DEFAULT_RANK_THRESHOLD: f32 = 0.95;

/// Per-stage minimum confidence, shared between the pipeline worker and
/// whoever tunes it.
///
/// Each value is stored as the bit pattern of an `f32`, so reads and writes
/// are single atomic operations. The two thresholds are independent; a change
/// lands on the next gate check that reads it.
#[derive(Debug)]
pub struct ConfidenceThresholds {
    suit: AtomicU32,
    rank: AtomicU32,
}

impl ConfidenceThresholds {
    pub fn new(suit: f32, rank: f32) -> Result<Self, ThresholdError> {
        check_range(LabelKind::Suit, suit)?;
        check_range(LabelKind::Rank, rank)?;

        Ok(Self {
            suit: AtomicU32::new(suit.to_bits()),
            rank: AtomicU32::new(rank.to_bits()),
        })
    }

    pub fn suit(&self) -> f32 {
        f32::from_bits(self.suit.load(Ordering::Acquire))
    }

    pub fn rank(&self) -> f32 {
        f32::from_bits(self.rank.load(Ordering::Acquire))
    }

    pub fn get(&self, stage: LabelKind) -> f32 {
        match stage {
            LabelKind::Suit => self.suit(),
            LabelKind::Rank => self.rank(),
        }
    }

    pub fn set_suit(&self, value: f32) -> Result<(), ThresholdError> {
        self.set(LabelKind::Suit, value)
    }

    pub fn set_rank(&self, value: f32) -> Result<(), ThresholdError> {
        self.set(LabelKind::Rank, value)
    }

    pub fn set(&self, stage: LabelKind, value: f32) -> Result<(), ThresholdError> {
        check_range(stage, value)?;

        let slot = match stage {
            LabelKind::Suit => &self.suit,
            LabelKind::Rank => &self.rank,
        };
        slot.store(value.to_bits(), Ordering::Release);

        info!("{} confidence threshold set to {:.3}", stage, value);
        Ok(())
    }
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            suit: AtomicU32::new(DEFAULT_SUIT_THRESHOLD.to_bits()),
            rank: AtomicU32::new(DEFAULT_RANK_THRESHOLD.to_bits()),
        }
    }
}

fn check_range(stage: LabelKind, value: f32) -> Result<(), ThresholdError> {
    // NaN fails both comparisons
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ThresholdError::OutOfRange { stage, value })
    }
}
