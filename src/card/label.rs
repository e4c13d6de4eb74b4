use super::{Rank, Suit};
use crate::error::InvalidLabel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which closed vocabulary a raw classifier label is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelKind {
    Suit,
    Rank,
}

impl fmt::Display for LabelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelKind::Suit => f.write_str("suit"),
            LabelKind::Rank => f.write_str("rank"),
        }
    }
}

/// A member of one of the closed label vocabularies
pub trait CardLabel: Sized + Copy + FromStr + Into<&'static str> {
    const KIND: LabelKind;

    /// Canonical label, identical to what the classifier emits
    fn label(self) -> &'static str {
        self.into()
    }

    /// Map a raw classifier label onto the vocabulary.
    ///
    /// Matching is exact: no case folding or whitespace trimming.
    fn validate(raw: &str) -> Result<Self, InvalidLabel> {
        raw.parse::<Self>().map_err(|_| InvalidLabel {
            label: raw.to_string(),
            kind: Self::KIND,
        })
    }
}

impl CardLabel for Suit {
    const KIND: LabelKind = LabelKind::Suit;
}

impl CardLabel for Rank {
    const KIND: LabelKind = LabelKind::Rank;
}

/// Result of validating against a vocabulary chosen at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatedLabel {
    Suit(Suit),
    Rank(Rank),
}

pub fn validate(raw: &str, kind: LabelKind) -> Result<ValidatedLabel, InvalidLabel> {
    match kind {
        LabelKind::Suit => Suit::validate(raw).map(ValidatedLabel::Suit),
        LabelKind::Rank => Rank::validate(raw).map(ValidatedLabel::Rank),
    }
}
