//! Static emotion → funnel stage table.
//!
//! The classifier emits one of the 28 `GoEmotions` labels. Each label maps to
//! exactly one [`FunnelStage`]; anything outside the vocabulary falls back to
//! [`FunnelStage::Awareness`], so [`funnel_stage_for`] is total.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Ordered stages of the marketing funnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FunnelStage {
    Awareness,
    Consideration,
    Conversion,
    Loyalty,
    Advocacy,
}

impl FunnelStage {
    /// All stages in funnel order.
    pub const ALL: [FunnelStage; 5] = [
        FunnelStage::Awareness,
        FunnelStage::Consideration,
        FunnelStage::Conversion,
        FunnelStage::Loyalty,
        FunnelStage::Advocacy,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FunnelStage::Awareness => "Awareness",
            FunnelStage::Consideration => "Consideration",
            FunnelStage::Conversion => "Conversion",
            FunnelStage::Loyalty => "Loyalty",
            FunnelStage::Advocacy => "Advocacy",
        }
    }

    /// Zero-based position in the funnel.
    #[must_use]
    pub fn position(self) -> usize {
        self as usize
    }

    /// The stage that follows this one, `None` for Advocacy.
    #[must_use]
    pub fn next(self) -> Option<FunnelStage> {
        Self::ALL.get(self.position() + 1).copied()
    }
}

impl fmt::Display for FunnelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FunnelStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("unknown funnel stage: {s}"))
    }
}

/// The `GoEmotions` label vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmotionLabel {
    Admiration,
    Amusement,
    Anger,
    Annoyance,
    Approval,
    Caring,
    Confusion,
    Curiosity,
    Desire,
    Disappointment,
    Disapproval,
    Disgust,
    Embarrassment,
    Excitement,
    Fear,
    Gratitude,
    Grief,
    Joy,
    Love,
    Nervousness,
    Optimism,
    Pride,
    Realization,
    Relief,
    Remorse,
    Sadness,
    Surprise,
    Neutral,
}

impl EmotionLabel {
    pub const ALL: [EmotionLabel; 28] = [
        EmotionLabel::Admiration,
        EmotionLabel::Amusement,
        EmotionLabel::Anger,
        EmotionLabel::Annoyance,
        EmotionLabel::Approval,
        EmotionLabel::Caring,
        EmotionLabel::Confusion,
        EmotionLabel::Curiosity,
        EmotionLabel::Desire,
        EmotionLabel::Disappointment,
        EmotionLabel::Disapproval,
        EmotionLabel::Disgust,
        EmotionLabel::Embarrassment,
        EmotionLabel::Excitement,
        EmotionLabel::Fear,
        EmotionLabel::Gratitude,
        EmotionLabel::Grief,
        EmotionLabel::Joy,
        EmotionLabel::Love,
        EmotionLabel::Nervousness,
        EmotionLabel::Optimism,
        EmotionLabel::Pride,
        EmotionLabel::Realization,
        EmotionLabel::Relief,
        EmotionLabel::Remorse,
        EmotionLabel::Sadness,
        EmotionLabel::Surprise,
        EmotionLabel::Neutral,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EmotionLabel::Admiration => "admiration",
            EmotionLabel::Amusement => "amusement",
            EmotionLabel::Anger => "anger",
            EmotionLabel::Annoyance => "annoyance",
            EmotionLabel::Approval => "approval",
            EmotionLabel::Caring => "caring",
            EmotionLabel::Confusion => "confusion",
            EmotionLabel::Curiosity => "curiosity",
            EmotionLabel::Desire => "desire",
            EmotionLabel::Disappointment => "disappointment",
            EmotionLabel::Disapproval => "disapproval",
            EmotionLabel::Disgust => "disgust",
            EmotionLabel::Embarrassment => "embarrassment",
            EmotionLabel::Excitement => "excitement",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Gratitude => "gratitude",
            EmotionLabel::Grief => "grief",
            EmotionLabel::Joy => "joy",
            EmotionLabel::Love => "love",
            EmotionLabel::Nervousness => "nervousness",
            EmotionLabel::Optimism => "optimism",
            EmotionLabel::Pride => "pride",
            EmotionLabel::Realization => "realization",
            EmotionLabel::Relief => "relief",
            EmotionLabel::Remorse => "remorse",
            EmotionLabel::Sadness => "sadness",
            EmotionLabel::Surprise => "surprise",
            EmotionLabel::Neutral => "neutral",
        }
    }

    /// Parse a model label, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn parse(label: &str) -> Option<EmotionLabel> {
        let needle = label.trim();
        Self::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(needle))
    }

    #[must_use]
    pub fn is_neutral(self) -> bool {
        self == EmotionLabel::Neutral
    }

    #[must_use]
    pub fn stage(self) -> FunnelStage {
        use EmotionLabel as E;
        match self {
            E::Neutral | E::Curiosity | E::Surprise | E::Realization | E::Confusion => {
                FunnelStage::Awareness
            }
            E::Desire
            | E::Optimism
            | E::Excitement
            | E::Caring
            | E::Nervousness
            | E::Fear
            | E::Disapproval
            | E::Disappointment
            | E::Annoyance
            | E::Anger
            | E::Disgust
            | E::Sadness
            | E::Grief
            | E::Embarrassment
            | E::Remorse => FunnelStage::Consideration,
            E::Approval | E::Relief | E::Amusement => FunnelStage::Conversion,
            E::Admiration | E::Pride => FunnelStage::Loyalty,
            E::Joy | E::Love | E::Gratitude => FunnelStage::Advocacy,
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a raw classifier label to its funnel stage.
///
/// Unknown labels land in [`FunnelStage::Awareness`].
#[must_use]
pub fn funnel_stage_for(label: &str) -> FunnelStage {
    EmotionLabel::parse(label).map_or(FunnelStage::Awareness, EmotionLabel::stage)
}

/// `true` when `label` is the neutral category.
#[must_use]
pub fn is_neutral_label(label: &str) -> bool {
    EmotionLabel::parse(label).is_some_and(EmotionLabel::is_neutral)
}
