//! Local sentiment scoring.
//!
//! The local side of the hybrid: a lightweight model rates text on the
//! five-class ordinal scale, and [`LocalScorer`] collapses that to a
//! canonical label plus confidence. The model resource is initialized at
//! most once per process; if it cannot be constructed the scorer degrades
//! to a neutral baseline instead of failing the classification.

use super::label::{OrdinalRating, Sentiment};
use parking_lot::Mutex;
use std::sync::Arc;

/// Confidence reported when the lexicon finds no sentiment evidence at all.
const NO_EVIDENCE_CONFIDENCE: f64 = 0.3;

/// Confidence floor when at least one sentiment keyword matched.
const BASE_CONFIDENCE: f64 = 0.55;

/// Additional confidence earned as the keyword margin becomes unanimous.
const CONFIDENCE_SPAN: f64 = 0.4;

// ── Score types ──────────────────────────────────────────────────

/// Raw output of the underlying model: an ordinal class and the model's
/// own confidence for that class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrdinalScore {
    pub rating: OrdinalRating,
    pub confidence: f64,
}

/// A local classification: canonical label plus confidence in `[0, 1]`.
/// Produced fresh per call, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalScore {
    pub label: Sentiment,
    pub confidence: f64,
}

impl LocalScore {
    /// The degraded result used when no model is available: neutral with
    /// zero confidence, so the router always has something to fall back to.
    pub fn baseline() -> Self {
        Self {
            label: Sentiment::Neutral,
            confidence: 0.0,
        }
    }
}

// ── Model seam ───────────────────────────────────────────────────

/// The underlying local model. Implementations rate text on the ordinal
/// five-class scale; the scorer handles bucketing and degradation.
pub trait SentimentModel: Send + Sync {
    fn rate(&self, text: &str) -> anyhow::Result<OrdinalScore>;
}

/// Factory that constructs the model resource on first use.
pub type ModelFactory = Box<dyn Fn() -> anyhow::Result<Arc<dyn SentimentModel>> + Send + Sync>;

// ── Lexicon model ────────────────────────────────────────────────

/// Positive review keywords (Korean + English).
const POSITIVE_PATTERNS: &[&str] = &[
    "최고",
    "명작",
    "재밌",
    "재미있",
    "감동",
    "추천",
    "좋았",
    "좋아",
    "멋지",
    "훌륭",
    "excellent",
    "amazing",
    "wonderful",
    "masterpiece",
    "great",
    "loved",
    "love",
    "enjoyed",
    "brilliant",
];

/// Negative review keywords (Korean + English).
const NEGATIVE_PATTERNS: &[&str] = &[
    "최악",
    "지루",
    "별로",
    "실망",
    "쓰레기",
    "아깝",
    "노잼",
    "싫었",
    "terrible",
    "boring",
    "awful",
    "worst",
    "disappointing",
    "disappointed",
    "waste",
    "hated",
];

/// Deterministic keyword-based sentiment model.
///
/// Counts positive and negative keyword occurrences and maps the margin
/// between them onto the five-class scale. Deterministic by construction,
/// which keeps repeated classifications of the same text stable.
#[derive(Debug, Default)]
pub struct LexiconModel;

impl LexiconModel {
    pub fn new() -> Self {
        Self
    }

    fn count_hits(text: &str, patterns: &[&str]) -> usize {
        patterns.iter().map(|p| text.matches(p).count()).sum()
    }
}

impl SentimentModel for LexiconModel {
    fn rate(&self, text: &str) -> anyhow::Result<OrdinalScore> {
        let lower = text.to_lowercase();
        let pos = Self::count_hits(&lower, POSITIVE_PATTERNS) as i64;
        let neg = Self::count_hits(&lower, NEGATIVE_PATTERNS) as i64;
        let total = pos + neg;

        if total == 0 {
            return Ok(OrdinalScore {
                rating: OrdinalRating::Neutral,
                confidence: NO_EVIDENCE_CONFIDENCE,
            });
        }

        let margin = pos - neg;
        let rating = match margin {
            m if m >= 3 => OrdinalRating::VeryPositive,
            1..=2 => OrdinalRating::Positive,
            0 => OrdinalRating::Neutral,
            -2..=-1 => OrdinalRating::Negative,
            _ => OrdinalRating::VeryNegative,
        };

        let agreement = margin.unsigned_abs() as f64 / total as f64;
        Ok(OrdinalScore {
            rating,
            confidence: BASE_CONFIDENCE + CONFIDENCE_SPAN * agreement,
        })
    }
}

// ── Local scorer ─────────────────────────────────────────────────

/// State of the lazily-initialized model slot. A failed construction is
/// cached so a broken resource is not re-attempted on every call.
enum ModelSlot {
    Uninit,
    Ready(Arc<dyn SentimentModel>),
    Failed,
}

/// Process-lifetime wrapper around the local model.
///
/// The model is constructed on first use under a lock, so concurrent first
/// callers cannot double-initialize it. `score` never fails: with no usable
/// model it returns [`LocalScore::baseline`].
pub struct LocalScorer {
    factory: ModelFactory,
    slot: Mutex<ModelSlot>,
}

impl LocalScorer {
    pub fn new(factory: ModelFactory) -> Self {
        Self {
            factory,
            slot: Mutex::new(ModelSlot::Uninit),
        }
    }

    /// Scorer backed by the built-in lexicon model.
    pub fn with_lexicon() -> Self {
        Self::new(Box::new(|| Ok(Arc::new(LexiconModel::new()) as Arc<dyn SentimentModel>)))
    }

    fn model(&self) -> Option<Arc<dyn SentimentModel>> {
        let mut slot = self.slot.lock();
        match &*slot {
            ModelSlot::Ready(model) => Some(model.clone()),
            ModelSlot::Failed => None,
            ModelSlot::Uninit => match (self.factory)() {
                Ok(model) => {
                    tracing::info!("local sentiment model initialized");
                    *slot = ModelSlot::Ready(model.clone());
                    Some(model)
                }
                Err(e) => {
                    tracing::warn!("local sentiment model failed to initialize: {e:#}");
                    *slot = ModelSlot::Failed;
                    None
                }
            },
        }
    }

    /// Score text, collapsing the model's ordinal rating to a canonical
    /// label. Infallible: model init or rating failures degrade to the
    /// neutral baseline.
    pub fn score(&self, text: &str) -> LocalScore {
        let Some(model) = self.model() else {
            return LocalScore::baseline();
        };

        match model.rate(text) {
            Ok(score) => LocalScore {
                label: score.rating.bucket(),
                confidence: score.confidence.clamp(0.0, 1.0),
            },
            Err(e) => {
                tracing::warn!("local sentiment model rating failed: {e:#}");
                LocalScore::baseline()
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
