//! Sentiment routing engine.
//!
//! Scores review text locally first, then decides whether to escalate to
//! the remote arbiter: low local confidence escalates, and so does a
//! negative local verdict, because a wrongly negative label is judged
//! costlier than a wrongly neutral one. The arbiter's answer supersedes
//! the local one; any arbiter failure falls back to the local label.
//! `classify` is infallible by contract.

use super::arbiter::{Arbiter, RemoteArbiter};
use super::label::Sentiment;
use super::scorer::{LocalScore, LocalScorer};
use crate::config::{ArbiterMode, Config};
use std::sync::Arc;

/// Local confidence below which the arbiter is consulted.
pub const DEFAULT_ESCALATION_THRESHOLD: f64 = 0.8;

// ── Classification result ────────────────────────────────────────

/// Which side of the hybrid produced the final label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSource {
    /// Local score was trusted outright (or no arbiter is configured).
    Local,
    /// The arbiter answered and its label superseded the local one.
    Arbiter,
    /// Escalation was attempted but the arbiter failed; local label kept.
    LocalFallback,
}

impl LabelSource {
    pub fn describe(self) -> &'static str {
        match self {
            LabelSource::Local => "local scorer",
            LabelSource::Arbiter => "remote arbiter",
            LabelSource::LocalFallback => "local scorer (arbiter unavailable)",
        }
    }
}

/// Full result of one routing decision.
#[derive(Debug, Clone, Copy)]
pub struct Classification {
    /// The canonical label returned to the caller.
    pub label: Sentiment,
    /// Who decided.
    pub source: LabelSource,
    /// Whether the arbiter was actually invoked.
    pub escalated: bool,
    /// The local score the decision started from.
    pub local: LocalScore,
}

// ── Router ───────────────────────────────────────────────────────

/// The hybrid sentiment router.
///
/// Operating mode is fixed at construction: with an arbiter the router runs
/// hybrid, without one it is local-only and never attempts escalation.
pub struct SentimentRouter {
    scorer: LocalScorer,
    arbiter: Option<Arc<dyn Arbiter>>,
    escalation_threshold: f64,
    double_check_negative: bool,
}

impl SentimentRouter {
    pub fn new(
        scorer: LocalScorer,
        arbiter: Option<Arc<dyn Arbiter>>,
        escalation_threshold: f64,
        double_check_negative: bool,
    ) -> Self {
        Self {
            scorer,
            arbiter,
            escalation_threshold,
            double_check_negative,
        }
    }

    /// Local-only router with default policy settings.
    pub fn local_only(scorer: LocalScorer) -> Self {
        Self::new(scorer, None, DEFAULT_ESCALATION_THRESHOLD, true)
    }

    /// Build the router from config: lexicon-backed local scorer, and a
    /// remote arbiter when the configured mode provides a credential.
    pub fn from_config(config: &Config) -> Self {
        let arbiter: Option<Arc<dyn Arbiter>> = match config.arbiter_mode() {
            ArbiterMode::LocalOnly => {
                tracing::info!("no arbiter credential configured; running local-only");
                None
            }
            ArbiterMode::Hybrid { api_key } => Some(Arc::new(RemoteArbiter::new(
                &config.arbiter.api_base,
                api_key,
                &config.arbiter.model,
                config.arbiter.max_output_tokens,
                config.arbiter.timeout_secs,
            ))),
        };

        Self::new(
            LocalScorer::with_lexicon(),
            arbiter,
            config.sentiment.escalation_threshold,
            config.sentiment.double_check_negative,
        )
    }

    /// Whether the router is running in hybrid mode.
    pub fn is_hybrid(&self) -> bool {
        self.arbiter.is_some()
    }

    fn should_escalate(&self, local: &LocalScore) -> bool {
        local.confidence < self.escalation_threshold
            || (self.double_check_negative && local.label == Sentiment::Negative)
    }

    /// Classify review text. Always returns a canonical label.
    pub async fn classify(&self, text: &str) -> Sentiment {
        self.classify_detailed(text).await.label
    }

    /// Classify review text, reporting which side decided.
    pub async fn classify_detailed(&self, text: &str) -> Classification {
        let local = self.scorer.score(text);

        let arbiter = match &self.arbiter {
            Some(arbiter) if self.should_escalate(&local) => arbiter,
            _ => {
                return Classification {
                    label: local.label,
                    source: LabelSource::Local,
                    escalated: false,
                    local,
                };
            }
        };

        match arbiter.arbitrate(text).await {
            Ok(label) => {
                tracing::debug!(
                    local_label = local.label.id(),
                    confidence = local.confidence,
                    arbiter_label = label.id(),
                    "arbiter label supersedes local score"
                );
                Classification {
                    label,
                    source: LabelSource::Arbiter,
                    escalated: true,
                    local,
                }
            }
            Err(e) => {
                tracing::warn!(
                    local_label = local.label.id(),
                    confidence = local.confidence,
                    "arbiter failed, keeping local label: {e}"
                );
                Classification {
                    label: local.label,
                    source: LabelSource::LocalFallback,
                    escalated: true,
                    local,
                }
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
