//! Hybrid sentiment analysis for review text.
//!
//! A review's text is scored locally first; when the local score is not
//! trustworthy enough (low confidence, or a negative verdict that deserves a
//! second opinion) the text is escalated to a remote LLM arbiter. The arbiter
//! is optional: without a credential the router runs in local-only mode.
//!
//! ## Design
//! - [`LocalScorer`] wraps the local model behind a lazily-initialized,
//!   process-lifetime slot and never fails: a broken model degrades to a
//!   neutral baseline score.
//! - [`RemoteArbiter`] issues one bounded request per escalation and maps
//!   every failure to an internal sentinel instead of propagating it.
//! - [`SentimentRouter`] owns the escalation policy and always returns one of
//!   the three canonical labels.

pub mod arbiter;
pub mod label;
pub mod router;
pub mod scorer;

pub use arbiter::{Arbiter, ArbiterError, KeyStatus, RemoteArbiter};
pub use label::{OrdinalRating, Sentiment};
pub use router::{Classification, LabelSource, SentimentRouter};
pub use scorer::{LexiconModel, LocalScore, LocalScorer, OrdinalScore, SentimentModel};
