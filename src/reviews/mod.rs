//! Review create/update flow.
//!
//! The only place the sentiment router is invoked: a review gets its label
//! when it is created, and gets a fresh one only when its text content
//! actually changes. Edits to author or rating never touch the router, and
//! an unchanged content field on an edit keeps the stored label as-is.

use crate::sentiment::SentimentRouter;
use crate::store::{Review, ReviewStore};
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;

/// Fields for a new review.
#[derive(Debug, Clone)]
pub struct ReviewDraft {
    pub author: String,
    pub content: String,
    pub rating: f64,
}

/// Partial edit of an existing review. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ReviewPatch {
    pub author: Option<String>,
    pub content: Option<String>,
    pub rating: Option<f64>,
}

/// Orchestrates the catalog store and the sentiment router.
pub struct ReviewService {
    store: Arc<ReviewStore>,
    router: Arc<SentimentRouter>,
}

impl ReviewService {
    pub fn new(store: Arc<ReviewStore>, router: Arc<SentimentRouter>) -> Self {
        Self { store, router }
    }

    /// Create a review, classifying its content first.
    pub async fn create_review(&self, movie_id: i64, draft: ReviewDraft) -> Result<Review> {
        self.store
            .get_movie(movie_id)?
            .with_context(|| format!("movie {movie_id} not found"))?;

        let sentiment = self.router.classify(&draft.content).await;
        let review = self.store.insert_review(
            movie_id,
            &draft.author,
            &draft.content,
            draft.rating,
            sentiment,
            Utc::now(),
        )?;

        tracing::info!(
            review_id = review.id,
            movie_id,
            sentiment = sentiment.id(),
            "review created"
        );
        Ok(review)
    }

    /// Apply an edit. The label is recomputed only when the patch changes
    /// the review's content; otherwise the stored label is carried over.
    pub async fn update_review(&self, review_id: i64, patch: ReviewPatch) -> Result<Review> {
        let mut review = self
            .store
            .get_review(review_id)?
            .with_context(|| format!("review {review_id} not found"))?;

        let content_changed = patch
            .content
            .as_deref()
            .is_some_and(|content| content != review.content);

        if let Some(author) = patch.author {
            review.author = author;
        }
        if let Some(rating) = patch.rating {
            review.rating = rating;
        }
        if let Some(content) = patch.content {
            review.content = content;
        }

        if content_changed {
            review.sentiment = self.router.classify(&review.content).await;
            tracing::info!(
                review_id,
                sentiment = review.sentiment.id(),
                "review content changed; sentiment recomputed"
            );
        }

        self.store.update_review(&review)?;
        Ok(review)
    }
}

// ── Tests ────────────────────────────────────────────────────────
