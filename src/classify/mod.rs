// src/classify/mod.rs
//! Classification engine: topic importance × recency decay → one rankable score.
//!
//! importance = Σ confidence(label) × weight(label), in [0.2, 1.0]
//! recency    = exp(-λ·h), λ = ln 2 / 48, h = hours since publication (≥ 0)
//! final      = importance × recency
//!
//! A scorer failure never loses the item: it is persisted with null scores and
//! `is_filtered = false`, and gets re-scored when the same id is ingested again.

pub mod labels;
pub mod scorer;

use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::{error, info};

use crate::error::{ClassificationError, StoreError};
use crate::model::{ItemIngest, ScoredItem};
use crate::store::StoreSession;

pub use labels::{Label, MAX_WEIGHT, MIN_WEIGHT};
pub use scorer::{build_scorer, DisabledScorer, DynScorer, StaticScorer, TopicScorer, ZeroShotScorer};

/// Minimum importance (exclusive) for an item to be retrievable.
pub const IMPORTANCE_THRESHOLD: f64 = 0.5;
pub const RECENCY_HALF_LIFE_HOURS: f64 = 48.0;
/// Decay constant λ = ln(2) / half-life (≈ 0.0144 per hour).
pub const RECENCY_LAMBDA: f64 = std::f64::consts::LN_2 / RECENCY_HALF_LIFE_HOURS;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Importance {
    pub score: f64,
    pub category: Label,
}

/// Weighted importance over one confidence per [`Label::ALL`] entry.
///
/// Confidences are renormalized to sum to 1, which keeps the score inside
/// [MIN_WEIGHT, MAX_WEIGHT]; the final clamp only absorbs float rounding.
pub fn importance_from_confidences(confidences: &[f64]) -> Result<Importance, ClassificationError> {
    if confidences.len() != Label::ALL.len() {
        return Err(ClassificationError::InvalidDistribution(format!(
            "expected {} confidences, got {}",
            Label::ALL.len(),
            confidences.len()
        )));
    }
    if confidences.iter().any(|c| !c.is_finite() || *c < 0.0) {
        return Err(ClassificationError::InvalidDistribution(
            "confidences must be finite and non-negative".into(),
        ));
    }
    let total: f64 = confidences.iter().sum();
    if total <= 0.0 {
        return Err(ClassificationError::InvalidDistribution(
            "confidences sum to zero".into(),
        ));
    }

    let mut score = 0.0;
    let mut best: Option<(Label, f64)> = None;
    for (label, conf) in Label::ALL.into_iter().zip(confidences) {
        let weighted = (conf / total) * label.weight();
        score += weighted;
        // strict `>` keeps the earliest label on ties
        if best.map_or(true, |(_, b)| weighted > b) {
            best = Some((label, weighted));
        }
    }

    let category = best.map(|(l, _)| l).unwrap_or(Label::GeneralNews);
    Ok(Importance {
        score: score.clamp(MIN_WEIGHT, MAX_WEIGHT),
        category,
    })
}

/// Exponential freshness decay. Negative ages (future dates) clamp to 1.0.
pub fn recency_from_hours(hours: f64) -> f64 {
    (-RECENCY_LAMBDA * hours.max(0.0)).exp()
}

pub fn recency_score(published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let hours = (now - published_at).num_milliseconds() as f64 / 3_600_000.0;
    recency_from_hours(hours)
}

pub fn passes_threshold(importance: f64) -> bool {
    importance > IMPORTANCE_THRESHOLD
}

pub struct Classifier {
    scorer: DynScorer,
}

impl Classifier {
    pub fn new(scorer: DynScorer) -> Self {
        Self { scorer }
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    pub async fn compute_importance(&self, title: &str) -> Result<Importance, ClassificationError> {
        let labels = Label::candidate_texts();
        let confidences = self.scorer.score(title, &labels).await?;
        importance_from_confidences(&confidences)
    }

    /// Score one item against `now`. Never fails; see module docs.
    pub async fn classify(&self, item: ItemIngest, now: DateTime<Utc>) -> ScoredItem {
        match self.compute_importance(&item.title).await {
            Ok(imp) => {
                let recency = recency_score(item.published_at, now);
                let final_score = imp.score * recency;
                let is_filtered = passes_threshold(imp.score);

                counter!("items_scored_total").increment(1);
                info!(
                    target: "classifier",
                    source = %item.source,
                    status = if is_filtered { "PASS" } else { "FAIL" },
                    title = %truncate_chars(&item.title, 60),
                    importance = %format!("{:.3}", imp.score),
                    recency = %format!("{:.3}", recency),
                    final_score = %format!("{:.3}", final_score),
                    category = imp.category.as_str(),
                    "item classified"
                );

                ScoredItem {
                    id: item.id,
                    source: item.source,
                    title: item.title,
                    body: item.body,
                    published_at: item.published_at,
                    importance_score: Some(imp.score),
                    recency_score: Some(recency),
                    final_score: Some(final_score),
                    category: Some(imp.category.as_str().to_string()),
                    is_filtered,
                    ingested_at: now,
                }
            }
            Err(e) => {
                counter!("classification_failures_total").increment(1);
                error!(target: "classifier", id = %item.id, error = %e, "classification failed");
                ScoredItem::unscored(item, now)
            }
        }
    }

    /// Classify and upsert through `session`. Only a store failure is returned.
    pub async fn classify_and_save(
        &self,
        item: ItemIngest,
        session: &mut dyn StoreSession,
    ) -> Result<ScoredItem, StoreError> {
        self.classify_and_save_at(item, Utc::now(), session).await
    }

    /// Same as [`Classifier::classify_and_save`] with an explicit clock. `now`
    /// drives recency and becomes `ingested_at`.
    pub async fn classify_and_save_at(
        &self,
        item: ItemIngest,
        now: DateTime<Utc>,
        session: &mut dyn StoreSession,
    ) -> Result<ScoredItem, StoreError> {
        let scored = self.classify(item, now).await;
        session.upsert(&scored).await?;
        Ok(scored)
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
