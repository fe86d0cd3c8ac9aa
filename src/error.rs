// src/error.rs
//! Error taxonomy of the ingest → classify → store pipeline.
//!
//! Only `ValidationError` and `StoreError` ever reach a caller. Fetch and
//! classification errors are recovered where they happen (see
//! `ingest::fetch_isolated` and `classify::Classifier::classify_and_save`).

/// A feed could not be fetched or parsed. Never leaves the adapter boundary.
#[derive(Debug, thiserror::Error)]
pub enum SourceFetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed returned HTTP {0}")]
    Status(u16),

    #[error("feed parse error: {0}")]
    Parse(String),
}

/// The topic scorer failed for a single title.
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("topic scorer unavailable: {0}")]
    Unavailable(String),

    #[error("topic scorer request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid score distribution: {0}")]
    InvalidDistribution(String),
}

/// A malformed ingest payload. Rejects the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("item {index}: missing or empty required field `{field}`")]
    MissingField { index: usize, field: &'static str },
}

/// Persistence failure for a single write or query.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}
