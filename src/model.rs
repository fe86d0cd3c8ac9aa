// src/model.rs
//! Item shapes flowing through the pipeline and the two retrieval views.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

/// A raw, unscored item entering the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemIngest {
    /// Source-assigned natural key.
    pub id: String,
    /// Slug of the feed that produced the item.
    pub source: String,
    pub title: String,
    /// Markup-free plain text.
    pub body: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// A persisted item after classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub id: String,
    pub source: String,
    pub title: String,
    pub body: Option<String>,
    pub published_at: DateTime<Utc>,
    pub importance_score: Option<f64>,
    pub recency_score: Option<f64>,
    pub final_score: Option<f64>,
    pub category: Option<String>,
    pub is_filtered: bool,
    pub ingested_at: DateTime<Utc>,
}

impl ScoredItem {
    /// Record with no classification data, as persisted when scoring fails.
    pub fn unscored(item: ItemIngest, ingested_at: DateTime<Utc>) -> Self {
        Self {
            id: item.id,
            source: item.source,
            title: item.title,
            body: item.body,
            published_at: item.published_at,
            importance_score: None,
            recency_score: None,
            final_score: None,
            category: None,
            is_filtered: false,
            ingested_at,
        }
    }
}

/// Retrieval view exposed to downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicItem {
    pub id: String,
    pub source: String,
    pub title: String,
    pub body: Option<String>,
    pub published_at: DateTime<Utc>,
}

impl From<ScoredItem> for PublicItem {
    fn from(s: ScoredItem) -> Self {
        Self {
            id: s.id,
            source: s.source,
            title: s.title,
            body: s.body,
            published_at: s.published_at,
        }
    }
}

/// Retrieval view carrying every classification field (dashboards, debugging).
pub type FullItem = ScoredItem;

/// Ingest payload as received on the wire. Required fields are optional here so
/// that a missing one surfaces as a `ValidationError` naming the offending item.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "de_opt_utc")]
    pub published_at: Option<DateTime<Utc>>,
}

/// Validate a whole batch. The first invalid item rejects the batch; nothing
/// from it should be written.
pub fn validate_batch(
    batch: Vec<IngestPayload>,
    now: DateTime<Utc>,
) -> Result<Vec<ItemIngest>, ValidationError> {
    let mut out = Vec::with_capacity(batch.len());
    for (index, p) in batch.into_iter().enumerate() {
        let id = required(p.id, index, "id")?;
        let source = required(p.source, index, "source")?;
        let title = required(p.title, index, "title")?;
        out.push(ItemIngest {
            id,
            source,
            title,
            body: p.body.filter(|b| !b.trim().is_empty()),
            published_at: p.published_at.unwrap_or(now),
        });
    }
    Ok(out)
}

fn required(
    v: Option<String>,
    index: usize,
    field: &'static str,
) -> Result<String, ValidationError> {
    match v {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(ValidationError::MissingField { index, field }),
    }
}

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC.
pub fn parse_utc_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn de_opt_utc<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) => parse_utc_timestamp(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp `{s}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn naive_timestamps_are_utc() {
        let a = parse_utc_timestamp("2024-01-15T10:00:00").unwrap();
        let b = parse_utc_timestamp("2024-01-15T10:00:00Z").unwrap();
        let c = parse_utc_timestamp("2024-01-15T12:00:00+02:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert!(parse_utc_timestamp("yesterday").is_none());
    }

    #[test]
    fn missing_published_at_defaults_to_now() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let batch = vec![IngestPayload {
            id: Some("a".into()),
            source: Some("ext".into()),
            title: Some("Title".into()),
            ..Default::default()
        }];
        let out = validate_batch(batch, now).unwrap();
        assert_eq!(out[0].published_at, now);
        assert_eq!(out[0].body, None);
    }

    #[test]
    fn empty_required_field_rejects_batch() {
        let batch = vec![
            IngestPayload {
                id: Some("a".into()),
                source: Some("ext".into()),
                title: Some("ok".into()),
                ..Default::default()
            },
            IngestPayload {
                id: Some("b".into()),
                source: Some("ext".into()),
                title: Some("   ".into()),
                ..Default::default()
            },
        ];
        let err = validate_batch(batch, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                index: 1,
                field: "title"
            }
        );
    }
}
