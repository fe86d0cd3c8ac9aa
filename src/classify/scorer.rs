// src/classify/scorer.rs
//! Topic scorer abstraction + providers.
//!
//! A scorer maps one text to a confidence per candidate label. The
//! classification engine treats it as a black box; only the returned
//! distribution matters.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ScorerConfig;
use crate::error::ClassificationError;

#[async_trait]
pub trait TopicScorer: Send + Sync {
    /// One confidence per entry of `labels`, in the same order.
    async fn score(&self, text: &str, labels: &[&str]) -> Result<Vec<f64>, ClassificationError>;

    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynScorer = Arc<dyn TopicScorer>;

/// Factory: build a scorer according to config.
///
/// * `mock` returns a deterministic uniform scorer.
/// * `disabled` (or an unknown provider) returns a scorer that always fails,
///   so items are persisted unscored.
/// * `huggingface` builds the zero-shot inference client.
pub fn build_scorer(cfg: &ScorerConfig) -> DynScorer {
    match cfg.provider.as_str() {
        "huggingface" => Arc::new(ZeroShotScorer::from_config(cfg)),
        "mock" => Arc::new(StaticScorer::uniform()),
        "disabled" => Arc::new(DisabledScorer),
        other => {
            warn!(target: "classifier", provider = other, "unknown scorer provider, scoring disabled");
            Arc::new(DisabledScorer)
        }
    }
}

// ------------------------------------------------------------
// Zero-shot NLI over the Hugging Face inference API
// ------------------------------------------------------------

pub struct ZeroShotScorer {
    url: String,
    api_key: String,
    timeout: Duration,
    // Built on first use, then shared by every caller.
    http: OnceCell<reqwest::Client>,
}

impl ZeroShotScorer {
    pub fn from_config(cfg: &ScorerConfig) -> Self {
        let base = cfg
            .endpoint
            .clone()
            .unwrap_or_else(|| "https://router.huggingface.co/hf-inference/models".to_string());
        let url = format!("{}/{}", base.trim_end_matches('/'), cfg.model);
        Self {
            url,
            api_key: cfg.api_key.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs.max(1)),
            http: OnceCell::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn client(&self) -> Result<&reqwest::Client, ClassificationError> {
        let client = self.http.get_or_try_init(|| {
            info!(target: "classifier", url = %self.url, "initializing zero-shot scorer client");
            reqwest::Client::builder()
                .user_agent("it-news-ranker/0.1")
                .connect_timeout(Duration::from_secs(4))
                .timeout(self.timeout)
                .build()
        })?;
        Ok(client)
    }
}

#[derive(Serialize)]
struct ZeroShotReq<'a> {
    inputs: &'a str,
    parameters: ZeroShotParams<'a>,
}

#[derive(Serialize)]
struct ZeroShotParams<'a> {
    candidate_labels: &'a [&'a str],
    multi_label: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZeroShotResp {
    Columns { labels: Vec<String>, scores: Vec<f64> },
    Pairs(Vec<LabelScore>),
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

#[async_trait]
impl TopicScorer for ZeroShotScorer {
    async fn score(&self, text: &str, labels: &[&str]) -> Result<Vec<f64>, ClassificationError> {
        let req = ZeroShotReq {
            inputs: text,
            parameters: ZeroShotParams {
                candidate_labels: labels,
                multi_label: false,
            },
        };

        let mut builder = self.client()?.post(&self.url).json(&req);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }
        let resp = builder.send().await?;
        if !resp.status().is_success() {
            return Err(ClassificationError::Unavailable(format!(
                "HTTP {}",
                resp.status().as_u16()
            )));
        }

        let pairs = match resp.json::<ZeroShotResp>().await? {
            ZeroShotResp::Columns { labels, scores } => {
                if labels.len() != scores.len() {
                    return Err(ClassificationError::InvalidDistribution(
                        "labels and scores differ in length".into(),
                    ));
                }
                labels.into_iter().zip(scores).collect::<Vec<_>>()
            }
            ZeroShotResp::Pairs(v) => v.into_iter().map(|p| (p.label, p.score)).collect(),
        };
        align_to_labels(labels, &pairs)
    }

    fn name(&self) -> &'static str {
        "huggingface"
    }
}

/// Reorder `(label, score)` pairs, which the API returns sorted by score, into
/// the order of `labels`. Every label must be present.
pub fn align_to_labels(
    labels: &[&str],
    pairs: &[(String, f64)],
) -> Result<Vec<f64>, ClassificationError> {
    labels
        .iter()
        .map(|l| {
            pairs
                .iter()
                .find(|(name, _)| name == l)
                .map(|(_, s)| *s)
                .ok_or_else(|| {
                    ClassificationError::InvalidDistribution(format!("missing label `{l}`"))
                })
        })
        .collect()
}

// ------------------------------------------------------------
// Offline scorers
// ------------------------------------------------------------

/// Always fails; used when scoring is disabled.
pub struct DisabledScorer;

#[async_trait]
impl TopicScorer for DisabledScorer {
    async fn score(&self, _text: &str, _labels: &[&str]) -> Result<Vec<f64>, ClassificationError> {
        Err(ClassificationError::Unavailable("scoring disabled".into()))
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Returns the same distribution for every text (tests/local runs).
#[derive(Debug, Clone)]
pub struct StaticScorer {
    pub confidences: Vec<f64>,
}

impl StaticScorer {
    pub fn new(confidences: Vec<f64>) -> Self {
        Self { confidences }
    }

    pub fn uniform() -> Self {
        let n = crate::classify::labels::Label::ALL.len();
        Self::new(vec![1.0 / n as f64; n])
    }
}

#[async_trait]
impl TopicScorer for StaticScorer {
    async fn score(&self, _text: &str, labels: &[&str]) -> Result<Vec<f64>, ClassificationError> {
        if self.confidences.len() != labels.len() {
            return Err(ClassificationError::InvalidDistribution(format!(
                "expected {} confidences, have {}",
                labels.len(),
                self.confidences.len()
            )));
        }
        Ok(self.confidences.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_reorders_sorted_api_output() {
        let labels = ["a", "b", "c"];
        let pairs = vec![
            ("c".to_string(), 0.7),
            ("a".to_string(), 0.2),
            ("b".to_string(), 0.1),
        ];
        assert_eq!(align_to_labels(&labels, &pairs).unwrap(), vec![0.2, 0.1, 0.7]);
    }

    #[test]
    fn align_rejects_missing_label() {
        let pairs = vec![("a".to_string(), 1.0)];
        assert!(align_to_labels(&["a", "b"], &pairs).is_err());
    }

    #[test]
    fn columns_and_pairs_responses_both_parse() {
        let cols = r#"{"sequence":"x","labels":["a","b"],"scores":[0.6,0.4]}"#;
        let pairs = r#"[{"label":"a","score":0.6},{"label":"b","score":0.4}]"#;
        assert!(matches!(
            serde_json::from_str::<ZeroShotResp>(cols).unwrap(),
            ZeroShotResp::Columns { .. }
        ));
        assert!(matches!(
            serde_json::from_str::<ZeroShotResp>(pairs).unwrap(),
            ZeroShotResp::Pairs(_)
        ));
    }

    #[test]
    fn factory_honours_provider() {
        let mut cfg = ScorerConfig::default();
        assert_eq!(build_scorer(&cfg).name(), "huggingface");
        cfg.provider = "mock".into();
        assert_eq!(build_scorer(&cfg).name(), "static");
        cfg.provider = "nonsense".into();
        assert_eq!(build_scorer(&cfg).name(), "disabled");
    }

    #[test]
    fn endpoint_override_builds_model_url() {
        let cfg = ScorerConfig {
            endpoint: Some("http://localhost:8080/models/".into()),
            ..Default::default()
        };
        let s = ZeroShotScorer::from_config(&cfg);
        assert_eq!(
            s.url(),
            "http://localhost:8080/models/valhalla/distilbart-mnli-12-3"
        );
    }

    #[tokio::test]
    async fn disabled_scorer_always_fails() {
        assert!(DisabledScorer.score("t", &["a"]).await.is_err());
    }
}
