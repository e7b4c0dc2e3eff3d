//! HTTP clients for model-serving endpoints.
//!
//! Extractor: `POST {"text": ...}` returns a JSON array of spans.
//! Classifier: `POST {"inputs": ..., "top_k": null}` returns label scores,
//! either flat (`[{label, score}]`) or nested one level
//! (`[[{label, score}]]`) as pipeline servers do for single inputs.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::timeout;

use super::{EntityExtractor, ExtractedSpan, FineRoleClassifier, LabelScore};

/// Entity extractor behind an HTTP endpoint
pub struct HttpExtractor {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpExtractor {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EntityExtractor for HttpExtractor {
    fn name(&self) -> &str {
        "http-extractor"
    }

    async fn extract(&self, text: &str, limit: Duration) -> Result<Vec<ExtractedSpan>> {
        let request = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "text": text }))
            .send();

        let response = timeout(limit, request)
            .await
            .with_context(|| format!("Extractor timed out after {:?}", limit))?
            .with_context(|| format!("Failed to reach extractor at {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Extractor error ({}): {}", status, body.trim());
        }

        response
            .json::<Vec<ExtractedSpan>>()
            .await
            .context("Failed to parse extractor response")
    }
}

/// Fine role classifier behind an HTTP endpoint
pub struct HttpClassifier {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Classifier response shapes
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassifierResponse {
    Flat(Vec<LabelScore>),
    Nested(Vec<Vec<LabelScore>>),
}

impl ClassifierResponse {
    fn into_scores(self) -> Vec<LabelScore> {
        match self {
            ClassifierResponse::Flat(scores) => scores,
            ClassifierResponse::Nested(batches) => batches.into_iter().next().unwrap_or_default(),
        }
    }
}

#[async_trait]
impl FineRoleClassifier for HttpClassifier {
    fn name(&self) -> &str {
        "http-classifier"
    }

    async fn classify(&self, input: &str, limit: Duration) -> Result<Vec<LabelScore>> {
        let request = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "inputs": input, "top_k": null }))
            .send();

        let response = timeout(limit, request)
            .await
            .with_context(|| format!("Classifier timed out after {:?}", limit))?
            .with_context(|| format!("Failed to reach classifier at {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Classifier error ({}): {}", status, body.trim());
        }

        let parsed: ClassifierResponse = response
            .json()
            .await
            .context("Failed to parse classifier response")?;
        Ok(parsed.into_scores())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_response_shapes() {
        let flat: ClassifierResponse =
            serde_json::from_str(r#"[{"label": "Guardian", "score": 0.8}]"#).unwrap();
        assert_eq!(flat.into_scores().len(), 1);

        let nested: ClassifierResponse = serde_json::from_str(
            r#"[[{"label": "Guardian", "score": 0.8}, {"label": "Martyr", "score": 0.1}]]"#,
        )
        .unwrap();
        let scores = nested.into_scores();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[1].label, "Martyr");
    }

    #[test]
    fn test_extracted_span_defaults_missing_probabilities() {
        let span: ExtractedSpan =
            serde_json::from_str(r#"{"start": 0, "end": 5, "prob_antagonist": 0.7}"#).unwrap();
        assert_eq!(span.prob_protagonist, 0.0);
        assert_eq!(span.probability(crate::domain::MainRole::Antagonist), 0.7);
    }

    #[test]
    fn test_client_endpoints() {
        let extractor = HttpExtractor::new("http://localhost:9000/extract");
        assert_eq!(extractor.endpoint(), "http://localhost:9000/extract");
        assert_eq!(extractor.name(), "http-extractor");
        assert_eq!(HttpClassifier::new("x").name(), "http-classifier");
    }
}
