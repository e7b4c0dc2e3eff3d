//! Adapter interfaces for the external models.
//!
//! Two collaborators sit upstream of annotation:
//!
//! - [`EntityExtractor`]: finds entity spans in raw text with per-role
//!   probabilities (stage 1)
//! - [`FineRoleClassifier`]: scores fine-grained roles for one mention in
//!   context (stage 2)
//!
//! Both are opaque services; [`http`] talks to them over HTTP. [`web`]
//! fetches article text from a URL.

pub mod http;
pub mod web;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::MainRole;

pub use http::{HttpClassifier, HttpExtractor};
pub use web::{extract_paragraphs, fetch_article};

/// One span returned by the extractor
///
/// Offsets are char offsets into the text that was sent and may include
/// surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedSpan {
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub prob_protagonist: f64,
    #[serde(default)]
    pub prob_antagonist: f64,
    #[serde(default)]
    pub prob_innocent: f64,
    #[serde(default)]
    pub prob_unknown: f64,
}

impl ExtractedSpan {
    /// Probability reported for one role
    pub fn probability(&self, role: MainRole) -> f64 {
        match role {
            MainRole::Protagonist => self.prob_protagonist,
            MainRole::Antagonist => self.prob_antagonist,
            MainRole::Innocent => self.prob_innocent,
            MainRole::Unknown => self.prob_unknown,
        }
    }
}

/// A fine role label with its classifier score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Stage 1 model
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Find entity spans in `text`
    async fn extract(&self, text: &str, timeout: Duration) -> Result<Vec<ExtractedSpan>>;
}

/// Stage 2 model
#[async_trait]
pub trait FineRoleClassifier: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Score every fine role for one formatted mention input
    async fn classify(&self, input: &str, timeout: Duration) -> Result<Vec<LabelScore>>;
}
