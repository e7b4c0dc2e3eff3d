//! Entity mentions and their fine-grained role scores.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::role::MainRole;

/// Fine role label to confidence score (0-1)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FineScores(BTreeMap<String, f64>);

impl FineScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, score: f64) {
        self.0.insert(label.into(), score);
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.0.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Highest score, if any
    pub fn top(&self) -> Option<f64> {
        self.0.values().copied().reduce(f64::max)
    }

    /// Labels and scores sorted by descending score, then label
    pub fn sorted_desc(&self) -> Vec<(&str, f64)> {
        let mut entries: Vec<(&str, f64)> = self.0.iter().map(|(l, s)| (l.as_str(), *s)).collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    /// Labels whose score is within `margin` of the top score, best first
    pub fn within_margin(&self, margin: f64) -> Vec<String> {
        let Some(top) = self.top() else {
            return Vec::new();
        };
        self.sorted_desc()
            .into_iter()
            .filter(|(_, score)| *score >= top - margin)
            .map(|(label, _)| label.to_string())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(l, s)| (l.as_str(), *s))
    }
}

impl FromIterator<(String, f64)> for FineScores {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One occurrence of an entity in a document
///
/// Offsets are half-open character (Unicode scalar) offsets into the
/// document the mention was found in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    /// Entity display text
    pub entity: String,

    pub start: usize,

    pub end: usize,

    pub main_role: MainRole,

    /// Fine role labels within margin of the top score, best first
    #[serde(default)]
    pub fine_roles: Vec<String>,

    #[serde(default)]
    pub fine_scores: FineScores,

    /// Main-role probability reported by the extractor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_confidence: Option<f64>,

    /// Sentence the mention was found in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_id: Option<String>,
}

impl Mention {
    pub fn new(entity: impl Into<String>, start: usize, end: usize, main_role: MainRole) -> Self {
        Self {
            entity: entity.into(),
            start,
            end,
            main_role,
            fine_roles: Vec::new(),
            fine_scores: FineScores::new(),
            role_confidence: None,
            sentence: None,
            article_id: None,
        }
    }

    pub fn with_fine_role(mut self, label: impl Into<String>, score: f64) -> Self {
        let label = label.into();
        self.fine_scores.insert(label.clone(), score);
        self.fine_roles.push(label);
        self
    }

    pub fn with_role_confidence(mut self, confidence: f64) -> Self {
        self.role_confidence = Some(confidence);
        self
    }

    pub fn with_sentence(mut self, sentence: impl Into<String>) -> Self {
        self.sentence = Some(sentence.into());
        self
    }

    pub fn with_article_id(mut self, article_id: impl Into<String>) -> Self {
        self.article_id = Some(article_id.into());
        self
    }

    /// Confidence compared against display thresholds
    ///
    /// Highest score among the within-margin fine roles, else the main-role
    /// probability, else 0.0.
    pub fn confidence(&self) -> f64 {
        self.fine_roles
            .iter()
            .filter_map(|label| self.fine_scores.get(label))
            .reduce(f64::max)
            .or(self.role_confidence)
            .unwrap_or(0.0)
    }

    /// Whether this mention's context sentence is `sentence`
    pub fn is_in_sentence(&self, sentence: &str) -> bool {
        self.sentence
            .as_deref()
            .is_some_and(|s| s.trim() == sentence.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_desc_breaks_ties_by_label() {
        let scores: FineScores = [
            ("Victim".to_string(), 0.4),
            ("Guardian".to_string(), 0.8),
            ("Martyr".to_string(), 0.4),
        ]
        .into_iter()
        .collect();

        let sorted = scores.sorted_desc();
        assert_eq!(sorted, vec![("Guardian", 0.8), ("Martyr", 0.4), ("Victim", 0.4)]);
    }

    #[test]
    fn test_within_margin() {
        let scores: FineScores = [
            ("Guardian".to_string(), 0.80),
            ("Virtuous".to_string(), 0.76),
            ("Martyr".to_string(), 0.50),
        ]
        .into_iter()
        .collect();

        assert_eq!(scores.within_margin(0.05), vec!["Guardian", "Virtuous"]);
        assert!(FineScores::new().within_margin(0.05).is_empty());
    }

    #[test]
    fn test_confidence_prefers_margin_scores() {
        let mention = Mention::new("Alice", 0, 5, MainRole::Protagonist)
            .with_fine_role("Guardian", 0.7)
            .with_role_confidence(0.9);
        assert_eq!(mention.confidence(), 0.7);

        let mention = Mention::new("Alice", 0, 5, MainRole::Protagonist).with_role_confidence(0.9);
        assert_eq!(mention.confidence(), 0.9);

        let mention = Mention::new("Alice", 0, 5, MainRole::Protagonist);
        assert_eq!(mention.confidence(), 0.0);
    }

    #[test]
    fn test_mention_serialization() {
        let mention = Mention::new("Bob", 10, 13, MainRole::Antagonist).with_fine_role("Tyrant", 0.66);

        let json = serde_json::to_string(&mention).unwrap();
        let parsed: Mention = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, mention);
        assert!(!json.contains("sentence"));
    }
}
