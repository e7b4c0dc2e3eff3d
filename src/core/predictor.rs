//! Two-stage prediction pipeline.
//!
//! Stage 1 runs the entity extractor over the article and post-processes
//! its spans: whitespace is trimmed from the offsets, the main role is the
//! most probable of the four, and each mention is given the sentence it
//! starts in. Stage 2 asks the fine role classifier about every mention,
//! keeps scores above the score threshold and selects the fine roles within
//! the margin of the top score.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::adapters::{EntityExtractor, ExtractedSpan, FineRoleClassifier, LabelScore};
use crate::annotate::CharOffsets;
use crate::config::PredictionSettings;
use crate::domain::{FineScores, LabelSet, MainRole, Mention};

/// Stage-2 filtering and call limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionOptions {
    /// Scores must be strictly greater than this to be kept
    pub score_threshold: f64,
    /// Fine roles scoring at least `top - margin` are selected
    pub margin: f64,
    /// Per-call timeout for each model request
    pub timeout: Duration,
}

impl Default for PredictionOptions {
    fn default() -> Self {
        PredictionSettings::default().into()
    }
}

impl From<PredictionSettings> for PredictionOptions {
    fn from(settings: PredictionSettings) -> Self {
        Self {
            score_threshold: settings.score_threshold,
            margin: settings.margin,
            timeout: Duration::from_secs(settings.timeout_seconds),
        }
    }
}

/// Outcome of one prediction run
#[derive(Debug, Clone)]
pub struct Prediction {
    pub labels: LabelSet,
    /// Spans returned by the extractor, before post-processing
    pub spans_found: usize,
    /// Mentions with a role other than Unknown
    pub non_unknown: usize,
    /// Mentions whose classifier call failed
    pub classifier_failures: usize,
}

/// Runs both model stages over an article
pub struct Predictor {
    extractor: Box<dyn EntityExtractor>,
    classifier: Box<dyn FineRoleClassifier>,
    options: PredictionOptions,
}

impl Predictor {
    pub fn new(
        extractor: Box<dyn EntityExtractor>,
        classifier: Box<dyn FineRoleClassifier>,
        options: PredictionOptions,
    ) -> Self {
        Self {
            extractor,
            classifier,
            options,
        }
    }

    pub fn options(&self) -> &PredictionOptions {
        &self.options
    }

    /// Predict labels for one article
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub async fn predict(&self, article_id: &str, text: &str) -> Result<Prediction> {
        let started = Instant::now();
        info!(extractor = self.extractor.name(), "Running entity extraction");

        let spans = self
            .extractor
            .extract(text, self.options.timeout)
            .await
            .with_context(|| format!("Entity extraction failed for article '{}'", article_id))?;
        let spans_found = spans.len();

        let mentions = post_process_spans(text, &spans);
        let non_unknown = mentions
            .iter()
            .filter(|m| m.main_role != MainRole::Unknown)
            .count();
        info!(
            spans = spans_found,
            mentions = mentions.len(),
            non_unknown,
            "Stage 1 complete"
        );

        let mut labels = LabelSet::new();
        let mut classifier_failures = 0;
        for mention in mentions {
            let mut mention = mention.with_article_id(article_id);
            let input = classifier_input(&mention);

            match self.classifier.classify(&input, self.options.timeout).await {
                Ok(scores) => {
                    mention.fine_scores = select_scores(&scores, self.options.score_threshold);
                    mention.fine_roles = mention.fine_scores.within_margin(self.options.margin);
                }
                Err(e) => {
                    classifier_failures += 1;
                    warn!(entity = %mention.entity, error = %e, "Fine role classification failed");
                }
            }
            labels.push(mention);
        }

        info!(
            labels = labels.len(),
            classifier_failures,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Prediction complete"
        );

        Ok(Prediction {
            labels,
            spans_found,
            non_unknown,
            classifier_failures,
        })
    }
}

/// Turn raw extractor spans into mentions
///
/// Offsets are clamped to the text and trimmed of surrounding whitespace.
/// Spans that are empty after trimming are dropped.
pub fn post_process_spans(text: &str, spans: &[ExtractedSpan]) -> Vec<Mention> {
    let offsets = CharOffsets::new(text);
    let chars: Vec<char> = text.chars().collect();
    let mut mentions = Vec::with_capacity(spans.len());

    for span in spans {
        let mut start = span.start.min(chars.len());
        let mut end = span.end.min(chars.len());
        while start < end && chars[start].is_whitespace() {
            start += 1;
        }
        while end > start && chars[end - 1].is_whitespace() {
            end -= 1;
        }
        if start >= end {
            debug!(start = span.start, end = span.end, "Dropping empty span");
            continue;
        }

        let slice = &text[offsets.to_byte(start)..offsets.to_byte(end)];
        let entity = slice.replace(|c: char| c == '\n' || c == '\r', " ").trim().to_string();
        let (role, probability) = most_probable_role(span);

        let mut mention = Mention::new(entity, start, end, role).with_role_confidence(probability);
        mention.sentence = context_sentence(text, offsets.to_byte(start)).map(str::to_string);
        mentions.push(mention);
    }

    mentions
}

/// Role with the highest probability; ties go to the greater role name
pub fn most_probable_role(span: &ExtractedSpan) -> (MainRole, f64) {
    MainRole::ALL
        .iter()
        .map(|&role| (role, span.probability(role)))
        .max_by(|a, b| {
            a.1.total_cmp(&b.1)
                .then_with(|| a.0.as_str().cmp(b.0.as_str()))
        })
        .unwrap_or((MainRole::Unknown, 0.0))
}

/// The sentence containing byte offset `at`, trimmed
pub fn context_sentence(text: &str, at: usize) -> Option<&str> {
    text.split_sentence_bound_indices()
        .find(|(start, sentence)| at >= *start && at < start + sentence.len())
        .map(|(_, sentence)| sentence.trim())
        .filter(|sentence| !sentence.is_empty())
}

/// Text sent to the fine role classifier for one mention
pub fn classifier_input(mention: &Mention) -> String {
    format!(
        "Entity: {}\nMain Role: {}\nContext: {}",
        mention.entity,
        mention.main_role,
        mention.sentence.as_deref().unwrap_or_default()
    )
}

/// Keep scores above `threshold`, rounded to four decimals
pub fn select_scores(scores: &[LabelScore], threshold: f64) -> FineScores {
    scores
        .iter()
        .filter(|s| s.score > threshold)
        .map(|s| (s.label.clone(), (s.score * 10_000.0).round() / 10_000.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize, probs: [f64; 4]) -> ExtractedSpan {
        ExtractedSpan {
            start,
            end,
            prob_protagonist: probs[0],
            prob_antagonist: probs[1],
            prob_innocent: probs[2],
            prob_unknown: probs[3],
        }
    }

    #[test]
    fn test_post_process_trims_offsets() {
        let text = "Yesterday  Alice\n met Bob.";
        let mentions = post_process_spans(text, &[span(9, 17, [0.9, 0.05, 0.03, 0.02])]);

        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].entity, "Alice");
        assert_eq!((mentions[0].start, mentions[0].end), (11, 16));
        assert_eq!(mentions[0].main_role, MainRole::Protagonist);
        assert_eq!(mentions[0].role_confidence, Some(0.9));
    }

    #[test]
    fn test_post_process_drops_blank_and_clamps() {
        let text = "Hi Bob";
        let mentions = post_process_spans(
            text,
            &[span(0, 0, [0.0; 4]), span(2, 3, [0.0; 4]), span(3, 99, [0.1, 0.8, 0.0, 0.1])],
        );
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].entity, "Bob");
        assert_eq!(mentions[0].end, 6);
    }

    #[test]
    fn test_multiline_entity_text_is_flattened() {
        let text = "The United\nNations met.";
        let mentions = post_process_spans(text, &[span(4, 18, [0.0, 0.0, 0.0, 1.0])]);
        assert_eq!(mentions[0].entity, "United Nations");
    }

    #[test]
    fn test_most_probable_role_tie_breaks_by_name() {
        // Protagonist > Antagonist by name
        let (role, p) = most_probable_role(&span(0, 1, [0.4, 0.4, 0.1, 0.1]));
        assert_eq!(role, MainRole::Protagonist);
        assert_eq!(p, 0.4);

        let (role, _) = most_probable_role(&span(0, 1, [0.1, 0.1, 0.1, 0.7]));
        assert_eq!(role, MainRole::Unknown);
    }

    #[test]
    fn test_context_sentence() {
        let text = "Alice met Bob. Bob left town! Carol stayed.";
        assert_eq!(context_sentence(text, 0), Some("Alice met Bob."));
        assert_eq!(context_sentence(text, 15), Some("Bob left town!"));
        assert_eq!(context_sentence(text, 30), Some("Carol stayed."));
        assert_eq!(context_sentence(text, 500), None);
    }

    #[test]
    fn test_classifier_input_format() {
        let mention =
            Mention::new("Bob", 10, 13, MainRole::Antagonist).with_sentence("Alice met Bob.");
        assert_eq!(
            classifier_input(&mention),
            "Entity: Bob\nMain Role: Antagonist\nContext: Alice met Bob."
        );
    }

    #[test]
    fn test_select_scores_filters_and_rounds() {
        let scores = vec![
            LabelScore { label: "Guardian".into(), score: 0.812_345 },
            LabelScore { label: "Martyr".into(), score: 0.01 },
            LabelScore { label: "Virtuous".into(), score: 0.770_04 },
        ];
        let selected = select_scores(&scores, 0.01);

        assert_eq!(selected.len(), 2);
        assert_eq!(selected.get("Guardian"), Some(0.8123));
        assert_eq!(selected.get("Virtuous"), Some(0.77));
        assert_eq!(selected.within_margin(0.05), vec!["Guardian", "Virtuous"]);
    }
}
