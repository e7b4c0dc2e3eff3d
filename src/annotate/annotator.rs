//! Whole-document and single-sentence annotation.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::debug;

use crate::domain::{Mention, RoleColors};

use super::render::{segments_to_html, RenderedSpan, Segment, TooltipStyle};
use super::spans::{find_entity_occurrences, resolve_overlaps, Candidate, CharOffsets};

/// Errors that fail a single render call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnnotateError {
    #[error("Mention '{entity}' has reversed offsets: start {start} > end {end}")]
    ReversedOffsets {
        entity: String,
        start: usize,
        end: usize,
    },

    #[error("Threshold must be a number, got {0}")]
    InvalidThreshold(f64),
}

/// Entity texts already highlighted in the current rendering session
///
/// Callers thread this through sequential sentence renders so repeat
/// suppression holds across the whole document, and start a fresh one for
/// each independent session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenEntities {
    entities: BTreeSet<String>,
}

impl SeenEntities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.entities.contains(entity)
    }

    pub fn insert(&mut self, entity: &str) -> bool {
        self.entities.insert(entity.to_string())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(String::as_str)
    }
}

/// Options for single-sentence rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentenceOptions {
    /// Mentions with confidence below this are rendered as plain text
    pub threshold: f64,
    pub hide_repeat: bool,
    pub compact: bool,
}

impl Default for SentenceOptions {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            hide_repeat: false,
            compact: false,
        }
    }
}

/// Converts text plus mentions into role-highlighted markup
///
/// Pure: holds only the read-only colour table.
#[derive(Debug, Clone, Default)]
pub struct Annotator {
    colors: RoleColors,
}

impl Annotator {
    pub fn new(colors: RoleColors) -> Self {
        Self { colors }
    }

    pub fn colors(&self) -> &RoleColors {
        &self.colors
    }

    /// Partition a document into plain and annotated segments
    ///
    /// Mention offsets are char offsets into `text`. Offsets past the end
    /// are clamped; ranges that end up empty are dropped. Reversed offsets
    /// fail the call.
    pub fn document_segments<'a>(
        &self,
        text: &'a str,
        mentions: &'a [Mention],
        hide_repeat: bool,
    ) -> Result<Vec<Segment<'a>>, AnnotateError> {
        let candidates = document_candidates(text, mentions)?;
        let selected = resolve_overlaps(candidates);
        let mut seen = SeenEntities::new();
        Ok(self.render(
            text,
            mentions,
            &selected,
            hide_repeat,
            TooltipStyle::Full,
            &mut seen,
        ))
    }

    /// Annotate a whole document
    pub fn annotate_document(
        &self,
        text: &str,
        mentions: &[Mention],
        hide_repeat: bool,
    ) -> Result<String, AnnotateError> {
        let segments = self.document_segments(text, mentions, hide_repeat)?;
        Ok(segments_to_html(&segments))
    }

    /// Partition one sentence into plain and annotated segments
    ///
    /// Mentions are located by their entity text, not by offsets. `seen`
    /// is read for repeat suppression and updated with every entity
    /// highlighted here.
    pub fn sentence_segments<'a>(
        &self,
        sentence: &'a str,
        mentions: &'a [Mention],
        options: SentenceOptions,
        seen: &mut SeenEntities,
    ) -> Result<Vec<Segment<'a>>, AnnotateError> {
        if options.threshold.is_nan() {
            return Err(AnnotateError::InvalidThreshold(options.threshold));
        }

        let candidates = sentence_candidates(sentence, mentions, options.threshold);
        let selected = resolve_overlaps(candidates);
        let style = if options.compact {
            TooltipStyle::Compact
        } else {
            TooltipStyle::Full
        };
        Ok(self.render(
            sentence,
            mentions,
            &selected,
            options.hide_repeat,
            style,
            seen,
        ))
    }

    /// Annotate one sentence, threading the seen-entities accumulator
    pub fn annotate_sentence(
        &self,
        sentence: &str,
        mentions: &[Mention],
        threshold: f64,
        hide_repeat: bool,
        compact: bool,
        mut seen: SeenEntities,
    ) -> Result<(String, SeenEntities), AnnotateError> {
        let options = SentenceOptions {
            threshold,
            hide_repeat,
            compact,
        };
        let segments = self.sentence_segments(sentence, mentions, options, &mut seen)?;
        let markup = segments_to_html(&segments);
        Ok((markup, seen))
    }

    /// Walk the selected ranges left to right, emitting plain runs between
    /// them. Suppressed repeats stay inside the surrounding plain run.
    fn render<'a>(
        &self,
        text: &'a str,
        mentions: &'a [Mention],
        selected: &[Candidate],
        hide_repeat: bool,
        style: TooltipStyle,
        seen: &mut SeenEntities,
    ) -> Vec<Segment<'a>> {
        let mut segments = Vec::with_capacity(selected.len() * 2 + 1);
        let mut plain_from = 0;

        for candidate in selected {
            let mention = &mentions[candidate.index];
            if hide_repeat && seen.contains(&mention.entity) {
                continue;
            }
            seen.insert(&mention.entity);

            if candidate.start > plain_from {
                segments.push(Segment::Plain(&text[plain_from..candidate.start]));
            }
            let slice = &text[candidate.start..candidate.end];
            segments.push(Segment::Annotated(RenderedSpan::new(
                slice,
                mention,
                &self.colors,
                style,
            )));
            plain_from = candidate.end;
        }

        if plain_from < text.len() {
            segments.push(Segment::Plain(&text[plain_from..]));
        }
        segments
    }
}

/// Annotate a whole document with the default colour table
pub fn annotate_document(
    text: &str,
    mentions: &[Mention],
    hide_repeat: bool,
) -> Result<String, AnnotateError> {
    Annotator::default().annotate_document(text, mentions, hide_repeat)
}

/// Annotate one sentence with the default colour table
pub fn annotate_sentence(
    sentence: &str,
    mentions: &[Mention],
    threshold: f64,
    hide_repeat: bool,
    compact: bool,
    seen: SeenEntities,
) -> Result<(String, SeenEntities), AnnotateError> {
    Annotator::default().annotate_sentence(sentence, mentions, threshold, hide_repeat, compact, seen)
}

fn document_candidates(text: &str, mentions: &[Mention]) -> Result<Vec<Candidate>, AnnotateError> {
    let offsets = CharOffsets::new(text);
    let mut candidates = Vec::with_capacity(mentions.len());

    for (index, mention) in mentions.iter().enumerate() {
        if mention.start > mention.end {
            return Err(AnnotateError::ReversedOffsets {
                entity: mention.entity.clone(),
                start: mention.start,
                end: mention.end,
            });
        }

        if mention.end > offsets.char_len() {
            debug!(
                entity = %mention.entity,
                end = mention.end,
                text_len = offsets.char_len(),
                "Clamping mention past end of text"
            );
        }

        let candidate = Candidate {
            start: offsets.to_byte(mention.start),
            end: offsets.to_byte(mention.end),
            index,
        };
        if candidate.is_empty() {
            debug!(entity = %mention.entity, "Dropping empty mention range");
            continue;
        }
        candidates.push(candidate);
    }

    Ok(candidates)
}

/// Occurrences of every eligible mention's entity text in the sentence
///
/// When some mentions of an entity carry this sentence as their context,
/// the entity's other mentions are ignored here, whatever their
/// confidence. The threshold then applies to the mentions that remain.
fn sentence_candidates(sentence: &str, mentions: &[Mention], threshold: f64) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for (index, mention) in mentions.iter().enumerate() {
        if mention.entity.is_empty() {
            continue;
        }
        let scoped = mentions
            .iter()
            .any(|other| other.entity == mention.entity && other.is_in_sentence(sentence));
        if scoped && !mention.is_in_sentence(sentence) {
            continue;
        }
        if mention.confidence() < threshold {
            continue;
        }

        candidates.extend(
            find_entity_occurrences(sentence, &mention.entity)
                .into_iter()
                .map(|(start, end)| Candidate { start, end, index }),
        );
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MainRole;

    #[test]
    fn test_reversed_offsets_fail() {
        let mentions = vec![Mention::new("Alice", 5, 0, MainRole::Protagonist)];
        let err = annotate_document("Alice met Bob.", &mentions, false).unwrap_err();
        assert!(matches!(err, AnnotateError::ReversedOffsets { start: 5, end: 0, .. }));
    }

    #[test]
    fn test_out_of_range_mention_is_clamped() {
        let text = "Hi Bob";
        let mentions = vec![Mention::new("Bob", 3, 40, MainRole::Antagonist)];
        let segments = Annotator::default()
            .document_segments(text, &mentions, false)
            .unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].text(), "Bob");
        assert!(segments[1].is_annotated());
    }

    #[test]
    fn test_mention_entirely_past_end_is_dropped() {
        let mentions = vec![Mention::new("Ghost", 50, 55, MainRole::Unknown)];
        let html = annotate_document("short", &mentions, false).unwrap();
        assert_eq!(html, "short");
    }

    #[test]
    fn test_suppressed_repeat_merges_into_plain_run() {
        let text = "Bob and Bob";
        let mentions = vec![
            Mention::new("Bob", 0, 3, MainRole::Antagonist),
            Mention::new("Bob", 8, 11, MainRole::Antagonist),
        ];
        let segments = Annotator::default()
            .document_segments(text, &mentions, true)
            .unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1], Segment::Plain(" and Bob"));
    }

    #[test]
    fn test_nan_threshold_fails() {
        let result = annotate_sentence("Bob left.", &[], f64::NAN, false, false, SeenEntities::new());
        assert!(matches!(result, Err(AnnotateError::InvalidThreshold(_))));
    }

    #[test]
    fn test_sentence_prefers_context_matched_mention() {
        let sentence = "Bob rescued the hostages.";
        let mentions = vec![
            Mention::new("Bob", 0, 3, MainRole::Antagonist).with_sentence("Bob robbed a bank."),
            Mention::new("Bob", 40, 43, MainRole::Protagonist).with_sentence(sentence),
        ];
        let mut seen = SeenEntities::new();
        let segments = Annotator::default()
            .sentence_segments(sentence, &mentions, SentenceOptions::default(), &mut seen)
            .unwrap();

        match &segments[0] {
            Segment::Annotated(span) => assert_eq!(span.role, MainRole::Protagonist),
            other => panic!("Expected annotated segment, got {:?}", other),
        }
        assert!(seen.contains("Bob"));
    }
}
