//! Span computation for annotation
//!
//! Locates mentions in text and resolves overlapping ranges into a single
//! non-overlapping left-to-right partition.
//!
//! # Overlap clusters
//!
//! Overlap is transitive across candidates: with (0,5), (3,10) and (6,8),
//! the dropped (3,10) links (6,8) to (0,5), so only (0,5) is rendered even
//! though it does not touch (6,8). A cluster ends only where no earlier
//! candidate, rendered or not, reaches past the next start.
//!
//! # Offsets
//!
//! - Mention offsets are character offsets; they are converted to byte
//!   offsets once per render and clamped to the text length
//! - Sentence lookups find entity text directly and work in bytes
//! - Every range handed to the renderer lies on UTF-8 boundaries

/// Character to byte offset table for one text
#[derive(Debug, Clone)]
pub struct CharOffsets {
    /// `bytes[i]` is the byte offset of char `i`; the last entry is `text.len()`
    bytes: Vec<usize>,
}

impl CharOffsets {
    pub fn new(text: &str) -> Self {
        let mut bytes: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        bytes.push(text.len());
        Self { bytes }
    }

    /// Number of characters in the text
    pub fn char_len(&self) -> usize {
        self.bytes.len() - 1
    }

    /// Byte offset of a char offset, clamped to the end of the text
    pub fn to_byte(&self, char_offset: usize) -> usize {
        let idx = char_offset.min(self.char_len());
        self.bytes[idx]
    }
}

/// A range eligible for highlighting
///
/// `index` is the position of the originating mention in the caller's
/// input and is the final tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub start: usize,
    pub end: usize,
    pub index: usize,
}

impl Candidate {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Pick a non-overlapping subset of candidates
///
/// Candidates are ordered by earliest start, then longest extent, then
/// input order. Ranges connected by overlap form one cluster and only the
/// first of each cluster in that order is kept; dropped ranges still extend
/// their cluster. The result is sorted by
/// start and no two ranges intersect.
pub fn resolve_overlaps(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.retain(|c| !c.is_empty());
    candidates.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| b.len().cmp(&a.len()))
            .then_with(|| a.index.cmp(&b.index))
    });

    let mut selected: Vec<Candidate> = Vec::with_capacity(candidates.len());
    let mut cluster_end = 0;
    for candidate in candidates {
        if candidate.start >= cluster_end {
            selected.push(candidate);
        }
        cluster_end = cluster_end.max(candidate.end);
    }
    selected
}

/// Find whole-word occurrences of `needle` in `haystack`
///
/// Returns (start, end) byte pairs. A match counts when the characters on
/// either side of it, if any, are not alphanumeric, so "Bob" is not found
/// inside "Bobby".
pub fn find_entity_occurrences(haystack: &str, needle: &str) -> Vec<(usize, usize)> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return Vec::new();
    }

    haystack
        .match_indices(needle)
        .map(|(start, m)| (start, start + m.len()))
        .filter(|&(start, end)| is_word_bounded(haystack, start, end))
        .collect()
}

fn is_word_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}
