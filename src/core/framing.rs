//! Framing analytics over a label set.
//!
//! Summaries an analyst reads next to the annotated article: which roles
//! dominate, which fine roles back them up, and the sentences each role
//! appears in.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::annotate::{
    escape_text, role_header, AnnotateError, Annotator, SeenEntities, SentenceOptions,
};
use crate::domain::{LabelSet, MainRole};

/// One mention that passed the confidence threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FramingRow {
    pub entity: String,
    pub main_role: MainRole,
    /// Title-cased fine roles
    pub fine_roles: Vec<String>,
    pub confidence: f64,
    pub start: usize,
    pub end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentence: Option<String>,
}

/// Rows for every mention with confidence at or above `threshold`
pub fn framing_rows(labels: &LabelSet, threshold: f64) -> Vec<FramingRow> {
    labels
        .mentions()
        .iter()
        .filter(|m| m.confidence() >= threshold)
        .map(|m| FramingRow {
            entity: m.entity.clone(),
            main_role: m.main_role,
            fine_roles: m.fine_roles.iter().map(|r| title_case(r)).collect(),
            confidence: m.confidence(),
            start: m.start,
            end: m.end,
            sentence: m.sentence.clone(),
        })
        .collect()
}

/// Mention count per role, most frequent first
pub fn role_distribution(rows: &[FramingRow]) -> Vec<(MainRole, usize)> {
    let mut counts: BTreeMap<MainRole, usize> = BTreeMap::new();
    for row in rows {
        *counts.entry(row.main_role).or_default() += 1;
    }
    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

/// Fine role counts within each main role
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FineRoleCount {
    pub main_role: MainRole,
    pub fine_role: String,
    pub count: usize,
}

/// Count of each fine role per main role, grouped by role then most
/// frequent first
pub fn fine_role_breakdown(rows: &[FramingRow]) -> Vec<FineRoleCount> {
    let mut counts: HashMap<(MainRole, &str), usize> = HashMap::new();
    for row in rows {
        for fine in &row.fine_roles {
            *counts.entry((row.main_role, fine.as_str())).or_default() += 1;
        }
    }

    let mut breakdown: Vec<FineRoleCount> = counts
        .into_iter()
        .map(|((main_role, fine_role), count)| FineRoleCount {
            main_role,
            fine_role: fine_role.to_string(),
            count,
        })
        .collect();
    breakdown.sort_by(|a, b| {
        a.main_role
            .cmp(&b.main_role)
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| a.fine_role.cmp(&b.fine_role))
    });
    breakdown
}

/// Distinct sentences per role, in first-seen order
pub fn sentences_by_role(rows: &[FramingRow]) -> BTreeMap<MainRole, Vec<String>> {
    let mut by_role: BTreeMap<MainRole, Vec<String>> = BTreeMap::new();
    for row in rows {
        let Some(sentence) = row.sentence.as_deref() else {
            continue;
        };
        let sentences = by_role.entry(row.main_role).or_default();
        if !sentences.iter().any(|s| s == sentence) {
            sentences.push(sentence.to_string());
        }
    }
    by_role
}

/// Number of distinct (sentence, fine roles) pairs for one role
///
/// This is the count shown in each role's header.
pub fn role_label_count(rows: &[FramingRow], role: MainRole) -> usize {
    let mut pairs: Vec<(Option<&str>, &[String])> = Vec::new();
    for row in rows.iter().filter(|r| r.main_role == role) {
        let pair = (row.sentence.as_deref(), row.fine_roles.as_slice());
        if !pairs.contains(&pair) {
            pairs.push(pair);
        }
    }
    pairs.len()
}

/// Distinct fine roles seen under one main role, sorted
pub fn fine_roles_for(rows: &[FramingRow], role: MainRole) -> Vec<String> {
    rows.iter()
        .filter(|r| r.main_role == role)
        .flat_map(|r| r.fine_roles.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct sentences, in first-seen order, where `role` mentions carry
/// the fine role `fine` (compared after title-casing)
pub fn sentences_by_fine_role(rows: &[FramingRow], role: MainRole, fine: &str) -> Vec<String> {
    let fine = title_case(fine.trim());
    let mut sentences: Vec<String> = Vec::new();
    for row in rows
        .iter()
        .filter(|r| r.main_role == role && r.fine_roles.contains(&fine))
    {
        let Some(sentence) = row.sentence.as_deref() else {
            continue;
        };
        if !sentences.iter().any(|s| s == sentence) {
            sentences.push(sentence.to_string());
        }
    }
    sentences
}

/// Annotate a list of sentences in order
///
/// Every mention in `labels` can be highlighted, whatever section the
/// sentences belong to. One fresh [`SeenEntities`] is threaded through the
/// whole list, so with `hide_repeat` an entity is highlighted once per
/// list.
pub fn render_role_sentences(
    annotator: &Annotator,
    sentences: &[String],
    labels: &LabelSet,
    options: SentenceOptions,
) -> Result<Vec<String>, AnnotateError> {
    let mut seen = SeenEntities::new();
    let mut rendered = Vec::with_capacity(sentences.len());
    for sentence in sentences {
        let (markup, next) = annotator.annotate_sentence(
            sentence,
            labels.mentions(),
            options.threshold,
            options.hide_repeat,
            options.compact,
            seen,
        )?;
        seen = next;
        rendered.push(markup);
    }
    Ok(rendered)
}

/// Drill-down block for one fine role under one main role
///
/// Sentences are rendered with compact tooltips and their own accumulator.
pub fn render_fine_role_section(
    annotator: &Annotator,
    role: MainRole,
    fine: &str,
    rows: &[FramingRow],
    labels: &LabelSet,
    options: SentenceOptions,
) -> Result<String, AnnotateError> {
    let sentences = sentences_by_fine_role(rows, role, fine);
    let compact = SentenceOptions {
        compact: true,
        ..options
    };

    let mut out = format!(
        "<div class=\"franx-fine-header\"><strong>{}</strong> — {} sentence(s):</div>\n",
        escape_text(&title_case(fine.trim())),
        sentences.len()
    );
    for markup in render_role_sentences(annotator, &sentences, labels, compact)? {
        out.push_str("<p class=\"franx-sentence franx-compact\">");
        out.push_str(&markup);
        out.push_str("</p>\n");
    }
    Ok(out)
}

/// Header plus annotated sentence list for every role that has sentences
///
/// `labels` should already be filtered to the enabled roles; all of them
/// are highlighted in every section. A role with a single fine role gets a
/// note naming it. With `fine_role`, roles that have several fine roles
/// including it also get a compact drill-down for that fine role.
pub fn render_sentence_report(
    annotator: &Annotator,
    labels: &LabelSet,
    options: SentenceOptions,
    fine_role: Option<&str>,
) -> Result<String, AnnotateError> {
    let rows = framing_rows(labels, options.threshold);
    let mut out = String::new();

    for (role, sentences) in sentences_by_role(&rows) {
        let count = role_label_count(&rows, role);
        out.push_str(&role_header(role, count, annotator.colors()));
        out.push('\n');
        for markup in render_role_sentences(annotator, &sentences, labels, options)? {
            out.push_str("<p class=\"franx-sentence\">");
            out.push_str(&markup);
            out.push_str("</p>\n");
        }

        let fine_roles = fine_roles_for(&rows, role);
        if let [only] = fine_roles.as_slice() {
            out.push_str(&format!(
                "<p class=\"franx-note\">All annotations of this main role are of type: {}</p>\n",
                escape_text(only)
            ));
            continue;
        }
        if let Some(fine) = fine_role {
            if fine_roles.contains(&title_case(fine.trim())) {
                out.push_str(&render_fine_role_section(
                    annotator, role, fine, &rows, labels, options,
                )?);
            }
        }
    }
    Ok(out)
}

/// Capitalise the first letter of each word and lowercase the rest
///
/// A word starts after any non-alphabetic character, so
/// `"self-serving"` becomes `"Self-Serving"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
