//! Rendered segments, tooltips and HTML output.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::domain::{MainRole, Mention, RoleColors};

/// How much detail goes into a span's tooltip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TooltipStyle {
    /// Main role plus every fine role with its confidence
    #[default]
    Full,
    /// Fine role names only, for space-constrained inline display
    Compact,
}

/// A highlighted slice of text
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSpan<'a> {
    pub text: &'a str,
    pub entity: &'a str,
    pub role: MainRole,
    pub color: String,
    pub tooltip: String,
}

impl<'a> RenderedSpan<'a> {
    pub fn new(
        text: &'a str,
        mention: &'a Mention,
        colors: &RoleColors,
        style: TooltipStyle,
    ) -> Self {
        Self {
            text,
            entity: &mention.entity,
            role: mention.main_role,
            color: colors.color_for(mention.main_role).to_string(),
            tooltip: tooltip(mention, style),
        }
    }

    pub fn to_html(&self) -> String {
        let color = encode_double_quoted_attribute(&self.color);
        format!(
            r#"<span class="franx-entity franx-{}" style="background-color:{};border:1px solid {};border-radius:4px;padding:0 2px;" title="{}">{}</span>"#,
            self.role.slug(),
            color,
            color,
            encode_double_quoted_attribute(&self.tooltip),
            encode_text(self.text)
        )
    }
}

/// One piece of the output partition
#[derive(Debug, Clone, PartialEq)]
pub enum Segment<'a> {
    Plain(&'a str),
    Annotated(RenderedSpan<'a>),
}

impl<'a> Segment<'a> {
    /// The underlying source text, without markup
    pub fn text(&self) -> &'a str {
        match self {
            Segment::Plain(text) => *text,
            Segment::Annotated(span) => span.text,
        }
    }

    pub fn is_annotated(&self) -> bool {
        matches!(self, Segment::Annotated(_))
    }

    pub fn to_html(&self) -> String {
        match self {
            Segment::Plain(text) => escape_text(text),
            Segment::Annotated(span) => span.to_html(),
        }
    }
}

/// Join segments into one markup string
pub fn segments_to_html(segments: &[Segment<'_>]) -> String {
    segments.iter().map(Segment::to_html).collect()
}

/// HTML-escape plain text content
pub fn escape_text(text: &str) -> String {
    encode_text(text).into_owned()
}

/// Build the tooltip text for a mention
///
/// Full: `"Protagonist | Guardian (0.820), Virtuous (0.790)"`.
/// Compact: `"Guardian, Virtuous"`. Fine roles are ordered by descending
/// confidence, then label; roles without a score come last.
pub fn tooltip(mention: &Mention, style: TooltipStyle) -> String {
    let mut scored: Vec<(&str, f64)> = Vec::new();
    let mut unscored: Vec<&str> = Vec::new();
    for label in &mention.fine_roles {
        match mention.fine_scores.get(label) {
            Some(score) => scored.push((label.as_str(), score)),
            None => unscored.push(label.as_str()),
        }
    }
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    if scored.is_empty() && unscored.is_empty() {
        return mention.main_role.to_string();
    }

    match style {
        TooltipStyle::Compact => scored
            .iter()
            .map(|(label, _)| *label)
            .chain(unscored.iter().copied())
            .collect::<Vec<_>>()
            .join(", "),
        TooltipStyle::Full => {
            let roles = scored
                .iter()
                .map(|(label, score)| format!("{} ({:.3})", label, score))
                .chain(unscored.iter().map(|label| format!("{} (—)", label)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} | {}", mention.main_role, roles)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tooltip_full_sorted_by_confidence() {
        let mention = Mention::new("Alice", 0, 5, MainRole::Protagonist)
            .with_fine_role("Virtuous", 0.79)
            .with_fine_role("Guardian", 0.82);

        assert_eq!(
            tooltip(&mention, TooltipStyle::Full),
            "Protagonist | Guardian (0.820), Virtuous (0.790)"
        );
        assert_eq!(tooltip(&mention, TooltipStyle::Compact), "Guardian, Virtuous");
    }

    #[test]
    fn test_tooltip_unscored_roles_last() {
        let mut mention = Mention::new("Bob", 0, 3, MainRole::Antagonist).with_fine_role("Tyrant", 0.5);
        mention.fine_roles.insert(0, "Saboteur".to_string());

        assert_eq!(
            tooltip(&mention, TooltipStyle::Full),
            "Antagonist | Tyrant (0.500), Saboteur (—)"
        );
    }

    #[test]
    fn test_tooltip_without_fine_roles() {
        let mention = Mention::new("Carol", 0, 5, MainRole::Innocent);
        assert_eq!(tooltip(&mention, TooltipStyle::Full), "Innocent");
        assert_eq!(tooltip(&mention, TooltipStyle::Compact), "Innocent");
    }

    #[test]
    fn test_span_html_escapes_text_and_title() {
        let mention = Mention::new("A&B", 0, 3, MainRole::Antagonist).with_fine_role("\"Spy\"", 0.9);
        let span = RenderedSpan::new("A&B", &mention, &RoleColors::default(), TooltipStyle::Full);
        let html = span.to_html();

        assert!(html.contains(">A&amp;B</span>"));
        assert!(html.contains("&quot;Spy&quot;"));
        assert!(html.contains("franx-antagonist"));
        assert!(html.contains("background-color:#f4a1a1"));
    }

    #[test]
    fn test_segment_text_roundtrip() {
        let mention = Mention::new("Bob", 0, 3, MainRole::Antagonist);
        let segments = vec![
            Segment::Annotated(RenderedSpan::new(
                "Bob",
                &mention,
                &RoleColors::default(),
                TooltipStyle::Compact,
            )),
            Segment::Plain(" <left>"),
        ];
        let text: String = segments.iter().map(Segment::text).collect();
        assert_eq!(text, "Bob <left>");
        assert!(segments_to_html(&segments).ends_with(" &lt;left&gt;"));
    }
}
