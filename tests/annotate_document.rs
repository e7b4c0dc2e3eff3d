//! Whole-document annotation tests.
//!
//! Covers highlighting, escaping, overlap resolution and repeat
//! suppression through the public API.

use franx::annotate::{Annotator, Segment};
use franx::{annotate_document, MainRole, Mention, RoleColors};

/// Strip generated span tags, leaving escaped text
fn strip_tags(html: &str) -> String {
    let mut out = String::new();
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn alice_and_bob() -> Vec<Mention> {
    vec![
        Mention::new("Alice", 0, 5, MainRole::Protagonist),
        Mention::new("Bob", 10, 13, MainRole::Antagonist),
    ]
}

#[test]
fn test_alice_met_bob() {
    let html = annotate_document("Alice met Bob.", &alice_and_bob(), false).unwrap();

    assert!(html.starts_with(r#"<span class="franx-entity franx-protagonist""#));
    assert!(html.contains(">Alice</span> met <span"));
    assert!(html.contains(r#"class="franx-entity franx-antagonist""#));
    assert!(html.ends_with(">Bob</span>."));
    assert_eq!(html.matches("<span").count(), 2);
    assert_eq!(strip_tags(&html), "Alice met Bob.");
}

#[test]
fn test_role_colors_applied() {
    let html = annotate_document("Alice met Bob.", &alice_and_bob(), false).unwrap();
    assert!(html.contains("background-color:#a1f4a1"));
    assert!(html.contains("background-color:#f4a1a1"));

    let colors = RoleColors::empty("#999999").with_color(MainRole::Protagonist, "gold");
    let html = Annotator::new(colors)
        .annotate_document("Alice met Bob.", &alice_and_bob(), false)
        .unwrap();
    assert!(html.contains("background-color:gold"));
    assert!(html.contains("background-color:#999999"));
}

#[test]
fn test_duplicate_range_with_hide_repeat() {
    let mentions = vec![
        Mention::new("Alice", 0, 5, MainRole::Protagonist),
        Mention::new("Alice", 0, 5, MainRole::Protagonist),
    ];
    let html = annotate_document("Alice met Bob.", &mentions, true).unwrap();

    assert_eq!(html.matches("<span").count(), 1);
    assert_eq!(strip_tags(&html), "Alice met Bob.");
}

#[test]
fn test_repeat_suppression() {
    let text = "Bob called. Later Bob left.";
    let mentions = vec![
        Mention::new("Bob", 18, 21, MainRole::Antagonist),
        Mention::new("Bob", 0, 3, MainRole::Antagonist),
    ];

    let hidden = annotate_document(text, &mentions, true).unwrap();
    assert_eq!(hidden.matches("<span").count(), 1);
    assert!(hidden.starts_with("<span"));
    assert!(hidden.ends_with("Later Bob left."));

    let shown = annotate_document(text, &mentions, false).unwrap();
    assert_eq!(shown.matches("<span").count(), 2);
}

#[test]
fn test_overlap_prefers_earliest_start() {
    let text = "New York City Council";
    let mentions = vec![
        Mention::new("York City Council", 4, 21, MainRole::Innocent),
        Mention::new("New York", 0, 8, MainRole::Protagonist),
    ];
    let segments = Annotator::default()
        .document_segments(text, &mentions, false)
        .unwrap();

    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].text(), "New York");
    assert_eq!(segments[1], Segment::Plain(" City Council"));
}

#[test]
fn test_overlap_prefers_longest_then_input_order() {
    let text = "New York City";
    let mentions = vec![
        Mention::new("New York", 0, 8, MainRole::Protagonist),
        Mention::new("New York City", 0, 13, MainRole::Antagonist),
        Mention::new("New York City", 0, 13, MainRole::Innocent),
    ];
    let html = annotate_document(text, &mentions, false).unwrap();

    assert_eq!(html.matches("<span").count(), 1);
    assert!(html.contains("franx-antagonist"));
    assert_eq!(strip_tags(&html), text);
}

#[test]
fn test_text_is_escaped() {
    let text = "<b>Tom & \"Jerry\"</b>";
    let mentions = vec![Mention::new("Tom", 3, 6, MainRole::Innocent)];
    let html = annotate_document(text, &mentions, false).unwrap();

    assert!(html.starts_with("&lt;b&gt;<span"));
    assert!(html.contains(">Tom</span> &amp; "));
    assert!(!html.contains("<b>"));
}

#[test]
fn test_empty_inputs() {
    assert_eq!(annotate_document("", &[], false).unwrap(), "");
    assert_eq!(
        annotate_document("", &alice_and_bob(), true).unwrap(),
        ""
    );
    assert_eq!(annotate_document("a < b", &[], false).unwrap(), "a &lt; b");
}

#[test]
fn test_multibyte_offsets_are_chars() {
    let text = "Zoë visited Ørsted.";
    let mentions = vec![
        Mention::new("Zoë", 0, 3, MainRole::Protagonist),
        Mention::new("Ørsted", 12, 18, MainRole::Antagonist),
    ];
    let segments = Annotator::default()
        .document_segments(text, &mentions, false)
        .unwrap();

    let annotated: Vec<&str> = segments
        .iter()
        .filter(|s| s.is_annotated())
        .map(|s| s.text())
        .collect();
    assert_eq!(annotated, vec!["Zoë", "Ørsted"]);
    let rebuilt: String = segments.iter().map(|s| s.text()).collect();
    assert_eq!(rebuilt, text);
}

#[test]
fn test_tooltip_lists_fine_roles() {
    let mentions = vec![Mention::new("Alice", 0, 5, MainRole::Protagonist)
        .with_fine_role("Virtuous", 0.79)
        .with_fine_role("Guardian", 0.82)];
    let html = annotate_document("Alice met Bob.", &mentions, false).unwrap();

    assert!(html.contains(r#"title="Protagonist | Guardian (0.820), Virtuous (0.790)""#));
}

#[test]
fn test_overlap_chains_through_dropped_range() {
    let text = "abcdefghij";
    let mentions = vec![
        Mention::new("abcde", 0, 5, MainRole::Protagonist),
        Mention::new("defghij", 3, 10, MainRole::Antagonist),
        Mention::new("gh", 6, 8, MainRole::Innocent),
    ];
    let html = annotate_document(text, &mentions, false).unwrap();

    assert_eq!(html.matches("<span").count(), 1);
    assert!(html.ends_with(">abcde</span>fghij"));
}
