//! Standalone page and per-role header rendering.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::domain::{MainRole, RoleColors};

/// Wrap annotated markup in a complete HTML document
///
/// Body text keeps its line breaks; a legend lists each role's colour.
pub fn render_page(title: &str, body: &str, colors: &RoleColors) -> String {
    let legend: String = MainRole::ALL
        .iter()
        .map(|role| {
            format!(
                r#"<span class="franx-entity franx-{}" style="background-color:{};border-radius:4px;padding:0 4px;margin-right:6px;">{}</span>"#,
                role.slug(),
                encode_double_quoted_attribute(colors.color_for(*role)),
                role
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; max-width: 60em; margin: 2em auto; line-height: 1.6; }}
.franx-legend {{ margin-bottom: 1em; }}
.franx-text {{ white-space: pre-wrap; }}
.franx-role-header {{ padding: 4px 8px; border-radius: 4px; font-weight: bold; margin: 1em 0 0.5em; }}
</style>
</head>
<body>
<div class="franx-legend">{legend}</div>
<div class="franx-text">{body}</div>
</body>
</html>
"#,
        title = encode_text(title),
        legend = legend,
        body = body
    )
}

/// Coloured header shown above a role's sentence list
pub fn role_header(role: MainRole, count: usize, colors: &RoleColors) -> String {
    let noun = if count == 1 { "label" } else { "labels" };
    format!(
        r#"<div class="franx-role-header franx-{}" style="background-color:{};">{} — {} {}</div>"#,
        role.slug(),
        encode_double_quoted_attribute(colors.color_for(role)),
        role,
        count,
        noun
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_header() {
        let html = role_header(MainRole::Antagonist, 3, &RoleColors::default());
        assert!(html.contains("Antagonist — 3 labels"));
        assert!(html.contains("background-color:#f4a1a1"));

        let single = role_header(MainRole::Innocent, 1, &RoleColors::default());
        assert!(single.contains("Innocent — 1 label<"));
    }

    #[test]
    fn test_render_page_embeds_body_and_legend() {
        let colors = RoleColors::empty("#123456");
        let page = render_page("News <1>", "Alice &amp; Bob", &colors);

        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<title>News &lt;1&gt;</title>"));
        assert!(page.contains(r#"<div class="franx-text">Alice &amp; Bob</div>"#));
        assert_eq!(page.matches("background-color:#123456").count(), 4);
    }
}
