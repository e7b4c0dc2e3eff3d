//! Article text from a web page.
//!
//! The page is fetched with a plain GET and reduced to the text of its
//! `<p>` elements, one paragraph per line.

use std::time::Duration;

use anyhow::{Context, Result};
use scraper::{Html, Selector};
use tokio::time::timeout;
use tracing::{info, warn};

/// Text of every `<p>` element in document order, joined with newlines
pub fn extract_paragraphs(html: &str) -> Result<String> {
    let selector =
        Selector::parse("p").map_err(|e| anyhow::anyhow!("Invalid paragraph selector: {}", e))?;
    let document = Html::parse_document(html);

    let paragraphs: Vec<String> = document
        .select(&selector)
        .map(|p| p.text().collect::<String>())
        .collect();
    Ok(paragraphs.join("\n"))
}

/// Fetch a page and extract its article text
///
/// An empty result is returned as-is with a warning; callers decide
/// whether that is an error.
pub async fn fetch_article(url: &str, limit: Duration) -> Result<String> {
    info!(url, "Fetching article");
    let request = reqwest::Client::new().get(url).send();

    let response = timeout(limit, request)
        .await
        .with_context(|| format!("Fetching {} timed out after {:?}", url, limit))?
        .with_context(|| format!("Failed to fetch {}", url))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("Fetching {} failed ({})", url, status);
    }

    let body = response
        .text()
        .await
        .with_context(|| format!("Failed to read page body from {}", url))?;
    let article = extract_paragraphs(&body)?;

    if article.trim().is_empty() {
        warn!(url, "Could not extract meaningful content from the page");
    }
    Ok(article)
}
