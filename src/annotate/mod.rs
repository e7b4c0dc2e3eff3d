//! Span annotation.
//!
//! Turns text plus entity mentions into HTML in which every rendered
//! mention is wrapped in a role-coloured span carrying a fine-role tooltip.
//!
//! ## Guarantees
//!
//! - All source text is HTML-escaped; only generated tags are raw
//! - Rendered spans never nest or cross, and stripping the tags gives
//!   back the source text exactly
//! - One range is rendered per overlapping cluster, chosen by earliest
//!   start, then longest extent, then input order
//! - Repeat suppression state is an explicit [`SeenEntities`] value owned
//!   by the caller
//!
//! ## Usage
//!
//! ```
//! use franx::annotate::annotate_document;
//! use franx::domain::{MainRole, Mention};
//!
//! let mentions = vec![
//!     Mention::new("Alice", 0, 5, MainRole::Protagonist),
//!     Mention::new("Bob", 10, 13, MainRole::Antagonist),
//! ];
//! let html = annotate_document("Alice met Bob.", &mentions, false).unwrap();
//! assert!(html.contains(">Alice</span> met <span"));
//! ```

pub mod annotator;
pub mod page;
pub mod render;
pub mod spans;

pub use annotator::{
    annotate_document, annotate_sentence, AnnotateError, Annotator, SeenEntities,
    SentenceOptions,
};
pub use page::{render_page, role_header};
pub use render::{escape_text, segments_to_html, tooltip, RenderedSpan, Segment, TooltipStyle};
pub use spans::{find_entity_occurrences, resolve_overlaps, Candidate, CharOffsets};
