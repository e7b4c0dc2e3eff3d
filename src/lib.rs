//! franx - Entity framing annotator
//!
//! Highlights named entities in news articles by the framing role they
//! play (Protagonist, Antagonist, Innocent or Unknown), with fine-grained
//! role confidences in each highlight's tooltip.
//!
//! # Architecture
//!
//! Labels come from two external models and flow one way:
//! - Stage 1 extracts entity spans with main-role probabilities
//! - Stage 2 scores fine roles for each mention in its sentence
//! - The annotator turns text plus labels into escaped, non-overlapping
//!   HTML highlights
//!
//! # Modules
//!
//! - `domain`: Data structures (MainRole, Mention, LabelSet)
//! - `annotate`: Span annotation and HTML rendering
//! - `ingest`: Label file loading and literal parsing
//! - `core`: Prediction pipeline and framing analytics
//! - `adapters`: Model-serving integrations
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Highlight an article from stage-2 output
//! franx annotate --text article.txt --labels predictions.csv --article EN_10001 --page
//!
//! # Per-role sentence view, hiding repeated entities
//! franx sentences --labels predictions.csv --threshold 0.5 --hide-repeat
//!
//! # Highlight an article fetched from a web page
//! franx annotate --url https://news.example/story --labels predictions.csv
//!
//! # Drill into one fine role under each main role
//! franx sentences --labels predictions.csv --fine-role Tyrant
//!
//! # Run both models and save labels
//! franx predict --text article.txt --article-id EN_10001 --output labels.jsonl
//! ```

pub mod adapters;
pub mod annotate;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod ingest;

// Re-export main types at crate root for convenience
pub use annotate::{annotate_document, annotate_sentence, AnnotateError, Annotator, SeenEntities};
pub use crate::core::{Prediction, Predictor};
pub use domain::{FineScores, LabelSet, MainRole, Mention, RoleColors, RoleFilter};
pub use ingest::{load_labels, IngestError, LoadOptions};
