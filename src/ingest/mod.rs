//! Label ingest.
//!
//! The validation boundary between loosely-typed label files and the typed
//! domain model:
//!
//! 1. **Literal**: parses text-encoded lists and dicts (Python or JSON form)
//! 2. **Records**: loads CSV, JSON and JSONL label rows into a [`LabelSet`]
//!    and writes predictions back out as JSONL
//!
//! Nothing downstream of this module handles text-encoded collections.
//!
//! [`LabelSet`]: crate::domain::LabelSet

pub mod literal;
pub mod records;

pub use literal::{parse_label_list, parse_literal, parse_score_map, Literal, LiteralError};
pub use records::{
    load_labels, read_csv, read_json, read_jsonl, to_jsonl, write_jsonl, IngestError, LabelFormat,
    LoadOptions,
};
