//! Label record files: loading and writing.
//!
//! A label record is one row of stage-2 output: an entity mention with its
//! main role, margin-selected fine roles and fine-role scores. Records are
//! read from `.csv`, `.json` (array of objects) or `.jsonl` files and
//! validated into [`Mention`]s.
//!
//! CSV rows that fail validation are skipped with a warning so one bad row
//! does not lose an article. JSON input is machine-written, so a bad record
//! fails the load.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{FineScores, LabelSet, MainRole, Mention};

use super::literal::{parse_label_list, parse_score_map, LiteralError};

/// Column names, preferred first
const ARTICLE_ID: &[&str] = &["article_id"];
const ENTITY: &[&str] = &["entity_mention", "entity"];
const START: &[&str] = &["start_offset", "start"];
const END: &[&str] = &["end_offset", "end"];
const MAIN_ROLE: &[&str] = &["p_main_role", "main_role"];
const FINE_ROLES: &[&str] = &["predicted_fine_margin", "fine_roles"];
const FINE_SCORES: &[&str] = &[
    "predicted_fine_with_scores",
    "p_fine_roles_w_conf",
    "fine_scores",
];
const CONFIDENCE: &[&str] = &["confidence"];
const SENTENCE: &[&str] = &["context", "sentence"];

/// Errors raised while loading label records
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Line {line}: missing required field '{field}'")]
    MissingField { line: usize, field: &'static str },

    #[error("Line {line}: field '{field}' is not a valid offset: {value}")]
    InvalidOffset {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("Line {line}: reversed offsets, start {start} > end {end}")]
    ReversedOffsets { line: usize, start: usize, end: usize },

    #[error("Line {line}: field '{field}' has unexpected type: {found}")]
    InvalidField {
        line: usize,
        field: &'static str,
        found: String,
    },

    #[error("Line {line}: malformed '{field}': {source}")]
    Literal {
        line: usize,
        field: &'static str,
        #[source]
        source: LiteralError,
    },

    #[error("Line {line}: score for '{label}' is not finite")]
    NonFiniteScore { line: usize, label: String },

    #[error("Line {line}: record is not a JSON object")]
    NotAnObject { line: usize },

    #[error("Line {line}: invalid JSON: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported label file format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Label file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelFormat {
    Csv,
    Json,
    Jsonl,
}

impl LabelFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(LabelFormat::Csv),
            "json" => Some(LabelFormat::Json),
            "jsonl" | "ndjson" => Some(LabelFormat::Jsonl),
            _ => None,
        }
    }
}

/// Options applied while loading
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Keep only records for this article
    pub article_id: Option<String>,
}

impl LoadOptions {
    pub fn for_article(article_id: impl Into<String>) -> Self {
        Self {
            article_id: Some(article_id.into()),
        }
    }

    fn admits(&self, mention: &Mention) -> bool {
        match &self.article_id {
            Some(id) => mention.article_id.as_deref() == Some(id.as_str()),
            None => true,
        }
    }
}

/// Load a label file, detecting the format from its extension
pub fn load_labels(path: &Path, options: &LoadOptions) -> Result<LabelSet, IngestError> {
    let format =
        LabelFormat::from_path(path).ok_or_else(|| IngestError::UnsupportedFormat(path.to_path_buf()))?;
    debug!(path = %path.display(), ?format, "Loading labels");

    match format {
        LabelFormat::Csv => read_csv(std::fs::File::open(path)?, options),
        LabelFormat::Json => read_json(&std::fs::read_to_string(path)?, options),
        LabelFormat::Jsonl => read_jsonl(&std::fs::read_to_string(path)?, options),
    }
}

/// Read CSV label records, skipping rows that fail validation
pub fn read_csv<R: Read>(reader: R, options: &LoadOptions) -> Result<LabelSet, IngestError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers()?.clone();
    let mut labels = LabelSet::new();
    let mut skipped = 0usize;

    for result in reader.records() {
        let row = result?;
        let line = row.position().map(|p| p.line() as usize).unwrap_or(0);

        let fields: Map<String, Value> = headers
            .iter()
            .zip(row.iter())
            .map(|(h, v)| (h.trim().to_string(), Value::String(v.to_string())))
            .collect();

        match record_to_mention(line, &fields) {
            Ok(mention) if options.admits(&mention) => labels.push(mention),
            Ok(_) => {}
            Err(e) => {
                skipped += 1;
                warn!(line, error = %e, "Skipping invalid label row");
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, kept = labels.len(), "Some label rows were skipped");
    }
    Ok(labels)
}

/// Read a JSON array of label records
pub fn read_json(content: &str, options: &LoadOptions) -> Result<LabelSet, IngestError> {
    let records: Vec<Value> =
        serde_json::from_str(content).map_err(|source| IngestError::Json { line: 0, source })?;

    let mut labels = LabelSet::new();
    for (idx, record) in records.into_iter().enumerate() {
        let line = idx + 1;
        let Value::Object(fields) = record else {
            return Err(IngestError::NotAnObject { line });
        };
        let mention = record_to_mention(line, &fields)?;
        if options.admits(&mention) {
            labels.push(mention);
        }
    }
    Ok(labels)
}

/// Read JSON Lines label records; blank lines are ignored
pub fn read_jsonl(content: &str, options: &LoadOptions) -> Result<LabelSet, IngestError> {
    let mut labels = LabelSet::new();
    for (idx, raw) in content.lines().enumerate() {
        let line = idx + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let record: Value =
            serde_json::from_str(raw).map_err(|source| IngestError::Json { line, source })?;
        let Value::Object(fields) = record else {
            return Err(IngestError::NotAnObject { line });
        };
        let mention = record_to_mention(line, &fields)?;
        if options.admits(&mention) {
            labels.push(mention);
        }
    }
    Ok(labels)
}

/// Validate one record into a mention
fn record_to_mention(line: usize, fields: &Map<String, Value>) -> Result<Mention, IngestError> {
    let entity = text_field(line, fields, ENTITY, "entity_mention")?.ok_or(IngestError::MissingField {
        line,
        field: "entity_mention",
    })?;
    let start = offset_field(line, fields, START, "start_offset")?;
    let end = offset_field(line, fields, END, "end_offset")?;
    if start > end {
        return Err(IngestError::ReversedOffsets { line, start, end });
    }

    let main_role = match text_field(line, fields, MAIN_ROLE, "p_main_role")? {
        Some(raw) => {
            let (role, recognised) = MainRole::parse_lenient(&raw);
            if !recognised {
                warn!(line, role = %raw, "Unrecognised main role, using Unknown");
            }
            role
        }
        None => MainRole::Unknown,
    };

    let mut mention = Mention::new(entity, start, end, main_role);
    mention.fine_roles = fine_roles_field(line, fields)?;
    mention.fine_scores = fine_scores_field(line, fields)?;
    mention.role_confidence = number_field(line, fields, CONFIDENCE, "confidence")?;
    mention.sentence = text_field(line, fields, SENTENCE, "context")?;
    mention.article_id = text_field(line, fields, ARTICLE_ID, "article_id")?;
    Ok(mention)
}

/// First present, non-blank value among the column aliases
fn lookup<'a>(fields: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| match fields.get(*name) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(value) => Some(value),
    })
}

fn text_field(
    line: usize,
    fields: &Map<String, Value>,
    names: &[&str],
    field: &'static str,
) -> Result<Option<String>, IngestError> {
    match lookup(fields, names) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(IngestError::InvalidField {
            line,
            field,
            found: other.to_string(),
        }),
    }
}

fn offset_field(
    line: usize,
    fields: &Map<String, Value>,
    names: &[&str],
    field: &'static str,
) -> Result<usize, IngestError> {
    let value = lookup(fields, names).ok_or(IngestError::MissingField { line, field })?;
    let invalid = || IngestError::InvalidOffset {
        line,
        field,
        value: value.to_string(),
    };

    let parsed = match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(whole_number)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_number))
        }
        _ => None,
    };
    parsed
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(invalid)
}

/// Non-negative integral floats, as written by dataframe exports ("12.0")
fn whole_number(f: f64) -> Option<u64> {
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}

fn number_field(
    line: usize,
    fields: &Map<String, Value>,
    names: &[&str],
    field: &'static str,
) -> Result<Option<f64>, IngestError> {
    let Some(value) = lookup(fields, names) else {
        return Ok(None);
    };
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) if n.is_finite() => Ok(Some(n)),
        _ => Err(IngestError::InvalidField {
            line,
            field,
            found: value.to_string(),
        }),
    }
}

fn fine_roles_field(line: usize, fields: &Map<String, Value>) -> Result<Vec<String>, IngestError> {
    let field = "predicted_fine_margin";
    match lookup(fields, FINE_ROLES) {
        None => Ok(Vec::new()),
        Some(Value::String(s)) => {
            parse_label_list(s).map_err(|source| IngestError::Literal { line, field, source })
        }
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(IngestError::InvalidField {
                    line,
                    field,
                    found: other.to_string(),
                }),
            })
            .collect(),
        Some(other) => Err(IngestError::InvalidField {
            line,
            field,
            found: other.to_string(),
        }),
    }
}

fn fine_scores_field(line: usize, fields: &Map<String, Value>) -> Result<FineScores, IngestError> {
    let field = "predicted_fine_with_scores";
    let scores = match lookup(fields, FINE_SCORES) {
        None => FineScores::new(),
        Some(Value::String(s)) => {
            parse_score_map(s).map_err(|source| IngestError::Literal { line, field, source })?
        }
        Some(Value::Object(map)) => map
            .iter()
            .map(|(label, score)| match score.as_f64() {
                Some(n) => Ok((label.clone(), n)),
                None => Err(IngestError::InvalidField {
                    line,
                    field,
                    found: score.to_string(),
                }),
            })
            .collect::<Result<FineScores, _>>()?,
        Some(other) => {
            return Err(IngestError::InvalidField {
                line,
                field,
                found: other.to_string(),
            })
        }
    };

    if let Some((label, _)) = scores.iter().find(|(_, score)| !score.is_finite()) {
        return Err(IngestError::NonFiniteScore {
            line,
            label: label.to_string(),
        });
    }
    Ok(scores)
}

// =============================================================================
// WRITING
// =============================================================================

/// One output row, in the same column layout the loaders read
#[derive(Debug, Serialize)]
struct LabelRecord<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    article_id: Option<&'a str>,
    entity_mention: &'a str,
    start_offset: usize,
    end_offset: usize,
    p_main_role: MainRole,
    predicted_fine_margin: &'a [String],
    predicted_fine_with_scores: &'a FineScores,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
}

impl<'a> From<&'a Mention> for LabelRecord<'a> {
    fn from(m: &'a Mention) -> Self {
        Self {
            article_id: m.article_id.as_deref(),
            entity_mention: &m.entity,
            start_offset: m.start,
            end_offset: m.end,
            p_main_role: m.main_role,
            predicted_fine_margin: &m.fine_roles,
            predicted_fine_with_scores: &m.fine_scores,
            confidence: m.role_confidence,
            context: m.sentence.as_deref(),
        }
    }
}

/// Serialise labels as JSON Lines, one record per mention
pub fn to_jsonl(labels: &LabelSet) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    for mention in labels.mentions() {
        out.push_str(&serde_json::to_string(&LabelRecord::from(mention))?);
        out.push('\n');
    }
    Ok(out)
}

/// Write labels to a JSON Lines file, replacing any existing content
pub async fn write_jsonl(path: &Path, labels: &LabelSet) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let content = to_jsonl(labels)?;
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write labels: {}", path.display()))?;
    Ok(())
}
