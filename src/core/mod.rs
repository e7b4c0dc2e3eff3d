//! Core pipeline logic.
//!
//! - `predictor`: two-stage model pipeline producing a label set
//! - `framing`: role distribution, fine-role breakdown, per-role
//!   sentence views and fine-role drill-downs

pub mod framing;
pub mod predictor;

pub use framing::{
    fine_role_breakdown, fine_roles_for, framing_rows, render_fine_role_section,
    render_role_sentences, render_sentence_report, role_distribution, role_label_count,
    sentences_by_fine_role, sentences_by_role, title_case, FineRoleCount, FramingRow,
};
pub use predictor::{
    classifier_input, context_sentence, most_probable_role, post_process_spans, select_scores,
    Prediction, PredictionOptions, Predictor,
};
