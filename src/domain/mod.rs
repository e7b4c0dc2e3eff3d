//! Domain types for entity framing.
//!
//! This module contains the core data structures:
//! - MainRole / RoleFilter / RoleColors: role enum, display filter, colours
//! - Mention / FineScores: one entity occurrence and its fine-role scores
//! - LabelSet: all mentions for an article

pub mod labels;
pub mod mention;
pub mod role;

// Re-export commonly used types
pub use labels::LabelSet;
pub use mention::{FineScores, Mention};
pub use role::{MainRole, RoleColors, RoleFilter, UnknownRole, DEFAULT_ROLE_COLOR};
