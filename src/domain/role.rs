//! Main roles, the role filter and the role colour table.
//!
//! Upstream producers hand roles over as loosely-typed strings. They are
//! parsed once into [`MainRole`]; anything unrecognised is styled with the
//! neutral default colour rather than rejected.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Coarse framing category assigned to an entity mention
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MainRole {
    Protagonist,
    Antagonist,
    Innocent,
    Unknown,
}

impl MainRole {
    /// All roles in display order
    pub const ALL: [MainRole; 4] = [
        MainRole::Protagonist,
        MainRole::Antagonist,
        MainRole::Innocent,
        MainRole::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MainRole::Protagonist => "Protagonist",
            MainRole::Antagonist => "Antagonist",
            MainRole::Innocent => "Innocent",
            MainRole::Unknown => "Unknown",
        }
    }

    /// Lowercase slug used in CSS class names
    pub fn slug(&self) -> &'static str {
        match self {
            MainRole::Protagonist => "protagonist",
            MainRole::Antagonist => "antagonist",
            MainRole::Innocent => "innocent",
            MainRole::Unknown => "unknown",
        }
    }

    /// Parse a role, mapping anything unrecognised to `Unknown`
    ///
    /// Returns the role and whether the input was recognised.
    pub fn parse_lenient(s: &str) -> (MainRole, bool) {
        match s.parse::<MainRole>() {
            Ok(role) => (role, true),
            Err(_) => (MainRole::Unknown, false),
        }
    }
}

impl fmt::Display for MainRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no main role
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unrecognised main role: '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for MainRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        MainRole::ALL
            .iter()
            .copied()
            .find(|role| role.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownRole(trimmed.to_string()))
    }
}

/// Set of main roles currently enabled for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleFilter {
    roles: BTreeSet<MainRole>,
}

impl Default for RoleFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl RoleFilter {
    /// Filter that admits every role
    pub fn all() -> Self {
        Self {
            roles: MainRole::ALL.into_iter().collect(),
        }
    }

    /// Filter that admits nothing
    pub fn none() -> Self {
        Self {
            roles: BTreeSet::new(),
        }
    }

    pub fn from_roles(roles: impl IntoIterator<Item = MainRole>) -> Self {
        Self {
            roles: roles.into_iter().collect(),
        }
    }

    /// Parse a comma-separated list such as `"protagonist, antagonist"`
    pub fn parse_list(list: &str) -> Result<Self, UnknownRole> {
        let roles = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self { roles })
    }

    pub fn contains(&self, role: MainRole) -> bool {
        self.roles.contains(&role)
    }

    pub fn insert(&mut self, role: MainRole) {
        self.roles.insert(role);
    }

    pub fn remove(&mut self, role: MainRole) {
        self.roles.remove(&role);
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = MainRole> + '_ {
        self.roles.iter().copied()
    }
}

/// Neutral colour for roles missing from the table
pub const DEFAULT_ROLE_COLOR: &str = "#cccccc";

/// Role to display colour mapping
///
/// The table may be partial; [`RoleColors::color_for`] is total and falls
/// back to the neutral default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleColors {
    colors: HashMap<MainRole, String>,
    fallback: String,
}

impl Default for RoleColors {
    fn default() -> Self {
        let colors = [
            (MainRole::Protagonist, "#a1f4a1"),
            (MainRole::Antagonist, "#f4a1a1"),
            (MainRole::Innocent, "#a1c9f4"),
            (MainRole::Unknown, "#dddddd"),
        ]
        .into_iter()
        .map(|(role, color)| (role, color.to_string()))
        .collect();

        Self {
            colors,
            fallback: DEFAULT_ROLE_COLOR.to_string(),
        }
    }
}

impl RoleColors {
    /// Empty table: every role renders in the fallback colour
    pub fn empty(fallback: impl Into<String>) -> Self {
        Self {
            colors: HashMap::new(),
            fallback: fallback.into(),
        }
    }

    pub fn with_color(mut self, role: MainRole, color: impl Into<String>) -> Self {
        self.colors.insert(role, color.into());
        self
    }

    pub fn color_for(&self, role: MainRole) -> &str {
        self.colors
            .get(&role)
            .map(String::as_str)
            .unwrap_or(&self.fallback)
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }
}
