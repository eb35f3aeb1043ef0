// cartela/src/pattern.rs
// Winning pattern vocabulary and the per-game pattern configuration.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::logging::log_warning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PatternKind {
    AnyHorizontal,
    AnyVertical,
    AnyDiagonal,
    FourCorners,
    FourMiddles,
}

impl PatternKind {
    pub const ALL: [PatternKind; 5] = [
        PatternKind::AnyHorizontal,
        PatternKind::AnyVertical,
        PatternKind::AnyDiagonal,
        PatternKind::FourCorners,
        PatternKind::FourMiddles,
    ];

    /// Label used by the retailer settings
    pub fn label(&self) -> &'static str {
        match self {
            PatternKind::AnyHorizontal => "Any Horizontal",
            PatternKind::AnyVertical => "Any Vertical",
            PatternKind::AnyDiagonal => "Any Diagonal",
            PatternKind::FourCorners => "4 Single Corner",
            PatternKind::FourMiddles => "4 Single Middle",
        }
    }

    /// Accepts the settings label or the variant name.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        PatternKind::ALL.into_iter().find(|kind| {
            kind.label().eq_ignore_ascii_case(label) || format!("{kind:?}").eq_ignore_ascii_case(label)
        })
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lines threshold from raw setup data; anything unusable or below 1 becomes 1.
pub fn parse_required_lines(raw: &str) -> u32 {
    let digits: String = raw.trim().chars().take_while(char::is_ascii_digit).collect();
    digits.parse::<u32>().ok().filter(|&n| n > 0).unwrap_or(1)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SavedPatternConfig")]
pub struct PatternConfig {
    enabled: BTreeSet<PatternKind>,
    required_lines: u32,
}

#[derive(Deserialize)]
struct SavedPatternConfig {
    #[serde(default)]
    enabled: BTreeSet<PatternKind>,
    #[serde(default)]
    required_lines: u32,
}

impl From<SavedPatternConfig> for PatternConfig {
    fn from(saved: SavedPatternConfig) -> Self {
        PatternConfig::new(saved.enabled, saved.required_lines)
    }
}

impl Default for PatternConfig {
    fn default() -> Self {
        PatternConfig {
            enabled: BTreeSet::new(),
            required_lines: 1,
        }
    }
}

impl PatternConfig {
    pub fn new<I: IntoIterator<Item = PatternKind>>(kinds: I, required_lines: u32) -> Self {
        PatternConfig {
            enabled: kinds.into_iter().collect(),
            required_lines: required_lines.max(1),
        }
    }

    /// Build from settings labels; unknown labels are logged and ignored.
    pub fn from_labels<S: AsRef<str>>(labels: &[S], required_lines: u32) -> Self {
        let kinds = labels.iter().filter_map(|label| {
            let kind = PatternKind::from_label(label.as_ref());
            if kind.is_none() {
                log_warning(&format!("Ignoring unknown winning pattern '{}'", label.as_ref()));
            }
            kind
        });
        Self::new(kinds, required_lines)
    }

    pub fn is_enabled(&self, kind: PatternKind) -> bool {
        self.enabled.contains(&kind)
    }

    pub fn enabled(&self) -> impl Iterator<Item = PatternKind> + '_ {
        self.enabled.iter().copied()
    }

    pub fn required_lines(&self) -> u32 {
        self.required_lines
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.enabled.iter().map(PatternKind::label).collect()
    }
}
