// cartela/src/board.rs
// The set of called numbers, compared as normalized decimal strings.

use std::collections::HashSet;

use crate::defs::Number;

/// Canonical form for every numeric comparison: trimmed, leading zeros stripped.
/// "07" and "7" compare equal; "0" and "" both normalize to "".
pub fn normalize_number(raw: &str) -> String {
    raw.trim().trim_start_matches('0').to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalledSet(HashSet<String>);

impl CalledSet {
    pub fn new() -> Self {
        CalledSet(HashSet::new())
    }

    pub fn from_numbers(numbers: &[Number]) -> Self {
        CalledSet(numbers.iter().map(|n| normalize_number(&n.to_string())).collect())
    }

    /// Build from raw tokens as they arrive in external data
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Self {
        CalledSet(
            tokens
                .iter()
                .map(|t| normalize_number(t.as_ref()))
                .filter(|t| !t.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, raw: &str) -> bool {
        let norm = normalize_number(raw);
        !norm.is_empty() && self.0.contains(&norm)
    }

    pub fn contains_value(&self, value: u32) -> bool {
        self.contains(&value.to_string())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
