// cartela/src/card.rs
// Bingo cards as supplied by the venue and the session-scoped card store.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::defs::{COLUMN_LETTERS, GRID_SIZE, is_free_cell};
use crate::errors::{GameError, InputError};
use crate::logging::{log_info, log_warning};

/// One raw record of the card dataset. Ids and columns arrive as strings or numbers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardRecord {
    #[serde(default)]
    pub id: Value,
    #[serde(default, rename = "B")]
    pub b: Value,
    #[serde(default, rename = "I")]
    pub i: Value,
    #[serde(default, rename = "N")]
    pub n: Value,
    #[serde(default, rename = "G")]
    pub g: Value,
    #[serde(default, rename = "O")]
    pub o: Value,
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Split a comma separated column into position-aligned tokens.
pub fn parse_column(raw: &str) -> Vec<String> {
    raw.split(',').map(|token| token.trim().to_string()).collect()
}

/// Cell value for a token that holds a number no call can ever match.
pub const UNCALLABLE_CELL: u32 = u32::MAX;

/// Numeric value of a cell token. Blank or non-numeric tokens are 0; negative
/// or overflowing numbers become `UNCALLABLE_CELL` so they block their line.
pub fn parse_cell(raw: &str) -> u32 {
    let token = raw.trim();
    let (negative, unsigned) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token.strip_prefix('+').unwrap_or(token)),
    };
    let end = unsigned.find(|c: char| !c.is_ascii_digit()).unwrap_or(unsigned.len());
    let digits = &unsigned[..end];
    if digits.bytes().all(|b| b == b'0') {
        return 0;
    }
    if negative {
        return UNCALLABLE_CELL;
    }
    digits.parse::<u32>().unwrap_or(UNCALLABLE_CELL)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub id: String,
    columns: [Vec<String>; GRID_SIZE],
}

impl Card {
    /// Columns in B, I, N, G, O order, each a comma separated list.
    pub fn from_columns(id: &str, columns: [&str; GRID_SIZE]) -> Self {
        Card {
            id: id.trim().to_string(),
            columns: columns.map(parse_column),
        }
    }

    fn from_record(record: &CardRecord) -> Option<Self> {
        let id = value_to_string(&record.id).trim().to_string();
        if id.is_empty() {
            return None;
        }
        let raw = [&record.b, &record.i, &record.n, &record.g, &record.o].map(value_to_string);
        Some(Card {
            id,
            columns: raw.map(|col| parse_column(&col)),
        })
    }

    /// Token as stored for the given cell, empty when the column is short.
    pub fn cell_text(&self, row: usize, col: usize) -> &str {
        self.columns
            .get(col)
            .and_then(|values| values.get(row))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Numeric value of a cell; the free center and blank tokens are 0.
    pub fn cell_value(&self, row: usize, col: usize) -> u32 {
        if is_free_cell(row, col) {
            return 0;
        }
        parse_cell(self.cell_text(row, col))
    }

    pub fn column(&self, letter: char) -> Option<&[String]> {
        COLUMN_LETTERS
            .iter()
            .position(|&l| l == letter.to_ascii_uppercase())
            .map(|idx| self.columns[idx].as_slice())
    }
}

/// Cards of the current session plus the ids activated for this game.
#[derive(Debug, Clone, Default)]
pub struct CardStore {
    cards: HashMap<String, Card>,
    active: Vec<String>,
}

impl CardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON list of card records. Non-object records and blank ids are skipped.
    pub fn from_json(content: &str) -> Result<Self, GameError> {
        let records: Vec<Value> = serde_json::from_str(content)?;
        let mut store = CardStore::new();
        let mut skipped = 0;
        for record in records {
            let card = serde_json::from_value::<CardRecord>(record)
                .ok()
                .and_then(|r| Card::from_record(&r));
            match card {
                Some(card) => store.insert(card),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            log_warning(&format!("Skipped {skipped} malformed card records"));
        }
        Ok(store)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GameError> {
        let content = fs::read_to_string(path).map_err(|e| GameError::Data(e.to_string()))?;
        Self::from_json(&content)
    }

    /// Malformed or missing card data degrades to an empty store.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::from_file(path) {
            Ok(store) => {
                log_info(&format!("Loaded {} cards from {}", store.len(), path.display()));
                store
            }
            Err(e) => {
                log_warning(&format!("Could not load cards from {}: {e}. Starting with no cards.", path.display()));
                Self::default()
            }
        }
    }

    pub fn insert(&mut self, card: Card) {
        self.cards.insert(card.id.clone(), card);
    }

    /// Replace the allow-list of cards playing this game
    pub fn set_active<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        self.active = ids
            .into_iter()
            .map(|id| id.as_ref().trim().to_string())
            .filter(|id| !id.is_empty() && seen.insert(id.clone()))
            .collect();
    }

    pub fn active_ids(&self) -> &[String] {
        &self.active
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.iter().any(|active| active == id)
    }

    /// Look up an active card. Blank, unregistered and unknown ids fail distinctly.
    pub fn get_card(&self, id: &str) -> Result<&Card, InputError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(InputError::EmptyCardId);
        }
        if !self.is_active(id) {
            return Err(InputError::NotRegistered(id.to_string()));
        }
        self.cards.get(id).ok_or_else(|| InputError::NotFound(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
