// cartela/src/pouch.rs
// The call sequence: a shuffled permutation of every ball plus a cursor of how many were called.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::defs::{FIRSTNUMBER, LASTNUMBER, Number, TOTALNUMBERS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SavedSequence")]
pub struct CallSequence {
    numbers: Vec<Number>,
    cursor: usize,
}

/// Unchecked form read from JSON, validated before it becomes a `CallSequence`
#[derive(Deserialize)]
struct SavedSequence {
    numbers: Vec<Number>,
    #[serde(default)]
    cursor: usize,
}

impl TryFrom<SavedSequence> for CallSequence {
    type Error = String;

    fn try_from(saved: SavedSequence) -> Result<Self, Self::Error> {
        let mut sequence = CallSequence::from_numbers(saved.numbers)?;
        if saved.cursor > sequence.len() {
            return Err(format!("Cursor {} is past the end of the sequence", saved.cursor));
        }
        sequence.cursor = saved.cursor;
        Ok(sequence)
    }
}

impl CallSequence {
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::rng())
    }

    /// Uniform permutation drawn from the given rng, nothing called yet
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut numbers: Vec<Number> = (FIRSTNUMBER..=LASTNUMBER).collect();
        numbers.shuffle(rng);
        CallSequence { numbers, cursor: 0 }
    }

    /// Accept an externally supplied order; it must cover every ball exactly once.
    pub fn from_numbers(numbers: Vec<Number>) -> Result<Self, String> {
        if numbers.len() != TOTALNUMBERS {
            return Err(format!("Expected {TOTALNUMBERS} numbers, got {}", numbers.len()));
        }
        let mut seen = [false; TOTALNUMBERS];
        for &n in &numbers {
            if !(FIRSTNUMBER..=LASTNUMBER).contains(&n) {
                return Err(format!("Number {n} is outside {FIRSTNUMBER}..={LASTNUMBER}"));
            }
            let slot = (n - FIRSTNUMBER) as usize;
            if seen[slot] {
                return Err(format!("Number {n} appears more than once"));
            }
            seen[slot] = true;
        }
        Ok(CallSequence { numbers, cursor: 0 })
    }

    /// Reveal the next ball. `None` once all of them were called.
    pub fn advance(&mut self) -> Option<Number> {
        let next = self.numbers.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(next)
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn called(&self) -> &[Number] {
        &self.numbers[..self.cursor]
    }

    pub fn current(&self) -> Option<Number> {
        self.cursor.checked_sub(1).map(|i| self.numbers[i])
    }

    /// Up to `n` numbers called before the current one, most recent first
    pub fn previous(&self, n: usize) -> Vec<Number> {
        let before_current = self.cursor.saturating_sub(1);
        let start = before_current.saturating_sub(n);
        self.numbers[start..before_current].iter().rev().copied().collect()
    }

    pub fn remaining(&self) -> usize {
        self.numbers.len() - self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn test_generated_sequence_is_a_permutation() {
        for seed in 0..50 {
            let seq = CallSequence::generate_with(&mut StdRng::seed_from_u64(seed));
            assert_eq!(seq.len(), 75);
            let distinct: HashSet<Number> = seq.numbers.iter().copied().collect();
            assert_eq!(distinct.len(), 75);
            assert!(seq.numbers.iter().all(|&n| (1..=75).contains(&n)));
            assert_eq!(seq.cursor(), 0);
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = CallSequence::generate_with(&mut StdRng::seed_from_u64(42));
        let b = CallSequence::generate_with(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_advance_until_exhausted() {
        let mut seq = CallSequence::generate();
        let mut drawn = Vec::new();
        while let Some(n) = seq.advance() {
            drawn.push(n);
        }
        assert_eq!(drawn.len(), 75);
        assert!(seq.is_exhausted());
        assert_eq!(seq.advance(), None);
        assert_eq!(seq.cursor(), 75);
        assert_eq!(seq.called(), drawn.as_slice());
    }

    #[test]
    fn test_current_and_previous() {
        let mut seq = CallSequence::from_numbers((1..=75).collect()).unwrap();
        assert_eq!(seq.current(), None);
        assert!(seq.previous(3).is_empty());
        seq.advance();
        assert_eq!(seq.current(), Some(1));
        assert!(seq.previous(3).is_empty());
        for _ in 0..4 {
            seq.advance();
        }
        assert_eq!(seq.current(), Some(5));
        assert_eq!(seq.previous(3), vec![4, 3, 2]);
        assert_eq!(seq.remaining(), 70);
    }

    #[test]
    fn test_from_numbers_rejects_bad_input() {
        assert!(CallSequence::from_numbers(vec![1, 2, 3]).is_err());

        let mut duplicated: Vec<Number> = (1..=75).collect();
        duplicated[74] = 1;
        assert!(CallSequence::from_numbers(duplicated).unwrap_err().contains("more than once"));

        let mut out_of_range: Vec<Number> = (1..=75).collect();
        out_of_range[0] = 76;
        assert!(CallSequence::from_numbers(out_of_range).unwrap_err().contains("outside"));
    }

    #[test]
    fn test_rewind() {
        let mut seq = CallSequence::generate();
        seq.advance();
        seq.advance();
        seq.rewind();
        assert_eq!(seq.cursor(), 0);
        assert!(seq.called().is_empty());
    }

    #[test]
    fn test_saved_sequence_is_validated() {
        let mut seq = CallSequence::generate();
        seq.advance();
        seq.advance();
        let json = serde_json::to_string(&seq).unwrap();
        let restored: CallSequence = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.cursor(), 2);
        assert_eq!(restored.called(), seq.called());

        assert!(serde_json::from_str::<CallSequence>(r#"{"numbers":[1,1,2],"cursor":9}"#).is_err());

        let numbers: Vec<Number> = (1..=75).collect();
        let past_end = serde_json::json!({"numbers": numbers, "cursor": 76});
        assert!(serde_json::from_value::<CallSequence>(past_end).is_err());
    }
}
