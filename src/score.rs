// cartela/src/score.rs
// Win evaluation: which lines and shapes of a card are complete against the called numbers.

use serde::Serialize;

use crate::board::CalledSet;
use crate::card::Card;
use crate::defs::{FREE_COL, FREE_ROW, GRID_SIZE, is_free_cell};
use crate::pattern::{PatternConfig, PatternKind};

pub type Grid = [[u32; GRID_SIZE]; GRID_SIZE];
pub type CellMask = [[bool; GRID_SIZE]; GRID_SIZE];

const CORNERS: [(usize, usize); 4] = [(0, 0), (0, 4), (4, 0), (4, 4)];
const MIDDLES: [(usize, usize); 4] = [(2, 0), (2, 4), (0, 2), (4, 2)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineKind {
    Horizontal,
    Vertical,
    Diagonal,
    Corners,
    Middles,
}

impl LineKind {
    /// Pattern that makes this line count toward a win
    pub fn pattern(&self) -> PatternKind {
        match self {
            LineKind::Horizontal => PatternKind::AnyHorizontal,
            LineKind::Vertical => PatternKind::AnyVertical,
            LineKind::Diagonal => PatternKind::AnyDiagonal,
            LineKind::Corners => PatternKind::FourCorners,
            LineKind::Middles => PatternKind::FourMiddles,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletedLine {
    pub kind: LineKind,
    /// Row, column or diagonal index (0 main, 1 anti). Always 0 for shapes.
    pub index: usize,
}

impl CompletedLine {
    /// Playable cells of the line; the free center is never listed.
    pub fn cells(&self) -> Vec<(usize, usize)> {
        let i = self.index;
        let all: Vec<(usize, usize)> = match self.kind {
            LineKind::Horizontal => (0..GRID_SIZE).map(|c| (i, c)).collect(),
            LineKind::Vertical => (0..GRID_SIZE).map(|r| (r, i)).collect(),
            LineKind::Diagonal if i == 0 => (0..GRID_SIZE).map(|k| (k, k)).collect(),
            LineKind::Diagonal => (0..GRID_SIZE).map(|k| (k, GRID_SIZE - 1 - k)).collect(),
            LineKind::Corners => CORNERS.to_vec(),
            LineKind::Middles => MIDDLES.to_vec(),
        };
        all.into_iter().filter(|&(r, c)| !is_free_cell(r, c)).collect()
    }
}

/// Numeric grid of a card, row-major. Free center and blank cells are 0.
pub fn card_grid(card: &Card) -> Grid {
    let mut grid = [[0; GRID_SIZE]; GRID_SIZE];
    for (r, row) in grid.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            *cell = card.cell_value(r, c);
        }
    }
    grid
}

// A line is complete when it holds at least one number and every number is called.
fn line_complete<I>(grid: &Grid, called: &CalledSet, cells: I) -> bool
where
    I: IntoIterator<Item = (usize, usize)>,
{
    let mut has_numbers = false;
    for (r, c) in cells {
        if is_free_cell(r, c) || grid[r][c] == 0 {
            continue;
        }
        has_numbers = true;
        if !called.contains_value(grid[r][c]) {
            return false;
        }
    }
    has_numbers
}

// Shapes need every one of their cells to hold a called number.
fn shape_complete(grid: &Grid, called: &CalledSet, cells: &[(usize, usize)]) -> bool {
    cells
        .iter()
        .all(|&(r, c)| grid[r][c] != 0 && called.contains_value(grid[r][c]))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub card_id: String,
    pub grid: Grid,
    pub completed_lines: Vec<CompletedLine>,
    /// Cells holding a called number, plus the free center
    pub matched_cells: CellMask,
    /// Cells belonging to any completed line or shape
    pub completed_cells: CellMask,
    pub eligible_count: u32,
    pub required_lines: u32,
    pub is_winner: bool,
}

impl Evaluation {
    /// Evaluate a card against the called numbers. Total over any card data.
    pub fn evaluate(card: &Card, called: &CalledSet, config: &PatternConfig) -> Self {
        let grid = card_grid(card);
        let mut completed_lines = Vec::new();

        for r in 0..GRID_SIZE {
            if line_complete(&grid, called, (0..GRID_SIZE).map(|c| (r, c))) {
                completed_lines.push(CompletedLine { kind: LineKind::Horizontal, index: r });
            }
        }
        for c in 0..GRID_SIZE {
            if line_complete(&grid, called, (0..GRID_SIZE).map(|r| (r, c))) {
                completed_lines.push(CompletedLine { kind: LineKind::Vertical, index: c });
            }
        }
        if line_complete(&grid, called, (0..GRID_SIZE).map(|k| (k, k))) {
            completed_lines.push(CompletedLine { kind: LineKind::Diagonal, index: 0 });
        }
        if line_complete(&grid, called, (0..GRID_SIZE).map(|k| (k, GRID_SIZE - 1 - k))) {
            completed_lines.push(CompletedLine { kind: LineKind::Diagonal, index: 1 });
        }
        if shape_complete(&grid, called, &CORNERS) {
            completed_lines.push(CompletedLine { kind: LineKind::Corners, index: 0 });
        }
        if shape_complete(&grid, called, &MIDDLES) {
            completed_lines.push(CompletedLine { kind: LineKind::Middles, index: 0 });
        }

        let mut matched_cells = [[false; GRID_SIZE]; GRID_SIZE];
        for (r, row) in matched_cells.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = grid[r][c] != 0 && called.contains_value(grid[r][c]);
            }
        }
        matched_cells[FREE_ROW][FREE_COL] = true;

        let mut completed_cells = [[false; GRID_SIZE]; GRID_SIZE];
        for line in &completed_lines {
            for (r, c) in line.cells() {
                completed_cells[r][c] = true;
            }
        }

        let eligible_count = completed_lines
            .iter()
            .filter(|line| config.is_enabled(line.kind.pattern()))
            .count() as u32;
        let required_lines = config.required_lines();

        Evaluation {
            card_id: card.id.clone(),
            grid,
            completed_lines,
            matched_cells,
            completed_cells,
            eligible_count,
            required_lines,
            is_winner: eligible_count >= required_lines,
        }
    }

    pub fn lines_of(&self, kind: LineKind) -> impl Iterator<Item = &CompletedLine> {
        self.completed_lines.iter().filter(move |line| line.kind == kind)
    }

    pub fn is_complete(&self, kind: LineKind, index: usize) -> bool {
        self.completed_lines.contains(&CompletedLine { kind, index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::Number;

    // Rows: 0 [5,12,28,41,61]  1 [3,18,33,47,75]  2 [7,29,FREE,59,62]  3 [1,16,44,60,70]  4 [14,30,31,46,66]
    fn sample_card() -> Card {
        Card::from_columns(
            "17",
            ["5,3,07,1,14", "12,18,29,16,30", "28,33,,44,31", "41,47,59,60,46", "61,75,62,70,66"],
        )
    }

    fn config(kinds: &[PatternKind], lines: u32) -> PatternConfig {
        PatternConfig::new(kinds.iter().copied(), lines)
    }

    fn called(numbers: &[Number]) -> CalledSet {
        CalledSet::from_numbers(numbers)
    }

    #[test]
    fn test_grid_normalization() {
        let grid = card_grid(&sample_card());
        assert_eq!(grid[0], [5, 12, 28, 41, 61]);
        assert_eq!(grid[2], [7, 29, 0, 59, 62]);
        assert_eq!(grid[4], [14, 30, 31, 46, 66]);
    }

    #[test]
    fn test_row_needs_every_number() {
        let card = sample_card();
        let cfg = config(&[PatternKind::AnyHorizontal], 1);

        let eval = Evaluation::evaluate(&card, &called(&[5, 12, 28, 41]), &cfg);
        assert!(!eval.is_complete(LineKind::Horizontal, 0));
        assert!(!eval.is_winner);

        let eval = Evaluation::evaluate(&card, &called(&[5, 12, 28, 41, 61]), &cfg);
        assert!(eval.is_complete(LineKind::Horizontal, 0));
        assert_eq!(eval.eligible_count, 1);
        assert!(eval.is_winner);
    }

    #[test]
    fn test_disabled_kind_does_not_count() {
        let card = sample_card();
        let numbers = called(&[5, 12, 28, 41, 61]);

        let eval = Evaluation::evaluate(&card, &numbers, &config(&[PatternKind::AnyVertical], 1));
        assert!(eval.is_complete(LineKind::Horizontal, 0));
        assert_eq!(eval.lines_of(LineKind::Vertical).count(), 0);
        assert_eq!(eval.eligible_count, 0);
        assert!(!eval.is_winner);
    }

    #[test]
    fn test_middle_row_skips_free_cell() {
        let card = sample_card();
        let eval = Evaluation::evaluate(&card, &called(&[7, 29, 59, 62]), &config(&[PatternKind::AnyHorizontal], 1));
        assert!(eval.is_complete(LineKind::Horizontal, 2));
        assert!(eval.is_winner);
    }

    #[test]
    fn test_diagonals_skip_center() {
        let card = sample_card();
        let cfg = config(&[PatternKind::AnyDiagonal], 2);
        // main diagonal: 5,18,_,60,66  anti diagonal: 61,47,_,16,14
        let eval = Evaluation::evaluate(&card, &called(&[5, 18, 60, 66]), &cfg);
        assert!(eval.is_complete(LineKind::Diagonal, 0));
        assert!(!eval.is_complete(LineKind::Diagonal, 1));
        assert!(!eval.is_winner);

        let eval = Evaluation::evaluate(&card, &called(&[5, 18, 60, 66, 61, 47, 16, 14]), &cfg);
        assert_eq!(eval.lines_of(LineKind::Diagonal).count(), 2);
        assert!(eval.is_winner);
    }

    #[test]
    fn test_four_corners_win_without_lines() {
        let card = sample_card();
        let eval = Evaluation::evaluate(&card, &called(&[5, 61, 14, 66]), &config(&[PatternKind::FourCorners], 1));
        assert!(eval.is_complete(LineKind::Corners, 0));
        assert_eq!(eval.lines_of(LineKind::Horizontal).count(), 0);
        assert_eq!(eval.lines_of(LineKind::Vertical).count(), 0);
        assert_eq!(eval.lines_of(LineKind::Diagonal).count(), 0);
        assert!(eval.is_winner);
    }

    #[test]
    fn test_four_middles() {
        let card = sample_card();
        let cfg = config(&[PatternKind::FourMiddles], 1);
        // middles: (2,0)=7 (2,4)=62 (0,2)=28 (4,2)=31
        let eval = Evaluation::evaluate(&card, &called(&[7, 62, 28]), &cfg);
        assert!(!eval.is_winner);
        let eval = Evaluation::evaluate(&card, &called(&[7, 62, 28, 31]), &cfg);
        assert!(eval.is_complete(LineKind::Middles, 0));
        assert_eq!(eval.eligible_count, 1);
        assert!(eval.is_winner);
    }

    #[test]
    fn test_shapes_need_real_numbers() {
        let card = Card::from_columns("9", [",,,,", ",,,,", ",,,,", ",,,,", ",,,,"]);
        let all: Vec<Number> = (1..=75).collect();
        let eval = Evaluation::evaluate(&card, &called(&all), &config(&PatternKind::ALL, 1));
        assert!(eval.completed_lines.is_empty());
        assert!(!eval.is_winner);
    }

    #[test]
    fn test_empty_row_and_column_never_complete() {
        // Row 1 and column 3 hold no numbers at all
        let card = Card::from_columns("8", ["1,,3,4,5", "16,,18,19,20", "31,,,34,35", ",,,,", "61,,63,64,65"]);
        let all: Vec<Number> = (1..=75).collect();
        let eval = Evaluation::evaluate(&card, &called(&all), &config(&PatternKind::ALL, 1));
        assert!(!eval.is_complete(LineKind::Horizontal, 1));
        assert!(!eval.is_complete(LineKind::Vertical, 3));
        assert!(eval.is_complete(LineKind::Horizontal, 0));
        // blanks inside a line are skipped as long as some number remains
        assert!(eval.is_complete(LineKind::Diagonal, 0));
    }

    #[test]
    fn test_malformed_cells_block_instead_of_crash() {
        let card = Card::from_columns("x", ["5,abc", "12", "28", "41", "61"]);
        let eval = Evaluation::evaluate(&card, &called(&[5, 12, 28, 41, 61]), &config(&[PatternKind::AnyHorizontal], 1));
        assert!(eval.is_complete(LineKind::Horizontal, 0));
        assert!(!eval.is_complete(LineKind::Horizontal, 1));
        assert_eq!(eval.grid[1][0], 0);
    }

    #[test]
    fn test_negative_or_oversized_cell_blocks_line() {
        let cfg = config(&[PatternKind::AnyHorizontal], 1);
        let numbers = called(&[5, 12, 28, 41]);
        for bad in ["-61", "99999999999"] {
            let card = Card::from_columns("n", ["5", "12", "28", "41", bad]);
            let eval = Evaluation::evaluate(&card, &numbers, &cfg);
            assert!(!eval.is_complete(LineKind::Horizontal, 0), "{bad} should block row 0");
            assert!(!eval.matched_cells[0][4]);
            assert!(!eval.is_winner);
        }
    }

    #[test]
    fn test_leading_zero_cell_matches() {
        let card = Card::from_columns("z", ["07,1,2,3,4", "16", "31", "46", "61"]);
        let eval = Evaluation::evaluate(&card, &called(&[7]), &PatternConfig::default());
        assert!(eval.matched_cells[0][0]);

        let tokens = CalledSet::from_tokens(&["007", "16", "31", "46", "61"]);
        let eval = Evaluation::evaluate(&card, &tokens, &config(&[PatternKind::AnyHorizontal], 1));
        assert!(eval.is_complete(LineKind::Horizontal, 0));
    }

    #[test]
    fn test_free_cell_never_in_completed_cells() {
        let card = sample_card();
        let all: Vec<Number> = (1..=75).collect();
        let eval = Evaluation::evaluate(&card, &called(&all), &config(&PatternKind::ALL, 1));
        // 5 rows + 5 columns + 2 diagonals + corners + middles
        assert_eq!(eval.completed_lines.len(), 14);
        assert_eq!(eval.eligible_count, 14);
        for line in &eval.completed_lines {
            assert!(!line.cells().contains(&(FREE_ROW, FREE_COL)));
        }
        assert!(!eval.completed_cells[FREE_ROW][FREE_COL]);
        assert!(eval.matched_cells[FREE_ROW][FREE_COL]);
    }

    #[test]
    fn test_threshold_counts_across_kinds() {
        let card = sample_card();
        // row 0 plus the corners: 5,12,28,41,61 and 14,66
        let numbers = called(&[5, 12, 28, 41, 61, 14, 66]);
        let cfg = config(&[PatternKind::AnyHorizontal, PatternKind::FourCorners], 2);
        let eval = Evaluation::evaluate(&card, &numbers, &cfg);
        assert_eq!(eval.eligible_count, 2);
        assert!(eval.is_winner);

        let cfg = config(&[PatternKind::AnyHorizontal, PatternKind::FourCorners], 3);
        assert!(!Evaluation::evaluate(&card, &numbers, &cfg).is_winner);
    }

    #[test]
    fn test_evaluation_is_repeatable() {
        let card = sample_card();
        let numbers = called(&[5, 12, 28, 41, 61, 7, 29]);
        let cfg = config(&PatternKind::ALL, 1);
        assert_eq!(
            Evaluation::evaluate(&card, &numbers, &cfg),
            Evaluation::evaluate(&card, &numbers, &cfg)
        );
    }
}
