// cartela/src/defs.rs
// Shared constants and layout definitions for the bingo hall.

pub type Number = u8;

pub struct BoardStruct {
    pub numbers_per_letter: u8,
    pub letters: u8,
    pub hnumbers_space: u8,
    pub vletters_space: u8,
}

pub const BOARDCONFIG: BoardStruct = BoardStruct {
    numbers_per_letter: 15, // numbers called under each of B, I, N, G, O
    letters: 5,             // number of letter rows on the called board
    hnumbers_space: 1,      // space between numbers in the same row
    vletters_space: 0,      // blank lines between letter rows
};

pub const FIRSTNUMBER: Number = 1;
pub const LASTNUMBER: Number = BOARDCONFIG.numbers_per_letter * BOARDCONFIG.letters - 1 + FIRSTNUMBER;
pub const TOTALNUMBERS: usize = (LASTNUMBER - FIRSTNUMBER + 1) as usize;

// Card geometry
pub const GRID_SIZE: usize = 5;
pub const FREE_ROW: usize = 2;
pub const FREE_COL: usize = 2;
pub const COLUMN_LETTERS: [char; GRID_SIZE] = ['B', 'I', 'N', 'G', 'O'];

/// Minimum revealed numbers before a card may be checked.
pub const MIN_CALLS_FOR_CHECK: usize = 5;

pub fn is_free_cell(row: usize, col: usize) -> bool {
    row == FREE_ROW && col == FREE_COL
}

/// Letter of the board row a called number belongs to.
pub fn letter_for(number: Number) -> char {
    let offset = number.saturating_sub(FIRSTNUMBER) / BOARDCONFIG.numbers_per_letter;
    COLUMN_LETTERS[(offset as usize).min(GRID_SIZE - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_range() {
        assert_eq!(FIRSTNUMBER, 1);
        assert_eq!(LASTNUMBER, 75);
        assert_eq!(TOTALNUMBERS, 75);
    }

    #[test]
    fn test_letter_for() {
        assert_eq!(letter_for(1), 'B');
        assert_eq!(letter_for(15), 'B');
        assert_eq!(letter_for(16), 'I');
        assert_eq!(letter_for(45), 'N');
        assert_eq!(letter_for(46), 'G');
        assert_eq!(letter_for(61), 'O');
        assert_eq!(letter_for(75), 'O');
    }

    #[test]
    fn test_free_cell() {
        assert!(is_free_cell(2, 2));
        assert!(!is_free_cell(2, 1));
        assert!(!is_free_cell(0, 2));
    }
}
