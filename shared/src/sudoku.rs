//! 3×3 Sudoku mini-game used by the learning module.
//!
//! A puzzle is one of a fixed set of Latin-square templates with some
//! cells masked out. Each row and each column must hold 1, 2 and 3 once.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const SIZE: usize = 3;
pub const CELLS: usize = SIZE * SIZE;
/// Cells hidden from the player in every generated puzzle
pub const BLANKS: usize = 4;
pub const POINTS_PER_BLANK: u32 = 10;
pub const MISTAKE_PENALTY: u32 = 2;
pub const MIN_SCORE: u32 = 2;

/// Solution templates, row-major
pub const TEMPLATES: [[u8; CELLS]; 4] = [
    [1, 2, 3, 2, 3, 1, 3, 1, 2],
    [1, 3, 2, 3, 2, 1, 2, 1, 3],
    [2, 1, 3, 3, 2, 1, 1, 3, 2],
    [3, 1, 2, 2, 3, 1, 1, 2, 3],
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SudokuPuzzle {
    /// Issue id; the server scores each issued puzzle once
    pub id: String,
    /// Index into `TEMPLATES`
    pub template: u8,
    /// Givens, row-major; `None` marks a cell for the player
    pub cells: [Option<u8>; CELLS],
}

/// A finished grid sent back for scoring against the issued puzzle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SudokuSubmission {
    pub puzzle_id: String,
    pub grid: [u8; CELLS],
    pub mistakes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    OutOfBounds(usize),
    InvalidValue(u8),
    FixedCell(usize),
    RowConflict { row: usize, value: u8 },
    ColumnConflict { column: usize, value: u8 },
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementError::OutOfBounds(index) => write!(f, "Cell {} is outside the grid", index),
            PlacementError::InvalidValue(value) => write!(f, "Value {} must be between 1 and {}", value, SIZE),
            PlacementError::FixedCell(index) => write!(f, "Cell {} is part of the puzzle", index),
            PlacementError::RowConflict { row, value } => write!(f, "Row {} already has a {}", row + 1, value),
            PlacementError::ColumnConflict { column, value } => {
                write!(f, "Column {} already has a {}", column + 1, value)
            }
        }
    }
}

impl std::error::Error for PlacementError {}

/// xorshift64*, enough to pick a template and shuffle nine cells
struct SeededRng(u64);

impl SeededRng {
    fn new(seed: u64) -> Self {
        Self(if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed })
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.0 = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn below(&mut self, bound: usize) -> usize {
        (self.next_u64() % bound as u64) as usize
    }
}

impl SudokuPuzzle {
    pub fn generate_id() -> String {
        crate::generate_id("sudoku")
    }

    /// Pick a template and hide `BLANKS` cells, deterministically from `seed`
    pub fn generate(id: impl Into<String>, seed: u64) -> Self {
        let mut rng = SeededRng::new(seed);
        let template = rng.below(TEMPLATES.len());
        let solution = TEMPLATES[template];

        let mut order: [usize; CELLS] = [0, 1, 2, 3, 4, 5, 6, 7, 8];
        for i in (1..CELLS).rev() {
            let j = rng.below(i + 1);
            order.swap(i, j);
        }

        let mut cells = solution.map(Some);
        for &index in order.iter().take(BLANKS) {
            cells[index] = None;
        }

        Self { id: id.into(), template: template as u8, cells }
    }

    pub fn blanks(&self) -> usize {
        self.cells.iter().filter(|c| c.is_none()).count()
    }

    pub fn is_given(&self, index: usize) -> bool {
        self.cells.get(index).map_or(false, |c| c.is_some())
    }

    /// Whether `grid` is a complete Latin square that keeps every given
    pub fn is_solved_by(&self, grid: &[u8; CELLS]) -> bool {
        if grid.iter().any(|&v| v == 0 || v as usize > SIZE) {
            return false;
        }
        let keeps_givens = self
            .cells
            .iter()
            .zip(grid.iter())
            .all(|(given, value)| given.map_or(true, |g| g == *value));
        if !keeps_givens {
            return false;
        }

        (0..SIZE).all(|i| {
            let mut row_seen = [false; SIZE];
            let mut col_seen = [false; SIZE];
            for j in 0..SIZE {
                row_seen[grid[i * SIZE + j] as usize - 1] = true;
                col_seen[grid[j * SIZE + i] as usize - 1] = true;
            }
            row_seen.iter().all(|&s| s) && col_seen.iter().all(|&s| s)
        })
    }
}

/// Check whether `value` may go into `index` given the current cells
pub fn check_placement(cells: &[Option<u8>; CELLS], index: usize, value: u8) -> Result<(), PlacementError> {
    if index >= CELLS {
        return Err(PlacementError::OutOfBounds(index));
    }
    if value == 0 || value as usize > SIZE {
        return Err(PlacementError::InvalidValue(value));
    }

    let row = index / SIZE;
    let column = index % SIZE;
    for j in 0..SIZE {
        let other = row * SIZE + j;
        if other != index && cells[other] == Some(value) {
            return Err(PlacementError::RowConflict { row, value });
        }
    }
    for i in 0..SIZE {
        let other = i * SIZE + column;
        if other != index && cells[other] == Some(value) {
            return Err(PlacementError::ColumnConflict { column, value });
        }
    }
    Ok(())
}

/// Score a solved puzzle
pub fn score(blanks: usize, mistakes: u32) -> u32 {
    (blanks as u32 * POINTS_PER_BLANK)
        .saturating_sub(mistakes.saturating_mul(MISTAKE_PENALTY))
        .max(MIN_SCORE)
}

/// A puzzle in progress
#[derive(Debug, Clone)]
pub struct SudokuGame {
    puzzle: SudokuPuzzle,
    cells: [Option<u8>; CELLS],
    mistakes: u32,
}

impl SudokuGame {
    pub fn new(puzzle: SudokuPuzzle) -> Self {
        let cells = puzzle.cells;
        Self { puzzle, cells, mistakes: 0 }
    }

    pub fn cells(&self) -> &[Option<u8>; CELLS] {
        &self.cells
    }

    pub fn mistakes(&self) -> u32 {
        self.mistakes
    }

    /// Place a value; conflicting placements are refused and counted as mistakes
    pub fn place(&mut self, index: usize, value: u8) -> Result<(), PlacementError> {
        if self.puzzle.is_given(index) {
            return Err(PlacementError::FixedCell(index));
        }
        match check_placement(&self.cells, index, value) {
            Ok(()) => {
                self.cells[index] = Some(value);
                Ok(())
            }
            Err(e @ (PlacementError::RowConflict { .. } | PlacementError::ColumnConflict { .. })) => {
                self.mistakes += 1;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    pub fn clear(&mut self, index: usize) -> Result<(), PlacementError> {
        if index >= CELLS {
            return Err(PlacementError::OutOfBounds(index));
        }
        if self.puzzle.is_given(index) {
            return Err(PlacementError::FixedCell(index));
        }
        self.cells[index] = None;
        Ok(())
    }

    fn grid(&self) -> Option<[u8; CELLS]> {
        let mut grid = [0u8; CELLS];
        for (slot, cell) in grid.iter_mut().zip(self.cells.iter()) {
            *slot = (*cell)?;
        }
        Some(grid)
    }

    pub fn is_solved(&self) -> bool {
        self.grid().map_or(false, |grid| self.puzzle.is_solved_by(&grid))
    }

    pub fn score(&self) -> Option<u32> {
        self.is_solved().then(|| score(self.puzzle.blanks(), self.mistakes))
    }

    /// Submission for a solved game
    pub fn submission(&self) -> Option<SudokuSubmission> {
        let grid = self.grid()?;
        self.puzzle.is_solved_by(&grid).then(|| SudokuSubmission {
            puzzle_id: self.puzzle.id.clone(),
            grid,
            mistakes: self.mistakes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_are_latin_squares() {
        for template in TEMPLATES {
            let puzzle = SudokuPuzzle { id: "sudoku::blank".to_string(), template: 0, cells: [None; CELLS] };
            assert!(puzzle.is_solved_by(&template), "{:?}", template);
        }
    }

    #[test]
    fn test_generate_is_deterministic_and_masks_cells() {
        let a = SudokuPuzzle::generate("sudoku::a", 42);
        let b = SudokuPuzzle::generate("sudoku::b", 42);
        assert_eq!(a.cells, b.cells);
        assert_eq!(a.template, b.template);
        assert_eq!(a.id, "sudoku::a");
        assert_eq!(a.blanks(), BLANKS);

        let solution = TEMPLATES[a.template as usize];
        for (given, expected) in a.cells.iter().zip(solution.iter()) {
            if let Some(value) = given {
                assert_eq!(value, expected);
            }
        }
    }

    #[test]
    fn test_generate_covers_every_template() {
        let mut seen = [false; 4];
        for seed in 0..200u64 {
            seen[SudokuPuzzle::generate("sudoku::seed", seed).template as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_check_placement() {
        let cells = [Some(1), None, Some(3), None, None, None, None, None, None];
        assert!(check_placement(&cells, 1, 2).is_ok());
        assert_eq!(check_placement(&cells, 1, 1), Err(PlacementError::RowConflict { row: 0, value: 1 }));
        assert_eq!(check_placement(&cells, 3, 1), Err(PlacementError::ColumnConflict { column: 0, value: 1 }));
        assert_eq!(check_placement(&cells, 9, 1), Err(PlacementError::OutOfBounds(9)));
        assert_eq!(check_placement(&cells, 4, 4), Err(PlacementError::InvalidValue(4)));
        assert_eq!(check_placement(&cells, 4, 0), Err(PlacementError::InvalidValue(0)));
    }

    #[test]
    fn test_game_play_to_completion() {
        let puzzle = SudokuPuzzle {
            id: "sudoku::fixed".to_string(),
            template: 0,
            cells: [Some(1), None, Some(3), None, Some(3), Some(1), Some(3), None, None],
        };
        let mut game = SudokuGame::new(puzzle);

        assert_eq!(game.place(0, 2), Err(PlacementError::FixedCell(0)));
        assert!(game.place(1, 1).is_err());
        assert_eq!(game.mistakes(), 1);

        game.place(1, 2).unwrap();
        game.place(3, 2).unwrap();
        game.place(7, 1).unwrap();
        assert!(!game.is_solved());
        assert!(game.score().is_none());
        game.place(8, 2).unwrap();

        assert!(game.is_solved());
        assert_eq!(game.score(), Some(4 * POINTS_PER_BLANK - MISTAKE_PENALTY));

        let submission = game.submission().unwrap();
        assert_eq!(submission.grid, TEMPLATES[0]);
        assert_eq!(submission.mistakes, 1);
        assert_eq!(submission.puzzle_id, "sudoku::fixed");
    }

    #[test]
    fn test_clear_only_player_cells() {
        let puzzle = SudokuPuzzle::generate(SudokuPuzzle::generate_id(), 7);
        let solution = TEMPLATES[puzzle.template as usize];
        let mut game = SudokuGame::new(puzzle);
        let blank = game.cells().iter().position(|c| c.is_none()).unwrap();
        let given = game.cells().iter().position(|c| c.is_some()).unwrap();

        game.place(blank, solution[blank]).unwrap();
        game.clear(blank).unwrap();
        assert!(game.cells()[blank].is_none());
        assert_eq!(game.clear(given), Err(PlacementError::FixedCell(given)));
    }

    #[test]
    fn test_is_solved_by_rejects_changed_givens() {
        let puzzle = SudokuPuzzle::generate(SudokuPuzzle::generate_id(), 3);
        let given = puzzle.cells.iter().position(|c| c.is_some()).unwrap();
        let solution = TEMPLATES[puzzle.template as usize];

        // another template that differs at a given cell is a Latin square but not a solution
        let other = TEMPLATES
            .iter()
            .find(|t| t[given] != solution[given])
            .unwrap();
        assert!(!puzzle.is_solved_by(other));
        assert!(puzzle.is_solved_by(&solution));
        assert!(!puzzle.is_solved_by(&[1, 1, 1, 2, 2, 2, 3, 3, 3]));
        assert!(!puzzle.is_solved_by(&[0; CELLS]));
    }

    #[test]
    fn test_score() {
        assert_eq!(score(4, 0), 40);
        assert_eq!(score(4, 3), 34);
        assert_eq!(score(4, 100), MIN_SCORE);
        assert_eq!(score(0, 0), MIN_SCORE);
    }
}
