//! Pure tic-tac-toe board logic: markers, cells, move application and
//! outcome detection.
//!
//! Nothing in this module performs I/O or locking. The coordinator validates
//! a move (range, emptiness, turn) before calling [`Board::apply_move`], and
//! then asks [`check_outcome`] whether the game is over.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// Side length of the board.
pub const BOARD_SIZE: usize = 3;

/// One of the two per-game roles.
///
/// `X` is the first marker, `O` the second. Which of them moves first is
/// decided randomly by the matchmaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Marker {
    /// First marker.
    X,
    /// Second marker.
    O,
}

impl Marker {
    /// Returns the other role.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }

    /// Board symbol for this marker.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::X => "X",
            Self::O => "O",
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// State of a single board cell.
///
/// Serialized as `""`, `"X"` or `"O"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    /// Nobody has played here yet.
    #[default]
    Empty,
    /// Taken by the given marker. Never reverts to [`Cell::Empty`].
    Marked(Marker),
}

impl Cell {
    /// Returns `true` if the cell has not been played.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the marker occupying the cell, if any.
    #[must_use]
    pub const fn marker(self) -> Option<Marker> {
        match self {
            Self::Empty => None,
            Self::Marked(m) => Some(m),
        }
    }

    /// Wire symbol: empty string for an empty cell.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Empty => "",
            Self::Marked(m) => m.symbol(),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

/// Returned by [`Board::apply_move`] when the target is off the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cell ({x}, {y}) is outside the board")]
pub struct OutOfBounds {
    /// Column.
    pub x: usize,
    /// Row.
    pub y: usize,
}

/// 3×3 grid addressed as `(x, y)`: `x` is the column, `y` the row.
///
/// Serializes as an array of three rows, each an array of three cell
/// symbols.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Board {
    rows: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a board from rows, top to bottom.
    #[must_use]
    pub const fn from_rows(rows: [[Cell; BOARD_SIZE]; BOARD_SIZE]) -> Self {
        Self { rows }
    }

    /// Returns the rows, top to bottom.
    #[must_use]
    pub const fn rows(&self) -> &[[Cell; BOARD_SIZE]; BOARD_SIZE] {
        &self.rows
    }

    /// Returns the cell at column `x`, row `y`, or `None` off the grid.
    #[must_use]
    pub fn cell(&self, x: usize, y: usize) -> Option<Cell> {
        self.rows.get(y).and_then(|row| row.get(x)).copied()
    }

    /// Marks the cell at column `x`, row `y` with `marker`.
    ///
    /// The caller is responsible for checking that the cell is empty and that
    /// it is `marker`'s turn.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfBounds`] if `(x, y)` is not on the grid.
    pub fn apply_move(&mut self, x: usize, y: usize, marker: Marker) -> Result<(), OutOfBounds> {
        let cell = self
            .rows
            .get_mut(y)
            .and_then(|row| row.get_mut(x))
            .ok_or(OutOfBounds { x, y })?;
        *cell = Cell::Marked(marker);
        Ok(())
    }

    /// Returns `true` when no empty cell remains.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.rows.iter().flatten().all(|cell| !cell.is_empty())
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.rows.iter().flatten().filter(|cell| !cell.is_empty()).count()
    }
}

impl fmt::Display for Board {
    /// One line per row, `.` for empty cells.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            for cell in row {
                match cell.marker() {
                    Some(m) => write!(f, "{m}")?,
                    None => f.write_str(".")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Result of evaluating a board. Exactly one variant holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No line is complete and at least one cell is empty.
    InProgress,
    /// The marker completed a line.
    Win(Marker),
    /// Every cell is filled and no line is complete.
    Draw,
}

impl Outcome {
    /// The winning marker, if any.
    #[must_use]
    pub const fn winner(self) -> Option<Marker> {
        match self {
            Self::Win(m) => Some(m),
            Self::InProgress | Self::Draw => None,
        }
    }

    /// Whether the game ended without a winner.
    #[must_use]
    pub const fn is_draw(self) -> bool {
        matches!(self, Self::Draw)
    }

    /// Whether no further moves are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// The eight winning lines as `(x, y)` triples, in evaluation order:
/// rows top to bottom, columns left to right, main diagonal, anti-diagonal.
const LINES: [[(usize, usize); 3]; 8] = [
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(2, 0), (1, 1), (0, 2)],
];

/// Evaluates the board.
///
/// Lines are checked independently in the fixed [`LINES`] order and the
/// first uniform, non-empty line decides the winner, even if a malformed
/// board completes more than one line.
#[must_use]
pub fn check_outcome(board: &Board) -> Outcome {
    for [a, b, c] in LINES {
        let first = board.cell(a.0, a.1);
        if let Some(Cell::Marked(marker)) = first
            && first == board.cell(b.0, b.1)
            && first == board.cell(c.0, c.1)
        {
            return Outcome::Win(marker);
        }
    }

    if board.is_full() {
        Outcome::Draw
    } else {
        Outcome::InProgress
    }
}
