use crate::piece::Shape;

pub const COLS: usize = 10;
pub const ROWS: usize = 20;
pub const EMPTY: u8 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutOfBounds {
    pub col: i32,
    pub row: i32,
}

/// Raised when a lock would write above the visible field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TopOut;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    cells: [[u8; COLS]; ROWS],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: [[EMPTY; COLS]; ROWS],
        }
    }

    pub fn reset(&mut self) {
        self.cells = [[EMPTY; COLS]; ROWS];
    }

    pub fn cell(&self, col: usize, row: usize) -> u8 {
        self.cells[row][col]
    }

    pub fn rows(&self) -> &[[u8; COLS]; ROWS] {
        &self.cells
    }

    /// Rows above the field (`row < 0`) are the spawn buffer and always read as empty.
    pub fn is_occupied(&self, col: i32, row: i32) -> Result<bool, OutOfBounds> {
        if col < 0 || col >= COLS as i32 || row >= ROWS as i32 {
            return Err(OutOfBounds { col, row });
        }
        if row < 0 {
            return Ok(false);
        }
        Ok(self.cells[row as usize][col as usize] != EMPTY)
    }

    pub fn fits(&self, shape: &Shape, col: i32, row: i32) -> bool {
        shape
            .offsets()
            .all(|(dc, dr)| matches!(self.is_occupied(col + dc, row + dr), Ok(false)))
    }

    /// Writes every cell or none of them.
    pub fn lock<I>(&mut self, cells: I) -> Result<(), TopOut>
    where
        I: IntoIterator<Item = (i32, i32, u8)>,
    {
        let cells: Vec<(i32, i32, u8)> = cells.into_iter().collect();
        if cells.iter().any(|&(_, row, _)| row < 0) {
            return Err(TopOut);
        }
        for (col, row, color) in cells {
            if (0..COLS as i32).contains(&col) && row < ROWS as i32 {
                self.cells[row as usize][col as usize] = color;
            }
        }
        Ok(())
    }

    pub fn clear_completed_rows(&mut self) -> usize {
        let mut cleared = 0;
        let mut row = ROWS;
        while row > 0 {
            let y = row - 1;
            if self.cells[y].iter().all(|&c| c != EMPTY) {
                cleared += 1;
                // pull everything above down one; the same index is checked again
                self.cells.copy_within(0..y, 1);
                self.cells[0] = [EMPTY; COLS];
            } else {
                row -= 1;
            }
        }
        cleared
    }

    pub fn clear_top_rows(&mut self, count: usize) {
        for row in self.cells.iter_mut().take(count) {
            *row = [EMPTY; COLS];
        }
    }

    /// Drops the bottom `count` rows and shifts the rest of the stack down.
    pub fn destroy_bottom_rows(&mut self, count: usize) {
        let count = count.min(ROWS);
        self.cells.copy_within(0..ROWS - count, count);
        for row in self.cells.iter_mut().take(count) {
            *row = [EMPTY; COLS];
        }
    }

    pub fn profile(&self) -> BoardProfile {
        BoardProfile::of(self)
    }
}

/// Read-only shape summary handed to the piece generator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardProfile {
    pub heights: [usize; COLS],
    pub has_hole: bool,
    pub left_height: usize,
    pub right_height: usize,
    pub max_height: usize,
}

impl BoardProfile {
    pub fn of(board: &Board) -> Self {
        let mut heights = [0; COLS];
        let mut has_hole = false;
        for (col, height) in heights.iter_mut().enumerate() {
            let top = (0..ROWS).find(|&row| board.cells[row][col] != EMPTY);
            if let Some(top) = top {
                *height = ROWS - top;
                has_hole |= (top..ROWS).any(|row| board.cells[row][col] == EMPTY);
            }
        }
        let left_height = heights[..COLS / 2].iter().sum();
        let right_height = heights[COLS / 2..].iter().sum();
        let max_height = heights.iter().copied().max().unwrap_or(0);
        Self {
            heights,
            has_hole,
            left_height,
            right_height,
            max_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_row(board: &mut Board, row: i32, except: Option<i32>) {
        let cells = (0..COLS as i32)
            .filter(|&c| Some(c) != except)
            .map(|c| (c, row, 1));
        board.lock(cells).unwrap();
    }

    #[test]
    fn occupancy_bounds() {
        let board = Board::new();
        assert_eq!(board.is_occupied(-1, 5), Err(OutOfBounds { col: -1, row: 5 }));
        assert!(board.is_occupied(COLS as i32, 5).is_err());
        assert!(board.is_occupied(0, ROWS as i32).is_err());
        assert_eq!(board.is_occupied(3, -2), Ok(false));
        assert_eq!(board.is_occupied(3, 19), Ok(false));
    }

    #[test]
    fn lock_above_field_tops_out_without_writing() {
        let mut board = Board::new();
        let before = board.clone();
        assert_eq!(board.lock([(4, 0, 2), (4, -1, 2)]), Err(TopOut));
        assert_eq!(board, before);
        assert_eq!(board.lock([(4, 0, 2), (5, 0, 2)]), Ok(()));
        assert_eq!(board.cell(4, 0), 2);
    }

    #[test]
    fn clearing_without_full_rows_changes_nothing() {
        let mut board = Board::new();
        fill_row(&mut board, 19, Some(3));
        fill_row(&mut board, 18, Some(0));
        board.lock([(5, 10, 4)]).unwrap();
        let before = board.clone();
        assert_eq!(board.clear_completed_rows(), 0);
        assert_eq!(board, before);
    }

    #[test]
    fn completing_a_row_collapses_the_stack() {
        let mut board = Board::new();
        fill_row(&mut board, 19, Some(9));
        board.lock([(2, 18, 5)]).unwrap();
        assert_eq!(board.clear_completed_rows(), 0);

        board.lock([(9, 19, 6)]).unwrap();
        assert_eq!(board.clear_completed_rows(), 1);
        assert_eq!(board.cell(2, 19), 5);
        assert!((0..COLS).filter(|&c| c != 2).all(|c| board.cell(c, 19) == EMPTY));
    }

    #[test]
    fn adjacent_and_split_clears_are_counted_once_each() {
        let mut board = Board::new();
        fill_row(&mut board, 19, None);
        fill_row(&mut board, 18, None);
        board.lock([(0, 17, 3)]).unwrap();
        fill_row(&mut board, 16, None);
        fill_row(&mut board, 15, None);
        board.lock([(7, 14, 2)]).unwrap();

        assert_eq!(board.clear_completed_rows(), 4);
        assert_eq!(board.cell(0, 19), 3);
        assert_eq!(board.cell(7, 18), 2);
        assert_eq!(board.profile().max_height, 2);
    }

    #[test]
    fn destroy_shifts_stack_down() {
        let mut board = Board::new();
        fill_row(&mut board, 19, None);
        board.lock([(1, 15, 7)]).unwrap();
        board.destroy_bottom_rows(3);
        assert_eq!(board.cell(1, 18), 7);
        assert!(board.rows()[19].iter().all(|&c| c == EMPTY));
    }

    #[test]
    fn profile_finds_heights_and_holes() {
        let mut board = Board::new();
        board.lock([(0, 10, 1), (9, 18, 1)]).unwrap();
        let profile = board.profile();
        assert_eq!(profile.heights[0], 10);
        assert_eq!(profile.heights[9], 2);
        assert_eq!(profile.left_height, 10);
        assert_eq!(profile.right_height, 2);
        assert_eq!(profile.max_height, 10);
        assert!(profile.has_hole);

        let mut flat = Board::new();
        fill_row(&mut flat, 19, Some(4));
        assert!(!flat.profile().has_hole);
    }
}
