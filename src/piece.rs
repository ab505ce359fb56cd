use serde::{Deserialize, Serialize};
use tsify::Tsify;

use crate::board::{Board, COLS};

/// Column offsets tried, in order, when a rotation collides in place.
pub const KICK_OFFSETS: [i32; 4] = [-1, 1, -2, 2];

const MAX_SPAN: usize = 4;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Tsify)]
pub enum Tetromino {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl Tetromino {
    pub fn all() -> [Tetromino; 7] {
        [
            Tetromino::I,
            Tetromino::O,
            Tetromino::T,
            Tetromino::S,
            Tetromino::Z,
            Tetromino::J,
            Tetromino::L,
        ]
    }

    pub fn color_id(self) -> u8 {
        match self {
            Tetromino::I => 1,
            Tetromino::O => 2,
            Tetromino::T => 3,
            Tetromino::S => 4,
            Tetromino::Z => 5,
            Tetromino::J => 6,
            Tetromino::L => 7,
        }
    }

    /// Special mode paints by difficulty: easy pieces green, S/Z red, J/L amber.
    pub fn special_color_id(self) -> u8 {
        match self {
            Tetromino::I | Tetromino::O | Tetromino::T => 8,
            Tetromino::S | Tetromino::Z => 9,
            Tetromino::J | Tetromino::L => 10,
        }
    }

    fn layout(self) -> &'static [&'static [u8]] {
        match self {
            Tetromino::I => &[&[1, 1, 1, 1]],
            Tetromino::O => &[&[1, 1], &[1, 1]],
            Tetromino::T => &[&[0, 1, 0], &[1, 1, 1]],
            Tetromino::S => &[&[0, 1, 1], &[1, 1, 0]],
            Tetromino::Z => &[&[1, 1, 0], &[0, 1, 1]],
            Tetromino::J => &[&[1, 0, 0], &[1, 1, 1]],
            Tetromino::L => &[&[0, 0, 1], &[1, 1, 1]],
        }
    }
}

pub fn palette(color_id: u8) -> Option<&'static str> {
    match color_id {
        1 => Some("#00f5ff"),
        2 => Some("#ffeb3b"),
        3 => Some("#9c27b0"),
        4 => Some("#4caf50"),
        5 => Some("#f44336"),
        6 => Some("#2196f3"),
        7 => Some("#ff9800"),
        8 => Some("#00ff88"),
        9 => Some("#ff4444"),
        10 => Some("#ffaa00"),
        _ => None,
    }
}

/// Row-major occupancy matrix, at most 4x4.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shape {
    width: usize,
    height: usize,
    cells: [[bool; MAX_SPAN]; MAX_SPAN],
}

impl Shape {
    pub fn of(kind: Tetromino) -> Self {
        let layout = kind.layout();
        let mut cells = [[false; MAX_SPAN]; MAX_SPAN];
        for (row, line) in layout.iter().enumerate() {
            for (col, &bit) in line.iter().enumerate() {
                cells[row][col] = bit != 0;
            }
        }
        Self {
            width: layout[0].len(),
            height: layout.len(),
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn filled(&self, col: usize, row: usize) -> bool {
        col < self.width && row < self.height && self.cells[row][col]
    }

    pub fn rotated_cw(&self) -> Shape {
        let mut cells = [[false; MAX_SPAN]; MAX_SPAN];
        for row in 0..self.height {
            for col in 0..self.width {
                cells[col][self.height - 1 - row] = self.cells[row][col];
            }
        }
        Shape {
            width: self.height,
            height: self.width,
            cells,
        }
    }

    /// Occupied `(col, row)` offsets from the shape origin.
    pub fn offsets(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (0..self.height).flat_map(move |row| {
            (0..self.width)
                .filter(move |&col| self.cells[row][col])
                .map(move |col| (col as i32, row as i32))
        })
    }
}

pub fn spawn_col(width: usize) -> i32 {
    (COLS as i32 - width as i32).div_euclid(2)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Piece {
    pub kind: Tetromino,
    pub shape: Shape,
    pub col: i32,
    pub row: i32,
    pub color: u8,
}

impl Piece {
    pub fn new(kind: Tetromino, special: bool) -> Self {
        let shape = Shape::of(kind);
        Self {
            kind,
            col: spawn_col(shape.width()),
            row: 0,
            shape,
            color: if special {
                kind.special_color_id()
            } else {
                kind.color_id()
            },
        }
    }

    /// Back to the canonical orientation at the spawn point, keeping the color.
    pub fn reset_to_spawn(&mut self) {
        self.shape = Shape::of(self.kind);
        self.col = spawn_col(self.shape.width());
        self.row = 0;
    }

    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.shape
            .offsets()
            .map(move |(dc, dr)| (self.col + dc, self.row + dr))
    }

    pub fn fits(&self, board: &Board) -> bool {
        board.fits(&self.shape, self.col, self.row)
    }

    pub fn try_shift(&mut self, board: &Board, dcol: i32) -> bool {
        if !board.fits(&self.shape, self.col + dcol, self.row) {
            return false;
        }
        self.col += dcol;
        true
    }

    pub fn try_step_down(&mut self, board: &Board) -> bool {
        if !board.fits(&self.shape, self.col, self.row + 1) {
            return false;
        }
        self.row += 1;
        true
    }

    /// Clockwise, then the column kicks in order. No vertical kicks.
    pub fn try_rotate(&mut self, board: &Board) -> bool {
        let rotated = self.shape.rotated_cw();
        let landing = std::iter::once(0)
            .chain(KICK_OFFSETS)
            .find(|&dc| board.fits(&rotated, self.col + dc, self.row));
        match landing {
            Some(dc) => {
                self.shape = rotated;
                self.col += dc;
                true
            }
            None => false,
        }
    }

    pub fn drop_distance(&self, board: &Board) -> i32 {
        let mut distance = 0;
        while board.fits(&self.shape, self.col, self.row + distance + 1) {
            distance += 1;
        }
        distance
    }

    pub fn ghost(&self, board: &Board) -> Piece {
        Piece {
            row: self.row + self.drop_distance(board),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_of(shape: &Shape) -> Vec<String> {
        (0..shape.height())
            .map(|r| {
                (0..shape.width())
                    .map(|c| if shape.filled(c, r) { '#' } else { '.' })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn canonical_layouts() {
        assert_eq!(rows_of(&Shape::of(Tetromino::I)), ["####"]);
        assert_eq!(rows_of(&Shape::of(Tetromino::O)), ["##", "##"]);
        assert_eq!(rows_of(&Shape::of(Tetromino::T)), [".#.", "###"]);
        assert_eq!(rows_of(&Shape::of(Tetromino::S)), [".##", "##."]);
        assert_eq!(rows_of(&Shape::of(Tetromino::Z)), ["##.", ".##"]);
        assert_eq!(rows_of(&Shape::of(Tetromino::J)), ["#..", "###"]);
        assert_eq!(rows_of(&Shape::of(Tetromino::L)), ["..#", "###"]);
    }

    #[test]
    fn clockwise_rotation_of_t() {
        let t = Shape::of(Tetromino::T).rotated_cw();
        assert_eq!(rows_of(&t), ["#.", "##", "#."]);
    }

    #[test]
    fn four_rotations_restore_every_shape() {
        let board = Board::new();
        for kind in Tetromino::all() {
            let mut piece = Piece::new(kind, false);
            piece.row = 8;
            let original = piece.shape;
            for _ in 0..4 {
                assert!(piece.try_rotate(&board), "{kind:?} should rotate in open space");
            }
            assert_eq!(piece.shape, original);
        }
    }

    #[test]
    fn spawn_is_centered() {
        assert_eq!(Piece::new(Tetromino::I, false).col, 3);
        assert_eq!(Piece::new(Tetromino::O, false).col, 4);
        assert_eq!(Piece::new(Tetromino::T, false).col, 3);
        assert_eq!(Piece::new(Tetromino::L, true).color, 10);
    }

    #[test]
    fn shift_stops_at_walls() {
        let board = Board::new();
        let mut piece = Piece::new(Tetromino::O, false);
        while piece.try_shift(&board, -1) {}
        assert_eq!(piece.col, 0);
        assert!(!piece.try_shift(&board, -1));
        assert_eq!(piece.col, 0);
    }

    #[test]
    fn rotation_kicks_off_the_right_wall() {
        let board = Board::new();
        let mut piece = Piece::new(Tetromino::I, false);
        piece.row = 5;
        assert!(piece.try_rotate(&board));
        while piece.try_shift(&board, 1) {}
        assert_eq!(piece.col, 9);

        let mut near_wall = piece.clone();
        near_wall.col = 8;
        assert!(near_wall.try_rotate(&board));
        assert_eq!(near_wall.col, 6);
        assert_eq!(near_wall.shape.width(), 4);
    }

    #[test]
    fn rotation_tries_left_kick_first() {
        let mut board = Board::new();
        let mut piece = Piece::new(Tetromino::T, false);
        piece.row = 10;
        piece.col = 4;
        // in place the rotated T would cover (4,12)
        board.lock([(4, 12, 1)]).unwrap();
        assert!(piece.try_rotate(&board));
        assert_eq!(piece.col, 3);
    }

    #[test]
    fn rotation_rejected_when_no_kick_fits() {
        let mut board = Board::new();
        for row in 0..20 {
            for col in [0, 1, 2, 6, 7, 8, 9] {
                board.lock([(col, row, 1)]).unwrap();
            }
        }
        let mut piece = Piece::new(Tetromino::I, false);
        piece.col = 3;
        piece.row = 5;
        piece.shape = piece.shape.rotated_cw();
        let before = piece.clone();
        assert!(!piece.try_rotate(&board));
        assert_eq!(piece, before);
    }

    #[test]
    fn ghost_lands_on_the_floor() {
        let board = Board::new();
        let piece = Piece::new(Tetromino::O, false);
        assert_eq!(piece.drop_distance(&board), 18);
        assert_eq!(piece.ghost(&board).row, 18);
    }
}
