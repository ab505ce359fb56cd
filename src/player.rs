use std::collections::VecDeque;

use crate::board::Board;
use crate::piece::{Piece, Tetromino};
use crate::randomizer::{Randomizer, RandomizerKind, randomizer_from_kind};

pub const DEFAULT_QUEUE_SIZE: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockOutcome {
    /// A cell landed above the field; nothing was written.
    ToppedOut,
    Locked { cleared: usize, spawn_blocked: bool },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoftDrop {
    Moved,
    Landed(LockOutcome),
}

/// Owns the board, the falling piece, the lookahead queue and the hold slot.
pub struct Player {
    board: Board,
    active: Option<Piece>,
    queue: VecDeque<Piece>,
    queue_size: usize,
    hold: Option<Piece>,
    can_hold: bool,
    randomizer: Box<dyn Randomizer>,
}

impl Player {
    pub fn new(kind: &RandomizerKind, queue_size: usize) -> Self {
        Self::with_randomizer(randomizer_from_kind(kind), queue_size)
    }

    pub fn with_randomizer(randomizer: Box<dyn Randomizer>, queue_size: usize) -> Self {
        Self {
            board: Board::new(),
            active: None,
            queue: VecDeque::new(),
            queue_size: queue_size.max(1),
            hold: None,
            can_hold: true,
            randomizer,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn active(&self) -> Option<&Piece> {
        self.active.as_ref()
    }

    pub fn queue(&self) -> impl Iterator<Item = &Piece> {
        self.queue.iter()
    }

    pub fn held(&self) -> Option<&Piece> {
        self.hold.as_ref()
    }

    pub fn can_hold(&self) -> bool {
        self.can_hold
    }

    pub fn set_randomizer(&mut self, kind: &RandomizerKind) {
        self.randomizer = randomizer_from_kind(kind);
        self.queue.clear();
    }

    pub fn reset(&mut self) {
        self.board.reset();
        self.active = None;
        self.queue.clear();
        self.hold = None;
        self.can_hold = true;
    }

    fn refill_queue(&mut self, special: bool) {
        if self.queue.len() >= self.queue_size {
            return;
        }
        let profile = self.board.profile();
        while self.queue.len() < self.queue_size {
            let kind = self.randomizer.next(&profile, special);
            self.queue.push_back(Piece::new(kind, special));
        }
    }

    fn take_next(&mut self, special: bool) -> Piece {
        self.refill_queue(special);
        let next = self.queue.pop_front();
        self.refill_queue(special);
        next.unwrap_or_else(|| Piece::new(Tetromino::I, special))
    }

    /// Puts `piece` at the spawn point. Returns false when it already collides.
    pub fn spawn(&mut self, mut piece: Piece) -> bool {
        piece.reset_to_spawn();
        let fits = piece.fits(&self.board);
        self.active = Some(piece);
        fits
    }

    pub fn spawn_next(&mut self, special: bool) -> bool {
        let next = self.take_next(special);
        self.spawn(next)
    }

    pub fn try_shift(&mut self, dcol: i32) -> bool {
        match self.active.as_mut() {
            Some(piece) => piece.try_shift(&self.board, dcol),
            None => false,
        }
    }

    pub fn try_rotate(&mut self) -> bool {
        match self.active.as_mut() {
            Some(piece) => piece.try_rotate(&self.board),
            None => false,
        }
    }

    pub fn try_step_down(&mut self) -> bool {
        match self.active.as_mut() {
            Some(piece) => piece.try_step_down(&self.board),
            None => false,
        }
    }

    /// One step down, locking when blocked.
    pub fn soft_drop(&mut self, special: bool) -> SoftDrop {
        if self.try_step_down() {
            SoftDrop::Moved
        } else {
            SoftDrop::Landed(self.lock(special))
        }
    }

    /// Drops to the floor and locks. Returns the rows travelled.
    pub fn hard_drop(&mut self, special: bool) -> (u32, LockOutcome) {
        let mut distance = 0;
        while self.try_step_down() {
            distance += 1;
        }
        (distance, self.lock(special))
    }

    /// At most one swap per lock cycle.
    pub fn hold(&mut self, special: bool) -> bool {
        if !self.can_hold {
            return false;
        }
        let Some(mut current) = self.active.take() else {
            return false;
        };
        current.reset_to_spawn();
        let adopted = match self.hold.replace(current) {
            Some(held) => held,
            None => self.take_next(special),
        };
        self.spawn(adopted);
        self.can_hold = false;
        true
    }

    pub fn lock(&mut self, special: bool) -> LockOutcome {
        let Some(piece) = self.active.as_ref() else {
            return LockOutcome::ToppedOut;
        };
        let color = piece.color;
        let cells: Vec<_> = piece.cells().map(|(col, row)| (col, row, color)).collect();
        if self.board.lock(cells).is_err() {
            return LockOutcome::ToppedOut;
        }
        let cleared = self.board.clear_completed_rows();
        self.can_hold = true;
        let spawn_blocked = !self.spawn_next(special);
        LockOutcome::Locked {
            cleared,
            spawn_blocked,
        }
    }

    /// Wipes the top `rows` rows and brings in the next queued piece.
    pub fn revive(&mut self, rows: usize, special: bool) -> bool {
        self.board.clear_top_rows(rows);
        self.can_hold = true;
        self.spawn_next(special)
    }

    pub fn ghost(&self) -> Option<Piece> {
        self.active.as_ref().map(|piece| piece.ghost(&self.board))
    }
}
