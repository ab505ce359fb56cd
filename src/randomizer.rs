use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::board::BoardProfile;
use crate::piece::Tetromino;

// Cumulative thresholds over a single roll in [0, 1).
const NORMAL_TABLE: [(f64, Tetromino); 7] = [
    (0.15, Tetromino::I),
    (0.30, Tetromino::O),
    (0.45, Tetromino::T),
    (0.60, Tetromino::S),
    (0.75, Tetromino::Z),
    (0.85, Tetromino::J),
    (1.00, Tetromino::L),
];

const SPECIAL_TABLE: [(f64, Tetromino); 5] = [
    (0.45, Tetromino::I),
    (0.85, Tetromino::O),
    (0.90, Tetromino::L),
    (0.95, Tetromino::J),
    (1.00, Tetromino::T),
];

const PREFERENCE_CHANCE: f64 = 0.3;
const DANGER_HEIGHT: usize = 15;
const TALL_HEIGHT: usize = 12;
const LOPSIDED_MARGIN: usize = 20;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum RandomizerKind {
    #[default]
    Adaptive,
    SinglePiece {
        piece: Tetromino,
    },
}

pub trait Randomizer {
    fn next(&mut self, profile: &BoardProfile, special: bool) -> Tetromino;
}

pub struct SinglePiece {
    piece: Tetromino,
}

impl Randomizer for SinglePiece {
    fn next(&mut self, _profile: &BoardProfile, _special: bool) -> Tetromino {
        self.piece
    }
}

/// Bag-less weighted draw that leans toward whatever the stack needs.
pub struct Adaptive<R: Rng = StdRng> {
    rng: R,
}

impl Adaptive<StdRng> {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for Adaptive<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> Adaptive<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    fn roll(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }
}

impl<R: Rng> Randomizer for Adaptive<R> {
    fn next(&mut self, profile: &BoardProfile, special: bool) -> Tetromino {
        if special {
            let roll = self.roll();
            return pick(&SPECIAL_TABLE, roll);
        }
        if let Some(needed) = preferred_piece(profile) {
            if self.roll() < PREFERENCE_CHANCE {
                return needed;
            }
        }
        let roll = self.roll();
        pick(&NORMAL_TABLE, roll)
    }
}

/// First matching rule wins.
pub fn preferred_piece(profile: &BoardProfile) -> Option<Tetromino> {
    if profile.max_height > DANGER_HEIGHT || profile.has_hole {
        return Some(Tetromino::I);
    }
    if profile.left_height > profile.right_height + LOPSIDED_MARGIN {
        return Some(Tetromino::L);
    }
    if profile.right_height > profile.left_height + LOPSIDED_MARGIN {
        return Some(Tetromino::J);
    }
    if profile.max_height > TALL_HEIGHT {
        return Some(Tetromino::I);
    }
    None
}

fn pick(table: &[(f64, Tetromino)], roll: f64) -> Tetromino {
    table
        .iter()
        .find(|(threshold, _)| roll < *threshold)
        .or(table.last())
        .map(|&(_, piece)| piece)
        .unwrap_or(Tetromino::I)
}

pub fn randomizer_from_kind(kind: &RandomizerKind) -> Box<dyn Randomizer> {
    match kind {
        RandomizerKind::Adaptive => Box::new(Adaptive::new()),
        RandomizerKind::SinglePiece { piece } => Box::new(SinglePiece { piece: *piece }),
    }
}
