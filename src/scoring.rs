use serde::Serialize;
use tsify::Tsify;

pub const LINE_SCORES: [u32; 6] = [0, 100, 300, 500, 800, 1200];
pub const MAX_COMBO_MULTIPLIER: u32 = 5;
pub const SPECIAL_MULTIPLIER: u32 = 2;
pub const LINES_PER_LEVEL: u32 = 10;
pub const BASE_DROP_INTERVAL_MS: f64 = 1000.0;
pub const DROP_INTERVAL_STEP_MS: f64 = 80.0;
pub const MIN_DROP_INTERVAL_MS: f64 = 100.0;
pub const SOFT_DROP_POINTS: u32 = 1;
pub const HARD_DROP_POINTS_PER_ROW: u32 = 2;
pub const COINS_PER_POINT_DIVISOR: u32 = 10;

const PENTA_LINES: usize = 5;
const LEGENDARY_COMBO: u32 = 8;

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq, Tsify)]
pub struct Bonus {
    pub score: u32,
    pub coins: u32,
}

pub const PENTA_BONUS: Bonus = Bonus { score: 10, coins: 5 };
pub const LEGENDARY_BONUS: Bonus = Bonus {
    score: 20,
    coins: 10,
};

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq, Tsify)]
pub enum Streak {
    FirstBlood,
    Double,
    Triple,
    Quadra,
    Penta,
}

impl Streak {
    pub fn for_lines(lines: usize) -> Streak {
        match lines {
            0 | 1 => Streak::FirstBlood,
            2 => Streak::Double,
            3 => Streak::Triple,
            4 => Streak::Quadra,
            _ => Streak::Penta,
        }
    }
}

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq, Tsify)]
pub enum ComboTier {
    None,
    Three,
    Five,
    Legendary,
}

impl ComboTier {
    pub fn for_combo(combo: u32) -> ComboTier {
        match combo {
            c if c >= LEGENDARY_COMBO => ComboTier::Legendary,
            c if c >= 5 => ComboTier::Five,
            c if c >= 3 => ComboTier::Three,
            _ => ComboTier::None,
        }
    }
}

/// What one scoring lock produced, for progression, audio and the banner.
#[derive(Clone, Serialize, Debug, PartialEq, Eq, Tsify)]
#[serde(rename_all = "camelCase")]
pub struct ClearReport {
    pub lines: usize,
    pub combo: u32,
    pub points: u32,
    pub coins: u32,
    pub streak: Streak,
    pub combo_tier: ComboTier,
    pub bonuses: Vec<Bonus>,
    pub level: u32,
    pub level_changed: bool,
}

impl ClearReport {
    pub fn bonus_score(&self) -> u32 {
        self.bonuses.iter().map(|b| b.score).sum()
    }

    pub fn bonus_coins(&self) -> u32 {
        self.bonuses.iter().map(|b| b.coins).sum()
    }
}

pub fn line_score(lines: usize, combo: u32, special: bool) -> u32 {
    let base = LINE_SCORES[lines.min(LINE_SCORES.len() - 1)];
    let base_multiplier = if special { SPECIAL_MULTIPLIER } else { 1 };
    base * base_multiplier * combo.min(MAX_COMBO_MULTIPLIER)
}

pub fn session_level(lines: u32) -> u32 {
    lines / LINES_PER_LEVEL + 1
}

pub fn drop_interval_ms(level: u32) -> f64 {
    let level = level.max(1) as f64;
    (BASE_DROP_INTERVAL_MS - (level - 1.0) * DROP_INTERVAL_STEP_MS).max(MIN_DROP_INTERVAL_MS)
}

#[derive(Clone, Serialize, Debug, PartialEq, Tsify)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub score: u32,
    pub lines: u32,
    pub level: u32,
    pub combo: u32,
    pub drop_interval_ms: f64,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            score: 0,
            lines: 0,
            level: 1,
            combo: 0,
            drop_interval_ms: BASE_DROP_INTERVAL_MS,
        }
    }

    pub fn add_points(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    pub fn break_combo(&mut self) {
        self.combo = 0;
    }

    /// Applies one lock's clear count. Returns `None` when nothing cleared.
    pub fn record_lock(&mut self, cleared: usize, special: bool) -> Option<ClearReport> {
        if cleared == 0 {
            self.break_combo();
            return None;
        }
        self.combo = self.combo.saturating_add(1);
        let points = line_score(cleared, self.combo, special);
        self.add_points(points);
        self.lines = self.lines.saturating_add(cleared as u32);

        let mut bonuses = Vec::new();
        if cleared >= PENTA_LINES {
            bonuses.push(PENTA_BONUS);
        }
        if self.combo >= LEGENDARY_COMBO {
            bonuses.push(LEGENDARY_BONUS);
        }
        for bonus in &bonuses {
            self.add_points(bonus.score);
        }

        let level = session_level(self.lines);
        let level_changed = level != self.level;
        self.level = level;
        self.drop_interval_ms = drop_interval_ms(level);

        Some(ClearReport {
            lines: cleared,
            combo: self.combo,
            points,
            coins: points / COINS_PER_POINT_DIVISOR,
            streak: Streak::for_lines(cleared),
            combo_tier: ComboTier::for_combo(self.combo),
            bonuses,
            level,
            level_changed,
        })
    }
}
