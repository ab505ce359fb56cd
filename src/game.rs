use serde::{Deserialize, Serialize};
use tsify::Tsify;

use crate::audio::{AudioSettings, AudioSink, SoundCue};
use crate::input::{InputState, Intent, RepeatAction, is_restart_key, is_start_key};
use crate::log;
use crate::piece::{Piece, Tetromino};
use crate::player::{LockOutcome, Player, SoftDrop};
use crate::progress::{LEVEL_UP_COINS_PER_LEVEL, ProgressData, ProgressStore, Progression};
use crate::randomizer::RandomizerKind;
use crate::scoring::{ClearReport, ComboTier, HARD_DROP_POINTS_PER_ROW, RunStats, SOFT_DROP_POINTS};

pub const REVIVE_CLEARED_ROWS: usize = 5;
pub const DESTROYED_ROWS: usize = 3;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GameSettings {
    pub ghost_enabled: bool,
    pub queue_size: usize,
    pub initial_repeat_delay_ms: f64,
    pub repeat_interval_ms: f64,
    pub randomizer: RandomizerKind,
    pub sound_enabled: bool,
    pub music_enabled: bool,
    pub volume: f32,
    pub music_volume: f32,
}

impl Default for GameSettings {
    fn default() -> Self {
        let audio = AudioSettings::default();
        Self {
            ghost_enabled: true,
            queue_size: 5,
            initial_repeat_delay_ms: 200.0,
            repeat_interval_ms: 60.0,
            randomizer: RandomizerKind::default(),
            sound_enabled: audio.sound_enabled,
            music_enabled: audio.music_enabled,
            volume: audio.volume,
            music_volume: audio.music_volume,
        }
    }
}

impl GameSettings {
    pub fn audio(&self) -> AudioSettings {
        AudioSettings {
            sound_enabled: self.sound_enabled,
            music_enabled: self.music_enabled,
            volume: self.volume,
            music_volume: self.music_volume,
        }
    }
}

/// Capability flags owned by whoever unlocks them. Read at every decision point.
pub trait ModeFlags {
    fn is_special_mode(&self) -> bool;
    fn is_dev_mode(&self) -> bool;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modes {
    pub special: bool,
    pub dev: bool,
}

impl ModeFlags for Modes {
    fn is_special_mode(&self) -> bool {
        self.special
    }

    fn is_dev_mode(&self) -> bool {
        self.dev
    }
}

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq, Tsify)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Playing,
    Paused,
    Over,
}

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq, Tsify)]
pub struct Point {
    pub x: i8,
    pub y: i8,
}

#[derive(Clone, Serialize, Debug, PartialEq, Tsify)]
pub struct PieceView {
    pub kind: Tetromino,
    pub color: u8,
    pub blocks: Vec<Point>,
}

impl PieceView {
    fn of(piece: &Piece) -> Self {
        Self {
            kind: piece.kind,
            color: piece.color,
            blocks: piece
                .shape
                .offsets()
                .map(|(x, y)| Point {
                    x: x as i8,
                    y: y as i8,
                })
                .collect(),
        }
    }
}

/// Everything the page needs to draw one frame.
#[derive(Clone, Serialize, Debug, PartialEq, Tsify)]
#[serde(rename_all = "camelCase")]
pub struct FrameView {
    pub field: Vec<u8>,
    pub active: Vec<Point>,
    pub active_color: u8,
    pub ghost: Vec<Point>,
    pub hold: Option<PieceView>,
    pub can_hold: bool,
    pub next: Vec<PieceView>,
    pub phase: Phase,
    pub stats: RunStats,
    pub clear: Option<ClearReport>,
    pub level_up: Option<u32>,
    pub progress: ProgressData,
    pub level_progress: f64,
    pub special_mode: bool,
    pub dev_mode: bool,
}

fn points_of(piece: &Piece) -> Vec<Point> {
    piece
        .cells()
        .map(|(col, row)| Point {
            x: col as i8,
            y: row as i8,
        })
        .collect()
}

/// One player's run: board, falling piece, counters and the collaborators
/// that outlive it (progression, audio, mode flags).
pub struct Session<S: ProgressStore, A: AudioSink, M: ModeFlags = Modes> {
    settings: GameSettings,
    player: Player,
    stats: RunStats,
    phase: Phase,
    input: InputState,
    progress: Progression<S>,
    audio: A,
    modes: M,
    last_drop_ms: f64,
    paused_at: Option<f64>,
    clear: Option<ClearReport>,
    level_up: Option<u32>,
}

impl<S: ProgressStore, A: AudioSink, M: ModeFlags> Session<S, A, M> {
    pub fn new(settings: GameSettings, store: S, audio: A, modes: M) -> Self {
        Self {
            player: Player::new(&settings.randomizer, settings.queue_size),
            input: InputState::new(settings.initial_repeat_delay_ms, settings.repeat_interval_ms),
            settings,
            stats: RunStats::new(),
            phase: Phase::Idle,
            progress: Progression::load(store),
            audio,
            modes,
            last_drop_ms: 0.0,
            paused_at: None,
            clear: None,
            level_up: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn progress(&self) -> &Progression<S> {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut Progression<S> {
        &mut self.progress
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    pub fn modes(&self) -> &M {
        &self.modes
    }

    pub fn modes_mut(&mut self) -> &mut M {
        &mut self.modes
    }

    pub fn set_ghost_enabled(&mut self, enabled: bool) {
        self.settings.ghost_enabled = enabled;
    }

    pub fn set_randomizer(&mut self, kind: RandomizerKind) {
        self.player.set_randomizer(&kind);
        self.settings.randomizer = kind;
    }

    fn is_playing(&self) -> bool {
        self.phase == Phase::Playing
    }

    pub fn start(&mut self, now_ms: f64) {
        if self.phase != Phase::Idle {
            return;
        }
        self.player.reset();
        self.stats = RunStats::new();
        self.input.clear();
        self.clear = None;
        self.level_up = None;
        self.last_drop_ms = now_ms;
        self.phase = Phase::Playing;
        if !self.player.spawn_next(self.modes.is_special_mode()) {
            self.game_over();
        }
    }

    /// Back to the start screen with a fresh board.
    pub fn restart(&mut self) {
        self.player.reset();
        self.stats = RunStats::new();
        self.input.clear();
        self.paused_at = None;
        self.clear = None;
        self.level_up = None;
        self.phase = Phase::Idle;
    }

    pub fn toggle_pause(&mut self, now_ms: f64) {
        match self.phase {
            Phase::Playing => {
                self.phase = Phase::Paused;
                self.paused_at = Some(now_ms);
                self.input.repeat.suspend(now_ms);
            }
            Phase::Paused => {
                self.phase = Phase::Playing;
                if let Some(paused_at) = self.paused_at.take() {
                    self.last_drop_ms += (now_ms - paused_at).max(0.0);
                }
                self.input.repeat.resume(now_ms);
            }
            Phase::Idle | Phase::Over => {}
        }
    }

    /// Advances repeats and gravity. Returns false when nothing is running.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        if !self.is_playing() {
            return false;
        }
        if self.input.repeat_is_orphaned() {
            self.emergency_reset();
        }
        if self.input.repeat.poll(now_ms) {
            match self.input.repeat.action() {
                Some(RepeatAction::Shift(dcol)) => {
                    self.player.try_shift(dcol);
                }
                Some(RepeatAction::SoftDrop) => self.soft_drop_step(false),
                None => {}
            }
        }
        if self.is_playing() && now_ms - self.last_drop_ms > self.stats.drop_interval_ms {
            self.gravity_step();
            self.last_drop_ms = now_ms;
        }
        true
    }

    fn gravity_step(&mut self) {
        if let SoftDrop::Landed(outcome) = self.player.soft_drop(self.modes.is_special_mode()) {
            self.settle(outcome);
        }
    }

    /// Keyboard entry point. Returns true when the key meant something here.
    pub fn key_down(&mut self, key: &str, now_ms: f64) -> bool {
        match self.phase {
            Phase::Idle if is_start_key(key) => {
                self.start(now_ms);
                return true;
            }
            Phase::Over if is_restart_key(key) => {
                self.restart();
                return true;
            }
            Phase::Paused if Intent::from_key(key) == Some(Intent::Pause) => {
                self.toggle_pause(now_ms);
                return true;
            }
            Phase::Playing => {}
            _ => return false,
        }
        let Some(intent) = Intent::from_key(key) else {
            return false;
        };
        if self.input.press(intent) {
            self.dispatch(intent, now_ms);
        }
        true
    }

    pub fn key_up(&mut self, key: &str) {
        if let Some(intent) = Intent::from_key(key) {
            self.input.release(intent);
        }
    }

    /// On-screen control pressed. `dcol` of 0 means soft drop.
    pub fn touch_start(&mut self, dcol: i32, now_ms: f64) {
        if !self.is_playing() {
            return;
        }
        let intent = match dcol {
            0 => Intent::SoftDrop,
            d if d < 0 => Intent::MoveLeft,
            _ => Intent::MoveRight,
        };
        self.input.touch_press(intent);
        self.dispatch(intent, now_ms);
    }

    /// Lifts the on-screen control; keys held on the keyboard stay held.
    pub fn touch_end(&mut self) {
        self.input.touch_release();
    }

    /// Runs one intent, recovering from a handler failure without ending the run.
    pub fn dispatch(&mut self, intent: Intent, now_ms: f64) {
        if let Err(e) = self.handle(intent, now_ms) {
            log(&format!("[input] {intent:?} failed: {e}"));
            self.emergency_reset();
        }
    }

    fn handle(&mut self, intent: Intent, now_ms: f64) -> Result<(), String> {
        if intent == Intent::Pause {
            self.toggle_pause(now_ms);
            return Ok(());
        }
        if !self.is_playing() {
            return Ok(());
        }
        if self.player.active().is_none() {
            return Err("no active piece while playing".to_string());
        }
        match intent {
            Intent::MoveLeft | Intent::MoveRight => {
                let dcol = if intent == Intent::MoveLeft { -1 } else { 1 };
                self.input.repeat.cancel();
                self.shift(dcol);
                self.input.repeat.start(RepeatAction::Shift(dcol), now_ms);
            }
            Intent::SoftDrop => {
                self.input.repeat.cancel();
                self.soft_drop();
                if self.is_playing() {
                    self.input.repeat.start(RepeatAction::SoftDrop, now_ms);
                }
            }
            Intent::Rotate => self.rotate(),
            Intent::HardDrop => self.hard_drop(),
            Intent::Hold => self.hold(),
            Intent::Pause => {}
        }
        Ok(())
    }

    /// Clears transient input state. Run state and board are left alone.
    pub fn emergency_reset(&mut self) {
        if self.input.repeat.is_active() {
            log("[input] emergency reset");
        }
        self.input.clear();
    }

    pub fn shift(&mut self, dcol: i32) {
        if self.is_playing() && self.player.try_shift(dcol) {
            self.audio.cue(SoundCue::Move);
        }
    }

    pub fn rotate(&mut self) {
        if self.is_playing() && self.player.try_rotate() {
            self.audio.cue(SoundCue::Rotate);
        }
    }

    pub fn soft_drop(&mut self) {
        if self.is_playing() {
            self.soft_drop_step(true);
        }
    }

    fn soft_drop_step(&mut self, audible: bool) {
        self.stats.add_points(SOFT_DROP_POINTS);
        if audible {
            self.audio.cue(SoundCue::SoftDrop);
        }
        if let SoftDrop::Landed(outcome) = self.player.soft_drop(self.modes.is_special_mode()) {
            self.settle(outcome);
        }
    }

    pub fn hard_drop(&mut self) {
        if !self.is_playing() {
            return;
        }
        let (distance, outcome) = self.player.hard_drop(self.modes.is_special_mode());
        self.stats.add_points(distance * HARD_DROP_POINTS_PER_ROW);
        self.audio.cue(SoundCue::HardDrop);
        self.settle(outcome);
    }

    pub fn hold(&mut self) {
        if self.is_playing() && self.player.hold(self.modes.is_special_mode()) {
            self.audio.cue(SoundCue::Hold);
        }
    }

    fn settle(&mut self, outcome: LockOutcome) {
        match outcome {
            LockOutcome::ToppedOut => {
                log("[game] top-out on lock");
                self.game_over();
            }
            LockOutcome::Locked {
                cleared,
                spawn_blocked,
            } => {
                self.score_lock(cleared);
                if spawn_blocked {
                    log("[game] top-out on spawn");
                    self.game_over();
                }
            }
        }
    }

    fn score_lock(&mut self, cleared: usize) {
        let special = self.modes.is_special_mode();
        let Some(report) = self.stats.record_lock(cleared, special) else {
            return;
        };
        self.progress.add_score(report.points as u64);
        self.progress.add_coins(report.coins as u64);
        self.progress.add_lines(report.lines as u64);
        for bonus in &report.bonuses {
            self.progress.add_score(bonus.score as u64);
            self.progress.add_coins(bonus.coins as u64);
        }
        self.progress.record_high_score(self.stats.score as u64);

        self.audio.cue(SoundCue::LinesCleared(report.lines));
        self.audio.cue(SoundCue::Streak(report.streak));
        if report.combo_tier == ComboTier::Legendary {
            self.audio.cue(SoundCue::Legendary);
        }

        if self.progress.check_level_up() {
            let level = self.progress.data().level;
            self.progress
                .add_coins(level as u64 * LEVEL_UP_COINS_PER_LEVEL);
            self.audio.cue(SoundCue::LevelUp);
            log(&format!("[progress] reached level {level}"));
            self.level_up = Some(level);
        }
        self.clear = Some(report);
    }

    fn game_over(&mut self) {
        self.phase = Phase::Over;
        self.paused_at = None;
        self.stats.break_combo();
        self.input.clear();
        self.progress.record_high_score(self.stats.score as u64);
        self.progress.add_game();
        self.audio.cue(SoundCue::GameOver);
        log(&format!("[game] over, final score {}", self.stats.score));
    }

    /// Spends a revive card to continue a finished run with the top rows wiped.
    pub fn use_revive(&mut self, now_ms: f64) -> bool {
        if self.phase != Phase::Over {
            return false;
        }
        if !self.progress.use_revive_card(self.modes.is_dev_mode()) {
            return false;
        }
        let fits = self
            .player
            .revive(REVIVE_CLEARED_ROWS, self.modes.is_special_mode());
        self.phase = Phase::Playing;
        self.last_drop_ms = now_ms;
        self.audio.cue(SoundCue::ItemUse);
        log("[item] revive used");
        if !fits {
            self.game_over();
        }
        true
    }

    /// Spends a destroy card to drop the bottom rows of the stack.
    pub fn use_destroy(&mut self) -> bool {
        if !self.is_playing() {
            return false;
        }
        if !self.progress.use_destroy_card(self.modes.is_dev_mode()) {
            return false;
        }
        self.player.board_mut().destroy_bottom_rows(DESTROYED_ROWS);
        self.audio.cue(SoundCue::ItemUse);
        log("[item] destroy used");
        true
    }

    pub fn snapshot(&self) -> FrameView {
        let board = self.player.board();
        let field = board.rows().iter().flat_map(|row| row.iter().copied()).collect();
        let active = self.player.active();
        let ghost = match (self.settings.ghost_enabled, self.player.ghost()) {
            (true, Some(ghost)) => points_of(&ghost),
            _ => Vec::new(),
        };
        FrameView {
            field,
            active: active.map(points_of).unwrap_or_default(),
            active_color: active.map(|p| p.color).unwrap_or(0),
            ghost,
            hold: self.player.held().map(PieceView::of),
            can_hold: self.player.can_hold(),
            next: self.player.queue().map(PieceView::of).collect(),
            phase: self.phase,
            stats: self.stats.clone(),
            clear: self.clear.clone(),
            level_up: self.level_up,
            progress: self.progress.snapshot(),
            level_progress: self.progress.level_progress(),
            special_mode: self.modes.is_special_mode(),
            dev_mode: self.modes.is_dev_mode(),
        }
    }

    /// Like `snapshot`, but hands out the clear and level-up notices only once.
    pub fn frame(&mut self) -> FrameView {
        let view = self.snapshot();
        self.clear = None;
        self.level_up = None;
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{COLS, ROWS};
    use crate::progress::{MemoryStore, ShopItem};

    #[derive(Default)]
    struct Recorder(Vec<SoundCue>);

    impl AudioSink for Recorder {
        fn cue(&mut self, cue: SoundCue) {
            self.0.push(cue);
        }
    }

    type TestSession = Session<MemoryStore, Recorder, Modes>;

    fn session_with(piece: Tetromino, modes: Modes) -> TestSession {
        let settings = GameSettings {
            randomizer: RandomizerKind::SinglePiece { piece },
            ..GameSettings::default()
        };
        Session::new(settings, MemoryStore::default(), Recorder::default(), modes)
    }

    fn session(piece: Tetromino) -> TestSession {
        session_with(piece, Modes::default())
    }

    fn active_pos(session: &TestSession) -> (i32, i32) {
        let piece = session.player().active().expect("active piece");
        (piece.col, piece.row)
    }

    fn block_spawn_column(session: &mut TestSession) {
        let cells = (2..ROWS as i32).flat_map(|row| [(4, row, 9), (5, row, 9)]);
        session.player.board_mut().lock(cells).unwrap();
    }

    #[test]
    fn handlers_are_noops_when_idle() {
        let mut session = session(Tetromino::O);
        for intent in [Intent::MoveLeft, Intent::Rotate, Intent::HardDrop, Intent::Hold, Intent::Pause] {
            session.dispatch(intent, 0.0);
        }
        session.soft_drop();
        assert!(!session.tick(5000.0));
        assert!(!session.use_destroy());
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.player().active().is_none());
        assert_eq!(session.stats().score, 0);
        assert!(session.audio().0.is_empty());
    }

    #[test]
    fn gravity_steps_once_per_interval() {
        let mut session = session(Tetromino::O);
        session.start(0.0);
        assert_eq!(active_pos(&session), (4, 0));
        assert!(session.tick(1000.0));
        assert_eq!(active_pos(&session), (4, 0));
        session.tick(1000.5);
        assert_eq!(active_pos(&session), (4, 1));
        session.tick(1500.0);
        assert_eq!(active_pos(&session), (4, 1));
        session.tick(2001.0);
        assert_eq!(active_pos(&session), (4, 2));
        assert_eq!(session.stats().score, 0);
    }

    #[test]
    fn pause_freezes_gravity_without_catch_up() {
        let mut session = session(Tetromino::O);
        session.start(0.0);
        session.toggle_pause(500.0);
        assert!(!session.tick(5000.0));
        session.shift(-1);
        assert_eq!(active_pos(&session), (4, 0));

        session.toggle_pause(5000.0);
        session.tick(5400.0);
        assert_eq!(active_pos(&session), (4, 0));
        session.tick(5501.0);
        assert_eq!(active_pos(&session), (4, 1));
    }

    #[test]
    fn keyboard_flow_through_phases() {
        let mut session = session(Tetromino::O);
        assert!(!session.key_down("ArrowLeft", 0.0));
        assert!(session.key_down("Enter", 0.0));
        assert_eq!(session.phase(), Phase::Playing);

        assert!(session.key_down("p", 10.0));
        assert_eq!(session.phase(), Phase::Paused);
        assert!(!session.key_down("ArrowLeft", 20.0));
        assert!(session.key_down("P", 30.0));
        assert_eq!(session.phase(), Phase::Playing);
        session.key_up("p");

        assert!(session.key_down("ArrowDown", 40.0));
        assert_eq!(session.stats().score, 1);
        assert_eq!(active_pos(&session), (4, 1));
        // held key auto-repeat from the OS is ignored
        session.key_down("ArrowDown", 45.0);
        assert_eq!(active_pos(&session), (4, 1));
    }

    #[test]
    fn held_move_repeats_after_delay() {
        let mut session = session(Tetromino::O);
        session.start(0.0);
        session.key_down("ArrowLeft", 0.0);
        assert_eq!(active_pos(&session), (3, 0));
        session.tick(199.0);
        assert_eq!(active_pos(&session), (3, 0));
        session.tick(200.0);
        assert_eq!(active_pos(&session), (2, 0));
        session.tick(260.0);
        assert_eq!(active_pos(&session), (1, 0));
        session.key_up("ArrowLeft");
        session.tick(400.0);
        assert_eq!(active_pos(&session), (1, 0));
        assert_eq!(session.audio().0, vec![SoundCue::Move]);
    }

    #[test]
    fn late_frame_does_not_burst_soft_drop() {
        let mut session = session(Tetromino::O);
        session.start(0.0);
        session.key_down("ArrowDown", 0.0);
        assert_eq!(active_pos(&session), (4, 1));
        session.tick(200.0);
        assert_eq!(active_pos(&session), (4, 2));
        assert_eq!(session.stats().score, 2);

        // one repeat step plus one gravity step, no matter how long the gap
        session.tick(3000.0);
        assert_eq!(active_pos(&session), (4, 4));
        assert_eq!(session.stats().score, 3);
        assert_eq!(session.player().board().profile().max_height, 0);
        assert_eq!(session.phase(), Phase::Playing);
    }

    #[test]
    fn touch_hold_repeats_until_lifted() {
        let mut session = session(Tetromino::O);
        session.start(0.0);
        session.touch_start(-1, 0.0);
        assert_eq!(active_pos(&session), (3, 0));
        session.tick(200.0);
        assert_eq!(active_pos(&session), (2, 0));
        session.touch_end();
        assert!(!session.input.repeat.is_active());
        session.tick(400.0);
        assert_eq!(active_pos(&session), (2, 0));
    }

    #[test]
    fn touch_end_keeps_keyboard_holds() {
        let mut session = session(Tetromino::O);
        session.start(0.0);
        session.key_down("ArrowLeft", 0.0);
        session.touch_start(0, 10.0);
        session.touch_end();
        assert!(session.input.is_held(Intent::MoveLeft));
        assert!(!session.input.is_held(Intent::SoftDrop));
    }

    #[test]
    fn touch_is_ignored_when_idle() {
        let mut session = session(Tetromino::O);
        session.touch_start(1, 0.0);
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.player().active().is_none());
        assert!(!session.input.is_held(Intent::MoveRight));
        assert!(!session.input.repeat.is_active());
    }

    #[test]
    fn orphaned_repeat_is_cancelled_on_tick() {
        let mut session = session(Tetromino::O);
        session.start(0.0);
        session.dispatch(Intent::MoveRight, 0.0);
        assert_eq!(active_pos(&session), (5, 0));
        session.tick(300.0);
        assert_eq!(active_pos(&session), (5, 0));
        assert!(!session.input.repeat.is_active());
    }

    #[test]
    fn hard_drop_scores_two_per_row() {
        let mut session = session(Tetromino::O);
        session.start(0.0);
        session.dispatch(Intent::HardDrop, 0.0);
        assert_eq!(session.stats().score, 36);
        assert_eq!(active_pos(&session), (4, 0));
        assert_eq!(session.player().board().cell(4, ROWS - 1), Tetromino::O.color_id());
        assert_eq!(session.audio().0, vec![SoundCue::HardDrop]);
    }

    #[test]
    fn combo_feeds_progression_and_resets() {
        let mut session = session(Tetromino::I);
        session.start(0.0);
        session.score_lock(1);
        session.score_lock(2);
        assert_eq!(session.frame().level_up, Some(2));
        session.score_lock(1);
        assert_eq!(session.stats().combo, 3);
        assert_eq!(session.stats().score, 1000);

        let data = session.progress().data().clone();
        assert_eq!(data.total_score, 1000);
        assert_eq!(data.lines_cleared, 4);
        assert_eq!(data.level, 2);
        // 10 + 60 + 30 from clears, 100 for reaching level 2
        assert_eq!(data.coins, 200);
        assert_eq!(data.high_score, 1000);

        session.score_lock(0);
        assert_eq!(session.stats().combo, 0);
        assert!(session.audio().0.contains(&SoundCue::LevelUp));
        assert!(session.frame().level_up.is_none());
    }

    #[test]
    fn special_mode_doubles_line_score() {
        let mut session = session_with(Tetromino::I, Modes { special: true, dev: false });
        session.start(0.0);
        assert_eq!(session.player().active().map(|p| p.color), Some(8));
        session.score_lock(1);
        assert_eq!(session.stats().score, 200);
        assert_eq!(session.progress().data().coins, 20);
    }

    #[test]
    fn blocked_spawn_ends_the_run() {
        let mut session = session(Tetromino::O);
        session.start(0.0);
        block_spawn_column(&mut session);
        session.hard_drop();
        assert_eq!(session.phase(), Phase::Over);
        assert_eq!(session.progress().data().games_played, 1);
        assert_eq!(session.audio().0.last(), Some(&SoundCue::GameOver));

        let before = session.snapshot();
        session.dispatch(Intent::MoveLeft, 10.0);
        session.rotate();
        assert!(!session.tick(10_000.0));
        assert_eq!(session.snapshot(), before);

        assert!(session.key_down("r", 20.0));
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.player().board().profile().max_height, 0);
    }

    #[test]
    fn revive_needs_a_card_and_clears_the_top() {
        let mut session = session(Tetromino::O);
        session.start(0.0);
        block_spawn_column(&mut session);
        session.hard_drop();
        assert!(!session.use_revive(100.0));

        session.progress_mut().add_card(ShopItem::Revive, 1);
        assert!(session.use_revive(100.0));
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(session.progress().data().revive_cards, 0);
        let board = session.player().board();
        assert!((0..REVIVE_CLEARED_ROWS).all(|row| board.rows()[row].iter().all(|&c| c == 0)));
        assert_eq!(board.cell(4, REVIVE_CLEARED_ROWS), 9);
        assert!(session.player().can_hold());
        assert_eq!(session.stats().score, 0);
    }

    #[test]
    fn destroy_drops_the_stack_in_dev_mode() {
        let mut session = session_with(Tetromino::O, Modes { special: false, dev: true });
        session.start(0.0);
        session.player.board_mut().lock([(0, 16, 3), (1, 19, 3)]).unwrap();
        assert!(session.use_destroy());
        let board = session.player().board();
        assert_eq!(board.cell(0, 19), 3);
        assert_eq!(board.cell(1, 19), 0);
        assert_eq!(session.audio().0, vec![SoundCue::ItemUse]);
    }

    #[test]
    fn handler_failure_resets_input_only() {
        let mut session = session(Tetromino::O);
        session.phase = Phase::Playing;
        session.input.press(Intent::MoveLeft);
        session.input.repeat.start(RepeatAction::Shift(-1), 0.0);
        session.stats.score = 42;

        session.dispatch(Intent::Rotate, 10.0);
        assert_eq!(session.phase(), Phase::Playing);
        assert!(!session.input.repeat.is_active());
        assert!(!session.input.is_held(Intent::MoveLeft));
        assert_eq!(session.stats().score, 42);
    }

    #[test]
    fn snapshot_carries_ghost_and_queue() {
        let mut session = session(Tetromino::O);
        session.start(0.0);
        let view = session.snapshot();
        assert_eq!(view.field.len(), ROWS * COLS);
        assert_eq!(view.active.len(), 4);
        assert!(view.ghost.iter().any(|p| p.y == ROWS as i8 - 1));
        assert_eq!(view.next.len(), 5);
        assert_eq!(view.phase, Phase::Playing);

        session.set_ghost_enabled(false);
        assert!(session.snapshot().ghost.is_empty());
    }
}
