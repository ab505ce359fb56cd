use std::collections::HashSet;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Intent {
    MoveLeft,
    MoveRight,
    SoftDrop,
    Rotate,
    HardDrop,
    Hold,
    Pause,
}

impl Intent {
    pub fn from_key(key: &str) -> Option<Intent> {
        match key {
            "ArrowLeft" | "a" | "A" => Some(Intent::MoveLeft),
            "ArrowRight" | "d" | "D" => Some(Intent::MoveRight),
            "ArrowDown" | "s" | "S" => Some(Intent::SoftDrop),
            "ArrowUp" | "w" | "W" => Some(Intent::Rotate),
            " " => Some(Intent::HardDrop),
            "Shift" => Some(Intent::Hold),
            "p" | "P" => Some(Intent::Pause),
            _ => None,
        }
    }
}

pub fn is_start_key(key: &str) -> bool {
    matches!(key, "Enter" | " ")
}

pub fn is_restart_key(key: &str) -> bool {
    matches!(key, "r" | "R")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepeatAction {
    Shift(i32),
    SoftDrop,
}

impl RepeatAction {
    /// The held intent that keeps this repeat alive.
    pub fn driver(self) -> Intent {
        match self {
            RepeatAction::Shift(dcol) if dcol < 0 => Intent::MoveLeft,
            RepeatAction::Shift(_) => Intent::MoveRight,
            RepeatAction::SoftDrop => Intent::SoftDrop,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Phase {
    Delay { until: f64 },
    Repeating { next_at: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Running {
    action: RepeatAction,
    phase: Phase,
}

/// Two-phase auto-repeat: one initial delay, then a fixed interval.
#[derive(Clone, Debug, PartialEq)]
pub struct AutoRepeat {
    initial_delay_ms: f64,
    interval_ms: f64,
    running: Option<Running>,
    paused_at: Option<f64>,
}

impl AutoRepeat {
    pub fn new(initial_delay_ms: f64, interval_ms: f64) -> Self {
        Self {
            initial_delay_ms,
            interval_ms: interval_ms.max(1.0),
            running: None,
            paused_at: None,
        }
    }

    pub fn start(&mut self, action: RepeatAction, now_ms: f64) {
        self.running = Some(Running {
            action,
            phase: Phase::Delay {
                until: now_ms + self.initial_delay_ms,
            },
        });
        self.paused_at = None;
    }

    /// Safe to call at any time, including when nothing is repeating.
    pub fn cancel(&mut self) {
        self.running = None;
        self.paused_at = None;
    }

    pub fn is_active(&self) -> bool {
        self.running.is_some()
    }

    pub fn action(&self) -> Option<RepeatAction> {
        self.running.map(|r| r.action)
    }

    pub fn suspend(&mut self, now_ms: f64) {
        if self.running.is_some() && self.paused_at.is_none() {
            self.paused_at = Some(now_ms);
        }
    }

    /// Pushes every deadline back by the time spent suspended.
    pub fn resume(&mut self, now_ms: f64) {
        let Some(paused_at) = self.paused_at.take() else {
            return;
        };
        let shift = (now_ms - paused_at).max(0.0);
        if let Some(running) = self.running.as_mut() {
            running.phase = match running.phase {
                Phase::Delay { until } => Phase::Delay {
                    until: until + shift,
                },
                Phase::Repeating { next_at } => Phase::Repeating {
                    next_at: next_at + shift,
                },
            };
        }
    }

    /// Whether a repeat is due by `now_ms`. Fires at most once per call; a
    /// late poll skips the missed intervals instead of replaying them.
    pub fn poll(&mut self, now_ms: f64) -> bool {
        if self.paused_at.is_some() {
            return false;
        }
        let interval = self.interval_ms;
        let Some(running) = self.running.as_mut() else {
            return false;
        };
        let due_at = match running.phase {
            Phase::Delay { until } => until,
            Phase::Repeating { next_at } => next_at,
        };
        if now_ms < due_at {
            return false;
        }
        let mut next_at = due_at + interval;
        if next_at <= now_ms {
            next_at = now_ms + interval;
        }
        running.phase = Phase::Repeating { next_at };
        true
    }
}

/// Held keys plus the repeat timer they drive.
#[derive(Clone, Debug)]
pub struct InputState {
    held: HashSet<Intent>,
    touch: Option<Intent>,
    pub repeat: AutoRepeat,
}

impl InputState {
    pub fn new(initial_delay_ms: f64, interval_ms: f64) -> Self {
        Self {
            held: HashSet::new(),
            touch: None,
            repeat: AutoRepeat::new(initial_delay_ms, interval_ms),
        }
    }

    /// Returns false when the key is already down (OS key repeat).
    pub fn press(&mut self, intent: Intent) -> bool {
        self.held.insert(intent)
    }

    pub fn release(&mut self, intent: Intent) {
        self.held.remove(&intent);
        if self.repeat_is_orphaned() {
            self.repeat.cancel();
        }
    }

    /// On-screen controls hold one intent at a time, apart from the keyboard.
    pub fn touch_press(&mut self, intent: Intent) {
        self.touch = Some(intent);
    }

    pub fn touch_release(&mut self) {
        self.touch = None;
        if self.repeat_is_orphaned() {
            self.repeat.cancel();
        }
    }

    pub fn is_held(&self, intent: Intent) -> bool {
        self.held.contains(&intent) || self.touch == Some(intent)
    }

    /// A repeat is running but the key driving it is no longer down.
    pub fn repeat_is_orphaned(&self) -> bool {
        self.repeat
            .action()
            .is_some_and(|action| !self.is_held(action.driver()))
    }

    pub fn clear(&mut self) {
        self.held.clear();
        self.touch = None;
        self.repeat.cancel();
    }
}
