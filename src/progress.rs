use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tsify::Tsify;

use crate::log;

pub const STORAGE_KEY: &str = "tetris_game_data";
pub const LEVEL_THRESHOLDS: [u64; 10] = [0, 500, 2000, 5000, 10000, 15000, 20000, 30000, 50000, 100000];
pub const MAX_LEVEL: u32 = LEVEL_THRESHOLDS.len() as u32;
pub const LEVEL_UP_COINS_PER_LEVEL: u64 = 50;

/// Cross-session record. Missing fields fall back to their defaults on load.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Tsify)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgressData {
    pub level: u32,
    pub total_score: u64,
    pub coins: u64,
    pub revive_cards: u32,
    pub destroy_cards: u32,
    pub games_played: u32,
    pub lines_cleared: u64,
    pub high_score: u64,
    pub last_play_time: Option<f64>,
}

impl Default for ProgressData {
    fn default() -> Self {
        Self {
            level: 1,
            total_score: 0,
            coins: 0,
            revive_cards: 0,
            destroy_cards: 0,
            games_played: 0,
            lines_cleared: 0,
            high_score: 0,
            last_play_time: None,
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ShopItem {
    Revive,
    Destroy,
}

pub fn level_for_score(total_score: u64) -> u32 {
    LEVEL_THRESHOLDS
        .iter()
        .rposition(|&threshold| total_score >= threshold)
        .map(|idx| idx as u32 + 1)
        .unwrap_or(1)
}

/// Key-value backend behind the progression record.
pub trait ProgressStore {
    fn read(&self, key: &str) -> Result<Option<String>, String>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), String>;
}

#[derive(Default, Debug, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut store = Self::default();
        store.entries.insert(key.to_string(), value.to_string());
        store
    }
}

impl ProgressStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, String> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), String> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<T: ProgressStore + ?Sized> ProgressStore for Box<T> {
    fn read(&self, key: &str) -> Result<Option<String>, String> {
        (**self).read(key)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), String> {
        (**self).write(key, value)
    }
}

#[cfg(target_arch = "wasm32")]
pub struct LocalStorage {
    storage: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    pub fn open() -> Result<Self, String> {
        let window = web_sys::window().ok_or("no window")?;
        let storage = window
            .local_storage()
            .map_err(|_| "localStorage access denied".to_string())?
            .ok_or("localStorage unavailable")?;
        Ok(Self { storage })
    }
}

#[cfg(target_arch = "wasm32")]
impl ProgressStore for LocalStorage {
    fn read(&self, key: &str) -> Result<Option<String>, String> {
        self.storage
            .get_item(key)
            .map_err(|e| format!("read {key}: {e:?}"))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), String> {
        self.storage
            .set_item(key, value)
            .map_err(|e| format!("write {key}: {e:?}"))
    }
}

fn now_ms() -> f64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as f64)
            .unwrap_or(0.0)
    }
}

/// The persistent progression collaborator. Every mutation saves immediately;
/// a failed save is logged and the in-memory record stays authoritative.
pub struct Progression<S: ProgressStore> {
    store: S,
    data: ProgressData,
}

impl<S: ProgressStore> Progression<S> {
    pub fn load(store: S) -> Self {
        let data = match store.read(STORAGE_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log(&format!("[progress] discarding unreadable save: {e}"));
                ProgressData::default()
            }),
            Ok(None) => ProgressData::default(),
            Err(e) => {
                log(&format!("[progress] load failed: {e}"));
                ProgressData::default()
            }
        };
        Self { store, data }
    }

    pub fn data(&self) -> &ProgressData {
        &self.data
    }

    pub fn snapshot(&self) -> ProgressData {
        self.data.clone()
    }

    fn save(&mut self) {
        self.data.last_play_time = Some(now_ms());
        let raw = match serde_json::to_string(&self.data) {
            Ok(raw) => raw,
            Err(e) => {
                log(&format!("[progress] encode failed: {e}"));
                return;
            }
        };
        if let Err(e) = self.store.write(STORAGE_KEY, &raw) {
            log(&format!("[progress] save skipped: {e}"));
        }
    }

    pub fn add_score(&mut self, points: u64) {
        self.data.total_score = self.data.total_score.saturating_add(points);
        self.save();
    }

    pub fn record_high_score(&mut self, run_score: u64) {
        if run_score > self.data.high_score {
            self.data.high_score = run_score;
            self.save();
        }
    }

    pub fn add_coins(&mut self, coins: u64) {
        self.data.coins = self.data.coins.saturating_add(coins);
        self.save();
    }

    pub fn spend_coins(&mut self, amount: u64) -> bool {
        if self.data.coins < amount {
            return false;
        }
        self.data.coins -= amount;
        self.save();
        true
    }

    pub fn add_lines(&mut self, lines: u64) {
        self.data.lines_cleared = self.data.lines_cleared.saturating_add(lines);
        self.save();
    }

    pub fn add_game(&mut self) {
        self.data.games_played = self.data.games_played.saturating_add(1);
        self.save();
    }

    /// Raises the stored level when the lifetime score has crossed a new threshold.
    pub fn check_level_up(&mut self) -> bool {
        let level = level_for_score(self.data.total_score);
        if level > self.data.level {
            self.data.level = level;
            self.save();
            return true;
        }
        false
    }

    /// Percent of the way from the current level's threshold to the next one.
    pub fn level_progress(&self) -> f64 {
        let idx = self.data.level.clamp(1, MAX_LEVEL) as usize - 1;
        let floor = LEVEL_THRESHOLDS[idx];
        let Some(&ceiling) = LEVEL_THRESHOLDS.get(idx + 1) else {
            return 100.0;
        };
        let progress = self.data.total_score.saturating_sub(floor) as f64 / (ceiling - floor) as f64;
        (progress * 100.0).clamp(0.0, 100.0)
    }

    pub fn use_revive_card(&mut self, dev_mode: bool) -> bool {
        if dev_mode {
            return true;
        }
        if self.data.revive_cards == 0 {
            return false;
        }
        self.data.revive_cards -= 1;
        self.save();
        true
    }

    pub fn use_destroy_card(&mut self, dev_mode: bool) -> bool {
        if dev_mode {
            return true;
        }
        if self.data.destroy_cards == 0 {
            return false;
        }
        self.data.destroy_cards -= 1;
        self.save();
        true
    }

    pub fn add_card(&mut self, item: ShopItem, count: u32) {
        match item {
            ShopItem::Revive => {
                self.data.revive_cards = self.data.revive_cards.saturating_add(count)
            }
            ShopItem::Destroy => {
                self.data.destroy_cards = self.data.destroy_cards.saturating_add(count)
            }
        }
        self.save();
    }

    pub fn purchase(&mut self, item: ShopItem, price: u64, dev_mode: bool) -> bool {
        if !dev_mode && !self.spend_coins(price) {
            return false;
        }
        self.add_card(item, 1);
        true
    }

    /// Merges the fields present in `patch` over the current record.
    pub fn edit(&mut self, patch: serde_json::Value) -> Result<(), String> {
        let mut merged = serde_json::to_value(&self.data).map_err(|e| e.to_string())?;
        if let (Some(target), serde_json::Value::Object(fields)) = (merged.as_object_mut(), patch) {
            target.extend(fields);
        }
        self.data = serde_json::from_value(merged).map_err(|e| e.to_string())?;
        self.save();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.data = ProgressData::default();
        self.save();
    }

    pub fn read_flag(&self, key: &str) -> Option<bool> {
        match self.store.read(key) {
            Ok(Some(raw)) => Some(raw == "true"),
            _ => None,
        }
    }

    pub fn write_flag(&mut self, key: &str, value: bool) {
        if let Err(e) = self.store.write(key, if value { "true" } else { "false" }) {
            log(&format!("[progress] preference not saved: {e}"));
        }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &S {
        &self.store
    }
}
