pub mod audio;
pub mod board;
pub mod game;
pub mod input;
pub mod piece;
pub mod player;
pub mod progress;
pub mod randomizer;
pub mod scoring;

use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

use crate::audio::{AudioSink, MUSIC_ENABLED_KEY, SOUND_ENABLED_KEY, SoundCue, ToneScheduler};
use crate::game::{GameSettings, Modes, Session};
use crate::input::Intent;
use crate::progress::{MemoryStore, ProgressStore, ShopItem};
use crate::randomizer::RandomizerKind;

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
}

#[cfg(target_arch = "wasm32")]
pub(crate) fn log(msg: &str) {
    web_sys::console::log_1(&JsValue::from_str(msg));
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn log(msg: &str) {
    eprintln!("{msg}");
}

#[cfg(target_arch = "wasm32")]
fn open_store() -> Box<dyn ProgressStore> {
    match progress::LocalStorage::open() {
        Ok(store) => Box::new(store),
        Err(e) => {
            log(&format!("[progress] {e}; progress will not persist"));
            Box::new(MemoryStore::default())
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn open_store() -> Box<dyn ProgressStore> {
    Box::new(MemoryStore::default())
}

type ClientSession = Session<Box<dyn ProgressStore>, ToneScheduler, Modes>;

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen]
pub struct GameClient {
    session: ClientSession,
}

#[wasm_bindgen]
impl GameClient {
    #[wasm_bindgen(constructor)]
    pub fn new(settings: JsValue) -> Result<GameClient, JsValue> {
        let settings: GameSettings = from_value(settings).unwrap_or_default();
        let scheduler = ToneScheduler::new(settings.audio());
        let mut session = Session::new(settings, open_store(), scheduler, Modes::default());

        let sound = session.progress().read_flag(SOUND_ENABLED_KEY);
        let music = session.progress().read_flag(MUSIC_ENABLED_KEY);
        let audio = session.audio_mut();
        if let Some(enabled) = sound {
            audio.set_sound_enabled(enabled);
        }
        if let Some(enabled) = music {
            audio.set_music_enabled(enabled);
        }
        Ok(Self { session })
    }

    #[wasm_bindgen(js_name = tick)]
    pub fn tick(&mut self, now_ms: f64) -> Result<JsValue, JsValue> {
        self.session.tick(now_ms);
        self.session.audio_mut().advance(now_ms);
        to_value(&self.session.frame()).map_err(|e| e.into())
    }

    #[wasm_bindgen(js_name = snapshot)]
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_value(&self.session.snapshot()).map_err(|e| e.into())
    }

    /// Tones due by `now_ms`, for the page to synthesize.
    #[wasm_bindgen(js_name = drainTones)]
    pub fn drain_tones(&mut self, now_ms: f64) -> Result<JsValue, JsValue> {
        let due = self.session.audio_mut().drain_due(now_ms);
        to_value(&due).map_err(|e| e.into())
    }

    #[wasm_bindgen(js_name = keyDown)]
    pub fn key_down(&mut self, key: &str, now_ms: f64) -> bool {
        self.session.key_down(key, now_ms)
    }

    #[wasm_bindgen(js_name = keyUp)]
    pub fn key_up(&mut self, key: &str) {
        self.session.key_up(key);
    }

    #[wasm_bindgen(js_name = touchStart)]
    pub fn touch_start(&mut self, dir: i32, now_ms: f64) {
        self.session.touch_start(dir, now_ms);
    }

    #[wasm_bindgen(js_name = touchEnd)]
    pub fn touch_end(&mut self) {
        self.session.touch_end();
    }

    /// One-shot intent from an on-screen button, e.g. `"rotate"` or `"hardDrop"`.
    #[wasm_bindgen(js_name = intent)]
    pub fn intent(&mut self, intent: JsValue, now_ms: f64) -> Result<(), JsValue> {
        let parsed: Intent = from_value(intent)?;
        self.session.dispatch(parsed, now_ms);
        Ok(())
    }

    #[wasm_bindgen(js_name = start)]
    pub fn start(&mut self, now_ms: f64) {
        self.session.start(now_ms);
    }

    #[wasm_bindgen(js_name = restart)]
    pub fn restart(&mut self) {
        self.session.restart();
    }

    #[wasm_bindgen(js_name = togglePause)]
    pub fn toggle_pause(&mut self, now_ms: f64) {
        self.session.toggle_pause(now_ms);
    }

    #[wasm_bindgen(js_name = useRevive)]
    pub fn use_revive(&mut self, now_ms: f64) -> bool {
        self.session.use_revive(now_ms)
    }

    #[wasm_bindgen(js_name = useDestroy)]
    pub fn use_destroy(&mut self) -> bool {
        self.session.use_destroy()
    }

    #[wasm_bindgen(js_name = setSpecialMode)]
    pub fn set_special_mode(&mut self, enabled: bool) {
        self.session.modes_mut().special = enabled;
        log(&format!("[mode] special mode {}", if enabled { "on" } else { "off" }));
    }

    #[wasm_bindgen(js_name = setDevMode)]
    pub fn set_dev_mode(&mut self, enabled: bool) {
        self.session.modes_mut().dev = enabled;
        log(&format!("[mode] dev mode {}", if enabled { "on" } else { "off" }));
    }

    #[wasm_bindgen(js_name = setRandomizer)]
    pub fn set_randomizer(&mut self, kind: JsValue) -> Result<(), JsValue> {
        let parsed: RandomizerKind = from_value(kind)?;
        self.session.set_randomizer(parsed);
        Ok(())
    }

    #[wasm_bindgen(js_name = setGhostEnabled)]
    pub fn set_ghost_enabled(&mut self, enabled: bool) {
        self.session.set_ghost_enabled(enabled);
    }

    #[wasm_bindgen(js_name = progress)]
    pub fn progress(&self) -> Result<JsValue, JsValue> {
        to_value(&self.session.progress().snapshot()).map_err(|e| e.into())
    }

    #[wasm_bindgen(js_name = levelProgress)]
    pub fn level_progress(&self) -> f64 {
        self.session.progress().level_progress()
    }

    #[wasm_bindgen(js_name = purchase)]
    pub fn purchase(&mut self, item: JsValue, price: u32) -> Result<bool, JsValue> {
        let item: ShopItem = from_value(item)?;
        let dev = self.session.modes().dev;
        let bought = self.session.progress_mut().purchase(item, price as u64, dev);
        if bought {
            self.session.audio_mut().cue(SoundCue::Click);
        }
        Ok(bought)
    }

    #[wasm_bindgen(js_name = editProgress)]
    pub fn edit_progress(&mut self, patch: JsValue) -> Result<(), JsValue> {
        let patch: serde_json::Value = from_value(patch)?;
        self.session.progress_mut().edit(patch).map_err(js_err)
    }

    #[wasm_bindgen(js_name = resetProgress)]
    pub fn reset_progress(&mut self) {
        self.session.progress_mut().reset();
        log("[progress] reset to defaults");
    }

    #[wasm_bindgen(js_name = setSoundEnabled)]
    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.session.audio_mut().set_sound_enabled(enabled);
        self.session.progress_mut().write_flag(SOUND_ENABLED_KEY, enabled);
    }

    #[wasm_bindgen(js_name = setMusicEnabled)]
    pub fn set_music_enabled(&mut self, enabled: bool) {
        self.session.audio_mut().set_music_enabled(enabled);
        self.session.progress_mut().write_flag(MUSIC_ENABLED_KEY, enabled);
    }

    #[wasm_bindgen(js_name = setVolume)]
    pub fn set_volume(&mut self, volume: f32) {
        self.session.audio_mut().set_volume(volume);
    }

    #[wasm_bindgen(js_name = click)]
    pub fn click(&mut self) {
        self.session.audio_mut().cue(SoundCue::Click);
    }
}
