use serde::Serialize;
use tsify::Tsify;

use crate::scoring::Streak;

pub const SOUND_ENABLED_KEY: &str = "soundEnabled";
pub const MUSIC_ENABLED_KEY: &str = "musicEnabled";

const MUSIC_GAIN: f32 = 0.12;
const MUSIC_LOOP_GAP_MS: f64 = 800.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoundCue {
    Move,
    Rotate,
    SoftDrop,
    HardDrop,
    Hold,
    LinesCleared(usize),
    Streak(Streak),
    Legendary,
    LevelUp,
    GameOver,
    Click,
    ItemUse,
}

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq, Tsify)]
#[serde(rename_all = "lowercase")]
pub enum Wave {
    Sine,
    Triangle,
}

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Tsify)]
#[serde(rename_all = "camelCase")]
pub struct Tone {
    pub freq: f32,
    pub duration_ms: f32,
    pub wave: Wave,
    pub gain: f32,
}

impl Tone {
    const fn sine(freq: f32, duration_ms: f32, gain: f32) -> Self {
        Self {
            freq,
            duration_ms,
            wave: Wave::Sine,
            gain,
        }
    }

    const fn triangle(freq: f32, duration_ms: f32, gain: f32) -> Self {
        Self {
            freq,
            duration_ms,
            wave: Wave::Triangle,
            gain,
        }
    }
}

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Tsify)]
#[serde(rename_all = "camelCase")]
pub struct ToneEvent {
    pub at_ms: f64,
    pub tone: Tone,
}

/// Fire-and-forget notifications from gameplay. Implementations must not fail.
pub trait AudioSink {
    fn cue(&mut self, cue: SoundCue);
}

fn arpeggio(notes: &[f32], step_ms: f64, duration_ms: f32, gain: f32) -> Vec<(f64, Tone)> {
    notes
        .iter()
        .enumerate()
        .map(|(i, &freq)| (i as f64 * step_ms, Tone::sine(freq, duration_ms, gain)))
        .collect()
}

impl SoundCue {
    /// The tones this cue plays, as `(offset_ms, tone)` with gains before master volume.
    pub fn tones(self) -> Vec<(f64, Tone)> {
        match self {
            SoundCue::Move | SoundCue::Hold => vec![(0.0, Tone::sine(400.0, 50.0, 0.15))],
            SoundCue::SoftDrop => vec![(0.0, Tone::sine(300.0, 50.0, 0.1))],
            SoundCue::Rotate => vec![(0.0, Tone::sine(500.0, 80.0, 0.2))],
            SoundCue::HardDrop => vec![(0.0, Tone::triangle(300.0, 120.0, 0.25))],
            SoundCue::Click => vec![(0.0, Tone::sine(600.0, 50.0, 0.2))],
            SoundCue::LinesCleared(lines) => (0..lines)
                .map(|i| (i as f64 * 60.0, Tone::sine(523.0 + i as f32 * 150.0, 120.0, 0.3)))
                .collect(),
            SoundCue::Streak(Streak::FirstBlood) => arpeggio(&[523.0, 659.0], 80.0, 150.0, 0.35),
            SoundCue::Streak(Streak::Double) => {
                arpeggio(&[523.0, 659.0, 784.0], 70.0, 120.0, 0.35)
            }
            SoundCue::Streak(Streak::Triple) => {
                arpeggio(&[523.0, 659.0, 784.0, 880.0], 60.0, 100.0, 0.4)
            }
            SoundCue::Streak(Streak::Quadra) => {
                arpeggio(&[523.0, 659.0, 784.0, 880.0, 1047.0], 50.0, 100.0, 0.4)
            }
            SoundCue::Streak(Streak::Penta) => arpeggio(
                &[523.0, 659.0, 784.0, 880.0, 1047.0, 1175.0],
                50.0,
                100.0,
                0.45,
            ),
            SoundCue::Legendary => [523.0, 659.0, 784.0, 1047.0]
                .iter()
                .enumerate()
                .flat_map(|(i, &freq)| {
                    let at = i as f64 * 120.0;
                    [
                        (at, Tone::sine(freq, 250.0, 0.5)),
                        (at, Tone::sine(freq * 1.5, 250.0, 0.3)),
                    ]
                })
                .collect(),
            SoundCue::LevelUp => {
                let mut tones = arpeggio(&[523.0, 659.0, 784.0, 1047.0], 100.0, 200.0, 0.4);
                tones.push((400.0, Tone::sine(1047.0, 400.0, 0.5)));
                tones.push((400.0, Tone::sine(1319.0, 400.0, 0.35)));
                tones
            }
            SoundCue::GameOver => [392.0, 349.0, 330.0, 262.0]
                .iter()
                .enumerate()
                .map(|(i, &freq)| (i as f64 * 180.0, Tone::triangle(freq, 250.0, 0.35)))
                .collect(),
            SoundCue::ItemUse => vec![
                (0.0, Tone::sine(523.0, 100.0, 0.3)),
                (60.0, Tone::sine(659.0, 120.0, 0.3)),
            ],
        }
    }
}

// (frequency, duration) pairs; a zero frequency is a rest.
const MELODY: [(f32, f64); 34] = [
    (523.0, 300.0),
    (587.0, 300.0),
    (659.0, 400.0),
    (698.0, 300.0),
    (784.0, 300.0),
    (698.0, 400.0),
    (659.0, 300.0),
    (587.0, 300.0),
    (523.0, 600.0),
    (0.0, 200.0),
    (392.0, 300.0),
    (440.0, 300.0),
    (523.0, 400.0),
    (440.0, 300.0),
    (392.0, 300.0),
    (349.0, 600.0),
    (0.0, 200.0),
    (523.0, 250.0),
    (659.0, 250.0),
    (784.0, 500.0),
    (659.0, 250.0),
    (523.0, 250.0),
    (440.0, 500.0),
    (392.0, 500.0),
    (349.0, 500.0),
    (0.0, 300.0),
    (440.0, 300.0),
    (523.0, 300.0),
    (587.0, 300.0),
    (659.0, 400.0),
    (587.0, 300.0),
    (523.0, 300.0),
    (440.0, 600.0),
    (0.0, 400.0),
];

pub fn melody_length_ms() -> f64 {
    MELODY.iter().map(|&(_, dur)| dur).sum()
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AudioSettings {
    pub sound_enabled: bool,
    pub music_enabled: bool,
    pub volume: f32,
    pub music_volume: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            music_enabled: false,
            volume: 0.5,
            music_volume: 0.3,
        }
    }
}

/// Turns cues into absolutely-timed tones. The page drains due events each
/// frame and synthesizes them; nothing here touches game state.
pub struct ToneScheduler {
    settings: AudioSettings,
    clock_ms: f64,
    effects: Vec<ToneEvent>,
    music: Vec<ToneEvent>,
    next_loop_at: Option<f64>,
}

impl ToneScheduler {
    pub fn new(settings: AudioSettings) -> Self {
        let mut scheduler = Self {
            settings,
            clock_ms: 0.0,
            effects: Vec::new(),
            music: Vec::new(),
            next_loop_at: None,
        };
        scheduler.set_volume(settings.volume);
        scheduler
    }

    pub fn settings(&self) -> AudioSettings {
        self.settings
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.settings.volume = volume.clamp(0.0, 1.0);
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.settings.sound_enabled = enabled;
    }

    pub fn set_music_enabled(&mut self, enabled: bool) {
        self.settings.music_enabled = enabled;
        if !enabled {
            self.next_loop_at = None;
            self.music.clear();
        }
    }

    pub fn advance(&mut self, now_ms: f64) {
        self.clock_ms = now_ms;
        if !self.settings.music_enabled {
            return;
        }
        let start = *self.next_loop_at.get_or_insert(now_ms);
        if start <= now_ms {
            self.queue_melody(start);
            self.next_loop_at = Some(start + melody_length_ms() + MUSIC_LOOP_GAP_MS);
        }
    }

    fn queue_melody(&mut self, start: f64) {
        let gain = self.settings.music_volume * MUSIC_GAIN;
        let mut at = start;
        for &(freq, dur) in MELODY.iter() {
            if freq > 0.0 {
                self.music.push(ToneEvent {
                    at_ms: at,
                    tone: Tone::triangle(freq, dur as f32, gain),
                });
            }
            at += dur;
        }
    }

    /// Removes and returns every event due at or before `now_ms`, oldest first.
    pub fn drain_due(&mut self, now_ms: f64) -> Vec<ToneEvent> {
        let mut due = Vec::new();
        for queue in [&mut self.effects, &mut self.music] {
            let (ready, later): (Vec<_>, Vec<_>) =
                queue.drain(..).partition(|event| event.at_ms <= now_ms);
            *queue = later;
            due.extend(ready);
        }
        due.sort_by(|a, b| a.at_ms.total_cmp(&b.at_ms));
        due
    }

    pub fn pending(&self) -> usize {
        self.effects.len() + self.music.len()
    }
}

impl AudioSink for ToneScheduler {
    fn cue(&mut self, cue: SoundCue) {
        if !self.settings.sound_enabled {
            return;
        }
        let volume = self.settings.volume;
        let now = self.clock_ms;
        self.effects
            .extend(cue.tones().into_iter().map(|(offset, tone)| ToneEvent {
                at_ms: now + offset,
                tone: Tone {
                    gain: tone.gain * volume,
                    ..tone
                },
            }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_clear_rises_in_pitch() {
        let tones = SoundCue::LinesCleared(3).tones();
        let freqs: Vec<f32> = tones.iter().map(|(_, t)| t.freq).collect();
        let offsets: Vec<f64> = tones.iter().map(|(at, _)| *at).collect();
        assert_eq!(freqs, [523.0, 673.0, 823.0]);
        assert_eq!(offsets, [0.0, 60.0, 120.0]);
    }

    #[test]
    fn cues_are_released_on_schedule() {
        let mut audio = ToneScheduler::new(AudioSettings::default());
        audio.advance(1000.0);
        audio.cue(SoundCue::GameOver);
        assert_eq!(audio.pending(), 4);

        let first = audio.drain_due(1000.0);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].tone.gain, 0.35 * 0.5);
        assert_eq!(audio.drain_due(1200.0).len(), 1);
        assert_eq!(audio.drain_due(2000.0).len(), 2);
        assert!(audio.drain_due(5000.0).is_empty());
    }

    #[test]
    fn muted_sound_queues_nothing() {
        let mut audio = ToneScheduler::new(AudioSettings {
            sound_enabled: false,
            ..AudioSettings::default()
        });
        audio.cue(SoundCue::LevelUp);
        assert_eq!(audio.pending(), 0);
        audio.cue(SoundCue::Move);
        assert!(audio.drain_due(f64::MAX).is_empty());
    }

    #[test]
    fn music_loops_after_gap() {
        let mut audio = ToneScheduler::new(AudioSettings {
            music_enabled: true,
            ..AudioSettings::default()
        });
        audio.advance(0.0);
        let notes = MELODY.iter().filter(|(f, _)| *f > 0.0).count();
        assert_eq!(audio.pending(), notes);

        audio.advance(melody_length_ms());
        assert_eq!(audio.pending(), notes);
        audio.advance(melody_length_ms() + MUSIC_LOOP_GAP_MS);
        assert_eq!(audio.pending(), notes * 2);

        audio.cue(SoundCue::HardDrop);
        audio.set_music_enabled(false);
        audio.advance(1e9);
        assert_eq!(audio.drain_due(1e9).len(), 1);
    }

    #[test]
    fn volume_is_clamped() {
        let mut audio = ToneScheduler::new(AudioSettings {
            volume: 3.0,
            ..AudioSettings::default()
        });
        assert_eq!(audio.settings().volume, 1.0);
        audio.set_volume(-1.0);
        assert_eq!(audio.settings().volume, 0.0);
    }
}
