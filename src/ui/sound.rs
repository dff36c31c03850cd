/// Sound engine: procedural retro sound effects via rodio.
///
/// Every effect is rendered once into an in-memory WAV buffer at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// The engine only listens to `GameEvent`s; `sfx_for` decides which effect
/// (if any) an event makes. Muting is a flag on the engine.
///
/// Background music is a short descending loop on its own sink. A new game
/// starts it; death, victory or muting stop it.
///
/// Compile with `--no-default-features` or without the "sound" feature
/// to disable audio entirely (the stub SoundEngine does nothing).

use crate::sim::event::GameEvent;

/// One pre-rendered effect.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sfx {
    Step,
    Pickup,
    ArrowShot,
    DragonRoar,
    PitFall,
    BatFlap,
    Breeze,
    Wings,
    Victory,
}

impl Sfx {
    pub const ALL: [Sfx; 9] = [
        Sfx::Step,
        Sfx::Pickup,
        Sfx::ArrowShot,
        Sfx::DragonRoar,
        Sfx::PitFall,
        Sfx::BatFlap,
        Sfx::Breeze,
        Sfx::Wings,
        Sfx::Victory,
    ];
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(not(feature = "sound"), allow(dead_code))]
pub enum MusicCue {
    Start,
    Stop,
}

/// The last music change a batch of events asks for, if any.
#[cfg_attr(not(feature = "sound"), allow(dead_code))]
pub fn music_cue(events: &[GameEvent]) -> Option<MusicCue> {
    events.iter().rev().find_map(|e| match e {
        GameEvent::GameStarted => Some(MusicCue::Start),
        e if e.is_terminal() => Some(MusicCue::Stop),
        _ => None,
    })
}

pub fn sfx_for(event: &GameEvent) -> Option<Sfx> {
    match event {
        GameEvent::Moved { .. } => Some(Sfx::Step),
        GameEvent::ArrowFound | GameEvent::RopeFound | GameEvent::ArrowRetrieved => Some(Sfx::Pickup),
        GameEvent::ArrowLoosed => Some(Sfx::ArrowShot),
        GameEvent::Devoured | GameEvent::DragonNearby => Some(Sfx::DragonRoar),
        GameEvent::PitDeath => Some(Sfx::PitFall),
        GameEvent::BatEncounter { .. } => Some(Sfx::BatFlap),
        GameEvent::PitNearby => Some(Sfx::Breeze),
        GameEvent::BatNearby => Some(Sfx::Wings),
        GameEvent::DragonSlain { .. } => Some(Sfx::Victory),
        GameEvent::GameStarted | GameEvent::PitSurvived | GameEvent::ArrowMissed { .. } => None,
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use log::warn;
    use rodio::{OutputStream, OutputStreamHandle, Sink, Source};

    use super::{music_cue, sfx_for, MusicCue, Sfx};
    use crate::sim::event::GameEvent;

    const SAMPLE_RATE: u32 = 22050;

    /// Pre-generated WAV buffers, indexed by `Sfx as usize`.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        buffers: Vec<Arc<Vec<u8>>>,
        music_wav: Arc<Vec<u8>>,
        music: Option<Sink>,
        muted: bool,
    }

    impl SoundEngine {
        /// `None` when no audio device is available.
        pub fn new(muted: bool) -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("No audio output, sound disabled: {e}");
                    return None;
                }
            };

            let buffers = Sfx::ALL
                .iter()
                .map(|&sfx| Arc::new(make_wav(&render(sfx))))
                .collect();

            let music_wav = Arc::new(make_wav(&gen_music_loop()));

            Some(SoundEngine { _stream: stream, handle, buffers, music_wav, music: None, muted })
        }

        pub fn is_muted(&self) -> bool {
            self.muted
        }

        /// Flip the mute flag; returns the new state.
        pub fn toggle_mute(&mut self) -> bool {
            self.muted = !self.muted;
            if self.muted {
                self.stop_music();
            }
            self.muted
        }

        /// (Re)start the background loop. Does nothing while muted.
        pub fn start_music(&mut self) {
            self.stop_music();
            if self.muted {
                return;
            }
            let Ok(sink) = Sink::try_new(&self.handle) else { return };
            let cursor = Cursor::new(self.music_wav.as_ref().clone());
            match rodio::Decoder::new(cursor) {
                Ok(src) => {
                    sink.append(src.repeat_infinite());
                    self.music = Some(sink);
                }
                Err(e) => warn!("Music loop failed to decode: {e}"),
            }
        }

        pub fn stop_music(&mut self) {
            if let Some(sink) = self.music.take() {
                sink.stop();
            }
        }

        pub fn play(&self, sfx: Sfx) {
            if self.muted {
                return;
            }
            let buf = &self.buffers[sfx as usize];
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        pub fn play_events(&mut self, events: &[GameEvent]) {
            for sfx in events.iter().filter_map(sfx_for) {
                self.play(sfx);
            }
            match music_cue(events) {
                Some(MusicCue::Start) => self.start_music(),
                Some(MusicCue::Stop) => self.stop_music(),
                None => {}
            }
        }
    }

    fn render(sfx: Sfx) -> Vec<f32> {
        match sfx {
            Sfx::Step => tone(Wave::Square, 200.0, 0.05, 0.2),
            Sfx::Pickup => gen_pickup(),
            Sfx::ArrowShot => sweep(Wave::Sine, 400.0, 800.0, 0.2, 0.25, Ramp::Exp),
            Sfx::DragonRoar => sweep(Wave::Saw, 150.0, 50.0, 0.5, 0.35, Ramp::Exp),
            Sfx::PitFall => gen_pit_fall(),
            Sfx::BatFlap => gen_bat_flap(),
            Sfx::Breeze => low_pass(&sweep(Wave::Saw, 80.0, 60.0, 0.4, 0.3, Ramp::Linear), 0.06),
            Sfx::Wings => gen_wings(),
            Sfx::Victory => gen_victory(),
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    #[derive(Clone, Copy)]
    enum Wave {
        Sine,
        Square,
        Saw,
        Triangle,
    }

    #[derive(Clone, Copy)]
    enum Ramp {
        Linear,
        Exp,
    }

    fn osc(wave: Wave, phase: f32) -> f32 {
        let p = phase.fract();
        match wave {
            Wave::Sine => (p * 2.0 * std::f32::consts::PI).sin(),
            Wave::Square => if p < 0.5 { 1.0 } else { -1.0 },
            Wave::Saw => 2.0 * p - 1.0,
            Wave::Triangle => 1.0 - 4.0 * (p - 0.5).abs(),
        }
    }

    /// Frequency glide from `f0` to `f1` with an exponential decay envelope.
    fn sweep(wave: Wave, f0: f32, f1: f32, duration: f32, volume: f32, ramp: Ramp) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = match ramp {
                    Ramp::Linear => f0 + (f1 - f0) * t,
                    Ramp::Exp => f0 * (f1 / f0).powf(t),
                };
                phase += freq / SAMPLE_RATE as f32;
                let env = 0.03_f32.powf(t); // ~volume → 3% over the duration
                osc(wave, phase) * env * volume
            })
            .collect()
    }

    fn tone(wave: Wave, freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        sweep(wave, freq, freq, duration, volume, Ramp::Linear)
    }

    fn silence(duration: f32) -> Vec<f32> {
        vec![0.0; (SAMPLE_RATE as f32 * duration) as usize]
    }

    /// One-pole low-pass; `alpha` in (0, 1], smaller is darker.
    fn low_pass(samples: &[f32], alpha: f32) -> Vec<f32> {
        let mut prev = 0.0;
        samples
            .iter()
            .map(|&s| {
                prev += alpha * (s - prev);
                prev * 3.0
            })
            .collect()
    }

    /// Item pickup: two rising sine notes.
    fn gen_pickup() -> Vec<f32> {
        let mut samples = tone(Wave::Sine, 600.0, 0.1, 0.3);
        samples.extend(tone(Wave::Sine, 800.0, 0.15, 0.3));
        samples
    }

    /// Pit fall: long falling whistle, then three low thuds.
    fn gen_pit_fall() -> Vec<f32> {
        let mut samples = sweep(Wave::Sine, 800.0, 100.0, 0.5, 0.3, Ramp::Exp);
        for freq in [100.0, 90.0, 80.0] {
            samples.extend(tone(Wave::Square, freq, 0.3, 0.2));
        }
        samples
    }

    /// Bat grab: three quick rising flaps.
    fn gen_bat_flap() -> Vec<f32> {
        let mut samples = Vec::new();
        for i in 0..3 {
            samples.extend(tone(Wave::Square, 300.0 + i as f32 * 50.0, 0.08, 0.2));
            samples.extend(silence(0.02));
        }
        samples
    }

    /// Bat nearby: two faint flaps, quieter than a grab.
    fn gen_wings() -> Vec<f32> {
        let mut samples = Vec::new();
        for i in 0..2 {
            samples.extend(tone(Wave::Square, 250.0 + i as f32 * 30.0, 0.06, 0.1));
            samples.extend(silence(0.02));
        }
        samples
    }

    /// Dragon slain: C5 D5 E5 G5.
    fn gen_victory() -> Vec<f32> {
        let mut samples = Vec::new();
        for freq in [523.0, 587.0, 659.0, 784.0] {
            samples.extend(tone(Wave::Sine, freq, 0.2, 0.3));
        }
        samples.extend(tone(Wave::Sine, 784.0, 0.3, 0.2));
        samples
    }

    /// One pass of the music loop: A3 G#3 G3 F#3 on a 0.5 s grid, then a
    /// rest so the pass lasts 2.5 s.
    fn gen_music_loop() -> Vec<f32> {
        let mut samples = Vec::new();
        for freq in [220.0, 207.0, 196.0, 185.0] {
            samples.extend(tone(Wave::Triangle, freq, 0.4, 0.15));
            samples.extend(silence(0.1));
        }
        samples.extend(silence(0.5));
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

/// Never constructed: without the feature there is no audio to report.
#[cfg(not(feature = "sound"))]
#[allow(dead_code)]
pub struct SoundEngine {
    muted: bool,
}

#[cfg(not(feature = "sound"))]
#[allow(dead_code)]
impl SoundEngine {
    pub fn new(_muted: bool) -> Option<Self> { None }
    pub fn is_muted(&self) -> bool { self.muted }
    pub fn toggle_mute(&mut self) -> bool { self.muted = !self.muted; self.muted }
    pub fn start_music(&mut self) {}
    pub fn stop_music(&mut self) {}
    pub fn play(&self, _sfx: Sfx) {}
    pub fn play_events(&mut self, _events: &[GameEvent]) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::topology::Cell;

    #[test]
    fn events_map_to_effects() {
        assert_eq!(sfx_for(&GameEvent::Moved { to: Cell::START }), Some(Sfx::Step));
        assert_eq!(sfx_for(&GameEvent::RopeFound), Some(Sfx::Pickup));
        assert_eq!(sfx_for(&GameEvent::DragonSlain { score: 3 }), Some(Sfx::Victory));
        assert_eq!(sfx_for(&GameEvent::PitNearby), Some(Sfx::Breeze));
        assert_eq!(sfx_for(&GameEvent::PitSurvived), None);
        assert_eq!(sfx_for(&GameEvent::ArrowMissed { landed: Cell::START }), None);
    }

    #[test]
    fn new_game_starts_music_and_the_end_stops_it() {
        let started = [GameEvent::GameStarted, GameEvent::DragonNearby];
        assert_eq!(music_cue(&started), Some(MusicCue::Start));
        let devoured = [GameEvent::Moved { to: Cell::START }, GameEvent::Devoured];
        assert_eq!(music_cue(&devoured), Some(MusicCue::Stop));
        assert_eq!(music_cue(&[GameEvent::ArrowLoosed, GameEvent::DragonSlain { score: 1 }]), Some(MusicCue::Stop));
        assert_eq!(music_cue(&[GameEvent::Moved { to: Cell::START }]), None);
        assert_eq!(music_cue(&[]), None);
    }

    #[test]
    fn effect_table_is_indexable() {
        for (i, sfx) in Sfx::ALL.iter().enumerate() {
            assert_eq!(*sfx as usize, i);
        }
    }
}
