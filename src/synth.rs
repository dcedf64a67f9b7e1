//! Polyphonic wavetable synthesizer.
//!
//! The synth lives inside the audio callback. Everything else talks to it by
//! sending `SynthCommand`s over an mpsc channel; the callback drains the
//! channel at the start of each output buffer.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use wmidi::Note;

/// Samples in one wavetable cycle
pub const TABLE_SIZE: usize = 2048;

/// Fade applied by `stop` and at the end of a voice
const RELEASE_SECS: f32 = 0.03;

/// A ready-to-play instrument sound
#[derive(Debug)]
pub struct Patch {
    pub name: &'static str,
    table: Vec<f32>,
    /// Attack ramp in seconds
    pub attack: f32,
    /// Exponential decay time constant in seconds, 0 means no decay
    pub decay: f32,
    /// Total voice length in seconds
    pub length: f32,
    /// Breath noise level mixed into the output
    pub noise: f32,
}

impl Patch {
    /// Renders one normalized cycle from harmonic amplitudes
    /// (index 0 is the fundamental).
    pub fn from_harmonics(
        name: &'static str,
        harmonics: &[f32],
        attack: f32,
        decay: f32,
        length: f32,
        noise: f32,
    ) -> Self {
        let mut table = vec![0.0f32; TABLE_SIZE];
        for (i, sample) in table.iter_mut().enumerate() {
            let phase = 2.0 * PI * i as f32 / TABLE_SIZE as f32;
            *sample = harmonics
                .iter()
                .enumerate()
                .map(|(h, amp)| amp * ((h + 1) as f32 * phase).sin())
                .sum();
        }

        let peak = table.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        if peak > 0.0 {
            for sample in table.iter_mut() {
                *sample /= peak;
            }
        }

        Self {
            name,
            table,
            attack,
            decay,
            length,
            noise,
        }
    }

    /// Linear-interpolated table read, `phase` in table samples
    fn read(&self, phase: f32) -> f32 {
        let i = phase as usize % TABLE_SIZE;
        let frac = phase - phase.floor();
        let a = self.table[i];
        let b = self.table[(i + 1) % TABLE_SIZE];
        a + (b - a) * frac
    }
}

/// One note of a scheduled sequence, `time` in seconds from the start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledNote {
    pub time: f64,
    pub note: Note,
}

#[derive(Debug)]
pub enum SynthCommand {
    Play {
        instrument: u64,
        patch: Arc<Patch>,
        note: Note,
    },
    /// Releases every voice and pending event of one instrument
    Stop { instrument: u64 },
    /// Queues `events` to start `delay` seconds after the command arrives
    Schedule {
        instrument: u64,
        patch: Arc<Patch>,
        delay: f64,
        events: Vec<ScheduledNote>,
    },
}

struct Voice {
    instrument: u64,
    patch: Arc<Patch>,
    phase: f32,
    step: f32,
    age: usize,
    attack: usize,
    length: usize,
    decay_per_sample: f32,
    level: f32,
    release: Option<Release>,
}

struct Release {
    remaining: usize,
    total: usize,
    from: f32,
}

impl Voice {
    fn new(instrument: u64, patch: Arc<Patch>, note: Note, sample_rate: f32) -> Self {
        let step = note.to_freq_f32() * TABLE_SIZE as f32 / sample_rate;
        let attack = (patch.attack * sample_rate) as usize;
        let length = ((patch.length * sample_rate) as usize).max(1);
        let decay_per_sample = if patch.decay > 0.0 {
            (-1.0 / (patch.decay * sample_rate)).exp()
        } else {
            1.0
        };

        Self {
            instrument,
            patch,
            phase: 0.0,
            step,
            age: 0,
            attack,
            length,
            decay_per_sample,
            level: 1.0,
            release: None,
        }
    }

    fn release(&mut self, samples: usize) {
        if self.release.is_none() {
            let samples = samples.max(1);
            self.release = Some(Release {
                remaining: samples,
                total: samples,
                from: self.envelope(),
            });
        }
    }

    fn envelope(&self) -> f32 {
        if self.age < self.attack {
            self.age as f32 / self.attack as f32
        } else {
            self.level
        }
    }

    fn is_done(&self) -> bool {
        matches!(&self.release, Some(r) if r.remaining == 0)
    }

    fn next_sample(&mut self, rng: &mut StdRng, release_samples: usize) -> f32 {
        if self.age + release_samples >= self.length {
            self.release(release_samples);
        }

        let amp = match &mut self.release {
            Some(r) => {
                let amp = r.from * r.remaining as f32 / r.total as f32;
                r.remaining = r.remaining.saturating_sub(1);
                amp
            }
            None => self.envelope(),
        };

        if self.age >= self.attack {
            self.level *= self.decay_per_sample;
        }
        self.age += 1;

        let mut value = self.patch.read(self.phase);
        if self.patch.noise > 0.0 {
            value += self.patch.noise * rng.gen_range(-1.0f32..1.0);
        }
        self.phase = (self.phase + self.step) % TABLE_SIZE as f32;

        value * amp
    }
}

struct Pending {
    at: u64,
    instrument: u64,
    patch: Arc<Patch>,
    note: Note,
}

pub struct Synth {
    sample_rate: f32,
    polyphony: usize,
    volume: f32,
    release_samples: usize,
    voices: Vec<Voice>,
    /// Sorted latest-first so the next event pops off the end
    pending: Vec<Pending>,
    clock: u64,
    rng: StdRng,
}

impl Synth {
    pub fn new(sample_rate: f32, polyphony: usize, volume: f32) -> Self {
        Self {
            sample_rate,
            polyphony: polyphony.max(1),
            volume: volume.clamp(0.0, 1.0),
            release_samples: (RELEASE_SECS * sample_rate) as usize,
            voices: Vec::with_capacity(polyphony),
            pending: Vec::new(),
            clock: 0,
            rng: StdRng::seed_from_u64(0x5eed),
        }
    }

    /// Samples rendered so far
    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    /// Applies every queued command without blocking
    pub fn drain(&mut self, rx: &Receiver<SynthCommand>) {
        for command in rx.try_iter() {
            self.handle(command);
        }
    }

    pub fn handle(&mut self, command: SynthCommand) {
        match command {
            SynthCommand::Play {
                instrument,
                patch,
                note,
            } => self.start_voice(instrument, patch, note),
            SynthCommand::Stop { instrument } => {
                let release = self.release_samples;
                for voice in self.voices.iter_mut().filter(|v| v.instrument == instrument) {
                    voice.release(release);
                }
                self.pending.retain(|p| p.instrument != instrument);
            }
            SynthCommand::Schedule {
                instrument,
                patch,
                delay,
                events,
            } => {
                let start = self.clock as f64 + delay.max(0.0) * self.sample_rate as f64;
                for event in events {
                    let at = start + event.time.max(0.0) * self.sample_rate as f64;
                    self.pending.push(Pending {
                        at: at.round() as u64,
                        instrument,
                        patch: patch.clone(),
                        note: event.note,
                    });
                }
                self.pending.sort_by(|a, b| b.at.cmp(&a.at));
            }
        }
    }

    fn start_voice(&mut self, instrument: u64, patch: Arc<Patch>, note: Note) {
        if self.voices.len() >= self.polyphony {
            self.voices.remove(0);
        }
        self.voices
            .push(Voice::new(instrument, patch, note, self.sample_rate));
    }

    pub fn next_sample(&mut self) -> f32 {
        while matches!(self.pending.last(), Some(p) if p.at <= self.clock) {
            if let Some(p) = self.pending.pop() {
                self.start_voice(p.instrument, p.patch, p.note);
            }
        }

        let release = self.release_samples;
        let rng = &mut self.rng;
        let mix: f32 = self
            .voices
            .iter_mut()
            .map(|v| v.next_sample(rng, release))
            .sum();
        self.voices.retain(|v| !v.is_done());
        self.clock += 1;

        (mix * self.volume).clamp(-1.0, 1.0)
    }
}
