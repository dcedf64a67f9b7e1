//! Instrument catalog, background loading and instrument handles

use crate::error::{Error, Result};
use crate::note::Note;
use crate::synth::{Patch, ScheduledNote, SynthCommand};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::spawn;

/// Names a catalog patch and how it behaves on the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrumentDescriptor {
    pub name: &'static str,
    /// Playing a new note stops the previous one
    pub single_note: bool,
}

impl InstrumentDescriptor {
    pub const fn new(name: &'static str, single_note: bool) -> Self {
        Self { name, single_note }
    }

    /// Looks up a catalog patch by name, taking the single-note flag from
    /// its keyboard binding when it has one
    pub fn by_name(name: &str) -> Option<InstrumentDescriptor> {
        crate::keymap::INSTRUMENT_KEYS
            .iter()
            .map(|(_, descriptor)| *descriptor)
            .find(|descriptor| descriptor.name == name)
            .or_else(|| {
                CATALOG
                    .iter()
                    .find(|spec| spec.name == name)
                    .map(|spec| InstrumentDescriptor::new(spec.name, false))
            })
    }
}

pub const DEFAULT_INSTRUMENT: InstrumentDescriptor =
    InstrumentDescriptor::new("acoustic_grand_piano", false);

struct PatchSpec {
    name: &'static str,
    harmonics: &'static [f32],
    attack: f32,
    decay: f32,
    length: f32,
    noise: f32,
}

const CATALOG: &[PatchSpec] = &[
    PatchSpec {
        name: "acoustic_grand_piano",
        harmonics: &[1.0, 0.6, 0.35, 0.2, 0.12, 0.08, 0.05],
        attack: 0.002,
        decay: 0.9,
        length: 3.0,
        noise: 0.0,
    },
    PatchSpec {
        name: "bassoon",
        harmonics: &[0.5, 1.0, 0.8, 0.6, 0.45, 0.3, 0.2, 0.1],
        attack: 0.04,
        decay: 0.0,
        length: 2.0,
        noise: 0.0,
    },
    PatchSpec {
        name: "glockenspiel",
        harmonics: &[1.0, 0.0, 0.0, 0.4, 0.0, 0.0, 0.0, 0.0, 0.0, 0.2],
        attack: 0.001,
        decay: 0.5,
        length: 2.5,
        noise: 0.0,
    },
    PatchSpec {
        name: "ocarina",
        harmonics: &[1.0, 0.08, 0.03],
        attack: 0.03,
        decay: 0.0,
        length: 1.5,
        noise: 0.02,
    },
    PatchSpec {
        name: "whistle",
        harmonics: &[1.0, 0.02],
        attack: 0.05,
        decay: 0.0,
        length: 1.5,
        noise: 0.08,
    },
];

/// Names of every patch the loader can build
pub fn catalog_names() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|spec| spec.name)
}

fn build_patch(name: &str) -> Result<Patch> {
    let spec = CATALOG
        .iter()
        .find(|spec| spec.name == name)
        .ok_or_else(|| Error::UnknownInstrument(name.to_string()))?;
    Ok(Patch::from_harmonics(
        spec.name,
        spec.harmonics,
        spec.attack,
        spec.decay,
        spec.length,
        spec.noise,
    ))
}

/// A loaded instrument, bound to the synth it plays on
#[derive(Debug, Clone)]
pub struct Instrument {
    id: u64,
    name: &'static str,
    pub single_note: bool,
    patch: Arc<Patch>,
    synth: Sender<SynthCommand>,
}

impl Instrument {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Starts `note`, returning the MIDI note that was sent
    pub fn play(&self, note: Note) -> Result<wmidi::Note> {
        let midi = note.to_midi()?;
        self.send(SynthCommand::Play {
            instrument: self.id,
            patch: self.patch.clone(),
            note: midi,
        });
        Ok(midi)
    }

    pub fn play_midi(&self, note: wmidi::Note) {
        self.send(SynthCommand::Play {
            instrument: self.id,
            patch: self.patch.clone(),
            note,
        });
    }

    /// Silences every voice this instrument started
    pub fn stop(&self) {
        self.send(SynthCommand::Stop {
            instrument: self.id,
        });
    }

    /// Queues `events` to start `delay` seconds from now on the synth clock
    pub fn schedule(&self, delay: f64, events: Vec<ScheduledNote>) {
        self.send(SynthCommand::Schedule {
            instrument: self.id,
            patch: self.patch.clone(),
            delay,
            events,
        });
    }

    fn send(&self, command: SynthCommand) {
        if self.synth.send(command).is_err() {
            log::warn!("synth is gone, dropping command for {}", self.name);
        }
    }
}

/// Why an instrument is being loaded
#[derive(Debug, Clone, PartialEq)]
pub enum LoadPurpose {
    /// Becomes the current instrument
    Register,
    /// Fresh instance that plays back a recording
    Playback(Vec<ScheduledNote>),
}

#[derive(Debug)]
pub struct Loaded {
    pub request: u64,
    pub purpose: LoadPurpose,
    pub result: Result<Instrument>,
}

/// Builds instruments on worker threads and hands them back through `poll`.
/// A registration that finishes after a newer one was requested is discarded.
pub struct InstrumentLoader {
    synth: Sender<SynthCommand>,
    done_tx: Sender<Loaded>,
    done_rx: Receiver<Loaded>,
    requests: u64,
    latest_register: u64,
    in_flight: usize,
}

impl InstrumentLoader {
    pub fn new(synth: Sender<SynthCommand>) -> Self {
        let (done_tx, done_rx) = channel();
        Self {
            synth,
            done_tx,
            done_rx,
            requests: 0,
            latest_register: 0,
            in_flight: 0,
        }
    }

    /// Starts loading `descriptor`; returns the request number
    pub fn load(&mut self, descriptor: InstrumentDescriptor, purpose: LoadPurpose) -> u64 {
        self.requests += 1;
        let request = self.requests;
        if purpose == LoadPurpose::Register {
            self.latest_register = request;
        }
        self.in_flight += 1;

        log::debug!("loading {} (request {})", descriptor.name, request);
        let synth = self.synth.clone();
        let done = self.done_tx.clone();
        spawn(move || {
            let result = build_patch(descriptor.name).map(|patch| Instrument {
                id: request,
                name: descriptor.name,
                single_note: descriptor.single_note,
                patch: Arc::new(patch),
                synth,
            });
            let _ = done.send(Loaded {
                request,
                purpose,
                result,
            });
        });

        request
    }

    /// Loads still running
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Collects finished loads without blocking
    pub fn poll(&mut self) -> Vec<Loaded> {
        let finished: Vec<Loaded> = self.done_rx.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(finished.len());
        finished
            .into_iter()
            .filter(|loaded| self.is_current(loaded))
            .collect()
    }

    fn is_current(&self, loaded: &Loaded) -> bool {
        if loaded.purpose == LoadPurpose::Register && loaded.request != self.latest_register {
            log::debug!(
                "discarding stale instrument load {} (latest {})",
                loaded.request,
                self.latest_register
            );
            return false;
        }
        true
    }
}
