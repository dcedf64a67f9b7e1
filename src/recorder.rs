use crate::instrument::{InstrumentDescriptor, DEFAULT_INSTRUMENT};
use crate::synth::ScheduledNote;
use std::time::{Duration, Instant};
use wmidi::Note;

/// A note captured while recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedNote {
    /// Time since recording started
    pub offset: Duration,
    pub note: Note,
}

/// Tape of played notes, replayable through `events`
#[derive(Debug)]
pub struct Recorder {
    recording: bool,
    start: Instant,
    instrument: InstrumentDescriptor,
    buffer: Vec<RecordedNote>,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            recording: false,
            start: Instant::now(),
            instrument: DEFAULT_INSTRUMENT,
            buffer: Vec::new(),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Instrument that was current when the tape was started
    pub fn instrument(&self) -> InstrumentDescriptor {
        self.instrument
    }

    pub fn notes(&self) -> &[RecordedNote] {
        &self.buffer
    }

    /// Starts a fresh tape, discarding the previous one
    pub fn start(&mut self, now: Instant, instrument: InstrumentDescriptor) {
        self.recording = true;
        self.start = now;
        self.instrument = instrument;
        self.buffer.clear();
        log::info!("**** Recording started ({}) ****", instrument.name);
    }

    pub fn stop(&mut self) {
        self.recording = false;
        log::info!("**** Recording end ****");
        log::info!("{:?}", self.buffer);
    }

    /// Appends `note` if recording; notes stamped before the start count as zero
    pub fn record(&mut self, note: Note, now: Instant) {
        if self.recording {
            self.buffer.push(RecordedNote {
                offset: now.saturating_duration_since(self.start),
                note,
            });
        }
    }

    /// The tape as synth events, times in seconds
    pub fn events(&self) -> Vec<ScheduledNote> {
        self.buffer
            .iter()
            .map(|r| ScheduledNote {
                time: r.offset.as_secs_f64(),
                note: r.note,
            })
            .collect()
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::Note as PianoNote;

    fn midi(s: &str) -> Note {
        s.parse::<PianoNote>().unwrap().to_midi().unwrap()
    }

    #[test]
    fn ignores_notes_when_idle() {
        let mut recorder = Recorder::new();
        recorder.record(midi("C4"), Instant::now());
        assert!(recorder.notes().is_empty());
    }

    #[test]
    fn records_offsets_and_midi_numbers() {
        let mut recorder = Recorder::new();
        let start = Instant::now();
        recorder.start(start, InstrumentDescriptor::new("ocarina", true));
        recorder.record(midi("C4"), start + Duration::from_millis(250));
        recorder.record(midi("A4"), start + Duration::from_millis(1500));
        recorder.stop();
        recorder.record(midi("B4"), start + Duration::from_millis(2000));

        let notes = recorder.notes();
        assert_eq!(notes.len(), 2);
        assert_eq!(u8::from(notes[0].note), 60);
        assert_eq!(u8::from(notes[1].note), 69);
        assert_eq!(notes[1].offset, Duration::from_millis(1500));
        assert_eq!(recorder.instrument().name, "ocarina");

        let events = recorder.events();
        assert!((events[0].time - 0.25).abs() < 1e-9);
        assert!((events[1].time - 1.5).abs() < 1e-9);
    }

    #[test]
    fn restarting_clears_the_tape() {
        let mut recorder = Recorder::new();
        let now = Instant::now();
        recorder.start(now, DEFAULT_INSTRUMENT);
        recorder.record(midi("C4"), now);
        recorder.stop();
        recorder.start(now, DEFAULT_INSTRUMENT);
        assert!(recorder.notes().is_empty());
        assert!(recorder.is_recording());
    }
}
