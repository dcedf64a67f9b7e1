//! Static physical-key tables.
//!
//! Keys are identified by their physical key code (`KeyW`, `Digit1`,
//! `ArrowRight`, `Numpad4`, ...), independent of the keyboard layout.

use crate::instrument::InstrumentDescriptor;
use crate::note::{Note, PitchClass};
use crate::octave::OctaveCommand;

/// A note key: pitch class plus an offset from the current octave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteKey {
    pub pitch: PitchClass,
    pub octave_delta: i32,
}

const fn key(pitch: PitchClass, octave_delta: i32) -> NoteKey {
    NoteKey {
        pitch,
        octave_delta,
    }
}

pub const NOTE_KEYS: &[(&str, NoteKey)] = &[
    ("KeyW", key(PitchClass::A, -1)),
    ("KeyS", key(PitchClass::ASharp, -1)),
    ("KeyX", key(PitchClass::B, -1)),
    ("KeyE", key(PitchClass::C, 0)),
    ("KeyD", key(PitchClass::CSharp, 0)),
    ("KeyC", key(PitchClass::D, 0)),
    ("KeyR", key(PitchClass::DSharp, 0)),
    ("KeyF", key(PitchClass::E, 0)),
    ("KeyV", key(PitchClass::E, 0)),
    ("KeyT", key(PitchClass::F, 0)),
    ("KeyG", key(PitchClass::FSharp, 0)),
    ("KeyB", key(PitchClass::G, 0)),
    ("KeyY", key(PitchClass::GSharp, 0)),
    ("KeyH", key(PitchClass::A, 0)),
    ("KeyN", key(PitchClass::ASharp, 0)),
    ("KeyU", key(PitchClass::B, 0)),
    ("KeyJ", key(PitchClass::C, 1)),
    ("KeyM", key(PitchClass::C, 1)),
    ("KeyI", key(PitchClass::CSharp, 1)),
    ("KeyK", key(PitchClass::D, 1)),
];

pub const INSTRUMENT_KEYS: &[(&str, InstrumentDescriptor)] = &[
    ("Digit1", InstrumentDescriptor::new("acoustic_grand_piano", false)),
    ("Digit2", InstrumentDescriptor::new("bassoon", true)),
    ("Digit3", InstrumentDescriptor::new("glockenspiel", false)),
    ("Digit4", InstrumentDescriptor::new("ocarina", true)),
    ("Digit5", InstrumentDescriptor::new("whistle", true)),
];

pub const OCTAVE_KEYS: &[(&str, OctaveCommand)] = &[
    ("ArrowRight", OctaveCommand::Increment),
    ("ArrowLeft", OctaveCommand::Decrement),
    ("Numpad4", OctaveCommand::Set(3)),
    ("Numpad5", OctaveCommand::Set(2)),
    ("Numpad6", OctaveCommand::Set(1)),
    ("Numpad0", OctaveCommand::Set(4)),
    ("Numpad1", OctaveCommand::Set(5)),
    ("Numpad2", OctaveCommand::Set(6)),
    ("Numpad3", OctaveCommand::Set(7)),
];

/// A complete set of key tables, consulted note-first
#[derive(Debug, Clone, Copy)]
pub struct KeyTables<'a> {
    pub notes: &'a [(&'a str, NoteKey)],
    pub instruments: &'a [(&'a str, InstrumentDescriptor)],
    pub octaves: &'a [(&'a str, OctaveCommand)],
}

impl<'a> KeyTables<'a> {
    /// The note `code` plays when the keyboard sits at `octave`
    pub fn note(&self, code: &str, octave: i32) -> Option<Note> {
        find(self.notes, code).map(|k| Note::new(k.pitch, octave + k.octave_delta))
    }

    pub fn instrument(&self, code: &str) -> Option<&'a InstrumentDescriptor> {
        find(self.instruments, code)
    }

    pub fn octave(&self, code: &str) -> Option<OctaveCommand> {
        find(self.octaves, code).copied()
    }

    /// Every mapped key code, in table order
    pub fn codes(self) -> impl Iterator<Item = &'a str> + 'a {
        let (notes, instruments, octaves) = (self.notes, self.instruments, self.octaves);
        notes
            .iter()
            .map(|(c, _)| *c)
            .chain(instruments.iter().map(|(c, _)| *c))
            .chain(octaves.iter().map(|(c, _)| *c))
    }
}

pub const STANDARD: KeyTables<'static> = KeyTables {
    notes: NOTE_KEYS,
    instruments: INSTRUMENT_KEYS,
    octaves: OCTAVE_KEYS,
};

fn find<'a, T>(table: &'a [(&'a str, T)], code: &str) -> Option<&'a T> {
    table.iter().find(|(c, _)| *c == code).map(|(_, v)| v)
}

pub fn note_lookup(code: &str, octave: i32) -> Option<Note> {
    STANDARD.note(code, octave)
}

pub fn instrument_lookup(code: &str) -> Option<&'static InstrumentDescriptor> {
    STANDARD.instrument(code)
}

pub fn octave_lookup(code: &str) -> Option<OctaveCommand> {
    STANDARD.octave(code)
}

pub fn all_codes() -> impl Iterator<Item = &'static str> {
    STANDARD.codes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn note_keys_follow_current_octave() {
        assert_eq!(note_lookup("KeyE", 4).unwrap().to_string(), "C4");
        assert_eq!(note_lookup("KeyW", 4).unwrap().to_string(), "A3");
        assert_eq!(note_lookup("KeyI", 4).unwrap().to_string(), "C#5");
        assert_eq!(note_lookup("KeyK", 7).unwrap().to_string(), "D8");
        assert_eq!(note_lookup("KeyX", 1).unwrap().to_string(), "B0");
    }

    #[test]
    fn instrument_keys() {
        let bassoon = instrument_lookup("Digit2").unwrap();
        assert_eq!(bassoon.name, "bassoon");
        assert!(bassoon.single_note);
        assert!(!instrument_lookup("Digit1").unwrap().single_note);
        assert!(instrument_lookup("Digit0").is_none());
    }

    #[test]
    fn octave_keys() {
        assert_eq!(octave_lookup("ArrowRight"), Some(OctaveCommand::Increment));
        assert_eq!(octave_lookup("Numpad0"), Some(OctaveCommand::Set(4)));
        assert_eq!(octave_lookup("Numpad6"), Some(OctaveCommand::Set(1)));
    }

    #[test]
    fn unmapped_code_misses_every_table() {
        for code in ["KeyQ", "Digit9", "Escape", "", "keyw"] {
            assert!(note_lookup(code, 4).is_none());
            assert!(instrument_lookup(code).is_none());
            assert!(octave_lookup(code).is_none());
        }
    }

    #[test]
    fn codes_are_unique() {
        let codes: Vec<_> = all_codes().collect();
        let unique: HashSet<_> = codes.iter().collect();
        assert_eq!(codes.len(), unique.len());
        assert_eq!(codes.len(), 20 + 5 + 9);
    }
}
