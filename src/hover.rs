//! Describes what a key is bound to, for the inspection display

use crate::keymap::{KeyTables, STANDARD};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingKind {
    Note,
    Instrument,
    Octave,
    None,
}

impl MappingKind {
    pub fn label(self) -> &'static str {
        match self {
            MappingKind::Note => "NOTE",
            MappingKind::Instrument => "INSTRUMENT",
            MappingKind::Octave => "OCTAVE",
            MappingKind::None => "N/A",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub kind: MappingKind,
    pub value: String,
}

impl Mapping {
    pub fn none() -> Self {
        Self {
            kind: MappingKind::None,
            value: "N/A".to_string(),
        }
    }
}

impl Default for Mapping {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.label(), self.value)
    }
}

/// Resolves `code` against the standard key tables
pub fn resolve(code: &str, octave: i32) -> Mapping {
    resolve_in(&STANDARD, code, octave)
}

/// First match wins: note, then instrument, then octave
pub fn resolve_in(tables: &KeyTables<'_>, code: &str, octave: i32) -> Mapping {
    if let Some(note) = tables.note(code, octave) {
        return Mapping {
            kind: MappingKind::Note,
            value: note.to_string(),
        };
    }
    if let Some(instrument) = tables.instrument(code) {
        return Mapping {
            kind: MappingKind::Instrument,
            value: instrument.name.to_string(),
        };
    }
    if let Some(command) = tables.octave(code) {
        return Mapping {
            kind: MappingKind::Octave,
            value: command.to_string(),
        };
    }
    Mapping::none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::InstrumentDescriptor;
    use crate::keymap::NoteKey;
    use crate::note::PitchClass;
    use crate::octave::OctaveCommand;

    #[test]
    fn resolves_each_table() {
        assert_eq!(resolve("KeyH", 4).to_string(), "NOTE A4");
        assert_eq!(resolve("Digit3", 4).to_string(), "INSTRUMENT glockenspiel");
        assert_eq!(resolve("Numpad2", 4).to_string(), "OCTAVE 6");
        assert_eq!(resolve("ArrowLeft", 4).to_string(), "OCTAVE -1");
    }

    #[test]
    fn unmapped_is_not_applicable() {
        let mapping = resolve("KeyZ", 4);
        assert_eq!(mapping.kind.label(), "N/A");
        assert_eq!(mapping.value, "N/A");
    }

    #[test]
    fn note_wins_over_instrument_and_octave() {
        let notes = [(
            "Shared",
            NoteKey {
                pitch: PitchClass::G,
                octave_delta: 0,
            },
        )];
        let instruments = [
            ("Shared", InstrumentDescriptor::new("whistle", true)),
            ("Both", InstrumentDescriptor::new("ocarina", true)),
        ];
        let octaves = [
            ("Shared", OctaveCommand::Set(2)),
            ("Both", OctaveCommand::Increment),
        ];
        let tables = KeyTables {
            notes: &notes,
            instruments: &instruments,
            octaves: &octaves,
        };

        assert_eq!(resolve_in(&tables, "Shared", 3).to_string(), "NOTE G3");
        assert_eq!(
            resolve_in(&tables, "Both", 3).to_string(),
            "INSTRUMENT ocarina"
        );
    }
}
