//! Chromatic notes, transposition and MIDI numbering

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// The twelve pitch classes, in chromatic order starting at C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Semitones above C (C=0, B=11)
    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn from_index(index: i32) -> PitchClass {
        Self::ALL[index.rem_euclid(12) as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

impl FromStr for PitchClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| Error::InvalidNote(s.to_string()))
    }
}

/// A pitch class in a specific octave, e.g. `C#4`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Note {
    pub pitch: PitchClass,
    pub octave: i32,
}

impl Note {
    pub fn new(pitch: PitchClass, octave: i32) -> Self {
        Self { pitch, octave }
    }

    /// The note `half_steps` semitones higher (lower when negative).
    /// Wrapping past B carries into the next octave.
    /// The octave saturates at the `i32` bounds.
    pub fn transpose(self, half_steps: i32) -> Note {
        let absolute = self.pitch.index() as i64 + half_steps as i64;
        let octave = self.octave as i64 + absolute.div_euclid(12);
        Note {
            pitch: PitchClass::from_index(absolute.rem_euclid(12) as i32),
            octave: octave.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
        }
    }

    /// One half-step up
    pub fn interval(self) -> Note {
        self.transpose(1)
    }

    /// MIDI note number, middle C (C4) = 60.
    /// May fall outside 0..=127; `None` when it overflows `i32`.
    pub fn midi_number(self) -> Option<i32> {
        self.octave
            .checked_add(1)
            .and_then(|o| o.checked_mul(12))
            .and_then(|n| n.checked_add(self.pitch.index()))
    }

    pub fn to_midi(self) -> Result<wmidi::Note> {
        self.midi_number()
            .and_then(|n| u8::try_from(n).ok())
            .and_then(|n| wmidi::Note::try_from(n).ok())
            .ok_or_else(|| Error::NoteOutOfRange(self.to_string()))
    }

    pub fn from_midi(note: wmidi::Note) -> Note {
        let number = u8::from(note) as i32;
        Note {
            pitch: PitchClass::from_index(number),
            octave: number.div_euclid(12) - 1,
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch.name(), self.octave)
    }
}

impl FromStr for Note {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let split = s
            .find(|c: char| c == '-' || c.is_ascii_digit())
            .ok_or_else(|| Error::InvalidNote(s.to_string()))?;
        let (letter, octave) = s.split_at(split);
        let pitch = letter
            .parse::<PitchClass>()
            .map_err(|_| Error::InvalidNote(s.to_string()))?;
        let octave = octave
            .parse::<i32>()
            .map_err(|_| Error::InvalidNote(s.to_string()))?;
        Ok(Note { pitch, octave })
    }
}
