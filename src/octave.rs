//! Current keyboard octave, saturating at the playable range

use std::fmt;

pub const MIN_OCTAVE: i32 = 1;
pub const MAX_OCTAVE: i32 = 7;
pub const DEFAULT_OCTAVE: i32 = 4;

/// What an octave key asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OctaveCommand {
    Set(i32),
    Increment,
    Decrement,
}

impl fmt::Display for OctaveCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OctaveCommand::Set(octave) => write!(f, "{}", octave),
            OctaveCommand::Increment => f.write_str("+1"),
            OctaveCommand::Decrement => f.write_str("-1"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Octave(i32);

impl Octave {
    pub fn new(octave: i32) -> Self {
        Octave(octave.clamp(MIN_OCTAVE, MAX_OCTAVE))
    }

    pub fn get(self) -> i32 {
        self.0
    }

    /// Applies `command` and returns the new octave
    pub fn apply(&mut self, command: OctaveCommand) -> i32 {
        let target = match command {
            OctaveCommand::Set(octave) => octave,
            OctaveCommand::Increment => self.0 + 1,
            OctaveCommand::Decrement => self.0 - 1,
        };
        *self = Octave::new(target);
        self.0
    }
}

impl Default for Octave {
    fn default() -> Self {
        Octave(DEFAULT_OCTAVE)
    }
}
