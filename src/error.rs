use thiserror::Error;

/// Errors raised by the piano library
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("invalid note: {0:?}")]
    InvalidNote(String),

    #[error("note {0} is outside the MIDI range")]
    NoteOutOfRange(String),
}

pub type Result<T> = std::result::Result<T, Error>;
