pub mod config;
pub mod error;
pub mod hover;
pub mod input;
pub mod instrument;
pub mod keymap;
pub mod note;
pub mod octave;
pub mod player;
pub mod recorder;
pub mod synth;

pub use error::{Error, Result};
