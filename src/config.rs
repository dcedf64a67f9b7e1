use crate::instrument::{catalog_names, InstrumentDescriptor};
use crate::octave::{DEFAULT_OCTAVE, MAX_OCTAVE, MIN_OCTAVE};
use clap::Parser;
use std::path::PathBuf;

/// Play a piano from the computer keyboard
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Starting octave (1-7)
    #[clap(short, long, default_value_t = DEFAULT_OCTAVE, value_parser = parse_octave)]
    pub octave: i32,

    /// Starting instrument
    #[clap(short, long, default_value = "acoustic_grand_piano", value_parser = parse_instrument)]
    pub instrument: InstrumentDescriptor,

    /// Master volume (0.0-1.0)
    #[clap(long, default_value_t = 0.3, value_parser = parse_volume)]
    pub volume: f32,

    /// Maximum number of simultaneous voices
    #[clap(long, default_value_t = 32)]
    pub polyphony: usize,

    /// Output device name (defaults to the host's default output)
    #[clap(short, long)]
    pub device: Option<String>,

    /// Also play notes from a MIDI input port
    #[clap(long)]
    pub midi: bool,

    /// MIDI input port index, prompts when several ports exist
    #[clap(long, requires = "midi")]
    pub midi_port: Option<usize>,

    /// Log file path
    #[clap(long)]
    pub log_file: Option<PathBuf>,

    /// Log debug output
    #[clap(short, long)]
    pub verbose: bool,
}

fn parse_octave(s: &str) -> Result<i32, String> {
    let octave: i32 = s.parse().map_err(|_| format!("`{}` is not a number", s))?;
    if (MIN_OCTAVE..=MAX_OCTAVE).contains(&octave) {
        Ok(octave)
    } else {
        Err(format!("octave must be between {} and {}", MIN_OCTAVE, MAX_OCTAVE))
    }
}

fn parse_instrument(s: &str) -> Result<InstrumentDescriptor, String> {
    InstrumentDescriptor::by_name(s).ok_or_else(|| {
        let known: Vec<_> = catalog_names().collect();
        format!("unknown instrument `{}` (one of: {})", s, known.join(", "))
    })
}

fn parse_volume(s: &str) -> Result<f32, String> {
    let volume: f32 = s.parse().map_err(|_| format!("`{}` is not a number", s))?;
    if (0.0..=1.0).contains(&volume) {
        Ok(volume)
    } else {
        Err("volume must be between 0.0 and 1.0".to_string())
    }
}

/// Default log location under the user's config directory
pub fn default_log_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("clavier")
        .join("clavier.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["clavier"]).unwrap();
        assert_eq!(args.octave, 4);
        assert_eq!(args.instrument.name, "acoustic_grand_piano");
        assert!(!args.midi);
        assert_eq!(args.polyphony, 32);
    }

    #[test]
    fn parses_options() {
        let args = Args::try_parse_from([
            "clavier",
            "--octave",
            "2",
            "--instrument",
            "ocarina",
            "--midi",
            "--midi-port",
            "1",
        ])
        .unwrap();
        assert_eq!(args.octave, 2);
        assert!(args.instrument.single_note);
        assert_eq!(args.midi_port, Some(1));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Args::try_parse_from(["clavier", "--octave", "8"]).is_err());
        assert!(Args::try_parse_from(["clavier", "--instrument", "kazoo"]).is_err());
        assert!(Args::try_parse_from(["clavier", "--volume", "2"]).is_err());
        assert!(Args::try_parse_from(["clavier", "--midi-port", "0"]).is_err());
    }
}
