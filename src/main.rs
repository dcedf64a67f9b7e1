use clavier_rs::hover;
use clavier_rs::keymap;
use clavier_rs::octave::DEFAULT_OCTAVE;
use cpal::traits::{DeviceTrait, HostTrait};

fn main() -> anyhow::Result<()> {
    // Find default output host
    let host = cpal::default_host();

    match host.default_output_device() {
        Some(device) => println!("Output device: {:?}", device.name()?),
        None => println!("Output device: none"),
    }

    println!("\nKey map (octave {}):", DEFAULT_OCTAVE);
    for code in keymap::all_codes() {
        let mapping = hover::resolve(code, DEFAULT_OCTAVE);
        println!("{:<14} {:<11} {}", code, mapping.kind.label(), mapping.value);
    }

    Ok(())
}
