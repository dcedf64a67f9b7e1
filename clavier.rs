use anyhow::{anyhow, Context};
use clap::Parser;
use clavier_rs::config::{default_log_path, Args};
use clavier_rs::input::{self, KeyInput};
use clavier_rs::player::{Player, PlayerEvent};
use clavier_rs::synth::{Synth, SynthCommand};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossterm::event::{
    self, Event, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::terminal::{self, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue, style};
use midir::{Ignore, MidiInput, MidiInputConnection};
use std::fs::{self, File};
use std::io::{stdin, stdout, Stdout, Write};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::spawn;
use std::time::{Duration, Instant};
use wmidi::MidiMessage;
use wmidi::MidiMessage::*;
use wmidi::Note;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let log_path = init_logging(&args)?;

    // Find default output host
    let host = cpal::default_host();
    let device = output_device(&host, args.device.as_deref())?;
    println!("Output device: {:?}", device.name()?);

    let end_chan: (Sender<()>, Receiver<()>) = channel(); // end channel
    let synth_chan: (Sender<SynthCommand>, Receiver<SynthCommand>) = channel(); // synth commands
    let note_chan: (Sender<Note>, Receiver<Note>) = channel(); // notes from MIDI input

    let config = device.default_output_config()?;
    println!("Default output config: {:?}", config);
    log::info!("output {:?} with {:?}", device.name()?, config);

    // Keep the connection alive until we quit
    let _midi_connection = if args.midi {
        Some(open_midi(args.midi_port, note_chan.0)?)
    } else {
        None
    };

    let synth = Synth::new(config.sample_rate().0 as f32, args.polyphony, args.volume);
    let sample_format = config.sample_format();
    let stream_config: cpal::StreamConfig = config.into();
    let synth_rx = synth_chan.1;
    let end_rx = end_chan.1;
    let run_thread = spawn(move || match sample_format {
        cpal::SampleFormat::F32 => run::<f32>(&device, &stream_config, synth, synth_rx, end_rx),
        cpal::SampleFormat::I16 => run::<i16>(&device, &stream_config, synth, synth_rx, end_rx),
        cpal::SampleFormat::U16 => run::<u16>(&device, &stream_config, synth, synth_rx, end_rx),
    });

    let mut player = Player::new(synth_chan.0, args.octave, args.instrument);
    let result = play(&mut player, &note_chan.1);

    // Send end note
    let _ = end_chan.0.send(());

    // Join thread
    match run_thread.join() {
        Ok(Ok(())) => (),
        Ok(Err(err)) => eprintln!("Audio error: {}", err),
        Err(error) => eprintln!("Error: {:?}", error),
    };
    println!("Log written to {}", log_path.display());
    result
}

fn init_logging(args: &Args) -> anyhow::Result<std::path::PathBuf> {
    use simplelog::*;

    let log_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut log_path = args.log_file.clone().unwrap_or_else(default_log_path);
    if let Some(parent) = log_path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path) {
        Ok(file) => file,
        Err(_) => {
            log_path = std::env::temp_dir().join("clavier.log");
            File::create(&log_path)
                .with_context(|| format!("cannot create log file {}", log_path.display()))?
        }
    };

    WriteLogger::init(log_level, Config::default(), log_file)?;
    log::info!("clavier starting (log level: {:?})", log_level);
    Ok(log_path)
}

fn output_device(host: &cpal::Host, name: Option<&str>) -> anyhow::Result<cpal::Device> {
    match name {
        Some(name) => host
            .output_devices()?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .with_context(|| format!("no output device named {:?}", name)),
        None => host
            .default_output_device()
            .context("failed to find output device"),
    }
}

/// Terminal session: raw mode in, event loop, everything restored on the way out
fn play(player: &mut Player, midi_notes: &Receiver<Note>) -> anyhow::Result<()> {
    let mut out = stdout();
    terminal::enable_raw_mode()?;
    let release_events = terminal::supports_keyboard_enhancement().unwrap_or(false);
    log::info!("key release events: {}", release_events);

    let result = enter_screen(&mut out, release_events)
        .map_err(anyhow::Error::from)
        .and_then(|()| event_loop(player, midi_notes, release_events));

    // Restore the terminal even when setup failed halfway
    if release_events {
        let _ = execute!(out, PopKeyboardEnhancementFlags);
    }
    let _ = execute!(out, LeaveAlternateScreen, cursor::Show);
    let restored = terminal::disable_raw_mode();
    result?;
    restored?;
    Ok(())
}

fn enter_screen(out: &mut Stdout, release_events: bool) -> std::io::Result<()> {
    if release_events {
        execute!(
            out,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                    | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
            )
        )?;
    }
    execute!(out, EnterAlternateScreen, cursor::Hide)
}

fn event_loop(
    player: &mut Player,
    midi_notes: &Receiver<Note>,
    release_events: bool,
) -> anyhow::Result<()> {
    let mut last = String::from("loading instrument...");
    draw(player, &last)?;

    loop {
        let mut events = player.poll();

        for note in midi_notes.try_iter() {
            events.extend(player.play_midi(note, Instant::now()));
        }

        if event::poll(Duration::from_millis(10))? {
            if let Event::Key(key) = event::read()? {
                if input::is_quit(&key) {
                    break;
                }
                for input in input::translate(&key, release_events) {
                    match input {
                        KeyInput::Down { code, shift } => {
                            events.extend(player.key_down(&code, shift))
                        }
                        KeyInput::Up { code } => player.key_up(&code),
                    }
                }
            }
        }

        if !events.is_empty() {
            if let Some(message) = events.iter().rev().find_map(describe) {
                last = message;
            }
            draw(player, &last)?;
        }
    }

    Ok(())
}

fn describe(event: &PlayerEvent) -> Option<String> {
    let message = match event {
        PlayerEvent::NotePlayed(note) => format!("played {}", note),
        PlayerEvent::OctaveChanged(_) => return None,
        PlayerEvent::SingleNoteToggled(on) => format!("single note {}", on_off(*on)),
        PlayerEvent::Stopped => "stopped".to_string(),
        PlayerEvent::InstrumentRequested(name) => format!("loading {}...", name),
        PlayerEvent::InstrumentLoaded(name) => format!("{} ready", name),
        PlayerEvent::InstrumentFailed(err) => format!("load failed: {}", err),
        PlayerEvent::PlaybackRequested(n) => format!("preparing playback of {} notes...", n),
        PlayerEvent::PlaybackStarted(n) => format!("playing back {} notes", n),
        PlayerEvent::RecordingStarted => "recording started".to_string(),
        PlayerEvent::RecordingStopped(n) => format!("recording stopped, {} notes", n),
        PlayerEvent::InspectToggled(on) => format!("inspect mode {}", on_off(*on)),
        PlayerEvent::Inspected(_) => return None,
    };
    Some(message)
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

fn draw(player: &Player, last: &str) -> anyhow::Result<()> {
    let mut out = stdout();
    let instrument = match player.instrument() {
        Some(i) if i.single_note => format!("{} (single note)", i.name()),
        Some(i) => i.name().to_string(),
        None => "-".to_string(),
    };
    let mode = match (player.is_inspecting(), player.recorder().is_recording()) {
        (true, _) => "  [INSPECT]",
        (false, true) => "  [REC]",
        (false, false) => "",
    };
    let mapping = player.mapping();

    let lines = [
        "clavier | Esc quits, Tab inspects keys, keypad Enter records, 0 plays back".to_string(),
        String::new(),
        format!("Octave:     {}", player.octave()),
        format!("Instrument: {}{}", instrument, mode),
        format!("Mapping:    {:<11} {}", mapping.kind.label(), mapping.value),
        String::new(),
        last.to_string(),
    ];

    queue!(out, terminal::Clear(ClearType::All))?;
    for (row, line) in lines.iter().enumerate() {
        queue!(out, cursor::MoveTo(0, row as u16), style::Print(line))?;
    }
    out.flush()?;
    Ok(())
}

pub fn run<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut synth: Synth,
    commands: Receiver<SynthCommand>,
    rx: Receiver<()>,
) -> Result<(), anyhow::Error>
where
    T: cpal::Sample,
{
    let channels = config.channels as usize;
    log::info!(
        "sample rate: {}, channels: {}",
        config.sample_rate.0,
        channels
    );

    let err_fn = |err| log::error!("an error occurred on stream: {}", err);
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            synth.drain(&commands);
            write_data(data, channels, &mut || synth.next_sample())
        },
        err_fn,
    )?;
    stream.play()?;
    let _ = rx.recv();

    Ok(())
}

fn write_data<T>(output: &mut [T], channels: usize, next_sample: &mut dyn FnMut() -> f32)
where
    T: cpal::Sample,
{
    for frame in output.chunks_mut(channels) {
        let value: T = cpal::Sample::from::<f32>(&next_sample());
        for sample in frame.iter_mut() {
            *sample = value;
        }
    }
}

/// Opens a MIDI input port and forwards note-ons to the player loop
fn open_midi(port: Option<usize>, tx: Sender<Note>) -> anyhow::Result<MidiInputConnection<()>> {
    let mut midi_in = MidiInput::new("clavier midi input")?;
    midi_in.ignore(Ignore::All);

    let in_ports = midi_in.ports();
    let in_port = match (port, in_ports.len()) {
        (_, 0) => return Err(anyhow!("no MIDI input port found")),
        (Some(index), _) => in_ports
            .get(index)
            .context("invalid input port selected")?,
        (None, 1) => {
            println!(
                "Choosing the only available input port: {}",
                midi_in.port_name(&in_ports[0])?
            );
            &in_ports[0]
        }
        (None, _) => {
            println!("\nAvailable input ports:");
            for (i, p) in in_ports.iter().enumerate() {
                println!("{}: {}", i, midi_in.port_name(p)?);
            }
            print!("Please select input port: ");
            stdout().flush()?;
            let mut input = String::new();
            stdin().read_line(&mut input)?;
            in_ports
                .get(input.trim().parse::<usize>()?)
                .context("invalid input port selected")?
        }
    };
    let in_port_name = midi_in.port_name(in_port)?;
    let in_port = in_port.clone();

    let connection = midi_in
        .connect(
            &in_port,
            "clavier-read-input",
            move |_, message, _| match MidiMessage::try_from(message) {
                Ok(NoteOn(_, note, velocity)) if u8::from(velocity) > 0 => {
                    let _ = tx.send(note); // sending note value through channel
                }
                Ok(_) => (),
                Err(err) => log::debug!("ignoring MIDI message {:?}: {}", message, err),
            },
            (),
        )
        .map_err(|err| anyhow!("cannot connect to {}: {}", in_port_name, err))?;

    log::info!("reading MIDI input from '{}'", in_port_name);
    Ok(connection)
}
