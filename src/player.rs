//! Keyboard player state and key handlers

use crate::hover::{self, Mapping};
use crate::instrument::{Instrument, InstrumentDescriptor, InstrumentLoader, LoadPurpose};
use crate::keymap;
use crate::note::Note;
use crate::octave::Octave;
use crate::recorder::Recorder;
use crate::synth::SynthCommand;
use std::collections::HashSet;
use std::sync::mpsc::Sender;
use std::time::Instant;

pub const TOGGLE_SINGLE_NOTE: &str = "NumpadDecimal";
pub const STOP: &str = "Space";
pub const PLAY_RECORDING: &str = "Digit0";
pub const TOGGLE_RECORDING: &str = "NumpadEnter";
pub const TOGGLE_INSPECT: &str = "Tab";

/// Something the display may want to show
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    NotePlayed(Note),
    OctaveChanged(i32),
    SingleNoteToggled(bool),
    Stopped,
    InstrumentRequested(&'static str),
    InstrumentLoaded(&'static str),
    InstrumentFailed(String),
    PlaybackRequested(usize),
    PlaybackStarted(usize),
    RecordingStarted,
    RecordingStopped(usize),
    InspectToggled(bool),
    Inspected(Mapping),
}

pub struct Player {
    octave: Octave,
    instrument: Option<Instrument>,
    loader: InstrumentLoader,
    recorder: Recorder,
    held: HashSet<String>,
    inspecting: bool,
    mapping: Mapping,
}

impl Player {
    /// Creates the player and starts loading `instrument`
    pub fn new(synth: Sender<SynthCommand>, octave: i32, instrument: InstrumentDescriptor) -> Self {
        let mut player = Self {
            octave: Octave::new(octave),
            instrument: None,
            loader: InstrumentLoader::new(synth),
            recorder: Recorder::new(),
            held: HashSet::new(),
            inspecting: false,
            mapping: Mapping::none(),
        };
        player.register(instrument);
        player
    }

    pub fn octave(&self) -> i32 {
        self.octave.get()
    }

    pub fn instrument(&self) -> Option<&Instrument> {
        self.instrument.as_ref()
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn is_inspecting(&self) -> bool {
        self.inspecting
    }

    /// Last inspected key mapping
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn loads_in_flight(&self) -> usize {
        self.loader.in_flight()
    }

    pub fn key_down(&mut self, code: &str, shift: bool) -> Vec<PlayerEvent> {
        self.key_down_at(code, shift, Instant::now())
    }

    /// Runs every key handler for `code`, as pressed at `now`
    pub fn key_down_at(&mut self, code: &str, shift: bool, now: Instant) -> Vec<PlayerEvent> {
        if code == TOGGLE_INSPECT {
            self.inspecting = !self.inspecting;
            return vec![PlayerEvent::InspectToggled(self.inspecting)];
        }
        if self.inspecting {
            self.mapping = hover::resolve(code, self.octave.get());
            return vec![PlayerEvent::Inspected(self.mapping.clone())];
        }

        let mut events = Vec::new();
        self.handle_note(code, shift, now, &mut events);
        self.handle_octave(code, &mut events);
        self.handle_control(code, &mut events);
        self.handle_instrument(code, &mut events);
        self.handle_recorder(code, now, &mut events);
        events
    }

    pub fn key_up(&mut self, code: &str) {
        self.held.remove(code);
    }

    /// Plays a note from an external MIDI device
    pub fn play_midi(&mut self, note: wmidi::Note, now: Instant) -> Option<PlayerEvent> {
        let instrument = match &self.instrument {
            Some(instrument) => instrument,
            None => {
                log::warn!("no instrument loaded yet, dropping MIDI note {:?}", note);
                return None;
            }
        };
        if instrument.single_note {
            instrument.stop();
        }
        instrument.play_midi(note);
        self.recorder.record(note, now);
        Some(PlayerEvent::NotePlayed(Note::from_midi(note)))
    }

    /// Installs finished instrument loads
    pub fn poll(&mut self) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        for loaded in self.loader.poll() {
            match (loaded.purpose, loaded.result) {
                (LoadPurpose::Register, Ok(instrument)) => {
                    log::info!("instrument ready: {}", instrument.name());
                    events.push(PlayerEvent::InstrumentLoaded(instrument.name()));
                    self.instrument = Some(instrument);
                }
                (LoadPurpose::Playback(notes), Ok(instrument)) => {
                    log::info!("playing back {} notes", notes.len());
                    events.push(PlayerEvent::PlaybackStarted(notes.len()));
                    instrument.schedule(0.0, notes);
                }
                (_, Err(err)) => {
                    log::error!("instrument load failed: {}", err);
                    events.push(PlayerEvent::InstrumentFailed(err.to_string()));
                }
            }
        }
        events
    }

    fn register(&mut self, descriptor: InstrumentDescriptor) {
        self.loader.load(descriptor, LoadPurpose::Register);
    }

    fn handle_note(
        &mut self,
        code: &str,
        shift: bool,
        now: Instant,
        events: &mut Vec<PlayerEvent>,
    ) {
        let mut note = match keymap::note_lookup(code, self.octave.get()) {
            Some(note) => note,
            None => return,
        };
        if !self.held.insert(code.to_string()) {
            return;
        }

        let instrument = match &self.instrument {
            Some(instrument) => instrument,
            None => {
                log::warn!("no instrument loaded yet, dropping {}", note);
                return;
            }
        };
        if shift {
            note = note.interval();
        }
        if instrument.single_note {
            instrument.stop();
        }
        match instrument.play(note) {
            Ok(midi) => {
                self.recorder.record(midi, now);
                events.push(PlayerEvent::NotePlayed(note));
            }
            Err(err) => log::warn!("cannot play {}: {}", note, err),
        }
    }

    fn handle_octave(&mut self, code: &str, events: &mut Vec<PlayerEvent>) {
        if let Some(command) = keymap::octave_lookup(code) {
            let octave = self.octave.apply(command);
            events.push(PlayerEvent::OctaveChanged(octave));
        }
    }

    fn handle_control(&mut self, code: &str, events: &mut Vec<PlayerEvent>) {
        match code {
            TOGGLE_SINGLE_NOTE => {
                if let Some(instrument) = self.instrument.as_mut() {
                    instrument.single_note = !instrument.single_note;
                    events.push(PlayerEvent::SingleNoteToggled(instrument.single_note));
                }
            }
            STOP => {
                if let Some(instrument) = &self.instrument {
                    instrument.stop();
                    events.push(PlayerEvent::Stopped);
                }
            }
            PLAY_RECORDING => {
                let notes = self.recorder.events();
                if notes.is_empty() {
                    log::info!("nothing recorded");
                    return;
                }
                events.push(PlayerEvent::PlaybackRequested(notes.len()));
                self.loader
                    .load(self.recorder.instrument(), LoadPurpose::Playback(notes));
            }
            _ => {}
        }
    }

    fn handle_instrument(&mut self, code: &str, events: &mut Vec<PlayerEvent>) {
        if let Some(descriptor) = keymap::instrument_lookup(code) {
            events.push(PlayerEvent::InstrumentRequested(descriptor.name));
            self.register(*descriptor);
        }
    }

    fn handle_recorder(&mut self, code: &str, now: Instant, events: &mut Vec<PlayerEvent>) {
        if code != TOGGLE_RECORDING {
            return;
        }
        if self.recorder.is_recording() {
            self.recorder.stop();
            events.push(PlayerEvent::RecordingStopped(self.recorder.notes().len()));
        } else {
            let current = self
                .instrument
                .as_ref()
                .and_then(|i| InstrumentDescriptor::by_name(i.name()))
                .unwrap_or(crate::instrument::DEFAULT_INSTRUMENT);
            self.recorder.start(now, current);
            events.push(PlayerEvent::RecordingStarted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hover::MappingKind;
    use crate::instrument::DEFAULT_INSTRUMENT;
    use std::sync::mpsc::{channel, Receiver};
    use std::time::Duration;

    fn settle(player: &mut Player) -> Vec<PlayerEvent> {
        let start = Instant::now();
        let mut events = Vec::new();
        while player.loads_in_flight() > 0 && start.elapsed() < Duration::from_secs(5) {
            events.extend(player.poll());
            std::thread::sleep(Duration::from_millis(2));
        }
        events
    }

    fn ready_player() -> (Player, Receiver<SynthCommand>) {
        let (tx, rx) = channel();
        let mut player = Player::new(tx, 4, DEFAULT_INSTRUMENT);
        settle(&mut player);
        assert!(player.instrument().is_some());
        (player, rx)
    }

    /// MIDI numbers of played notes, plus `None` for each stop
    fn commands(rx: &Receiver<SynthCommand>) -> Vec<Option<u8>> {
        rx.try_iter()
            .filter_map(|c| match c {
                SynthCommand::Play { note, .. } => Some(Some(u8::from(note))),
                SynthCommand::Stop { .. } => Some(None),
                SynthCommand::Schedule { .. } => None,
            })
            .collect()
    }

    #[test]
    fn plays_mapped_note() {
        let (mut player, rx) = ready_player();
        let events = player.key_down("KeyE", false);
        assert_eq!(events, vec![PlayerEvent::NotePlayed("C4".parse().unwrap())]);
        assert_eq!(commands(&rx), vec![Some(60)]);
    }

    #[test]
    fn unmapped_key_does_nothing() {
        let (mut player, rx) = ready_player();
        assert!(player.key_down("KeyQ", false).is_empty());
        assert!(commands(&rx).is_empty());
    }

    #[test]
    fn held_key_does_not_retrigger() {
        let (mut player, rx) = ready_player();
        player.key_down("KeyH", false);
        player.key_down("KeyH", false);
        player.key_down("KeyH", false);
        assert_eq!(commands(&rx), vec![Some(69)]);

        player.key_up("KeyH");
        player.key_down("KeyH", false);
        assert_eq!(commands(&rx), vec![Some(69)]);
    }

    #[test]
    fn shift_raises_half_step() {
        let (mut player, rx) = ready_player();
        player.key_down("KeyU", true);
        assert_eq!(commands(&rx), vec![Some(72)]);
    }

    #[test]
    fn octave_keys_move_the_keyboard() {
        let (mut player, rx) = ready_player();
        for _ in 0..5 {
            player.key_down("ArrowRight", false);
        }
        assert_eq!(player.octave(), 7);
        player.key_down("KeyE", false);

        let events = player.key_down("Numpad6", false);
        assert_eq!(events, vec![PlayerEvent::OctaveChanged(1)]);
        player.key_down("KeyW", false);
        assert_eq!(commands(&rx), vec![Some(96), Some(21)]);
    }

    #[test]
    fn notes_before_first_load_are_dropped() {
        let (tx, rx) = channel();
        let mut player = Player::new(tx, 4, DEFAULT_INSTRUMENT);
        assert!(player.key_down("KeyE", false).is_empty());
        assert!(commands(&rx).is_empty());
        settle(&mut player);
    }

    #[test]
    fn single_note_instrument_stops_before_playing() {
        let (mut player, rx) = ready_player();
        let events = player.key_down("Digit2", false);
        assert_eq!(events, vec![PlayerEvent::InstrumentRequested("bassoon")]);
        let events = settle(&mut player);
        assert_eq!(events, vec![PlayerEvent::InstrumentLoaded("bassoon")]);

        player.key_down("KeyE", false);
        assert_eq!(commands(&rx), vec![None, Some(60)]);

        let events = player.key_down(TOGGLE_SINGLE_NOTE, false);
        assert_eq!(events, vec![PlayerEvent::SingleNoteToggled(false)]);
        player.key_down("KeyD", false);
        assert_eq!(commands(&rx), vec![Some(61)]);
    }

    #[test]
    fn failed_load_keeps_current_instrument() {
        let (mut player, rx) = ready_player();
        player.register(InstrumentDescriptor::new("kazoo", false));
        let events = settle(&mut player);
        assert!(matches!(&events[..], [PlayerEvent::InstrumentFailed(_)]));
        assert_eq!(player.instrument().unwrap().name(), "acoustic_grand_piano");

        player.key_down("KeyE", false);
        assert_eq!(commands(&rx), vec![Some(60)]);
    }

    #[test]
    fn midi_before_first_load_is_dropped() {
        let (tx, rx) = channel();
        let mut player = Player::new(tx, 4, DEFAULT_INSTRUMENT);
        assert_eq!(player.play_midi(wmidi::Note::C4, Instant::now()), None);
        assert!(commands(&rx).is_empty());
        settle(&mut player);
    }

    #[test]
    fn space_stops_current_instrument() {
        let (mut player, rx) = ready_player();
        assert_eq!(player.key_down(STOP, false), vec![PlayerEvent::Stopped]);
        assert_eq!(commands(&rx), vec![None]);
    }

    #[test]
    fn records_and_plays_back() {
        let (mut player, rx) = ready_player();
        let start = Instant::now();
        player.key_down_at(TOGGLE_RECORDING, false, start);
        player.key_down_at("KeyE", false, start + Duration::from_millis(100));
        player.key_down_at("KeyH", false, start + Duration::from_millis(600));
        let events = player.key_down_at(TOGGLE_RECORDING, false, start + Duration::from_secs(1));
        assert_eq!(events, vec![PlayerEvent::RecordingStopped(2)]);

        let recorded: Vec<u8> = player
            .recorder()
            .notes()
            .iter()
            .map(|r| u8::from(r.note))
            .collect();
        assert_eq!(recorded, vec![60, 69]);
        commands(&rx);

        let events = player.key_down(PLAY_RECORDING, false);
        assert_eq!(events, vec![PlayerEvent::PlaybackRequested(2)]);
        let events = settle(&mut player);
        assert_eq!(events, vec![PlayerEvent::PlaybackStarted(2)]);

        match rx.try_recv().unwrap() {
            SynthCommand::Schedule {
                instrument, events, ..
            } => {
                assert_ne!(instrument, player.instrument().unwrap().id());
                assert_eq!(events.len(), 2);
                assert!((events[0].time - 0.1).abs() < 1e-9);
                assert!((events[1].time - 0.6).abs() < 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_recording_is_not_played() {
        let (mut player, _rx) = ready_player();
        assert!(player.key_down(PLAY_RECORDING, false).is_empty());
        assert_eq!(player.loads_in_flight(), 0);
    }

    #[test]
    fn inspect_mode_describes_instead_of_playing() {
        let (mut player, rx) = ready_player();
        player.key_down(TOGGLE_INSPECT, false);
        assert!(player.is_inspecting());

        let events = player.key_down("KeyE", false);
        match &events[..] {
            [PlayerEvent::Inspected(mapping)] => {
                assert_eq!(mapping.kind, MappingKind::Note);
                assert_eq!(mapping.value, "C4");
            }
            other => panic!("unexpected {:?}", other),
        }
        player.key_down("Digit5", false);
        assert_eq!(player.mapping().to_string(), "INSTRUMENT whistle");
        assert_eq!(player.loads_in_flight(), 0);
        assert!(commands(&rx).is_empty());

        player.key_down(TOGGLE_INSPECT, false);
        assert!(!player.is_inspecting());
    }

    #[test]
    fn midi_input_is_played_and_recorded() {
        let (mut player, rx) = ready_player();
        let now = Instant::now();
        player.key_down_at(TOGGLE_RECORDING, false, now);
        let event = player.play_midi(wmidi::Note::G4, now);
        assert_eq!(event, Some(PlayerEvent::NotePlayed("G4".parse().unwrap())));
        assert_eq!(commands(&rx), vec![Some(67)]);
        assert_eq!(player.recorder().notes().len(), 1);
    }
}
