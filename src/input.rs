//! Terminal key events to physical key codes

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInput {
    Down { code: String, shift: bool },
    Up { code: String },
}

/// Shifted digits on a US layout, indexed by digit
const SHIFTED_DIGITS: [char; 10] = [')', '!', '@', '#', '$', '%', '^', '&', '*', '('];

/// The physical key code for `event`, if it has one
pub fn key_code(event: &KeyEvent) -> Option<String> {
    let keypad = event.state.contains(KeyEventState::KEYPAD);
    let code = match event.code {
        KeyCode::Char(c) if keypad && c.is_ascii_digit() => format!("Numpad{}", c),
        KeyCode::Char('.') | KeyCode::Char(',') if keypad => "NumpadDecimal".to_string(),
        // Terminals without keypad reporting send a plain '.'
        KeyCode::Char('.') => "NumpadDecimal".to_string(),
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) if c.is_ascii_alphabetic() => format!("Key{}", c.to_ascii_uppercase()),
        KeyCode::Char(c) if c.is_ascii_digit() => format!("Digit{}", c),
        KeyCode::Char(c) => {
            let digit = SHIFTED_DIGITS.iter().position(|&s| s == c)?;
            format!("Digit{}", digit)
        }
        KeyCode::Enter => "NumpadEnter".to_string(),
        KeyCode::Left => "ArrowLeft".to_string(),
        KeyCode::Right => "ArrowRight".to_string(),
        KeyCode::Up => "ArrowUp".to_string(),
        KeyCode::Down => "ArrowDown".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        _ => return None,
    };
    Some(code)
}

fn is_shifted(event: &KeyEvent) -> bool {
    event.modifiers.contains(KeyModifiers::SHIFT)
        || matches!(event.code, KeyCode::Char(c) if c.is_ascii_uppercase())
}

/// Translates one terminal event.
///
/// With `release_events` (keyboard enhancement active) presses and releases
/// map one to one and auto-repeats are dropped. Without it every press is
/// reported as a down followed by an up.
pub fn translate(event: &KeyEvent, release_events: bool) -> Vec<KeyInput> {
    let code = match key_code(event) {
        Some(code) => code,
        None => return Vec::new(),
    };

    match (event.kind, release_events) {
        (KeyEventKind::Press, true) => vec![KeyInput::Down {
            code,
            shift: is_shifted(event),
        }],
        (KeyEventKind::Release, true) => vec![KeyInput::Up { code }],
        (KeyEventKind::Repeat, true) => Vec::new(),
        (KeyEventKind::Press, false) | (KeyEventKind::Repeat, false) => vec![
            KeyInput::Down {
                code: code.clone(),
                shift: is_shifted(event),
            },
            KeyInput::Up { code },
        ],
        (KeyEventKind::Release, false) => Vec::new(),
    }
}

/// Esc or Ctrl-C
pub fn is_quit(event: &KeyEvent) -> bool {
    let ctrl_c =
        event.code == KeyCode::Char('c') && event.modifiers.contains(KeyModifiers::CONTROL);
    event.kind != KeyEventKind::Release && (event.code == KeyCode::Esc || ctrl_c)
}
