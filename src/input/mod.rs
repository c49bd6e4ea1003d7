//! Keyboard routing.
//!
//! Keys normally pass straight through to the focused session. `Ctrl-a`
//! arms the prefix; the next key is interpreted as a workspace command.
//! Renaming a session opens a small inline prompt that captures keys until
//! Enter or Esc.

use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// How long an armed prefix waits for its command key.
pub const PREFIX_TIMEOUT_MS: u64 = 2000;

/// Workspace commands reachable through the prefix key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Split the focused panel side by side
    SplitHorizontal,
    /// Split the focused panel top/bottom
    SplitVertical,
    NewTab,
    CloseTab,
    NextTab,
    PrevTab,
    FocusNext,
    ToggleShared,
    Rename,
    ToggleAutoCopy,
    Quit,
    /// Send a literal prefix byte to the session
    SendPrefix,
}

impl Command {
    /// Map the key following the prefix to a command.
    pub fn from_key(key: KeyEvent) -> Option<Self> {
        if is_prefix(key) {
            return Some(Command::SendPrefix);
        }
        let KeyCode::Char(c) = key.code else {
            return None;
        };
        Some(match c {
            '|' | '%' => Command::SplitHorizontal,
            '-' | '"' => Command::SplitVertical,
            'c' => Command::NewTab,
            'x' => Command::CloseTab,
            'n' => Command::NextTab,
            'p' => Command::PrevTab,
            'o' => Command::FocusNext,
            's' => Command::ToggleShared,
            'r' => Command::Rename,
            'y' => Command::ToggleAutoCopy,
            'q' => Command::Quit,
            _ => return None,
        })
    }

    /// Short label for the status line.
    pub fn label(self) -> &'static str {
        match self {
            Command::SplitHorizontal => "split |",
            Command::SplitVertical => "split -",
            Command::NewTab => "new tab",
            Command::CloseTab => "close tab",
            Command::NextTab => "next tab",
            Command::PrevTab => "prev tab",
            Command::FocusNext => "next panel",
            Command::ToggleShared => "pin",
            Command::Rename => "rename",
            Command::ToggleAutoCopy => "auto-copy",
            Command::Quit => "quit",
            Command::SendPrefix => "send C-a",
        }
    }
}

/// Keybinding hints shown while the prefix is armed.
pub const HINTS: &[(char, Command)] = &[
    ('|', Command::SplitHorizontal),
    ('-', Command::SplitVertical),
    ('c', Command::NewTab),
    ('x', Command::CloseTab),
    ('n', Command::NextTab),
    ('p', Command::PrevTab),
    ('o', Command::FocusNext),
    ('s', Command::ToggleShared),
    ('r', Command::Rename),
    ('y', Command::ToggleAutoCopy),
    ('q', Command::Quit),
];

/// Input modes of the key router.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InputMode {
    /// Keys go to the focused session
    #[default]
    Passthrough,
    /// Prefix pressed, waiting for a command key
    Prefix { started_at: Instant },
    /// Editing a new session title
    Rename { buffer: String },
}

impl InputMode {
    /// Returns the display name for the status line
    pub fn display_name(&self) -> &'static str {
        match self {
            InputMode::Passthrough => "TERM",
            InputMode::Prefix { .. } => "PREFIX",
            InputMode::Rename { .. } => "RENAME",
        }
    }
}

/// What the application should do with a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Send these bytes to the focused session
    Forward(Vec<u8>),
    /// Run a workspace command
    Command(Command),
    /// Apply a new title to the focused session
    Rename(String),
    /// Nothing to do
    Consumed,
}

#[derive(Debug, Default)]
pub struct KeyRouter {
    mode: InputMode,
}

impl KeyRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &InputMode {
        &self.mode
    }

    /// Start editing a title, pre-filled with `current`.
    pub fn begin_rename(&mut self, current: &str) {
        self.mode = InputMode::Rename {
            buffer: current.to_string(),
        };
    }

    /// Drop an armed prefix that has waited too long.
    pub fn check_timeout(&mut self) -> bool {
        if let InputMode::Prefix { started_at } = self.mode {
            if started_at.elapsed().as_millis() as u64 > PREFIX_TIMEOUT_MS {
                self.mode = InputMode::Passthrough;
                return true;
            }
        }
        false
    }

    pub fn handle(&mut self, key: KeyEvent) -> KeyOutcome {
        match &mut self.mode {
            InputMode::Passthrough => {
                if is_prefix(key) {
                    self.mode = InputMode::Prefix {
                        started_at: Instant::now(),
                    };
                    return KeyOutcome::Consumed;
                }
                let bytes = key_to_bytes(key);
                if bytes.is_empty() {
                    KeyOutcome::Consumed
                } else {
                    KeyOutcome::Forward(bytes)
                }
            }
            InputMode::Prefix { .. } => {
                self.mode = InputMode::Passthrough;
                match Command::from_key(key) {
                    Some(Command::SendPrefix) => KeyOutcome::Forward(vec![PREFIX_BYTE]),
                    Some(command) => KeyOutcome::Command(command),
                    None => KeyOutcome::Consumed,
                }
            }
            InputMode::Rename { buffer } => match key.code {
                KeyCode::Enter => {
                    let title = buffer.trim().to_string();
                    self.mode = InputMode::Passthrough;
                    if title.is_empty() {
                        KeyOutcome::Consumed
                    } else {
                        KeyOutcome::Rename(title)
                    }
                }
                KeyCode::Esc => {
                    self.mode = InputMode::Passthrough;
                    KeyOutcome::Consumed
                }
                KeyCode::Backspace => {
                    buffer.pop();
                    KeyOutcome::Consumed
                }
                KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    buffer.push(c);
                    KeyOutcome::Consumed
                }
                _ => KeyOutcome::Consumed,
            },
        }
    }
}

const PREFIX_BYTE: u8 = 0x01;

pub fn is_prefix(key: KeyEvent) -> bool {
    key.code == KeyCode::Char('a') && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Encode a key as the bytes a terminal would send for it.
pub fn key_to_bytes(key: KeyEvent) -> Vec<u8> {
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let mut bytes = match (key.code, key.modifiers.difference(KeyModifiers::ALT)) {
        (KeyCode::Char(c), m) if m.contains(KeyModifiers::CONTROL) => {
            // Control characters: Ctrl+A = 0x01, Ctrl+B = 0x02, etc.
            match c.to_ascii_lowercase() {
                c @ 'a'..='z' => vec![(c as u8) - b'a' + 1],
                ' ' | '@' | '2' => vec![0x00],
                '[' | '3' => vec![0x1b],
                '\\' | '4' => vec![0x1c],
                ']' | '5' => vec![0x1d],
                _ => vec![],
            }
        }
        (KeyCode::Char(c), _) => c.to_string().into_bytes(),
        (KeyCode::Enter, _) => vec![b'\r'],
        (KeyCode::Backspace, _) => vec![0x7f],
        (KeyCode::Tab, _) => vec![b'\t'],
        (KeyCode::BackTab, _) => vec![0x1b, b'[', b'Z'],
        (KeyCode::Esc, _) => vec![0x1b],
        (KeyCode::Up, _) => vec![0x1b, b'[', b'A'],
        (KeyCode::Down, _) => vec![0x1b, b'[', b'B'],
        (KeyCode::Right, _) => vec![0x1b, b'[', b'C'],
        (KeyCode::Left, _) => vec![0x1b, b'[', b'D'],
        (KeyCode::Home, _) => vec![0x1b, b'[', b'H'],
        (KeyCode::End, _) => vec![0x1b, b'[', b'F'],
        (KeyCode::PageUp, _) => vec![0x1b, b'[', b'5', b'~'],
        (KeyCode::PageDown, _) => vec![0x1b, b'[', b'6', b'~'],
        (KeyCode::Delete, _) => vec![0x1b, b'[', b'3', b'~'],
        (KeyCode::Insert, _) => vec![0x1b, b'[', b'2', b'~'],
        _ => vec![],
    };
    if alt && !bytes.is_empty() {
        bytes.insert(0, 0x1b);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn plain_keys_pass_through() {
        let mut router = KeyRouter::new();
        assert_eq!(
            router.handle(key(KeyCode::Char('l'))),
            KeyOutcome::Forward(b"l".to_vec())
        );
        assert_eq!(
            router.handle(key(KeyCode::Enter)),
            KeyOutcome::Forward(b"\r".to_vec())
        );
        assert_eq!(router.mode(), &InputMode::Passthrough);
    }

    #[test]
    fn prefix_then_command() {
        let mut router = KeyRouter::new();
        assert_eq!(router.handle(ctrl('a')), KeyOutcome::Consumed);
        assert_eq!(router.mode().display_name(), "PREFIX");
        assert_eq!(
            router.handle(key(KeyCode::Char('|'))),
            KeyOutcome::Command(Command::SplitHorizontal)
        );
        assert_eq!(router.mode(), &InputMode::Passthrough);

        router.handle(ctrl('a'));
        assert_eq!(
            router.handle(key(KeyCode::Char('-'))),
            KeyOutcome::Command(Command::SplitVertical)
        );
    }

    #[test]
    fn double_prefix_sends_literal_ctrl_a() {
        let mut router = KeyRouter::new();
        router.handle(ctrl('a'));
        assert_eq!(router.handle(ctrl('a')), KeyOutcome::Forward(vec![0x01]));
    }

    #[test]
    fn unknown_command_key_is_swallowed() {
        let mut router = KeyRouter::new();
        router.handle(ctrl('a'));
        assert_eq!(router.handle(key(KeyCode::Char('z'))), KeyOutcome::Consumed);
        assert_eq!(router.mode(), &InputMode::Passthrough);
    }

    #[test]
    fn rename_prompt_edits_and_commits() {
        let mut router = KeyRouter::new();
        router.begin_rename("Untitled");
        for _ in 0.."Untitled".len() {
            router.handle(key(KeyCode::Backspace));
        }
        for c in "Build".chars() {
            router.handle(key(KeyCode::Char(c)));
        }
        assert_eq!(
            router.handle(key(KeyCode::Enter)),
            KeyOutcome::Rename("Build".to_string())
        );
        assert_eq!(router.mode(), &InputMode::Passthrough);
    }

    #[test]
    fn rename_prompt_cancels_on_esc() {
        let mut router = KeyRouter::new();
        router.begin_rename("x");
        assert_eq!(router.handle(key(KeyCode::Esc)), KeyOutcome::Consumed);
        assert_eq!(router.mode(), &InputMode::Passthrough);
    }

    #[test]
    fn key_encoding() {
        assert_eq!(key_to_bytes(ctrl('c')), vec![0x03]);
        assert_eq!(key_to_bytes(key(KeyCode::Up)), b"\x1b[A".to_vec());
        assert_eq!(key_to_bytes(key(KeyCode::Char('é'))), "é".as_bytes().to_vec());
        assert_eq!(
            key_to_bytes(KeyEvent::new(KeyCode::Char('b'), KeyModifiers::ALT)),
            b"\x1bb".to_vec()
        );
        assert_eq!(
            key_to_bytes(KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT)),
            b"A".to_vec()
        );
        assert!(key_to_bytes(key(KeyCode::F(5))).is_empty());
    }

    #[test]
    fn every_hint_maps_to_its_command() {
        for (c, command) in HINTS {
            assert_eq!(Command::from_key(key(KeyCode::Char(*c))), Some(*command));
        }
    }
}
