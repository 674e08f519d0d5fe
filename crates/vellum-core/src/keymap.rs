//! Keyboard shortcuts.
//!
//! ## Learning: Parsing Into Types
//!
//! Shortcuts are contributed as strings (`"ctrl+shift+z"`) because that is
//! what plugin authors and config files write. They are parsed once into
//! [`KeyPress`] values, which hash and compare structurally, so a lookup
//! does not care how the binding was spelled (`Ctrl+Z` or `control+z`).

use std::collections::HashMap;

use serde_json::Value;

use crate::resources::SHORTCUTS;
use crate::state::EditorState;

/// Keyboard modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool, // Cmd on macOS, Win on Windows
}

impl Modifiers {
    /// No modifiers pressed.
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    /// Ctrl modifier.
    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        alt: false,
        shift: false,
        meta: false,
    };

    /// Ctrl+Shift.
    pub const CTRL_SHIFT: Modifiers = Modifiers {
        ctrl: true,
        alt: false,
        shift: true,
        meta: false,
    };

    /// Returns true if no modifiers are pressed.
    pub fn is_empty(&self) -> bool {
        !self.ctrl && !self.alt && !self.shift && !self.meta
    }

    /// Sets the modifier named by `token`. Returns false for unknown names.
    fn set(&mut self, token: &str) -> bool {
        match token {
            "ctrl" | "control" => self.ctrl = true,
            "alt" | "option" => self.alt = true,
            "shift" => self.shift = true,
            "meta" | "cmd" | "win" | "super" => self.meta = true,
            _ => return false,
        }
        true
    }
}

impl std::fmt::Display for Modifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("ctrl");
        }
        if self.alt {
            parts.push("alt");
        }
        if self.shift {
            parts.push("shift");
        }
        if self.meta {
            parts.push("meta");
        }
        write!(f, "{}", parts.join("+"))
    }
}

/// A key code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Delete,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    F(u8), // F1-F12
    Space,
}

impl Key {
    /// Parses a key from a string. Letters are case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.to_lowercase();
        match lower.as_str() {
            "enter" | "return" => Some(Key::Enter),
            "tab" => Some(Key::Tab),
            "backspace" => Some(Key::Backspace),
            "delete" | "del" => Some(Key::Delete),
            "escape" | "esc" => Some(Key::Escape),
            "up" | "arrowup" => Some(Key::Up),
            "down" | "arrowdown" => Some(Key::Down),
            "left" | "arrowleft" => Some(Key::Left),
            "right" | "arrowright" => Some(Key::Right),
            "home" => Some(Key::Home),
            "end" => Some(Key::End),
            "space" => Some(Key::Space),
            _ if lower.starts_with('f') && (2..=3).contains(&lower.len()) => {
                lower[1..].parse().ok().filter(|n| (1..=12).contains(n)).map(Key::F)
            }
            _ => {
                let mut chars = lower.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Key::Char(c)),
                    _ => None,
                }
            }
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{}", c),
            Key::Enter => write!(f, "enter"),
            Key::Tab => write!(f, "tab"),
            Key::Backspace => write!(f, "backspace"),
            Key::Delete => write!(f, "delete"),
            Key::Escape => write!(f, "escape"),
            Key::Up => write!(f, "up"),
            Key::Down => write!(f, "down"),
            Key::Left => write!(f, "left"),
            Key::Right => write!(f, "right"),
            Key::Home => write!(f, "home"),
            Key::End => write!(f, "end"),
            Key::F(n) => write!(f, "f{}", n),
            Key::Space => write!(f, "space"),
        }
    }
}

/// A key press event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPress {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyPress {
    /// Creates a new key press.
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// Parses a hotkey string like "ctrl+shift+z".
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        let (mods, key) = match lower.rsplit_once('+') {
            // "ctrl++" binds the plus key
            Some((mods, "")) => (mods.strip_suffix('+')?, "+"),
            Some(split) => split,
            None => ("", lower.as_str()),
        };

        let mut modifiers = Modifiers::NONE;
        for token in mods.split('+').filter(|t| !t.is_empty()) {
            if !modifiers.set(token.trim()) {
                return None;
            }
        }
        Some(Self {
            key: Key::parse(key.trim())?,
            modifiers,
        })
    }
}

impl std::fmt::Display for KeyPress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}+{}", self.modifiers, self.key)
        }
    }
}

/// A command bound to a key press.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub command_id: String,
    pub params: Value,
}

/// Key presses resolved to commands.
#[derive(Debug, Default)]
pub struct Keymap {
    bindings: HashMap<KeyPress, Binding>,
}

impl Keymap {
    /// Creates an empty keymap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the keymap of an editor.
    ///
    /// Contributed shortcuts come first, in registry order; the first
    /// contribution for a key wins. `keyboard.bindings` from the config
    /// then overrides them. With `keyboard.shortcuts = false` only the
    /// config bindings are used.
    pub fn from_state(state: &EditorState) -> Self {
        let mut keymap = Self::new();
        let keyboard = &state.config().keyboard;

        if keyboard.shortcuts {
            for shortcut in state.resource(SHORTCUTS) {
                let Some(press) = KeyPress::parse(&shortcut.hotkey) else {
                    tracing::warn!(hotkey = %shortcut.hotkey, "ignoring unparsable shortcut");
                    continue;
                };
                keymap.bindings.entry(press).or_insert(Binding {
                    command_id: shortcut.command_id,
                    params: shortcut.params,
                });
            }
        }

        for (hotkey, command_id) in &keyboard.bindings {
            match KeyPress::parse(hotkey) {
                Some(press) => keymap.bind(press, command_id.clone(), Value::Null),
                None => tracing::warn!(%hotkey, "ignoring unparsable key binding in config"),
            }
        }
        keymap
    }

    /// Binds `press`, replacing any existing binding.
    pub fn bind(&mut self, press: KeyPress, command_id: String, params: Value) {
        self.bindings.insert(press, Binding { command_id, params });
    }

    /// The binding for `press`, if any.
    pub fn lookup(&self, press: &KeyPress) -> Option<&Binding> {
        self.bindings.get(press)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// All bindings as `(hotkey, command)` pairs, sorted by hotkey.
    pub fn describe(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .bindings
            .iter()
            .map(|(press, binding)| (press.to_string(), binding.command_id.clone()))
            .collect();
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::registry::Resources;
    use crate::resources::Shortcut;
    use std::rc::Rc;
    use vellum_dom::Document;

    #[test]
    fn test_keypress_parse() {
        let kp = KeyPress::parse("Ctrl+Shift+Z").unwrap();
        assert_eq!(kp.key, Key::Char('z'));
        assert_eq!(kp.modifiers, Modifiers::CTRL_SHIFT);
        assert_eq!(kp.to_string(), "ctrl+shift+z");

        assert_eq!(
            KeyPress::parse("ctrl++"),
            Some(KeyPress::new(Key::Char('+'), Modifiers::CTRL))
        );
        assert_eq!(KeyPress::parse("f5").map(|k| k.key), Some(Key::F(5)));
        assert!(KeyPress::parse("hyper+z").is_none());
        assert!(KeyPress::parse("ctrl+zz").is_none());
    }

    fn state(config: Config) -> EditorState {
        let mut state = EditorState::new(Document::new(), Rc::new(config));
        state.resources_mut().register(
            "history",
            Resources::new().extend(
                SHORTCUTS,
                [Shortcut::new("ctrl+z", "undo"), Shortcut::new("ctrl+y", "redo")],
            ),
        );
        state.resources_mut().register(
            "late",
            Resources::new().add(SHORTCUTS, Shortcut::new("ctrl+z", "something_else")),
        );
        state
    }

    #[test]
    fn test_first_contribution_wins() {
        let keymap = Keymap::from_state(&state(Config::default()));
        let press = KeyPress::new(Key::Char('z'), Modifiers::CTRL);
        assert_eq!(keymap.lookup(&press).unwrap().command_id, "undo");
        assert_eq!(keymap.len(), 2);
    }

    #[test]
    fn test_config_overrides_and_disables() {
        let mut config = Config::default();
        config
            .keyboard
            .bindings
            .insert("ctrl+y".to_string(), "align_center".to_string());
        let keymap = Keymap::from_state(&state(config.clone()));
        let press = KeyPress::parse("ctrl+y").unwrap();
        assert_eq!(keymap.lookup(&press).unwrap().command_id, "align_center");

        config.keyboard.shortcuts = false;
        let keymap = Keymap::from_state(&state(config));
        assert_eq!(keymap.describe(), vec![("ctrl+y".to_string(), "align_center".to_string())]);
    }
}
