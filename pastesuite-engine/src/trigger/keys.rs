//! Key model
//!
//! Platform-neutral keys and key events, plus parsing of hotkey and chord
//! strings. Left/right variants of a modifier collapse into one
//! [`Modifier`]; characters are stored lower-cased.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    Ctrl,
    Shift,
    Alt,
    Meta,
}

impl Modifier {
    pub const ALL: [Modifier; 4] = [Modifier::Ctrl, Modifier::Shift, Modifier::Alt, Modifier::Meta];

    fn bit(self) -> u8 {
        match self {
            Modifier::Ctrl => 1,
            Modifier::Shift => 2,
            Modifier::Alt => 4,
            Modifier::Meta => 8,
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Modifier::Ctrl => "Ctrl",
            Modifier::Shift => "Shift",
            Modifier::Alt => "Alt",
            Modifier::Meta => "Meta",
        };
        f.write_str(name)
    }
}

/// Set of modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(u8);

impl Modifiers {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, modifier: Modifier) {
        self.0 |= modifier.bit();
    }

    pub fn remove(&mut self, modifier: Modifier) {
        self.0 &= !modifier.bit();
    }

    pub fn contains(&self, modifier: Modifier) -> bool {
        self.0 & modifier.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = Modifier> + '_ {
        Modifier::ALL.into_iter().filter(|m| self.contains(*m))
    }
}

impl FromIterator<Modifier> for Modifiers {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        let mut set = Self::empty();
        for modifier in iter {
            set.insert(modifier);
        }
        set
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Enter,
    Escape,
    Tab,
    Space,
    Backspace,
    Delete,
    Insert,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    /// Function key `F1`..=`F24`
    F(u8),
}

impl NamedKey {
    fn parse(name: &str) -> Option<Self> {
        let key = match name {
            "enter" | "return" => NamedKey::Enter,
            "esc" | "escape" => NamedKey::Escape,
            "tab" => NamedKey::Tab,
            "space" => NamedKey::Space,
            "backspace" => NamedKey::Backspace,
            "delete" | "del" => NamedKey::Delete,
            "insert" | "ins" => NamedKey::Insert,
            "up" => NamedKey::Up,
            "down" => NamedKey::Down,
            "left" => NamedKey::Left,
            "right" => NamedKey::Right,
            "home" => NamedKey::Home,
            "end" => NamedKey::End,
            "pageup" | "page_up" | "pgup" => NamedKey::PageUp,
            "pagedown" | "page_down" | "pgdn" => NamedKey::PageDown,
            other => {
                let n: u8 = other.strip_prefix('f')?.parse().ok()?;
                if !(1..=24).contains(&n) {
                    return None;
                }
                NamedKey::F(n)
            }
        };
        Some(key)
    }
}

impl fmt::Display for NamedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamedKey::Enter => f.write_str("Enter"),
            NamedKey::Escape => f.write_str("Esc"),
            NamedKey::Tab => f.write_str("Tab"),
            NamedKey::Space => f.write_str("Space"),
            NamedKey::Backspace => f.write_str("Backspace"),
            NamedKey::Delete => f.write_str("Delete"),
            NamedKey::Insert => f.write_str("Insert"),
            NamedKey::Up => f.write_str("Up"),
            NamedKey::Down => f.write_str("Down"),
            NamedKey::Left => f.write_str("Left"),
            NamedKey::Right => f.write_str("Right"),
            NamedKey::Home => f.write_str("Home"),
            NamedKey::End => f.write_str("End"),
            NamedKey::PageUp => f.write_str("PageUp"),
            NamedKey::PageDown => f.write_str("PageDown"),
            NamedKey::F(n) => write!(f, "F{}", n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Modifier(Modifier),
    /// Printable character, lower-cased
    Char(char),
    Named(NamedKey),
}

impl Key {
    pub fn char(c: char) -> Self {
        Key::Char(c.to_ascii_lowercase())
    }

    pub fn as_modifier(&self) -> Option<Modifier> {
        match self {
            Key::Modifier(m) => Some(*m),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    #[error("empty key name")]
    Empty,

    #[error("unknown key: {0}")]
    UnknownKey(String),

    #[error("hotkey {0:?} needs exactly one non-modifier key")]
    BadHotkey(String),

    #[error("chord {0:?} must look like Mod+K,K")]
    BadChord(String),
}

impl FromStr for Key {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        // angle-bracket form, e.g. `<ctrl>`
        let name = trimmed
            .strip_prefix('<')
            .and_then(|n| n.strip_suffix('>'))
            .unwrap_or(trimmed);
        if name.is_empty() {
            return Err(KeyParseError::Empty);
        }

        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(Key::char(c));
        }

        let lower = name.to_ascii_lowercase();
        let modifier = match lower.as_str() {
            "ctrl" | "control" | "ctrl_l" | "ctrl_r" => Some(Modifier::Ctrl),
            "shift" | "shift_l" | "shift_r" => Some(Modifier::Shift),
            "alt" | "alt_l" | "alt_r" | "alt_gr" | "option" => Some(Modifier::Alt),
            "meta" | "cmd" | "cmd_l" | "cmd_r" | "super" | "win" => Some(Modifier::Meta),
            _ => None,
        };
        if let Some(modifier) = modifier {
            return Ok(Key::Modifier(modifier));
        }

        NamedKey::parse(&lower)
            .map(Key::Named)
            .ok_or_else(|| KeyParseError::UnknownKey(name.to_string()))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Modifier(m) => m.fmt(f),
            Key::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
            Key::Named(n) => n.fmt(f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Release,
}

/// One raw event from the input hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub action: KeyAction,
    /// When the hook observed the event
    pub at: Instant,
}

impl KeyEvent {
    pub fn press(key: Key) -> Self {
        Self::press_at(key, Instant::now())
    }

    pub fn release(key: Key) -> Self {
        Self::release_at(key, Instant::now())
    }

    pub fn press_at(key: Key, at: Instant) -> Self {
        Self {
            key,
            action: KeyAction::Press,
            at,
        }
    }

    pub fn release_at(key: Key, at: Instant) -> Self {
        Self {
            key,
            action: KeyAction::Release,
            at,
        }
    }

    pub fn is_press(&self) -> bool {
        self.action == KeyAction::Press
    }
}

/// Modifier set plus one non-modifier key, e.g. `Ctrl+Alt+T`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hotkey {
    pub modifiers: Modifiers,
    pub key: Key,
}

impl Hotkey {
    pub fn new(modifiers: Modifiers, key: Key) -> Self {
        Self { modifiers, key }
    }
}

impl FromStr for Hotkey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut modifiers = Modifiers::empty();
        let mut key = None;

        for part in s.split('+') {
            match part.parse::<Key>()? {
                Key::Modifier(m) => modifiers.insert(m),
                other if key.is_none() => key = Some(other),
                _ => return Err(KeyParseError::BadHotkey(s.to_string())),
            }
        }

        let key = key.ok_or_else(|| KeyParseError::BadHotkey(s.to_string()))?;
        Ok(Self { modifiers, key })
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in self.modifiers.iter() {
            write!(f, "{}+", modifier)?;
        }
        write!(f, "{}", self.key)
    }
}

/// Two-step chord: hold `modifier`, press `key` twice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordSpec {
    pub modifier: Modifier,
    pub key: Key,
}

impl Default for ChordSpec {
    /// `Ctrl+V,V`
    fn default() -> Self {
        Self {
            modifier: Modifier::Ctrl,
            key: Key::Char('v'),
        }
    }
}

impl FromStr for ChordSpec {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || KeyParseError::BadChord(s.to_string());

        let (first, second) = s.split_once(',').ok_or_else(bad)?;
        let first: Hotkey = first.parse()?;
        let second: Key = second.parse()?;

        let mut modifiers = first.modifiers.iter();
        let modifier = match (modifiers.next(), modifiers.next()) {
            (Some(m), None) => m,
            _ => return Err(bad()),
        };
        if second != first.key {
            return Err(bad());
        }

        Ok(Self {
            modifier,
            key: first.key,
        })
    }
}

impl fmt::Display for ChordSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{},{}", self.modifier, self.key, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keys() {
        assert_eq!("V".parse::<Key>().unwrap(), Key::Char('v'));
        assert_eq!("<ctrl>".parse::<Key>().unwrap(), Key::Modifier(Modifier::Ctrl));
        assert_eq!("Ctrl_R".parse::<Key>().unwrap(), Key::Modifier(Modifier::Ctrl));
        assert_eq!("cmd".parse::<Key>().unwrap(), Key::Modifier(Modifier::Meta));
        assert_eq!("Esc".parse::<Key>().unwrap(), Key::Named(NamedKey::Escape));
        assert_eq!("f12".parse::<Key>().unwrap(), Key::Named(NamedKey::F(12)));
        assert!("f25".parse::<Key>().is_err());
        assert!("hyper".parse::<Key>().is_err());
        assert_eq!("".parse::<Key>(), Err(KeyParseError::Empty));
    }

    #[test]
    fn test_parse_hotkey_forms() {
        let plain: Hotkey = "Ctrl+Alt+H".parse().unwrap();
        let bracketed: Hotkey = "<ctrl>+<alt>+h".parse().unwrap();
        assert_eq!(plain, bracketed);
        assert!(plain.modifiers.contains(Modifier::Ctrl));
        assert!(plain.modifiers.contains(Modifier::Alt));
        assert!(!plain.modifiers.contains(Modifier::Shift));
        assert_eq!(plain.key, Key::Char('h'));
        assert_eq!(plain.to_string(), "Ctrl+Alt+H");
    }

    #[test]
    fn test_hotkey_needs_one_key() {
        assert!("Ctrl+Alt".parse::<Hotkey>().is_err());
        assert!("Ctrl+A+B".parse::<Hotkey>().is_err());
        assert!("Ctrl+".parse::<Hotkey>().is_err());
        assert_eq!("F5".parse::<Hotkey>().unwrap().modifiers, Modifiers::empty());
    }

    #[test]
    fn test_parse_chord() {
        let chord: ChordSpec = "Ctrl+V,V".parse().unwrap();
        assert_eq!(chord.modifier, Modifier::Ctrl);
        assert_eq!(chord.key, Key::Char('v'));
        assert_eq!(chord.to_string(), "Ctrl+V,V");

        assert!("Ctrl+V,B".parse::<ChordSpec>().is_err());
        assert!("Ctrl+Shift+V,V".parse::<ChordSpec>().is_err());
        assert!("V,V".parse::<ChordSpec>().is_err());
        assert!("Ctrl+V".parse::<ChordSpec>().is_err());
        assert_eq!(ChordSpec::default(), chord);
    }

    #[test]
    fn test_modifier_set() {
        let mut set: Modifiers = [Modifier::Ctrl, Modifier::Meta].into_iter().collect();
        assert_eq!(set.len(), 2);
        set.remove(Modifier::Ctrl);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Modifier::Meta]);
        set.remove(Modifier::Meta);
        assert!(set.is_empty());
    }
}
