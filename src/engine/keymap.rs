//! Host key to portable key-code translation.
//!
//! Portable key codes follow the convention the embedded engine uses:
//! printable keys are their (lowercase) character code, every other key is its
//! scancode with bit 30 set. Only a basic table is provided; keys outside of
//! it translate to [`KeyCode::UNKNOWN`].

use std::fmt;

const SCANCODE_MASK: u32 = 1 << 30;

/// Portable key code handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const UNKNOWN: KeyCode = KeyCode(0);
    pub const BACKSPACE: KeyCode = KeyCode(8);
    pub const TAB: KeyCode = KeyCode(9);
    pub const RETURN: KeyCode = KeyCode(13);
    pub const ESCAPE: KeyCode = KeyCode(27);
    pub const SPACE: KeyCode = KeyCode(32);
    pub const DELETE: KeyCode = KeyCode(127);

    pub const fn from_scancode(scancode: u32) -> KeyCode {
        KeyCode(scancode | SCANCODE_MASK)
    }

    pub fn is_scancode(self) -> bool {
        self.0 & SCANCODE_MASK != 0
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_scancode() {
            write!(f, "scancode:{}", self.0 & !SCANCODE_MASK)
        } else {
            match char::from_u32(self.0) {
                Some(c) if !c.is_control() => write!(f, "'{c}'"),
                _ => write!(f, "{:#x}", self.0),
            }
        }
    }
}

mod scancode {
    pub const CAPSLOCK: u32 = 57;
    pub const F1: u32 = 58;
    pub const PRINTSCREEN: u32 = 70;
    pub const SCROLLLOCK: u32 = 71;
    pub const PAUSE: u32 = 72;
    pub const INSERT: u32 = 73;
    pub const HOME: u32 = 74;
    pub const PAGEUP: u32 = 75;
    pub const END: u32 = 77;
    pub const PAGEDOWN: u32 = 78;
    pub const RIGHT: u32 = 79;
    pub const LEFT: u32 = 80;
    pub const DOWN: u32 = 81;
    pub const UP: u32 = 82;
    pub const NUMLOCKCLEAR: u32 = 83;
    pub const F13: u32 = 104;
}

/// Keys without a printable character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedKey {
    Enter,
    Escape,
    Backspace,
    Tab,
    Space,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    CapsLock,
    NumLock,
    ScrollLock,
    PrintScreen,
    Pause,
    /// Function key `F1` to `F24`.
    F(u8),
}

/// A key as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Character(char),
    Named(NamedKey),
    Unidentified,
}

pub fn translate_key(key: &Key) -> KeyCode {
    match key {
        Key::Character(c) => translate_char(*c),
        Key::Named(named) => translate_named(*named),
        Key::Unidentified => KeyCode::UNKNOWN,
    }
}

fn translate_char(c: char) -> KeyCode {
    match c {
        '\r' | '\n' => KeyCode::RETURN,
        '\t' => KeyCode::TAB,
        '\u{8}' => KeyCode::BACKSPACE,
        '\u{1b}' => KeyCode::ESCAPE,
        '\u{7f}' => KeyCode::DELETE,
        c if c.is_control() => KeyCode::UNKNOWN,
        c => {
            let lower = c.to_lowercase().next().unwrap_or(c);
            KeyCode(lower as u32)
        }
    }
}

fn translate_named(key: NamedKey) -> KeyCode {
    use scancode::*;

    match key {
        NamedKey::Enter => KeyCode::RETURN,
        NamedKey::Escape => KeyCode::ESCAPE,
        NamedKey::Backspace => KeyCode::BACKSPACE,
        NamedKey::Tab => KeyCode::TAB,
        NamedKey::Space => KeyCode::SPACE,
        NamedKey::Delete => KeyCode::DELETE,
        NamedKey::Insert => KeyCode::from_scancode(INSERT),
        NamedKey::Home => KeyCode::from_scancode(HOME),
        NamedKey::End => KeyCode::from_scancode(END),
        NamedKey::PageUp => KeyCode::from_scancode(PAGEUP),
        NamedKey::PageDown => KeyCode::from_scancode(PAGEDOWN),
        NamedKey::ArrowLeft => KeyCode::from_scancode(LEFT),
        NamedKey::ArrowRight => KeyCode::from_scancode(RIGHT),
        NamedKey::ArrowUp => KeyCode::from_scancode(UP),
        NamedKey::ArrowDown => KeyCode::from_scancode(DOWN),
        NamedKey::CapsLock => KeyCode::from_scancode(CAPSLOCK),
        NamedKey::NumLock => KeyCode::from_scancode(NUMLOCKCLEAR),
        NamedKey::ScrollLock => KeyCode::from_scancode(SCROLLLOCK),
        NamedKey::PrintScreen => KeyCode::from_scancode(PRINTSCREEN),
        NamedKey::Pause => KeyCode::from_scancode(PAUSE),
        NamedKey::F(n @ 1..=12) => KeyCode::from_scancode(F1 + n as u32 - 1),
        NamedKey::F(n @ 13..=24) => KeyCode::from_scancode(F13 + n as u32 - 13),
        NamedKey::F(_) => KeyCode::UNKNOWN,
    }
}
