//! Hexadecimal keypad input.
use crate::constants::*;

/// Pressed state of the 16 keys. Pressed is a 1 bit, released is a 0 bit.
///
/// The host maps its physical keys onto this state once per frame,
/// the interpreter only reads it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Keypad {
    key_state: u16,
}

impl Keypad {
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the pressed state of a single key.
    ///
    /// Keycodes outside the keypad are ignored.
    pub fn set_pressed(&mut self, key_id: u8, state: bool) {
        if key_id < KEY_COUNT {
            if state {
                self.key_state |= 1 << key_id;
            } else {
                self.key_state &= !(1 << key_id);
            }
        }
    }

    pub fn is_pressed(&self, key_id: u8) -> bool {
        if key_id < KEY_COUNT {
            self.key_state & (1 << key_id) > 0
        } else {
            false
        }
    }

    /// Replace the state of every key at once.
    pub fn set_state(&mut self, keys: [bool; KEY_COUNT as usize]) {
        self.key_state = keys
            .iter()
            .enumerate()
            .filter(|(_, pressed)| **pressed)
            .fold(0, |mask, (k, _)| mask | (1 << k));
    }

    /// Bitmask of pressed keys, bit N for key N.
    #[inline(always)]
    pub fn mask(&self) -> u16 {
        self.key_state
    }

    /// Check whether any key is pressed down.
    #[inline(always)]
    pub fn any_key(&self) -> bool {
        self.key_state > 0
    }

    /// First key that is pressed now but was not held in the given mask.
    #[inline]
    pub fn first_new_key(&self, held: u16) -> Option<u8> {
        lowest_key(self.key_state & !held)
    }

    /// Clear the keyboard input state, setting all keys to up.
    #[inline(always)]
    pub fn clear(&mut self) {
        self.key_state = 0;
    }
}

#[inline]
fn lowest_key(mask: u16) -> Option<u8> {
    if mask == 0 {
        None
    } else {
        Some(mask.trailing_zeros() as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KeyCode {
    Key0 = 0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF = 0xF,
}

impl KeyCode {
    #[inline(always)]
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for KeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let key_id = self.as_u8();
        write!(f, "k{key_id:x}")
    }
}

impl From<KeyCode> for u8 {
    fn from(keycode: KeyCode) -> Self {
        keycode.as_u8()
    }
}

impl TryFrom<u8> for KeyCode {
    type Error = InvalidKeyCode;

    fn try_from(key_id: u8) -> Result<Self, Self::Error> {
        match key_id {
            0 => Ok(Self::Key0),
            1 => Ok(Self::Key1),
            2 => Ok(Self::Key2),
            3 => Ok(Self::Key3),
            4 => Ok(Self::Key4),
            5 => Ok(Self::Key5),
            6 => Ok(Self::Key6),
            7 => Ok(Self::Key7),
            8 => Ok(Self::Key8),
            9 => Ok(Self::Key9),
            10 => Ok(Self::KeyA),
            11 => Ok(Self::KeyB),
            12 => Ok(Self::KeyC),
            13 => Ok(Self::KeyD),
            14 => Ok(Self::KeyE),
            15 => Ok(Self::KeyF),
            _ => Err(InvalidKeyCode(key_id)),
        }
    }
}

#[derive(Debug)]
pub struct InvalidKeyCode(pub u8);

impl std::error::Error for InvalidKeyCode {}

impl std::fmt::Display for InvalidKeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "keycode {} must be in range 0 <= keycode < 16",
            self.0
        )
    }
}
