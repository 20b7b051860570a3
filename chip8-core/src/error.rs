//! Result and errors.
use std::fmt::{self, Display, Formatter};

use crate::constants::{Address, MAX_PROGRAM_SIZE, STACK_SIZE};

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chip8Error {
    /// Attempt to load a bytecode program that can't fit in memory.
    LargeProgram { len: usize },
    /// An address computed from the program counter or the
    /// address register points past the end of memory.
    MemoryOutOfBounds { addr: usize },
    /// `CALL` with every stack slot taken.
    StackOverflow { pc: Address },
    /// `RET` with an empty stack.
    StackUnderflow { pc: Address },
    /// Keycode outside of the 16 keys of the keypad.
    InvalidKey(u8),
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::LargeProgram { len } => write!(
                f,
                "program of {len} bytes too large for VM memory (max {MAX_PROGRAM_SIZE})"
            ),
            Self::MemoryOutOfBounds { addr } => {
                write!(f, "memory access out of bounds at 0x{addr:04X}")
            }
            Self::StackOverflow { pc } => write!(
                f,
                "call stack overflow at 0x{pc:03X}, nesting deeper than {STACK_SIZE}"
            ),
            Self::StackUnderflow { pc } => {
                write!(f, "call stack underflow at 0x{pc:03X}, return without call")
            }
            Self::InvalidKey(key_id) => write!(f, "invalid keycode {key_id}"),
        }
    }
}

impl std::error::Error for Chip8Error {}

impl From<crate::keyboard::InvalidKeyCode> for Chip8Error {
    fn from(err: crate::keyboard::InvalidKeyCode) -> Self {
        Chip8Error::InvalidKey(err.0)
    }
}
