//! Instruction decoding.
use std::fmt::{self, Formatter};

use crate::constants::Address;

/// A 16-bit instruction split into its operand fields.
///
/// Every field is extracted up front, the interpreter picks the
/// ones relevant to the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instr {
    /// The original big-endian instruction word.
    pub word: u16,
    /// Opcode class in the highest nibble. `0xF000`
    pub op: u8,
    /// Register index in the second nibble. `0x0F00`
    pub x: u8,
    /// Register index in the third nibble. `0x00F0`
    pub y: u8,
    /// Lowest nibble. `0x000F`
    pub n: u8,
    /// Lowest byte. `0x00FF`
    pub nn: u8,
    /// Lowest 12 bits, an address. `0x0FFF`
    pub nnn: Address,
}

impl Instr {
    #[inline(always)]
    pub fn decode(word: u16) -> Self {
        Self {
            word,
            op: (word >> 12) as u8,
            x: ((word >> 8) & 0xF) as u8,
            y: ((word >> 4) & 0xF) as u8,
            n: (word & 0xF) as u8,
            nn: (word & 0xFF) as u8,
            nnn: word & 0xFFF,
        }
    }

    /// Decode two bytes in memory order.
    #[inline(always)]
    pub fn from_bytes([a, b]: [u8; 2]) -> Self {
        Self::decode(u16::from_be_bytes([a, b]))
    }

    /// Mnemonic representation, or `None` when the word is not
    /// an instruction of the base Chip-8 set.
    pub fn mnemonic(&self) -> Option<Mnemonic> {
        let Self {
            op, x, y, n, nn, nnn, ..
        } = *self;

        let m = match (op, n, nn) {
            (0x0, _, 0xE0) if nnn == 0x0E0 => Mnemonic::Plain("CLS"),
            (0x0, _, 0xEE) if nnn == 0x0EE => Mnemonic::Plain("RET"),
            (0x1, _, _) => Mnemonic::Addr("JP", nnn),
            (0x2, _, _) => Mnemonic::Addr("CALL", nnn),
            (0x3, _, _) => Mnemonic::RegByte("SE", x, nn),
            (0x4, _, _) => Mnemonic::RegByte("SNE", x, nn),
            (0x5, 0x0, _) => Mnemonic::RegReg("SE", x, y),
            (0x6, _, _) => Mnemonic::RegByte("LD", x, nn),
            (0x7, _, _) => Mnemonic::RegByte("ADD", x, nn),
            (0x8, 0x0, _) => Mnemonic::RegReg("LD", x, y),
            (0x8, 0x1, _) => Mnemonic::RegReg("OR", x, y),
            (0x8, 0x2, _) => Mnemonic::RegReg("AND", x, y),
            (0x8, 0x3, _) => Mnemonic::RegReg("XOR", x, y),
            (0x8, 0x4, _) => Mnemonic::RegReg("ADD", x, y),
            (0x8, 0x5, _) => Mnemonic::RegReg("SUB", x, y),
            (0x8, 0x6, _) => Mnemonic::Reg("SHR", x),
            (0x8, 0x7, _) => Mnemonic::RegReg("SUBN", x, y),
            (0x8, 0xE, _) => Mnemonic::Reg("SHL", x),
            (0x9, 0x0, _) => Mnemonic::RegReg("SNE", x, y),
            (0xA, _, _) => Mnemonic::Special("LD", "I", Operand::Addr(nnn)),
            (0xB, _, _) => Mnemonic::Special("JP", "V0", Operand::Addr(nnn)),
            (0xC, _, _) => Mnemonic::RegByte("RND", x, nn),
            (0xD, _, _) => Mnemonic::Draw(x, y, n),
            (0xE, _, 0x9E) => Mnemonic::Reg("SKP", x),
            (0xE, _, 0xA1) => Mnemonic::Reg("SKNP", x),
            (0xF, _, 0x07) => Mnemonic::RegSpecial("LD", x, "DT"),
            (0xF, _, 0x0A) => Mnemonic::RegSpecial("LD", x, "K"),
            (0xF, _, 0x15) => Mnemonic::Special("LD", "DT", Operand::Reg(x)),
            (0xF, _, 0x18) => Mnemonic::Special("LD", "ST", Operand::Reg(x)),
            (0xF, _, 0x1E) => Mnemonic::Special("ADD", "I", Operand::Reg(x)),
            (0xF, _, 0x29) => Mnemonic::Special("LD", "F", Operand::Reg(x)),
            (0xF, _, 0x33) => Mnemonic::Special("LD", "B", Operand::Reg(x)),
            (0xF, _, 0x55) => Mnemonic::Special("LD", "[I]", Operand::Reg(x)),
            (0xF, _, 0x65) => Mnemonic::RegSpecial("LD", x, "[I]"),
            _ => return None,
        };

        Some(m)
    }
}

impl From<u16> for Instr {
    fn from(word: u16) -> Self {
        Instr::decode(word)
    }
}

/// Assembly-style rendering of an instruction.
///
/// Unknown words are printed as raw data.
impl fmt::Display for Instr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.mnemonic() {
            Some(m) => write!(f, "{m}"),
            None => write!(f, "0x{:04X}", self.word),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Reg(u8),
    Addr(Address),
}

/// Assembly mnemonic with its operands, grouped by operand layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    /// `CLS`
    Plain(&'static str),
    /// `JP addr`
    Addr(&'static str, Address),
    /// `SHR Vx`
    Reg(&'static str, u8),
    /// `ADD Vx, byte`
    RegByte(&'static str, u8, u8),
    /// `SUB Vx, Vy`
    RegReg(&'static str, u8, u8),
    /// `LD Vx, DT`
    RegSpecial(&'static str, u8, &'static str),
    /// `LD DT, Vx`
    Special(&'static str, &'static str, Operand),
    /// `DRW Vx, Vy, nibble`
    Draw(u8, u8, u8),
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            Self::Plain(name) => write!(f, "{name}"),
            Self::Addr(name, addr) => write!(f, "{name} 0x{addr:03X}"),
            Self::Reg(name, vx) => write!(f, "{name} V{vx:X}"),
            Self::RegByte(name, vx, nn) => write!(f, "{name} V{vx:X}, 0x{nn:02X}"),
            Self::RegReg(name, vx, vy) => write!(f, "{name} V{vx:X}, V{vy:X}"),
            Self::RegSpecial(name, vx, k) => write!(f, "{name} V{vx:X}, {k}"),
            Self::Special(name, k, Operand::Reg(vx)) => write!(f, "{name} {k}, V{vx:X}"),
            Self::Special(name, k, Operand::Addr(addr)) => {
                write!(f, "{name} {k}, 0x{addr:03X}")
            }
            Self::Draw(vx, vy, n) => write!(f, "DRW V{vx:X}, V{vy:X}, {n}"),
        }
    }
}
