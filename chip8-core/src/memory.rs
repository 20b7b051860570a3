//! Main memory.
use crate::{
    constants::*,
    error::{Chip8Error, Chip8Result},
};

/// Hexadecimal digit glyphs 0-F, 5 bytes each, packed together.
#[rustfmt::skip]
pub const FONTSET: [u8; FONTSET_DATA_LENGTH] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Flat 4K address space holding the font glyphs and the loaded program.
pub struct Memory {
    ram: Box<[u8; MEM_SIZE]>,
}

impl Default for Memory {
    fn default() -> Self {
        let mut memory = Self {
            ram: Box::new([0; MEM_SIZE]),
        };
        memory.load_font();
        memory
    }
}

impl Memory {
    /// Allocate zeroed memory with the builtin font loaded.
    pub fn new() -> Self {
        Default::default()
    }

    /// Write the font glyph table into reserved memory.
    pub fn load_font(&mut self) {
        let start = FONTSET_START as usize;
        self.ram[start..start + FONTSET_DATA_LENGTH].copy_from_slice(&FONTSET);
    }

    /// Copy program bytes into memory starting at [`MEM_START`].
    pub fn load_program(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if !check_program_size(bytecode) {
            return Err(Chip8Error::LargeProgram {
                len: bytecode.len(),
            });
        }

        // Start with clean memory to avoid leaking previous program.
        self.ram[MEM_START..].fill(0);
        self.ram[MEM_START..MEM_START + bytecode.len()].copy_from_slice(bytecode);

        Ok(())
    }

    /// Erase all of memory, including the font.
    pub fn clear(&mut self) {
        self.ram.fill(0);
    }

    #[inline]
    pub fn read_byte(&self, addr: usize) -> Chip8Result<u8> {
        self.ram
            .get(addr)
            .copied()
            .ok_or(Chip8Error::MemoryOutOfBounds { addr })
    }

    #[inline]
    pub fn write_byte(&mut self, addr: usize, value: u8) -> Chip8Result<()> {
        match self.ram.get_mut(addr) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Chip8Error::MemoryOutOfBounds { addr }),
        }
    }

    /// Read the two bytes of the instruction at the given address.
    #[inline]
    pub fn read_instr(&self, addr: usize) -> Chip8Result<[u8; 2]> {
        Ok([self.read_byte(addr)?, self.read_byte(addr + 1)?])
    }

    /// Borrow `len` bytes starting at `addr`.
    ///
    /// The whole range must be inside memory, there is no wrapping.
    pub fn slice(&self, addr: usize, len: usize) -> Chip8Result<&[u8]> {
        let end = checked_end(addr, len)?;
        Ok(&self.ram[addr..end])
    }

    /// Mutably borrow `len` bytes starting at `addr`.
    pub fn slice_mut(&mut self, addr: usize, len: usize) -> Chip8Result<&mut [u8]> {
        let end = checked_end(addr, len)?;
        Ok(&mut self.ram[addr..end])
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.ram[..]
    }
}

/// Exclusive end of a range, if the whole range fits in memory.
#[inline]
fn checked_end(addr: usize, len: usize) -> Chip8Result<usize> {
    match addr.checked_add(len) {
        Some(end) if end <= MEM_SIZE => Ok(end),
        // Report the first address that falls outside.
        _ => Err(Chip8Error::MemoryOutOfBounds {
            addr: addr.max(MEM_SIZE),
        }),
    }
}

#[inline]
pub fn check_program_size(bytecode: &[u8]) -> bool {
    bytecode.len() <= MAX_PROGRAM_SIZE
}
