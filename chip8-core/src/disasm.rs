//! Disassembler.
use std::fmt::{self, Write as FmtWrite};

use crate::{constants::MEM_START, instr::Instr};

/// Linear disassembler over a program's bytecode.
///
/// Code and data are not told apart. Every pair of bytes is decoded
/// as an instruction, and words outside the instruction set are
/// printed as raw data.
pub struct Disassembler<'a> {
    bytecode: &'a [u8],
    cursor: usize,
}

impl<'a> Disassembler<'a> {
    pub fn new(bytecode: &'a [u8]) -> Self {
        Self {
            bytecode,
            cursor: 0,
        }
    }

    /// Disassemble the whole program into a string.
    pub fn disassemble_all(&mut self) -> Result<String, fmt::Error> {
        let mut s = String::new();
        self.cursor = 0;
        while self.cursor < self.bytecode.len() {
            self.disassemble(&mut s)?;
            self.cursor += 2;
        }
        self.cursor = 0;

        Ok(s)
    }

    pub fn print_bytecode(&mut self) -> fmt::Result {
        let s = self.disassemble_all()?;
        println!("{s}");
        Ok(())
    }

    /// Write the instruction at the cursor to the given writer.
    pub fn disassemble<W: FmtWrite>(&self, w: &mut W) -> fmt::Result {
        let addr = MEM_START + self.cursor;

        match self.bytecode.get(self.cursor..self.cursor + 2) {
            Some(&[a, b]) => {
                let instr = Instr::from_bytes([a, b]);
                writeln!(w, "{addr:04X}: {:04X}  {instr}", instr.word)
            }
            // Odd trailing byte.
            _ => match self.bytecode.get(self.cursor) {
                Some(a) => writeln!(w, "{addr:04X}: {a:02X}    0b{a:08b}"),
                None => Ok(()),
            },
        }
    }
}
