//! Chip-8 virtual machine.
//!
//! The machine is driven from the outside: the host calls
//! [`prelude::Chip8Vm::step`] a fixed number of times per frame, ticks
//! the timers once per frame, and exchanges the display buffer and
//! keypad state across its own presentation layer.
mod clock;
mod conf;
pub mod constants;
mod cpu;
mod disasm;
mod display;
mod error;
mod instr;
mod keyboard;
mod memory;
mod vm;

pub use self::{
    conf::Hz,
    display::Chip8DisplayBuffer,
    instr::{Instr, Mnemonic},
    keyboard::{InvalidKeyCode, KeyCode},
    memory::FONTSET,
};

pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        clock::Clock,
        conf::{Chip8Conf, Hz},
        cpu::{Chip8Cpu, Registers},
        disasm::Disassembler,
        display::Display,
        error::{Chip8Error, Chip8Result},
        keyboard::{KeyCode, Keypad},
        memory::Memory,
        vm::{Buzzer, Chip8Snapshot, Chip8Vm, Flow, Frame},
    };
}
