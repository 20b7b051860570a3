//! CPU register state.
use crate::{
    constants::*,
    error::{Chip8Error, Chip8Result},
};

/// Register state for a chip8 interpreter.
///
/// Memory, display and keypad are owned by the VM next to the CPU, so
/// instructions can borrow them independently.
#[derive(Debug, Clone)]
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the next instruction to fetch.
    pub(crate) pc: Address,
    /// Stack pointer, the number of return addresses on the stack.
    pub(crate) sp: usize,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for the carry, borrow, shift-out or
    /// collision flag depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// Pointer register (I) used for temporarily storing an address.
    pub(crate) address: Address,
    /// (DT) Delay timer that counts down to 0.
    pub(crate) delay_timer: u8,
    /// (ST) Sound timer that counts down to 0. When it has a non-zero value, a beep is played.
    pub(crate) sound_timer: u8,
    /// Switch tracking whether the buzzer should be on or off.
    pub(crate) buzzer_state: bool,
    /// Set while the machine is blocked on `Fx0A` waiting for a keypress.
    pub(crate) key_wait: Option<KeyWait>,
    /// Stack of return pointers used for jumping when a routine call finishes.
    pub(crate) stack: [Address; STACK_SIZE],

    // ------------------------------------------------------------------------
    // Control
    /// Interrupt for VM loop.
    pub(crate) trap: bool,
    /// Fault that halted the VM.
    pub(crate) error: Option<Chip8Error>,
}

/// Pending `Fx0A` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct KeyWait {
    /// Register that receives the keycode.
    pub(crate) vx: u8,
    /// Keys that were already held down, which must not resolve the wait.
    pub(crate) held: u16,
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        Self {
            pc: MEM_START as Address,
            sp: 0,
            registers: [0; REGISTER_COUNT],
            address: 0,
            delay_timer: 0,
            sound_timer: 0,
            buzzer_state: false,
            key_wait: None,
            stack: [0; STACK_SIZE],

            trap: false,
            error: None,
        }
    }
}

impl Chip8Cpu {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn pc(&self) -> Address {
        self.pc
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.registers
    }

    /// Value of register Vx. Only the low nibble of `vx` is used.
    #[inline]
    pub fn register(&self, vx: u8) -> u8 {
        self.registers[vx as usize & 0xF]
    }

    /// Value of the address register I.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn is_buzzing(&self) -> bool {
        self.buzzer_state
    }

    pub fn is_waiting_key(&self) -> bool {
        self.key_wait.is_some()
    }

    /// Return addresses currently on the stack, bottom first.
    pub fn stack(&self) -> &[Address] {
        &self.stack[..self.sp]
    }

    pub fn interrupt(&mut self) {
        self.trap = true;
    }

    pub fn set_error(&mut self, err: Chip8Error) {
        self.trap = true;
        self.error = Some(err);
    }

    pub fn error(&self) -> Option<&Chip8Error> {
        self.error.as_ref()
    }

    /// Push a return address for a subroutine call.
    ///
    /// The program counter is reported as the address of the
    /// offending `CALL` instruction.
    #[inline]
    pub(crate) fn push(&mut self, ret: Address) -> Chip8Result<()> {
        match self.stack.get_mut(self.sp) {
            Some(slot) => {
                *slot = ret;
                self.sp += 1;
                Ok(())
            }
            None => Err(Chip8Error::StackOverflow {
                pc: ret.wrapping_sub(2),
            }),
        }
    }

    /// Pop the return address of the current subroutine.
    #[inline]
    pub(crate) fn pop(&mut self) -> Chip8Result<Address> {
        match self.sp.checked_sub(1) {
            Some(sp) => {
                self.sp = sp;
                Ok(self.stack[sp])
            }
            None => Err(Chip8Error::StackUnderflow {
                pc: self.pc.wrapping_sub(2),
            }),
        }
    }

    /// Advance the program counter past the next instruction.
    #[inline(always)]
    pub(crate) fn skip(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }

    /// Count down the delay timer.
    #[inline]
    pub fn tick_delay(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
    }

    /// Count down the sound timer.
    #[inline]
    pub fn tick_sound(&mut self) {
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    /// Copy of the register file.
    pub fn snapshot(&self) -> Registers {
        Registers {
            v: self.registers,
            i: self.address,
            pc: self.pc,
            sp: self.sp,
            delay_timer: self.delay_timer,
            sound_timer: self.sound_timer,
        }
    }
}

/// Owned copy of the register values at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub v: [u8; REGISTER_COUNT],
    pub i: Address,
    pub pc: Address,
    pub sp: usize,
    pub delay_timer: u8,
    pub sound_timer: u8,
}
