//! Virtual machine.
use std::fmt::{self, Write};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    conf::Chip8Conf,
    constants::*,
    cpu::{Chip8Cpu, KeyWait, Registers},
    display::{Chip8DisplayBuffer, Display},
    error::{Chip8Error, Chip8Result},
    instr::Instr,
    keyboard::{KeyCode, Keypad},
    memory::Memory,
};

/// A single Chip-8 machine.
///
/// The driver composes [`Chip8Vm::step`], [`Chip8Vm::tick_timers`] and
/// [`Chip8Vm::set_input`] once per frame, or calls [`Chip8Vm::run_frame`]
/// which does the same in that order.
///
/// The random number generator used by `Cxnn` is owned by the machine,
/// so a seeded generator gives reproducible runs.
pub struct Chip8Vm<R = StdRng> {
    cpu: Chip8Cpu,
    memory: Memory,
    display: Display,
    keypad: Keypad,
    rng: R,
    conf: Chip8Conf,
}

impl Chip8Vm<StdRng> {
    /// Create a machine, seeding the generator from `conf.rng_seed`
    /// or from system entropy when no seed is given.
    pub fn new(conf: Chip8Conf) -> Self {
        let rng = match conf.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(conf, rng)
    }
}

impl<R: Rng> Chip8Vm<R> {
    /// Create a machine with the given random number generator.
    pub fn with_rng(conf: Chip8Conf, rng: R) -> Self {
        Chip8Vm {
            cpu: Chip8Cpu::new(),
            memory: Memory::new(),
            display: Display::new(),
            keypad: Keypad::new(),
            rng,
            conf,
        }
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    /// Load a program and reset the machine to its power-on state.
    pub fn load_bytecode(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        // Check before touching memory, so a failed load leaves
        // the previous program intact.
        if !crate::memory::check_program_size(bytecode) {
            return Err(Chip8Error::LargeProgram {
                len: bytecode.len(),
            });
        }

        // Start with clean memory to avoid leaking previous program.
        self.memory.clear();
        self.memory.load_font();
        self.memory.load_program(bytecode)?;

        self.reset();

        log::debug!("loaded program of {} bytes", bytecode.len());

        Ok(())
    }

    /// Clear registers, display and input, keeping memory.
    fn reset(&mut self) {
        self.cpu = Chip8Cpu::new();
        self.display.clear();
        self.keypad.clear();
    }

    pub fn cpu(&self) -> &Chip8Cpu {
        &self.cpu
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn display_buffer(&self) -> Chip8DisplayBuffer {
        self.display.buffer()
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    /// Owned copy of the display and registers, for presentation
    /// outside of the interpreter.
    pub fn snapshot(&self) -> Chip8Snapshot {
        Chip8Snapshot {
            display: self.display.snapshot(),
            registers: self.cpu.snapshot(),
        }
    }

    /// Fault that halted the machine, if any.
    pub fn error(&self) -> Option<&Chip8Error> {
        self.cpu.error()
    }

    pub fn is_halted(&self) -> bool {
        self.cpu.trap
    }

    /// Stop the machine. Subsequent steps report [`Flow::Interrupt`].
    pub fn interrupt(&mut self) {
        self.cpu.interrupt()
    }
}

/// Outcome of a single interpreter step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Ok,
    /// The machine is halted, either by a fault or by [`Chip8Vm::interrupt`].
    Interrupt,
    /// Program counter has jumped to a new address.
    ///
    /// This is useful for the caller to avoid being
    /// blocked on infinite or long running loops.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - 00EE (`RET`)
    /// - Bnnn (`JP V0, addr`)
    Jump,
    /// The display buffer changed, by `CLS` or `DRW`.
    Draw,
    /// The buzzer was switched on or off by `Fx18`.
    Sound(Buzzer),
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed, and loads the key value into `Vx`.
    KeyWait,
    /// The word is not part of the instruction set, and was skipped.
    Unimplemented(Instr),
}

/// Buzzer transition, for the host to start or stop a tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Buzzer {
    On,
    Off,
}

/// Summary of a frame run by [`Chip8Vm::run_frame`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Display buffer changed during the frame.
    pub redraw: bool,
    /// Buzzer transitions during the frame, in the order they happened.
    ///
    /// A sound timer set to 1 turns the buzzer on and off again
    /// within the same frame.
    pub buzzer: Vec<Buzzer>,
    /// Number of steps that executed an instruction or resolved a key wait.
    /// Steps that stay blocked on a pending `Fx0A` are not counted.
    pub steps: usize,
    /// The machine was halted and the frame stopped early.
    pub interrupted: bool,
}

/// Copy of the machine state that can be sent across threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chip8Snapshot {
    pub display: Box<[bool; DISPLAY_BUFFER_SIZE]>,
    pub registers: Registers,
}

/// Input and timers
impl<R: Rng> Chip8Vm<R> {
    /// Replace the whole keypad state. Called by the driver once per frame.
    pub fn set_input(&mut self, keys: [bool; KEY_COUNT as usize]) {
        self.keypad.set_state(keys);
    }

    /// Sets the keyboard key input state.
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        self.keypad.set_pressed(key.as_u8(), pressed);
    }

    /// Sets the key input state from a raw keycode.
    pub fn set_key_id(&mut self, key_id: u8, pressed: bool) -> Chip8Result<()> {
        let key = KeyCode::try_from(key_id)?;
        self.set_key(key, pressed);
        Ok(())
    }

    /// Count down the delay and sound timers by one.
    ///
    /// Must be called at 60Hz of real time, independent of the number
    /// of steps. Returns the buzzer transition when the sound timer
    /// runs out.
    pub fn tick_timers(&mut self) -> Option<Buzzer> {
        self.cpu.tick_delay();
        self.cpu.tick_sound();
        self.update_buzzer()
    }

    /// Buzzer should be on while sound timer counts down,
    /// then turned off when the timer reaches zero.
    fn update_buzzer(&mut self) -> Option<Buzzer> {
        if self.cpu.sound_timer > 0 && !self.cpu.buzzer_state {
            self.cpu.buzzer_state = true;
            log::debug!("buzzer on");
            Some(Buzzer::On)
        } else if self.cpu.sound_timer == 0 && self.cpu.buzzer_state {
            self.cpu.buzzer_state = false;
            log::debug!("buzzer off");
            Some(Buzzer::Off)
        } else {
            None
        }
    }
}

/// Interpreter
impl<R: Rng> Chip8Vm<R> {
    /// Run one frame: the configured number of steps, then one timer tick.
    ///
    /// Stops at the first fault. A halted machine does not tick its timers.
    pub fn run_frame(&mut self) -> Chip8Result<Frame> {
        let mut frame = Frame::default();

        for _ in 0..self.conf.steps_per_frame {
            let waiting = self.cpu.key_wait.is_some();

            match self.step()? {
                Flow::Interrupt => {
                    frame.interrupted = true;
                    return Ok(frame);
                }
                Flow::KeyWait if waiting => continue,
                Flow::Draw => frame.redraw = true,
                Flow::Sound(buzzer) => frame.buzzer.push(buzzer),
                _ => {}
            }
            frame.steps += 1;
        }

        if let Some(buzzer) = self.tick_timers() {
            frame.buzzer.push(buzzer);
        }

        Ok(frame)
    }

    /// Run a number of steps without ticking the timers.
    pub fn run_steps(&mut self, step_count: usize) -> Chip8Result<Flow> {
        let mut control_flow = Flow::Ok;

        for _ in 0..step_count {
            control_flow = self.step()?;
            if control_flow == Flow::Interrupt {
                break;
            }
        }

        Ok(control_flow)
    }

    /// Fetch, decode and execute one instruction.
    ///
    /// A fault halts the machine and is returned as an error. The fault
    /// is kept and available from [`Chip8Vm::error`], and later steps
    /// report [`Flow::Interrupt`].
    pub fn step(&mut self) -> Chip8Result<Flow> {
        if self.cpu.trap {
            // Interrupt signal is set.
            return Ok(Flow::Interrupt);
        }

        match self.exec() {
            Ok(flow) => Ok(flow),
            Err(err) => {
                log::error!("halted: {err}");
                self.cpu.set_error(err.clone());
                Err(err)
            }
        }
    }

    fn exec(&mut self) -> Chip8Result<Flow> {
        if let Some(wait) = self.cpu.key_wait {
            return Ok(self.poll_key(wait));
        }

        // Each instruction is two bytes, with the opcode identity in the first 4-bit nibble.
        let pc = self.cpu.pc;
        let instr = Instr::from_bytes(self.memory.read_instr(pc as usize)?);
        self.cpu.pc = pc.wrapping_add(2);

        op_trace(pc, &instr);

        let Instr {
            op, x, y, n, nn, nnn, ..
        } = instr;
        let vx = x as usize;
        let vy = y as usize;

        let mut control_flow = Flow::Ok;

        match op {
            // Miscellaneous instructions identified by nn
            0x0 | 0xE | 0xF => control_flow = self.exec_misc(instr)?,
            // 1NNN (JP addr)
            //
            // Jump to address.
            0x1 => {
                self.cpu.pc = nnn;
                control_flow = Flow::Jump;
            }
            // 2NNN (CALL addr)
            //
            // Call subroutine at NNN.
            0x2 => {
                self.cpu.push(self.cpu.pc)?;
                self.cpu.pc = nnn;
                control_flow = Flow::Jump;
            }
            // 3XNN (SE Vx, byte)
            //
            // Skip the next instruction if register VX equals value NN.
            0x3 => {
                if self.cpu.registers[vx] == nn {
                    self.cpu.skip();
                }
            }
            // 4XNN (SNE Vx, byte)
            //
            // Skip the next instruction if register VX does not equal value NN.
            0x4 => {
                if self.cpu.registers[vx] != nn {
                    self.cpu.skip();
                }
            }
            // 5XY0 (SE Vx, Vy)
            //
            // Skip the next instruction if register VX equals value VY.
            0x5 if n == 0 => {
                if self.cpu.registers[vx] == self.cpu.registers[vy] {
                    self.cpu.skip();
                }
            }
            // 6XNN (LD Vx, byte)
            //
            // Set register VX to value NN.
            0x6 => {
                self.cpu.registers[vx] = nn;
            }
            // 7xnn (ADD Vx, byte)
            //
            // Add value NN to register VX. Carry flag is not set.
            0x7 => {
                self.cpu.registers[vx] = self.cpu.registers[vx].wrapping_add(nn);
            }
            // Arithmetic instructions indentified by n
            0x8 => control_flow = self.exec_math(instr),
            // 9xy0 (SNE Vx, Vy)
            //
            // Skip next instruction if Vx != Vy.
            0x9 if n == 0 => {
                if self.cpu.registers[vx] != self.cpu.registers[vy] {
                    self.cpu.skip();
                }
            }
            // Annn (LD I, addr)
            //
            // Set address register I to value NNN.
            0xA => {
                self.cpu.address = nnn;
            }
            // Bnnn (JP V0, addr)
            //
            // Jump to address NNN plus the value of V0.
            0xB => {
                self.cpu.pc = nnn + self.cpu.registers[0] as Address;
                control_flow = Flow::Jump;
            }
            // CXNN (RND Vx, byte)
            //
            // Set register VX to the result of bitwise AND between a random number and NN.
            0xC => {
                self.cpu.registers[vx] = nn & self.rng.gen::<u8>();
            }
            // Dxyn (DRW Vx, Vy, nibble)
            //
            // Draw sprite to the display buffer, at coordinate as per registers Vx and Vy.
            // Sprite is encoded as 8 pixels wide, N pixels high, stored in bits located in
            // memory pointed to by address register I.
            //
            // The starting coordinate wraps around the screen, pixels past the edge are clipped.
            //
            // Flag: VF is set to 1 if any pixel was erased, otherwise 0.
            0xD => {
                let (x, y) = (self.cpu.registers[vx], self.cpu.registers[vy]);
                let sprite = self.memory.slice(self.cpu.address as usize, n as usize)?;
                let is_erased = self.display.draw_sprite(x, y, sprite);

                // If a pixel was erased, then a collision occurred.
                self.cpu.registers[FLAG_REGISTER] = is_erased as u8;
                control_flow = Flow::Draw;
            }
            _ => control_flow = self.unimplemented(pc, instr),
        }

        Ok(control_flow)
    }

    /// Execute an arithmetic instruction
    ///
    /// The flag in VF is always written after the result, so when X is F
    /// the register holds the flag.
    #[inline]
    #[must_use]
    fn exec_math(&mut self, instr: Instr) -> Flow {
        debug_assert_eq!(instr.op, 0x8);
        let vx = instr.x as usize;
        let vy = instr.y as usize;
        let (x, y) = (self.cpu.registers[vx], self.cpu.registers[vy]);

        match instr.n {
            // 8XY0 (LD Vx, Vy)
            //
            // Store the value of register VY in register VX.
            0x0 => self.cpu.registers[vx] = y,
            // 8XY1 (OR Vx, Vy)
            0x1 => self.cpu.registers[vx] = x | y,
            // 8XY2 (AND Vx, Vy)
            0x2 => self.cpu.registers[vx] = x & y,
            // 8XY3 (XOR Vx, Vy)
            0x3 => self.cpu.registers[vx] = x ^ y,
            // 8XY4 (ADD Vx, Vy)
            //
            // ADDs VX to VY, and stores the result in VX.
            // Flag: VF is 1 on overflow, else 0.
            0x4 => {
                let (result, carry) = x.overflowing_add(y);
                self.cpu.registers[vx] = result;
                self.cpu.registers[FLAG_REGISTER] = carry as u8;
            }
            // 8XY5 (SUB Vx, Vy)
            //
            // Subtracts VY from VX, and stores the result in VX.
            // Flag: VF is 0 when there is a borrow, 1 when there isn't.
            0x5 => {
                self.cpu.registers[vx] = x.wrapping_sub(y);
                self.cpu.registers[FLAG_REGISTER] = (x >= y) as u8;
            }
            // 8XY6 (SHR Vx)
            //
            // Shift VX right by 1. VY is unused.
            // Flag: VF is the bit shifted out.
            0x6 => {
                self.cpu.registers[vx] = x >> 1;
                self.cpu.registers[FLAG_REGISTER] = x & 1;
            }
            // 8XY7 (SUBN Vx, Vy)
            //
            // Subtracts VX from VY, and stores the result in VX.
            // Flag: VF is 0 when there is a borrow, 1 when there isn't.
            0x7 => {
                self.cpu.registers[vx] = y.wrapping_sub(x);
                self.cpu.registers[FLAG_REGISTER] = (y >= x) as u8;
            }
            // 8XYE (SHL Vx)
            //
            // Shift VX left by 1. VY is unused.
            // Flag: VF is the bit shifted out.
            0xE => {
                self.cpu.registers[vx] = x << 1;
                self.cpu.registers[FLAG_REGISTER] = (x >> 7) & 1;
            }
            // ----------------------------------------------------------------
            // Unsupported operation.
            _ => return self.unimplemented(self.cpu.pc.wrapping_sub(2), instr),
        }

        Flow::Ok
    }

    /// Execute a miscellaneous instruction
    #[inline]
    fn exec_misc(&mut self, instr: Instr) -> Chip8Result<Flow> {
        let Instr { op, x, nn, .. } = instr;
        let vx = x as usize;
        let pc = self.cpu.pc.wrapping_sub(2);

        let mut control_flow = Flow::Ok;

        match (op, nn) {
            // ----------------------------------------------------------------
            // 00E0 (CLS)
            //
            // Clear display
            (0x0, 0xE0) if x == 0 => {
                self.display.clear();
                control_flow = Flow::Draw;
            }
            // 00EE (RET)
            //
            // Return from a subroutine.
            // Set the program counter to the value at the top of the stack.
            (0x0, 0xEE) if x == 0 => {
                self.cpu.pc = self.cpu.pop()?;
                control_flow = Flow::Jump;
            }
            // ----------------------------------------------------------------
            // Ex9E (SKP Vx)
            //
            // Skip the next instruction if the key in Vx is pressed.
            (0xE, 0x9E) => {
                if self.keypad.is_pressed(self.cpu.registers[vx] & 0xF) {
                    self.cpu.skip();
                }
            }
            // ExA1 (SKNP Vx)
            //
            // Skip the next instruction if the key in Vx is not pressed.
            (0xE, 0xA1) => {
                if !self.keypad.is_pressed(self.cpu.registers[vx] & 0xF) {
                    self.cpu.skip();
                }
            }
            // ----------------------------------------------------------------
            // Fx07 (LD Vx, DT)
            //
            // Set Vx = delay timer value.
            (0xF, 0x07) => {
                self.cpu.registers[vx] = self.cpu.delay_timer;
            }
            // Fx0A (LD Vx, K)
            //
            // Wait for a key press, store the value of the key in Vx.
            // Execution is suspended on the following steps until a key,
            // that was not already held down, is pressed.
            (0xF, 0x0A) => {
                self.cpu.key_wait = Some(KeyWait {
                    vx: x,
                    held: self.keypad.mask(),
                });
                control_flow = Flow::KeyWait;
            }
            // Fx15 (LD DT, Vx)
            //
            // Set delay timer = Vx.
            (0xF, 0x15) => {
                self.cpu.delay_timer = self.cpu.registers[vx];
            }
            // Fx18 (LD ST, Vx)
            //
            // Set sound timer = Vx.
            (0xF, 0x18) => {
                self.cpu.sound_timer = self.cpu.registers[vx];
                if let Some(buzzer) = self.update_buzzer() {
                    control_flow = Flow::Sound(buzzer);
                }
            }
            // Fx1E (ADD I, Vx)
            //
            // Add Vx to I. No flag is set.
            (0xF, 0x1E) => {
                let x = self.cpu.registers[vx] as Address;
                self.cpu.address = self.cpu.address.wrapping_add(x);
            }
            // Fx29 (LD F, Vx)
            //
            // Set I = location of font glyph for the hex digit in Vx.
            (0xF, 0x29) => {
                let digit = (self.cpu.registers[vx] & 0xF) as Address;
                self.cpu.address = FONTSET_START + digit * FONTSET_HEIGHT as Address;
            }
            // Fx33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1, and I+2.
            #[rustfmt::skip]
            (0xF, 0x33) => {
                let x = self.cpu.registers[vx];
                let bcd = self.memory.slice_mut(self.cpu.address as usize, 3)?;
                bcd[0] = x / 100;
                bcd[1] = x / 10  % 10;
                bcd[2] = x       % 10;
            }
            // Fx55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at location I.
            (0xF, 0x55) => {
                let dest = self.memory.slice_mut(self.cpu.address as usize, vx + 1)?;
                dest.copy_from_slice(&self.cpu.registers[..=vx]);
            }
            // Fx65 (LD Vx, [I])
            //
            // Read registers V0 through Vx from memory starting at location I.
            (0xF, 0x65) => {
                let src = self.memory.slice(self.cpu.address as usize, vx + 1)?;
                self.cpu.registers[..=vx].copy_from_slice(src);
            }
            // ----------------------------------------------------------------
            // Unsupported operation.
            _ => control_flow = self.unimplemented(pc, instr),
        }

        Ok(control_flow)
    }

    /// Resolve a pending `Fx0A` once a new key is pressed.
    fn poll_key(&mut self, wait: KeyWait) -> Flow {
        match self.keypad.first_new_key(wait.held) {
            Some(key_id) => {
                self.cpu.registers[wait.vx as usize] = key_id;
                self.cpu.key_wait = None;
                Flow::Ok
            }
            None => {
                // Keys released since the wait started may resolve it
                // when they are pressed again.
                self.cpu.key_wait = Some(KeyWait {
                    held: wait.held & self.keypad.mask(),
                    ..wait
                });
                Flow::KeyWait
            }
        }
    }

    #[cold]
    fn unimplemented(&self, pc: Address, instr: Instr) -> Flow {
        log::warn!("unimplemented opcode {:04X} at 0x{pc:03X}", instr.word);
        Flow::Unimplemented(instr)
    }
}

/// Troubleshooting
#[doc(hidden)]
impl<R> Chip8Vm<R> {
    /// Returns the program area of memory as a human readable string.
    pub fn dump_ram(&self, count: usize) -> Result<String, fmt::Error> {
        let ram = self.memory.as_slice();
        let end = MEM_START.saturating_add(count).min(MEM_SIZE);
        let mut buf = String::new();

        for (i, op) in ram[MEM_START..end].chunks(2).enumerate() {
            let addr = MEM_START + i * 2;
            match op {
                [a, b] => writeln!(buf, "{addr:04X}: {a:02X}{b:02X}")?,
                [a] => writeln!(buf, "{addr:04X}: {a:02X}")?,
                _ => {}
            }
        }

        Ok(buf)
    }

    pub fn dump_display(&self) -> Result<String, fmt::Error> {
        self.display.dump()
    }

    pub fn dump_keys(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        if self.keypad.any_key() {
            write!(buf, "keys:")?;
            for i in 0..KEY_COUNT {
                if self.keypad.is_pressed(i) {
                    write!(buf, " k{i:x}")?;
                }
            }
        }

        Ok(buf)
    }
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace(pc: Address, instr: &Instr) {
    log::trace!("{pc:04X}: {:04X}  {instr}", instr.word);
}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace(_: Address, _: &Instr) {}
