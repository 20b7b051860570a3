use chip8_core::{constants::*, prelude::*};

fn load(bytecode: &[u8]) -> Chip8Vm {
    let mut vm = Chip8Vm::new(Chip8Conf {
        rng_seed: Some(1337),
        ..Default::default()
    });
    vm.load_bytecode(bytecode).unwrap();
    vm
}

fn v(vm: &Chip8Vm, vx: u8) -> u8 {
    vm.cpu().register(vx)
}

#[test]
fn test_initial_state() {
    let programs: [&[u8]; 3] = [&[], &[0x60, 0xFF], &[0xAB; MAX_PROGRAM_SIZE]];

    for program in programs {
        let vm = load(program);
        let cpu = vm.cpu();
        assert_eq!(cpu.pc(), 0x200);
        assert_eq!(cpu.address(), 0);
        assert_eq!(cpu.delay_timer(), 0);
        assert_eq!(cpu.sound_timer(), 0);
        assert_eq!(cpu.registers(), &[0; REGISTER_COUNT]);
        assert!(cpu.stack().is_empty());
    }
}

#[test]
fn test_program_too_large() {
    let mut vm = load(&[0x60, 0x01]);

    let result = vm.load_bytecode(&vec![0; MAX_PROGRAM_SIZE + 1]);
    assert_eq!(
        result,
        Err(Chip8Error::LargeProgram {
            len: MAX_PROGRAM_SIZE + 1
        })
    );

    // Previous program is untouched.
    assert_eq!(vm.memory().read_byte(MEM_START), Ok(0x60));
}

/// 6XNN (LD Vx, byte)
#[test]
fn test_load_byte_every_register() {
    for x in 0..16_u8 {
        for nn in 0..=255_u8 {
            let mut vm = load(&[0x60 | x, nn]);
            assert_eq!(vm.step(), Ok(Flow::Ok));
            assert_eq!(v(&vm, x), nn);
        }
    }
}

/// 7XNN (ADD Vx, byte) wraps without touching the flag.
#[test]
#[rustfmt::skip]
fn test_add_byte_wraps() {
    let mut vm = load(&[
        0x63, 0xFA, // LD v3, 250
        0x6F, 0x07, // LD vF, 7
        0x73, 0x0A, // ADD v3, 10
    ]);
    vm.run_steps(3).unwrap();

    assert_eq!(v(&vm, 3), 4);
    assert_eq!(v(&vm, 0xF), 7);
}

/// 8XY4 (ADD Vx, Vy)
#[test]
#[rustfmt::skip]
fn test_add_carry() {
    let mut vm = load(&[
        0x60, 0xC8, // LD v0, 200
        0x61, 0x64, // LD v1, 100
        0x80, 0x14, // ADD v0, v1
    ]);
    vm.run_steps(3).unwrap();
    assert_eq!(v(&vm, 0), 44);
    assert_eq!(v(&vm, 0xF), 1);

    let mut vm = load(&[
        0x6F, 0x01, // LD vF, 1
        0x60, 0x0A, // LD v0, 10
        0x61, 0x14, // LD v1, 20
        0x80, 0x14, // ADD v0, v1
    ]);
    vm.run_steps(4).unwrap();
    assert_eq!(v(&vm, 0), 30);
    assert_eq!(v(&vm, 0xF), 0);
}

/// 8XY5 (SUB Vx, Vy)
#[test]
#[rustfmt::skip]
fn test_sub_borrow() {
    let mut vm = load(&[
        0x60, 0x05, // LD v0, 5
        0x61, 0x0A, // LD v1, 10
        0x80, 0x15, // SUB v0, v1
    ]);
    vm.run_steps(3).unwrap();
    assert_eq!(v(&vm, 0), 251);
    assert_eq!(v(&vm, 0xF), 0);

    let mut vm = load(&[
        0x60, 0x0A, // LD v0, 10
        0x61, 0x05, // LD v1, 5
        0x80, 0x15, // SUB v0, v1
    ]);
    vm.run_steps(3).unwrap();
    assert_eq!(v(&vm, 0), 5);
    assert_eq!(v(&vm, 0xF), 1);

    // Equal values do not borrow
    let mut vm = load(&[
        0x60, 0x0A, // LD v0, 10
        0x61, 0x0A, // LD v1, 10
        0x80, 0x15, // SUB v0, v1
    ]);
    vm.run_steps(3).unwrap();
    assert_eq!(v(&vm, 0), 0);
    assert_eq!(v(&vm, 0xF), 1);
}

/// 8XY7 (SUBN Vx, Vy)
#[test]
#[rustfmt::skip]
fn test_sub_reverse() {
    let mut vm = load(&[
        0x60, 0x0A, // LD v0, 10
        0x61, 0x05, // LD v1, 5
        0x80, 0x17, // SUBN v0, v1
    ]);
    vm.run_steps(3).unwrap();
    assert_eq!(v(&vm, 0), 251);
    assert_eq!(v(&vm, 0xF), 0);

    let mut vm = load(&[
        0x60, 0x05, // LD v0, 5
        0x61, 0x0A, // LD v1, 10
        0x80, 0x17, // SUBN v0, v1
    ]);
    vm.run_steps(3).unwrap();
    assert_eq!(v(&vm, 0), 5);
    assert_eq!(v(&vm, 0xF), 1);
}

/// 8XY6 (SHR Vx) and 8XYE (SHL Vx)
#[test]
#[rustfmt::skip]
fn test_shifts() {
    let mut vm = load(&[
        0x60, 0x81, // LD v0, 0b1000_0001
        0x80, 0x06, // SHR v0
    ]);
    vm.run_steps(2).unwrap();
    assert_eq!(v(&vm, 0), 0b0100_0000);
    assert_eq!(v(&vm, 0xF), 1);

    let mut vm = load(&[
        0x60, 0x81, // LD v0, 0b1000_0001
        0x80, 0x0E, // SHL v0
    ]);
    vm.run_steps(2).unwrap();
    assert_eq!(v(&vm, 0), 0b0000_0010);
    assert_eq!(v(&vm, 0xF), 1);

    let mut vm = load(&[
        0x60, 0x40, // LD v0, 0b0100_0000
        0x6F, 0x09, // LD vF, 9
        0x80, 0x0E, // SHL v0
    ]);
    vm.run_steps(3).unwrap();
    assert_eq!(v(&vm, 0), 0b1000_0000);
    assert_eq!(v(&vm, 0xF), 0);
}

/// Bitwise 8XY0 - 8XY3
#[test]
#[rustfmt::skip]
fn test_logic() {
    let mut vm = load(&[
        0x60, 0xF0, // LD v0, 0xF0
        0x61, 0x3C, // LD v1, 0x3C
        0x82, 0x00, // LD v2, v0
        0x82, 0x11, // OR v2, v1
        0x83, 0x00, // LD v3, v0
        0x83, 0x12, // AND v3, v1
        0x84, 0x00, // LD v4, v0
        0x84, 0x13, // XOR v4, v1
        0x85, 0x10, // LD v5, v1
    ]);
    vm.run_steps(9).unwrap();
    assert_eq!(v(&vm, 2), 0xFC);
    assert_eq!(v(&vm, 3), 0x30);
    assert_eq!(v(&vm, 4), 0xCC);
    assert_eq!(v(&vm, 5), 0x3C);
}

/// When VF is the destination, the flag overwrites the result.
#[test]
#[rustfmt::skip]
fn test_flag_wins_over_data() {
    let mut vm = load(&[
        0x6F, 0xFF, // LD vF, 255
        0x61, 0x01, // LD v1, 1
        0x8F, 0x14, // ADD vF, v1  ; result 0, carry 1
    ]);
    vm.run_steps(3).unwrap();
    assert_eq!(v(&vm, 0xF), 1);

    let mut vm = load(&[
        0x6F, 0x02, // LD vF, 2
        0x8F, 0xF6, // SHR vF  ; result 1, shifted out 0
    ]);
    vm.run_steps(2).unwrap();
    assert_eq!(v(&vm, 0xF), 0);
}

/// 00E0 (CLS) after any drawing leaves the display blank.
#[test]
#[rustfmt::skip]
fn test_clear_after_draws() {
    let mut vm = load(&[
        0x00, 0xE0, // CLS
        0xA0, 0x50, // LD I, 0x050  ; font glyph "0"
        0x60, 0x3C, // LD v0, 60
        0x61, 0x1E, // LD v1, 30
        0xD0, 0x15, // DRW v0, v1, 5  ; straddles the corner
        0xD1, 0x0F, // DRW v1, v0, 15
        0xF2, 0x29, // LD F, v2
        0xD2, 0x25, // DRW v2, v2, 5
        0x00, 0xE0, // CLS
    ]);

    vm.run_steps(8).unwrap();
    assert!(vm.display().lit_count() > 0);

    assert_eq!(vm.step(), Ok(Flow::Draw));
    assert!(vm.display_buffer().iter().all(|px| !px));
}

/// DXYN twice at the same place restores the display, and only the
/// second draw reports a collision.
#[test]
#[rustfmt::skip]
fn test_draw_twice_restores() {
    let mut vm = load(&[
        0xA0, 0x6E, // LD I, 0x06E  ; font glyph "6"
        0x60, 0x0A, // LD v0, 10
        0x61, 0x05, // LD v1, 5
        0xD0, 0x15, // DRW v0, v1, 5
        0xD0, 0x15, // DRW v0, v1, 5
    ]);

    vm.run_steps(3).unwrap();
    let before = vm.snapshot().display;

    assert_eq!(vm.step(), Ok(Flow::Draw));
    assert_eq!(v(&vm, 0xF), 0);
    assert_ne!(vm.snapshot().display, before);
    // Glyph "6" top row 0xF0
    assert!(vm.display().get(10, 5));
    assert!(vm.display().get(13, 5));
    assert!(!vm.display().get(14, 5));

    assert_eq!(vm.step(), Ok(Flow::Draw));
    assert_eq!(v(&vm, 0xF), 1);
    assert_eq!(vm.snapshot().display, before);
}

/// Sprites past the right edge are clipped, not wrapped.
#[test]
#[rustfmt::skip]
fn test_draw_clips_at_edge() {
    let mut vm = load(&[
        0xA2, 0x08, // LD I, 0x208
        0x60, 0x3E, // LD v0, 62
        0xD0, 0x01, // DRW v0, v0, 1  ; y = 62 % 32 = 30
        0x12, 0x06, // JP 0x206
        0xFF,       // sprite
    ]);
    vm.run_steps(3).unwrap();

    assert_eq!(vm.display().lit_count(), 2);
    assert!(vm.display().get(62, 30));
    assert!(vm.display().get(63, 30));
    assert!(!vm.display().get(0, 30));
}

/// Fx33 (LD B, Vx)
#[test]
#[rustfmt::skip]
fn test_bcd() {
    let mut vm = load(&[
        0x60, 0x9C, // LD v0, 156
        0xA3, 0x00, // LD I, 0x300
        0xF0, 0x33, // LD B, v0
    ]);
    vm.run_steps(3).unwrap();

    assert_eq!(vm.memory().slice(0x300, 3).unwrap(), &[1, 5, 6]);
    assert_eq!(vm.cpu().address(), 0x300);
}

/// Fx55 (LD [I], Vx) then Fx65 (LD Vx, [I]) copies registers out and back.
#[test]
fn test_store_load_round_trip() {
    let mut program = vec![];
    for x in 0..16_u8 {
        program.extend_from_slice(&[0x60 | x, x.wrapping_mul(37).wrapping_add(11)]);
    }
    program.extend_from_slice(&[0xA3, 0x00]); // LD I, 0x300
    program.extend_from_slice(&[0xFF, 0x55]); // LD [I], vF
    for x in 0..16_u8 {
        program.extend_from_slice(&[0x60 | x, 0x00]);
    }
    program.extend_from_slice(&[0xFF, 0x65]); // LD vF, [I]

    let mut vm = load(&program);
    vm.run_steps(18).unwrap();
    let stored = *vm.cpu().registers();
    assert_eq!(vm.memory().slice(0x300, 16).unwrap(), &stored);

    vm.run_steps(16).unwrap();
    assert_eq!(vm.cpu().registers(), &[0; 16]);

    vm.run_steps(1).unwrap();
    assert_eq!(vm.cpu().registers(), &stored);
    // I is not incremented
    assert_eq!(vm.cpu().address(), 0x300);
}

/// Only V0 through Vx are touched.
#[test]
#[rustfmt::skip]
fn test_store_partial() {
    let mut vm = load(&[
        0x60, 0x11, // LD v0, 0x11
        0x61, 0x22, // LD v1, 0x22
        0x62, 0x33, // LD v2, 0x33
        0xA3, 0x00, // LD I, 0x300
        0xF1, 0x55, // LD [I], v1
    ]);
    vm.run_steps(5).unwrap();

    assert_eq!(vm.memory().slice(0x300, 3).unwrap(), &[0x11, 0x22, 0x00]);
}

fn assert_skip(program: &[u8], setup_steps: usize, keys: &[u8], expected_advance: u16) {
    let mut vm = load(program);
    vm.run_steps(setup_steps).unwrap();
    for key in keys {
        vm.set_key_id(*key, true).unwrap();
    }

    let pc = vm.cpu().pc();
    vm.step().unwrap();
    assert_eq!(
        vm.cpu().pc() - pc,
        expected_advance,
        "program {program:02X?} keys {keys:?}"
    );
}

#[test]
#[rustfmt::skip]
fn test_skips() {
    // 3XNN (SE Vx, byte)
    assert_skip(&[0x60, 0x07, 0x30, 0x07], 1, &[], 4);
    assert_skip(&[0x60, 0x07, 0x30, 0x08], 1, &[], 2);
    // 4XNN (SNE Vx, byte)
    assert_skip(&[0x60, 0x07, 0x40, 0x08], 1, &[], 4);
    assert_skip(&[0x60, 0x07, 0x40, 0x07], 1, &[], 2);
    // 5XY0 (SE Vx, Vy)
    assert_skip(&[0x60, 0x07, 0x61, 0x07, 0x50, 0x10], 2, &[], 4);
    assert_skip(&[0x60, 0x07, 0x61, 0x08, 0x50, 0x10], 2, &[], 2);
    // 9XY0 (SNE Vx, Vy)
    assert_skip(&[0x60, 0x07, 0x61, 0x08, 0x90, 0x10], 2, &[], 4);
    assert_skip(&[0x60, 0x07, 0x61, 0x07, 0x90, 0x10], 2, &[], 2);
    // EX9E (SKP Vx)
    assert_skip(&[0x60, 0x0B, 0xE0, 0x9E], 1, &[0xB], 4);
    assert_skip(&[0x60, 0x0B, 0xE0, 0x9E], 1, &[0xA], 2);
    // EXA1 (SKNP Vx)
    assert_skip(&[0x60, 0x0B, 0xE0, 0xA1], 1, &[0xA], 4);
    assert_skip(&[0x60, 0x0B, 0xE0, 0xA1], 1, &[0xB], 2);
    // Only the low nibble of Vx selects the key.
    assert_skip(&[0x60, 0x1B, 0xE0, 0x9E], 1, &[0xB], 4);
}

/// 2NNN (CALL addr) and 00EE (RET)
#[test]
#[rustfmt::skip]
fn test_call_return() {
    let mut vm = load(&[
        0x22, 0x06, // CALL 0x206
        0x61, 0x01, // LD v1, 1
        0x12, 0x04, // JP 0x204
        0x00, 0xEE, // RET
    ]);

    assert_eq!(vm.step(), Ok(Flow::Jump));
    assert_eq!(vm.cpu().pc(), 0x206);
    assert_eq!(vm.cpu().stack(), &[0x202]);

    assert_eq!(vm.step(), Ok(Flow::Jump));
    assert_eq!(vm.cpu().pc(), 0x202);
    assert!(vm.cpu().stack().is_empty());
}

/// Sixteen levels of nesting fill the stack exactly.
#[test]
fn test_call_nested_stack_boundary() {
    // Chain of 16 subroutines, each calling the next, the last returns.
    let mut program = vec![];
    for i in 0..STACK_SIZE as u16 {
        let target = 0x200 + (i + 1) * 4;
        program.extend_from_slice(&[0x20 | (target >> 8) as u8, target as u8]); // CALL next
        program.extend_from_slice(&[0x00, 0xEE]); // RET
    }
    program.extend_from_slice(&[0x00, 0xEE]); // RET

    let mut vm = load(&program);

    vm.run_steps(STACK_SIZE).unwrap();
    assert_eq!(vm.cpu().sp(), STACK_SIZE);
    assert_eq!(vm.cpu().pc() as usize, 0x200 + STACK_SIZE * 4);

    // Unwind every level, landing after each call site.
    for level in (0..STACK_SIZE as u16).rev() {
        vm.step().unwrap();
        assert_eq!(vm.cpu().pc(), 0x200 + level * 4 + 2);
    }
    assert_eq!(vm.cpu().sp(), 0);

    // The outermost RET has nothing to return to.
    assert_eq!(
        vm.step(),
        Err(Chip8Error::StackUnderflow { pc: 0x202 })
    );
}

#[test]
fn test_stack_overflow_halts() {
    let mut vm = load(&[0x22, 0x00]); // CALL 0x200

    vm.run_steps(STACK_SIZE).unwrap();
    assert_eq!(
        vm.step(),
        Err(Chip8Error::StackOverflow { pc: 0x200 })
    );
    assert!(vm.is_halted());
    assert_eq!(vm.step(), Ok(Flow::Interrupt));
    assert_eq!(vm.cpu().sp(), STACK_SIZE);
}

#[test]
#[rustfmt::skip]
fn test_memory_out_of_bounds() {
    // Register dump past the end of memory
    let mut vm = load(&[
        0xAF, 0xFF, // LD I, 0xFFF
        0xF2, 0x55, // LD [I], v2
    ]);
    vm.step().unwrap();
    assert_eq!(vm.step(), Err(Chip8Error::MemoryOutOfBounds { addr: MEM_SIZE }));
    assert!(vm.is_halted());

    // Sprite read past the end of memory
    let mut vm = load(&[
        0xAF, 0xFE, // LD I, 0xFFE
        0xD0, 0x05, // DRW v0, v0, 5
    ]);
    vm.step().unwrap();
    assert!(vm.step().is_err());
    assert_eq!(vm.display().lit_count(), 0);

    // BCD with I wrapped far out of memory
    let mut vm = load(&[
        0x60, 0xFF, // LD v0, 255
        0xAF, 0xFF, // LD I, 0xFFF
        0xF0, 0x1E, // ADD I, v0
        0xF0, 0x33, // LD B, v0
    ]);
    vm.run_steps(3).unwrap();
    assert_eq!(vm.cpu().address(), 0x10FE);
    assert_eq!(vm.step(), Err(Chip8Error::MemoryOutOfBounds { addr: 0x10FE }));

    // Fetch straddling the end of memory
    let mut vm = load(&[0x1F, 0xFF]); // JP 0xFFF
    vm.step().unwrap();
    assert_eq!(vm.step(), Err(Chip8Error::MemoryOutOfBounds { addr: MEM_SIZE }));
    assert_eq!(vm.cpu().pc(), 0xFFF);
}

/// Fx07, Fx15 and the timer tick.
#[test]
#[rustfmt::skip]
fn test_delay_timer() {
    let mut vm = load(&[
        0x60, 0x03, // LD v0, 3
        0xF0, 0x15, // LD DT, v0
        0xF1, 0x07, // LD v1, DT
        0xF2, 0x07, // LD v2, DT
    ]);
    vm.run_steps(3).unwrap();
    assert_eq!(v(&vm, 1), 3);

    vm.tick_timers();
    vm.step().unwrap();
    assert_eq!(v(&vm, 2), 2);

    for _ in 0..10 {
        vm.tick_timers();
    }
    assert_eq!(vm.cpu().delay_timer(), 0);
}

/// Fx1E (ADD I, Vx) and Fx29 (LD F, Vx)
#[test]
#[rustfmt::skip]
fn test_address_register() {
    let mut vm = load(&[
        0xA1, 0x00, // LD I, 0x100
        0x60, 0x20, // LD v0, 0x20
        0xF0, 0x1E, // ADD I, v0
        0x6F, 0x05, // LD vF, 5
        0xF0, 0x1E, // ADD I, v0
    ]);
    vm.run_steps(3).unwrap();
    assert_eq!(vm.cpu().address(), 0x120);

    vm.run_steps(2).unwrap();
    assert_eq!(vm.cpu().address(), 0x140);
    // No flag
    assert_eq!(v(&vm, 0xF), 5);

    let mut vm = load(&[
        0x60, 0x0A, // LD v0, 0xA
        0xF0, 0x29, // LD F, v0
    ]);
    vm.run_steps(2).unwrap();
    assert_eq!(vm.cpu().address(), FONTSET_START + 10 * 5);
    assert_eq!(
        vm.memory().slice(vm.cpu().address() as usize, 5).unwrap(),
        &chip8_core::FONTSET[50..55]
    );
}

/// Bnnn (JP V0, addr)
#[test]
#[rustfmt::skip]
fn test_jump_offset() {
    let mut vm = load(&[
        0x60, 0x04, // LD v0, 4
        0xB3, 0x00, // JP V0, 0x300
    ]);
    vm.step().unwrap();
    assert_eq!(vm.step(), Ok(Flow::Jump));
    assert_eq!(vm.cpu().pc(), 0x304);
}

/// Cxnn (RND Vx, byte) is masked and reproducible with a seed.
#[test]
fn test_random_seeded() {
    let mut program = vec![];
    for x in 0..8_u8 {
        program.extend_from_slice(&[0xC0 | x, 0x0F]);
    }

    let mut a = load(&program);
    let mut b = load(&program);
    a.run_steps(8).unwrap();
    b.run_steps(8).unwrap();

    assert_eq!(a.cpu().registers(), b.cpu().registers());
    assert!(a.cpu().registers().iter().all(|r| *r <= 0x0F));
}

#[test]
fn test_independent_machines() {
    let mut a = load(&[0x60, 0x01]);
    let b = load(&[0x60, 0x02]);

    a.step().unwrap();
    assert_eq!(v(&a, 0), 1);
    assert_eq!(v(&b, 0), 0);
    assert_eq!(b.cpu().pc(), 0x200);
}

#[test]
fn test_set_input_vector() {
    let mut vm = load(&[0xF4, 0x0A]); // LD v4, K
    assert_eq!(vm.step(), Ok(Flow::KeyWait));

    let mut keys = [false; 16];
    keys[0xE] = true;
    keys[0x9] = true;
    vm.set_input(keys);

    assert_eq!(vm.step(), Ok(Flow::Ok));
    assert_eq!(v(&vm, 4), 0x9);
}
