//! Monochrome display buffer.
use std::fmt::{self, Write};

use crate::constants::*;

/// Read-only view of the display cells, row major.
pub type Chip8DisplayBuffer<'a> = &'a [bool; DISPLAY_BUFFER_SIZE];

/// Screen buffer that sprites are drawn to.
///
/// Sprites are positioned with their top left corner wrapped around
/// the screen, but the pixels of a sprite that extend past the right
/// or bottom edge are clipped.
pub struct Display {
    cells: Box<[bool; DISPLAY_BUFFER_SIZE]>,
}

impl Default for Display {
    fn default() -> Self {
        Self {
            cells: Box::new([false; DISPLAY_BUFFER_SIZE]),
        }
    }
}

impl Display {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn clear(&mut self) {
        self.cells.fill(false);
    }

    /// State of the pixel at the given coordinate.
    ///
    /// Coordinates outside the screen are always off.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        index(x, y).map(|d| self.cells[d]).unwrap_or(false)
    }

    /// Flip the pixel at the given coordinate.
    ///
    /// Returns `true` when the pixel was on and has been erased.
    /// Coordinates outside the screen are ignored.
    #[inline]
    pub fn toggle(&mut self, x: usize, y: usize) -> bool {
        match index(x, y) {
            Some(d) => {
                let old_px = self.cells[d];
                self.cells[d] = !old_px;
                old_px
            }
            None => false,
        }
    }

    /// XOR a sprite onto the display.
    ///
    /// Each byte in `sprite` is a row of 8 pixels, most significant bit
    /// on the left. Returns `true` when any pixel was erased, which is
    /// how programs detect collisions.
    pub fn draw_sprite(&mut self, x: u8, y: u8, sprite: &[u8]) -> bool {
        let x = x as usize % DISPLAY_WIDTH;
        let y = y as usize % DISPLAY_HEIGHT;
        let mut is_erased = false;

        for (r, row) in sprite.iter().enumerate() {
            for c in 0..SPRITE_WIDTH {
                if (row >> (7 - c)) & 1 != 0 {
                    // XOR erases a pixel when both the old and new values are both 1.
                    is_erased |= self.toggle(x + c, y + r);
                }
            }
        }

        is_erased
    }

    pub fn buffer(&self) -> Chip8DisplayBuffer {
        &self.cells
    }

    /// Owned copy of the cells, for handing to another thread.
    pub fn snapshot(&self) -> Box<[bool; DISPLAY_BUFFER_SIZE]> {
        self.cells.clone()
    }

    /// Number of pixels that are on.
    pub fn lit_count(&self) -> usize {
        self.cells.iter().filter(|px| **px).count()
    }

    /// Render the display as text, `#` for on and `.` for off.
    pub fn dump(&self) -> Result<String, fmt::Error> {
        let mut buf = String::with_capacity((DISPLAY_WIDTH + 1) * DISPLAY_HEIGHT);

        for row in self.cells.chunks(DISPLAY_WIDTH) {
            for px in row {
                buf.write_char(if *px { '#' } else { '.' })?;
            }
            writeln!(buf)?;
        }

        Ok(buf)
    }
}

/// Flat buffer index, or `None` when the coordinate is off screen.
#[inline(always)]
fn index(x: usize, y: usize) -> Option<usize> {
    if x < DISPLAY_WIDTH && y < DISPLAY_HEIGHT {
        Some(x + y * DISPLAY_WIDTH)
    } else {
        None
    }
}
