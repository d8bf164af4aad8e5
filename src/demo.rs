//! Stand-in interpreter for the studio binary.
//!
//! Treats the program image as a 64x32 one-bit bitmap and scrolls it a column
//! per step, so the scheduler, keypad and video path can be watched without a
//! real CHIP-8 core. Holding a keypad key changes the ink colour.

use std::io;

use thiserror::Error;

use crate::system::{Host, System};

pub const WIDTH: usize = 64;
pub const HEIGHT: usize = 32;
const BITMAP_BYTES: usize = WIDTH * HEIGHT / 8;

const PAPER: u8 = 0x00;
const INK: u8 = 0xff;

/// steps the tone stays on after each full revolution
const TONE_STEPS: usize = 4;

#[derive(Debug, Error)]
pub enum TestCardError {
    #[error("no program loaded; nothing to scroll")]
    Blank,
}

pub struct TestCardSystem {
    bitmap: [u8; BITMAP_BYTES],
    scan: Vec<u8>,
    offset: usize,
    ink: u8,
    steps: u64,
    dirty: bool,
    tone: bool,
}

impl TestCardSystem {
    pub fn new() -> Self {
        TestCardSystem {
            bitmap: [0; BITMAP_BYTES],
            scan: vec![PAPER; WIDTH * HEIGHT],
            offset: 0,
            ink: INK,
            steps: 0,
            dirty: true,
            tone: false,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn scan(&self) -> &[u8] {
        &self.scan
    }

    fn render(&mut self) {
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                let src = (x + self.offset) % WIDTH;
                let bit = 1 & (self.bitmap[y * WIDTH / 8 + src / 8] >> (7 - src % 8));
                self.scan[y * WIDTH + x] = if bit == 1 { self.ink } else { PAPER };
            }
        }
        self.dirty = true;
    }
}

impl Default for TestCardSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for TestCardSystem {
    type Error = TestCardError;

    fn step(&mut self, host: &mut dyn Host) -> Result<(), TestCardError> {
        if self.bitmap.iter().all(|b| *b == 0) {
            return Err(TestCardError::Blank);
        }
        self.steps += 1;
        self.offset = (self.offset + 1) % WIDTH;
        self.ink = match (0..16).find(|k| host.key(*k)) {
            Some(k) => k * 0x10 + 0x0f,
            None => INK,
        };

        let tone = self.offset < TONE_STEPS;
        if tone != self.tone {
            if tone {
                host.begin_tone();
            } else {
                host.end_tone();
            }
            self.tone = tone;
        }

        self.render();
        Ok(())
    }

    fn reset(&mut self, host: &mut dyn Host) {
        self.bitmap = [0; BITMAP_BYTES];
        host.load(&mut self.bitmap);
        host.resize_video(WIDTH);
        if self.tone {
            host.end_tone();
            self.tone = false;
        }
        self.offset = 0;
        self.steps = 0;
        self.ink = INK;
        self.render();
    }

    fn invalidate(&mut self) {
        self.dirty = true;
    }

    fn invalid(&self) -> bool {
        self.dirty
    }

    fn refresh(&mut self, host: &mut dyn Host) {
        if self.dirty {
            host.draw(&self.scan);
            self.dirty = false;
        }
    }

    fn dump(&self, sink: &mut dyn io::Write, label: &str) -> io::Result<()> {
        writeln!(sink, "{}", label)?;
        writeln!(sink, "steps  {}", self.steps)?;
        writeln!(sink, "offset {}", self.offset)?;
        writeln!(sink, "ink    {:#04x}", self.ink)?;
        writeln!(sink, "tone   {}", if self.tone { "on" } else { "off" })?;
        writeln!(sink)?;
        for (row, bytes) in self.bitmap.chunks(WIDTH / 8).enumerate() {
            write!(sink, "{:02}", row)?;
            for b in bytes {
                write!(sink, " {:02x}", b)?;
            }
            writeln!(sink)?;
        }
        Ok(())
    }
}

/// this is a display test card suitable for CHIP8, for testing display routines
#[rustfmt::skip]
pub const CHIP8_TEST_CARD: [u8; 256] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, // 00 XXXXXXX|XXXXXXX|XXXXXXX|XXXXXXX|XXXXXXX|XXXXXXX|XXXXXXX|XXXXXXX|
    0x80, 0x00, 0x00, 0x01, 0x80, 0x00, 0x00, 0x01, // 01 X                              |X                              |
    0x80, 0x00, 0x00, 0x03, 0xc2, 0x41, 0x55, 0x55, // 02 X                             X|XX    X  X     | X X X | X X X |
    0x81, 0xff, 0xff, 0xc5, 0xa2, 0x40, 0xaa, 0xa9, // 03 X      |XXXXXXX|XXXXXXX|XX   X |X X   X  X      X X X X X X X  |
    0x80, 0x00, 0x00, 0x09, 0x92, 0x41, 0x55, 0x55, // 04 X                           X  |X  X  X  X     | X X X | X X X |
    0x81, 0xff, 0xff, 0xc1, 0x82, 0x40, 0xaa, 0xa9, // 05 X      |XXXXXXX|XXXXXXX|XX     |X     X  X      X X X X X X X  |
    0xa0, 0x00, 0x00, 0x01, 0x83, 0xc1, 0x55, 0x55, // 06 X X                            |X     X|XX     | X X X | X X X |
    0xa1, 0xff, 0xff, 0xc1, 0x80, 0x00, 0xaa, 0xa9, // 07 X X    |XXXXXXX|XXXXXXX|XX     |X               X X X X X X X  |
    0xa0, 0x00, 0x00, 0x00, 0x00, 0x01, 0x55, 0x55, // 08 X X                                            | X X X | X X X |
    0xa1, 0xff, 0xff, 0xc0, 0x00, 0x00, 0xaa, 0xa9, // 09 X X    |XXXXXXX|XXXXXXX|XX                      X X X X X X X  |
    0xbc, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, // 10 X XXXX                                                         |
    0x81, 0xff, 0xff, 0xc0, 0x00, 0x00, 0x00, 0x01, // 11 X      |XXXXXXX|XXXXXXX|XX                                     |
    0x88, 0x00, 0x00, 0x01, 0x80, 0x00, 0x00, 0x11, // 12 X   X                          |X                          X   |
    0x91, 0xff, 0xff, 0xc1, 0x80, 0x00, 0x00, 0x09, // 13 X  X   |XXXXXXX|XXXXXXX|XX     |X                           X  |
    0xa0, 0x00, 0x00, 0x01, 0x80, 0x00, 0x00, 0x05, // 14 X X                            |X                            X |
    0xff, 0x80, 0x00, 0x1f, 0xf8, 0x00, 0x01, 0xff, // 15 XXXXXXX|X                  XXXX|XXXXX                  |XXXXXXX|
    0xff, 0x80, 0x00, 0x1f, 0xf8, 0x00, 0x01, 0xff, // 16 XXXXXXX|X                  XXXX|XXXXX                  |XXXXXXX|
    0xa0, 0x00, 0x00, 0x01, 0x80, 0x00, 0x00, 0x05, // 17 X X                            |X                            X |
    0x90, 0x00, 0x00, 0x01, 0x85, 0x55, 0x55, 0x09, // 18 X  X                           |X    X | X X X | X X X |    X  |
    0x88, 0x00, 0x00, 0x01, 0x85, 0x55, 0x55, 0x11, // 19 X   X                          |X    X | X X X | X X X |   X   |
    0x80, 0x00, 0x00, 0x00, 0x05, 0x55, 0x55, 0x01, // 20 X                                    X | X X X | X X X |       |
    0x80, 0x00, 0x00, 0x00, 0x05, 0x55, 0x55, 0x3d, // 21 X                                    X | X X X | X X X |  XXXX |
    0x95, 0x55, 0x40, 0x00, 0x05, 0x55, 0x55, 0x25, // 22 X  X X | X X X | X                   X | X X X | X X X |  X  X |
    0xaa, 0xaa, 0x80, 0x00, 0x05, 0x55, 0x55, 0x3d, // 23 X X X X X X X X X                    X | X X X | X X X |  XXXX |
    0x95, 0x55, 0x40, 0x01, 0x85, 0x55, 0x55, 0x29, // 24 X  X X | X X X | X             |X    X | X X X | X X X |  X X  |
    0xaa, 0xaa, 0x83, 0xc1, 0x85, 0x55, 0x55, 0x25, // 25 X X X X X X X X X     X|XX     |X    X | X X X | X X X |  X  X |
    0x95, 0x55, 0x41, 0x41, 0x85, 0x55, 0x55, 0x01, // 26 X  X X | X X X | X     | X     |X    X | X X X | X X X |       |
    0xaa, 0xaa, 0x81, 0x49, 0x95, 0x55, 0x55, 0x01, // 27 X X X X X X X X X      | X  X  |X  X X | X X X | X X X |       |
    0x95, 0x55, 0x41, 0x45, 0xa5, 0x55, 0x55, 0x01, // 28 X  X X | X X X | X     | X   X |X X  X | X X X | X X X |       |
    0xaa, 0xaa, 0x83, 0xc3, 0xc5, 0x55, 0x55, 0x01, // 29 X X X X X X X X X     X|XX    X|XX   X | X X X | X X X |       |
    0x80, 0x00, 0x00, 0x01, 0x80, 0x00, 0x00, 0x01, // 30 X                              |X                              |
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, // 31 XXXXXXX|XXXXXXX|XXXXXXX|XXXXXXX|XXXXXXX|XXXXXXX|XXXXXXX|XXXXXXX|
]; //                                                  .. 0......78......f0......78......f0......78......f0......78......f

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{MachineState, SharedMachine};
    use crate::video::PalettePolicy;
    use crossterm::event::KeyCode;

    fn machine(program: &[u8]) -> SharedMachine<TestCardSystem> {
        SharedMachine::new(
            TestCardSystem::new(),
            MachineState::new(program.to_vec(), PalettePolicy::Plan9),
        )
    }

    #[test]
    fn test_reset_loads_the_card() {
        let m = machine(&CHIP8_TEST_CARD);
        let g = m.lock();
        // top row is solid, second row only has its edges set
        assert!(g.system.scan()[..WIDTH].iter().all(|p| *p == INK));
        assert_eq!(g.system.scan()[WIDTH], INK);
        assert_eq!(g.system.scan()[WIDTH + 1], PAPER);
        assert_eq!(g.state.video().logical_width(), WIDTH);
    }

    #[test]
    fn test_step_scrolls_one_column() -> Result<(), TestCardError> {
        let m = machine(&CHIP8_TEST_CARD);
        let mut g = m.lock();
        let before = g.system.scan().to_vec();
        g.step()?;
        assert_eq!(g.system.offset(), 1);
        for y in 0..HEIGHT {
            let row = &before[y * WIDTH..(y + 1) * WIDTH];
            let scrolled = &g.system.scan()[y * WIDTH..(y + 1) * WIDTH];
            assert_eq!(&scrolled[..WIDTH - 1], &row[1..]);
            assert_eq!(scrolled[WIDTH - 1], row[0]);
        }
        assert!(g.system.invalid());
        Ok(())
    }

    #[test]
    fn test_offset_wraps() -> Result<(), TestCardError> {
        let m = machine(&CHIP8_TEST_CARD);
        let mut g = m.lock();
        let start = g.system.scan().to_vec();
        for _ in 0..WIDTH {
            g.step()?;
        }
        assert_eq!(g.system.offset(), 0);
        assert_eq!(g.system.scan(), &start[..]);
        Ok(())
    }

    #[test]
    fn test_blank_program_fails_to_step() {
        let m = machine(&[]);
        assert!(matches!(m.lock().step(), Err(TestCardError::Blank)));
    }

    #[test]
    fn test_held_key_changes_ink() -> Result<(), TestCardError> {
        let m = machine(&CHIP8_TEST_CARD);
        m.press_key(KeyCode::Char('2'));
        let mut g = m.lock();
        g.step()?;
        assert_eq!(g.system.scan()[0], 0x2f);
        Ok(())
    }

    #[test]
    fn test_dump_lists_bitmap_rows() {
        let m = machine(&CHIP8_TEST_CARD);
        let text = m.dump("CARD");
        assert!(text.starts_with("CARD\nsteps  0\n"));
        assert!(text.contains("\n00 ff ff ff ff ff ff ff ff\n"));
        assert!(text.contains("\n31 ff ff ff ff ff ff ff ff\n"));
    }

    #[test]
    fn test_refresh_clears_dirty() {
        let m = machine(&CHIP8_TEST_CARD);
        let mut g = m.lock();
        g.state.video_mut().set_viewport_width(64);
        g.refresh();
        assert!(!g.system.invalid());
        let fb = g.state.video().framebuffer().unwrap();
        assert_eq!(fb.pixel(0, 0), [0xff, 0xff, 0xff, 0xff]);
        assert_eq!(fb.pixel(1, 1), [0, 0, 0, 0xff]);
    }
}
