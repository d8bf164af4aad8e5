//! The single shared machine: interpreter plus the state it runs against,
//! behind one lock.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossterm::event::KeyCode;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::input::Keypad;
use crate::sound::{Mute, Sound};
use crate::system::{Host, System};
use crate::video::{PalettePolicy, VideoPipeline};

/// Everything the interpreter reaches through `Host`.
pub struct MachineState {
    program: Vec<u8>,
    keypad: Keypad,
    video: VideoPipeline,
    sound: Box<dyn Sound>,
}

impl MachineState {
    pub fn new(program: Vec<u8>, palette: PalettePolicy) -> Self {
        MachineState {
            program,
            keypad: Keypad::new(),
            video: VideoPipeline::new(palette),
            sound: Box::new(Mute::new()),
        }
    }

    pub fn with_sound(mut self, sound: Box<dyn Sound>) -> Self {
        self.sound = sound;
        self
    }

    pub fn program(&self) -> &[u8] {
        &self.program
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    pub fn keypad_mut(&mut self) -> &mut Keypad {
        &mut self.keypad
    }

    pub fn video(&self) -> &VideoPipeline {
        &self.video
    }

    pub fn video_mut(&mut self) -> &mut VideoPipeline {
        &mut self.video
    }
}

impl Host for MachineState {
    fn load(&mut self, memory: &mut [u8]) {
        let n = self.program.len().min(memory.len());
        if n < self.program.len() {
            log::warn!(
                "program is {} bytes but only {} fit in memory",
                self.program.len(),
                memory.len()
            );
        }
        memory[..n].copy_from_slice(&self.program[..n]);
    }

    fn key(&self, code: u8) -> bool {
        self.keypad.key(code)
    }

    fn rand(&mut self) -> StdRng {
        StdRng::from_os_rng()
    }

    fn begin_tone(&mut self) {
        if let Err(e) = self.sound.beep() {
            log::warn!("can't start tone: {}", e);
        }
    }

    fn end_tone(&mut self) {
        if let Err(e) = self.sound.stop() {
            log::warn!("can't stop tone: {}", e);
        }
    }

    fn resize_video(&mut self, width: usize) {
        self.video.set_logical_width(width);
    }

    fn draw(&mut self, video: &[u8]) {
        self.video.draw(video);
    }
}

pub struct Machine<S> {
    pub system: S,
    pub state: MachineState,
}

impl<S: System> Machine<S> {
    pub fn step(&mut self) -> Result<(), S::Error> {
        self.system.step(&mut self.state)
    }

    pub fn reset(&mut self) {
        self.system.reset(&mut self.state);
    }

    /// force a redraw of the current scan buffer through the video pipeline
    pub fn refresh(&mut self) {
        self.system.invalidate();
        self.system.refresh(&mut self.state);
    }
}

/// Scoped access to the machine. The lock is released when this is dropped,
/// whichever way the holder leaves its scope.
pub struct MachineGuard<'a, S> {
    inner: MutexGuard<'a, Machine<S>>,
}

impl<S> Deref for MachineGuard<'_, S> {
    type Target = Machine<S>;

    fn deref(&self) -> &Machine<S> {
        &self.inner
    }
}

impl<S> DerefMut for MachineGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut Machine<S> {
        &mut self.inner
    }
}

/// Handle to the one machine shared by the scheduler and the presentation
/// side. Cloning shares, it doesn't copy.
pub struct SharedMachine<S> {
    inner: Arc<Mutex<Machine<S>>>,
}

impl<S> Clone for SharedMachine<S> {
    fn clone(&self) -> Self {
        SharedMachine {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: System> SharedMachine<S> {
    /// wrap a machine, booting the interpreter against its program
    pub fn new(system: S, state: MachineState) -> Self {
        let mut machine = Machine { system, state };
        machine.reset();
        SharedMachine {
            inner: Arc::new(Mutex::new(machine)),
        }
    }

    /// Take the machine lock. A panic on another thread while holding it
    /// leaves the machine as it was; carry on with it.
    pub fn lock(&self) -> MachineGuard<'_, S> {
        MachineGuard {
            inner: self.inner.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    pub fn reset(&self) {
        self.lock().reset();
    }

    /// Swap in a new program and reset onto it inside one critical section,
    /// so no step can ever see a half-replaced program.
    pub fn replace_program(&self, program: Vec<u8>) {
        let mut machine = self.lock();
        log::info!(
            "replacing {} byte program with {} bytes",
            machine.state.program.len(),
            program.len()
        );
        machine.state.program = program;
        machine.reset();
    }

    pub fn press_key(&self, code: KeyCode) {
        self.lock().state.keypad_mut().press(code);
    }

    pub fn dump(&self, label: &str) -> String {
        let machine = self.lock();
        let mut buf = Vec::new();
        if let Err(e) = machine.system.dump(&mut buf, label) {
            log::warn!("dump failed: {}", e);
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Counts what it is asked to do; fails every step while `fail` is set.
    #[derive(Default)]
    pub struct CountingSystem {
        pub steps: u64,
        pub resets: u64,
        pub loaded: Vec<u8>,
        pub dirty: bool,
        pub fail: Arc<AtomicBool>,
        pub seen: Vec<Vec<u8>>,
        /// `steps` as of the last reset
        pub steps_at_reset: u64,
        /// steps whose host program differed from what the last reset loaded
        pub stale_steps: u64,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("step {0} failed")]
    pub struct CountingError(pub u64);

    impl System for CountingSystem {
        type Error = CountingError;

        fn step(&mut self, host: &mut dyn Host) -> Result<(), CountingError> {
            self.steps += 1;
            self.dirty = true;
            self.seen.push(self.loaded.clone());
            let mut current = [0u8; 16];
            host.load(&mut current);
            if current[..] != self.loaded[..] {
                self.stale_steps += 1;
            }
            if self.fail.load(Ordering::Relaxed) {
                return Err(CountingError(self.steps));
            }
            Ok(())
        }

        fn reset(&mut self, host: &mut dyn Host) {
            self.resets += 1;
            let mut memory = [0u8; 16];
            host.load(&mut memory);
            self.loaded = memory.to_vec();
            self.steps_at_reset = self.steps;
            self.dirty = true;
        }

        fn invalidate(&mut self) {
            self.dirty = true;
        }

        fn invalid(&self) -> bool {
            self.dirty
        }

        fn refresh(&mut self, host: &mut dyn Host) {
            if self.dirty {
                host.draw(&[self.steps as u8; 64 * 32]);
                self.dirty = false;
            }
        }

        fn dump(&self, sink: &mut dyn io::Write, label: &str) -> io::Result<()> {
            writeln!(sink, "{}: steps={} resets={}", label, self.steps, self.resets)
        }
    }

    fn shared(program: &[u8]) -> SharedMachine<CountingSystem> {
        SharedMachine::new(
            CountingSystem::default(),
            MachineState::new(program.to_vec(), PalettePolicy::Plan9),
        )
    }

    #[test]
    fn test_new_boots_the_system() {
        let m = shared(&[1, 2, 3]);
        let g = m.lock();
        assert_eq!(g.system.resets, 1);
        assert_eq!(&g.system.loaded[..4], &[1, 2, 3, 0]);
    }

    #[test]
    fn test_load_truncates_oversized_program() {
        let mut state = MachineState::new((0..32).collect(), PalettePolicy::Plan9);
        let mut memory = [0u8; 8];
        state.load(&mut memory);
        assert_eq!(memory, [0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_replace_program_resets_onto_new_image() {
        let m = shared(&[1, 1]);
        m.replace_program(vec![9, 9, 9]);
        let g = m.lock();
        assert_eq!(g.state.program(), &[9, 9, 9]);
        assert_eq!(g.system.resets, 2);
        assert_eq!(&g.system.loaded[..3], &[9, 9, 9]);
    }

    #[test]
    fn test_press_key_reaches_host() {
        let m = shared(&[]);
        m.press_key(KeyCode::Char('a'));
        let g = m.lock();
        assert!(g.state.key(0xa));
        assert!(!g.state.key(0x1));
    }

    #[test]
    fn test_dump() {
        let m = shared(&[]);
        assert_eq!(m.dump("PONG"), "PONG: steps=0 resets=1\n");
    }

    #[test]
    fn test_rand_gives_fresh_sources() {
        use rand::RngCore;
        let mut state = MachineState::new(vec![], PalettePolicy::Plan9);
        let a = (0..4).map(|_| state.rand().next_u64()).collect::<Vec<_>>();
        // four independently seeded generators agreeing would be astronomically unlikely
        assert!(a.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_refresh_draws_through_pipeline() {
        let m = shared(&[]);
        let mut g = m.lock();
        g.state.video_mut().set_viewport_width(64);
        g.refresh();
        assert!(g.state.video().framebuffer().is_some());
        assert!(!g.system.invalid());
    }

    #[test]
    fn test_lock_survives_poisoning() {
        let m = shared(&[]);
        let m2 = m.clone();
        let _ = std::thread::spawn(move || {
            let _g = m2.lock();
            panic!("poison the lock");
        })
        .join();
        assert_eq!(m.lock().system.resets, 1);
    }
}
