//! Lock-free run controls shared between the control surface and the
//! scheduler. Everything here is a scalar polled every tick, so it lives in
//! atomics rather than behind the machine lock.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use crate::error::{ConfigError, ControlError};

pub const DEFAULT_CPU_FREQUENCY: NonZeroU32 = match NonZeroU32::new(500) {
    Some(hz) => hz,
    None => panic!("default cpu frequency is zero"),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    Paused = 0,
    Running = 1,
    /// execute one step, then fall back to `Paused`
    StepOnce = 2,
}

impl RunState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => RunState::Running,
            2 => RunState::StepOnce,
            _ => RunState::Paused,
        }
    }
}

/// check a requested cpu frequency, which must be a positive integer
pub fn validate_frequency(hz: i64) -> Result<NonZeroU32, ConfigError> {
    if hz <= 0 {
        return Err(ConfigError::NonPositiveFrequency(hz));
    }
    u32::try_from(hz)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or(ConfigError::FrequencyOutOfRange(hz))
}

#[derive(Debug)]
pub struct Controls {
    run_state: AtomicU8,
    frequency: AtomicU32,
    redraw: AtomicBool,
    shutdown: AtomicBool,
    steps: AtomicU64,
    errors: AtomicU64,
    last_error: Mutex<Option<String>>,
    // one single-step caller at a time, so each gets its own step
    step_caller: Mutex<()>,
    step_lock: Mutex<()>,
    step_done: Condvar,
}

impl Controls {
    pub fn new(frequency: NonZeroU32) -> Self {
        Controls {
            run_state: AtomicU8::new(RunState::Paused as u8),
            frequency: AtomicU32::new(frequency.get()),
            redraw: AtomicBool::new(true),
            shutdown: AtomicBool::new(false),
            steps: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            last_error: Mutex::new(None),
            step_caller: Mutex::new(()),
            step_lock: Mutex::new(()),
            step_done: Condvar::new(),
        }
    }

    pub fn run_state(&self) -> RunState {
        RunState::from_u8(self.run_state.load(Ordering::Acquire))
    }

    pub fn run(&self) {
        self.set_run_state(RunState::Running);
    }

    pub fn pause(&self) {
        self.set_run_state(RunState::Paused);
    }

    fn set_run_state(&self, state: RunState) {
        let prev = self.run_state.swap(state as u8, Ordering::AcqRel);
        if prev != state as u8 {
            log::debug!("run state {:?} -> {:?}", RunState::from_u8(prev), state);
        }
        if prev == RunState::StepOnce as u8 {
            // a pending single step was overridden; release anyone waiting on it
            self.notify_step();
        }
    }

    pub fn frequency(&self) -> u32 {
        self.frequency.load(Ordering::Relaxed)
    }

    /// set the cpu frequency; takes effect from the next tick. invalid values
    /// are rejected and the current frequency is kept
    pub fn set_frequency(&self, hz: i64) -> Result<(), ConfigError> {
        let hz = validate_frequency(hz)?;
        self.frequency.store(hz.get(), Ordering::Relaxed);
        log::info!("cpu frequency set to {} Hz", hz);
        Ok(())
    }

    /// time between two ticks at the current frequency
    pub fn interval(&self) -> Duration {
        // only validated, non-zero frequencies are ever stored
        Duration::from_secs(1) / self.frequency()
    }

    /// Ask the scheduler for exactly one step and block until it has run.
    ///
    /// Gives up after `timeout`, withdrawing the request so a late scheduler
    /// won't execute it. Concurrent callers queue up behind each other and
    /// each one gets a step of its own.
    pub fn step(&self, timeout: Duration) -> Result<(), ControlError> {
        let _caller = self
            .step_caller
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let guard = self
            .step_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.request_step();
        let (_guard, wait) = self
            .step_done
            .wait_timeout_while(guard, timeout, |_| {
                self.run_state() == RunState::StepOnce
            })
            .unwrap_or_else(PoisonError::into_inner);

        if wait.timed_out()
            && self
                .run_state
                .compare_exchange(
                    RunState::StepOnce as u8,
                    RunState::Paused as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
        {
            return Err(ControlError::StepTimeout(timeout));
        }
        Ok(())
    }

    /// queue a single step without waiting for it
    pub(crate) fn request_step(&self) {
        self.run_state
            .store(RunState::StepOnce as u8, Ordering::Release);
    }

    /// scheduler side of `step`: the single step has executed
    pub(crate) fn finish_step(&self) {
        // only collapse StepOnce; a concurrent run/pause wins
        let _ = self.run_state.compare_exchange(
            RunState::StepOnce as u8,
            RunState::Paused as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        self.notify_step();
    }

    fn notify_step(&self) {
        let _guard = self
            .step_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.step_done.notify_all();
    }

    /// mark the displayed frame stale
    pub fn request_redraw(&self) {
        self.redraw.store(true, Ordering::Release);
    }

    /// consume a pending redraw request
    pub fn take_redraw(&self) -> bool {
        self.redraw.swap(false, Ordering::AcqRel)
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    pub(crate) fn count_step(&self) {
        self.steps.fetch_add(1, Ordering::AcqRel);
    }

    /// steps completed since start, failed ones included
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::Acquire)
    }

    pub(crate) fn record_error(&self, message: String) {
        self.errors.fetch_add(1, Ordering::AcqRel);
        *self
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(message);
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Acquire)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for Controls {
    fn default() -> Self {
        Controls::new(DEFAULT_CPU_FREQUENCY)
    }
}
