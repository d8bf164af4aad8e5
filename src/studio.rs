use std::sync::Arc;
use std::time::Duration;

use crossterm::event::KeyCode;

use crate::assembler::Assembler;
use crate::control::{validate_frequency, Controls, RunState};
use crate::error::{AssembleError, ConfigError, ControlError, StudioError};
use crate::machine::{MachineState, SharedMachine};
use crate::present::Presenter;
use crate::scheduler::Scheduler;
use crate::system::System;
use crate::video::Framebuffer;

/// how long a single step may take beyond two tick intervals
const STEP_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub run_state: RunState,
    pub frequency: u32,
    pub steps: u64,
    pub errors: u64,
    pub last_error: Option<String>,
}

/// The control surface: everything a front end does to the machine goes
/// through here. Owns the scheduler thread for its whole lifetime.
pub struct Studio<S> {
    machine: SharedMachine<S>,
    controls: Arc<Controls>,
    presenter: Presenter<S>,
    scheduler: Scheduler,
}

impl<S: System + 'static> Studio<S> {
    /// Boot `system` against `state` and start the scheduler, paused.
    /// A non-positive `frequency` is rejected before anything is booted.
    pub fn new(system: S, state: MachineState, frequency: i64) -> Result<Self, StudioError> {
        let controls = Arc::new(Controls::new(validate_frequency(frequency)?));
        let machine = SharedMachine::new(system, state);
        let scheduler = Scheduler::spawn(machine.clone(), Arc::clone(&controls))?;
        Ok(Studio {
            presenter: Presenter::new(machine.clone()),
            machine,
            controls,
            scheduler,
        })
    }

    pub fn machine(&self) -> &SharedMachine<S> {
        &self.machine
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn run(&self) {
        self.controls.run();
    }

    pub fn pause(&self) {
        self.controls.pause();
    }

    pub fn toggle(&self) {
        match self.controls.run_state() {
            RunState::Running => self.pause(),
            _ => self.run(),
        }
    }

    /// execute exactly one step and return once it has completed, so the
    /// caller can read the post-step state straight away
    pub fn step(&self) -> Result<(), ControlError> {
        self.controls
            .step(self.controls.interval() * 2 + STEP_GRACE)
    }

    /// pause, then reset the interpreter under the machine lock
    pub fn reset(&self) {
        self.controls.pause();
        self.machine.reset();
        self.controls.request_redraw();
    }

    pub fn set_frequency(&self, hz: i64) -> Result<(), ConfigError> {
        self.controls.set_frequency(hz)
    }

    /// Assemble `source` and, only if that is clean and non-empty, pause and
    /// swap the program in. A failed assembly leaves program and run state
    /// exactly as they were. Returns the new program size.
    pub fn assemble(
        &self,
        assembler: &mut dyn Assembler,
        name: &str,
        source: &[u8],
    ) -> Result<usize, AssembleError> {
        let assembly = assembler.assemble(name, source);
        if !assembly.is_clean() {
            return Err(AssembleError::Diagnostics(assembly.diagnostics));
        }
        if assembly.program.is_empty() {
            return Err(AssembleError::Empty);
        }

        let size = assembly.program.len();
        self.controls.pause();
        self.machine.replace_program(assembly.program);
        self.controls.request_redraw();
        Ok(size)
    }

    pub fn press_key(&self, code: KeyCode) {
        self.machine.press_key(code);
    }

    /// render a frame for a viewport `viewport_width` pixels wide
    pub fn present(&self, viewport_width: usize) -> Option<Framebuffer> {
        self.presenter.frame(viewport_width)
    }

    /// has the scheduler asked for a redraw since the last call
    pub fn take_redraw(&self) -> bool {
        self.controls.take_redraw()
    }

    pub fn dump(&self, label: &str) -> String {
        self.machine.dump(label)
    }

    pub fn stats(&self) -> Stats {
        Stats {
            run_state: self.controls.run_state(),
            frequency: self.controls.frequency(),
            steps: self.controls.steps(),
            errors: self.controls.errors(),
            last_error: self.controls.last_error(),
        }
    }

    /// stop the scheduler; the machine stays readable afterwards
    pub fn shutdown(self) {
        self.scheduler.shutdown();
    }
}
