//! Fixed-frequency stepping loop.
//!
//! One dedicated thread owns stepping. Each tick sleeps for one interval at
//! the frequency read at the start of the tick, then steps the interpreter
//! once if the controls allow it. Rendering never happens here: a dirty
//! display only raises a redraw request for the presentation side.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::control::{Controls, RunState};
use crate::machine::SharedMachine;
use crate::system::System;

pub struct Scheduler {
    controls: Arc<Controls>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn spawn<S>(machine: SharedMachine<S>, controls: Arc<Controls>) -> io::Result<Self>
    where
        S: System + 'static,
    {
        let handle = {
            let controls = Arc::clone(&controls);
            thread::Builder::new()
                .name("scheduler".into())
                .spawn(move || run(&machine, &controls))?
        };
        Ok(Scheduler {
            controls,
            handle: Some(handle),
        })
    }

    /// stop ticking and wait for the thread; a step in progress completes first
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.controls.request_shutdown();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("scheduler thread panicked");
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<S: System>(machine: &SharedMachine<S>, controls: &Controls) {
    log::debug!("scheduler started at {} Hz", controls.frequency());
    while !controls.is_shutdown() {
        spin_sleep::sleep(controls.interval());
        if controls.is_shutdown() {
            break;
        }
        tick(machine, controls);
    }
    log::debug!("scheduler stopped after {} steps", controls.steps());
}

/// one pass of the loop, minus the sleep. returns whether a step ran
pub(crate) fn tick<S: System>(machine: &SharedMachine<S>, controls: &Controls) -> bool {
    if controls.run_state() == RunState::Paused {
        return false;
    }

    let state = {
        let mut m = machine.lock();
        // a pause that landed while waiting for the lock still wins
        let state = controls.run_state();
        if state == RunState::Paused {
            return false;
        }
        if let Err(e) = m.step() {
            log::warn!("step failed: {}", e);
            controls.record_error(e.to_string());
        }
        controls.count_step();
        if m.system.invalid() {
            controls.request_redraw();
        }
        state
    };

    if state == RunState::StepOnce {
        controls.finish_step();
    }
    true
}
