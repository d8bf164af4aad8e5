//!
//! ## Design
//!
//! * step an interpreter at a fixed virtual cpu frequency on its own thread
//! * show its screen and take keypad input from another thread, the front end
//! * treat the interpreter and the assembler as external: the studio only
//!   talks to them through `System`, `Host` and `Assembler`
//! * abstract the display so can plug alternatives; starting with TUI in-console
//! * log into a buffer shown in an output pane, never onto the terminal the
//!   TUI owns
//!
//! Synchronisation comes in two tiers:
//!
//! * one mutex around the machine (interpreter + program, keypad, video):
//!    - stepping, resetting, rendering and program replacement each hold it
//!      for their whole duration, so none of them ever sees another half done
//!    - program replacement and the reset that follows share one critical
//!      section
//! * atomics for the scalars polled every tick:
//!    - run state (paused / running / step once)
//!    - cpu frequency, re-read at the start of each tick
//!    - redraw request, raised by the scheduler, consumed by the front end
//!
//! Model
//!
//! Studio
//!  |-- SharedMachine(System, MachineState(program, keypad, video, sound))
//!  |-- Controls(run state, frequency, redraw, counters)
//!  |-- Scheduler(SharedMachine, Controls)
//!  |    `-- loop
//!  |         |-- sleep(1 / frequency)
//!  |         `-- if running or stepping once:
//!  |               lock; system.step(); if system.invalid() { request redraw }; unlock
//!  |               if stepping once { back to paused; wake the waiting caller }
//!  `-- Presenter(SharedMachine)
//!       `-- once per displayed frame:
//!             lock; system.invalidate(); system.refresh() -> Host::draw
//!                   -> palette -> framebuffer -> nearest-neighbour scale; unlock
pub mod assembler;
pub mod cli;
pub mod config;
pub mod control;
pub mod demo;
pub mod display;
pub mod error;
pub mod input;
pub mod machine;
pub mod output;
pub mod present;
pub mod scheduler;
pub mod sound;
pub mod studio;
pub mod system;
pub mod video;

pub use control::{Controls, RunState};
pub use machine::{Machine, MachineGuard, MachineState, SharedMachine};
pub use studio::Studio;
pub use system::{Host, System};
