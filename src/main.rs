use std::error::Error;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::event::{self, Event, KeyEvent};

use chip8_studio::assembler::{Assembler, HexAssembler};
use chip8_studio::cli::Cli;
use chip8_studio::config::Config;
use chip8_studio::demo::{TestCardSystem, CHIP8_TEST_CARD};
use chip8_studio::display::{Display, TermDisplay, View};
use chip8_studio::error::AssembleError;
use chip8_studio::input::{command_for, Command, FREQUENCY_STEP};
use chip8_studio::output::{self, OutputLog};
use chip8_studio::sound::{Mute, SimpleBeep, Sound};
use chip8_studio::studio::Stats;
use chip8_studio::{MachineState, Studio};

/// log lines repeated on stderr when the front end fails
const OUTPUT_ON_ERROR: usize = 20;
/// log lines handed to the output pane each frame
const OUTPUT_PANE_LINES: usize = 64;

const HELP: &str = "space run/pause  n step  r reset  +/- speed  m assemble  q quit";

fn main() -> Result<(), Box<dyn Error>> {
    let logs = OutputLog::default();
    output::init(&logs)?;

    // initialise
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let config = cli.merge(config);
    config.validate()?;

    // load a program
    let name = project_name(&config);
    let mut assembler = HexAssembler::new();
    let program = initial_program(&config, &name, &mut assembler)?;

    let sound: Box<dyn Sound> = if config.sound {
        Box::new(SimpleBeep::new())
    } else {
        Box::new(Mute::new())
    };
    let state = MachineState::new(program, config.palette).with_sound(sound);
    let studio = Studio::new(TestCardSystem::new(), state, config.frequency_hz)?;
    if config.start_running {
        studio.run();
    }

    let mut display = TermDisplay::new()?;
    let result = main_loop(&studio, &mut display, &logs, &config, &name, &mut assembler);
    // restore the terminal before anything else gets printed
    drop(display);
    studio.shutdown();
    if result.is_err() && !logs.is_empty() {
        eprintln!("{}", logs.tail(OUTPUT_ON_ERROR));
    }
    result
}

/// upper-cased file stem of whatever is being run, like "PONG"
fn project_name(config: &Config) -> String {
    config
        .source
        .as_deref()
        .or(config.rom.as_deref())
        .and_then(Path::file_stem)
        .map(|stem| stem.to_string_lossy().to_uppercase())
        .unwrap_or_else(|| "TESTCARD".to_string())
}

fn initial_program(
    config: &Config,
    name: &str,
    assembler: &mut dyn Assembler,
) -> Result<Vec<u8>, Box<dyn Error>> {
    if let Some(path) = &config.source {
        let assembly = assembler.assemble(name, &fs::read(path)?);
        if !assembly.is_clean() {
            for d in &assembly.diagnostics {
                eprintln!("{}: {}", path.display(), d);
            }
            return Err(AssembleError::Diagnostics(assembly.diagnostics).into());
        }
        if assembly.program.is_empty() {
            return Err(AssembleError::Empty.into());
        }
        return Ok(assembly.program);
    }
    if let Some(path) = &config.rom {
        return Ok(fs::read(path)?);
    }
    Ok(CHIP8_TEST_CARD.to_vec())
}

fn main_loop(
    studio: &Studio<TestCardSystem>,
    display: &mut dyn Display,
    logs: &OutputLog,
    config: &Config,
    name: &str,
    assembler: &mut dyn Assembler,
) -> Result<(), Box<dyn Error>> {
    let frame_time = Duration::from_secs_f64(1.0 / config.frame_rate);
    let mut frame = None;
    let mut viewport = 0;
    let mut debug = String::new();
    let mut dumped_at = None;
    let mut message = String::new();

    loop {
        let started = Instant::now();

        while event::poll(Duration::ZERO)? {
            let Event::Key(KeyEvent { code, .. }) = event::read()? else {
                continue;
            };
            match command_for(code) {
                Command::Quit => return Ok(()),
                Command::Toggle => studio.toggle(),
                Command::Step => {
                    if let Err(e) = studio.step() {
                        message = e.to_string();
                    }
                }
                Command::Reset => {
                    studio.reset();
                    dumped_at = None;
                }
                Command::Faster => message = change_frequency(studio, FREQUENCY_STEP),
                Command::Slower => message = change_frequency(studio, -FREQUENCY_STEP),
                Command::Reassemble => {
                    message = reassemble(studio, config, name, assembler);
                    dumped_at = None;
                }
                Command::Keypad(code) => studio.press_key(code),
            }
        }

        let width = display.viewport_width()?;
        if studio.take_redraw() || width != viewport || frame.is_none() {
            viewport = width;
            frame = studio.present(viewport);
        }

        let stats = studio.stats();
        if dumped_at != Some(stats.steps) {
            debug = studio.dump(name);
            dumped_at = Some(stats.steps);
        }
        let status = status_line(&stats, &message);
        let log = logs.tail(OUTPUT_PANE_LINES);
        display.show(&View {
            title: name,
            frame: frame.as_ref(),
            debug: &debug,
            output: &log,
            status: &status,
        })?;

        if let Some(rest) = frame_time.checked_sub(started.elapsed()) {
            spin_sleep::sleep(rest);
        }
    }
}

fn change_frequency(studio: &Studio<TestCardSystem>, delta: i64) -> String {
    let hz = i64::from(studio.stats().frequency) + delta;
    match studio.set_frequency(hz) {
        Ok(()) => format!("{} Hz", hz),
        Err(e) => e.to_string(),
    }
}

fn reassemble(
    studio: &Studio<TestCardSystem>,
    config: &Config,
    name: &str,
    assembler: &mut dyn Assembler,
) -> String {
    let Some(path) = &config.source else {
        return "no source file to assemble".to_string();
    };
    let source = match fs::read(path) {
        Ok(source) => source,
        Err(e) => return format!("{}: {}", path.display(), e),
    };
    match studio.assemble(assembler, name, &source) {
        Ok(size) => format!("{}: assembled {} bytes", name, size),
        Err(e) => match e.diagnostics().first() {
            Some(first) => format!("{}: {}; {}", name, e, first),
            None => format!("{}: {}", name, e),
        },
    }
}

fn status_line(stats: &Stats, message: &str) -> String {
    let mut line = format!(
        "{:?} | {} Hz | {} steps | {} errors",
        stats.run_state, stats.frequency, stats.steps, stats.errors
    );
    if let Some(e) = &stats.last_error {
        line.push_str(&format!(" ({})", e));
    }
    if !message.is_empty() {
        line.push_str(" | ");
        line.push_str(message);
    }
    line.push_str(" | ");
    line.push_str(HELP);
    line
}
