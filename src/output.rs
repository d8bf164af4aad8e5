//! Log output for the front end.
//!
//! While the terminal is in raw mode on the alternate screen nothing may be
//! written to stderr, so the logger writes into an `OutputLog` instead and the
//! display shows its tail in the output pane.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use env_logger::{Builder, Env, Target, WriteStyle};

/// how many lines are kept when nothing else is asked for
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct Lines {
    done: VecDeque<String>,
    partial: String,
}

/// Bounded, shareable buffer of the most recent log lines. Clones share the
/// same buffer, so one can go to the logger and another to the front end.
#[derive(Debug, Clone)]
pub struct OutputLog {
    lines: Arc<Mutex<Lines>>,
    capacity: usize,
}

impl OutputLog {
    pub fn new(capacity: usize) -> Self {
        OutputLog {
            lines: Arc::new(Mutex::new(Lines::default())),
            capacity: capacity.max(1),
        }
    }

    /// the last `n` complete lines, oldest first, joined with newlines
    pub fn tail(&self, n: usize) -> String {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = lines.done.len().saturating_sub(n);
        lines
            .done
            .iter()
            .skip(skip)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .done
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for OutputLog {
    fn default() -> Self {
        OutputLog::new(DEFAULT_CAPACITY)
    }
}

impl io::Write for OutputLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        lines.partial.push_str(&String::from_utf8_lossy(buf));
        while let Some(end) = lines.partial.find('\n') {
            let line = lines.partial[..end].trim_end_matches('\r').to_string();
            lines.partial.drain(..=end);
            lines.done.push_back(line);
            if lines.done.len() > self.capacity {
                lines.done.pop_front();
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// logger writing into `output`, filtered by `RUST_LOG` with `warn` as default
pub fn builder(output: &OutputLog) -> Builder {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    builder
        .target(Target::Pipe(Box::new(output.clone())))
        .write_style(WriteStyle::Never);
    builder
}

/// install the global logger, writing into `output`
pub fn init(output: &OutputLog) -> Result<(), log::SetLoggerError> {
    builder(output).try_init()
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, LevelFilter, Log, Record};
    use std::io::Write;

    #[test]
    fn test_splits_writes_into_lines() {
        let mut out = OutputLog::new(8);
        out.write_all(b"first\nsec").unwrap();
        assert_eq!(out.len(), 1);
        out.write_all(b"ond\r\nthird\n").unwrap();
        assert_eq!(out.tail(8), "first\nsecond\nthird");
        assert_eq!(out.tail(1), "third");
    }

    #[test]
    fn test_keeps_only_the_newest_lines() {
        let mut out = OutputLog::new(3);
        for i in 0..10 {
            writeln!(out, "line {}", i).unwrap();
        }
        assert_eq!(out.len(), 3);
        assert_eq!(out.tail(10), "line 7\nline 8\nline 9");
    }

    #[test]
    fn test_clones_share_one_buffer() {
        let out = OutputLog::default();
        let mut writer = out.clone();
        writeln!(writer, "hello").unwrap();
        assert_eq!(out.tail(1), "hello");
    }

    #[test]
    fn test_log_records_land_in_buffer() {
        let out = OutputLog::default();
        let logger = builder(&out).filter_level(LevelFilter::Warn).build();
        logger.log(
            &Record::builder()
                .args(format_args!("step failed: no program loaded"))
                .level(Level::Warn)
                .target("chip8_studio::scheduler")
                .build(),
        );
        logger.log(
            &Record::builder()
                .args(format_args!("too chatty"))
                .level(Level::Trace)
                .target("chip8_studio::scheduler")
                .build(),
        );
        logger.flush();

        let text = out.tail(DEFAULT_CAPACITY);
        assert!(text.contains("step failed: no program loaded"), "{:?}", text);
        assert!(!text.contains("too chatty"));
    }
}
