use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;
use crate::video::PalettePolicy;

#[derive(Parser, Debug)]
#[command(
    name = "chip8-studio",
    about = "Step a CHIP-8 style machine at a fixed frequency in the terminal",
    version
)]
pub struct Cli {
    /// JSON settings file; command line options override it
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Raw program image to boot
    #[arg(long)]
    pub rom: Option<PathBuf>,

    /// Hex listing to assemble and boot (reassemble with 'm')
    #[arg(short = 's', long)]
    pub source: Option<PathBuf>,

    /// Virtual CPU frequency in Hz
    #[arg(short = 'f', long, allow_negative_numbers = true)]
    pub frequency: Option<i64>,

    /// How scan buffer bytes become colours
    #[arg(short = 'p', long, value_enum)]
    pub palette: Option<PalettePolicy>,

    /// Start running instead of paused
    #[arg(short = 'r', long)]
    pub run: bool,

    /// Beep through the PC speaker
    #[arg(long)]
    pub sound: bool,

    /// Screen redraws per second
    #[arg(long)]
    pub fps: Option<f64>,
}

impl Cli {
    /// apply command line overrides on top of `config`
    pub fn merge(&self, mut config: Config) -> Config {
        if let Some(hz) = self.frequency {
            config.frequency_hz = hz;
        }
        if let Some(palette) = self.palette {
            config.palette = palette;
        }
        if let Some(fps) = self.fps {
            config.frame_rate = fps;
        }
        if self.rom.is_some() {
            config.rom = self.rom.clone();
        }
        if self.source.is_some() {
            config.source = self.source.clone();
        }
        config.start_running |= self.run;
        config.sound |= self.sound;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_config() {
        let cli = Cli::parse_from(["chip8-studio", "-f", "900", "--palette", "red-intensity", "--run"]);
        let c = cli.merge(Config::default());
        assert_eq!(c.frequency_hz, 900);
        assert_eq!(c.palette, PalettePolicy::RedIntensity);
        assert!(c.start_running);
        assert_eq!(c.frame_rate, 60.0);
    }

    #[test]
    fn test_no_flags_keeps_config() {
        let base = Config {
            frequency_hz: 250,
            sound: true,
            ..Config::default()
        };
        let c = Cli::parse_from(["chip8-studio"]).merge(base.clone());
        assert_eq!(c, base);
    }

    #[test]
    fn test_negative_frequency_parses_then_fails_validation() {
        let c = Cli::parse_from(["chip8-studio", "--frequency", "-5"]).merge(Config::default());
        assert!(c.validate().is_err());
    }
}
