//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Real-time percussive hit detector.
#[derive(Debug, Parser)]
#[command(name = "drumline", version, about = "Detects percussive hits in live or recorded audio")]
pub struct Cli {
    /// Path to a config file (defaults to the per-user config)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Input device name (substring match)
    #[arg(short, long)]
    pub device: Option<String>,

    /// Stop after this long (e.g. "30s", "5m"); default is until Ctrl-C
    #[arg(long, value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Draw a live envelope meter on stderr
    #[arg(long)]
    pub meter: bool,

    /// Hysteresis threshold override
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Band-pass low cutoff override in Hz
    #[arg(long)]
    pub band_low: Option<f64>,

    /// Band-pass high cutoff override in Hz
    #[arg(long)]
    pub band_high: Option<f64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List available audio input devices
    Devices,
    /// Detect hits in a WAV file and print them
    Analyze {
        /// WAV file to analyze
        file: PathBuf,
        /// Print hits as JSON lines instead of formatted text
        #[arg(long)]
        json: bool,
    },
    /// Capture live audio and stream hits to TCP clients as JSON lines
    Serve {
        /// Listen address, overriding the config
        #[arg(long)]
        addr: Option<String>,
    },
}
