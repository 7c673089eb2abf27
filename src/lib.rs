//! drumline: real-time percussive hit detection.
//!
//! Audio flows in as chunks from a device or a WAV file and comes out as
//! timestamped hit events. The DSP chain in [`dsp`] is deliberately free of
//! I/O so it can be exercised deterministically; [`app`] and [`server`]
//! handle the threads, terminals, and sockets around it.

pub mod app;
pub mod audio;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod dsp;
pub mod error;
pub mod output;
pub mod server;

pub use config::Config;
pub use dsp::{ChunkResult, DetectorPipeline, HitEvent};
pub use error::{DrumlineError, Result};
