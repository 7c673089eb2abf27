//! Signal-processing stages for percussive hit detection.
//!
//! Every stage is chunk-oriented and carries its state across calls, so a
//! stream produces the same output regardless of how it is sliced into
//! chunks. `DetectorPipeline` wires the stages together in fixed order:
//! decimate, band-pass, envelope, median, hysteresis, edge extraction.

pub mod bandpass;
pub mod decimate;
pub mod edge;
pub mod envelope;
pub mod level;
pub mod median;
pub mod pipeline;

pub use bandpass::BandpassFilter;
pub use decimate::Decimator;
pub use edge::EdgeExtractor;
pub use envelope::EnvelopeFollower;
pub use level::LevelDetector;
pub use median::MedianFilter;
pub use pipeline::{ChunkResult, DetectorPipeline, HitEvent};
