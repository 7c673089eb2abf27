//! Default configuration constants for drumline.
//!
//! Shared constants used across configuration types to keep the CLI, the
//! config file and the detector defaults in agreement.

/// Default envelope decay factor per sample.
///
/// 0.95 gives a fast release at 16kHz (about 4ms to fall to half), short
/// enough to separate consecutive snare strokes at fast tempos.
pub const DECAY_FACTOR: f32 = 0.95;

/// Default band-pass low cutoff in Hz.
///
/// 80Hz sits below the fundamental of most snare drums while rejecting
/// kick-drum energy and stand rumble.
pub const BAND_LOW_HZ: f64 = 80.0;

/// Default band-pass high cutoff in Hz.
///
/// 200Hz keeps the snare fundamental and drops the wire buzz and cymbal
/// bleed that live above it.
pub const BAND_HIGH_HZ: f64 = 200.0;

/// Default band-pass filter order (per band edge).
pub const FILTER_ORDER: usize = 4;

/// Default median smoothing window in samples. 1 disables smoothing.
pub const SMOOTHING_WINDOW: usize = 1;

/// Default hysteresis threshold.
///
/// The smoothed envelope must rise at least this far above the tracked
/// local floor before a hit latches. Tuned for mic input normalized to
/// roughly [-1, 1].
pub const HYSTERESIS_THRESHOLD: f32 = 0.2;

/// Default target sample rate in Hz for pre-filter decimation.
///
/// The 80-200Hz detection band needs nothing near a 48kHz Nyquist;
/// decimating to 16kHz cuts per-sample work 3x with no detection impact.
pub const TARGET_SAMPLE_RATE: f64 = 16000.0;

/// Default capture chunk duration in milliseconds.
///
/// 50ms blocks bound worst-case notification latency to one chunk while
/// staying large enough that per-chunk overhead is negligible.
pub const CHUNK_MS: u64 = 50;

/// Default capacity of the capture -> pipeline chunk queue.
pub const CHUNK_QUEUE_CAPACITY: usize = 64;

/// Default capacity of the hit-event broadcast channel.
///
/// A subscriber that falls further behind than this observes a lag report
/// and loses the oldest events; it never back-pressures capture.
pub const EVENT_QUEUE_CAPACITY: usize = 256;

/// Default TCP listen address for `drumline serve`.
pub const SERVE_ADDR: &str = "127.0.0.1:9465";
