//! Hysteresis level detector with an adaptive floor.

use crate::error::{DrumlineError, Result};

/// Direction of the tracked level relative to the adaptive floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    /// Level rose more than the hysteresis threshold above the floor.
    Rise,
    /// Level dropped below the floor.
    Fall,
    /// Level stayed inside the hysteresis band.
    Hold,
}

/// Converts a smoothed envelope into a binary HIGH/LOW detection signal.
///
/// The floor chases the signal down on every fall and trails it by the
/// threshold on every rise, so a burst only reads as HIGH while the envelope
/// keeps climbing or holds near its peak. Both comparisons are strict: a
/// rise of exactly the threshold does not trip the detector.
#[derive(Debug, Clone)]
pub struct LevelDetector {
    threshold: f32,
    floor: f32,
    high: bool,
    primed: bool,
}

impl LevelDetector {
    /// # Errors
    /// Returns `ConfigInvalidValue` for a non-positive threshold.
    pub fn new(threshold: f32) -> Result<Self> {
        if !(threshold > 0.0) {
            return Err(DrumlineError::ConfigInvalidValue {
                key: "hysteresis_threshold".to_string(),
                message: format!("must be positive, got {threshold}"),
            });
        }
        Ok(Self {
            threshold,
            floor: 0.0,
            high: false,
            primed: false,
        })
    }

    /// Classifies each sample as 1 (HIGH) or 0 (LOW).
    ///
    /// The very first sample the detector ever sees is emitted as 0 without
    /// touching the floor; after that every sample participates, regardless
    /// of how the stream is chunked.
    pub fn process_chunk(&mut self, levels: &[f32]) -> Vec<u8> {
        let mut out = Vec::with_capacity(levels.len());
        for &v in levels {
            if !self.primed {
                self.primed = true;
                out.push(0);
                continue;
            }

            let transition = if v < self.floor {
                self.floor = v;
                Transition::Fall
            } else if v > self.floor + self.threshold {
                self.floor = v - self.threshold;
                Transition::Rise
            } else {
                Transition::Hold
            };

            let bit = if self.high {
                if transition == Transition::Fall {
                    self.high = false;
                    0
                } else {
                    1
                }
            } else if transition == Transition::Rise {
                self.high = true;
                1
            } else {
                0
            };
            out.push(bit);
        }
        out
    }

    /// Returns to the unprimed LOW state with a zero floor.
    pub fn reset(&mut self) {
        self.floor = 0.0;
        self.high = false;
        self.primed = false;
    }
}
