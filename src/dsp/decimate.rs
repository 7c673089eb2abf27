//! Integer-factor sample-rate reduction with anti-aliasing.

use crate::dsp::bandpass::ButterworthLowpass;
use crate::error::{DrumlineError, Result};

/// Order of the anti-aliasing lowpass.
const ANTIALIAS_ORDER: usize = 8;

/// Anti-aliasing cutoff as a fraction of the reduced rate's Nyquist.
const ANTIALIAS_CUTOFF_RATIO: f64 = 0.8;

/// Reduces a stream's sample rate by the integer factor closest to the
/// requested ratio, keeping every sample below the new Nyquist rate intact.
///
/// Decimation only ever hits the target rate exactly when the source rate
/// is an integer multiple of it; otherwise the output rate is
/// `source / round(source / target)`. Filter state and pick phase persist
/// across chunks, so chunk boundaries never shift which samples are kept.
#[derive(Debug, Clone)]
pub struct Decimator {
    factor: usize,
    antialias: Option<ButterworthLowpass>,
    phase: usize,
    output_rate: f64,
}

impl Decimator {
    /// # Errors
    /// Returns `ConfigInvalidValue` for non-positive rates and
    /// `UnsupportedRate` when the ratio rounds below 1 (the source is
    /// slower than half the target; this stage never upsamples).
    pub fn new(source_hz: f64, target_hz: f64) -> Result<Self> {
        if !(source_hz > 0.0) {
            return Err(DrumlineError::ConfigInvalidValue {
                key: "sample_rate".to_string(),
                message: format!("must be positive, got {source_hz}"),
            });
        }
        if !(target_hz > 0.0) {
            return Err(DrumlineError::ConfigInvalidValue {
                key: "target_sample_rate".to_string(),
                message: format!("must be positive, got {target_hz}"),
            });
        }

        let factor = (source_hz / target_hz).round() as i64;
        if factor < 1 {
            return Err(DrumlineError::UnsupportedRate {
                source_hz,
                target_hz,
            });
        }
        let factor = factor as usize;

        // A unity factor keeps the stream untouched at its original rate,
        // with no anti-aliasing pass.
        let antialias = if factor > 1 {
            let cutoff = ANTIALIAS_CUTOFF_RATIO * source_hz / (2.0 * factor as f64);
            Some(ButterworthLowpass::new(source_hz, cutoff, ANTIALIAS_ORDER))
        } else {
            None
        };

        Ok(Self {
            factor,
            antialias,
            phase: 0,
            output_rate: source_hz / factor as f64,
        })
    }

    /// Achieved output rate, which may differ from the requested target.
    pub fn output_rate(&self) -> f64 {
        self.output_rate
    }

    /// Reduction factor (1 means passthrough).
    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Filters and thins one chunk. Output length is `ceil`/`floor` of
    /// `len / factor` depending on where the pick phase currently sits.
    pub fn process_chunk(&mut self, samples: &[f32]) -> Vec<f32> {
        let Some(antialias) = self.antialias.as_mut() else {
            return samples.to_vec();
        };

        let mut out = Vec::with_capacity(samples.len() / self.factor + 1);
        for &x in samples {
            let filtered = antialias.process(x);
            if self.phase == 0 {
                out.push(filtered);
            }
            self.phase = (self.phase + 1) % self.factor;
        }
        out
    }

    /// Clears filter state and rewinds the pick phase.
    pub fn reset(&mut self) {
        if let Some(antialias) = self.antialias.as_mut() {
            antialias.reset();
        }
        self.phase = 0;
    }
}
