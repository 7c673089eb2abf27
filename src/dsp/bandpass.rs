//! Streaming Butterworth band-pass filter.
//!
//! Realized as a cascade of second-order sections (plus one first-order
//! section per band edge for odd orders): a highpass chain at the low cutoff
//! followed by a lowpass chain at the high cutoff. Each section keeps its own
//! delay-line state so output is bit-identical whether a signal is filtered
//! in one pass or split into arbitrary chunks.

use crate::error::{DrumlineError, Result};
use std::f64::consts::PI;

/// Second-order IIR section coefficients, pre-normalized by a0
/// (RBJ audio-EQ cookbook forms).
#[derive(Debug, Clone, Copy)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    fn lowpass(sample_rate: f64, cutoff_hz: f64, q: f64) -> Self {
        let omega = 2.0 * PI * cutoff_hz / sample_rate;
        let cos_omega = omega.cos();
        let alpha = omega.sin() / (2.0 * q);

        let a0 = 1.0 + alpha;
        Self {
            b0: (1.0 - cos_omega) / 2.0 / a0,
            b1: (1.0 - cos_omega) / a0,
            b2: (1.0 - cos_omega) / 2.0 / a0,
            a1: -2.0 * cos_omega / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    fn highpass(sample_rate: f64, cutoff_hz: f64, q: f64) -> Self {
        let omega = 2.0 * PI * cutoff_hz / sample_rate;
        let cos_omega = omega.cos();
        let alpha = omega.sin() / (2.0 * q);

        let a0 = 1.0 + alpha;
        Self {
            b0: (1.0 + cos_omega) / 2.0 / a0,
            b1: -(1.0 + cos_omega) / a0,
            b2: (1.0 + cos_omega) / 2.0 / a0,
            a1: -2.0 * cos_omega / a0,
            a2: (1.0 - alpha) / a0,
        }
    }
}

/// First-order IIR section (bilinear transform), used for odd filter orders.
#[derive(Debug, Clone, Copy)]
struct FirstOrderCoeffs {
    b0: f64,
    b1: f64,
    a1: f64,
}

impl FirstOrderCoeffs {
    fn lowpass(sample_rate: f64, cutoff_hz: f64) -> Self {
        let k = (PI * cutoff_hz / sample_rate).tan();
        Self {
            b0: k / (1.0 + k),
            b1: k / (1.0 + k),
            a1: (k - 1.0) / (1.0 + k),
        }
    }

    fn highpass(sample_rate: f64, cutoff_hz: f64) -> Self {
        let k = (PI * cutoff_hz / sample_rate).tan();
        Self {
            b0: 1.0 / (1.0 + k),
            b1: -1.0 / (1.0 + k),
            a1: (k - 1.0) / (1.0 + k),
        }
    }
}

/// One stateful cascade stage: transposed direct form II.
#[derive(Debug, Clone)]
enum Section {
    Biquad { c: BiquadCoeffs, s1: f64, s2: f64 },
    FirstOrder { c: FirstOrderCoeffs, s: f64 },
}

impl Section {
    #[inline]
    fn process(&mut self, x: f64) -> f64 {
        match self {
            Section::Biquad { c, s1, s2 } => {
                let y = c.b0 * x + *s1;
                *s1 = c.b1 * x - c.a1 * y + *s2;
                *s2 = c.b2 * x - c.a2 * y;
                y
            }
            Section::FirstOrder { c, s } => {
                let y = c.b0 * x + *s;
                *s = c.b1 * x - c.a1 * y;
                y
            }
        }
    }

    fn dc_gain(&self) -> f64 {
        match self {
            Section::Biquad { c, .. } => (c.b0 + c.b1 + c.b2) / (1.0 + c.a1 + c.a2),
            Section::FirstOrder { c, .. } => (c.b0 + c.b1) / (1.0 + c.a1),
        }
    }

    /// Sets the delay line to the steady state reached after an infinite run
    /// of constant input `level`, and returns the section's steady output
    /// (the level seen by the next section in the cascade).
    fn prime(&mut self, level: f64) -> f64 {
        let out = level * self.dc_gain();
        match self {
            Section::Biquad { c, s1, s2 } => {
                *s1 = out - c.b0 * level;
                *s2 = c.b2 * level - c.a2 * out;
            }
            Section::FirstOrder { c, s } => {
                *s = out - c.b0 * level;
            }
        }
        out
    }
}

/// Q values for the second-order sections of an order-n Butterworth filter.
///
/// Even orders pair all poles; odd orders leave one real pole for a
/// first-order section.
fn butterworth_qs(order: usize) -> Vec<f64> {
    let n = order as f64;
    (0..order / 2)
        .map(|k| {
            let phi = if order % 2 == 0 {
                PI * (2.0 * k as f64 + 1.0) / (2.0 * n)
            } else {
                PI * (k as f64 + 1.0) / n
            };
            1.0 / (2.0 * phi.cos())
        })
        .collect()
}

/// Streaming band-pass filter with cross-chunk state.
#[derive(Debug, Clone)]
pub struct BandpassFilter {
    sections: Vec<Section>,
    sample_rate: f64,
}

impl BandpassFilter {
    /// Derives the cascade coefficients for the given rate and cutoffs.
    ///
    /// # Errors
    /// Returns `ConfigInvalidValue` if the cutoffs violate
    /// `0 < low < high < sample_rate / 2` or the order is zero.
    pub fn new(sample_rate: f64, low_hz: f64, high_hz: f64, order: usize) -> Result<Self> {
        if !(sample_rate > 0.0) {
            return Err(DrumlineError::ConfigInvalidValue {
                key: "sample_rate".to_string(),
                message: format!("must be positive, got {sample_rate}"),
            });
        }
        if !(low_hz > 0.0) {
            return Err(DrumlineError::ConfigInvalidValue {
                key: "band_low_hz".to_string(),
                message: format!("must be positive, got {low_hz}"),
            });
        }
        if !(high_hz > low_hz) {
            return Err(DrumlineError::ConfigInvalidValue {
                key: "band_high_hz".to_string(),
                message: format!("must be above band_low_hz ({low_hz}), got {high_hz}"),
            });
        }
        let nyquist = sample_rate / 2.0;
        if !(high_hz < nyquist) {
            return Err(DrumlineError::ConfigInvalidValue {
                key: "band_high_hz".to_string(),
                message: format!("must be below the Nyquist rate ({nyquist} Hz), got {high_hz}"),
            });
        }
        if order == 0 {
            return Err(DrumlineError::ConfigInvalidValue {
                key: "filter_order".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let qs = butterworth_qs(order);
        let mut sections = Vec::with_capacity(2 * qs.len() + 2 * (order % 2));

        // Highpass chain at the low cutoff, then lowpass chain at the high
        // cutoff. Section order within a chain does not affect the transfer
        // function; keeping HP before LP keeps the large low-frequency
        // content out of the later sections.
        for &q in &qs {
            sections.push(Section::Biquad {
                c: BiquadCoeffs::highpass(sample_rate, low_hz, q),
                s1: 0.0,
                s2: 0.0,
            });
        }
        if order % 2 == 1 {
            sections.push(Section::FirstOrder {
                c: FirstOrderCoeffs::highpass(sample_rate, low_hz),
                s: 0.0,
            });
        }
        for &q in &qs {
            sections.push(Section::Biquad {
                c: BiquadCoeffs::lowpass(sample_rate, high_hz, q),
                s1: 0.0,
                s2: 0.0,
            });
        }
        if order % 2 == 1 {
            sections.push(Section::FirstOrder {
                c: FirstOrderCoeffs::lowpass(sample_rate, high_hz),
                s: 0.0,
            });
        }

        let mut filter = Self {
            sections,
            sample_rate,
        };
        filter.reset();
        Ok(filter)
    }

    /// Sample rate the coefficients were derived for.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Filters one chunk, updating the delay lines. Input is not mutated;
    /// the output has exactly the input's length.
    pub fn process_chunk(&mut self, samples: &[f32]) -> Vec<f32> {
        let mut out = Vec::with_capacity(samples.len());
        for &x in samples {
            let mut acc = x as f64;
            for section in &mut self.sections {
                acc = section.process(acc);
            }
            out.push(acc as f32);
        }
        out
    }

    /// Returns every section to its quiescent state: the steady state of an
    /// indefinitely long zero-level input, computed in closed form per
    /// section and propagated through the cascade's DC gains.
    pub fn reset(&mut self) {
        let mut level = 0.0;
        for section in &mut self.sections {
            level = section.prime(level);
        }
    }
}

/// Anti-aliasing lowpass used by the decimator, built from the same section
/// primitives as the band-pass cascade. Constructed internally with
/// already-validated cutoffs.
#[derive(Debug, Clone)]
pub(crate) struct ButterworthLowpass {
    sections: Vec<Section>,
}

impl ButterworthLowpass {
    pub(crate) fn new(sample_rate: f64, cutoff_hz: f64, order: usize) -> Self {
        let qs = butterworth_qs(order);
        let mut sections: Vec<Section> = qs
            .iter()
            .map(|&q| Section::Biquad {
                c: BiquadCoeffs::lowpass(sample_rate, cutoff_hz, q),
                s1: 0.0,
                s2: 0.0,
            })
            .collect();
        if order % 2 == 1 {
            sections.push(Section::FirstOrder {
                c: FirstOrderCoeffs::lowpass(sample_rate, cutoff_hz),
                s: 0.0,
            });
        }
        Self { sections }
    }

    #[inline]
    pub(crate) fn process(&mut self, x: f32) -> f32 {
        let mut acc = x as f64;
        for section in &mut self.sections {
            acc = section.process(acc);
        }
        acc as f32
    }

    pub(crate) fn reset(&mut self) {
        let mut level = 0.0;
        for section in &mut self.sections {
            level = section.prime(level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_filter() -> BandpassFilter {
        BandpassFilter::new(16000.0, 80.0, 200.0, 4).unwrap()
    }

    fn sine(freq: f64, rate: f64, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f64 / rate).sin() as f32)
            .collect()
    }

    #[test]
    fn test_rejects_inverted_band() {
        let result = BandpassFilter::new(16000.0, 200.0, 80.0, 4);
        assert!(matches!(
            result,
            Err(DrumlineError::ConfigInvalidValue { key, .. }) if key == "band_high_hz"
        ));
    }

    #[test]
    fn test_rejects_cutoff_at_nyquist() {
        let result = BandpassFilter::new(16000.0, 80.0, 8000.0, 4);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_non_positive_low_cut() {
        assert!(BandpassFilter::new(16000.0, 0.0, 200.0, 4).is_err());
        assert!(BandpassFilter::new(16000.0, -5.0, 200.0, 4).is_err());
    }

    #[test]
    fn test_rejects_zero_order() {
        assert!(BandpassFilter::new(16000.0, 80.0, 200.0, 0).is_err());
    }

    #[test]
    fn test_butterworth_qs_order_two() {
        let qs = butterworth_qs(2);
        assert_eq!(qs.len(), 1);
        assert!((qs[0] - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn test_butterworth_qs_order_four() {
        let qs = butterworth_qs(4);
        assert_eq!(qs.len(), 2);
        assert!((qs[0] - 0.5411961).abs() < 1e-6);
        assert!((qs[1] - 1.3065630).abs() < 1e-6);
    }

    #[test]
    fn test_butterworth_qs_odd_order_leaves_real_pole() {
        // Order 3: one conjugate pair at Q=1 plus a real pole
        let qs = butterworth_qs(3);
        assert_eq!(qs.len(), 1);
        assert!((qs[0] - 1.0).abs() < 1e-12);
        assert!(butterworth_qs(1).is_empty());
    }

    #[test]
    fn test_empty_chunk_is_noop() {
        let mut filter = make_filter();
        let before = filter.clone();
        let out = filter.process_chunk(&[]);
        assert!(out.is_empty());
        // State untouched: subsequent output identical to an untouched filter
        let signal = sine(150.0, 16000.0, 256);
        assert_eq!(
            filter.process_chunk(&signal),
            before.clone().process_chunk(&signal)
        );
    }

    #[test]
    fn test_zero_input_produces_zero_output() {
        let mut filter = make_filter();
        let out = filter.process_chunk(&vec![0.0; 1024]);
        assert!(out.iter().all(|&y| y == 0.0));
    }

    #[test]
    fn test_chunked_output_matches_single_pass() {
        let signal = sine(150.0, 16000.0, 2048);

        let mut whole = make_filter();
        let expected = whole.process_chunk(&signal);

        for split in [1, 7, 64, 1000, 2047] {
            let mut chunked = make_filter();
            let mut got = chunked.process_chunk(&signal[..split]);
            got.extend(chunked.process_chunk(&signal[split..]));
            assert_eq!(expected, got, "split at {split} diverged");
        }
    }

    #[test]
    fn test_passband_tone_survives_stopband_tone_dies() {
        let mut filter = make_filter();
        let rate = 16000.0;
        let len = 16000;

        let in_band = filter.process_chunk(&sine(140.0, rate, len));
        filter.reset();
        let below = filter.process_chunk(&sine(20.0, rate, len));
        filter.reset();
        let above = filter.process_chunk(&sine(2000.0, rate, len));

        // Compare steady-state peak levels (skip the onset transient)
        let peak = |v: &[f32]| v[len / 2..].iter().fold(0.0f32, |m, &x| m.max(x.abs()));
        assert!(peak(&in_band) > 0.7, "pass-band tone attenuated");
        assert!(peak(&below) < 0.05, "low stop-band tone leaked");
        assert!(peak(&above) < 0.05, "high stop-band tone leaked");
    }

    #[test]
    fn test_prime_matches_steady_state() {
        // Priming to a constant level must equal the state reached by
        // actually filtering that constant for a long time.
        let mut primed = make_filter();
        let mut level = 1.0;
        for section in &mut primed.sections {
            level = section.prime(level);
        }

        let mut run = make_filter();
        let _ = run.process_chunk(&vec![1.0; 200_000]);

        let next_primed = primed.process_chunk(&[1.0]);
        let next_run = run.process_chunk(&[1.0]);
        assert!((next_primed[0] - next_run[0]).abs() < 1e-6);
    }

    #[test]
    fn test_reset_restores_initial_behavior() {
        let signal = sine(150.0, 16000.0, 512);
        let mut filter = make_filter();
        let first = filter.process_chunk(&signal);
        filter.reset();
        let second = filter.process_chunk(&signal);
        assert_eq!(first, second);
    }

    #[test]
    fn test_odd_order_filter_runs() {
        let mut filter = BandpassFilter::new(16000.0, 80.0, 200.0, 3).unwrap();
        let out = filter.process_chunk(&sine(150.0, 16000.0, 512));
        assert_eq!(out.len(), 512);
        assert!(out.iter().all(|y| y.is_finite()));
    }
}
