//! The full hit-detection chain, chunk in, events out.

use serde::Serialize;

use crate::config::DetectorConfig;
use crate::dsp::bandpass::BandpassFilter;
use crate::dsp::decimate::Decimator;
use crate::dsp::edge::EdgeExtractor;
use crate::dsp::envelope::EnvelopeFollower;
use crate::dsp::level::LevelDetector;
use crate::dsp::median::MedianFilter;
use crate::error::{DrumlineError, Result};

/// One detected percussive hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HitEvent {
    /// Index into the chunk's processed (post-decimation) sample arrays.
    pub offset_in_chunk: usize,
    /// Absolute sample position in the processed stream since the first
    /// chunk (or the last reset).
    pub sample_index: u64,
    /// `sample_index` converted to seconds at the effective rate.
    pub time_secs: f64,
    /// Smoothed envelope level at the moment of the hit.
    pub envelope: f32,
}

/// Everything the pipeline derived from one input chunk.
///
/// All sample arrays are the same length and run at `sample_rate`, the
/// effective post-decimation rate.
#[derive(Debug, Clone)]
pub struct ChunkResult {
    pub filtered: Vec<f32>,
    pub envelope: Vec<f32>,
    pub smoothed: Vec<f32>,
    pub detection: Vec<u8>,
    pub hits: Vec<HitEvent>,
    pub sample_rate: f64,
}

/// Streaming hit detector.
///
/// The stages that don't depend on the sample rate are built up front; the
/// decimator and band-pass filter are built lazily from the first non-empty
/// chunk, which locks the input rate for the pipeline's lifetime. Feeding a
/// different rate afterwards is an error rather than a silent reconfigure.
#[derive(Debug)]
pub struct DetectorPipeline {
    config: DetectorConfig,
    source_rate: Option<f64>,
    decimator: Option<Decimator>,
    bandpass: Option<BandpassFilter>,
    envelope: EnvelopeFollower,
    median: MedianFilter,
    level: LevelDetector,
    edges: EdgeExtractor,
    processed_samples: u64,
}

impl DetectorPipeline {
    /// # Errors
    /// Returns `ConfigInvalidValue` for parameters that are invalid
    /// regardless of sample rate. Band cutoffs are checked against the
    /// Nyquist rate once the first chunk arrives.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            envelope: EnvelopeFollower::new(config.decay_factor),
            median: MedianFilter::new(config.smoothing_window)?,
            level: LevelDetector::new(config.hysteresis_threshold)?,
            edges: EdgeExtractor::new(),
            config,
            source_rate: None,
            decimator: None,
            bandpass: None,
            processed_samples: 0,
        })
    }

    /// Input rate locked by the first chunk, if any.
    pub fn source_rate(&self) -> Option<f64> {
        self.source_rate
    }

    /// Rate of the processed stream, once locked.
    pub fn effective_rate(&self) -> Option<f64> {
        self.bandpass.as_ref().map(BandpassFilter::sample_rate)
    }

    /// Total processed samples consumed since construction or reset.
    pub fn processed_samples(&self) -> u64 {
        self.processed_samples
    }

    /// Runs one interleaved chunk through the whole chain.
    ///
    /// Only channel 0 of a multi-channel chunk is analyzed. An empty chunk
    /// is a no-op that touches no state, not even the rate lock.
    ///
    /// # Errors
    /// `RateChanged` if `sample_rate` differs from the locked rate;
    /// `ConfigInvalidValue` or `UnsupportedRate` if the first chunk's rate
    /// cannot carry the configured band.
    pub fn process_chunk(
        &mut self,
        samples: &[f32],
        sample_rate: f64,
        channels: usize,
    ) -> Result<ChunkResult> {
        if channels == 0 {
            return Err(DrumlineError::ConfigInvalidValue {
                key: "channels".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if samples.is_empty() {
            return Ok(ChunkResult {
                filtered: Vec::new(),
                envelope: Vec::new(),
                smoothed: Vec::new(),
                detection: Vec::new(),
                hits: Vec::new(),
                sample_rate: self.effective_rate().unwrap_or(sample_rate),
            });
        }

        match self.source_rate {
            Some(locked) if locked != sample_rate => {
                return Err(DrumlineError::RateChanged {
                    locked_hz: locked,
                    got_hz: sample_rate,
                });
            }
            Some(_) => {}
            None => self.lock_rate(sample_rate)?,
        }

        let mono: Vec<f32> = if channels == 1 {
            samples.to_vec()
        } else {
            samples.iter().step_by(channels).copied().collect()
        };

        let decimated = match self.decimator.as_mut() {
            Some(decimator) => decimator.process_chunk(&mono),
            None => mono,
        };
        let bandpass = self.bandpass.as_mut().ok_or_else(|| {
            DrumlineError::Other("pipeline rate not locked".to_string())
        })?;
        let effective_rate = bandpass.sample_rate();

        let filtered = bandpass.process_chunk(&decimated);
        let envelope = self.envelope.process_chunk(&filtered);
        let smoothed = self.median.process_chunk(&envelope);
        let detection = self.level.process_chunk(&smoothed);

        let hits = self
            .edges
            .process_chunk(&detection)
            .into_iter()
            .map(|offset| {
                let sample_index = self.processed_samples + offset as u64;
                HitEvent {
                    offset_in_chunk: offset,
                    sample_index,
                    time_secs: sample_index as f64 / effective_rate,
                    envelope: smoothed[offset],
                }
            })
            .collect();

        self.processed_samples += filtered.len() as u64;

        Ok(ChunkResult {
            filtered,
            envelope,
            smoothed,
            detection,
            hits,
            sample_rate: effective_rate,
        })
    }

    fn lock_rate(&mut self, sample_rate: f64) -> Result<()> {
        let decimator = Decimator::new(sample_rate, self.config.target_sample_rate)?;
        let effective = decimator.output_rate();
        self.bandpass = Some(BandpassFilter::new(
            effective,
            self.config.band_low_hz,
            self.config.band_high_hz,
            self.config.filter_order,
        )?);
        self.decimator = if decimator.factor() > 1 {
            Some(decimator)
        } else {
            None
        };
        self.source_rate = Some(sample_rate);
        Ok(())
    }

    /// Returns every stage to its initial state and releases the rate lock,
    /// so the next chunk may arrive at any rate.
    pub fn reset(&mut self) {
        self.source_rate = None;
        self.decimator = None;
        self.bandpass = None;
        self.envelope.reset();
        self.median.reset();
        self.level.reset();
        self.edges.reset();
        self.processed_samples = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> DetectorConfig {
        DetectorConfig {
            band_low_hz: 80.0,
            band_high_hz: 200.0,
            filter_order: 4,
            decay_factor: 0.95,
            smoothing_window: 1,
            hysteresis_threshold: 0.2,
            target_sample_rate: 16000.0,
        }
    }

    #[test]
    fn test_empty_chunk_does_not_lock_rate() {
        let mut pipeline = DetectorPipeline::new(test_config()).unwrap();
        let result = pipeline.process_chunk(&[], 48000.0, 1).unwrap();
        assert!(result.hits.is_empty());
        assert!(pipeline.source_rate().is_none());
        // A different rate afterwards is fine
        assert!(pipeline.process_chunk(&[0.0; 512], 16000.0, 1).is_ok());
    }

    #[test]
    fn test_first_chunk_locks_rate() {
        let mut pipeline = DetectorPipeline::new(test_config()).unwrap();
        pipeline.process_chunk(&[0.0; 512], 48000.0, 1).unwrap();
        assert_eq!(pipeline.source_rate(), Some(48000.0));
        assert_eq!(pipeline.effective_rate(), Some(16000.0));

        let err = pipeline.process_chunk(&[0.0; 512], 44100.0, 1).unwrap_err();
        assert!(matches!(
            err,
            DrumlineError::RateChanged { locked_hz, got_hz }
                if locked_hz == 48000.0 && got_hz == 44100.0
        ));
    }

    #[test]
    fn test_band_checked_against_effective_nyquist() {
        let mut config = test_config();
        config.target_sample_rate = 300.0;
        // Decimating 48 kHz toward 300 Hz puts Nyquist at 150 Hz, below
        // the 200 Hz upper cutoff.
        let mut pipeline = DetectorPipeline::new(config).unwrap();
        let err = pipeline.process_chunk(&[0.0; 512], 48000.0, 1).unwrap_err();
        assert!(matches!(err, DrumlineError::ConfigInvalidValue { .. }));
    }

    #[test]
    fn test_channel_zero_of_interleaved_stereo() {
        let mut mono = DetectorPipeline::new(test_config()).unwrap();
        let mut stereo = DetectorPipeline::new(test_config()).unwrap();

        let left: Vec<f32> = (0..480).map(|i| (i as f32 / 480.0).sin()).collect();
        let mut interleaved = Vec::with_capacity(left.len() * 2);
        for &s in &left {
            interleaved.push(s);
            interleaved.push(-1.0); // right channel must be ignored
        }

        let a = mono.process_chunk(&left, 48000.0, 1).unwrap();
        let b = stereo.process_chunk(&interleaved, 48000.0, 2).unwrap();
        assert_eq!(a.filtered, b.filtered);
        assert_eq!(a.detection, b.detection);
    }

    #[test]
    fn test_zero_channels_is_an_error() {
        let mut pipeline = DetectorPipeline::new(test_config()).unwrap();
        assert!(pipeline.process_chunk(&[0.0], 48000.0, 0).is_err());
    }

    #[test]
    fn test_all_arrays_share_length_and_rate() {
        let mut pipeline = DetectorPipeline::new(test_config()).unwrap();
        let result = pipeline.process_chunk(&[0.0; 4800], 48000.0, 1).unwrap();
        assert_eq!(result.sample_rate, 16000.0);
        assert_eq!(result.filtered.len(), 1600);
        assert_eq!(result.envelope.len(), 1600);
        assert_eq!(result.smoothed.len(), 1600);
        assert_eq!(result.detection.len(), 1600);
    }

    #[test]
    fn test_silence_yields_no_hits() {
        let mut pipeline = DetectorPipeline::new(test_config()).unwrap();
        for _ in 0..20 {
            let result = pipeline.process_chunk(&[0.0; 2400], 48000.0, 1).unwrap();
            assert!(result.hits.is_empty());
            assert!(result.filtered.iter().all(|&x| x == 0.0));
            assert!(result.detection.iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_timestamps_accumulate_across_chunks() {
        let mut pipeline = DetectorPipeline::new(test_config()).unwrap();
        pipeline.process_chunk(&[0.0; 1600], 16000.0, 1).unwrap();
        assert_eq!(pipeline.processed_samples(), 1600);

        // A loud in-band burst 100 ms in: hit lands at an absolute index
        // past the first chunk.
        let burst: Vec<f32> = (0..1600)
            .map(|i| 0.8 * (2.0 * std::f64::consts::PI * 150.0 * i as f64 / 16000.0).sin() as f32)
            .collect();
        let result = pipeline.process_chunk(&burst, 16000.0, 1).unwrap();
        let hit = result.hits.first().expect("expected a hit");
        assert!(hit.sample_index >= 1600);
        assert_eq!(
            hit.sample_index,
            1600 + hit.offset_in_chunk as u64
        );
        assert!((hit.time_secs - hit.sample_index as f64 / 16000.0).abs() < 1e-12);
    }

    #[test]
    fn test_reset_releases_rate_lock_and_counters() {
        let mut pipeline = DetectorPipeline::new(test_config()).unwrap();
        pipeline.process_chunk(&[0.5; 1600], 48000.0, 1).unwrap();
        pipeline.reset();
        assert!(pipeline.source_rate().is_none());
        assert_eq!(pipeline.processed_samples(), 0);
        // New rate accepted after reset
        assert!(pipeline.process_chunk(&[0.0; 160], 8000.0, 1).is_ok());
    }

    #[test]
    fn test_reset_restores_first_run_output() {
        let signal: Vec<f32> = (0..3200)
            .map(|i| (2.0 * std::f64::consts::PI * 150.0 * i as f64 / 16000.0).sin() as f32)
            .collect();
        let mut pipeline = DetectorPipeline::new(test_config()).unwrap();
        let first = pipeline.process_chunk(&signal, 16000.0, 1).unwrap();
        pipeline.reset();
        let second = pipeline.process_chunk(&signal, 16000.0, 1).unwrap();
        assert_eq!(first.filtered, second.filtered);
        assert_eq!(first.hits, second.hits);
    }
}
