//! Audio source abstraction.

use std::collections::VecDeque;

use crate::error::{DrumlineError, Result};

/// A chunked stream of interleaved f32 samples.
///
/// Lets the pipeline run against a live device, a WAV file, or a mock
/// without caring which.
pub trait AudioSource: Send + Sync {
    /// Begin producing chunks.
    fn start(&mut self) -> Result<()>;

    /// Stop producing chunks. Idempotent.
    fn stop(&mut self) -> Result<()>;

    /// Rate of the interleaved stream in Hz.
    fn sample_rate(&self) -> f64;

    /// Interleaved channel count.
    fn channels(&self) -> usize;

    /// Next chunk of interleaved samples. `Ok(None)` means the stream has
    /// ended (a live device never ends; a file does). May block until a
    /// chunk is available.
    fn read_chunk(&mut self) -> Result<Option<Vec<f32>>>;
}

/// Scripted audio source for testing.
#[derive(Debug, Clone)]
pub struct MockAudioSource {
    sample_rate: f64,
    channels: usize,
    chunks: VecDeque<Vec<f32>>,
    is_started: bool,
    should_fail_start: bool,
    should_fail_read: bool,
    error_message: String,
}

impl MockAudioSource {
    pub fn new() -> Self {
        Self {
            sample_rate: 16000.0,
            channels: 1,
            chunks: VecDeque::new(),
            is_started: false,
            should_fail_start: false,
            should_fail_read: false,
            error_message: "mock audio error".to_string(),
        }
    }

    /// Sets the advertised stream format.
    pub fn with_format(mut self, sample_rate: f64, channels: usize) -> Self {
        self.sample_rate = sample_rate;
        self.channels = channels;
        self
    }

    /// Queues chunks to hand out in order; the source ends after the last.
    pub fn with_chunks(mut self, chunks: Vec<Vec<f32>>) -> Self {
        self.chunks = chunks.into();
        self
    }

    /// Makes `start` fail.
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Makes `read_chunk` fail.
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    /// Message carried by injected failures.
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            return Err(DrumlineError::AudioCapture {
                message: self.error_message.clone(),
            });
        }
        self.is_started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn read_chunk(&mut self) -> Result<Option<Vec<f32>>> {
        if self.should_fail_read {
            return Err(DrumlineError::AudioCapture {
                message: self.error_message.clone(),
            });
        }
        Ok(self.chunks.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_hands_out_chunks_in_order() {
        let mut source = MockAudioSource::new()
            .with_chunks(vec![vec![0.1], vec![0.2]]);
        source.start().unwrap();
        assert!(source.is_started());
        assert_eq!(source.read_chunk().unwrap(), Some(vec![0.1]));
        assert_eq!(source.read_chunk().unwrap(), Some(vec![0.2]));
        assert_eq!(source.read_chunk().unwrap(), None);
    }

    #[test]
    fn test_mock_format() {
        let source = MockAudioSource::new().with_format(48000.0, 2);
        assert_eq!(source.sample_rate(), 48000.0);
        assert_eq!(source.channels(), 2);
    }

    #[test]
    fn test_mock_start_failure() {
        let mut source = MockAudioSource::new()
            .with_start_failure()
            .with_error_message("device unplugged");
        let err = source.start().unwrap_err();
        assert_eq!(err.to_string(), "Audio capture failed: device unplugged");
        assert!(!source.is_started());
    }

    #[test]
    fn test_mock_read_failure() {
        let mut source = MockAudioSource::new().with_read_failure();
        source.start().unwrap();
        assert!(source.read_chunk().is_err());
    }
}
