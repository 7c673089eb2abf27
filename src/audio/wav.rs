//! WAV file playback as an audio source.

use hound::{SampleFormat, WavReader};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::audio::source::AudioSource;
use crate::error::{DrumlineError, Result};

/// Streams a WAV file through the `AudioSource` interface at the file's
/// native rate and channel count, in fixed-duration chunks.
///
/// Integer samples are normalized to [-1.0, 1.0); float files pass
/// through unchanged.
pub struct WavFileSource {
    reader: WavReader<BufReader<File>>,
    sample_rate: f64,
    channels: usize,
    chunk_samples: usize,
    finished: bool,
}

impl WavFileSource {
    /// # Errors
    /// `Io` if the file cannot be opened, `Other` on a malformed WAV
    /// header or an unsupported bit depth.
    pub fn open(path: &Path, chunk_ms: u64) -> Result<Self> {
        let reader = WavReader::open(path)
            .map_err(|e| DrumlineError::Other(format!("Failed to open WAV {}: {}", path.display(), e)))?;
        let spec = reader.spec();

        match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Float, 32) | (SampleFormat::Int, 8 | 16 | 24 | 32) => {}
            (format, bits) => {
                return Err(DrumlineError::Other(format!(
                    "Unsupported WAV format: {:?} at {} bits",
                    format, bits
                )));
            }
        }

        let sample_rate = spec.sample_rate as f64;
        let channels = spec.channels as usize;
        let per_channel = ((sample_rate * chunk_ms as f64 / 1000.0) as usize).max(1);

        Ok(Self {
            reader,
            sample_rate,
            channels,
            chunk_samples: per_channel * channels,
            finished: false,
        })
    }

    fn read_normalized(&mut self, out: &mut Vec<f32>) -> Result<()> {
        let spec = self.reader.spec();
        match spec.sample_format {
            SampleFormat::Float => {
                for sample in self.reader.samples::<f32>().take(self.chunk_samples) {
                    out.push(sample.map_err(wav_err)?);
                }
            }
            SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
                for sample in self.reader.samples::<i32>().take(self.chunk_samples) {
                    out.push(sample.map_err(wav_err)? as f32 * scale);
                }
            }
        }
        Ok(())
    }
}

fn wav_err(e: hound::Error) -> DrumlineError {
    DrumlineError::Other(format!("WAV read error: {}", e))
}

impl AudioSource for WavFileSource {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn read_chunk(&mut self) -> Result<Option<Vec<f32>>> {
        if self.finished {
            return Ok(None);
        }
        let mut chunk = Vec::with_capacity(self.chunk_samples);
        self.read_normalized(&mut chunk)?;
        if chunk.len() < self.chunk_samples {
            self.finished = true;
        }
        if chunk.is_empty() {
            return Ok(None);
        }
        Ok(Some(chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    fn write_test_wav(path: &Path, rate: u32, channels: u16, samples: &[i16]) {
        let spec = WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_reports_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_test_wav(&path, 44100, 2, &[0i16; 1024]);

        let source = WavFileSource::open(&path, 50).unwrap();
        assert_eq!(source.sample_rate(), 44100.0);
        assert_eq!(source.channels(), 2);
    }

    #[test]
    fn test_chunks_until_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.wav");
        // 100 ms of mono at 1 kHz = 100 samples; 50 ms chunks = 50 each
        write_test_wav(&path, 1000, 1, &[1000i16; 100]);

        let mut source = WavFileSource::open(&path, 50).unwrap();
        let first = source.read_chunk().unwrap().unwrap();
        assert_eq!(first.len(), 50);
        let second = source.read_chunk().unwrap().unwrap();
        assert_eq!(second.len(), 50);
        assert_eq!(source.read_chunk().unwrap(), None);
    }

    #[test]
    fn test_int_samples_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("norm.wav");
        write_test_wav(&path, 8000, 1, &[i16::MAX, 0, i16::MIN]);

        let mut source = WavFileSource::open(&path, 1000).unwrap();
        let chunk = source.read_chunk().unwrap().unwrap();
        assert!((chunk[0] - (i16::MAX as f32 / 32768.0)).abs() < 1e-6);
        assert_eq!(chunk[1], 0.0);
        assert!((chunk[2] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = WavFileSource::open(Path::new("/nonexistent/none.wav"), 50);
        assert!(result.is_err());
    }
}
