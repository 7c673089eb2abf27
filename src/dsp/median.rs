//! Sliding-window median smoother.

use crate::error::{DrumlineError, Result};

/// Running median over a fixed window, streamed across chunks.
///
/// The window starts zero-filled, so early outputs are biased toward zero
/// rather than being withheld. Output length always equals input length.
#[derive(Debug, Clone)]
pub struct MedianFilter {
    window: Vec<f32>,
    next: usize,
    scratch: Vec<f32>,
}

impl MedianFilter {
    /// # Errors
    /// Returns `ConfigInvalidValue` for a zero-width window.
    pub fn new(width: usize) -> Result<Self> {
        if width == 0 {
            return Err(DrumlineError::ConfigInvalidValue {
                key: "smoothing_window".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(Self {
            window: vec![0.0; width],
            next: 0,
            scratch: vec![0.0; width],
        })
    }

    /// Window width in samples.
    pub fn width(&self) -> usize {
        self.window.len()
    }

    /// Pushes each sample into the window and emits the window median.
    ///
    /// Even widths average the two middle values. A width-1 filter is an
    /// exact passthrough.
    pub fn process_chunk(&mut self, samples: &[f32]) -> Vec<f32> {
        let mut out = Vec::with_capacity(samples.len());
        let width = self.window.len();
        for &x in samples {
            self.window[self.next] = x;
            self.next = (self.next + 1) % width;

            self.scratch.copy_from_slice(&self.window);
            self.scratch
                .sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let median = if width % 2 == 1 {
                self.scratch[width / 2]
            } else {
                (self.scratch[width / 2 - 1] + self.scratch[width / 2]) / 2.0
            };
            out.push(median);
        }
        out
    }

    /// Zero-fills the window, as if freshly constructed.
    pub fn reset(&mut self) {
        self.window.fill(0.0);
        self.next = 0;
    }
}
