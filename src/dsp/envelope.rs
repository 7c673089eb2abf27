//! Peak envelope follower with exponential decay.

/// Tracks the rectified peak level of a signal across chunks.
///
/// Per sample the held value first decays by a constant factor, then snaps
/// up to the sample's absolute value if that is larger. Instant attack,
/// exponential release.
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    decay: f32,
    value: f32,
}

impl EnvelopeFollower {
    /// `decay` is the per-sample retention factor, expected in `(0, 1)`.
    pub fn new(decay: f32) -> Self {
        Self { decay, value: 0.0 }
    }

    /// Current held envelope value.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Advances the follower over one chunk and returns the envelope,
    /// one value per input sample.
    pub fn process_chunk(&mut self, samples: &[f32]) -> Vec<f32> {
        let mut out = Vec::with_capacity(samples.len());
        for &x in samples {
            self.value *= self.decay;
            let magnitude = x.abs();
            if magnitude > self.value {
                self.value = magnitude;
            }
            out.push(self.value);
        }
        out
    }

    /// Drops the held value back to zero.
    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_rectified_peak() {
        let mut env = EnvelopeFollower::new(0.95);
        let out = env.process_chunk(&[0.0, -0.8, 0.1]);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 0.8);
        // 0.1 is below the decayed peak, so the decay wins
        assert_eq!(out[2], 0.8 * 0.95);
    }

    #[test]
    fn test_decay_is_exact_per_sample() {
        let mut env = EnvelopeFollower::new(0.9);
        let out = env.process_chunk(&[1.0, 0.0, 0.0, 0.0]);
        assert_eq!(out, vec![1.0, 0.9, 0.9 * 0.9, 0.9 * 0.9 * 0.9]);
    }

    #[test]
    fn test_state_carries_across_chunks() {
        let mut env = EnvelopeFollower::new(0.5);
        env.process_chunk(&[1.0]);
        let out = env.process_chunk(&[0.0]);
        assert_eq!(out, vec![0.5]);
    }

    #[test]
    fn test_attack_is_instant() {
        let mut env = EnvelopeFollower::new(0.95);
        let out = env.process_chunk(&[0.1, 0.9]);
        assert_eq!(out[1], 0.9);
    }

    #[test]
    fn test_empty_chunk_is_noop() {
        let mut env = EnvelopeFollower::new(0.95);
        env.process_chunk(&[0.7]);
        assert!(env.process_chunk(&[]).is_empty());
        assert_eq!(env.value(), 0.7);
    }

    #[test]
    fn test_reset_clears_held_value() {
        let mut env = EnvelopeFollower::new(0.95);
        env.process_chunk(&[1.0]);
        env.reset();
        assert_eq!(env.value(), 0.0);
        assert_eq!(env.process_chunk(&[0.0]), vec![0.0]);
    }
}
