//! Rising-edge extraction from a binary detection signal.

/// Finds LOW-to-HIGH flips in a chunked bit stream.
///
/// The last bit of each chunk is carried over, so an edge that straddles a
/// chunk boundary is still reported, on the first sample of the next chunk.
#[derive(Debug, Clone, Default)]
pub struct EdgeExtractor {
    previous: u8,
}

impl EdgeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the chunk-local indices where the signal flips from 0 to 1.
    pub fn process_chunk(&mut self, bits: &[u8]) -> Vec<usize> {
        let mut edges = Vec::new();
        for (i, &bit) in bits.iter().enumerate() {
            if bit == 1 && self.previous == 0 {
                edges.push(i);
            }
            self.previous = bit;
        }
        edges
    }

    /// Forgets the carried bit, treating the next chunk as preceded by LOW.
    pub fn reset(&mut self) {
        self.previous = 0;
    }
}
