//! JSON line protocol for streaming detection events to clients.

use serde::{Deserialize, Serialize};

use crate::dsp::HitEvent;

/// Messages sent to connected clients, one JSON object per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Sent once per connection, before any events.
    Hello {
        version: String,
        band_low_hz: f64,
        band_high_hz: f64,
        hysteresis_threshold: f32,
    },
    /// A detected percussive hit.
    Hit {
        sample_index: u64,
        time_secs: f64,
        envelope: f32,
    },
    /// Periodic counters.
    Stats {
        chunks: u64,
        hits: u64,
        dropped_events: u64,
    },
}

impl ServerEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl From<&HitEvent> for ServerEvent {
    fn from(hit: &HitEvent) -> Self {
        ServerEvent::Hit {
            sample_index: hit.sample_index,
            time_secs: hit.time_secs,
            envelope: hit.envelope,
        }
    }
}
