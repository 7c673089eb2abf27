//! Wiring between capture, detection, and output.
//!
//! Two plain threads joined by a bounded channel: the capture thread reads
//! chunks from the audio source, the worker thread runs the detection
//! pipeline and fans results out to the terminal and, when serving, the
//! event broadcast. A full queue drops the newest chunk rather than
//! blocking the capture side.

use crossbeam_channel::{bounded, RecvTimeoutError, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::audio::AudioSource;
use crate::config::DetectorConfig;
use crate::defaults;
use crate::dsp::DetectorPipeline;
use crate::error::{DrumlineError, Result};
use crate::output;
use crate::server::ServerEvent;

/// How often a `stats` event is published, in processed chunks.
const STATS_EVERY_CHUNKS: u64 = 100;

/// Counters accumulated by a detection run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectorStats {
    pub chunks: u64,
    pub hits: u64,
    pub dropped_chunks: u64,
}

/// Options for a detection run.
pub struct RunOptions {
    /// Publish hits and stats to this channel (the serve command).
    pub events: Option<broadcast::Sender<ServerEvent>>,
    /// Redraw a live envelope meter on stderr.
    pub show_meter: bool,
    /// Print each hit to stdout.
    pub print_hits: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            events: None,
            show_meter: false,
            print_hits: true,
        }
    }
}

/// A running detector; stop it to get the final counters.
pub struct DetectorHandle {
    running: Arc<AtomicBool>,
    capture: JoinHandle<()>,
    worker: JoinHandle<Result<DetectorStats>>,
}

impl DetectorHandle {
    /// Flag shared with both threads; clearing it ends the run.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Whether the worker is still processing. Turns false on its own when
    /// a finite source (a WAV file) runs dry.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed) && !self.worker.is_finished()
    }

    /// Signals both threads and waits for them.
    pub fn stop(self) -> Result<DetectorStats> {
        self.running.store(false, Ordering::Relaxed);
        self.capture
            .join()
            .map_err(|_| DrumlineError::Other("capture thread panicked".to_string()))?;
        self.worker
            .join()
            .map_err(|_| DrumlineError::Other("worker thread panicked".to_string()))?
    }
}

/// Starts the source and spawns the capture and worker threads.
///
/// # Errors
/// Config errors and source start failures surface here, before any
/// thread is spawned. Pipeline errors during the run stop the worker and
/// come back from [`DetectorHandle::stop`].
pub fn spawn_detector(
    mut source: Box<dyn AudioSource>,
    config: DetectorConfig,
    options: RunOptions,
) -> Result<DetectorHandle> {
    let mut pipeline = DetectorPipeline::new(config)?;
    source.start()?;

    let sample_rate = source.sample_rate();
    let channels = source.channels();
    let running = Arc::new(AtomicBool::new(true));
    let dropped = Arc::new(AtomicU64::new(0));
    let (tx, rx) = bounded::<Vec<f32>>(defaults::CHUNK_QUEUE_CAPACITY);

    let capture = {
        let running = Arc::clone(&running);
        let dropped = Arc::clone(&dropped);
        std::thread::spawn(move || {
            while running.load(Ordering::Relaxed) {
                match source.read_chunk() {
                    Ok(Some(chunk)) => match tx.try_send(chunk) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(TrySendError::Disconnected(_)) => break,
                    },
                    Ok(None) => break, // finite source exhausted
                    Err(e) => {
                        eprintln!("Audio source error: {}", e);
                        break;
                    }
                }
            }
            let _ = source.stop();
            // tx drops here, letting the worker drain and exit
        })
    };

    let worker = {
        let running = Arc::clone(&running);
        let dropped = Arc::clone(&dropped);
        std::thread::spawn(move || -> Result<DetectorStats> {
            let mut stats = DetectorStats::default();
            loop {
                let chunk = match rx.recv_timeout(Duration::from_millis(100)) {
                    Ok(chunk) => chunk,
                    Err(RecvTimeoutError::Timeout) => {
                        if running.load(Ordering::Relaxed) {
                            continue;
                        }
                        break;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                };

                let result = pipeline.process_chunk(&chunk, sample_rate, channels)?;
                stats.chunks += 1;
                stats.hits += result.hits.len() as u64;

                for hit in &result.hits {
                    if options.print_hits {
                        output::print_hit(hit);
                    }
                    if let Some(events) = &options.events {
                        let _ = events.send(ServerEvent::from(hit));
                    }
                }

                if options.show_meter
                    && let Some(&level) = result.smoothed.last()
                {
                    output::print_level(level);
                }

                if let Some(events) = &options.events
                    && stats.chunks % STATS_EVERY_CHUNKS == 0
                {
                    let _ = events.send(ServerEvent::Stats {
                        chunks: stats.chunks,
                        hits: stats.hits,
                        dropped_events: dropped.load(Ordering::Relaxed),
                    });
                }
            }
            stats.dropped_chunks = dropped.load(Ordering::Relaxed);
            running.store(false, Ordering::Relaxed);
            Ok(stats)
        })
    };

    Ok(DetectorHandle {
        running,
        capture,
        worker,
    })
}
