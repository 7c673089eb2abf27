//! Live audio capture using CPAL.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::audio::source::AudioSource;
use crate::error::{DrumlineError, Result};

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// This suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers
/// when probing audio backends. The messages are harmless but confusing
/// to users.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2
/// (stderr). Safe as long as no other thread is concurrently manipulating
/// fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Quiet down JACK/ALSA/PipeWire chatter during backend probing.
///
/// # Safety
/// Modifies environment variables; call at startup before spawning threads.
pub fn suppress_audio_warnings() {
    // SAFETY: called at startup before any threads are spawned
    unsafe {
        std::env::set_var("JACK_NO_START_SERVER", "1");
        std::env::set_var("JACK_NO_AUDIO_RESERVATION", "1");
        std::env::set_var("PIPEWIRE_DEBUG", "0");
        std::env::set_var("ALSA_DEBUG", "0");
        std::env::set_var("PW_LOG", "0");
    }
}

/// Preferred device names for GNOME/PipeWire environments.
const PREFERRED_DEVICES: &[&str] = &["pipewire", "pulse", "PulseAudio"];

/// Device name patterns that are never useful capture targets.
const FILTERED_PATTERNS: &[&str] = &[
    "surround",
    "front:",
    "rear:",
    "center:",
    "side:",
    "Digital Output",
    "HDMI",
    "S/PDIF",
];

fn should_filter_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    FILTERED_PATTERNS
        .iter()
        .any(|pattern| lower.contains(&pattern.to_lowercase()))
}

fn is_preferred_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    PREFERRED_DEVICES
        .iter()
        .any(|pref| lower.contains(&pref.to_lowercase()))
}

/// List usable audio input devices, with preferred devices marked
/// "\[recommended\]".
///
/// # Errors
/// Returns `AudioCapture` if device enumeration fails.
pub fn list_devices() -> Result<Vec<String>> {
    let (host, devices) = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host.input_devices();
        (host, devices)
    });
    let _ = host; // keep host alive while iterating devices
    let devices = devices.map_err(|e| DrumlineError::AudioCapture {
        message: format!("Failed to enumerate input devices: {}", e),
    })?;

    let mut device_names = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            if should_filter_device(&name) {
                continue;
            }
            if is_preferred_device(&name) {
                device_names.push(format!("{} [recommended]", name));
            } else {
                device_names.push(name);
            }
        }
    }

    Ok(device_names)
}

/// Pick the best default input device, preferring PipeWire/PulseAudio so
/// the desktop's device selection is respected.
fn get_best_default_device() -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();

        if let Ok(devices) = host.input_devices() {
            for device in devices {
                if let Ok(name) = device.name()
                    && is_preferred_device(&name)
                {
                    return Ok(device);
                }
            }
        }

        host.default_input_device()
            .ok_or_else(|| DrumlineError::AudioDeviceNotFound {
                device: "default".to_string(),
            })
    })
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is only touched through the Mutex in
/// CpalAudioSource, so it never crosses thread boundaries unsynchronized.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Live capture at the device's native format.
///
/// Samples are delivered interleaved as f32 at whatever rate and channel
/// count the device runs at; rate conversion is the detection pipeline's
/// job, not the capture layer's.
pub struct CpalAudioSource {
    device: cpal::Device,
    stream: Arc<Mutex<Option<SendableStream>>>,
    buffer: Arc<Mutex<Vec<f32>>>,
    sample_rate: f64,
    channels: usize,
    chunk_ms: u64,
}

impl CpalAudioSource {
    /// Open a capture device.
    ///
    /// `device_name` is matched case-insensitively as a substring against
    /// input device names; `None` picks the best default.
    ///
    /// # Errors
    /// `AudioDeviceNotFound` if no device matches, `AudioCapture` if the
    /// device refuses to report a config.
    pub fn new(device_name: Option<&str>, chunk_ms: u64) -> Result<Self> {
        let device = with_suppressed_stderr(|| {
            let host = cpal::default_host();

            if let Some(name) = device_name {
                let wanted = name.to_lowercase();
                let devices = host
                    .input_devices()
                    .map_err(|e| DrumlineError::AudioCapture {
                        message: format!("Failed to enumerate devices: {}", e),
                    })?;

                devices
                    .into_iter()
                    .find(|dev| {
                        dev.name()
                            .map(|n| n.to_lowercase().contains(&wanted))
                            .unwrap_or(false)
                    })
                    .ok_or_else(|| DrumlineError::AudioDeviceNotFound {
                        device: name.to_string(),
                    })
            } else {
                get_best_default_device()
            }
        })?;

        let config = device
            .default_input_config()
            .map_err(|e| DrumlineError::AudioCapture {
                message: format!("Failed to query device config: {}", e),
            })?;

        Ok(Self {
            sample_rate: config.sample_rate() as f64,
            channels: config.channels() as usize,
            device,
            stream: Arc::new(Mutex::new(None)),
            buffer: Arc::new(Mutex::new(Vec::new())),
            chunk_ms,
        })
    }

    /// Build the input stream, trying f32 first and falling back to i16
    /// with conversion for devices that only expose integer formats.
    fn build_stream(&self) -> Result<cpal::Stream> {
        let config = cpal::StreamConfig {
            channels: self.channels as u16,
            sample_rate: self.sample_rate as u32,
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            eprintln!("Audio stream error: {}", err);
        };

        let buffer = Arc::clone(&self.buffer);
        if let Ok(stream) = self.device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend_from_slice(data);
                }
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        let buffer = Arc::clone(&self.buffer);
        self.device
            .build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend(data.iter().map(|&s| s as f32 / 32768.0));
                    }
                },
                err_callback,
                None,
            )
            .map_err(|e| DrumlineError::AudioCapture {
                message: format!("Failed to build input stream: {}", e),
            })
    }

    fn chunk_samples(&self) -> usize {
        let per_channel = (self.sample_rate * self.chunk_ms as f64 / 1000.0) as usize;
        per_channel.max(1) * self.channels
    }
}

impl AudioSource for CpalAudioSource {
    fn start(&mut self) -> Result<()> {
        let stream = with_suppressed_stderr(|| self.build_stream())?;
        stream.play().map_err(|e| DrumlineError::AudioCapture {
            message: format!("Failed to start stream: {}", e),
        })?;

        if let Ok(mut guard) = self.stream.lock() {
            *guard = Some(SendableStream(stream));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Ok(mut guard) = self.stream.lock() {
            *guard = None; // dropping the stream stops capture
        }
        Ok(())
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn channels(&self) -> usize {
        self.channels
    }

    /// Blocks until roughly `chunk_ms` of audio has accumulated, then
    /// drains the whole buffer. Returns whatever arrived if the device
    /// stalls past twice the chunk length.
    fn read_chunk(&mut self) -> Result<Option<Vec<f32>>> {
        {
            let guard = self.stream.lock().map_err(|_| DrumlineError::AudioCapture {
                message: "stream mutex poisoned".to_string(),
            })?;
            if guard.is_none() {
                return Err(DrumlineError::AudioCapture {
                    message: "capture not started".to_string(),
                });
            }
        }

        let wanted = self.chunk_samples();
        let deadline = Instant::now() + Duration::from_millis(self.chunk_ms * 2);
        loop {
            {
                let mut buf = self.buffer.lock().map_err(|_| DrumlineError::AudioCapture {
                    message: "buffer mutex poisoned".to_string(),
                })?;
                if buf.len() >= wanted || (Instant::now() >= deadline && !buf.is_empty()) {
                    return Ok(Some(std::mem::take(&mut *buf)));
                }
            }
            if Instant::now() >= deadline {
                // stalled device, nothing yet
                return Ok(Some(Vec::new()));
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}
