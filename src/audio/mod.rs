//! Audio input: live capture, WAV files, and the source abstraction.

pub mod capture;
pub mod source;
pub mod wav;

pub use capture::{list_devices, suppress_audio_warnings, CpalAudioSource};
pub use source::{AudioSource, MockAudioSource};
pub use wav::WavFileSource;
