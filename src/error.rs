//! Error types for drumline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DrumlineError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Sample-rate errors
    #[error("Unsupported sample rate: cannot decimate {source_hz} Hz to {target_hz} Hz")]
    UnsupportedRate { source_hz: f64, target_hz: f64 },

    #[error("Sample rate changed mid-stream: pipeline locked at {locked_hz} Hz, chunk arrived at {got_hz} Hz")]
    RateChanged { locked_hz: f64, got_hz: f64 },

    // Audio capture errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    // Event server errors
    #[error("Event server socket error: {message}")]
    ServerSocket { message: String },

    #[error("Event server connection failed: {message}")]
    ServerConnection { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, DrumlineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_file_not_found_display() {
        let error = DrumlineError::ConfigFileNotFound {
            path: "/path/to/config.toml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found at /path/to/config.toml"
        );
    }

    #[test]
    fn test_config_invalid_value_display() {
        let error = DrumlineError::ConfigInvalidValue {
            key: "decay_factor".to_string(),
            message: "must be strictly between 0 and 1".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for decay_factor: must be strictly between 0 and 1"
        );
    }

    #[test]
    fn test_unsupported_rate_display() {
        let error = DrumlineError::UnsupportedRate {
            source_hz: 16000.0,
            target_hz: 44100.0,
        };
        assert_eq!(
            error.to_string(),
            "Unsupported sample rate: cannot decimate 16000 Hz to 44100 Hz"
        );
    }

    #[test]
    fn test_rate_changed_display() {
        let error = DrumlineError::RateChanged {
            locked_hz: 48000.0,
            got_hz: 44100.0,
        };
        assert!(error.to_string().contains("locked at 48000 Hz"));
        assert!(error.to_string().contains("arrived at 44100 Hz"));
    }

    #[test]
    fn test_audio_device_not_found_display() {
        let error = DrumlineError::AudioDeviceNotFound {
            device: "default".to_string(),
        };
        assert_eq!(error.to_string(), "Audio device not found: default");
    }

    #[test]
    fn test_audio_capture_display() {
        let error = DrumlineError::AudioCapture {
            message: "buffer overflow".to_string(),
        };
        assert_eq!(error.to_string(), "Audio capture failed: buffer overflow");
    }

    #[test]
    fn test_server_socket_display() {
        let error = DrumlineError::ServerSocket {
            message: "bind failed".to_string(),
        };
        assert_eq!(error.to_string(), "Event server socket error: bind failed");
    }

    #[test]
    fn test_other_display() {
        let error = DrumlineError::Other("unexpected error".to_string());
        assert_eq!(error.to_string(), "unexpected error");
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: DrumlineError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_str = "invalid = toml = syntax";
        let toml_error = toml::from_str::<toml::Value>(toml_str).unwrap_err();
        let error: DrumlineError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<DrumlineError>();
        assert_sync::<DrumlineError>();
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }
}
