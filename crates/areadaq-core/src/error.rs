//! Error types for detector adapters.
//!
//! The crate exposes one typed vocabulary, [`DetectorError`], for failures
//! that callers can reasonably match on: signal connection state, read-only
//! violations, bounded-wait timeouts, and writer preconditions. Async trait
//! seams return [`anyhow::Result`] so adapter crates can layer their own
//! typed errors on top; a `DetectorError` travels through those seams
//! unchanged and can be recovered with `downcast_ref`.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias for results carrying a [`DetectorError`].
pub type AppResult<T> = std::result::Result<T, DetectorError>;

/// Failures surfaced by the core signal, writer, and detector layers.
#[derive(Error, Debug)]
pub enum DetectorError {
    /// Configuration file could not be loaded or deserialized.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A configuration value was present but rejected.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Filesystem or other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation on a signal before `connect()` selected a mode.
    #[error("Signal '{pv}' is not connected; call connect() first")]
    SignalNotConnected {
        /// Process-variable name of the signal.
        pv: String,
    },

    /// Write attempted on a read-only signal.
    #[error("Signal '{pv}' is read-only")]
    SignalReadOnly {
        /// Process-variable name of the signal.
        pv: String,
    },

    /// `set_mock_value` used on a signal that is not mock-connected.
    #[error("Signal '{pv}' is not in mock mode; mock overrides require connect(mock = true)")]
    MockOverrideOnLiveSignal {
        /// Process-variable name of the signal.
        pv: String,
    },

    /// Live mode requested for a signal with no transport hooks wired.
    #[error("Signal '{pv}' has no live transport configured")]
    TransportMissing {
        /// Process-variable name of the signal.
        pv: String,
    },

    /// A bounded wait on a signal value elapsed without a match.
    #[error("Timed out after {seconds}s waiting for signal '{pv}'")]
    WaitTimeout {
        /// Process-variable name of the signal.
        pv: String,
        /// Wait bound that elapsed.
        seconds: f64,
    },

    /// The writer's target directory does not exist on the plugin host.
    #[error("File path {} for HDF plugin does not exist", .path.display())]
    FilePathMissing {
        /// Directory the path provider selected.
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_errors_name_the_pv() {
        let err = DetectorError::SignalNotConnected { pv: "CAM:Acquire".into() };
        assert_eq!(
            err.to_string(),
            "Signal 'CAM:Acquire' is not connected; call connect() first"
        );

        let err = DetectorError::SignalReadOnly { pv: "HDF1:FullFileName_RBV".into() };
        assert_eq!(err.to_string(), "Signal 'HDF1:FullFileName_RBV' is read-only");
    }

    #[test]
    fn wait_timeout_reports_bound() {
        let err = DetectorError::WaitTimeout { pv: "CAM:Acquire".into(), seconds: 10.0 };
        assert_eq!(err.to_string(), "Timed out after 10s waiting for signal 'CAM:Acquire'");
    }

    #[test]
    fn file_path_missing_matches_plugin_wording() {
        let err = DetectorError::FilePathMissing { path: PathBuf::from("/data/run1") };
        assert_eq!(err.to_string(), "File path /data/run1 for HDF plugin does not exist");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: DetectorError = io.into();
        assert!(err.to_string().contains("gone"));
    }
}
