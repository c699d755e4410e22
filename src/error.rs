use thiserror::Error;

/// Result alias for controller operations
pub type Result<T> = std::result::Result<T, VoiceError>;

/// Errors surfaced by the voice-command controller and its collaborators
///
/// All of these are handled locally by the controller and converted to
/// user-facing spoken feedback; none are retried automatically.
#[derive(Debug, Error)]
pub enum VoiceError {
    /// A recording operation was called before `initialize()`
    #[error("controller not initialized: call initialize() with a navigator first")]
    NotInitialized,

    /// Microphone permission is not granted
    #[error("microphone permission denied")]
    PermissionDenied,

    /// Microphone acquisition failed (device busy, unavailable, revoked mid-flight)
    #[error("failed to acquire audio capture: {0}")]
    CaptureAcquisition(anyhow::Error),

    /// The transcription service rejected the credential (HTTP 401/403)
    #[error("transcription credential rejected (status {status})")]
    TranscriptionRejected {
        /// HTTP status returned by the service
        status: u16,
    },

    /// Transcription transport failure (non-success status or malformed body)
    #[error("transcription request failed (status {status}): {message}")]
    TranscriptionTransport {
        /// HTTP status returned by the service
        status: u16,
        /// Response body excerpt
        message: String,
    },

    /// Network-level failure reaching the transcription endpoint
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Invalid or missing configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem failure (config, logs)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
