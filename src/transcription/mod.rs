//! Remote transcription client

mod remote;

pub use remote::RemoteTranscriber;

use async_trait::async_trait;

use crate::error::Result;

/// Captured audio packaged for upload
#[derive(Debug, Clone)]
pub struct AudioPayload {
    /// Encoded audio bytes
    pub data: Vec<u8>,
    /// MIME type of the encoding
    pub mime: &'static str,
    /// File name sent with the multipart part
    pub file_name: &'static str,
}

impl AudioPayload {
    /// Payload for an in-memory WAV encoding
    #[must_use]
    pub const fn wav(data: Vec<u8>) -> Self {
        Self {
            data,
            mime: "audio/wav",
            file_name: "recording.wav",
        }
    }
}

/// Transcription capability
///
/// One outbound request per recording cycle; no retry at this layer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Submit captured audio and return the raw transcript text
    ///
    /// # Errors
    /// Returns `TranscriptionRejected` on 401/403, `TranscriptionTransport`
    /// on other non-success responses, `Network` on transport failure
    async fn transcribe(&self, payload: AudioPayload) -> Result<String>;
}
