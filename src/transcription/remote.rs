use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

use crate::config::TranscriptionConfig;
use crate::error::{Result, VoiceError};

use super::{AudioPayload, Transcriber};

/// HTTP transcription client
///
/// Posts one multipart body per request: a single audio part under the
/// configured field name, authenticated by a static bearer credential.
pub struct RemoteTranscriber {
    client: Client,
    endpoint: String,
    field_name: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    text: String,
}

impl RemoteTranscriber {
    /// Build a client from config; the credential may also come from the
    /// CAMPCARE_TRANSCRIBE_KEY environment variable
    #[must_use]
    pub fn new(config: &TranscriptionConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint.clone(),
            field_name: config.field_name.clone(),
            api_key: config.resolve_api_key(),
        }
    }

    /// Override the endpoint, used by tests against a local server
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| VoiceError::Config("transcription API key not set".to_owned()))
    }
}

#[async_trait]
impl Transcriber for RemoteTranscriber {
    async fn transcribe(&self, payload: AudioPayload) -> Result<String> {
        let api_key = self.api_key()?;

        let audio_part = reqwest::multipart::Part::bytes(payload.data)
            .file_name(payload.file_name)
            .mime_str(payload.mime)
            .map_err(|e| VoiceError::Config(format!("invalid payload mime: {e}")))?;

        let form = reqwest::multipart::Form::new().part(self.field_name.clone(), audio_part);

        debug!(endpoint = %self.endpoint, "sending transcription request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {api_key}"))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("transcription API error: {} - {}", status, body);
            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                return Err(VoiceError::TranscriptionRejected {
                    status: status.as_u16(),
                });
            }
            return Err(VoiceError::TranscriptionTransport {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: TranscribeResponse = response.json().await?;

        debug!(text_len = body.text.len(), "transcription completed");

        Ok(body.text)
    }
}
