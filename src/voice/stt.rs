//! Speech-to-text (STT) processing

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use crate::provider::Provider;
use crate::store::AudioStore;
use crate::{Error, Result};

/// Largest accepted upload (25 MB)
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Response from the OpenAI-compatible transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    #[serde(default)]
    text: Option<String>,
}

/// Backend that transcribes an audio file
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe the file at `path`, spoken in `language`
    ///
    /// # Errors
    ///
    /// Returns error if transcription fails
    async fn transcribe_file(&self, path: &Path, language: &str) -> Result<String>;
}

/// Whisper transcription through the provider's `/audio/transcriptions`
pub struct WhisperApi {
    provider: Arc<Provider>,
    model: String,
}

impl WhisperApi {
    /// Create a Whisper backend using `model`
    #[must_use]
    pub const fn new(provider: Arc<Provider>, model: String) -> Self {
        Self { provider, model }
    }
}

#[async_trait]
impl SpeechToText for WhisperApi {
    async fn transcribe_file(&self, path: &Path, language: &str) -> Result<String> {
        let request = self.provider.post("audio/transcriptions")?;

        let audio = tokio::fs::read(path).await?;
        tracing::debug!(audio_bytes = audio.len(), model = %self.model, "starting Whisper transcription");

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.webm")
            .to_string();

        let form = Form::new()
            .part(
                "file",
                Part::bytes(audio)
                    .file_name(file_name)
                    .mime_str("audio/webm")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", language.to_string());

        let response = request.multipart(form).send().await.map_err(|e| {
            tracing::error!(error = %e, "Whisper request failed");
            e
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse response");
            e
        })?;

        Ok(result.text.unwrap_or_default())
    }
}

/// Converts uploaded audio buffers into transcripts
///
/// The remote API wants a named file, so each buffer is written to a
/// scratch file first. The scratch file is gone once `transcribe` returns,
/// whatever the outcome.
#[derive(Clone)]
pub struct Transcriber {
    backend: Arc<dyn SpeechToText>,
    store: Arc<AudioStore>,
    language: String,
}

impl Transcriber {
    /// Create a transcriber for `language`
    #[must_use]
    pub fn new(backend: Arc<dyn SpeechToText>, store: Arc<AudioStore>, language: impl Into<String>) -> Self {
        Self {
            backend,
            store,
            language: language.into(),
        }
    }

    /// Transcribe `audio`, returning trimmed text (possibly empty)
    ///
    /// # Errors
    ///
    /// Returns error if the buffer is too large, the scratch file cannot be
    /// written or the backend fails
    pub async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        if audio.len() > MAX_UPLOAD_BYTES {
            return Err(Error::Stt(format!(
                "audio is {} bytes, limit is {MAX_UPLOAD_BYTES}",
                audio.len()
            )));
        }

        let scratch = self.store.write_upload(audio).await?;
        let result = self
            .backend
            .transcribe_file(scratch.path(), &self.language)
            .await;
        drop(scratch);

        let text = result?.trim().to_string();
        tracing::info!(transcript = %text, "transcription complete");
        Ok(text)
    }
}
