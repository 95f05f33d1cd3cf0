//! Whisper speech-to-text over the OpenAI audio API.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use opentwin_config::VoiceConfig;
use opentwin_core::{SpeechError, SpeechToText};
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::OPENAI_BASE_URL;

pub struct WhisperClient {
    api_key: String,
    model: String,
    language: String,
    base_url: String,
    client: reqwest::Client,
}

impl WhisperClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, language: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            api_key: api_key.into(),
            model: model.into(),
            language: language.into(),
            base_url: OPENAI_BASE_URL.into(),
            client,
        }
    }

    pub fn from_config(api_key: &str, config: &VoiceConfig) -> Self {
        Self::new(api_key, &config.stt_model, &config.stt_language)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn mime_for(path: &Path) -> &'static str {
        match path.extension().and_then(|e| e.to_str()) {
            Some("mp3") => "audio/mpeg",
            Some("m4a") => "audio/mp4",
            Some("webm") => "audio/webm",
            _ => "audio/wav",
        }
    }
}

#[async_trait]
impl SpeechToText for WhisperClient {
    async fn transcribe(&self, audio: &Path) -> Result<String, SpeechError> {
        let bytes = tokio::fs::read(audio)
            .await
            .map_err(|e| SpeechError::Transcription(format!("cannot read {}: {e}", audio.display())))?;

        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".into());
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(Self::mime_for(audio))
            .map_err(|e| SpeechError::Transcription(e.to_string()))?;

        let form = Form::new()
            .text("model", self.model.clone())
            .text("language", self.language.clone())
            .text("response_format", "text")
            .part("file", part);

        debug!(model = %self.model, "Sending transcription request");
        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SpeechError::Transcription(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Transcription(format!("HTTP {status}: {body}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| SpeechError::Transcription(e.to_string()))?;
        Ok(text.trim().to_string())
    }
}
