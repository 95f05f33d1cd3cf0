//! OpenAI text-to-speech.

use std::time::Duration;

use async_trait::async_trait;
use opentwin_config::VoiceConfig;
use opentwin_core::{SpeechError, TextToSpeech};
use tracing::debug;

use crate::OPENAI_BASE_URL;

pub struct OpenAiSpeech {
    api_key: String,
    model: String,
    voice: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiSpeech {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, voice: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            api_key: api_key.into(),
            model: model.into(),
            voice: voice.into(),
            base_url: OPENAI_BASE_URL.into(),
            client,
        }
    }

    pub fn from_config(api_key: &str, config: &VoiceConfig) -> Self {
        Self::new(api_key, &config.tts_model, &config.tts_voice)
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    pub fn set_voice(&mut self, voice: impl Into<String>) {
        self.voice = voice.into();
    }

    fn body(&self, text: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "voice": self.voice,
            "input": text,
            "response_format": "mp3",
        })
    }
}

#[async_trait]
impl TextToSpeech for OpenAiSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError> {
        if text.trim().is_empty() {
            return Err(SpeechError::Synthesis("nothing to say".into()));
        }

        debug!(model = %self.model, voice = %self.voice, chars = text.len(), "Sending speech request");
        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.body(text))
            .send()
            .await
            .map_err(|e| SpeechError::Synthesis(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Synthesis(format!("HTTP {status}: {body}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SpeechError::Synthesis(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_uses_configured_voice() {
        let mut tts = OpenAiSpeech::from_config("sk", &VoiceConfig::default());
        assert_eq!(tts.body("Hi")["voice"], "nova");
        tts.set_voice("alloy");
        let body = tts.body("Hi");
        assert_eq!(body["voice"], "alloy");
        assert_eq!(body["model"], "tts-1");
        assert_eq!(body["input"], "Hi");
    }

    #[tokio::test]
    async fn blank_text_is_rejected() {
        let tts = OpenAiSpeech::from_config("sk", &VoiceConfig::default());
        assert!(matches!(tts.synthesize("  ").await, Err(SpeechError::Synthesis(_))));
    }
}
