//! Speech traits used by voice chat.

use std::path::Path;

use async_trait::async_trait;

use crate::error::SpeechError;

#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe an audio file to text.
    async fn transcribe(&self, audio: &Path) -> std::result::Result<String, SpeechError>;
}

#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Synthesize `text`, returning encoded audio bytes (MP3).
    async fn synthesize(&self, text: &str) -> std::result::Result<Vec<u8>, SpeechError>;
}
