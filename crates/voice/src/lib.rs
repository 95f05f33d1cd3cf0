//! Voice I/O for OpenTwin: Whisper transcription, OpenAI speech synthesis,
//! and microphone/speaker access through the platform's audio commands.

pub mod audio;
pub mod tts;
pub mod whisper;

pub use audio::{AudioPlayer, AudioRecorder, Recording};
pub use tts::OpenAiSpeech;
pub use whisper::WhisperClient;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
