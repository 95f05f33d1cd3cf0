//! Error types for the OpenTwin domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use std::path::PathBuf;

use thiserror::Error;

/// The top-level error type for all OpenTwin operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Rejected locally ---
    #[error("Invalid turn: {0}")]
    InvalidTurn(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // --- Delegates ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    // --- Transcripts ---
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for failures of an external collaborator (LLM backend or
    /// long-term store) that callers are expected to degrade around.
    pub fn is_delegate_unavailable(&self) -> bool {
        matches!(self, Error::Provider(_) | Error::Memory(_))
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Long-term store unavailable: {0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Nothing to save: session has no turns")]
    EmptySession,

    #[error("Cannot write transcript to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Extractor not configured: {0}")]
    NotConfigured(String),

    #[error("Unknown extractor type: {0}")]
    UnknownExtractor(String),

    #[error("Request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Could not read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("Recording failed: {0}")]
    Recording(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("No audio player found (tried: {0})")]
    NoPlayer(String),
}
