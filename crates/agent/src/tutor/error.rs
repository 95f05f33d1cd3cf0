use std::path::PathBuf;

use thiserror::Error;

/// Failures loading or querying tutor data.
#[derive(Debug, Error)]
pub enum TutorError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid {what} YAML: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Prompt key not found: {0}")]
    MissingKey(String),

    #[error("Prompt value at {0} is not text")]
    NotText(String),

    #[error("Scenario not found: {0}")]
    UnknownScenario(String),
}

impl From<TutorError> for opentwin_core::Error {
    fn from(e: TutorError) -> Self {
        match e {
            TutorError::UnknownScenario(_) => opentwin_core::Error::InvalidInput(e.to_string()),
            other => opentwin_core::Error::Config {
                message: other.to_string(),
            },
        }
    }
}
