use dialog_service::services::PersonaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Dialog endpoint returned {status}: {message}")]
    Dialog { status: u16, message: String },

    #[error(transparent)]
    Persona(#[from] PersonaError),

    #[error("{0}")]
    InvalidInput(String),
}

impl AssessmentError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        AssessmentError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
