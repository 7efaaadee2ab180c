use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between a request arriving and its answer leaving.
#[derive(Debug, Error)]
pub enum Error {
    /// The caller left out a required field.
    #[error("{0}")]
    MissingInput(String),

    /// The request body is larger than the server accepts.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// The supplied URL does not name a video.
    #[error("{0}")]
    InvalidReference(String),

    #[error("Error reading PDF: {0}")]
    DocumentUnreadable(String),

    #[error("Error fetching transcript: {0}")]
    TranscriptUnavailable(String),

    /// No model credential was configured at startup.
    #[error("{0}")]
    Misconfigured(String),

    #[error("Chat model error: {0}")]
    ChatUnavailable(String),
}

impl Error {
    /// True when the failure was caused by the shape of the request rather than a collaborator.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::MissingInput(_) | Error::InvalidReference(_) | Error::PayloadTooLarge(_)
        )
    }
}
