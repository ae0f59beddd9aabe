use crate::model::Stage;

/// Failure of a single call to the highlight service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The request never produced a response (connect, DNS, TLS, body read).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("server returned {status}")]
    Status {
        status: u16,
        /// Response text, `None` when absent or blank.
        body: Option<String>,
    },

    /// The response could not be decoded into the expected payload.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        ServiceError::Transport(e.to_string())
    }
}

impl ServiceError {
    /// Error text supplied by the server, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            ServiceError::Status { body, .. } => body.as_deref(),
            _ => None,
        }
    }
}

/// A failed workflow attempt. Never fatal to the session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("upload failed: {0}")]
    Upload(#[source] ServiceError),

    #[error("processing failed: {0}")]
    Processing(#[source] ServiceError),

    #[error("fetching results failed: {0}")]
    Results(#[source] ServiceError),
}

impl WorkflowError {
    pub fn stage(&self) -> Stage {
        match self {
            WorkflowError::Upload(_) => Stage::Upload,
            WorkflowError::Processing(_) => Stage::Processing,
            WorkflowError::Results(_) => Stage::Results,
        }
    }

    fn source_error(&self) -> &ServiceError {
        match self {
            WorkflowError::Upload(e) | WorkflowError::Processing(e) | WorkflowError::Results(e) => e,
        }
    }

    /// Server-supplied text when present, otherwise the stage's generic message.
    pub fn message(&self) -> String {
        if let Some(body) = self.source_error().body() {
            return body.to_string();
        }
        let generic = match (self, self.source_error()) {
            (WorkflowError::Upload(_), ServiceError::Transport(_)) => "Error uploading video.",
            (WorkflowError::Upload(_), _) => "Upload failed. Please try again.",
            (WorkflowError::Processing(_), ServiceError::Transport(_)) => {
                "Error running highlight generator."
            }
            (WorkflowError::Processing(_), _) => "Processing failed. Please try again.",
            (WorkflowError::Results(_), _) => "Error fetching results.",
        };
        generic.to_string()
    }

    /// User-visible status line for this failure.
    pub fn status_text(&self) -> String {
        match self.source_error().body() {
            Some(body) => {
                let prefix = match self {
                    WorkflowError::Upload(_) => "Upload failed",
                    WorkflowError::Processing(_) => "Processing failed",
                    WorkflowError::Results(_) => "Fetching results failed",
                };
                format!("{prefix}: {body}")
            }
            None => self.message(),
        }
    }
}
