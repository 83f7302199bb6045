use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{0}")]
    Message(String),
}

impl TransportError {
    pub fn message(text: impl Into<String>) -> Self {
        TransportError::Message(text.into())
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid request body: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DispatchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            DispatchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
