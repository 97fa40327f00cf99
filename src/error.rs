use thiserror::Error;

/// A server round trip that did not produce usable data. Callers keep their
/// state unchanged; the next scroll or poll tick naturally asks again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server responded {status}: {reason}")]
    Status { status: u16, reason: String },
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl NetworkError {
    /// The notice shown to the user. Deliberately generic.
    pub fn notice(&self) -> String {
        match self {
            NetworkError::Status { status: 404 | 502 | 503, .. } | NetworkError::Transport(_) => {
                "Failed to connect to server.".to_string()
            }
            NetworkError::Status { status, reason } => {
                format!("Error connecting with server {status}:{reason}")
            }
            NetworkError::Decode(_) => "Unexpected response from server.".to_string(),
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            NetworkError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            }
        } else if err.is_decode() {
            NetworkError::Decode(err.to_string())
        } else {
            NetworkError::Transport(err.to_string())
        }
    }
}

/// A range request that must never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid term range [{from}, {to}) for a text of {term_count} terms")]
pub struct InvalidRangeRequest {
    pub from: usize,
    pub to: usize,
    pub term_count: usize,
}

/// Term data was requested before the reading text was opened. This is a
/// wiring bug, not something to recover from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("reading text state is not available")]
pub struct MissingReadingState;
