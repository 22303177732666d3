use thiserror::Error;

/// Errors produced by the radstore client.
///
/// `Transport` and `Api` are the two failures the service itself reports:
/// an HTTP status outside the 2xx range, and a well-formed envelope whose
/// `status` is not `"ok"`. Everything else is a local or protocol problem.
#[derive(Debug, Error)]
pub enum Error {
    #[error("error: {status}: {reason}")]
    Transport { status: u16, reason: String },

    #[error("error: {status}: {message}")]
    Api { status: String, message: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("no {endpoint} matched the query")]
    EmptyResult { endpoint: &'static str },

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("field '{0}' is reserved and cannot be set")]
    ReservedField(String),

    #[error("{endpoint} resource has no identifier yet; save it first")]
    Unsaved { endpoint: &'static str },
}

impl Error {
    /// HTTP status code, for failures that carry one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Transport { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
