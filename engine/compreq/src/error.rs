use thiserror::Error;

/// Result alias used across the crate.
pub type RequestResult<T> = Result<T, RequestError>;

/// Coarse error categories, stable enough to map onto HTTP responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BodyParse,
    PathEncoding,
    Validation,
    ChecksumMismatch,
    ActionClassification,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BodyParse => "E_BODY_PARSE",
            ErrorKind::PathEncoding => "E_PATH_ENCODING",
            ErrorKind::Validation => "E_VALIDATION",
            ErrorKind::ChecksumMismatch => "E_CHECKSUM_MISMATCH",
            ErrorKind::ActionClassification => "E_ACTION_CLASSIFICATION",
        }
    }
}

/// Every way building a component request can fail. All of them are fatal
/// for the request being built.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("body could not be parsed: {0}")]
    BodyParse(String),
    #[error("invalid form key {key:?}: {reason}")]
    PathEncoding { key: String, reason: String },
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    ChecksumMismatch(String),
    #[error("action {index} has an invalid method name {name:?}: {reason}")]
    ActionClassification {
        index: usize,
        name: String,
        reason: String,
    },
}

impl RequestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RequestError::BodyParse(_) => ErrorKind::BodyParse,
            RequestError::PathEncoding { .. } => ErrorKind::PathEncoding,
            RequestError::Validation(_) => ErrorKind::Validation,
            RequestError::ChecksumMismatch(_) => ErrorKind::ChecksumMismatch,
            RequestError::ActionClassification { .. } => ErrorKind::ActionClassification,
        }
    }

    pub(crate) fn path(key: &str, reason: impl Into<String>) -> Self {
        RequestError::PathEncoding {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for RequestError {
    fn from(value: serde_json::Error) -> Self {
        RequestError::BodyParse(value.to_string())
    }
}
