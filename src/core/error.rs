use thiserror::Error;

/// HTTP-like status codes reported by the document service.
pub struct StatusCode;

impl StatusCode {
    pub const OK: u16 = 200;
    pub const NOT_MODIFIED: u16 = 304;
    pub const BAD_REQUEST: u16 = 400;
    pub const NOT_FOUND: u16 = 404;
    pub const CONFLICT: u16 = 409;
    pub const GONE: u16 = 410;
    pub const TOO_MANY_REQUESTS: u16 = 429;
}

/// Why a continuation token could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenParseError {
    #[error("Continuation token is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Continuation token must be a JSON object")]
    NotAnObject,

    #[error("Continuation token is missing field '{0}'")]
    MissingField(&'static str),

    #[error("Continuation token field '{field}' is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Service error {status_code} (activity {activity_id}): {message}")]
    Service {
        status_code: u16,
        activity_id: String,
        message: String,
    },

    #[error("Invalid continuation token: {0}")]
    InvalidContinuation(#[from] TokenParseError),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, FeedError>;

impl FeedError {
    pub fn service(
        status_code: u16,
        activity_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Service {
            status_code,
            activity_id: activity_id.into(),
            message: message.into(),
        }
    }

    /// Status code as the service would report it.
    ///
    /// Client-side failures map onto `400 Bad Request`, which is what the
    /// service answers for the same malformed input.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Service { status_code, .. } => *status_code,
            Self::InvalidContinuation(_) | Self::InvalidOptions(_) => StatusCode::BAD_REQUEST,
            Self::Serialization(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn activity_id(&self) -> Option<&str> {
        match self {
            Self::Service { activity_id, .. } => Some(activity_id),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == StatusCode::NOT_FOUND
    }

    pub fn is_conflict(&self) -> bool {
        self.status_code() == StatusCode::CONFLICT
    }

    /// Request rate too large; the caller may retry after backing off.
    pub fn is_throttled(&self) -> bool {
        self.status_code() == StatusCode::TOO_MANY_REQUESTS
    }

    /// The resource or the range behind a continuation no longer exists.
    pub fn is_gone(&self) -> bool {
        self.status_code() == StatusCode::GONE
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Serialization(err.to_string())
    }
}
