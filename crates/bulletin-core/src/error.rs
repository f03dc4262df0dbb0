//! Structured errors for REST operations.

use std::fmt;

use serde_json::Value;

/// REST operation that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Authenticate,
    List,
    Create,
    Update,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Authenticate => write!(f, "authenticate"),
            Operation::List => write!(f, "list newsletters"),
            Operation::Create => write!(f, "create newsletter"),
            Operation::Update => write!(f, "update newsletter"),
        }
    }
}

/// Categories of REST failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The credential request was rejected.
    AuthFailure,
    /// A list, create or update returned a non-success status.
    FetchFailure,
    /// The request timed out.
    Timeout,
    /// Connection could not be established.
    Connect,
    /// The response body could not be decoded.
    Parse,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::AuthFailure => write!(f, "auth_failure"),
            ApiErrorKind::FetchFailure => write!(f, "fetch_failure"),
            ApiErrorKind::Timeout => write!(f, "timeout"),
            ApiErrorKind::Connect => write!(f, "connect"),
            ApiErrorKind::Parse => write!(f, "parse"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub operation: Operation,
    /// One-line summary suitable for display
    pub message: String,
    /// Raw response body, when there was one
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, operation: Operation, message: impl Into<String>) -> Self {
        Self {
            kind,
            operation,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an error for a non-success HTTP status.
    ///
    /// Authentication rejections are `AuthFailure`; everything else is a
    /// `FetchFailure`. A `detail` field in a JSON body is lifted into the
    /// message.
    pub fn http_status(operation: Operation, status: u16, body: &str) -> Self {
        let kind = match operation {
            Operation::Authenticate => ApiErrorKind::AuthFailure,
            _ => ApiErrorKind::FetchFailure,
        };
        let detail = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|json| json.get("detail").and_then(Value::as_str).map(str::to_string));
        let message = match detail {
            Some(detail) => format!("HTTP {status}: {detail}"),
            None => format!("HTTP {status}"),
        };
        Self {
            kind,
            operation,
            message,
            details: (!body.is_empty()).then(|| body.to_string()),
        }
    }

    pub fn from_reqwest(operation: Operation, e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::new(ApiErrorKind::Timeout, operation, format!("Request timed out: {e}"))
        } else if e.is_connect() {
            Self::new(ApiErrorKind::Connect, operation, format!("Connection failed: {e}"))
        } else if e.is_decode() {
            Self::new(ApiErrorKind::Parse, operation, format!("Invalid response: {e}"))
        } else {
            Self::new(ApiErrorKind::FetchFailure, operation, format!("Network error: {e}"))
        }
    }

    pub fn parse(operation: Operation, err: &serde_json::Error, body: &str) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            operation,
            message: format!("Invalid response: {err}"),
            details: Some(body.to_string()),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to {}: {}", self.operation, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for REST operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
