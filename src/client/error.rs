use std::fmt;

/// Failure of a call to the task API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The server answered with a non-success status.
    Http { status: u16, message: String },
    /// The request never produced a response (DNS, refused, timeout).
    Transport(String),
    /// A success response whose body did not have the expected shape.
    Decode(String),
}

impl ApiError {
    pub fn http<M: Into<String>>(status: u16, message: M) -> Self {
        ApiError::Http {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text suitable for an inline error row or banner.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Http { message, .. } => message,
            ApiError::Transport(_) => "Could not reach the server",
            ApiError::Decode(_) => "Unexpected response from the server",
        }
    }

    /// 401 and 403 are handled by redirecting, never shown inline.
    pub fn is_auth(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Http { status, message } => write!(f, "{message} (HTTP {status})"),
            ApiError::Transport(detail) => write!(f, "network error: {detail}"),
            ApiError::Decode(detail) => write!(f, "invalid response: {detail}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Pick the most useful message out of an error response body.
///
/// JSON bodies yield their `detail` (or `message`) string, a FastAPI-style
/// list of `{msg}` entries, or the compact JSON itself. Non-JSON bodies yield
/// their raw text, and an empty body yields `Request failed: <status>`.
pub fn error_message(status: u16, body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for field in ["detail", "message", "error"] {
            match value.get(field) {
                Some(serde_json::Value::String(s)) if !s.trim().is_empty() => {
                    return s.trim().to_string();
                }
                Some(serde_json::Value::Array(entries)) => {
                    let msgs: Vec<&str> = entries
                        .iter()
                        .filter_map(|e| e.get("msg").and_then(|m| m.as_str()))
                        .collect();
                    if !msgs.is_empty() {
                        return msgs.join("; ");
                    }
                }
                _ => {}
            }
        }
        if !value.is_null() {
            return value.to_string();
        }
    }
    if trimmed.is_empty() {
        format!("Request failed: {status}")
    } else {
        trimmed.to_string()
    }
}
