use reqwest::StatusCode;
use serde_json::Value;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The single error type returned by every client operation.
///
/// Server-side failures carry the `message` field of the JSON error body and
/// the HTTP status that produced it. Connection-level failures carry an empty
/// message and the transport error as their source.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct Error {
    message: String,
    status: Option<StatusCode>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            source: None,
        }
    }

    pub(crate) fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            status: None,
            source: Some(Box::new(source)),
        }
    }

    /// A request that never produced a response.
    pub(crate) fn connection(source: reqwest::Error) -> Self {
        Self::with_source("", source)
    }

    pub(crate) fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
            source: None,
        }
    }

    pub(crate) fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status of the response that was translated into this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }
}

/// Statuses whose bodies are turned into an [`Error`] by the verb layer.
pub(crate) fn is_intercepted(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::FORBIDDEN | StatusCode::NOT_FOUND | StatusCode::INTERNAL_SERVER_ERROR
    )
}

pub(crate) fn translate_error(status: StatusCode, body: &str) -> Error {
    // BuzzData replies with {"message": "..."}; a JSON object without a string
    // message gives an empty one, and anything that is not JSON is kept verbatim.
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => {
            let message = map.get("message").and_then(|m| m.as_str()).unwrap_or("");
            Error::from_status(status, message)
        }
        _ => Error::from_status(status, body.trim()),
    }
}
