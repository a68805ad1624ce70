use thiserror::Error;

use crate::request::Format;
use crate::response::Status;
use crate::xml::XmlError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by request construction, the transport and response decoding.
///
/// Statuses reported by the service itself (`ZERO_RESULTS`, `REQUEST_DENIED`, ...)
/// are ordinary decoded data. They only become [`Error::Service`] when the caller
/// asks for it through [`crate::TimeZoneInfo::ensure_ok`].
#[derive(Debug, Error)]
pub enum Error {
    /// DNS, connect, TLS, timeout or body read failure. Never retried.
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The body does not match the declared format.
    #[error("failed to decode response: {0}")]
    Decode(#[from] DecodeError),

    #[error("invalid signing key: {0}")]
    InvalidSigningKey(String),

    #[error("unsupported response format '{0}' (expected 'json' or 'xml')")]
    UnsupportedFormat(String),

    #[error("time zone service returned {status}{}", message_suffix(.message))]
    Service {
        status: Status,
        message: Option<String>,
    },
}

fn message_suffix(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}

impl Error {
    pub(crate) fn network<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Network(Box::new(err))
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid XML: {0}")]
    Xml(#[from] XmlError),

    #[error("expected a JSON object at the top level, found {0}")]
    NotAnObject(&'static str),

    #[error("missing field `{0}` in {1} response")]
    MissingField(&'static str, Format),

    #[error("field `{field}` is not a number: '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("a raw response carries no decoded fields")]
    RawResponse,
}
