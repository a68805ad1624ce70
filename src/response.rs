use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{DecodeError, Error, Result};
use crate::request::Format;
use crate::xml::{XmlDocument, XmlElement};

/// A decoded service answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// JSON object with the service's keys in document order.
    Json(Map<String, Value>),
    Xml(XmlDocument),
    /// The body exactly as received.
    Raw(String),
}

/// Decode a response body according to the requested format.
///
/// With `raw` set the body is returned untouched whatever the format. Nothing
/// here interprets the `status` field; see [`Response::time_zone_info`] for a
/// typed view.
pub fn decode(raw_body: &str, format: Format, raw: bool) -> Result<Response> {
    if raw {
        return Ok(Response::Raw(raw_body.to_string()));
    }

    match format {
        Format::Json => match serde_json::from_str::<Value>(raw_body).map_err(DecodeError::from)? {
            Value::Object(map) => Ok(Response::Json(map)),
            other => Err(DecodeError::NotAnObject(json_kind(&other)).into()),
        },
        Format::Xml => Ok(Response::Xml(
            XmlDocument::parse(raw_body).map_err(DecodeError::from)?,
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl Response {
    pub fn as_json(&self) -> Option<&Map<String, Value>> {
        match self {
            Response::Json(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_xml(&self) -> Option<&XmlDocument> {
        match self {
            Response::Xml(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Response::Raw(body) => Some(body),
            _ => None,
        }
    }

    /// The service status, if the response was decoded and carries one.
    pub fn status(&self) -> Option<Status> {
        match self {
            Response::Json(map) => map.get("status").and_then(Value::as_str).map(Status::from),
            Response::Xml(doc) => doc.root().child_text("status").map(Status::from),
            Response::Raw(_) => None,
        }
    }

    /// Typed view of the decoded fields.
    pub fn time_zone_info(&self) -> Result<TimeZoneInfo> {
        match self {
            Response::Json(map) => TimeZoneInfo::from_json(map),
            Response::Xml(doc) => TimeZoneInfo::from_xml(doc.root()),
            Response::Raw(_) => Err(DecodeError::RawResponse.into()),
        }
    }
}

/// Status codes defined by the Time Zone API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum Status {
    Ok,
    /// No time zone data for the position or time, e.g. a point over water.
    ZeroResults,
    OverQueryLimit,
    /// Malformed request or a missing mandatory parameter.
    InvalidRequest,
    RequestDenied,
    UnknownError,
    /// A status this crate does not know about yet.
    Other(String),
}

impl Status {
    pub fn as_str(&self) -> &str {
        match self {
            Status::Ok => "OK",
            Status::ZeroResults => "ZERO_RESULTS",
            Status::OverQueryLimit => "OVER_QUERY_LIMIT",
            Status::InvalidRequest => "INVALID_REQUEST",
            Status::RequestDenied => "REQUEST_DENIED",
            Status::UnknownError => "UNKNOWN_ERROR",
            Status::Other(s) => s,
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == Status::Ok
    }

    /// Statuses that may succeed if the same request is sent again later.
    ///
    /// Advisory only: the client never retries by itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Status::OverQueryLimit | Status::UnknownError)
    }
}

impl From<&str> for Status {
    fn from(value: &str) -> Self {
        match value.trim() {
            "OK" => Status::Ok,
            "ZERO_RESULTS" => Status::ZeroResults,
            "OVER_QUERY_LIMIT" => Status::OverQueryLimit,
            "INVALID_REQUEST" => Status::InvalidRequest,
            "REQUEST_DENIED" => Status::RequestDenied,
            "UNKNOWN_ERROR" => Status::UnknownError,
            other => Status::Other(other.to_string()),
        }
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        Status::from(value.as_str())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fields of a time zone answer. Offsets are in seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeZoneInfo {
    pub status: Status,
    #[serde(default)]
    pub time_zone_id: Option<String>,
    #[serde(default)]
    pub time_zone_name: Option<String>,
    #[serde(default)]
    pub raw_offset: Option<f64>,
    #[serde(default)]
    pub dst_offset: Option<f64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl TimeZoneInfo {
    fn from_json(map: &Map<String, Value>) -> Result<Self> {
        if !map.contains_key("status") {
            return Err(DecodeError::MissingField("status", Format::Json).into());
        }
        serde_json::from_value(Value::Object(map.clone()))
            .map_err(|e| DecodeError::from(e).into())
    }

    fn from_xml(root: &XmlElement) -> Result<Self> {
        let status = root
            .child_text("status")
            .map(Status::from)
            .ok_or(DecodeError::MissingField("status", Format::Xml))?;

        let text = |name: &str| root.child_text(name).map(str::to_string);

        Ok(Self {
            status,
            time_zone_id: text("time_zone_id"),
            time_zone_name: text("time_zone_name"),
            raw_offset: xml_number(root, "raw_offset")?,
            dst_offset: xml_number(root, "dst_offset")?,
            error_message: text("error_message"),
        })
    }

    /// UTC offset including daylight saving, when both parts are known.
    pub fn total_offset(&self) -> Option<f64> {
        Some(self.raw_offset? + self.dst_offset?)
    }

    /// Turn any status other than `OK` into [`Error::Service`].
    pub fn ensure_ok(self) -> Result<Self> {
        if self.status.is_ok() {
            Ok(self)
        } else {
            Err(Error::Service { status: self.status, message: self.error_message })
        }
    }
}

fn xml_number(root: &XmlElement, field: &'static str) -> Result<Option<f64>> {
    match root.child_text(field) {
        None => Ok(None),
        Some(value) => value.parse::<f64>().map(Some).map_err(|_| {
            DecodeError::InvalidNumber { field, value: value.to_string() }.into()
        }),
    }
}
