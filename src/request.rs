use std::fmt;
use std::str::FromStr;

use url::form_urlencoded;

use crate::auth::Credentials;
use crate::error::{Error, Result};
use crate::util::redact_secret;

/// Domain portion of the Time Zone API URL.
pub const URL_DOMAIN: &str = "maps.googleapis.com";

/// Path portion of the Time Zone API URL; the format name is appended to it.
pub const URL_PATH: &str = "/maps/api/timezone/";

/// Response format, which is also the last path segment of the request URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    #[default]
    Json,
    Xml,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "xml" => Ok(Format::Xml),
            _ => Err(Error::UnsupportedFormat(value.to_string())),
        }
    }
}

/// A single time zone lookup.
///
/// The value is immutable; use [`TimeZoneRequest::to_builder`] to derive a
/// variation (another timestamp, another format) from an existing request.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeZoneRequest {
    latitude: f64,
    longitude: f64,
    timestamp: i64,
    language: Option<String>,
    format: Format,
    credentials: Credentials,
    // Kept so `to_builder` can hand back exactly what was configured.
    inputs: CredentialInputs,
}

#[derive(Clone, Default, PartialEq, Eq)]
struct CredentialInputs {
    api_key: Option<String>,
    client_id: Option<String>,
    signing_key: Option<String>,
}

impl fmt::Debug for CredentialInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialInputs")
            .field("api_key", &redact_secret(&self.api_key))
            .field("client_id", &self.client_id)
            .field("signing_key", &redact_secret(&self.signing_key))
            .finish()
    }
}

impl TimeZoneRequest {
    /// An anonymous JSON request for the given position and point in time.
    pub fn new(latitude: f64, longitude: f64, timestamp: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
            language: None,
            format: Format::default(),
            credentials: Credentials::Anonymous,
            inputs: CredentialInputs::default(),
        }
    }

    pub fn builder() -> TimeZoneRequestBuilder {
        TimeZoneRequestBuilder::default()
    }

    pub fn to_builder(&self) -> TimeZoneRequestBuilder {
        TimeZoneRequestBuilder {
            latitude: self.latitude,
            longitude: self.longitude,
            timestamp: self.timestamp,
            language: self.language.clone(),
            format: self.format,
            api_key: self.inputs.api_key.clone(),
            client_id: self.inputs.client_id.clone(),
            signing_key: self.inputs.signing_key.clone(),
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The language tag that will be sent: trimmed, and `None` when blank.
    pub fn language(&self) -> Option<&str> {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Comma-separated `lat,lng`, present only when both coordinates are nonzero.
    ///
    /// A coordinate of exactly zero (either sign) counts as "not set", so positions
    /// on the equator or the prime meridian are sent without a location. The service
    /// then answers `INVALID_REQUEST`.
    ///
    /// Coordinates use Rust's shortest round-trip float formatting. This is not the
    /// 14-significant-digit PHP rendering other clients of the service may send:
    /// `1e-7` renders as `0.0000001`, not `1.0E-7`, and values with more than 14
    /// significant digits are not rounded.
    pub fn location(&self) -> Option<String> {
        if self.latitude != 0.0 && self.longitude != 0.0 {
            Some(format!("{},{}", self.latitude, self.longitude))
        } else {
            None
        }
    }

    pub fn is_business_client(&self) -> bool {
        self.credentials.is_business()
    }

    /// Encoded query string, without the signature.
    pub fn query_string(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());

        if let Some(location) = self.location() {
            query.append_pair("location", &location);
        }
        if let Some(language) = self.language() {
            query.append_pair("language", language);
        }
        // Sent even when zero.
        query.append_pair("timestamp", &self.timestamp.to_string());

        if let Some((name, value)) = self.credentials.query_param() {
            query.append_pair(name, value);
        }

        query.finish()
    }

    /// Path and query as sent on the wire, signed for business clients.
    pub fn path_and_query(&self) -> String {
        let mut path_query = format!("{}{}?{}", URL_PATH, self.format, self.query_string());

        if let Credentials::Business { signing_key, .. } = &self.credentials {
            let signature = signing_key.sign(&path_query);
            path_query.push_str("&signature=");
            path_query.push_str(&signature);
        }

        path_query
    }

    /// Fully qualified request URL. Always HTTPS.
    pub fn url(&self) -> String {
        format!("https://{}{}", URL_DOMAIN, self.path_and_query())
    }
}

/// Collects request parameters; [`TimeZoneRequestBuilder::build`] resolves credentials.
#[derive(Clone, Default)]
pub struct TimeZoneRequestBuilder {
    latitude: f64,
    longitude: f64,
    timestamp: i64,
    language: Option<String>,
    format: Format,
    api_key: Option<String>,
    client_id: Option<String>,
    signing_key: Option<String>,
}

impl fmt::Debug for TimeZoneRequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeZoneRequestBuilder")
            .field("latitude", &self.latitude)
            .field("longitude", &self.longitude)
            .field("timestamp", &self.timestamp)
            .field("language", &self.language)
            .field("format", &self.format)
            .field("api_key", &redact_secret(&self.api_key))
            .field("client_id", &self.client_id)
            .field("signing_key", &redact_secret(&self.signing_key))
            .finish()
    }
}

impl TimeZoneRequestBuilder {
    pub fn latitude(mut self, latitude: f64) -> Self {
        self.latitude = latitude;
        self
    }

    pub fn longitude(mut self, longitude: f64) -> Self {
        self.longitude = longitude;
        self
    }

    pub fn lat_lng(self, latitude: f64, longitude: f64) -> Self {
        self.latitude(latitude).longitude(longitude)
    }

    /// Seconds since 1970-01-01 UTC; negative values are dates before 1970.
    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// See <https://developers.google.com/maps/faq#languagesupport>.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// URL-safe Base64 signing key of a business client.
    pub fn signing_key(mut self, signing_key: impl Into<String>) -> Self {
        self.signing_key = Some(signing_key.into());
        self
    }

    pub(crate) fn credential_inputs(
        mut self,
        api_key: Option<String>,
        client_id: Option<String>,
        signing_key: Option<String>,
    ) -> Self {
        self.api_key = api_key;
        self.client_id = client_id;
        self.signing_key = signing_key;
        self
    }

    /// Resolves credentials. The signing key is decoded permissively, so any
    /// string is accepted.
    pub fn build(self) -> Result<TimeZoneRequest> {
        let credentials = Credentials::resolve(
            self.api_key.as_deref(),
            self.client_id.as_deref(),
            self.signing_key.as_deref(),
        )?;

        Ok(TimeZoneRequest {
            latitude: self.latitude,
            longitude: self.longitude,
            timestamp: self.timestamp,
            language: self.language,
            format: self.format,
            credentials,
            inputs: CredentialInputs {
                api_key: self.api_key,
                client_id: self.client_id,
                signing_key: self.signing_key,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNING_KEY: &str = "vNIXE0xscrmjlyV-12Nj_BvUPaw=";

    fn new_york() -> TimeZoneRequestBuilder {
        TimeZoneRequest::builder().lat_lng(40.730610, -73.935242)
    }

    #[test]
    fn api_key_scenario_url() {
        let req = new_york().timestamp(0).format(Format::Json).api_key("K").build().unwrap();
        assert_eq!(
            req.url(),
            "https://maps.googleapis.com/maps/api/timezone/json?location=40.73061%2C-73.935242&timestamp=0&key=K"
        );
        assert!(!req.is_business_client());
    }

    #[test]
    fn zero_coordinate_drops_location() {
        let req = TimeZoneRequest::new(0.0, 12.5, 1331161200);
        assert_eq!(req.location(), None);
        assert_eq!(req.query_string(), "timestamp=1331161200");

        let req = TimeZoneRequest::new(51.4779, 0.0, 1);
        assert!(!req.query_string().contains("location"));

        let req = TimeZoneRequest::new(-0.0, 12.5, 0);
        assert_eq!(req.location(), None);
        assert_eq!(req.query_string(), "timestamp=0");

        let req = TimeZoneRequest::new(12.5, -0.0, 0);
        assert_eq!(req.location(), None);
    }

    #[test]
    fn timestamp_is_always_present() {
        let req = TimeZoneRequest::builder().build().unwrap();
        assert_eq!(req.query_string(), "timestamp=0");

        let req = TimeZoneRequest::new(37.7697, -122.3933, -86400);
        assert!(req.query_string().ends_with("timestamp=-86400"));
    }

    #[test]
    fn language_is_trimmed_and_blank_is_dropped() {
        let req = new_york().language("  fr \n").build().unwrap();
        assert_eq!(req.language(), Some("fr"));
        assert_eq!(
            req.query_string(),
            "location=40.73061%2C-73.935242&language=fr&timestamp=0"
        );

        let req = new_york().language("   ").build().unwrap();
        assert_eq!(req.language(), None);
        assert!(!req.query_string().contains("language"));
    }

    #[test]
    fn language_values_are_form_encoded() {
        let req = TimeZoneRequest::builder().language("zh TW&x").build().unwrap();
        assert_eq!(req.query_string(), "language=zh+TW%26x&timestamp=0");
    }

    #[test]
    fn business_client_signs_and_omits_api_key() {
        let req = TimeZoneRequest::builder()
            .lat_lng(40.730610, -73.935242)
            .timestamp(1331161200)
            .api_key("K")
            .client_id("gme-test")
            .signing_key(SIGNING_KEY)
            .build()
            .unwrap();

        assert!(req.is_business_client());
        assert_eq!(
            req.query_string(),
            "location=40.73061%2C-73.935242&timestamp=1331161200&client=gme-test"
        );
        assert_eq!(
            req.url(),
            "https://maps.googleapis.com/maps/api/timezone/json?location=40.73061%2C-73.935242&timestamp=1331161200&client=gme-test&signature=bhCom6DwgnLyxMk_G395ZESSDlI="
        );
        assert!(!req.url().contains("key="));
    }

    #[test]
    fn signature_covers_xml_path_and_language() {
        let req = TimeZoneRequest::builder()
            .lat_lng(37.7697, -122.3933)
            .language("fr")
            .format(Format::Xml)
            .client_id("gme-test")
            .signing_key(SIGNING_KEY)
            .build()
            .unwrap();

        assert_eq!(
            req.path_and_query(),
            "/maps/api/timezone/xml?location=37.7697%2C-122.3933&language=fr&timestamp=0&client=gme-test&signature=tw2yqa6vgWGKaSXZJjXfcsCMasc="
        );
    }

    #[test]
    fn api_key_only_has_no_signature() {
        let req = new_york().api_key("K").build().unwrap();
        assert!(req.url().contains("key=K"));
        assert!(!req.url().contains("signature="));
    }

    #[test]
    fn anonymous_request_has_no_auth_params() {
        let url = new_york().build().unwrap().url();
        assert!(!url.contains("key="));
        assert!(!url.contains("client="));
    }

    #[test]
    fn malformed_signing_keys_still_sign() {
        for key in ["   ", "vNIX E0xs", "a", "%%%"] {
            let req = TimeZoneRequest::builder()
                .client_id("gme-test")
                .signing_key(key)
                .build()
                .unwrap();
            assert!(req.is_business_client(), "key {key:?}");
            assert!(req.url().contains("&client=gme-test&signature="));
        }

        // Blank and one-character keys decode to an empty HMAC key.
        let req = TimeZoneRequest::builder().client_id("gme-test").signing_key("a").build().unwrap();
        assert_eq!(
            req.path_and_query(),
            "/maps/api/timezone/json?timestamp=0&client=gme-test&signature=MgrK7LbMszkKSnooPh0cQYV6P_8="
        );
    }

    #[test]
    fn debug_output_hides_credentials() {
        let builder = new_york().api_key("AIzaSECRET").client_id("gme-test").signing_key(SIGNING_KEY);
        let req = builder.clone().build().unwrap();

        for debug in [format!("{builder:?}"), format!("{req:?}")] {
            assert!(!debug.contains(SIGNING_KEY), "{debug}");
            assert!(!debug.contains("AIzaSECRET"), "{debug}");
            assert!(debug.contains("gme-test"));
        }
    }

    #[test]
    fn to_builder_reuses_every_field() {
        let first = new_york()
            .timestamp(10)
            .language("ar")
            .client_id("gme-test")
            .signing_key(SIGNING_KEY)
            .build()
            .unwrap();
        let second = first.to_builder().timestamp(20).build().unwrap();

        assert_eq!(second.timestamp(), 20);
        assert_eq!(second.language(), Some("ar"));
        assert!(second.is_business_client());
        assert_eq!(first.to_builder().build().unwrap(), first);
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<Format>().unwrap(), Format::Json);
        assert_eq!(" xml ".parse::<Format>().unwrap(), Format::Xml);
        assert!(matches!("csv".parse::<Format>(), Err(Error::UnsupportedFormat(s)) if s == "csv"));
    }

    #[test]
    fn url_is_always_https() {
        let req = TimeZoneRequest::new(1.0, 1.0, 0);
        assert!(req.url().starts_with("https://maps.googleapis.com/maps/api/timezone/json?"));
    }
}
