use anyhow::Result as AnyResult;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::config::load_config;
use crate::error::Result;
use crate::request::{TimeZoneRequest, TimeZoneRequestBuilder};
use crate::response::{Response, decode};
use crate::transport::{HttpTransport, Transport, TransportOptions};
use crate::util::{redact_secret, redact_url};

/// Credentials a [`Client`] seeds into every request it creates.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    /// Simple API key, sent as `key`.
    pub api_key: Option<String>,
    /// Business client ID, sent as `client`. Used only together with `signing_key`.
    pub client_id: Option<String>,
    /// URL-safe Base64 signing key of the business client.
    pub signing_key: Option<String>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &redact_secret(&self.api_key))
            .field("client_id", &self.client_id)
            .field("signing_key", &redact_secret(&self.signing_key))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Creates a client using environment variables and/or the rc file.
    ///
    /// This is equivalent to `Client::new(None, None, None)`.
    pub fn from_env() -> AnyResult<Self> {
        Self::new(None, None, None)
    }

    /// Creates a client using (in order of precedence):
    /// - explicit arguments
    /// - environment variables `GOOGLE_MAPS_API_KEY` / `GOOGLE_MAPS_CLIENT_ID` / `GOOGLE_MAPS_SIGNING_KEY`
    /// - config file from `GMAPS_TIMEZONE_RC` or `.gmaps-timezone-rc`
    pub fn new(
        api_key: Option<String>,
        client_id: Option<String>,
        signing_key: Option<String>,
    ) -> AnyResult<Self> {
        let config = load_config(api_key, client_id, signing_key)?;
        Self::with_config(config)
    }

    /// Creates a client from an already resolved configuration, skipping env and rc lookup.
    pub fn with_config(config: ClientConfig) -> AnyResult<Self> {
        let transport = HttpTransport::new(&TransportOptions::default())?;
        Ok(Self { config, transport: Arc::new(transport) })
    }

    /// Rebuilds the HTTP transport with other timeouts, redirect limit or user agent.
    pub fn with_transport_options(self, options: &TransportOptions) -> AnyResult<Self> {
        let transport = HttpTransport::new(options)?;
        Ok(self.with_transport(transport))
    }

    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// A request builder carrying this client's credentials.
    pub fn request(&self) -> TimeZoneRequestBuilder {
        TimeZoneRequest::builder().credential_inputs(
            self.config.api_key.clone(),
            self.config.client_id.clone(),
            self.config.signing_key.clone(),
        )
    }

    /// Sends `request` and decodes the body in the request's format.
    ///
    /// A service-side failure (`ZERO_RESULTS`, `REQUEST_DENIED`, ...) is a successful
    /// call; inspect [`Response::status`].
    pub fn query_time_zone(&self, request: &TimeZoneRequest) -> Result<Response> {
        self.query(request, false)
    }

    /// Sends `request` and returns the body untouched.
    pub fn query_time_zone_raw(&self, request: &TimeZoneRequest) -> Result<String> {
        self.fetch(request)
    }

    /// Sends `request`; with `raw` set the result is always [`Response::Raw`].
    pub fn query(&self, request: &TimeZoneRequest, raw: bool) -> Result<Response> {
        let body = self.fetch(request)?;
        let response = decode(&body, request.format(), raw)?;

        debug!(format = %request.format(), raw, status = ?response.status(), "decoded time zone response");
        Ok(response)
    }

    fn fetch(&self, request: &TimeZoneRequest) -> Result<String> {
        let url = request.url();
        debug!(
            url = %redact_url(&url),
            business = request.is_business_client(),
            "querying time zone"
        );
        self.transport.get(&url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::request::Format;
    use crate::response::Status;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Canned {
        body: String,
        seen: Mutex<Vec<String>>,
    }

    impl Transport for Arc<Canned> {
        fn get(&self, url: &str) -> Result<String> {
            self.seen.lock().unwrap().push(url.to_string());
            Ok(self.body.clone())
        }
    }

    fn client(config: ClientConfig, body: &str) -> (Client, Arc<Canned>) {
        let canned = Arc::new(Canned { body: body.to_string(), ..Default::default() });
        let client = Client::with_config(config).unwrap().with_transport(canned.clone());
        (client, canned)
    }

    #[test]
    fn request_builder_carries_client_credentials() {
        let (client, _) = client(
            ClientConfig { api_key: Some("K".into()), ..Default::default() },
            "{}",
        );
        let req = client.request().lat_lng(40.730610, -73.935242).build().unwrap();
        assert!(req.url().ends_with("&key=K"));

        let req = client.request().api_key("OTHER").build().unwrap();
        assert!(req.url().ends_with("&key=OTHER"));
    }

    #[test]
    fn debug_output_hides_credentials() {
        let key = "vNIXE0xscrmjlyV-12Nj_BvUPaw=";
        let (client, _) = client(
            ClientConfig {
                api_key: Some("AIzaSECRET".into()),
                client_id: Some("gme-test".into()),
                signing_key: Some(key.into()),
            },
            "{}",
        );

        let debug = format!("{client:?}");
        assert!(!debug.contains(key), "{debug}");
        assert!(!debug.contains("AIzaSECRET"), "{debug}");
        assert!(debug.contains("signing_key: Some(\"<redacted>\")"));

        let req = client.request().build().unwrap();
        assert!(!format!("{req:?}").contains(key));
    }

    #[test]
    fn query_sends_exactly_one_get_and_decodes() {
        let (client, canned) = client(
            ClientConfig::default(),
            r#"{"status":"OK","timeZoneId":"America/New_York"}"#,
        );
        let req = client.request().lat_lng(40.730610, -73.935242).build().unwrap();

        let resp = client.query_time_zone(&req).unwrap();
        assert_eq!(resp.status(), Some(Status::Ok));
        assert_eq!(canned.seen.lock().unwrap().as_slice(), [req.url()]);
    }

    #[test]
    fn raw_query_skips_decoding() {
        let (client, _) = client(ClientConfig::default(), "<not-closed>");
        let req = client.request().format(Format::Xml).build().unwrap();

        assert_eq!(client.query_time_zone_raw(&req).unwrap(), "<not-closed>");
        assert_eq!(
            client.query(&req, true).unwrap(),
            Response::Raw("<not-closed>".into())
        );
        assert!(matches!(client.query_time_zone(&req), Err(Error::Decode(_))));
    }
}
