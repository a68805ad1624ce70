use anyhow::Context;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::redirect::Policy;
use std::fmt::Debug;
use std::time::Duration;
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::util::truncate_body;

/// Performs the single GET a time zone query needs.
///
/// Implementations must not retry; the caller owns any retry policy.
pub trait Transport: Send + Sync + Debug {
    /// Fetch `url` and return the body as text.
    fn get(&self, url: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub connect_timeout: Duration,
    /// Whole request, including reading the body.
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
    /// Ignore `HTTP_PROXY`/`HTTPS_PROXY` and connect directly.
    pub no_proxy: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(120),
            timeout: Duration::from_secs(120),
            max_redirects: 10,
            user_agent: format!("gmaps-timezone/{}", env!("CARGO_PKG_VERSION")),
            no_proxy: false,
        }
    }
}

impl TransportOptions {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_no_proxy(mut self, no_proxy: bool) -> Self {
        self.no_proxy = no_proxy;
        self
    }
}

/// Blocking HTTPS transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpClient,
}

impl HttpTransport {
    pub fn new(options: &TransportOptions) -> anyhow::Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&options.user_agent)
                .unwrap_or(HeaderValue::from_static("gmaps-timezone")),
        );

        let mut builder = HttpClient::builder()
            .default_headers(default_headers)
            .connect_timeout(options.connect_timeout)
            .timeout(options.timeout)
            .redirect(Policy::limited(options.max_redirects))
            .gzip(true);

        if options.no_proxy {
            builder = builder.no_proxy();
        }

        let http = builder.build().context("failed to build HTTP client")?;

        Ok(Self { http })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<String> {
        // `without_url` keeps the API key and signature out of error messages.
        let resp = self
            .http
            .get(url)
            .send()
            .map_err(|e| Error::network(e.without_url()))?;

        let status = resp.status();
        let body = resp.text().map_err(|e| Error::network(e.without_url()))?;

        // The service reports its own failures in the body, so the body is returned regardless.
        if !status.is_success() {
            warn!(%status, "time zone service answered with a non-success HTTP status");
        }
        trace!(body = %truncate_body(&body), "received response body");

        Ok(body)
    }
}
