//! A small Rust client for the Google Maps Time Zone API.
//!
//! Given a position and a point in time, the crate builds the request URL
//! (signing it for business clients), performs one HTTPS GET and decodes the
//! JSON or XML answer.
//!
//! ## Quick start
//! - Configure authentication via environment variables (`GOOGLE_MAPS_API_KEY`, or
//!   `GOOGLE_MAPS_CLIENT_ID` + `GOOGLE_MAPS_SIGNING_KEY` for business clients) or a
//!   `.gmaps-timezone-rc` file (current directory or home directory).
//! - Build a request with [`Client::request`] and send it with [`Client::query_time_zone`].
//!
//! ```no_run
//! use anyhow::Result;
//! use gmaps_timezone::{Client, Format};
//!
//! fn main() -> Result<()> {
//!     let client = Client::from_env()?;
//!     let request = client
//!         .request()
//!         .lat_lng(37.7697, -122.3933)
//!         .timestamp(1331161200)
//!         .language("fr")
//!         .format(Format::Json)
//!         .build()?;
//!
//!     let info = client.query_time_zone(&request)?.time_zone_info()?;
//!     println!("{:?} ({:?})", info.time_zone_id, info.status);
//!     Ok(())
//! }
//! ```
//!
//! Service statuses such as `ZERO_RESULTS` or `OVER_QUERY_LIMIT` are returned as
//! data. Nothing is retried.

#![forbid(unsafe_code)]

mod auth;
mod client;
mod config;
mod error;
mod request;
mod response;
mod transport;
mod util;
mod xml;

pub use auth::{Credentials, SigningKey, generate_signature};
pub use client::{Client, ClientConfig};
pub use error::{DecodeError, Error, Result};
pub use request::{Format, TimeZoneRequest, TimeZoneRequestBuilder, URL_DOMAIN, URL_PATH};
pub use response::{Response, Status, TimeZoneInfo, decode};
pub use transport::{HttpTransport, Transport, TransportOptions};
pub use xml::{XmlDocument, XmlElement, XmlError};
