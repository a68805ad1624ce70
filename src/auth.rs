use base64::Engine as _;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD as B64};
use base64::engine::DecodePaddingMode;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::fmt;

use crate::error::{Error, Result};

type HmacSha1 = Hmac<Sha1>;

// Padding is stripped before decoding, and leftover bits of a short final group are dropped.
const B64_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

/// How a request authenticates against the service.
///
/// A client ID + signing key pair always wins over an API key; see [`Credentials::resolve`].
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    #[default]
    Anonymous,
    ApiKey(String),
    Business {
        client_id: String,
        signing_key: SigningKey,
    },
}

impl Credentials {
    /// Select the authentication mode from optional raw inputs.
    ///
    /// Business mode needs both a non-empty client ID and a non-empty signing key;
    /// otherwise a non-empty API key is used; otherwise the request is anonymous.
    /// The signing key is decoded permissively, see [`SigningKey::from_url_safe_base64`].
    pub fn resolve(
        api_key: Option<&str>,
        client_id: Option<&str>,
        signing_key: Option<&str>,
    ) -> Result<Self> {
        let api_key = api_key.filter(|s| !s.is_empty());
        let client_id = client_id.filter(|s| !s.is_empty());
        let signing_key = signing_key.filter(|s| !s.is_empty());

        match (client_id, signing_key, api_key) {
            (Some(client_id), Some(signing_key), _) => Ok(Credentials::Business {
                client_id: client_id.to_string(),
                signing_key: SigningKey::from_url_safe_base64(signing_key)?,
            }),
            (_, _, Some(key)) => Ok(Credentials::ApiKey(key.to_string())),
            _ => Ok(Credentials::Anonymous),
        }
    }

    pub fn is_business(&self) -> bool {
        matches!(self, Credentials::Business { .. })
    }

    /// The query parameter that carries the identity, if any.
    ///
    /// The signature is not part of this: it is computed over the finished path+query.
    pub(crate) fn query_param(&self) -> Option<(&'static str, &str)> {
        match self {
            Credentials::Anonymous => None,
            Credentials::ApiKey(key) => Some(("key", key.as_str())),
            Credentials::Business { client_id, .. } => Some(("client", client_id.as_str())),
        }
    }
}

/// A decoded cryptographic signing key for business clients.
#[derive(Clone)]
pub struct SigningKey {
    bytes: Vec<u8>,
    mac: HmacSha1,
}

impl SigningKey {
    /// Decode a key given in URL-safe Base64, as issued by the Google Cloud console.
    ///
    /// Decoding is permissive: characters outside the Base64 alphabet (whitespace,
    /// `=`, stray punctuation) are skipped and a dangling final character is ignored.
    /// A key that decodes to nothing is an empty HMAC key, which is still valid.
    pub fn from_url_safe_base64(value: &str) -> Result<Self> {
        let bytes = decode_url_safe(value)
            .map_err(|e| Error::InvalidSigningKey(format!("not URL-safe Base64 ({e})")))?;

        // Never fails: HMAC takes keys of any length.
        let mac = HmacSha1::new_from_slice(&bytes)
            .map_err(|e| Error::InvalidSigningKey(e.to_string()))?;

        Ok(Self { bytes, mac })
    }

    /// HMAC-SHA1 of `path_and_query`, encoded as URL-safe Base64.
    pub fn sign(&self, path_and_query: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(path_and_query.as_bytes());
        encode_url_safe(&mac.finalize().into_bytes())
    }
}

impl PartialEq for SigningKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for SigningKey {}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Anonymous => f.write_str("Anonymous"),
            Credentials::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Credentials::Business { client_id, signing_key } => f
                .debug_struct("Business")
                .field("client_id", client_id)
                .field("signing_key", signing_key)
                .finish(),
        }
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// Sign a request path and query string with a URL-safe Base64 signing key.
///
/// The input must be exactly what goes on the wire after the domain, e.g.
/// `/maps/api/timezone/json?location=...&client=...`. Scheme and domain are not signed.
pub fn generate_signature(path_and_query: &str, signing_key: &str) -> Result<String> {
    Ok(SigningKey::from_url_safe_base64(signing_key)?.sign(path_and_query))
}

pub(crate) fn encode_url_safe(bytes: &[u8]) -> String {
    B64.encode(bytes).replace('+', "-").replace('/', "_")
}

pub(crate) fn decode_url_safe(value: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let mut symbols: String = value
        .chars()
        .filter_map(|c| match c {
            '-' => Some('+'),
            '_' => Some('/'),
            c if c.is_ascii_alphanumeric() || c == '+' || c == '/' => Some(c),
            _ => None,
        })
        .collect();
    // A single symbol carries only six bits, not enough for a byte.
    if symbols.len() % 4 == 1 {
        symbols.pop();
    }
    B64_LENIENT.decode(symbols)
}
