//! Request configuration and its defaulting rules.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::time::Duration;

/// Timeout applied when none (or zero) is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Redirect hop limit applied when none is configured.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Declarative description of one outbound HTTP call.
///
/// A `RequestConfig` fully determines a call; it is only read during
/// execution. It deserializes from the boundary field names (`request_method`,
/// `tls_min_version`, `timeout` in whole seconds, ...), with every absent
/// field taking its default.
///
/// # Examples
///
/// ```
/// use reqexec::RequestConfig;
/// use std::time::Duration;
///
/// let config: RequestConfig = serde_json::from_str(
///     r#"{"url": "https://example.com", "timeout": 3, "http_version": "HTTP2"}"#,
/// ).unwrap();
///
/// assert_eq!(config.method, "GET");
/// assert_eq!(config.timeout, Duration::from_secs(3));
/// assert_eq!(config.tls_min_version, "");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Target URL (required).
    pub url: String,

    /// HTTP method; empty means `GET`.
    #[serde(rename = "request_method")]
    pub method: String,

    /// Headers set on the request, overriding defaults of the same name.
    ///
    /// Names are case-insensitive on the wire; two keys differing only in
    /// case are rejected with [`Error::RequestBuild`](crate::Error::RequestBuild).
    #[serde(rename = "request_headers")]
    pub headers: HashMap<String, String>,

    /// Raw request body, sent as-is.
    #[serde(rename = "request_body", with = "body_text")]
    pub body: Vec<u8>,

    /// Basic-auth user; credentials are only sent when this is non-empty.
    pub username: String,

    /// Basic-auth password.
    #[serde(skip_serializing)]
    pub password: String,

    /// Bound on the whole call, including connect, handshake and body read.
    #[serde(with = "timeout_secs")]
    pub timeout: Duration,

    /// Disable server certificate verification.
    #[serde(rename = "insecure")]
    pub insecure_skip_verify: bool,

    /// Minimum TLS version name; empty means `TLS12`.
    pub tls_min_version: String,

    /// PEM client certificate for mTLS; used only together with `client_key_pem`.
    #[serde(rename = "client_cert")]
    pub client_cert_pem: String,

    /// PEM client private key for mTLS.
    #[serde(rename = "client_key", skip_serializing)]
    pub client_key_pem: String,

    /// PEM CA bundle replacing the default trust roots.
    #[serde(rename = "ca_cert")]
    pub ca_cert_pem: String,

    /// Protocol version name; empty means HTTP/1.1.
    pub http_version: String,

    /// Status codes considered successful when `fail_on_http_error` is set.
    pub expected_status_codes: Vec<u16>,

    /// Enforce `expected_status_codes` (skipped when that list is empty).
    pub fail_on_http_error: bool,

    /// Chase 3xx responses carrying a `Location` header.
    pub follow_redirects: bool,

    /// Hop limit when following redirects.
    pub max_redirects: usize,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: "GET".to_string(),
            headers: HashMap::new(),
            body: Vec::new(),
            username: String::new(),
            password: String::new(),
            timeout: DEFAULT_TIMEOUT,
            insecure_skip_verify: false,
            tls_min_version: String::new(),
            client_cert_pem: String::new(),
            client_key_pem: String::new(),
            ca_cert_pem: String::new(),
            http_version: String::new(),
            expected_status_codes: Vec::new(),
            fail_on_http_error: false,
            follow_redirects: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl RequestConfig {
    /// Creates a `GET` configuration for `url` with all other fields defaulted.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the HTTP method.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Adds a header, replacing any earlier value for the same key.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the request body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets basic-auth credentials.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sets the overall call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disables (or re-enables) server certificate verification.
    pub fn with_insecure_skip_verify(mut self, insecure: bool) -> Self {
        self.insecure_skip_verify = insecure;
        self
    }

    /// Sets the minimum TLS version name (`TLS10` .. `TLS13`).
    pub fn with_tls_min_version(mut self, version: impl Into<String>) -> Self {
        self.tls_min_version = version.into();
        self
    }

    /// Sets the mTLS client certificate and key, both PEM.
    pub fn with_client_identity(
        mut self,
        cert_pem: impl Into<String>,
        key_pem: impl Into<String>,
    ) -> Self {
        self.client_cert_pem = cert_pem.into();
        self.client_key_pem = key_pem.into();
        self
    }

    /// Sets the PEM CA bundle used to verify the server.
    pub fn with_ca_cert(mut self, ca_pem: impl Into<String>) -> Self {
        self.ca_cert_pem = ca_pem.into();
        self
    }

    /// Sets the protocol version name (`HTTP1.1`, `HTTP2`, `HTTP3`, ...).
    pub fn with_http_version(mut self, version: impl Into<String>) -> Self {
        self.http_version = version.into();
        self
    }

    /// Sets the status codes accepted when `fail_on_http_error` is on.
    pub fn with_expected_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.expected_status_codes = codes.into_iter().collect();
        self
    }

    /// Turns status code enforcement on or off.
    pub fn with_fail_on_http_error(mut self, fail: bool) -> Self {
        self.fail_on_http_error = fail;
        self
    }

    /// Configures redirect following.
    pub fn with_redirects(mut self, follow: bool, max_redirects: usize) -> Self {
        self.follow_redirects = follow;
        self.max_redirects = max_redirects;
        self
    }

    /// The method to send, with the `GET` default applied.
    pub fn effective_method(&self) -> &str {
        match self.method.trim() {
            "" => "GET",
            method => method,
        }
    }

    /// The timeout to apply, with the default substituted for zero.
    pub fn effective_timeout(&self) -> Duration {
        if self.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.timeout
        }
    }

    /// Whether the response status must be checked against the expectation set.
    pub fn validates_status(&self) -> bool {
        self.fail_on_http_error && !self.expected_status_codes.is_empty()
    }
}

mod timeout_secs {
    use super::*;

    pub fn serialize<S: Serializer>(timeout: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(timeout.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs).unwrap_or(DEFAULT_TIMEOUT))
    }
}

mod body_text {
    use super::*;

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?;
        Ok(text.map(String::into_bytes).unwrap_or_default())
    }
}
