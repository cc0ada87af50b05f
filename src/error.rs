//! Error types for request execution.
//!
//! Every failure of a call is reported through [`Error`]. Variants fall into two
//! groups: configuration errors (bad TLS/HTTP version names, unreadable
//! certificate material, malformed URL or method) that mean "fix the inputs",
//! and runtime errors (network failure, unreadable body, unexpected status,
//! redirect exhaustion) that mean "the remote call failed". Use
//! [`Error::is_configuration_error`] to tell them apart.

use http::StatusCode;

/// Classification of a network-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// DNS resolution, TCP/UDP connect or TLS handshake failed.
    Connect,
    /// The call exceeded its configured timeout.
    Timeout,
    /// The peer violated the HTTP protocol or the stream was reset.
    Protocol,
    /// Any other failure reported by the network layer.
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Protocol => "protocol",
            TransportErrorKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// The main error type for request execution.
///
/// No [`RequestResult`](crate::RequestResult) is ever produced alongside an
/// error; a failed call yields only this value.
///
/// # Examples
///
/// ```no_run
/// use reqexec::{execute, Error, RequestConfig};
///
/// # async fn example() {
/// let config = RequestConfig::new("https://api.example.com/health")
///     .with_expected_status_codes([200])
///     .with_fail_on_http_error(true);
///
/// match execute(&config).await {
///     Ok(result) => println!("status {}", result.response_code),
///     Err(Error::UnexpectedStatusCode { actual, expected }) => {
///         eprintln!("got {}, wanted one of {:?}", actual, expected);
///     }
///     Err(e) if e.is_configuration_error() => eprintln!("fix the config: {}", e),
///     Err(e) => eprintln!("call failed: {}", e),
/// }
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The minimum TLS version name is not one of `TLS10`, `TLS11`, `TLS12`, `TLS13`.
    #[error("invalid TLS version: {0} (valid values: TLS10, TLS11, TLS12, TLS13)")]
    InvalidTlsVersion(String),

    /// The HTTP version name is not recognized.
    #[error(
        "invalid HTTP version: {0} (valid values: HTTP1.1, HTTP/1.1, HTTP2, HTTP/2, HTTP3, HTTP/3)"
    )]
    InvalidHttpVersion(String),

    /// A protocol was requested whose prerequisites are not met,
    /// e.g. HTTP/3 with a TLS floor below TLS 1.3.
    #[error("protocol prerequisite unmet: {0}")]
    ProtocolPrerequisiteUnmet(String),

    /// The client certificate or key could not be parsed, or they do not match.
    #[error("failed to parse client certificate: {0}")]
    CertParse(String),

    /// The CA bundle could not be parsed or contained no certificates.
    #[error("failed to parse CA certificate: {0}")]
    CaParse(String),

    /// The outgoing request could not be assembled (malformed URL, method or header).
    #[error("failed to build request: {0}")]
    RequestBuild(String),

    /// The transport or client could not be constructed from the given settings.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// A network-level failure: connect, handshake, protocol or timeout.
    ///
    /// # Fields
    ///
    /// * `kind` - What class of network failure occurred
    /// * `message` - The underlying error message
    #[error("transport error ({kind}): {message}")]
    Transport {
        /// Failure classification
        kind: TransportErrorKind,
        /// Underlying error message
        message: String,
    },

    /// The response headers arrived but the body could not be read.
    #[error("failed to read response body: {0}")]
    ResponseRead(String),

    /// The response status is not in the configured expectation set.
    #[error("unexpected HTTP status code {actual} (expected one of {expected:?})")]
    UnexpectedStatusCode {
        /// The status code the server returned
        actual: u16,
        /// The configured expected status codes
        expected: Vec<u16>,
    },

    /// The redirect chain was longer than the configured maximum.
    #[error("stopped after {max_redirects} redirects")]
    TooManyRedirects {
        /// The configured hop limit
        max_redirects: usize,
    },

    /// The response body could not be deserialized into the requested type.
    ///
    /// Only produced by [`RequestResult::json`](crate::RequestResult::json).
    #[error("failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body, lossily decoded as UTF-8
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },
}

impl Error {
    pub(crate) fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Error::Transport {
            kind,
            message: message.into(),
        }
    }

    /// Returns `true` if the error stems from the request configuration rather
    /// than from the remote call.
    ///
    /// # Examples
    ///
    /// ```
    /// use reqexec::Error;
    ///
    /// assert!(Error::InvalidTlsVersion("TLS14".to_string()).is_configuration_error());
    /// assert!(!Error::TooManyRedirects { max_redirects: 5 }.is_configuration_error());
    /// ```
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Error::InvalidTlsVersion(_) => true,
            Error::InvalidHttpVersion(_) => true,
            Error::ProtocolPrerequisiteUnmet(_) => true,
            Error::CertParse(_) => true,
            Error::CaParse(_) => true,
            Error::RequestBuild(_) => true,
            Error::ConfigurationError(_) => true,
            Error::Transport { .. } => false,
            Error::ResponseRead(_) => false,
            Error::UnexpectedStatusCode { .. } => false,
            Error::TooManyRedirects { .. } => false,
            Error::DeserializationFailed { .. } => false,
        }
    }

    /// Returns `true` if the call was aborted because it exceeded its timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Transport {
                kind: TransportErrorKind::Timeout,
                ..
            }
        )
    }

    /// Returns the HTTP status code if this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::UnexpectedStatusCode { actual, .. } => Some(*actual),
            Error::DeserializationFailed { status, .. } => Some(status.as_u16()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportErrorKind::Timeout
        } else if e.is_connect() {
            TransportErrorKind::Connect
        } else if e.is_request() {
            TransportErrorKind::Protocol
        } else {
            TransportErrorKind::Other
        };
        // reqwest's Display omits the cause chain (e.g. the certificate failure).
        let mut message = e.to_string();
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Error::transport(kind, message)
    }
}

/// A specialized `Result` type for request execution.
pub type Result<T> = std::result::Result<T, Error>;
