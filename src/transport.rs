//! Transport selection across HTTP/1.1, HTTP/2 and HTTP/3.
//!
//! [`Transport::build`] turns a protocol version name plus [`TlsSettings`] into
//! an independent transport instance. Transports never follow redirects on
//! their own; the executor decides what to do with a 3xx response.

use crate::http3::Http3Transport;
use crate::tls::{TlsSettings, TlsVersion};
use crate::{Error, Result};
use bytes::Bytes;
use std::time::Duration;

/// Protocol version requested for a call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HttpVersion {
    /// HTTP/1.1 only.
    #[default]
    Http11,
    /// HTTP/2 negotiated through ALPN, falling back to HTTP/1.1.
    Http2,
    /// HTTP/3 over QUIC.
    Http3,
}

impl HttpVersion {
    /// Resolves a version name; matching is trimmed and case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHttpVersion`] listing the accepted values.
    ///
    /// # Examples
    ///
    /// ```
    /// use reqexec::HttpVersion;
    ///
    /// assert_eq!(HttpVersion::resolve("").unwrap(), HttpVersion::Http11);
    /// assert_eq!(HttpVersion::resolve(" http/2 ").unwrap(), HttpVersion::Http2);
    /// assert!(HttpVersion::resolve("SPDY").is_err());
    /// ```
    pub fn resolve(name: &str) -> Result<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "" | "HTTP1.1" | "HTTP/1.1" => Ok(HttpVersion::Http11),
            "HTTP2" | "HTTP/2" => Ok(HttpVersion::Http2),
            "HTTP3" | "HTTP/3" => Ok(HttpVersion::Http3),
            _ => Err(Error::InvalidHttpVersion(name.to_string())),
        }
    }

    fn alpn(&self) -> &'static [&'static [u8]] {
        match self {
            HttpVersion::Http11 => &[b"http/1.1"],
            HttpVersion::Http2 => &[b"h2", b"http/1.1"],
            HttpVersion::Http3 => &[b"h3"],
        }
    }
}

impl std::fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HttpVersion::Http11 => "HTTP/1.1",
            HttpVersion::Http2 => "HTTP/2",
            HttpVersion::Http3 => "HTTP/3",
        };
        f.write_str(name)
    }
}

/// A concrete network transport for one call.
#[derive(Debug)]
pub enum Transport {
    /// HTTP/1.1 or HTTP/2 over TCP, driven by `reqwest`.
    Tcp {
        /// Client bound to the TLS settings; redirects disabled.
        client: reqwest::Client,
        /// The protocol this client was built for.
        version: HttpVersion,
    },
    /// HTTP/3 over QUIC.
    Quic(Http3Transport),
}

impl Transport {
    /// Builds a transport for `http_version` with the given TLS settings.
    ///
    /// Connect, handshake and response timeouts are all bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidHttpVersion`] for an unknown version name
    /// * [`Error::ProtocolPrerequisiteUnmet`] for HTTP/3 with a floor below TLS 1.3
    /// * [`Error::ConfigurationError`] if the underlying client cannot be built
    pub fn build(http_version: &str, tls: &TlsSettings, timeout: Duration) -> Result<Self> {
        let version = HttpVersion::resolve(http_version)?;

        if version == HttpVersion::Http3 && tls.min_version < TlsVersion::Tls13 {
            return Err(Error::ProtocolPrerequisiteUnmet(format!(
                "HTTP/3 requires TLS 1.3, but the minimum TLS version is {}",
                tls.min_version
            )));
        }

        let tls_config = tls.client_config(version.alpn())?;

        tracing::debug!(
            http_version = %version,
            tls_min_version = %tls.min_version,
            timeout_ms = timeout.as_millis(),
            "Building transport"
        );

        match version {
            HttpVersion::Http11 | HttpVersion::Http2 => {
                let mut builder = reqwest::Client::builder()
                    .use_preconfigured_tls(tls_config)
                    .redirect(reqwest::redirect::Policy::none())
                    .connect_timeout(timeout)
                    .timeout(timeout);
                if version == HttpVersion::Http11 {
                    builder = builder.http1_only();
                }
                let client = builder.build().map_err(|e| {
                    Error::ConfigurationError(format!("failed to build HTTP client: {}", e))
                })?;
                Ok(Transport::Tcp { client, version })
            }
            HttpVersion::Http3 => Ok(Transport::Quic(Http3Transport::new(tls_config, timeout)?)),
        }
    }

    /// The protocol this transport speaks.
    pub fn version(&self) -> HttpVersion {
        match self {
            Transport::Tcp { version, .. } => *version,
            Transport::Quic(_) => HttpVersion::Http3,
        }
    }

    /// Sends one request and reads the complete response.
    ///
    /// # Errors
    ///
    /// Network failures surface as [`Error::Transport`]; a failure after the
    /// response head arrived surfaces as [`Error::ResponseRead`].
    pub async fn send(&self, request: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        match self {
            Transport::Tcp { client, .. } => send_tcp(client, request).await,
            Transport::Quic(transport) => transport.send(request).await,
        }
    }
}

async fn send_tcp(
    client: &reqwest::Client,
    request: http::Request<Bytes>,
) -> Result<http::Response<Bytes>> {
    let request = reqwest::Request::try_from(request)
        .map_err(|e| Error::RequestBuild(e.to_string()))?;
    let response = client.execute(request).await?;

    let mut builder = http::Response::builder()
        .status(response.status())
        .version(response.version());
    if let Some(headers) = builder.headers_mut() {
        *headers = response.headers().clone();
    }

    let body = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            Error::from(e)
        } else {
            Error::ResponseRead(e.to_string())
        }
    })?;

    builder
        .body(body)
        .map_err(|e| Error::ResponseRead(e.to_string()))
}
