//! Request execution: TLS assembly, request building, redirects and status checks.
//!
//! [`execute`] is the engine's only entry point. Every call builds its own TLS
//! config, transport and request from the [`RequestConfig`]; nothing is shared
//! between calls, so any number of them may run concurrently.

use crate::certs::{load_client_identity, load_trusted_cas};
use crate::error::TransportErrorKind;
use crate::tls::{TlsSettings, TlsVersion};
use crate::transport::Transport;
use crate::{Error, RequestConfig, RequestResult, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use http::header::{
    AUTHORIZATION, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, LOCATION,
    PROXY_AUTHORIZATION, TRANSFER_ENCODING,
};
use http::{HeaderName, HeaderValue, Method, StatusCode};
use std::time::Instant;
use url::Url;

/// Performs the call described by `config` and returns the normalized result.
///
/// The whole call (connect, handshake, every redirect hop and the body read)
/// is bounded by the configured timeout. Nothing is retried.
///
/// # Errors
///
/// Configuration problems ([`Error::InvalidTlsVersion`], [`Error::CertParse`],
/// [`Error::CaParse`], [`Error::RequestBuild`], [`Error::InvalidHttpVersion`],
/// [`Error::ProtocolPrerequisiteUnmet`]) are reported before any network I/O.
/// Runtime failures are [`Error::Transport`], [`Error::ResponseRead`],
/// [`Error::TooManyRedirects`] and [`Error::UnexpectedStatusCode`].
///
/// # Examples
///
/// ```no_run
/// use reqexec::{execute, RequestConfig};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), reqexec::Error> {
/// let config = RequestConfig::new("https://api.example.com/items")
///     .with_method("POST")
///     .with_header("Content-Type", "application/json")
///     .with_body(r#"{"name":"widget"}"#)
///     .with_timeout(Duration::from_secs(5))
///     .with_expected_status_codes([200, 201])
///     .with_fail_on_http_error(true);
///
/// let result = execute(&config).await?;
/// println!("{} {}", result.response_code, result.text());
/// # Ok(())
/// # }
/// ```
pub async fn execute(config: &RequestConfig) -> Result<RequestResult> {
    let timeout = config.effective_timeout();
    let tls = tls_settings(config)?;
    let (request, url) = build_request(config)?;
    let transport = Transport::build(&config.http_version, &tls, timeout)?;

    let start_time = Instant::now();
    let exchange = send_following_redirects(&transport, request, url, config);
    let (response, hops) = tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| {
            Error::transport(
                TransportErrorKind::Timeout,
                format!("request exceeded timeout of {}s", timeout.as_secs_f64()),
            )
        })??;

    let status = response.status();
    tracing::info!(
        status = status.as_u16(),
        latency_ms = start_time.elapsed().as_millis(),
        redirects = hops,
        http_version = %transport.version(),
        "Received HTTP response"
    );

    if config.validates_status() && !config.expected_status_codes.contains(&status.as_u16()) {
        tracing::warn!(
            status = status.as_u16(),
            expected = ?config.expected_status_codes,
            "Unexpected HTTP status code"
        );
        return Err(Error::UnexpectedStatusCode {
            actual: status.as_u16(),
            expected: config.expected_status_codes.clone(),
        });
    }

    Ok(RequestResult::from_response(response))
}

/// Blocking variant of [`execute`] for synchronous callers.
///
/// Runs the call on a private single-threaded runtime.
///
/// # Errors
///
/// Same as [`execute`], plus [`Error::ConfigurationError`] if the runtime
/// cannot be started.
///
/// # Panics
///
/// Panics if called from within an async runtime.
pub fn execute_blocking(config: &RequestConfig) -> Result<RequestResult> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::ConfigurationError(format!("failed to start runtime: {}", e)))?;
    runtime.block_on(execute(config))
}

fn tls_settings(config: &RequestConfig) -> Result<TlsSettings> {
    let min_version = if config.tls_min_version.is_empty() {
        TlsVersion::default()
    } else {
        TlsVersion::resolve(&config.tls_min_version)?
    };

    let has_identity = !config.client_cert_pem.is_empty() && !config.client_key_pem.is_empty();
    let client_identity = if has_identity {
        Some(load_client_identity(
            &config.client_cert_pem,
            &config.client_key_pem,
        )?)
    } else {
        None
    };

    let trusted_cas = if config.ca_cert_pem.is_empty() {
        None
    } else {
        Some(load_trusted_cas(&config.ca_cert_pem)?)
    };

    Ok(TlsSettings {
        min_version,
        insecure_skip_verify: config.insecure_skip_verify,
        client_identity,
        trusted_cas,
    })
}

fn parse_url(raw: &str) -> Result<Url> {
    if raw.trim().is_empty() {
        return Err(Error::RequestBuild("url is required".to_string()));
    }
    let url = Url::parse(raw)
        .map_err(|e| Error::RequestBuild(format!("invalid URL {:?}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::RequestBuild(format!("unsupported URL scheme: {}", scheme))),
    }
}

fn to_uri(url: &Url) -> Result<http::Uri> {
    url.as_str()
        .parse()
        .map_err(|e| Error::RequestBuild(format!("invalid URL {}: {}", url, e)))
}

fn build_request(config: &RequestConfig) -> Result<(http::Request<Bytes>, Url)> {
    let url = parse_url(&config.url)?;
    let method = Method::from_bytes(config.effective_method().as_bytes())
        .map_err(|e| Error::RequestBuild(format!("invalid method {:?}: {}", config.method, e)))?;

    let mut request = http::Request::new(Bytes::copy_from_slice(&config.body));
    *request.method_mut() = method;
    *request.uri_mut() = to_uri(&url)?;

    for (name, value) in &config.headers {
        let name = HeaderName::try_from(name.as_str())
            .map_err(|e| Error::RequestBuild(format!("invalid header name {:?}: {}", name, e)))?;
        let value = HeaderValue::try_from(value.as_str())
            .map_err(|e| Error::RequestBuild(format!("invalid value for header {}: {}", name, e)))?;
        // names that differ only in case collapse to one header
        if request.headers().contains_key(&name) {
            return Err(Error::RequestBuild(format!(
                "header {} is given more than once with different case",
                name
            )));
        }
        request.headers_mut().insert(name, value);
    }

    if !config.username.is_empty() {
        let credentials = STANDARD.encode(format!("{}:{}", config.username, config.password));
        let mut value = HeaderValue::try_from(format!("Basic {}", credentials))
            .map_err(|e| Error::RequestBuild(format!("invalid basic-auth credentials: {}", e)))?;
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    Ok((request, url))
}

async fn send_following_redirects(
    transport: &Transport,
    mut request: http::Request<Bytes>,
    mut url: Url,
    config: &RequestConfig,
) -> Result<(http::Response<Bytes>, usize)> {
    let mut hops = 0;

    loop {
        tracing::debug!(
            method = %request.method(),
            url = %url,
            hop = hops,
            "Executing HTTP request"
        );

        let response = transport.send(duplicate(&request)).await?;

        if !config.follow_redirects {
            return Ok((response, hops));
        }
        let Some(next_url) = redirect_target(&response, &url)? else {
            return Ok((response, hops));
        };

        if hops >= config.max_redirects {
            tracing::warn!(
                max_redirects = config.max_redirects,
                url = %next_url,
                "Redirect limit reached"
            );
            return Err(Error::TooManyRedirects {
                max_redirects: config.max_redirects,
            });
        }

        hops += 1;
        request = redirect_request(request, response.status(), &url, &next_url)?;
        url = next_url;
    }
}

fn duplicate(request: &http::Request<Bytes>) -> http::Request<Bytes> {
    let mut copy = http::Request::new(request.body().clone());
    *copy.method_mut() = request.method().clone();
    *copy.uri_mut() = request.uri().clone();
    *copy.version_mut() = request.version();
    *copy.headers_mut() = request.headers().clone();
    copy
}

/// Where a redirect response points, or `None` if it is not one to chase.
fn redirect_target(response: &http::Response<Bytes>, current: &Url) -> Result<Option<Url>> {
    let status = response.status();
    let is_redirect = matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    );
    if !is_redirect {
        return Ok(None);
    }
    let Some(location) = response.headers().get(LOCATION) else {
        return Ok(None);
    };

    let invalid = |reason: String| {
        Error::transport(
            TransportErrorKind::Protocol,
            format!("invalid Location header in {} response: {}", status.as_u16(), reason),
        )
    };
    let location = location.to_str().map_err(|e| invalid(e.to_string()))?;
    let next = current.join(location).map_err(|e| invalid(e.to_string()))?;
    match next.scheme() {
        "http" | "https" => Ok(Some(next)),
        scheme => Err(invalid(format!("unsupported scheme {}", scheme))),
    }
}

fn redirect_request(
    mut request: http::Request<Bytes>,
    status: StatusCode,
    from: &Url,
    to: &Url,
) -> Result<http::Request<Bytes>> {
    *request.uri_mut() = to_uri(to)?;

    let method = request.method().clone();
    let switch_to_get = match status {
        StatusCode::SEE_OTHER => method != Method::HEAD,
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => method == Method::POST,
        _ => false,
    };
    if switch_to_get {
        *request.method_mut() = Method::GET;
        *request.body_mut() = Bytes::new();
        let headers = request.headers_mut();
        for name in [CONTENT_TYPE, CONTENT_LENGTH, CONTENT_ENCODING, TRANSFER_ENCODING] {
            headers.remove(name);
        }
    }

    if from.origin() != to.origin() {
        let headers = request.headers_mut();
        for name in [AUTHORIZATION, COOKIE, PROXY_AUTHORIZATION] {
            headers.remove(name);
        }
    }

    Ok(request)
}
