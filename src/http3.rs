//! HTTP/3 transport over QUIC (`quinn` + `h3`).
//!
//! Each request opens its own QUIC endpoint and connection; nothing is pooled.

use crate::error::TransportErrorKind;
use crate::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use quinn::crypto::rustls::QuicClientConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_HTTPS_PORT: u16 = 443;

/// QUIC-based transport. Requires `https` URLs and a TLS 1.3 floor.
pub struct Http3Transport {
    client_config: quinn::ClientConfig,
}

impl std::fmt::Debug for Http3Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Http3Transport").finish_non_exhaustive()
    }
}

impl Http3Transport {
    pub(crate) fn new(tls: rustls::ClientConfig, timeout: Duration) -> Result<Self> {
        let crypto = QuicClientConfig::try_from(tls).map_err(|e| {
            Error::ProtocolPrerequisiteUnmet(format!("TLS settings unusable for QUIC: {}", e))
        })?;

        let idle_timeout = quinn::IdleTimeout::try_from(timeout)
            .map_err(|e| Error::ConfigurationError(format!("timeout too large for QUIC: {}", e)))?;
        let mut transport = quinn::TransportConfig::default();
        transport.max_idle_timeout(Some(idle_timeout));

        let mut client_config = quinn::ClientConfig::new(Arc::new(crypto));
        client_config.transport_config(Arc::new(transport));
        Ok(Self { client_config })
    }

    pub(crate) async fn send(
        &self,
        request: http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>> {
        let uri = request.uri().clone();
        if uri.scheme_str() != Some("https") {
            return Err(Error::ProtocolPrerequisiteUnmet(format!(
                "HTTP/3 requires an https URL, got {}",
                uri
            )));
        }
        let host = uri
            .host()
            .ok_or_else(|| Error::RequestBuild(format!("URL has no host: {}", uri)))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = uri.port_u16().unwrap_or(DEFAULT_HTTPS_PORT);

        let addr = tokio::net::lookup_host((host.as_str(), port))
            .await
            .map_err(|e| connect_error(format!("failed to resolve {}: {}", host, e)))?
            .next()
            .ok_or_else(|| connect_error(format!("no addresses found for {}", host)))?;

        let bind: SocketAddr = if addr.is_ipv6() {
            SocketAddr::from(([0u16; 8], 0))
        } else {
            SocketAddr::from(([0u8; 4], 0))
        };
        let mut endpoint = quinn::Endpoint::client(bind)
            .map_err(|e| connect_error(format!("failed to open QUIC endpoint: {}", e)))?;
        endpoint.set_default_client_config(self.client_config.clone());

        tracing::debug!(%addr, server_name = %host, "Opening QUIC connection");
        let connection = endpoint
            .connect(addr, &host)
            .map_err(|e| connect_error(e.to_string()))?
            .await
            .map_err(|e| connect_error(e.to_string()))?;

        let (mut driver, mut send_request) = h3::client::new(h3_quinn::Connection::new(connection))
            .await
            .map_err(protocol_error)?;
        let drive = tokio::spawn(async move {
            if let Err(e) = std::future::poll_fn(|cx| driver.poll_close(cx)).await {
                tracing::debug!(error = %e, "HTTP/3 connection closed");
            }
        });

        let result = exchange(&mut send_request, request).await;

        drop(send_request);
        drive.abort();
        endpoint.close(0u32.into(), b"done");
        // flush CONNECTION_CLOSE so the peer does not wait out its idle timeout
        endpoint.wait_idle().await;
        result
    }
}

async fn exchange(
    send_request: &mut h3::client::SendRequest<h3_quinn::OpenStreams, Bytes>,
    request: http::Request<Bytes>,
) -> Result<http::Response<Bytes>> {
    let (parts, body) = request.into_parts();
    let mut stream = send_request
        .send_request(http::Request::from_parts(parts, ()))
        .await
        .map_err(protocol_error)?;
    if !body.is_empty() {
        stream.send_data(body).await.map_err(protocol_error)?;
    }
    stream.finish().await.map_err(protocol_error)?;

    let head = stream.recv_response().await.map_err(protocol_error)?;

    let mut body = BytesMut::new();
    while let Some(chunk) = stream
        .recv_data()
        .await
        .map_err(|e| Error::ResponseRead(e.to_string()))?
    {
        body.put(chunk);
    }

    let (parts, ()) = head.into_parts();
    Ok(http::Response::from_parts(parts, body.freeze()))
}

fn connect_error(message: String) -> Error {
    Error::transport(TransportErrorKind::Connect, message)
}

fn protocol_error(e: h3::Error) -> Error {
    Error::transport(TransportErrorKind::Protocol, e.to_string())
}
