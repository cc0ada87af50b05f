//! Handshake behavior against local TLS and QUIC servers.

use bytes::Bytes;
use reqexec::{execute, Error, RequestConfig, TransportErrorKind};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig, SupportedProtocolVersion};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

const CA: &str = include_str!("fixtures/ca.pem");
const CA_ALT: &str = include_str!("fixtures/ca-alt.pem");
const SERVER_CERT: &str = include_str!("fixtures/server.pem");
const SERVER_KEY: &str = include_str!("fixtures/server-key.pem");
const CLIENT_CERT: &str = include_str!("fixtures/client.pem");
const CLIENT_KEY: &str = include_str!("fixtures/client-key.pem");

fn server_chain() -> Vec<CertificateDer<'static>> {
    rustls_pemfile::certs(&mut SERVER_CERT.as_bytes())
        .collect::<Result<_, _>>()
        .unwrap()
}

fn server_key() -> PrivateKeyDer<'static> {
    rustls_pemfile::private_key(&mut SERVER_KEY.as_bytes())
        .unwrap()
        .unwrap()
}

fn server_config(
    versions: &[&'static SupportedProtocolVersion],
    require_client_cert: bool,
    alpn: &[&[u8]],
) -> ServerConfig {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = ServerConfig::builder_with_provider(provider.clone())
        .with_protocol_versions(versions)
        .unwrap();

    let mut config = if require_client_cert {
        let mut roots = RootCertStore::empty();
        for cert in rustls_pemfile::certs(&mut CA.as_bytes()) {
            roots.add(cert.unwrap()).unwrap();
        }
        let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider)
            .build()
            .unwrap();
        builder
            .with_client_cert_verifier(verifier)
            .with_single_cert(server_chain(), server_key())
            .unwrap()
    } else {
        builder
            .with_no_client_auth()
            .with_single_cert(server_chain(), server_key())
            .unwrap()
    };
    config.alpn_protocols = alpn.iter().map(|p| p.to_vec()).collect();
    config
}

/// HTTPS server answering every HTTP/1.1 request with `200 secure`.
///
/// Connections that negotiate `h2` are recorded and dropped.
struct TlsServer {
    addr: SocketAddr,
    negotiated_alpn: Arc<Mutex<Option<Vec<u8>>>>,
}

impl TlsServer {
    async fn start(config: ServerConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let acceptor = TlsAcceptor::from(Arc::new(config));
        let negotiated_alpn = Arc::new(Mutex::new(None));

        let seen = negotiated_alpn.clone();
        tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                let seen = seen.clone();
                tokio::spawn(async move {
                    let Ok(mut stream) = acceptor.accept(tcp).await else {
                        return;
                    };
                    let alpn = stream.get_ref().1.alpn_protocol().map(<[u8]>::to_vec);
                    *seen.lock().unwrap() = alpn.clone();
                    if alpn.as_deref() == Some(b"h2".as_slice()) {
                        return;
                    }

                    let mut head = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                        match stream.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => head.extend_from_slice(&buf[..n]),
                        }
                    }
                    let response =
                        b"HTTP/1.1 200 OK\r\ncontent-length: 6\r\nconnection: close\r\n\r\nsecure";
                    let _ = stream.write_all(response).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        Self {
            addr,
            negotiated_alpn,
        }
    }

    fn config(&self) -> RequestConfig {
        RequestConfig::new(format!("https://{}/", self.addr)).with_timeout(Duration::from_secs(5))
    }

    fn negotiated_alpn(&self) -> Option<Vec<u8>> {
        self.negotiated_alpn.lock().unwrap().clone()
    }
}

const BOTH_VERSIONS: &[&SupportedProtocolVersion] =
    &[&rustls::version::TLS13, &rustls::version::TLS12];
const HTTP_ALPN: &[&[u8]] = &[b"h2", b"http/1.1"];

async fn plain_server() -> TlsServer {
    TlsServer::start(server_config(BOTH_VERSIONS, false, HTTP_ALPN)).await
}

fn assert_handshake_failure(err: &Error) {
    assert!(
        matches!(err, Error::Transport { .. }),
        "Expected Transport error, got {:?}",
        err
    );
    assert!(!err.is_configuration_error());
}

#[tokio::test]
async fn test_untrusted_server_certificate_is_rejected() {
    let server = plain_server().await;

    let err = execute(&server.config()).await.unwrap_err();
    assert_handshake_failure(&err);
    assert!(
        matches!(err, Error::Transport { kind: TransportErrorKind::Connect, .. }),
        "Expected connect failure, got {:?}",
        err
    );

    let err = execute(&server.config().with_ca_cert(CA_ALT)).await.unwrap_err();
    assert_handshake_failure(&err);
}

#[tokio::test]
async fn test_custom_ca_is_trusted() {
    let server = plain_server().await;

    let result = execute(&server.config().with_ca_cert(CA)).await.unwrap();
    assert_eq!(result.response_code, 200);
    assert_eq!(result.text(), "secure");
}

#[tokio::test]
async fn test_insecure_skips_verification() {
    let server = plain_server().await;

    let result = execute(&server.config().with_insecure_skip_verify(true))
        .await
        .unwrap();
    assert_eq!(result.response_code, 200);
}

#[tokio::test]
async fn test_client_identity_is_presented() {
    let server = TlsServer::start(server_config(BOTH_VERSIONS, true, HTTP_ALPN)).await;

    let config = server
        .config()
        .with_ca_cert(CA)
        .with_client_identity(CLIENT_CERT, CLIENT_KEY);
    let result = execute(&config).await.unwrap();
    assert_eq!(result.response_code, 200);

    let err = execute(&server.config().with_ca_cert(CA)).await.unwrap_err();
    assert_handshake_failure(&err);
}

#[tokio::test]
async fn test_tls13_floor_refuses_tls12_server() {
    let server =
        TlsServer::start(server_config(&[&rustls::version::TLS12], false, HTTP_ALPN)).await;

    let result = execute(&server.config().with_ca_cert(CA).with_tls_min_version("TLS12"))
        .await
        .unwrap();
    assert_eq!(result.response_code, 200);

    let config = server.config().with_ca_cert(CA).with_tls_min_version("TLS13");
    let err = execute(&config).await.unwrap_err();
    assert_handshake_failure(&err);
}

#[tokio::test]
async fn test_tls13_floor_accepts_tls13_server() {
    let server =
        TlsServer::start(server_config(&[&rustls::version::TLS13], false, HTTP_ALPN)).await;

    let config = server.config().with_ca_cert(CA).with_tls_min_version("tls13");
    let result = execute(&config).await.unwrap();
    assert_eq!(result.response_code, 200);
}

#[tokio::test]
async fn test_alpn_follows_http_version() {
    let server = plain_server().await;

    let result = execute(&server.config().with_ca_cert(CA)).await.unwrap();
    assert_eq!(result.response_code, 200);
    assert_eq!(server.negotiated_alpn(), Some(b"http/1.1".to_vec()));

    // the server hangs up on h2, so only the negotiation is checked
    let config = server.config().with_ca_cert(CA).with_http_version("HTTP/2");
    let _ = execute(&config).await;
    assert_eq!(server.negotiated_alpn(), Some(b"h2".to_vec()));
}

#[tokio::test]
async fn test_http3_round_trip_closes_connection() {
    let crypto = server_config(&[&rustls::version::TLS13], false, &[b"h3"]);
    let crypto = quinn::crypto::rustls::QuicServerConfig::try_from(crypto).unwrap();
    let server_config = quinn::ServerConfig::with_crypto(Arc::new(crypto));
    let endpoint = quinn::Endpoint::server(server_config, "127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = endpoint.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let connection = endpoint.accept().await.unwrap().await.unwrap();
        let mut h3_conn: h3::server::Connection<_, Bytes> =
            h3::server::Connection::new(h3_quinn::Connection::new(connection.clone()))
                .await
                .unwrap();

        let (request, mut stream) = h3_conn.accept().await.unwrap().unwrap();
        let response = http::Response::builder().status(200).body(()).unwrap();
        stream.send_response(response).await.unwrap();
        stream
            .send_data(Bytes::from(format!("h3 {}", request.uri().path())))
            .await
            .unwrap();
        stream.finish().await.unwrap();

        let reason = connection.closed().await;
        drop(h3_conn);
        reason
    });

    let config = RequestConfig::new(format!("https://{}/quic", addr))
        .with_ca_cert(CA)
        .with_tls_min_version("TLS13")
        .with_http_version("HTTP3")
        .with_timeout(Duration::from_secs(10));
    let result = execute(&config).await.unwrap();
    assert_eq!(result.response_code, 200);
    assert_eq!(result.text(), "h3 /quic");

    // well inside the idle timeout, so the close frame must have been sent
    let reason = tokio::time::timeout(Duration::from_secs(2), server)
        .await
        .expect("server did not see the connection close")
        .unwrap();
    assert!(
        matches!(reason, quinn::ConnectionError::ApplicationClosed(_)),
        "unexpected close reason: {:?}",
        reason
    );
}
