//! # Reqexec - declarative HTTP request execution
//!
//! Reqexec takes a [`RequestConfig`] describing one outbound HTTP call (method,
//! URL, headers, body, basic auth, TLS/mTLS material, protocol version, timeout,
//! redirect policy and expected status codes), performs it, and returns a
//! normalized [`RequestResult`] or a classified [`Error`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use reqexec::{execute, RequestConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), reqexec::Error> {
//!     let config = RequestConfig::new("https://api.example.com/users/123")
//!         .with_header("Accept", "application/json")
//!         .with_basic_auth("alice", "secret")
//!         .with_timeout(Duration::from_secs(5))
//!         .with_expected_status_codes([200])
//!         .with_fail_on_http_error(true);
//!
//!     let result = execute(&config).await?;
//!     println!("Status: {}", result.response_code);
//!     println!("Body: {}", result.text());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Protocol selection** - HTTP/1.1, HTTP/2 (ALPN) or HTTP/3 over QUIC
//! - **TLS control** - minimum version floor, custom CA bundles, optional verification bypass
//! - **mTLS** - PEM client certificate and key, checked to match before any connection
//! - **Redirects** - followed up to a hop limit, or returned as-is
//! - **Status expectations** - fail the call when the status is not in an allowed set
//! - **Classified errors** - configuration errors are distinguishable from runtime failures
//! - **Automatic logging** - structured logging with `tracing`
//!
//! ## mTLS and HTTP/3
//!
//! ```no_run
//! use reqexec::{execute, RequestConfig};
//!
//! # async fn example(cert: String, key: String, ca: String) -> Result<(), reqexec::Error> {
//! let config = RequestConfig::new("https://internal.example.com/api")
//!     .with_client_identity(cert, key)
//!     .with_ca_cert(ca)
//!     .with_tls_min_version("TLS13")
//!     .with_http_version("HTTP3");
//!
//! let _result = execute(&config).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Each call is independent: no connection pool, cache or other state is kept
//! between calls, and nothing is retried.

mod certs;
mod client;
mod config;
mod error;
mod http3;
mod response;
pub mod tls;
pub mod transport;

pub use certs::{load_client_identity, load_trusted_cas, ClientIdentity};
pub use client::{execute, execute_blocking};
pub use config::{RequestConfig, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT};
pub use error::{Error, Result, TransportErrorKind};
pub use http3::Http3Transport;
pub use response::RequestResult;
pub use tls::{TlsSettings, TlsVersion};
pub use transport::{HttpVersion, Transport};
