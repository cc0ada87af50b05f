//! TLS settings: minimum protocol version resolution and client config assembly.
//!
//! [`TlsVersion::resolve`] maps the symbolic floor names accepted at the
//! configuration boundary to a concrete protocol floor. [`TlsSettings`]
//! collects everything a transport needs to know about TLS and turns it into
//! a `rustls` [`ClientConfig`] shared by the HTTP/1.1, HTTP/2 and HTTP/3
//! transports.

use crate::certs::ClientIdentity;
use crate::{Error, Result};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{
    ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme, SupportedProtocolVersion,
};
use std::str::FromStr;
use std::sync::Arc;

static TLS12_AND_UP: &[&SupportedProtocolVersion] =
    &[&rustls::version::TLS13, &rustls::version::TLS12];
static TLS13_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS13];

/// Minimum TLS protocol version a connection may negotiate.
///
/// Variants are ordered, so floors compare naturally:
///
/// ```
/// use reqexec::TlsVersion;
///
/// assert!(TlsVersion::Tls10 < TlsVersion::Tls13);
/// assert_eq!(TlsVersion::default(), TlsVersion::Tls12);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TlsVersion {
    /// TLS 1.0
    Tls10,
    /// TLS 1.1
    Tls11,
    /// TLS 1.2
    #[default]
    Tls12,
    /// TLS 1.3
    Tls13,
}

impl TlsVersion {
    /// Resolves a floor name (`TLS10`, `TLS11`, `TLS12`, `TLS13`, any case).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTlsVersion`] for any other name, including the
    /// empty string; callers substitute the default before resolving.
    ///
    /// # Examples
    ///
    /// ```
    /// use reqexec::TlsVersion;
    ///
    /// assert_eq!(TlsVersion::resolve("tls13").unwrap(), TlsVersion::Tls13);
    /// assert!(TlsVersion::resolve("SSL3").is_err());
    /// ```
    pub fn resolve(name: &str) -> Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            "TLS10" => Ok(TlsVersion::Tls10),
            "TLS11" => Ok(TlsVersion::Tls11),
            "TLS12" => Ok(TlsVersion::Tls12),
            "TLS13" => Ok(TlsVersion::Tls13),
            _ => Err(Error::InvalidTlsVersion(name.to_string())),
        }
    }

    /// The symbolic name of this floor.
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsVersion::Tls10 => "TLS10",
            TlsVersion::Tls11 => "TLS11",
            TlsVersion::Tls12 => "TLS12",
            TlsVersion::Tls13 => "TLS13",
        }
    }

    // rustls only implements 1.2 and 1.3, so the older floors admit both.
    fn protocol_versions(&self) -> &'static [&'static SupportedProtocolVersion] {
        match self {
            TlsVersion::Tls13 => TLS13_ONLY,
            _ => TLS12_AND_UP,
        }
    }
}

impl FromStr for TlsVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TlsVersion::resolve(s)
    }
}

impl std::fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a transport needs to know about TLS for one call.
#[derive(Debug, Default)]
pub struct TlsSettings {
    /// Lowest protocol version that may be negotiated.
    pub min_version: TlsVersion,
    /// Skip server certificate verification entirely.
    pub insecure_skip_verify: bool,
    /// Client certificate chain and key for mTLS.
    pub client_identity: Option<ClientIdentity>,
    /// Trust anchors replacing the bundled web roots.
    pub trusted_cas: Option<RootCertStore>,
}

impl TlsSettings {
    /// Builds a `rustls` client config advertising the given ALPN protocols.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] if the protocol versions cannot be
    /// satisfied by the crypto provider, or [`Error::CertParse`] if the client
    /// identity is rejected.
    pub(crate) fn client_config(&self, alpn: &[&[u8]]) -> Result<ClientConfig> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_protocol_versions(self.min_version.protocol_versions())
            .map_err(|e| Error::ConfigurationError(format!("unsupported TLS settings: {}", e)))?;

        let builder = if self.insecure_skip_verify {
            tracing::warn!("TLS server certificate verification is disabled");
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert(provider)))
        } else {
            let roots = match &self.trusted_cas {
                Some(roots) => roots.clone(),
                None => RootCertStore {
                    roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
                },
            };
            builder.with_root_certificates(roots)
        };

        let mut config = match &self.client_identity {
            Some(identity) => builder
                .with_client_auth_cert(identity.chain.clone(), identity.key.clone_key())
                .map_err(|e| Error::CertParse(e.to_string()))?,
            None => builder.with_no_client_auth(),
        };
        config.alpn_protocols = alpn.iter().map(|p| p.to_vec()).collect();
        Ok(config)
    }
}

/// Verifier installed when `insecure_skip_verify` is set.
///
/// Certificates are not checked, but handshake signatures still are, so the
/// peer must hold the key for the certificate it presents.
#[derive(Debug)]
struct AcceptAnyServerCert(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_names_any_case() {
        assert_eq!(TlsVersion::resolve("TLS10").unwrap(), TlsVersion::Tls10);
        assert_eq!(TlsVersion::resolve("tls11").unwrap(), TlsVersion::Tls11);
        assert_eq!(TlsVersion::resolve("Tls12").unwrap(), TlsVersion::Tls12);
        assert_eq!(TlsVersion::resolve("tLS13").unwrap(), TlsVersion::Tls13);
    }

    #[test]
    fn test_resolved_floors_increase() {
        let floors: Vec<TlsVersion> = ["TLS10", "TLS11", "TLS12", "TLS13"]
            .iter()
            .map(|name| TlsVersion::resolve(name).unwrap())
            .collect();
        assert!(floors.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_resolve_rejects_unknown_names() {
        for name in ["", "TLS1.2", "TLS14", "SSL3", " TLS12"] {
            match TlsVersion::resolve(name) {
                Err(Error::InvalidTlsVersion(got)) => assert_eq!(got, name),
                other => panic!("Expected InvalidTlsVersion for {:?}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_from_str_and_display() {
        let version: TlsVersion = "tls13".parse().unwrap();
        assert_eq!(version.to_string(), "TLS13");
    }

    #[test]
    fn test_client_config_sets_alpn() {
        let settings = TlsSettings::default();
        let config = settings.client_config(&[b"h2", b"http/1.1"]).unwrap();
        assert_eq!(config.alpn_protocols, vec![b"h2".to_vec(), b"http/1.1".to_vec()]);
    }

    #[test]
    fn test_client_config_insecure() {
        let settings = TlsSettings {
            min_version: TlsVersion::Tls13,
            insecure_skip_verify: true,
            ..Default::default()
        };
        assert!(settings.client_config(&[b"h3"]).is_ok());
    }
}
