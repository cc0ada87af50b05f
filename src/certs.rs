//! PEM certificate material: client identities for mTLS and trusted CA bundles.
//!
//! Inputs are PEM text that has already been loaded by the caller; nothing in
//! this module touches the filesystem or the network.

use crate::{Error, Result};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::sign::CertifiedKey;
use rustls::RootCertStore;
use rustls_pemfile::Item;

/// A client certificate chain together with its matching private key.
#[derive(Debug)]
pub struct ClientIdentity {
    pub(crate) chain: Vec<CertificateDer<'static>>,
    pub(crate) key: PrivateKeyDer<'static>,
}

impl ClientIdentity {
    /// Number of certificates in the chain, leaf first.
    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }
}

/// Parses a PEM client certificate (optionally followed by intermediates) and
/// its PEM private key.
///
/// # Errors
///
/// Returns [`Error::CertParse`] if either input is malformed, if no
/// certificate or no private key is found, or if the key does not belong to
/// the leaf certificate.
///
/// # Examples
///
/// ```no_run
/// let cert = std::fs::read_to_string("client.pem").unwrap();
/// let key = std::fs::read_to_string("client-key.pem").unwrap();
/// let identity = reqexec::load_client_identity(&cert, &key)?;
/// assert!(identity.chain_len() >= 1);
/// # Ok::<(), reqexec::Error>(())
/// ```
pub fn load_client_identity(cert_pem: &str, key_pem: &str) -> Result<ClientIdentity> {
    let chain = rustls_pemfile::certs(&mut cert_pem.as_bytes())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::CertParse(format!("malformed certificate PEM: {}", e)))?;
    if chain.is_empty() {
        return Err(Error::CertParse(
            "no CERTIFICATE block found in client certificate".to_string(),
        ));
    }

    let key = rustls_pemfile::private_key(&mut key_pem.as_bytes())
        .map_err(|e| Error::CertParse(format!("malformed private key PEM: {}", e)))?
        .ok_or_else(|| Error::CertParse("no private key block found in client key".to_string()))?;

    let signing_key = rustls::crypto::ring::sign::any_supported_type(&key)
        .map_err(|e| Error::CertParse(format!("unsupported private key: {}", e)))?;
    CertifiedKey::new(chain.clone(), signing_key)
        .keys_match()
        .map_err(|e| Error::CertParse(format!("private key does not match certificate: {}", e)))?;

    Ok(ClientIdentity { chain, key })
}

/// Parses one or more concatenated PEM certificates into a trust store.
///
/// `CERTIFICATE` blocks are added in order; other block types (keys, CRLs)
/// are skipped.
///
/// # Errors
///
/// Returns [`Error::CaParse`] if a block is malformed, if a certificate is
/// not a usable trust anchor, or if no certificate was found at all.
pub fn load_trusted_cas(ca_pem: &str) -> Result<RootCertStore> {
    let mut store = RootCertStore::empty();

    for (index, item) in rustls_pemfile::read_all(&mut ca_pem.as_bytes()).enumerate() {
        let item = item
            .map_err(|e| Error::CaParse(format!("malformed PEM block #{}: {}", index + 1, e)))?;
        match item {
            Item::X509Certificate(der) => {
                store
                    .add(der)
                    .map_err(|e| Error::CaParse(format!("certificate #{}: {}", index + 1, e)))?;
            }
            _ => tracing::debug!(
                block = index + 1,
                "Skipping non-certificate PEM block in CA bundle"
            ),
        }
    }

    if store.is_empty() {
        return Err(Error::CaParse("no CERTIFICATE block found".to_string()));
    }

    tracing::debug!(certificates = store.len(), "Loaded trusted CA certificates");
    Ok(store)
}
