//! TLS termination for `wss://` listeners.

use std::sync::Arc;

use rustls_pki_types::pem::{self, PemObject};
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use thiserror::Error;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::{self, ServerConfig};

use crate::config::TlsSettings;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read PEM file {path}: {source}")]
    Pem { path: String, source: pem::Error },

    #[error("no certificate found in {0}")]
    NoCertificates(String),

    #[error("invalid TLS configuration: {0}")]
    Config(#[from] rustls::Error),
}

/// Build an acceptor from the certificate chain and private key on disk.
pub fn load_acceptor(settings: &TlsSettings) -> Result<TlsAcceptor, TlsError> {
    let certs = CertificateDer::pem_file_iter(&settings.cert)
        .map_err(pem_error(&settings.cert))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(pem_error(&settings.cert))?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates(settings.cert.clone()));
    }
    let key = PrivateKeyDer::from_pem_file(&settings.key).map_err(pem_error(&settings.key))?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn pem_error(path: &str) -> impl FnOnce(pem::Error) -> TlsError {
    let path = path.to_string();
    move |source| TlsError::Pem { path, source }
}
