//! TLS identity bootstrap.
//!
//! # Responsibilities
//! - Load the operator's certificate/key pair from two fixed paths
//! - Fall back to an in-memory self-signed certificate on any load failure
//! - Publish one read-only `rustls::ServerConfig` shared by every router
//!
//! # Design Decisions
//! - Load failures are never fatal; only a failed generation is
//! - The identity is built once before any router starts and never mutated

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair, PKCS_ECDSA_P256_SHA256};
use thiserror::Error;
use tokio_rustls::rustls::{
    self,
    pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer},
    ServerConfig,
};

/// Operator-supplied certificate, relative to the working directory.
pub const DEFAULT_CERT_FILE: &str = "cert.pem";

/// Operator-supplied private key, relative to the working directory.
pub const DEFAULT_KEY_FILE: &str = "key.pem";

const SELF_SIGNED_COMMON_NAME: &str = "ngvpn-edge";
const SELF_SIGNED_VALIDITY_DAYS: i64 = 365;

/// Why the certificate files could not be used.
#[derive(Debug, Error)]
pub enum TlsLoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no certificate found in {path}")]
    NoCertificate { path: PathBuf },

    #[error("no private key found in {path}")]
    NoPrivateKey { path: PathBuf },

    #[error("certificate/key rejected: {0}")]
    Rustls(#[from] rustls::Error),
}

/// No TLS identity could be established at all.
#[derive(Debug, Error)]
pub enum TlsBootstrapError {
    #[error("self-signed certificate generation failed: {0}")]
    Generate(#[from] rcgen::Error),

    #[error("generated certificate rejected: {0}")]
    Rustls(#[from] rustls::Error),
}

/// Where the published identity came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentitySource {
    Files { cert: PathBuf, key: PathBuf },
    SelfSigned,
}

/// The process-wide default TLS server identity.
#[derive(Debug, Clone)]
pub struct TlsIdentity {
    source: IdentitySource,
    certificates: Vec<CertificateDer<'static>>,
    server_config: Arc<ServerConfig>,
}

impl TlsIdentity {
    /// Load from the operator's files, or generate a self-signed identity.
    pub fn bootstrap(cert_path: &Path, key_path: &Path) -> Result<Self, TlsBootstrapError> {
        match Self::load(cert_path, key_path) {
            Ok(identity) => {
                tracing::info!(
                    cert = %cert_path.display(),
                    key = %key_path.display(),
                    "Loaded TLS certificate files"
                );
                Ok(identity)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "TLS certificate files unusable, generating a self-signed certificate"
                );
                Self::generate()
            }
        }
    }

    /// Load a PEM certificate chain and private key.
    pub fn load(cert_path: &Path, key_path: &Path) -> Result<Self, TlsLoadError> {
        let certificates = read_certificates(cert_path)?;
        let key = read_private_key(key_path)?;
        let server_config = build_server_config(certificates.clone(), key)?;

        Ok(Self {
            source: IdentitySource::Files {
                cert: cert_path.to_path_buf(),
                key: key_path.to_path_buf(),
            },
            certificates,
            server_config: Arc::new(server_config),
        })
    }

    /// Generate a fresh ECDSA P-256 self-signed identity in memory.
    pub fn generate() -> Result<Self, TlsBootstrapError> {
        let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)?;

        let mut params = CertificateParams::new(vec!["localhost".to_string()])?;
        let mut name = DistinguishedName::new();
        name.push(DnType::CommonName, SELF_SIGNED_COMMON_NAME);
        params.distinguished_name = name;

        let now = time::OffsetDateTime::now_utc();
        params.not_before = now - time::Duration::days(1);
        params.not_after = now + time::Duration::days(SELF_SIGNED_VALIDITY_DAYS);

        let cert = params.self_signed(&key_pair)?;
        let cert_der = cert.der().clone();
        let key_der = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));

        let server_config = build_server_config(vec![cert_der.clone()], key_der)?;

        Ok(Self {
            source: IdentitySource::SelfSigned,
            certificates: vec![cert_der],
            server_config: Arc::new(server_config),
        })
    }

    pub fn source(&self) -> &IdentitySource {
        &self.source
    }

    pub fn is_self_signed(&self) -> bool {
        self.source == IdentitySource::SelfSigned
    }

    /// Certificate chain presented to clients, leaf first.
    pub fn certificates(&self) -> &[CertificateDer<'static>] {
        &self.certificates
    }

    pub fn server_config(&self) -> Arc<ServerConfig> {
        Arc::clone(&self.server_config)
    }
}

fn build_server_config(
    certificates: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
) -> Result<ServerConfig, rustls::Error> {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(certificates, key)
}

fn open(path: &Path) -> Result<BufReader<File>, TlsLoadError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TlsLoadError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn read_certificates(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsLoadError> {
    let mut reader = open(path)?;
    let certificates = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    if certificates.is_empty() {
        return Err(TlsLoadError::NoCertificate {
            path: path.to_path_buf(),
        });
    }
    Ok(certificates)
}

fn read_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsLoadError> {
    let mut reader = open(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| TlsLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| TlsLoadError::NoPrivateKey {
            path: path.to_path_buf(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Write a freshly generated pair to `dir`, returning the cert DER.
    fn write_pair(dir: &Path) -> (PathBuf, PathBuf, Vec<u8>) {
        let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).unwrap();
        let cert = CertificateParams::new(vec!["edge.test".to_string()])
            .unwrap()
            .self_signed(&key_pair)
            .unwrap();

        let cert_path = dir.join("cert.pem");
        let key_path = dir.join("key.pem");
        fs::write(&cert_path, cert.pem()).unwrap();
        fs::write(&key_path, key_pair.serialize_pem()).unwrap();
        (cert_path, key_path, cert.der().to_vec())
    }

    #[test]
    fn test_load_valid_pair() {
        let dir = tempfile::tempdir().unwrap();
        let (cert_path, key_path, der) = write_pair(dir.path());

        let identity = TlsIdentity::bootstrap(&cert_path, &key_path).unwrap();
        assert!(!identity.is_self_signed());
        assert_eq!(identity.certificates().len(), 1);
        assert_eq!(identity.certificates()[0].as_ref(), der.as_slice());
        assert_eq!(
            identity.source(),
            &IdentitySource::Files {
                cert: cert_path,
                key: key_path
            }
        );
    }

    #[test]
    fn test_missing_files_fall_back_to_self_signed() {
        let dir = tempfile::tempdir().unwrap();
        let identity =
            TlsIdentity::bootstrap(&dir.path().join("cert.pem"), &dir.path().join("key.pem"))
                .unwrap();
        assert!(identity.is_self_signed());
        assert_eq!(identity.certificates().len(), 1);
    }

    #[test]
    fn test_corrupt_files_fall_back_to_self_signed() {
        let dir = tempfile::tempdir().unwrap();
        let cert_path = dir.path().join("cert.pem");
        let key_path = dir.path().join("key.pem");
        fs::write(&cert_path, "not a certificate").unwrap();
        fs::write(&key_path, "not a key").unwrap();

        assert!(matches!(
            TlsIdentity::load(&cert_path, &key_path),
            Err(TlsLoadError::NoCertificate { .. })
        ));
        assert!(TlsIdentity::bootstrap(&cert_path, &key_path)
            .unwrap()
            .is_self_signed());
    }

    #[test]
    fn test_missing_key_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (cert_path, _, _) = write_pair(dir.path());
        let empty_key = dir.path().join("empty.pem");
        fs::write(&empty_key, "").unwrap();

        assert!(matches!(
            TlsIdentity::load(&cert_path, &empty_key),
            Err(TlsLoadError::NoPrivateKey { .. })
        ));
    }

    #[test]
    fn test_generated_identities_are_fresh() {
        let a = TlsIdentity::generate().unwrap();
        let b = TlsIdentity::generate().unwrap();
        assert_ne!(a.certificates()[0], b.certificates()[0]);
    }
}
