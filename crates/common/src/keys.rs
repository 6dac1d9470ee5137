//! Loading of the merchant private key and the platform public key.
//!
//! The merchant key signs every request. The platform key is only used to
//! encrypt sensitive request fields and may be supplied either as an X.509
//! certificate or as a bare `PUBLIC KEY` PEM.

use std::fs;
use std::path::Path;

use error_stack::{Report, ResultExt};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use x509_cert::der::{DecodePem, Encode};
use x509_cert::Certificate;

use crate::error::TransferError;
use crate::settings::Settings;

const CERTIFICATE_LABEL: &str = "-----BEGIN CERTIFICATE-----";

fn read_pem(path: &Path, what: &str) -> Result<String, Report<TransferError>> {
    fs::read_to_string(path).change_context(TransferError::KeyLoad {
        message: format!("Failed to read {} from {}", what, path.display()),
    })
}

/// Loads a PKCS#8 PEM encoded RSA private key.
///
/// # Errors
///
/// Returns [`TransferError::KeyLoad`] if the file is missing, truncated, or
/// not an RSA PKCS#8 key.
pub fn load_private_key(path: &Path) -> Result<RsaPrivateKey, Report<TransferError>> {
    let pem = read_pem(path, "private key")?;

    RsaPrivateKey::from_pkcs8_pem(&pem).map_err(|e| {
        Report::new(TransferError::KeyLoad {
            message: format!(
                "Failed to parse PKCS#8 private key {}: {}",
                path.display(),
                e
            ),
        })
    })
}

/// Loads the platform public key from a certificate or public key PEM file.
///
/// # Errors
///
/// Returns [`TransferError::KeyLoad`] if the file is missing, the certificate
/// cannot be decoded, or the embedded key is not RSA.
pub fn load_public_key(path: &Path) -> Result<RsaPublicKey, Report<TransferError>> {
    let pem = read_pem(path, "platform certificate")?;

    if pem.contains(CERTIFICATE_LABEL) {
        public_key_from_certificate(&pem)
            .attach(format!("while loading certificate {}", path.display()))
    } else {
        RsaPublicKey::from_public_key_pem(&pem).map_err(|e| {
            Report::new(TransferError::KeyLoad {
                message: format!("Failed to parse public key {}: {}", path.display(), e),
            })
        })
    }
}

fn public_key_from_certificate(pem: &str) -> Result<RsaPublicKey, Report<TransferError>> {
    let certificate = Certificate::from_pem(pem.as_bytes()).map_err(|e| {
        Report::new(TransferError::KeyLoad {
            message: format!("Failed to decode X.509 certificate: {}", e),
        })
    })?;

    let spki_der = certificate
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| {
            Report::new(TransferError::KeyLoad {
                message: format!("Failed to encode certificate public key: {}", e),
            })
        })?;

    RsaPublicKey::from_public_key_der(&spki_der).map_err(|e| {
        Report::new(TransferError::KeyLoad {
            message: format!("Certificate does not carry an RSA public key: {}", e),
        })
    })
}

/// Key material loaded once at start-up and never modified afterwards.
#[derive(Debug, Clone)]
pub struct MerchantKeys {
    pub private_key: RsaPrivateKey,
    pub public_key: RsaPublicKey,
}

impl MerchantKeys {
    /// Loads both keys from the paths in `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::KeyLoad`] if either key cannot be loaded.
    pub fn load(settings: &Settings) -> Result<Self, Report<TransferError>> {
        let private_key = load_private_key(Path::new(&settings.merchant.private_key_path))?;
        log::info!(
            "Loaded merchant private key from {}",
            settings.merchant.private_key_path
        );

        let public_key = load_public_key(Path::new(&settings.platform.public_key_path))?;
        log::info!(
            "Loaded platform public key from {}",
            settings.platform.public_key_path
        );

        Ok(Self {
            private_key,
            public_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tests::{fixture_path, test_settings};
    use rsa::traits::PublicKeyParts;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_private_key() {
        let key = load_private_key(&fixture_path("apiclient_key.pem")).unwrap();
        assert_eq!(key.size(), 256);
    }

    #[test]
    fn test_load_public_key_from_certificate() {
        let from_cert = load_public_key(&fixture_path("platform_cert.pem")).unwrap();
        let from_spki = load_public_key(&fixture_path("platform_public_key.pem")).unwrap();

        assert_eq!(from_cert, from_spki);
    }

    #[test]
    fn test_certificate_key_matches_platform_private_key() {
        let public_key = load_public_key(&fixture_path("platform_cert.pem")).unwrap();
        let private_key = load_private_key(&fixture_path("platform_key.pem")).unwrap();

        assert_eq!(public_key, private_key.to_public_key());
    }

    #[test]
    fn test_missing_private_key_file() {
        let result = load_private_key(Path::new("does/not/exist.pem"));

        let err = result.unwrap_err();
        assert!(matches!(
            err.current_context(),
            TransferError::KeyLoad { .. }
        ));
    }

    #[test]
    fn test_truncated_private_key() {
        let pem = fs::read_to_string(fixture_path("apiclient_key.pem")).unwrap();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(pem[..pem.len() / 2].as_bytes()).unwrap();

        let err = load_private_key(file.path()).unwrap_err();
        assert!(matches!(
            err.current_context(),
            TransferError::KeyLoad { .. }
        ));
    }

    #[test]
    fn test_corrupted_private_key_body() {
        let pem = fs::read_to_string(fixture_path("apiclient_key.pem")).unwrap();
        let mut lines: Vec<String> = pem.lines().map(String::from).collect();
        lines[1] = "A".repeat(lines[1].len());
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(lines.join("\n").as_bytes()).unwrap();

        let err = load_private_key(file.path()).unwrap_err();
        assert!(matches!(
            err.current_context(),
            TransferError::KeyLoad { .. }
        ));
    }

    #[test]
    fn test_certificate_is_not_a_private_key() {
        let err = load_private_key(&fixture_path("platform_cert.pem")).unwrap_err();
        assert!(matches!(
            err.current_context(),
            TransferError::KeyLoad { .. }
        ));
    }

    #[test]
    fn test_garbage_certificate() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "-----BEGIN CERTIFICATE-----\nbm90IGEgY2VydA==\n-----END CERTIFICATE-----\n"
        )
        .unwrap();

        let err = load_public_key(file.path()).unwrap_err();
        assert!(matches!(
            err.current_context(),
            TransferError::KeyLoad { .. }
        ));
    }

    #[test]
    fn test_merchant_keys_load() {
        let keys = MerchantKeys::load(&test_settings()).unwrap();
        assert_eq!(keys.public_key.size(), 256);
    }
}
