//! Request signing.
//!
//! Every API call is signed with the merchant private key over the string
//! `METHOD\nPATH\nTIMESTAMP\nNONCE\nBODY\n` using RSA PKCS#1 v1.5 with
//! SHA-256. The signature travels base64 encoded in the `Authorization`
//! header.

use base64::{engine::general_purpose, Engine};
use error_stack::Report;
use rand::distributions::Alphanumeric;
use rand::Rng;
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha2::Sha256;

use crate::error::TransferError;

pub const NONCE_LENGTH: usize = 32;

/// Per-request signing artifacts. Generated fresh for every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningMaterial {
    pub timestamp: i64,
    pub nonce: String,
    pub signature: String,
}

/// Builds the canonical string that gets signed.
#[must_use]
pub fn build_signing_message(
    method: &str,
    path: &str,
    timestamp: i64,
    nonce: &str,
    body: &str,
) -> String {
    format!("{method}\n{path}\n{timestamp}\n{nonce}\n{body}\n")
}

#[must_use]
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}

pub struct RequestSigner {
    key: SigningKey<Sha256>,
}

impl RequestSigner {
    #[must_use]
    pub fn new(private_key: RsaPrivateKey) -> Self {
        Self {
            key: SigningKey::<Sha256>::new(private_key),
        }
    }

    /// Signs a request using the current time and a fresh nonce.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Signing`] if the signature cannot be computed.
    pub fn sign(
        &self,
        method: &str,
        path: &str,
        body: &str,
    ) -> Result<SigningMaterial, Report<TransferError>> {
        let timestamp = chrono::Utc::now().timestamp();
        self.sign_with(method, path, body, timestamp, &generate_nonce())
    }

    /// Signs a request with a caller supplied timestamp and nonce.
    ///
    /// PKCS#1 v1.5 is deterministic, so the same inputs always produce the
    /// same signature.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Signing`] if the signature cannot be computed.
    pub fn sign_with(
        &self,
        method: &str,
        path: &str,
        body: &str,
        timestamp: i64,
        nonce: &str,
    ) -> Result<SigningMaterial, Report<TransferError>> {
        let message = build_signing_message(method, path, timestamp, nonce, body);
        log::debug!("Signing message: {:?}", message);

        let signature = self.key.try_sign(message.as_bytes()).map_err(|e| {
            Report::new(TransferError::Signing {
                message: format!("Failed to sign request: {}", e),
            })
        })?;

        Ok(SigningMaterial {
            timestamp,
            nonce: nonce.to_string(),
            signature: general_purpose::STANDARD.encode(signature.to_bytes()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::load_private_key;
    use crate::test_support::tests::fixture_path;
    use rsa::pkcs1v15::{Signature, VerifyingKey};
    use rsa::signature::Verifier;

    const TRANSFER_PATH: &str = "/v3/fund-app/mch-transfer/transfer-bills";
    const FIXED_TIMESTAMP: i64 = 1_554_208_460;
    const FIXED_NONCE: &str = "593BEC0C930BF1AFEB40B4A08C8FB242";
    const FIXED_BODY: &str = r#"{"appid":"wx8888888888888888"}"#;
    // openssl dgst -sha256 -sign tests/fixtures/apiclient_key.pem over the
    // message built from the constants above.
    const EXPECTED_SIGNATURE: &str = "fBxQ+tizJ7tqVS3gt+KA0jkr6A9X5THQwwhVdlBaHo3msJwmCXwuW45SLzNCl0NYEC2liuD885oL9pwjw9PATyP24KSEfaeRvZ4YkBDREfEg/QNnIMpe8FLQ1nqf4JcfRR5hNOFNydnlg72oCikUiUc/lJkwQwVTvedR/mPEZ9Q3Pwda2B2SoPMZCwK4xf4bX8jmp3wG2H5UcwOMZUlpe7dncLZIGLjxlja1gwidkzWF7A+Xdt9nU//R1Z3kHP9ZJhh/qzt+GhK4uWmdnGMm0sYlXS7p1Hgy2/9tVVZPx0CX3ubdVCJJWct1CzBL/VBIt+W/ztAVpkP7ULrTGdxrsA==";

    fn test_signer() -> RequestSigner {
        RequestSigner::new(load_private_key(&fixture_path("apiclient_key.pem")).unwrap())
    }

    #[test]
    fn test_build_signing_message() {
        let message = build_signing_message("POST", TRANSFER_PATH, 1, "abc", "{}");
        assert_eq!(
            message,
            "POST\n/v3/fund-app/mch-transfer/transfer-bills\n1\nabc\n{}\n"
        );
    }

    #[test]
    fn test_signing_message_has_five_lines_with_empty_body() {
        let message = build_signing_message("GET", "/v3/x", 1, "abc", "");
        assert_eq!(message, "GET\n/v3/x\n1\nabc\n\n");
        assert_eq!(message.matches('\n').count(), 5);
        assert!(!message.contains('\r'));
    }

    #[test]
    fn test_sign_with_matches_known_signature() {
        let material = test_signer()
            .sign_with("POST", TRANSFER_PATH, FIXED_BODY, FIXED_TIMESTAMP, FIXED_NONCE)
            .unwrap();

        assert_eq!(material.timestamp, FIXED_TIMESTAMP);
        assert_eq!(material.nonce, FIXED_NONCE);
        assert_eq!(material.signature, EXPECTED_SIGNATURE);
    }

    #[test]
    fn test_sign_with_is_deterministic() {
        let signer = test_signer();
        let first = signer
            .sign_with("POST", TRANSFER_PATH, FIXED_BODY, FIXED_TIMESTAMP, FIXED_NONCE)
            .unwrap();
        let second = signer
            .sign_with("POST", TRANSFER_PATH, FIXED_BODY, FIXED_TIMESTAMP, FIXED_NONCE)
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_sign_verifies_with_public_key() {
        let private_key = load_private_key(&fixture_path("apiclient_key.pem")).unwrap();
        let verifying_key = VerifyingKey::<Sha256>::new(private_key.to_public_key());
        let material = RequestSigner::new(private_key)
            .sign("POST", TRANSFER_PATH, FIXED_BODY)
            .unwrap();

        let message = build_signing_message(
            "POST",
            TRANSFER_PATH,
            material.timestamp,
            &material.nonce,
            FIXED_BODY,
        );
        let signature_bytes = general_purpose::STANDARD
            .decode(&material.signature)
            .unwrap();
        let signature = Signature::try_from(signature_bytes.as_slice()).unwrap();

        assert!(verifying_key.verify(message.as_bytes(), &signature).is_ok());
    }

    #[test]
    fn test_sign_uses_fresh_nonce() {
        let signer = test_signer();
        let first = signer.sign("POST", TRANSFER_PATH, FIXED_BODY).unwrap();
        let second = signer.sign("POST", TRANSFER_PATH, FIXED_BODY).unwrap();

        assert_ne!(first.nonce, second.nonce);
        assert_ne!(first.signature, second.signature);
    }

    #[test]
    fn test_generate_nonce() {
        let nonce = generate_nonce();
        assert_eq!(nonce.len(), NONCE_LENGTH);
        assert!(nonce.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
