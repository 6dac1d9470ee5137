//! Sensitive field encryption.
//!
//! Fields such as the recipient's real name are encrypted with the platform
//! public key using RSA-OAEP (SHA-1, MGF1) and sent base64 encoded.

use base64::{engine::general_purpose, Engine};
use error_stack::Report;
use rsa::{Oaep, RsaPublicKey};
use sha1::Sha1;

use crate::error::TransferError;

/// Transfers at or above this amount (in fen) must carry an encrypted
/// `user_name`.
pub const USER_NAME_REQUIRED_AMOUNT: u64 = 200_000;

#[must_use]
pub fn requires_encrypted_user_name(transfer_amount: u64) -> bool {
    transfer_amount >= USER_NAME_REQUIRED_AMOUNT
}

/// Encrypts `plaintext` with RSA-OAEP and returns the base64 ciphertext.
///
/// OAEP padding is randomized, so encrypting the same value twice yields
/// different ciphertexts.
///
/// # Errors
///
/// Returns [`TransferError::Encryption`] if the plaintext is longer than the
/// OAEP limit for the key size or the encryption fails.
pub fn encrypt_sensitive(
    public_key: &RsaPublicKey,
    plaintext: &str,
) -> Result<String, Report<TransferError>> {
    let mut rng = rand::thread_rng();
    let ciphertext = public_key
        .encrypt(&mut rng, Oaep::new::<Sha1>(), plaintext.as_bytes())
        .map_err(|e| {
            Report::new(TransferError::Encryption {
                message: format!("Failed to encrypt sensitive field: {}", e),
            })
        })?;

    Ok(general_purpose::STANDARD.encode(ciphertext))
}
