//! Callback notification decryption.
//!
//! Transfer state callbacks carry their payload in an `AEAD_AES_256_GCM`
//! encrypted `resource`, keyed with the merchant's 32-byte APIv3 key.
//! Verifying the notification's signature headers is not handled here.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose, Engine};
use error_stack::Report;
use serde::{Deserialize, Serialize};

use crate::error::TransferError;
use crate::transfer::TransferState;

pub const RESOURCE_ALGORITHM: &str = "AEAD_AES_256_GCM";
const GCM_NONCE_LEN: usize = 12;

/// Outer JSON body of a callback notification.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationEnvelope {
    pub id: String,
    pub create_time: String,
    pub event_type: String,
    pub resource_type: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub resource: EncryptedResource,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EncryptedResource {
    pub algorithm: String,
    pub ciphertext: String,
    #[serde(default)]
    pub associated_data: Option<String>,
    pub nonce: String,
    #[serde(default)]
    pub original_type: Option<String>,
}

/// Decrypted payload of a `MCHTRANSFER.BILL.FINISHED` notification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransferNotification {
    pub out_bill_no: String,
    pub transfer_bill_no: String,
    pub state: TransferState,
    pub mch_id: String,
    pub transfer_amount: u64,
    pub openid: String,
    #[serde(default)]
    pub fail_reason: Option<String>,
    pub create_time: String,
    pub update_time: String,
}

fn decryption_error(message: impl Into<String>) -> Report<TransferError> {
    Report::new(TransferError::Decryption {
        message: message.into(),
    })
}

/// Decrypts a notification resource and returns the plaintext JSON.
///
/// # Errors
///
/// Returns [`TransferError::Decryption`] if the algorithm is not
/// `AEAD_AES_256_GCM`, the key or nonce has the wrong length, the ciphertext
/// is not base64, or authentication fails.
pub fn decrypt_resource(
    api_v3_key: &str,
    resource: &EncryptedResource,
) -> Result<String, Report<TransferError>> {
    if resource.algorithm != RESOURCE_ALGORITHM {
        return Err(decryption_error(format!(
            "Unsupported resource algorithm: {}",
            resource.algorithm
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(api_v3_key.as_bytes())
        .map_err(|_| decryption_error("APIv3 key must be 32 bytes"))?;

    if resource.nonce.len() != GCM_NONCE_LEN {
        return Err(decryption_error(format!(
            "Resource nonce must be {} bytes, got {}",
            GCM_NONCE_LEN,
            resource.nonce.len()
        )));
    }
    let nonce = Nonce::from_slice(resource.nonce.as_bytes());

    let ciphertext = general_purpose::STANDARD
        .decode(&resource.ciphertext)
        .map_err(|e| decryption_error(format!("Invalid base64 ciphertext: {}", e)))?;

    let plaintext = cipher
        .decrypt(
            nonce,
            Payload {
                msg: &ciphertext,
                aad: resource.associated_data.as_deref().unwrap_or("").as_bytes(),
            },
        )
        .map_err(|_| decryption_error("Resource authentication failed"))?;

    String::from_utf8(plaintext)
        .map_err(|e| decryption_error(format!("Decrypted resource is not UTF-8: {}", e)))
}

/// Decrypts a full notification body into a [`TransferNotification`].
///
/// # Errors
///
/// Returns [`TransferError::Serialization`] if the envelope or the decrypted
/// payload is not the expected JSON, or [`TransferError::Decryption`] if the
/// resource cannot be decrypted.
pub fn parse_transfer_notification(
    api_v3_key: &str,
    body: &str,
) -> Result<TransferNotification, Report<TransferError>> {
    let envelope: NotificationEnvelope = serde_json::from_str(body).map_err(|e| {
        Report::new(TransferError::Serialization {
            message: format!("Invalid notification envelope: {}", e),
        })
    })?;
    log::info!(
        "Decrypting notification {} ({})",
        envelope.id,
        envelope.event_type
    );

    let plaintext = decrypt_resource(api_v3_key, &envelope.resource)?;
    serde_json::from_str(&plaintext).map_err(|e| {
        Report::new(TransferError::Serialization {
            message: format!("Invalid transfer notification payload: {}", e),
        })
    })
}
