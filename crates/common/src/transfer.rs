//! Transfer order model, scene catalogue, and request validation.

use error_stack::Report;
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};

use crate::encryption::{encrypt_sensitive, requires_encrypted_user_name};
use crate::error::TransferError;

pub const TRANSFER_BILLS_PATH: &str = "/v3/fund-app/mch-transfer/transfer-bills";

#[must_use]
pub fn query_transfer_path(out_bill_no: &str) -> String {
    format!("{TRANSFER_BILLS_PATH}/out-bill-no/{out_bill_no}")
}

#[must_use]
pub fn cancel_transfer_path(out_bill_no: &str) -> String {
    format!("{TRANSFER_BILLS_PATH}/out-bill-no/{out_bill_no}/cancel")
}

/// Minimum transfer amount in fen (0.30 CNY).
pub const MIN_TRANSFER_AMOUNT: u64 = 30;
/// Maximum transfer amount in fen (20 000 CNY).
pub const MAX_TRANSFER_AMOUNT: u64 = 2_000_000;
/// Maximum length of `transfer_remark` in UTF-8 bytes.
pub const MAX_REMARK_BYTES: usize = 32;
pub const MAX_OUT_BILL_NO_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportInfo {
    pub info_type: String,
    pub info_content: String,
}

impl ReportInfo {
    pub fn new(info_type: impl Into<String>, info_content: impl Into<String>) -> Self {
        Self {
            info_type: info_type.into(),
            info_content: info_content.into(),
        }
    }
}

/// Body of `POST /v3/fund-app/mch-transfer/transfer-bills`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub appid: String,
    pub out_bill_no: String,
    pub transfer_scene_id: String,
    pub openid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub transfer_amount: u64,
    pub transfer_remark: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_recv_perception: Option<String>,
    pub transfer_scene_report_infos: Vec<ReportInfo>,
}

impl TransferRequest {
    /// Serializes the request to the JSON body that gets signed and sent.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Serialization`] if the request cannot be encoded.
    pub fn to_json(&self) -> Result<String, Report<TransferError>> {
        serde_json::to_string(self).map_err(|e| {
            Report::new(TransferError::Serialization {
                message: format!("Failed to serialize transfer request: {}", e),
            })
        })
    }
}

/// Caller supplied transfer order, with the recipient name still in plaintext.
#[derive(Debug, Clone)]
pub struct TransferOrder {
    pub out_bill_no: String,
    pub scene_id: String,
    pub openid: String,
    pub amount: u64,
    pub remark: String,
    pub user_name: Option<String>,
    pub notify_url: Option<String>,
    pub user_recv_perception: Option<String>,
    pub report_infos: Vec<ReportInfo>,
}

impl TransferOrder {
    /// Builds the wire request, encrypting `user_name` when the amount
    /// requires it.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Encryption`] if the recipient name cannot be
    /// encrypted.
    pub fn into_request(
        self,
        appid: &str,
        public_key: &RsaPublicKey,
    ) -> Result<TransferRequest, Report<TransferError>> {
        let user_name = match self.user_name {
            Some(name) if requires_encrypted_user_name(self.amount) => {
                Some(encrypt_sensitive(public_key, &name)?)
            }
            Some(_) => {
                log::warn!(
                    "Dropping user_name for {}: amount {} is below the real-name threshold",
                    self.out_bill_no,
                    self.amount
                );
                None
            }
            None => None,
        };

        Ok(TransferRequest {
            appid: appid.to_string(),
            out_bill_no: self.out_bill_no,
            transfer_scene_id: self.scene_id,
            openid: self.openid,
            user_name,
            transfer_amount: self.amount,
            transfer_remark: self.remark,
            notify_url: self.notify_url,
            user_recv_perception: self.user_recv_perception,
            transfer_scene_report_infos: self.report_infos,
        })
    }
}

/// Generates a merchant bill number of the form `BILL{epoch}{8 hex}`.
#[must_use]
pub fn generate_out_bill_no() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("BILL{}{}", chrono::Utc::now().timestamp(), &suffix[..8])
}

/// A transfer scene approved for the merchant account.
#[derive(Debug, Clone, Copy)]
pub struct TransferScene {
    pub name: &'static str,
    pub scene_id: &'static str,
    pub user_perceptions: &'static [&'static str],
    pub report_info_types: &'static [&'static str],
}

pub const TRANSFER_SCENES: &[TransferScene] = &[
    TransferScene {
        name: "现金营销",
        scene_id: "1000",
        user_perceptions: &["活动奖励", "现金奖励"],
        report_info_types: &["活动名称", "奖励说明"],
    },
    TransferScene {
        name: "佣金报酬",
        scene_id: "1002",
        user_perceptions: &["劳务报酬", "报销款", "企业补贴", "开工利是"],
        report_info_types: &["岗位类型", "报酬说明"],
    },
];

#[must_use]
pub fn find_scene(scene_id: &str) -> Option<&'static TransferScene> {
    TRANSFER_SCENES.iter().find(|scene| scene.scene_id == scene_id)
}

fn invalid(message: impl Into<String>) -> Report<TransferError> {
    Report::new(TransferError::Validation {
        message: message.into(),
    })
}

/// Merchant bill numbers are 1 to 32 ASCII letters or digits.
///
/// # Errors
///
/// Returns [`TransferError::Validation`] if `out_bill_no` breaks the rule.
pub fn validate_out_bill_no(out_bill_no: &str) -> Result<(), Report<TransferError>> {
    if out_bill_no.is_empty() || out_bill_no.len() > MAX_OUT_BILL_NO_LEN {
        return Err(invalid(format!(
            "out_bill_no must be 1 to {} characters",
            MAX_OUT_BILL_NO_LEN
        )));
    }
    if !out_bill_no.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid("out_bill_no may only contain letters and digits"));
    }
    Ok(())
}

/// Checks a request against the API's documented business rules before it
/// is sent.
///
/// # Errors
///
/// Returns [`TransferError::Validation`] describing the first rule violated.
pub fn validate_transfer_request(request: &TransferRequest) -> Result<(), Report<TransferError>> {
    if request.appid.is_empty() {
        return Err(invalid("appid must not be empty"));
    }
    if request.openid.is_empty() {
        return Err(invalid("openid must not be empty"));
    }

    validate_out_bill_no(&request.out_bill_no)?;

    let amount = request.transfer_amount;
    if amount < MIN_TRANSFER_AMOUNT {
        return Err(invalid(format!(
            "transfer_amount {} is below the minimum of {}",
            amount, MIN_TRANSFER_AMOUNT
        )));
    }
    if amount > MAX_TRANSFER_AMOUNT {
        return Err(invalid(format!(
            "transfer_amount {} exceeds the maximum of {}",
            amount, MAX_TRANSFER_AMOUNT
        )));
    }
    if requires_encrypted_user_name(amount)
        && request.user_name.as_deref().map_or(true, str::is_empty)
    {
        return Err(invalid(
            "user_name is required when transfer_amount is at least 200000",
        ));
    }

    let remark = &request.transfer_remark;
    if remark.is_empty() || remark.len() > MAX_REMARK_BYTES {
        return Err(invalid(format!(
            "transfer_remark must be 1 to {} UTF-8 bytes",
            MAX_REMARK_BYTES
        )));
    }

    let scene = find_scene(&request.transfer_scene_id).ok_or_else(|| {
        invalid(format!(
            "unknown transfer_scene_id: {}",
            request.transfer_scene_id
        ))
    })?;

    if let Some(perception) = &request.user_recv_perception {
        if !scene.user_perceptions.contains(&perception.as_str()) {
            return Err(invalid(format!(
                "user_recv_perception for scene {} must be one of: {}",
                scene.name,
                scene.user_perceptions.join(", ")
            )));
        }
    }

    let infos = &request.transfer_scene_report_infos;
    if infos.len() != scene.report_info_types.len() {
        return Err(invalid(format!(
            "scene {} expects {} report infos, got {}",
            scene.name,
            scene.report_info_types.len(),
            infos.len()
        )));
    }
    for (expected, info) in scene.report_info_types.iter().zip(infos) {
        if info.info_type != *expected {
            return Err(invalid(format!(
                "report info type mismatch: expected {}, got {}",
                expected, info.info_type
            )));
        }
        if info.info_content.is_empty() {
            return Err(invalid(format!("report info {} is empty", expected)));
        }
    }

    Ok(())
}

/// Transfer bill state as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferState {
    Accepted,
    Processing,
    WaitUserConfirm,
    Transfering,
    Success,
    Fail,
    Canceling,
    Cancelled,
}

impl TransferState {
    /// `SUCCESS`, `FAIL` and `CANCELLED` never change again.
    #[must_use]
    pub fn is_final(self) -> bool {
        matches!(
            self,
            TransferState::Success | TransferState::Fail | TransferState::Cancelled
        )
    }

    /// The recipient has to accept the transfer in WeChat before it proceeds.
    #[must_use]
    pub fn needs_user_confirmation(self) -> bool {
        self == TransferState::WaitUserConfirm
    }

    /// Still moving on the platform side; query again later.
    #[must_use]
    pub fn is_in_progress(self) -> bool {
        matches!(self, TransferState::Processing | TransferState::Transfering)
    }

    /// Human readable description, as shown to merchants.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            TransferState::Accepted => "转账已受理",
            TransferState::Processing | TransferState::Transfering => "转账处理中",
            TransferState::WaitUserConfirm => "待收款用户确认",
            TransferState::Success => "转账成功",
            TransferState::Fail => "转账失败",
            TransferState::Canceling => "转账撤销中",
            TransferState::Cancelled => "转账已撤销",
        }
    }
}
