//! Subcommand implementations.

use std::fs;
use std::path::Path;

use wechatpay_transfer_common::client::TransferClient;
use wechatpay_transfer_common::encryption::encrypt_sensitive;
use wechatpay_transfer_common::keys::{load_private_key, load_public_key};
use wechatpay_transfer_common::notification::{parse_transfer_notification, TransferNotification};
use wechatpay_transfer_common::request_signing::{
    build_authorization, build_signing_message, generate_nonce, RequestSigner,
};
use wechatpay_transfer_common::transfer::{generate_out_bill_no, ReportInfo, TransferOrder};

use crate::config::load_settings;
use crate::error::CliError;

/// Flags of the `create` subcommand.
#[derive(Debug, Clone, clap::Args)]
pub struct CreateArgs {
    /// Recipient openid under the configured app id
    #[arg(long)]
    pub openid: String,

    /// Merchant bill number; generated when omitted
    #[arg(long)]
    pub out_bill_no: Option<String>,

    /// Transfer scene id
    #[arg(long, default_value = "1000")]
    pub scene_id: String,

    /// Amount in fen
    #[arg(long, default_value_t = 400_000)]
    pub amount: u64,

    #[arg(long, default_value = "2020年4月报销")]
    pub remark: String,

    /// Recipient real name; required from 200000 fen upwards, dropped below
    #[arg(long, default_value = "张三")]
    pub user_name: Option<String>,

    #[arg(long)]
    pub notify_url: Option<String>,

    #[arg(long, default_value = "现金奖励")]
    pub perception: String,

    /// Scene report info as TYPE=CONTENT, repeatable
    #[arg(
        long = "report-info",
        value_parser = parse_report_info,
        default_values = ["活动名称=新会员有礼", "奖励说明=注册会员抽奖一等奖"]
    )]
    pub report_infos: Vec<ReportInfo>,
}

impl CreateArgs {
    #[must_use]
    pub fn into_order(self) -> TransferOrder {
        TransferOrder {
            out_bill_no: self.out_bill_no.unwrap_or_else(generate_out_bill_no),
            scene_id: self.scene_id,
            openid: self.openid,
            amount: self.amount,
            remark: self.remark,
            user_name: self.user_name,
            notify_url: self.notify_url,
            user_recv_perception: Some(self.perception),
            report_infos: self.report_infos,
        }
    }
}

pub(crate) fn parse_report_info(value: &str) -> Result<ReportInfo, String> {
    match value.split_once('=') {
        Some((info_type, info_content)) if !info_type.is_empty() => {
            Ok(ReportInfo::new(info_type, info_content))
        }
        _ => Err(format!("expected TYPE=CONTENT, got '{value}'")),
    }
}

#[allow(clippy::print_stdout)]
fn print_json(value: &impl serde::Serialize) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::Config(format!("Failed to render output: {e}")))?;
    println!("{rendered}");
    Ok(())
}

pub fn create(config: &Path, args: CreateArgs) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let client = TransferClient::from_settings(&settings)?;

    let order = args.into_order();
    log::info!("Using out_bill_no {}", order.out_bill_no);

    let result = client.create_transfer(order)?;
    print_json(&result)
}

pub fn query(config: &Path, out_bill_no: &str) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let client = TransferClient::from_settings(&settings)?;

    let result = client.query_transfer(out_bill_no)?;
    print_json(&result)
}

pub fn cancel(config: &Path, out_bill_no: &str) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let client = TransferClient::from_settings(&settings)?;

    let result = client.cancel_transfer(out_bill_no)?;
    print_json(&result)
}

/// Output of the `sign` subcommand.
#[derive(Debug)]
pub struct SignOutput {
    pub message: String,
    pub authorization: String,
}

/// Signs a request offline without sending it.
pub fn sign(
    config: &Path,
    method: &str,
    path: &str,
    body: &str,
    timestamp: Option<i64>,
    nonce: Option<String>,
) -> Result<SignOutput, CliError> {
    let settings = load_settings(config)?;
    let private_key = load_private_key(Path::new(&settings.merchant.private_key_path))?;
    let signer = RequestSigner::new(private_key);

    let method = method.to_ascii_uppercase();
    let timestamp = timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp());
    let nonce = nonce.unwrap_or_else(generate_nonce);

    let material = signer.sign_with(&method, path, body, timestamp, &nonce)?;
    Ok(SignOutput {
        message: build_signing_message(&method, path, timestamp, &nonce, body),
        authorization: build_authorization(
            &settings.merchant.mch_id,
            &settings.merchant.private_key_serial_no,
            &material,
        ),
    })
}

/// Encrypts a value with the platform public key.
pub fn encrypt(config: &Path, value: &str) -> Result<String, CliError> {
    let settings = load_settings(config)?;
    let public_key = load_public_key(Path::new(&settings.platform.public_key_path))?;
    Ok(encrypt_sensitive(&public_key, value)?)
}

pub fn decrypt_notification(config: &Path, body_file: &Path) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let api_v3_key = settings.notification.api_v3_key.as_deref().ok_or_else(|| {
        CliError::Config("notification.api_v3_key is required to decrypt notifications".into())
    })?;

    let body = fs::read_to_string(body_file)?;
    let notification = parse_transfer_notification(api_v3_key, &body)?;
    print_json(&NotificationReport::from(notification))
}

/// A decrypted notification with its state spelled out for the operator.
#[derive(Debug, serde::Serialize)]
pub struct NotificationReport {
    #[serde(flatten)]
    pub notification: TransferNotification,
    pub state_description: &'static str,
    pub needs_user_confirmation: bool,
    pub in_progress: bool,
}

impl From<TransferNotification> for NotificationReport {
    fn from(notification: TransferNotification) -> Self {
        let state = notification.state;
        Self {
            notification,
            state_description: state.description(),
            needs_user_confirmation: state.needs_user_confirmation(),
            in_progress: state.is_in_progress(),
        }
    }
}
