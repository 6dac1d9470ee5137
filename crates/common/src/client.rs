//! End-to-end transfer calls.
//!
//! [`TransferClient`] ties the pieces together: it builds and validates the
//! request body, signs it, sends it, and runs the response through
//! [`check_status`], [`validate_response`], and [`parse_response`]. Because
//! response verification is not implemented, a successful HTTP exchange
//! still ends in [`TransferError::NotImplemented`].

use error_stack::Report;
use http::Method;
use rsa::RsaPublicKey;

use crate::error::TransferError;
use crate::keys::MerchantKeys;
use crate::request_signing::{build_request_headers, RequestSigner};
use crate::response::{parse_response, validate_response};
use crate::settings::Settings;
use crate::transfer::{
    cancel_transfer_path, query_transfer_path, validate_out_bill_no, validate_transfer_request,
    TransferOrder, TransferRequest, TRANSFER_BILLS_PATH,
};
use crate::transport::{check_status, ApiClient, HttpResponse};

pub struct TransferClient {
    mch_id: String,
    appid: String,
    merchant_serial_no: String,
    platform_serial_no: String,
    platform_key: RsaPublicKey,
    signer: RequestSigner,
    api: ApiClient,
}

impl TransferClient {
    /// Loads the merchant and platform keys named in `settings` and builds a
    /// client.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::KeyLoad`] if either key cannot be loaded, or
    /// [`TransferError::Configuration`] if the `[api]` settings are unusable.
    pub fn from_settings(settings: &Settings) -> Result<Self, Report<TransferError>> {
        let keys = MerchantKeys::load(settings)?;
        Self::new(settings, keys)
    }

    /// Builds a client around already loaded keys.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Configuration`] if the `[api]` settings are
    /// unusable.
    pub fn new(settings: &Settings, keys: MerchantKeys) -> Result<Self, Report<TransferError>> {
        Ok(Self {
            mch_id: settings.merchant.mch_id.clone(),
            appid: settings.merchant.appid.clone(),
            merchant_serial_no: settings.merchant.private_key_serial_no.clone(),
            platform_serial_no: settings.platform.public_key_serial_no.clone(),
            platform_key: keys.public_key,
            signer: RequestSigner::new(keys.private_key),
            api: ApiClient::new(&settings.api)?,
        })
    }

    /// Turns an order into a validated wire request.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Encryption`] if the recipient name cannot be
    /// encrypted, or [`TransferError::Validation`] if the request breaks a
    /// business rule.
    pub fn build_request(
        &self,
        order: TransferOrder,
    ) -> Result<TransferRequest, Report<TransferError>> {
        let request = order.into_request(&self.appid, &self.platform_key)?;
        validate_transfer_request(&request)?;
        Ok(request)
    }

    /// Creates a transfer bill.
    ///
    /// # Errors
    ///
    /// Fails before sending if the order is invalid. Otherwise returns
    /// [`TransferError::Transport`] for network failures,
    /// [`TransferError::Status`] for non-2xx responses, and
    /// [`TransferError::NotImplemented`] for everything else.
    pub fn create_transfer(
        &self,
        order: TransferOrder,
    ) -> Result<serde_json::Value, Report<TransferError>> {
        let request = self.build_request(order)?;
        let body = request.to_json()?;
        log::info!(
            "Creating transfer {} for {} fen",
            request.out_bill_no,
            request.transfer_amount
        );

        let response = self.send(&Method::POST, TRANSFER_BILLS_PATH, &body)?;
        Self::handle_response(&response)
    }

    /// Looks up a transfer bill by the merchant's bill number.
    ///
    /// # Errors
    ///
    /// Same as [`TransferClient::create_transfer`].
    pub fn query_transfer(
        &self,
        out_bill_no: &str,
    ) -> Result<serde_json::Value, Report<TransferError>> {
        validate_out_bill_no(out_bill_no)?;
        let response = self.send(&Method::GET, &query_transfer_path(out_bill_no), "")?;
        Self::handle_response(&response)
    }

    /// Cancels a transfer bill that is still waiting for the user to confirm.
    ///
    /// # Errors
    ///
    /// Same as [`TransferClient::create_transfer`].
    pub fn cancel_transfer(
        &self,
        out_bill_no: &str,
    ) -> Result<serde_json::Value, Report<TransferError>> {
        validate_out_bill_no(out_bill_no)?;
        let response = self.send(&Method::POST, &cancel_transfer_path(out_bill_no), "")?;
        Self::handle_response(&response)
    }

    fn send(
        &self,
        method: &Method,
        path: &str,
        body: &str,
    ) -> Result<HttpResponse, Report<TransferError>> {
        let material = self.signer.sign(method.as_str(), path, body)?;
        let headers = build_request_headers(
            &self.mch_id,
            &self.merchant_serial_no,
            &self.platform_serial_no,
            &material,
        );
        self.api.execute(method, path, &headers, body)
    }

    fn handle_response(
        response: &HttpResponse,
    ) -> Result<serde_json::Value, Report<TransferError>> {
        check_status(response)?;
        validate_response(response)?;
        parse_response(response)
    }
}
