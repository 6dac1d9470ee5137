//! Response validation and parsing.
//!
//! Neither step is implemented. The platform signs its responses with the
//! `Wechatpay-Signature` family of headers, but the verification scheme has
//! to come from the provider's API documentation. Both functions fail
//! unconditionally so a missing check can never pass silently.

use error_stack::Report;

use crate::error::TransferError;
use crate::transport::HttpResponse;

/// Verifies the platform signature on a response. Not implemented.
///
/// # Errors
///
/// Always returns [`TransferError::NotImplemented`].
pub fn validate_response(response: &HttpResponse) -> Result<(), Report<TransferError>> {
    Err(Report::new(TransferError::NotImplemented {
        operation: "validate_response",
    })
    .attach(format!(
        "response signature verification is not implemented (HTTP {}, Request-Id {})",
        response.status,
        response.header("Request-Id").unwrap_or("-")
    )))
}

/// Parses a verified response body. Not implemented.
///
/// # Errors
///
/// Always returns [`TransferError::NotImplemented`].
pub fn parse_response(response: &HttpResponse) -> Result<serde_json::Value, Report<TransferError>> {
    Err(Report::new(TransferError::NotImplemented {
        operation: "parse_response",
    })
    .attach(format!(
        "response parsing is not implemented ({} byte body)",
        response.body.len()
    )))
}
