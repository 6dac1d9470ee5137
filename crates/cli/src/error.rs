//! CLI error types.

use error_stack::Report;
use wechatpay_transfer_common::error::TransferError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Failure reported by the transfer library
    #[error("{0:?}")]
    Transfer(Report<TransferError>),
}

impl From<Report<TransferError>> for CliError {
    fn from(report: Report<TransferError>) -> Self {
        CliError::Transfer(report)
    }
}

impl CliError {
    /// Short, single-line description suitable for the final error message.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            CliError::Transfer(report) => report.current_context().to_string(),
            other => other.to_string(),
        }
    }
}
