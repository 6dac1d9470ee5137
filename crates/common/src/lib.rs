//! Common functionality for the merchant transfer client.
//!
//! This crate holds everything needed to call the WeChat Pay "merchant
//! transfer to balance" API: key loading, request signing, sensitive field
//! encryption, the transfer order model, and a blocking HTTPS transport. The
//! `wxtransfer` CLI is a thin layer on top of it.
//!
//! # Modules
//!
//! - [`client`]: End-to-end create, query, and cancel calls
//! - [`encryption`]: RSA-OAEP encryption of sensitive fields
//! - [`error`]: Error types and error handling utilities
//! - [`keys`]: Loading merchant and platform keys from PEM files
//! - [`logging`]: Logger setup for binaries
//! - [`notification`]: Decryption of callback notifications
//! - [`request_signing`]: Request signatures and the `Authorization` header
//! - [`response`]: Response validation and parsing (not implemented)
//! - [`settings`]: Configuration management and validation
//! - [`test_support`]: Testing utilities and fixtures
//! - [`transfer`]: Transfer orders, scenes, and request validation
//! - [`transport`]: HTTP client with timeouts and status handling

pub mod client;
pub mod encryption;
pub mod error;
pub mod keys;
pub mod logging;
pub mod notification;
pub mod request_signing;
pub mod response;
pub mod settings;
pub mod transfer;
pub mod transport;
