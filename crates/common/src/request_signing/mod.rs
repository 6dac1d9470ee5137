//! Request signing for the merchant API.
//!
//! This module builds the canonical signing string, signs it with the
//! merchant RSA key, and formats the provider's `Authorization` header.

pub mod authorization;
pub mod signing;

pub use authorization::*;
pub use signing::*;
