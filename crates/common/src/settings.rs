use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use error_stack::Report;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::error::TransferError;

pub const DEFAULT_API_HOST: &str = "https://api.mch.weixin.qq.com";
pub const ENV_PREFIX: &str = "WECHATPAY";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Merchant {
    /// Merchant id (`mchid`) assigned by the payment provider.
    #[validate(length(min = 1))]
    pub mch_id: String,
    /// App id bound to the merchant account.
    #[validate(length(min = 1))]
    pub appid: String,
    /// PKCS#8 PEM file holding the merchant API private key.
    #[validate(length(min = 1))]
    pub private_key_path: String,
    /// Serial number of the merchant API certificate.
    #[validate(length(min = 1))]
    pub private_key_serial_no: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Platform {
    /// Platform certificate (or public key) PEM file.
    #[validate(length(min = 1))]
    pub public_key_path: String,
    /// Serial number sent in the `Wechatpay-Serial` header.
    #[validate(length(min = 1))]
    pub public_key_serial_no: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Api {
    #[serde(default = "default_host")]
    #[validate(url)]
    pub host: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Outbound proxy such as `http://proxy.internal:3128`. Proxy
    /// environment variables are ignored.
    #[serde(default)]
    pub proxy: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            host: default_host(),
            connect_timeout_secs: default_connect_timeout(),
            write_timeout_secs: default_write_timeout(),
            read_timeout_secs: default_read_timeout(),
            proxy: None,
        }
    }
}

impl Api {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct Notification {
    /// APIv3 key used to decrypt callback resources.
    #[validate(custom(function = "validate_api_v3_key"))]
    pub api_v3_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Settings {
    #[validate(nested)]
    pub merchant: Merchant,
    #[validate(nested)]
    pub platform: Platform,
    #[serde(default)]
    #[validate(nested)]
    pub api: Api,
    #[serde(default)]
    #[validate(nested)]
    pub notification: Notification,
}

impl Settings {
    /// Parses settings from a TOML string, letting `WECHATPAY__`-prefixed
    /// environment variables override individual values.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or required fields are missing.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let environment = Environment::default()
            .prefix(ENV_PREFIX)
            .separator("__");

        let toml = File::from_str(toml_str, FileFormat::Toml);
        let config = Config::builder()
            .add_source(toml)
            .add_source(environment)
            .build()?;

        config.try_deserialize()
    }

    /// Parses and validates settings in one step.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Configuration`] if parsing or validation fails.
    pub fn load(toml_str: &str) -> Result<Self, Report<TransferError>> {
        let settings = Self::from_toml(toml_str).map_err(|e| {
            Report::new(TransferError::Configuration {
                message: format!("Failed to parse and merge config: {}", e),
            })
        })?;

        settings.validate().map_err(|e| {
            Report::new(TransferError::Configuration {
                message: format!("Settings validation failed: {}", e),
            })
        })?;

        Ok(settings)
    }
}

fn default_host() -> String {
    DEFAULT_API_HOST.to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_write_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    30
}

fn validate_api_v3_key(key: &str) -> Result<(), ValidationError> {
    if key.len() == 32 {
        Ok(())
    } else {
        Err(ValidationError::new("api_v3_key_length"))
    }
}
