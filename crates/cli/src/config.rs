//! Configuration loading.
//!
//! Configuration is loaded from a TOML file and merged with environment
//! variables prefixed with `WECHATPAY__`. For example,
//! `WECHATPAY__MERCHANT__MCH_ID` overrides `merchant.mch_id` in the file.

use std::fs;
use std::path::Path;

use wechatpay_transfer_common::keys::MerchantKeys;
use wechatpay_transfer_common::settings::Settings;

use crate::error::CliError;

/// Load, merge, and validate settings from `file`.
pub(crate) fn load_settings(file: &Path) -> Result<Settings, CliError> {
    let content = fs::read_to_string(file)?;
    log::debug!("Loading config from: {}", file.display());
    log::debug!("Environment variables with WECHATPAY__ prefix will be merged");

    Ok(Settings::load(&content)?)
}

/// Check that the config parses, validates, and that both keys load.
#[allow(clippy::print_stdout)]
pub fn validate(file: &Path) -> Result<(), CliError> {
    let settings = load_settings(file)?;
    MerchantKeys::load(&settings)?;

    println!("✓ Configuration is valid");
    println!("  Merchant id: {}", settings.merchant.mch_id);
    println!("  App id: {}", settings.merchant.appid);
    println!(
        "  Merchant certificate serial: {}",
        settings.merchant.private_key_serial_no
    );
    println!(
        "  Platform certificate serial: {}",
        settings.platform.public_key_serial_no
    );
    println!("  API host: {}", settings.api.host);
    println!(
        "  APIv3 key: {}",
        if settings.notification.api_v3_key.is_some() {
            "configured"
        } else {
            "not configured"
        }
    );

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;
    use wechatpay_transfer_common::error::TransferError;

    pub fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../common/tests/fixtures")
            .join(name)
    }

    pub fn config_toml(host: &str) -> String {
        format!(
            r#"
            [merchant]
            mch_id = "1900006891"
            appid = "wx8888888888888888"
            private_key_path = "{}"
            private_key_serial_no = "3775B6A45ACD588826D15E583A95F5DD2C5B1F26"

            [platform]
            public_key_path = "{}"
            public_key_serial_no = "5C73B461FC2CB7D99C70357D088A20B770735C06"

            [api]
            host = "{host}"

            [notification]
            api_v3_key = "0123456789abcdef0123456789abcdef"
            "#,
            fixture_path("apiclient_key.pem").display(),
            fixture_path("platform_cert.pem").display(),
        )
    }

    pub fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_settings() {
        let file = write_config(&config_toml("https://api.mch.weixin.qq.com"));
        let settings = load_settings(file.path()).unwrap();

        assert_eq!(settings.merchant.mch_id, "1900006891");
        assert_eq!(settings.api.read_timeout_secs, 30);
    }

    #[test]
    fn test_load_settings_missing_file() {
        let err = load_settings(Path::new("/nonexistent/wechatpay.toml")).unwrap_err();
        assert!(matches!(err, CliError::Io(_)));
    }

    #[test]
    fn test_load_settings_rejects_invalid_values() {
        for toml in [
            config_toml("not a url"),
            config_toml("https://api.mch.weixin.qq.com")
                .replace("0123456789abcdef0123456789abcdef", "too-short"),
        ] {
            let err = load_settings(write_config(&toml).path()).unwrap_err();
            let CliError::Transfer(report) = err else {
                panic!("Expected Transfer variant");
            };
            assert!(matches!(
                report.current_context(),
                TransferError::Configuration { .. }
            ));
        }
    }

    #[test]
    fn test_validate_loads_keys() {
        let file = write_config(&config_toml("https://api.mch.weixin.qq.com"));
        assert!(validate(file.path()).is_ok());

        let broken = config_toml("https://api.mch.weixin.qq.com")
            .replace("platform_cert.pem", "missing.pem");
        let err = validate(write_config(&broken).path()).unwrap_err();
        assert!(matches!(err, CliError::Transfer(_)));
    }
}
