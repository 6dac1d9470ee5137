use http::header::{HeaderName, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

use super::SigningMaterial;

pub const AUTH_SCHEME: &str = "WECHATPAY2-SHA256-RSA2048";
pub const HEADER_WECHATPAY_SERIAL: HeaderName = HeaderName::from_static("wechatpay-serial");
pub const APPLICATION_JSON: &str = "application/json";

/// Formats the `Authorization` header value.
///
/// The pairs are always emitted in the order `mchid`, `nonce_str`,
/// `timestamp`, `serial_no`, `signature`.
#[must_use]
pub fn build_authorization(mch_id: &str, serial_no: &str, material: &SigningMaterial) -> String {
    format!(
        r#"{AUTH_SCHEME} mchid="{}",nonce_str="{}",timestamp="{}",serial_no="{}",signature="{}""#,
        mch_id, material.nonce, material.timestamp, serial_no, material.signature
    )
}

/// Builds the full header set for a signed API request.
#[must_use]
pub fn build_request_headers(
    mch_id: &str,
    merchant_serial_no: &str,
    platform_serial_no: &str,
    material: &SigningMaterial,
) -> Vec<(HeaderName, String)> {
    vec![
        (
            AUTHORIZATION,
            build_authorization(mch_id, merchant_serial_no, material),
        ),
        (CONTENT_TYPE, APPLICATION_JSON.to_string()),
        (ACCEPT, APPLICATION_JSON.to_string()),
        (HEADER_WECHATPAY_SERIAL, platform_serial_no.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material() -> SigningMaterial {
        SigningMaterial {
            timestamp: 1_554_208_460,
            nonce: "593BEC0C930BF1AFEB40B4A08C8FB242".into(),
            signature: "c2lnbmF0dXJl".into(),
        }
    }

    #[test]
    fn test_build_authorization() {
        let header = build_authorization(
            "1900009191",
            "1DDE55AD98ED71D6EDD4A4A16996DE7B47773A8C",
            &material(),
        );

        assert_eq!(
            header,
            "WECHATPAY2-SHA256-RSA2048 mchid=\"1900009191\",nonce_str=\"593BEC0C930BF1AFEB40B4A08C8FB242\",timestamp=\"1554208460\",serial_no=\"1DDE55AD98ED71D6EDD4A4A16996DE7B47773A8C\",signature=\"c2lnbmF0dXJl\""
        );
    }

    #[test]
    fn test_authorization_pairs_in_fixed_order() {
        let header = build_authorization("1900009191", "SERIAL", &material());
        let params = header.strip_prefix(AUTH_SCHEME).unwrap().trim_start();

        let keys: Vec<&str> = params
            .split(',')
            .map(|pair| pair.split_once('=').unwrap().0)
            .collect();
        assert_eq!(
            keys,
            vec!["mchid", "nonce_str", "timestamp", "serial_no", "signature"]
        );

        for pair in params.split(',') {
            let (_, value) = pair.split_once('=').unwrap();
            assert!(value.starts_with('"') && value.ends_with('"'));
        }
    }

    #[test]
    fn test_build_request_headers() {
        let headers = build_request_headers("1900009191", "MERCHANT", "PLATFORM", &material());

        assert_eq!(headers.len(), 4);
        assert_eq!(headers[0].0, AUTHORIZATION);
        assert!(headers[0].1.starts_with(AUTH_SCHEME));
        assert!(headers[0].1.contains("serial_no=\"MERCHANT\""));
        assert!(headers
            .iter()
            .any(|(name, value)| name == CONTENT_TYPE && value == APPLICATION_JSON));
        assert!(headers
            .iter()
            .any(|(name, value)| name == ACCEPT && value == APPLICATION_JSON));
        assert!(headers
            .iter()
            .any(|(name, value)| name.as_str() == "wechatpay-serial" && value == "PLATFORM"));
    }
}
