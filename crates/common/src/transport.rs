//! Blocking HTTPS transport for the merchant API.
//!
//! A single [`ureq::Agent`] is configured with connect, write, and read
//! timeouts. Non-2xx responses are returned as [`HttpResponse`] values so the
//! caller decides what they mean; [`check_status`] turns them into errors.
//! Nothing here retries, and a proxy is only used when `[api] proxy` is set.

use error_stack::Report;
use http::header::HeaderName;
use http::Method;
use ureq::{Agent, Proxy};

use crate::error::TransferError;
use crate::settings::Api;

/// Raw response of a single API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Looks up a header value, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fails with [`TransferError::Status`] for any status outside `[200, 300)`.
///
/// # Errors
///
/// Returns [`TransferError::Status`] carrying the exact response code.
pub fn check_status(response: &HttpResponse) -> Result<(), Report<TransferError>> {
    if response.is_success() {
        return Ok(());
    }

    log::error!(
        "Request failed with HTTP {}: {}",
        response.status,
        response.body
    );
    Err(Report::new(TransferError::Status {
        status: response.status,
    })
    .attach(format!("response body: {}", response.body)))
}

/// 429 and 5xx may be retried by the caller, always with the original
/// `out_bill_no` and an identical body.
#[must_use]
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

pub struct ApiClient {
    agent: Agent,
    host: String,
}

impl ApiClient {
    /// Builds the agent from the `[api]` settings.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Configuration`] if the proxy URI is invalid.
    pub fn new(api: &Api) -> Result<Self, Report<TransferError>> {
        let proxy = api
            .proxy
            .as_deref()
            .map(Proxy::new)
            .transpose()
            .map_err(|e| {
                Report::new(TransferError::Configuration {
                    message: format!("Invalid proxy: {}", e),
                })
            })?;

        let config = Agent::config_builder()
            .timeout_connect(Some(api.connect_timeout()))
            .timeout_send_request(Some(api.write_timeout()))
            .timeout_send_body(Some(api.write_timeout()))
            .timeout_recv_response(Some(api.read_timeout()))
            .timeout_recv_body(Some(api.read_timeout()))
            .http_status_as_error(false)
            .proxy(proxy)
            .build();

        Ok(Self {
            agent: config.into(),
            host: api.host.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    /// Sends one request and returns whatever the server answered.
    ///
    /// `GET` requests are sent without a body; every other method sends
    /// `body` as-is.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Transport`] on connection, TLS, or timeout
    /// failures, or if the response body cannot be read.
    pub fn execute(
        &self,
        method: &Method,
        path: &str,
        headers: &[(HeaderName, String)],
        body: &str,
    ) -> Result<HttpResponse, Report<TransferError>> {
        let url = self.url(path);
        log::info!("{} {}", method, url);

        let result = if *method == Method::GET {
            let mut request = self.agent.get(&url);
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }
            request.call()
        } else if *method == Method::POST {
            let mut request = self.agent.post(&url);
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }
            request.send(body.as_bytes())
        } else {
            return Err(Report::new(TransferError::Transport {
                message: format!("Unsupported method: {}", method),
            }));
        };

        let mut response = result.map_err(|e| {
            Report::new(TransferError::Transport {
                message: format!("Failed to send request to {}: {}", url, e),
            })
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.body_mut().read_to_string().map_err(|e| {
            Report::new(TransferError::Transport {
                message: format!("Failed to read response body: {}", e),
            })
        })?;

        log::info!("{} {} -> HTTP {}", method, url, status);
        log::debug!("Response body: {}", body);

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
