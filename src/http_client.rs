use crate::config::DeviceConfig;
use anyhow::{Context, Result, ensure};
use reqwest::{Client, Response};

/// Create the HTTP client used to talk to the device
///
/// The device is a small embedded web server. No timeout is applied unless
/// one is configured explicitly, so a hung request simply delays the next
/// poll of that workflow.
///
/// # Arguments
/// * `config` - Device endpoint configuration
///
/// # Examples
/// ```no_run
/// use esp_portal_client::{config::DeviceConfig, http_client::device_http_client};
///
/// let config = DeviceConfig {
///     base_url: "http://192.168.4.1".to_string(),
///     request_timeout: None,
/// };
/// let client = device_http_client(&config).expect("failed to create client");
/// ```
pub fn device_http_client(config: &DeviceConfig) -> Result<Client> {
    ensure!(
        !config.base_url.is_empty(),
        "failed to create device client: base url is empty"
    );

    let mut builder = Client::builder();

    if let Some(timeout) = config.request_timeout {
        builder = builder.timeout(timeout);
    }

    builder.build().context("failed to create device HTTP client")
}

/// Read the device's answer and turn a non-2xx status into an error
///
/// The device firmware answers failures with a short plain-text body, which
/// is kept in the error so a failed join or upload shows the device's reason.
/// `context_msg` names the request, e.g. `"POST /ethConnect.json"`.
pub async fn handle_http_response(res: Response, context_msg: &str) -> Result<String> {
    let status = res.status();
    let body = res.text().await.context("failed to read response body")?;

    ensure!(
        status.is_success(),
        "{context_msg} failed with status {status}: {}",
        body.trim()
    );

    Ok(body)
}
