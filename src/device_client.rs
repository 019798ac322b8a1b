#![cfg_attr(feature = "mock", allow(dead_code, unused_imports))]

use crate::{
    config::{AppConfig, DeviceConfig},
    http_client::{device_http_client, handle_http_response},
    types::{
        ApSsid, ConnectionInfo, EthConfig, EthConnectInfo, EthConnectStatus, EthStatusResponse,
        LocalTime, OtaStatus, WifiConnectInfo, WifiConnectStatus, WifiStatusResponse,
    },
    workflow::{EthSettings, FirmwareImage, UploadProgress, WifiCredentials},
};
use anyhow::{Context, Result, bail};
use futures_util::{StreamExt, stream};
use log::info;
#[cfg(feature = "mock")]
use mockall::automock;
use reqwest::{
    Body, Client, RequestBuilder,
    multipart::{Form, Part},
};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use trait_variant::make;

/// HTTP/JSON surface of the device
#[make(Send)]
#[cfg_attr(feature = "mock", automock)]
pub trait DeviceClient {
    async fn connect_wifi(&self, credentials: WifiCredentials) -> Result<()>;
    async fn wifi_connect_status(&self) -> Result<WifiConnectStatus>;
    async fn wifi_connect_info(&self) -> Result<ConnectionInfo>;
    async fn disconnect_wifi(&self) -> Result<()>;
    async fn connect_eth(&self, settings: EthSettings) -> Result<()>;
    async fn eth_connect_status(&self) -> Result<EthConnectStatus>;
    async fn eth_connect_info(&self) -> Result<ConnectionInfo>;
    async fn disconnect_eth(&self) -> Result<()>;
    async fn eth_config(&self) -> Result<EthConfig>;
    /// Upload a firmware image, reporting every chunk handed to the transport
    async fn upload_firmware(
        &self,
        image: FirmwareImage,
        progress: mpsc::UnboundedSender<UploadProgress>,
    ) -> Result<()>;
    async fn ota_status(&self) -> Result<OtaStatus>;
    async fn ap_ssid(&self) -> Result<String>;
    async fn local_time(&self) -> Result<String>;
}

#[derive(Clone)]
pub struct EspDeviceClient {
    client: Client,
    base_url: String,
}

impl EspDeviceClient {
    // API endpoint constants
    const WIFI_CONNECT_ENDPOINT: &str = "/wifiConnect.json";
    const WIFI_STATUS_ENDPOINT: &str = "/wifiConnectStatus";
    const WIFI_INFO_ENDPOINT: &str = "/wifiConnectInfo.json";
    const WIFI_DISCONNECT_ENDPOINT: &str = "/wifiDisconnect.json";
    const ETH_CONNECT_ENDPOINT: &str = "/ethConnect.json";
    const ETH_STATUS_ENDPOINT: &str = "/ethConnectStatus";
    const ETH_INFO_ENDPOINT: &str = "/ethConnectInfo.json";
    const ETH_CONFIG_ENDPOINT: &str = "/ethConfig.json";
    const ETH_DISCONNECT_ENDPOINT: &str = "/ethDisconnect.json";
    const OTA_UPDATE_ENDPOINT: &str = "/OTAupdate";
    const OTA_STATUS_ENDPOINT: &str = "/OTAstatus";
    const AP_SSID_ENDPOINT: &str = "/apSSID.json";
    const LOCAL_TIME_ENDPOINT: &str = "/localTime.json";

    // the device's http server reads uploads in small blocks
    const UPLOAD_CHUNK_SIZE: usize = 4096;

    pub fn new() -> Result<Self> {
        Self::with_config(&AppConfig::get().device)
    }

    pub fn with_config(config: &DeviceConfig) -> Result<Self> {
        Ok(EspDeviceClient {
            client: device_http_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_url(&self, path: &str) -> String {
        // Normalize path to always start with a single "/"
        let normalized_path = path.trim_start_matches('/');
        format!("{}/{normalized_path}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder, context_msg: &str) -> Result<String> {
        let res = request
            .send()
            .await
            .context(format!("failed to send {context_msg} request"))?;

        handle_http_response(res, context_msg).await
    }

    /// GET request to the device API
    async fn get(&self, path: &str) -> Result<String> {
        let url = self.build_url(path);
        info!("GET {url}");

        self.send(self.client.get(&url), &format!("GET {url}")).await
    }

    /// POST request to the device API with a plain text body
    ///
    /// The status endpoints expect the name of the value they report.
    async fn post_marker(&self, path: &str, marker: &'static str) -> Result<String> {
        let url = self.build_url(path);
        info!("POST {url}");

        self.send(self.client.post(&url).body(marker), &format!("POST {url}"))
            .await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let body = self.get(path).await?;
        serde_json::from_str(&body).context(format!("failed to parse {what}"))
    }
}

impl DeviceClient for EspDeviceClient {
    async fn connect_wifi(&self, credentials: WifiCredentials) -> Result<()> {
        let url = self.build_url(Self::WIFI_CONNECT_ENDPOINT);
        info!("POST {url} for ssid {}", credentials.ssid());

        let request = self
            .client
            .post(&url)
            .header("my-connect-ssid", credentials.ssid())
            .header("my-connect-pwd", credentials.password());

        self.send(request, &format!("POST {url}")).await?;
        Ok(())
    }

    async fn wifi_connect_status(&self) -> Result<WifiConnectStatus> {
        let body = self
            .post_marker(Self::WIFI_STATUS_ENDPOINT, "wifi_connect_status")
            .await?;

        let status: WifiStatusResponse =
            serde_json::from_str(&body).context("failed to parse wifi connect status")?;

        Ok(status.wifi_connect_status)
    }

    async fn wifi_connect_info(&self) -> Result<ConnectionInfo> {
        let info: WifiConnectInfo = self
            .get_json(Self::WIFI_INFO_ENDPOINT, "wifi connect info")
            .await?;

        Ok(info.into())
    }

    async fn disconnect_wifi(&self) -> Result<()> {
        let url = self.build_url(Self::WIFI_DISCONNECT_ENDPOINT);
        info!("DELETE {url}");

        // cache buster, the device ignores the value
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        let request = self
            .client
            .delete(&url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(format!("timestamp={timestamp}"));

        self.send(request, &format!("DELETE {url}")).await?;
        Ok(())
    }

    async fn connect_eth(&self, settings: EthSettings) -> Result<()> {
        let url = self.build_url(Self::ETH_CONNECT_ENDPOINT);
        info!("POST {url} with ip mode {}", settings.mode());

        let mut request = self
            .client
            .post(&url)
            .header("ip-mode", settings.mode().to_string());

        if let EthSettings::Static(config) = &settings {
            request = request
                .header("static-ip", config.ip())
                .header("static-subnet", config.subnet())
                .header("static-gateway", config.gateway());

            if let Some(dns) = config.dns() {
                request = request.header("static-dns", dns);
            }
        }

        self.send(request, &format!("POST {url}")).await?;
        Ok(())
    }

    async fn eth_connect_status(&self) -> Result<EthConnectStatus> {
        let url = self.build_url(Self::ETH_STATUS_ENDPOINT);
        info!("POST {url}");

        let body = self
            .send(self.client.post(&url), &format!("POST {url}"))
            .await?;

        let status: EthStatusResponse =
            serde_json::from_str(&body).context("failed to parse ethernet connect status")?;

        Ok(status.eth_connect_status)
    }

    async fn eth_connect_info(&self) -> Result<ConnectionInfo> {
        let body = self.get(Self::ETH_INFO_ENDPOINT).await?;

        if body.trim().is_empty() {
            bail!("failed to get ethernet connect info: interface is not connected");
        }

        let info: EthConnectInfo =
            serde_json::from_str(&body).context("failed to parse ethernet connect info")?;

        Ok(info.into())
    }

    async fn disconnect_eth(&self) -> Result<()> {
        let url = self.build_url(Self::ETH_DISCONNECT_ENDPOINT);
        info!("DELETE {url}");

        self.send(self.client.delete(&url), &format!("DELETE {url}"))
            .await?;
        Ok(())
    }

    async fn eth_config(&self) -> Result<EthConfig> {
        self.get_json(Self::ETH_CONFIG_ENDPOINT, "ethernet config")
            .await
    }

    async fn upload_firmware(
        &self,
        image: FirmwareImage,
        progress: mpsc::UnboundedSender<UploadProgress>,
    ) -> Result<()> {
        let url = self.build_url(Self::OTA_UPDATE_ENDPOINT);
        let total = image.len();
        info!("POST {url} with {} ({total} bytes)", image.file_name);

        let FirmwareImage { file_name, data } = image;
        let chunks: Vec<Vec<u8>> = data
            .chunks(Self::UPLOAD_CHUNK_SIZE)
            .map(<[u8]>::to_vec)
            .collect();

        let mut sent = 0;
        let body = stream::iter(chunks).map(move |chunk| {
            sent += chunk.len() as u64;
            // nobody listening is fine, the upload goes on
            let _ = progress.send(UploadProgress { sent, total });
            Ok::<_, std::io::Error>(chunk)
        });

        let part = Part::stream_with_length(Body::wrap_stream(body), total)
            .file_name(file_name)
            .mime_str("application/octet-stream")
            .context("failed to build firmware upload part")?;

        let request = self
            .client
            .post(&url)
            .multipart(Form::new().part("file", part));

        self.send(request, &format!("POST {url}")).await?;
        Ok(())
    }

    async fn ota_status(&self) -> Result<OtaStatus> {
        let body = self
            .post_marker(Self::OTA_STATUS_ENDPOINT, "ota_update_status")
            .await?;

        serde_json::from_str(&body).context("failed to parse ota update status")
    }

    async fn ap_ssid(&self) -> Result<String> {
        let ap: ApSsid = self
            .get_json(Self::AP_SSID_ENDPOINT, "access point ssid")
            .await?;

        Ok(ap.ssid)
    }

    async fn local_time(&self) -> Result<String> {
        let time: LocalTime = self
            .get_json(Self::LOCAL_TIME_ENDPOINT, "local time")
            .await?;

        Ok(time.time)
    }
}
