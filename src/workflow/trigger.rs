//! Workflow trigger: user input validation and the validated start requests
//!
//! Nothing in here touches the network. A [`StartRequest`] can only be built
//! from [`WorkflowParams::validate`], so the engine never sees unchecked input.

use crate::{error::ValidationError, types::WorkflowKind};
use anyhow::{Context, Result};
use std::{fmt, path::Path};

/// Maximum SSID length accepted by the device (IEEE 802.11)
pub const MAX_SSID_LEN: usize = 32;
/// Maximum passphrase length accepted by the device (IEEE 802.11)
pub const MAX_PASSWORD_LEN: usize = 64;

/// Raw user input for one workflow
#[derive(Clone, Debug)]
pub enum WorkflowParams {
    WirelessJoin { ssid: String, password: String },
    WiredJoin(WiredParams),
    FirmwareUpdate { files: Vec<FirmwareImage> },
}

/// A start request that passed validation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StartRequest {
    WirelessJoin(WifiCredentials),
    WiredJoin(EthSettings),
    FirmwareUpdate(FirmwareImage),
}

/// Returned once a start request was handed to the workflow engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Accepted {
    pub kind: WorkflowKind,
}

impl WorkflowParams {
    pub fn kind(&self) -> WorkflowKind {
        match self {
            Self::WirelessJoin { .. } => WorkflowKind::WirelessJoin,
            Self::WiredJoin(_) => WorkflowKind::WiredJoin,
            Self::FirmwareUpdate { .. } => WorkflowKind::FirmwareUpdate,
        }
    }

    pub fn validate(self) -> Result<StartRequest, ValidationError> {
        match self {
            Self::WirelessJoin { ssid, password } => {
                WifiCredentials::new(&ssid, &password).map(StartRequest::WirelessJoin)
            }
            Self::WiredJoin(params) => params.validate().map(StartRequest::WiredJoin),
            Self::FirmwareUpdate { files } => {
                FirmwareImage::single(files).map(StartRequest::FirmwareUpdate)
            }
        }
    }
}

impl StartRequest {
    pub fn kind(&self) -> WorkflowKind {
        match self {
            Self::WirelessJoin(_) => WorkflowKind::WirelessJoin,
            Self::WiredJoin(_) => WorkflowKind::WiredJoin,
            Self::FirmwareUpdate(_) => WorkflowKind::FirmwareUpdate,
        }
    }
}

/// Wifi credentials, truncated to what the device can store
#[derive(Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    ssid: String,
    password: String,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, ValidationError> {
        let mut error = ValidationError::default();

        if ssid.is_empty() {
            error.push("SSID cannot be empty");
        }

        if password.is_empty() {
            error.push("Password cannot be empty");
        }

        error.into_result(Self {
            ssid: truncate_bytes(ssid, MAX_SSID_LEN),
            password: truncate_bytes(password, MAX_PASSWORD_LEN),
        })
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for WifiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("ssid", &self.ssid)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IpMode {
    #[default]
    Dhcp,
    Static,
}

impl fmt::Display for IpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpMode::Dhcp => write!(f, "dhcp"),
            IpMode::Static => write!(f, "static"),
        }
    }
}

/// Raw ethernet form input; the address fields only matter in static mode
#[derive(Clone, Debug, Default)]
pub struct WiredParams {
    pub mode: IpMode,
    pub ip: String,
    pub subnet: String,
    pub gateway: String,
    pub dns: Option<String>,
}

impl WiredParams {
    pub fn dhcp() -> Self {
        Self::default()
    }

    pub fn static_ip(ip: &str, subnet: &str, gateway: &str) -> Self {
        Self {
            mode: IpMode::Static,
            ip: ip.to_string(),
            subnet: subnet.to_string(),
            gateway: gateway.to_string(),
            dns: None,
        }
    }

    pub fn with_dns(mut self, dns: &str) -> Self {
        self.dns = Some(dns.to_string());
        self
    }

    pub fn validate(self) -> Result<EthSettings, ValidationError> {
        if self.mode == IpMode::Dhcp {
            return Ok(EthSettings::Dhcp);
        }

        let mut error = ValidationError::default();

        for (label, value) in [
            ("static IP address", &self.ip),
            ("subnet mask", &self.subnet),
            ("gateway address", &self.gateway),
        ] {
            if !is_valid_ipv4(value) {
                error.push(format!("Invalid {label}: '{value}'"));
            }
        }

        let dns = self.dns.filter(|dns| !dns.is_empty());
        if let Some(dns) = &dns {
            if !is_valid_ipv4(dns) {
                error.push(format!("Invalid DNS server address: '{dns}'"));
            }
        }

        error.into_result(EthSettings::Static(StaticIpConfig {
            ip: self.ip,
            subnet: self.subnet,
            gateway: self.gateway,
            dns,
        }))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EthSettings {
    Dhcp,
    Static(StaticIpConfig),
}

impl EthSettings {
    pub fn mode(&self) -> IpMode {
        match self {
            EthSettings::Dhcp => IpMode::Dhcp,
            EthSettings::Static(_) => IpMode::Static,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticIpConfig {
    ip: String,
    subnet: String,
    gateway: String,
    dns: Option<String>,
}

impl StaticIpConfig {
    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn subnet(&self) -> &str {
        &self.subnet
    }

    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    pub fn dns(&self) -> Option<&str> {
        self.dns.as_deref()
    }
}

/// A firmware file picked by the user; the content is opaque to the client
#[derive(Clone, PartialEq, Eq)]
pub struct FirmwareImage {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl FirmwareImage {
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            data,
        }
    }

    /// Read a firmware file from disk
    pub async fn from_path(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path)
            .await
            .context(format!("failed to read firmware file {path:?}"))?;

        let file_name = path
            .file_name()
            .context(format!("failed to get file name of {path:?}"))?
            .to_string_lossy()
            .into_owned();

        Ok(Self { file_name, data })
    }

    fn single(mut files: Vec<FirmwareImage>) -> Result<Self, ValidationError> {
        let mut error = ValidationError::default();

        match files.len() {
            1 => return Ok(files.remove(0)),
            0 => error.push("Select a file first"),
            n => error.push(format!("Select exactly one file, {n} were selected")),
        }

        Err(error)
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for FirmwareImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirmwareImage")
            .field("file_name", &self.file_name)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Bytes of the firmware image handed to the transport so far
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadProgress {
    pub sent: u64,
    pub total: u64,
}

/// Validate IPv4 address format: four dot-separated decimal octets, each 0-255
pub fn is_valid_ipv4(ip: &str) -> bool {
    let parts: Vec<&str> = ip.split('.').collect();
    if parts.len() != 4 {
        return false;
    }

    parts.iter().all(|part| {
        (1..=3).contains(&part.len())
            && part.bytes().all(|b| b.is_ascii_digit())
            && part.parse::<u16>().is_ok_and(|num| num <= 255)
    })
}

fn truncate_bytes(value: &str, max: usize) -> String {
    if value.len() <= max {
        return value.to_string();
    }

    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }

    value[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    mod wifi_credentials {
        use super::*;

        #[test]
        fn long_ssid_is_truncated_to_device_maximum() {
            let credentials = WifiCredentials::new(&"A".repeat(40), "secret").unwrap();
            assert_eq!(credentials.ssid().len(), 32);
            assert_eq!(credentials.ssid(), "A".repeat(32));
        }

        #[test]
        fn long_password_is_truncated_to_device_maximum() {
            let credentials = WifiCredentials::new("home", &"p".repeat(100)).unwrap();
            assert_eq!(credentials.password().len(), 64);
        }

        #[test]
        fn truncation_keeps_utf8_boundaries() {
            // 16 two-byte characters plus one more: byte 32 splits nothing, byte 33 would
            let ssid = "ä".repeat(17);
            let credentials = WifiCredentials::new(&ssid, "secret").unwrap();
            assert_eq!(credentials.ssid(), "ä".repeat(16));

            let ssid = format!("a{}", "ä".repeat(20));
            let credentials = WifiCredentials::new(&ssid, "secret").unwrap();
            assert_eq!(credentials.ssid().len(), 31);
        }

        #[test]
        fn empty_password_is_rejected() {
            let error = WifiCredentials::new("home", "").unwrap_err();
            assert_eq!(error.problems, vec!["Password cannot be empty".to_string()]);
        }

        #[test]
        fn all_problems_are_reported() {
            let error = WifiCredentials::new("", "").unwrap_err();
            assert_eq!(error.problems.len(), 2);
            assert!(error.problems[0].contains("SSID"));
            assert!(error.problems[1].contains("Password"));
        }

        #[test]
        fn debug_output_hides_password() {
            let credentials = WifiCredentials::new("home", "hunter2").unwrap();
            assert!(!format!("{credentials:?}").contains("hunter2"));
        }
    }

    mod ipv4 {
        use super::*;

        #[test]
        fn accepts_dotted_quads() {
            assert!(is_valid_ipv4("192.168.1.1"));
            assert!(is_valid_ipv4("0.0.0.0"));
            assert!(is_valid_ipv4("255.255.255.255"));
            assert!(is_valid_ipv4("010.001.0.1"));
        }

        #[test]
        fn rejects_out_of_range_octets() {
            assert!(!is_valid_ipv4("256.0.0.1"));
            assert!(!is_valid_ipv4("1.2.3.999"));
        }

        #[test]
        fn rejects_wrong_segment_count() {
            assert!(!is_valid_ipv4("10.0.0"));
            assert!(!is_valid_ipv4("10.0.0.1.5"));
            assert!(!is_valid_ipv4(""));
        }

        #[test]
        fn rejects_non_digits() {
            assert!(!is_valid_ipv4("10.0.0.a"));
            assert!(!is_valid_ipv4("10.0.+1.1"));
            assert!(!is_valid_ipv4("10..0.1"));
            assert!(!is_valid_ipv4(" 10.0.0.1"));
            assert!(!is_valid_ipv4("1000.0.0.1"));
        }
    }

    mod wired_params {
        use super::*;

        #[test]
        fn dhcp_needs_no_addresses() {
            let params = WiredParams {
                ip: "garbage".to_string(),
                ..WiredParams::dhcp()
            };
            assert_eq!(params.validate(), Ok(EthSettings::Dhcp));
        }

        #[test]
        fn static_requires_all_three_addresses() {
            let error = WiredParams::static_ip("192.168.1.20", "255.255.255", "")
                .validate()
                .unwrap_err();

            assert_eq!(error.problems.len(), 2);
            assert!(error.problems[0].contains("subnet mask"));
            assert!(error.problems[1].contains("gateway"));
        }

        #[test]
        fn static_with_valid_addresses_passes() {
            let settings = WiredParams::static_ip("192.168.1.20", "255.255.255.0", "192.168.1.1")
                .with_dns("1.1.1.1")
                .validate()
                .unwrap();

            let EthSettings::Static(config) = settings else {
                panic!("expected static settings");
            };
            assert_eq!(config.ip(), "192.168.1.20");
            assert_eq!(config.dns(), Some("1.1.1.1"));
        }

        #[test]
        fn empty_dns_is_ignored_but_invalid_dns_is_not() {
            let settings = WiredParams::static_ip("10.0.0.2", "255.0.0.0", "10.0.0.1")
                .with_dns("")
                .validate()
                .unwrap();
            assert!(matches!(settings, EthSettings::Static(ref c) if c.dns().is_none()));

            let error = WiredParams::static_ip("10.0.0.2", "255.0.0.0", "10.0.0.1")
                .with_dns("8.8.8")
                .validate()
                .unwrap_err();
            assert!(error.problems[0].contains("DNS"));
        }
    }

    mod firmware_selection {
        use super::*;

        #[test]
        fn exactly_one_file_is_required() {
            let error = WorkflowParams::FirmwareUpdate { files: vec![] }
                .validate()
                .unwrap_err();
            assert_eq!(error.problems, vec!["Select a file first".to_string()]);

            let image = FirmwareImage::new("fw.bin", vec![1, 2, 3]);
            let error = WorkflowParams::FirmwareUpdate {
                files: vec![image.clone(), image.clone()],
            }
            .validate()
            .unwrap_err();
            assert!(error.problems[0].contains("exactly one"));

            let request = WorkflowParams::FirmwareUpdate {
                files: vec![image.clone()],
            }
            .validate()
            .unwrap();
            assert_eq!(request, StartRequest::FirmwareUpdate(image));
        }

        #[tokio::test]
        async fn reads_image_from_disk() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("firmware.bin");
            std::fs::write(&path, [0xE9, 0x00, 0x01]).unwrap();

            let image = FirmwareImage::from_path(&path).await.unwrap();
            assert_eq!(image.file_name, "firmware.bin");
            assert_eq!(image.len(), 3);
        }

        #[tokio::test]
        async fn missing_file_is_an_error() {
            let result = FirmwareImage::from_path(Path::new("/nonexistent/firmware.bin")).await;
            assert!(result.is_err());
        }
    }

    #[test]
    fn params_report_their_kind() {
        assert_eq!(
            WorkflowParams::WiredJoin(WiredParams::dhcp()).kind(),
            WorkflowKind::WiredJoin
        );
        assert_eq!(
            WorkflowParams::WirelessJoin {
                ssid: "a".to_string(),
                password: "b".to_string()
            }
            .kind(),
            WorkflowKind::WirelessJoin
        );
    }
}
