use super::OtaStatus;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::fmt;

/// Addressing mode of the ethernet interface, as stored on the device
#[derive(Clone, Copy, Debug, Default, Deserialize_repr, PartialEq, Eq, Serialize_repr)]
#[repr(u8)]
pub enum EthIpMode {
    #[default]
    Dhcp = 1,
    Static = 2,
}

impl fmt::Display for EthIpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EthIpMode::Dhcp => write!(f, "DHCP"),
            EthIpMode::Static => write!(f, "Static"),
        }
    }
}

/// Response body of `/ethConfig.json`
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub struct EthConfig {
    pub mode: EthIpMode,
    pub ip: String,
    pub subnet: String,
    pub gateway: String,
    pub mac: String,
    #[serde(default)]
    pub dns: String,
}

/// Response body of `/apSSID.json`
#[derive(Debug, Deserialize)]
pub struct ApSsid {
    pub ssid: String,
}

/// Response body of `/localTime.json`
#[derive(Debug, Deserialize)]
pub struct LocalTime {
    pub time: String,
}

/// Firmware build stamp reported alongside the OTA status
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FirmwareBuild {
    pub compile_date: String,
    pub compile_time: String,
}

impl From<OtaStatus> for FirmwareBuild {
    fn from(status: OtaStatus) -> Self {
        Self {
            compile_date: status.compile_date,
            compile_time: status.compile_time,
        }
    }
}

impl fmt::Display for FirmwareBuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.compile_date, self.compile_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eth_config_mode_is_numeric() {
        let config: EthConfig = serde_json::from_str(
            r#"{"mode":2,"ip":"192.168.0.10","subnet":"255.255.255.0","gateway":"192.168.0.1","mac":"00:11:22:33:44:55","dns":"8.8.8.8"}"#,
        )
        .unwrap();

        assert_eq!(config.mode, EthIpMode::Static);
        assert_eq!(config.dns, "8.8.8.8");
    }

    #[test]
    fn eth_config_defaults_when_device_has_no_config() {
        let config: EthConfig = serde_json::from_str(
            r#"{"mode":1,"ip":"","subnet":"","gateway":"","mac":""}"#,
        )
        .unwrap();

        assert_eq!(config.mode, EthIpMode::Dhcp);
        assert!(config.dns.is_empty());
    }

    #[test]
    fn build_stamp_comes_from_ota_status() {
        let status: OtaStatus = serde_json::from_str(
            r#"{"ota_update_status":0,"compile_time":"08:15:00","compile_date":"Mar  1 2025"}"#,
        )
        .unwrap();

        assert_eq!(
            FirmwareBuild::from(status).to_string(),
            "Mar  1 2025 - 08:15:00"
        );
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(
            serde_json::from_str::<EthConfig>(
                r#"{"mode":7,"ip":"","subnet":"","gateway":"","mac":""}"#
            )
            .is_err()
        );
    }
}
