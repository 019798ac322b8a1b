use super::WorkflowKind;
use serde::Deserialize;

/// Wifi join status as reported by `/wifiConnectStatus`
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(from = "i32")]
pub enum WifiConnectStatus {
    Idle,
    Connecting,
    Failed,
    Connected,
    Unknown(i32),
}

impl From<i32> for WifiConnectStatus {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::Idle,
            1 => Self::Connecting,
            2 => Self::Failed,
            3 => Self::Connected,
            other => Self::Unknown(other),
        }
    }
}

/// Ethernet join status as reported by `/ethConnectStatus`
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(from = "i32")]
pub enum EthConnectStatus {
    Idle,
    Connecting,
    Failed,
    Connected,
    Disconnected,
    Unknown(i32),
}

impl From<i32> for EthConnectStatus {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::Idle,
            1 => Self::Connecting,
            2 => Self::Failed,
            3 => Self::Connected,
            4 => Self::Disconnected,
            other => Self::Unknown(other),
        }
    }
}

/// Firmware update status as reported by `/OTAstatus`
///
/// `Pending` is informational only: the device answers it whenever no
/// flashing result is available yet.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(from = "i32")]
pub enum OtaUpdateStatus {
    Pending,
    Successful,
    Failed,
    Unknown(i32),
}

impl From<i32> for OtaUpdateStatus {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::Pending,
            1 => Self::Successful,
            -1 => Self::Failed,
            other => Self::Unknown(other),
        }
    }
}

/// A status reading tagged with the workflow it belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceStatus {
    Wireless(WifiConnectStatus),
    Wired(EthConnectStatus),
    Firmware(OtaUpdateStatus),
}

impl DeviceStatus {
    /// Interpret a raw code in the context of one workflow
    ///
    /// The same integer means different things for different workflows, so
    /// the kind has to be known before the code can be read.
    pub fn from_code(kind: WorkflowKind, code: i32) -> Self {
        match kind {
            WorkflowKind::WirelessJoin => Self::Wireless(code.into()),
            WorkflowKind::WiredJoin => Self::Wired(code.into()),
            WorkflowKind::FirmwareUpdate => Self::Firmware(code.into()),
        }
    }

    pub fn kind(&self) -> WorkflowKind {
        match self {
            Self::Wireless(_) => WorkflowKind::WirelessJoin,
            Self::Wired(_) => WorkflowKind::WiredJoin,
            Self::Firmware(_) => WorkflowKind::FirmwareUpdate,
        }
    }
}

/// Response body of `/wifiConnectStatus`
#[derive(Debug, Deserialize)]
pub struct WifiStatusResponse {
    pub wifi_connect_status: WifiConnectStatus,
}

/// Response body of `/ethConnectStatus`
#[derive(Debug, Deserialize)]
pub struct EthStatusResponse {
    pub eth_connect_status: EthConnectStatus,
}

/// Response body of `/OTAstatus`
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct OtaStatus {
    pub ota_update_status: OtaUpdateStatus,
    #[serde(default)]
    pub compile_date: String,
    #[serde(default)]
    pub compile_time: String,
}
