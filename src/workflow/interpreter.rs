//! Maps device status readings to a workflow decision and a display label

use crate::types::{
    DeviceStatus, EthConnectStatus, OtaUpdateStatus, WifiConnectStatus, WorkflowKind,
};

/// What a single status reading means for its workflow
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    Continue,
    Success,
    Failure,
    /// Terminal without being an error (wired link lost)
    Disconnected,
}

impl Classification {
    pub fn is_terminal(self) -> bool {
        self != Classification::Continue
    }
}

/// Classify a raw status code in the context of its workflow
///
/// Codes a workflow does not know are treated as `Continue`.
pub fn classify(kind: WorkflowKind, code: i32) -> Classification {
    DeviceStatus::from_code(kind, code).classification()
}

impl DeviceStatus {
    pub fn classification(&self) -> Classification {
        match self {
            DeviceStatus::Wireless(status) => match status {
                WifiConnectStatus::Connected => Classification::Success,
                WifiConnectStatus::Failed => Classification::Failure,
                WifiConnectStatus::Idle
                | WifiConnectStatus::Connecting
                | WifiConnectStatus::Unknown(_) => Classification::Continue,
            },
            DeviceStatus::Wired(status) => match status {
                EthConnectStatus::Connected => Classification::Success,
                EthConnectStatus::Failed => Classification::Failure,
                EthConnectStatus::Disconnected => Classification::Disconnected,
                EthConnectStatus::Idle
                | EthConnectStatus::Connecting
                | EthConnectStatus::Unknown(_) => Classification::Continue,
            },
            DeviceStatus::Firmware(status) => match status {
                OtaUpdateStatus::Successful => Classification::Success,
                OtaUpdateStatus::Failed => Classification::Failure,
                OtaUpdateStatus::Pending | OtaUpdateStatus::Unknown(_) => {
                    Classification::Continue
                }
            },
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeviceStatus::Wireless(status) => match status {
                WifiConnectStatus::Connected => "Connection success",
                WifiConnectStatus::Failed => {
                    "Failed to connect. Please check your AP credentials and compatibility"
                }
                _ => "Connecting...",
            },
            DeviceStatus::Wired(status) => match status {
                EthConnectStatus::Idle => "Status: Idle",
                EthConnectStatus::Connecting | EthConnectStatus::Unknown(_) => {
                    "Status: Connecting..."
                }
                EthConnectStatus::Failed => "Status: Failed",
                EthConnectStatus::Connected => "Status: Connected",
                EthConnectStatus::Disconnected => "Status: Disconnected",
            },
            DeviceStatus::Firmware(status) => match status {
                OtaUpdateStatus::Successful => "OTA firmware update complete",
                OtaUpdateStatus::Failed => "Upload error",
                OtaUpdateStatus::Pending | OtaUpdateStatus::Unknown(_) => {
                    "Firmware update in progress..."
                }
            },
        }
    }
}
