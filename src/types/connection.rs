use serde::{Deserialize, Serialize};

/// Address information the device reports after a successful join
///
/// Read once per successful workflow and replaced wholesale on the next one.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub address: String,
    pub subnet_mask: String,
    pub gateway: String,
    /// Access point name for wifi, addressing mode for ethernet
    pub label: String,
}

/// Response body of `/wifiConnectInfo.json`
#[derive(Debug, Deserialize)]
pub struct WifiConnectInfo {
    pub ap: String,
    pub ip: String,
    pub netmask: String,
    pub gw: String,
}

impl From<WifiConnectInfo> for ConnectionInfo {
    fn from(info: WifiConnectInfo) -> Self {
        Self {
            address: info.ip,
            subnet_mask: info.netmask,
            gateway: info.gw,
            label: info.ap,
        }
    }
}

/// Response body of `/ethConnectInfo.json`
#[derive(Debug, Deserialize)]
pub struct EthConnectInfo {
    pub ip: String,
    pub netmask: String,
    pub gw: String,
    pub mode: String,
    #[serde(default)]
    pub mac: Option<String>,
}

impl From<EthConnectInfo> for ConnectionInfo {
    fn from(info: EthConnectInfo) -> Self {
        Self {
            address: info.ip,
            subnet_mask: info.netmask,
            gateway: info.gw,
            label: info.mode,
        }
    }
}
