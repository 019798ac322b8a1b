//! Domain-based type organization
//!
//! - connection: address information reported after a successful join
//! - device: read-only device queries (ethernet config, AP name, clock, build)
//! - status: per-workflow device status codes, converted on receipt

pub mod connection;
pub mod device;
pub mod status;

pub use connection::*;
pub use device::*;
pub use status::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three independent workflows the client drives on the device
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowKind {
    WirelessJoin,
    WiredJoin,
    FirmwareUpdate,
}

impl WorkflowKind {
    pub const ALL: [WorkflowKind; 3] = [
        WorkflowKind::WirelessJoin,
        WorkflowKind::WiredJoin,
        WorkflowKind::FirmwareUpdate,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            WorkflowKind::WirelessJoin => 0,
            WorkflowKind::WiredJoin => 1,
            WorkflowKind::FirmwareUpdate => 2,
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowKind::WirelessJoin => write!(f, "wifi join"),
            WorkflowKind::WiredJoin => write!(f, "ethernet join"),
            WorkflowKind::FirmwareUpdate => write!(f, "firmware update"),
        }
    }
}
