use crate::types::{ConnectionInfo, WorkflowKind};
use std::fmt;

/// Everything the presentation layer gets to see about running workflows
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkflowEvent {
    StatusChanged {
        kind: WorkflowKind,
        label: String,
    },
    WorkflowCompleted {
        kind: WorkflowKind,
        outcome: Outcome,
    },
    /// Bytes of the firmware image sent so far
    UploadProgress { sent: u64, total: u64 },
    /// The reboot countdown after a firmware update ran out
    ReloadRequested,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success { info: Option<ConnectionInfo> },
    Failure { reason: FailureReason },
    /// The wired link went down; terminal but not an error
    Disconnected,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// A start request or upload could not be delivered; carries the raw error
    Transport(String),
    /// The device reported a terminal failure code; carries its label
    DeviceReported(String),
}

impl WorkflowEvent {
    pub fn status(kind: WorkflowKind, label: impl Into<String>) -> Self {
        Self::StatusChanged {
            kind,
            label: label.into(),
        }
    }

    pub fn completed(kind: WorkflowKind, outcome: Outcome) -> Self {
        Self::WorkflowCompleted { kind, outcome }
    }

    pub fn kind(&self) -> Option<WorkflowKind> {
        match self {
            Self::StatusChanged { kind, .. } | Self::WorkflowCompleted { kind, .. } => Some(*kind),
            Self::UploadProgress { .. } => Some(WorkflowKind::FirmwareUpdate),
            Self::ReloadRequested => None,
        }
    }
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Transport(error) => write!(f, "{error}"),
            FailureReason::DeviceReported(label) => write!(f, "{label}"),
        }
    }
}

impl fmt::Display for WorkflowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StatusChanged { kind, label } => write!(f, "[{kind}] {label}"),
            Self::WorkflowCompleted { kind, outcome } => match outcome {
                Outcome::Success { info: Some(info) } => write!(
                    f,
                    "[{kind}] completed ({}): address {} netmask {} gateway {}",
                    info.label, info.address, info.subnet_mask, info.gateway
                ),
                Outcome::Success { info: None } => write!(f, "[{kind}] completed"),
                Outcome::Failure { reason } => write!(f, "[{kind}] failed: {reason}"),
                Outcome::Disconnected => write!(f, "[{kind}] disconnected"),
            },
            Self::UploadProgress { sent, total } => {
                write!(f, "[{}] uploaded {sent}/{total} bytes", WorkflowKind::FirmwareUpdate)
            }
            Self::ReloadRequested => write!(f, "reload requested"),
        }
    }
}
