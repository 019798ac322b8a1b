//! Workflow orchestration
//!
//! - trigger: input validation and start requests
//! - poller: per-workflow timer bookkeeping
//! - interpreter: status code classification and labels
//! - completion: terminal handling and the reboot countdown
//! - controller: the engine task and its public handle

pub mod completion;
pub mod controller;
pub mod events;
pub mod interpreter;
pub mod poller;
pub mod scheduler;
pub mod trigger;

pub use completion::{CountdownStep, RebootCountdown};
pub use controller::WorkflowController;
pub use events::{FailureReason, Outcome, WorkflowEvent};
pub use interpreter::{Classification, classify};
pub use trigger::{
    Accepted, EthSettings, FirmwareImage, IpMode, StartRequest, StaticIpConfig, UploadProgress,
    WifiCredentials, WiredParams, WorkflowParams, is_valid_ipv4,
};
