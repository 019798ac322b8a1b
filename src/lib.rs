pub mod config;
pub mod device_client;
pub mod error;
pub mod http_client;
pub mod types;
pub mod workflow;

pub use device_client::{DeviceClient, EspDeviceClient};
pub use error::{ValidationError, WorkflowError};
pub use workflow::{WorkflowController, WorkflowEvent, WorkflowParams};
