//! AgriShield Device API Client
//!
//! Hand-written client for the device REST surface (`/health`, `/ping`,
//! `/status`, `/data/log`, `/config`).

pub mod contract;
mod device;
mod types;

pub use contract::EndpointContract;
pub use device::{DEFAULT_REQUEST_TIMEOUT, DeviceClient, DeviceError, DeviceResult};
pub use types::*;
