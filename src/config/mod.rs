//! Configuration parsing
//!
//! Handles parsing of the harness configuration file and check options.
//! Every field is optional; an empty file targets the device's own access
//! point at `http://192.168.4.1`.
//!
//! ## Configuration Format
//!
//! ```yaml
//! target:
//!   name: north-field
//!   base_url: http://192.168.4.1
//!   request_timeout: 5s
//!
//! monitor:
//!   duration: 30s
//!   interval: 2s
//!
//! checks:
//!   datalog:
//!     enabled: true
//!   config-roundtrip:
//!     timeout: 1m
//!     settle_delay_ms: 1000
//! ```

mod target;

pub use target::{
    CheckConfig, Config, ConfigError, DEFAULT_BASE_URL, MonitorConfig, TargetConfig,
};
