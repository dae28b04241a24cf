//! Check implementations for device conformance testing
//!
//! This module provides the `Check` trait and one implementation per
//! endpoint family, plus the configuration round-trip.
//!
//! ## Checks (in execution order)
//!
//! - **health**: `GET /health` reports OK, uptime and firmware version
//! - **ping**: `GET /ping` acknowledges
//! - **status**: `GET /status` telemetry is complete, alert level in range
//! - **datalog**: `GET /data/log` is readable or absent
//! - **config**: `GET /config` carries the operating parameters
//! - **config-roundtrip**: write / verify / restore of the configuration
//!
//! ## Adding New Checks
//!
//! 1. Create a new file in `src/checks/` (e.g., `mycheck.rs`)
//! 2. Implement the `Check` trait
//! 3. Register in `registry.rs`
//! 4. Add to `mod.rs` exports

mod config;
mod datalog;
mod health;
mod ping;
pub mod registry;
pub mod roundtrip;
mod status;
mod traits;

pub use config::{ConfigReadCheck, read_config};
pub use datalog::DataLogCheck;
pub use health::HealthCheck;
pub use ping::PingCheck;
pub use registry::CHECKS;
pub use roundtrip::{
    ConfigRoundTrip, ConfigRoundTripCheck, RestoreOutcome, RoundTripReport, RoundTripStage,
    RoundTripVerdict,
};
pub use status::StatusCheck;
pub use traits::*;
