//! agriprobe - AgriShield Device Conformance Harness
//!
//! A Rust tool that exercises the REST interface of an AgriShield field
//! device, validates responses against their contracts, round-trips the
//! device configuration and can watch live telemetry.
//!
//! ## Architecture
//!
//! - Checks run one at a time against a single device; a failing check never
//!   stops the ones after it
//! - Every device error becomes a failing result with a typed failure kind
//! - The configuration round-trip always restores what it found, and reports
//!   a failed restore as a hazard separate from its verdict
//! - Monitoring is a separate operation, composed by the CLI
//!
//! ## Modules
//!
//! - [`client`] - HTTP client and endpoint contracts for the device API
//! - [`checks`] - Check implementations (health, ping, status, datalog, config, round-trip)
//! - [`config`] - Configuration parsing (target, monitor, checks)
//! - [`runner`] - Sequential check execution
//! - [`report`] - Test run report and summary table
//! - [`monitor`] - Continuous status polling
//! - [`shutdown`] - Ctrl-C forwarding without dropping in-flight work

pub mod checks;
pub mod client;
pub mod config;
pub mod monitor;
pub mod report;
pub mod runner;
pub mod shutdown;
