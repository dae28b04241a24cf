//! agriprobe Test Kit
//!
//! Test infrastructure for the agriprobe harness.
//!
//! This crate provides:
//! - A mock AgriShield device served over HTTP on a local port
//! - Seeded telemetry generation for reproducible status payloads
//!
//! # Example
//!
//! ```rust
//! use agriprobe_testkit::random::PseudoGenerator;
//!
//! let mut rng = PseudoGenerator::new(12345);
//! let reading = rng.reading();
//! assert!(reading.battery_percent <= 100);
//! ```

pub mod mock;
pub mod random;

pub use mock::{MockDevice, MockDeviceHandle};
pub use random::PseudoGenerator;
