//! Check registry
//!
//! Central registry of all available checks. New checks should be registered here.
//!
//! ## Check Ordering
//!
//! Checks run in registration order:
//! 1. **Liveness** (health, ping) first, so an unreachable device is obvious
//!    from the top of the report.
//! 2. **Read-only telemetry** (status, datalog, config).
//! 3. **Config round-trip** last, the only check that writes to the device.
//!
//! A failing check never stops the ones after it.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::sync::Arc;

use super::traits::Check;
use super::{
    ConfigReadCheck, ConfigRoundTripCheck, DataLogCheck, HealthCheck, PingCheck, StatusCheck,
};

/// Global registry of all available checks
///
/// Uses IndexMap to preserve insertion order, ensuring checks run in a
/// deterministic sequence.
pub static CHECKS: Lazy<IndexMap<&'static str, Arc<dyn Check>>> = Lazy::new(|| {
    let mut m: IndexMap<&'static str, Arc<dyn Check>> = IndexMap::new();

    m.insert("health", Arc::new(HealthCheck));
    m.insert("ping", Arc::new(PingCheck));

    m.insert("status", Arc::new(StatusCheck));
    m.insert("datalog", Arc::new(DataLogCheck));
    m.insert("config", Arc::new(ConfigReadCheck));

    // Writes to the device - keep last
    m.insert("config-roundtrip", Arc::new(ConfigRoundTripCheck));

    m
});

/// All check names in execution order
pub fn list_checks() -> Vec<&'static str> {
    CHECKS.keys().copied().collect()
}

/// Resolve a comma-separated filter into checks, in execution order
///
/// Unknown names are returned separately so the caller can report them.
pub fn select_checks(filter: &str) -> (Vec<Arc<dyn Check>>, Vec<String>) {
    let wanted: Vec<&str> = filter
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();

    let unknown = wanted
        .iter()
        .filter(|name| !CHECKS.contains_key(**name))
        .map(|name| (*name).to_string())
        .collect();

    let selected = CHECKS
        .iter()
        .filter(|(name, _)| wanted.contains(*name))
        .map(|(_, check)| check.clone())
        .collect();

    (selected, unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_checks_registered() {
        for name in ["health", "ping", "status", "datalog", "config", "config-roundtrip"] {
            assert!(CHECKS.contains_key(name), "{name} not registered");
        }
    }

    #[test]
    fn test_execution_order() {
        assert_eq!(
            list_checks(),
            vec!["health", "ping", "status", "datalog", "config", "config-roundtrip"]
        );
    }

    #[test]
    fn test_registry_keys_match_check_names() {
        for (name, check) in CHECKS.iter() {
            assert_eq!(*name, check.name());
        }
    }

    #[test]
    fn test_select_keeps_registry_order() {
        let (selected, unknown) = select_checks("config-roundtrip, health,bogus");
        let names: Vec<_> = selected.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["health", "config-roundtrip"]);
        assert_eq!(unknown, vec!["bogus".to_string()]);
    }
}
