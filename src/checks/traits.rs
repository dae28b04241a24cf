//! Check trait and supporting types
//!
//! The `Check` trait defines the interface for all device checks.
//! Each check can be configured via `CheckOptions` and returns a `CheckResult`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

use crate::client::{DeviceClient, DeviceError};

/// Where in the error taxonomy a failure belongs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Connection refused, timeout, DNS failure, unexpected HTTP status
    Transport,
    /// Required field absent or body not decodable
    Schema,
    /// Field present but its value is outside the allowed domain
    Semantic,
    /// The check exceeded its overall time budget
    Timeout,
    /// Anything outside the device conversation itself
    Internal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Transport => write!(f, "transport"),
            FailureKind::Schema => write!(f, "schema"),
            FailureKind::Semantic => write!(f, "semantic"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Internal => write!(f, "internal"),
        }
    }
}

/// Errors that can occur during check execution
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("{0}")]
    Semantic(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Interrupted by user")]
    Interrupted,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CheckError {
    pub fn kind(&self) -> FailureKind {
        match self {
            CheckError::Device(e) if e.is_timeout() => FailureKind::Timeout,
            CheckError::Device(e) => e.kind(),
            CheckError::Semantic(_) => FailureKind::Semantic,
            CheckError::Timeout(_) => FailureKind::Timeout,
            CheckError::Config(_) | CheckError::Interrupted | CheckError::Internal(_) => {
                FailureKind::Internal
            }
        }
    }
}

/// Outcome of a single check execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// Name of the check
    pub check_name: String,
    /// Whether the check passed
    pub passed: bool,
    /// Failure category when the check did not pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// Human-readable diagnostics, in the order they were produced
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
    /// Additional details (check-specific)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, serde_json::Value>,
    /// Device state now diverges from what it was before the check
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hazard: Option<String>,
    /// How long the check took
    pub duration: Duration,
    /// Summary message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResult {
    /// Create a passing result
    pub fn passed(check_name: impl Into<String>, duration: Duration) -> Self {
        Self {
            check_name: check_name.into(),
            passed: true,
            failure: None,
            diagnostics: Vec::new(),
            details: HashMap::new(),
            hazard: None,
            duration,
            message: None,
        }
    }

    /// Create a failing result from the error that ended the check
    pub fn failed(check_name: impl Into<String>, error: &CheckError, duration: Duration) -> Self {
        Self {
            check_name: check_name.into(),
            passed: false,
            failure: Some(error.kind()),
            diagnostics: vec![error.to_string()],
            details: HashMap::new(),
            hazard: None,
            duration,
            message: None,
        }
    }

    /// Add a summary message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Append a diagnostic line
    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostics.push(diagnostic.into());
        self
    }

    /// Add a detail to the result
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.details.insert(key.into(), v);
        }
        self
    }

    /// Flag an operational hazard
    pub fn with_hazard(mut self, hazard: impl Into<String>) -> Self {
        self.hazard = Some(hazard.into());
        self
    }
}

/// Configuration options for a check
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckOptions {
    /// Maximum time for the whole check
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,

    /// Check-specific options (arbitrary key-value pairs)
    #[serde(default, flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl CheckOptions {
    /// Get the timeout or a default value
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout.unwrap_or(default)
    }

    /// Get an extra option as a specific type
    pub fn get_extra<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.extra
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set an extra option
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.extra.insert(key.into(), v);
        }
        self
    }
}

/// Context provided to checks during execution
///
/// Holds the device under test; there is no process-wide target address.
#[derive(Clone)]
pub struct CheckContext {
    pub device: Arc<DeviceClient>,
    /// Flips to `true` when the operator asks the run to stop
    pub shutdown: watch::Receiver<bool>,
}

impl CheckContext {
    pub fn new(device: DeviceClient) -> Self {
        Self {
            device: Arc::new(device),
            shutdown: crate::shutdown::never(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }
}

/// Trait for implementing device checks
///
/// Each check validates one endpoint family (or, for the round-trip, one
/// protocol). Checks are registered in the `CHECKS` registry and invoked by
/// name. Device errors are expected to be turned into a failing
/// `CheckResult`; returning `Err` is reserved for problems outside the
/// device conversation, which the runner still records as a failure.
///
/// ## Example Implementation
///
/// ```ignore
/// use async_trait::async_trait;
/// use agriprobe::checks::{Check, CheckContext, CheckOptions, CheckResult, CheckError};
///
/// pub struct MyCheck;
///
/// #[async_trait]
/// impl Check for MyCheck {
///     fn name(&self) -> &'static str { "mycheck" }
///     fn title(&self) -> &'static str { "My Check" }
///     fn description(&self) -> &'static str { "Verifies something important" }
///
///     async fn run(&self, ctx: &CheckContext, opts: &CheckOptions) -> Result<CheckResult, CheckError> {
///         todo!()
///     }
/// }
/// ```
#[async_trait]
pub trait Check: Send + Sync {
    /// Unique name for this check (used in CLI and config)
    fn name(&self) -> &'static str;

    /// Label used in the summary table
    fn title(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// Run the check against the device
    async fn run(&self, ctx: &CheckContext, opts: &CheckOptions)
    -> Result<CheckResult, CheckError>;

    /// Whether the runner may drop this check mid-flight on timeout or
    /// interrupt
    ///
    /// Checks that write to the device return `false` and honour
    /// `opts.timeout` and `ctx.shutdown` themselves, so they can undo their
    /// writes before returning.
    fn cancel_safe(&self) -> bool {
        true
    }

    /// Default options for this check
    fn default_options(&self) -> CheckOptions {
        CheckOptions {
            timeout: Some(Duration::from_secs(30)),
            extra: HashMap::new(),
        }
    }
}
