//! Operator notification port.
//!
//! The orchestrator is the sole boundary that turns failures into
//! user-visible notifications; presentation (toasts, status bars) is out of
//! scope, so it goes through this trait.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, message: &str);
}

/// Default sink: forwards notifications to `tracing`.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Error => tracing::error!(target: "modwatch::notify", "{message}"),
            Severity::Warning => tracing::warn!(target: "modwatch::notify", "{message}"),
            Severity::Success | Severity::Info => {
                tracing::info!(target: "modwatch::notify", %severity, "{message}");
            }
        }
    }
}
