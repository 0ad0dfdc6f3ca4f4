// SPDX-License-Identifier: Apache-2.0
//! User-facing diagnostics.
//!
//! Controller operations report warnings and errors through a [`Reporter`]
//! rather than logging directly, so hosts can route messages to their own
//! surfaces. The default sink forwards to `tracing`.

/// Severity of a reported message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational message.
    Info,
    /// Recoverable problem; the operation continued or degraded gracefully.
    Warning,
    /// The operation failed.
    Error,
}

/// Sink for controller diagnostics.
pub trait Reporter {
    /// Delivers one message.
    fn report(&mut self, severity: Severity, message: &str);
}

/// Reporter that forwards messages to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => tracing::info!(target: "loom::controller", "{message}"),
            Severity::Warning => tracing::warn!(target: "loom::controller", "{message}"),
            Severity::Error => tracing::error!(target: "loom::controller", "{message}"),
        }
    }
}

/// Reporter that drops all messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&mut self, _severity: Severity, _message: &str) {}
}
