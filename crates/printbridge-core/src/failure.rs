// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Failure taxonomy for probe output.
//
// Every error that reaches a probe boundary is classified and turned into a
// single human-readable console line. Nothing propagates past a probe.

use crate::error::BridgeError;

/// Which side of the conversation went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Could not reach the service at all (refused, DNS, timeout).
    Connection,
    /// Reached the service, which answered with a non-success status.
    Status,
    /// Reached the service, but the exchange itself was malformed.
    Protocol,
    /// A local capability is missing (bad configuration, fixture failure).
    Unavailable,
}

/// Classify an error for reporting.
pub fn classify(err: &BridgeError) -> FailureKind {
    match err {
        BridgeError::Transport(_) | BridgeError::Timeout(_) | BridgeError::Io(_) => {
            FailureKind::Connection
        }
        BridgeError::Status { .. } => FailureKind::Status,
        BridgeError::Decode(_)
        | BridgeError::Handshake(_)
        | BridgeError::WebSocket(_)
        | BridgeError::Serialization(_) => FailureKind::Protocol,
        BridgeError::Fixture(_) | BridgeError::Config(_) => FailureKind::Unavailable,
    }
}

/// Render the `✗ ...` console line for a failed HTTP probe.
///
/// Non-success statuses print just the code; everything else is reported as a
/// connection error with the underlying message.
pub fn failure_line(err: &BridgeError) -> String {
    match (classify(err), err.status()) {
        (FailureKind::Status, Some(status)) => format!("✗ Error: {status}"),
        (FailureKind::Unavailable, _) => format!("✗ {err}"),
        _ => format!("✗ Connection error: {err}"),
    }
}
