// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the PrintBridge smoke tester.

use thiserror::Error;

/// Top-level error type for every probe, fixture and configuration operation.
#[derive(Debug, Error)]
pub enum BridgeError {
    // -- Network errors --
    /// Service unreachable, connection refused, DNS failure and friends.
    #[error("{0}")]
    Transport(String),

    /// The service answered, but not with a success status.
    #[error("HTTP {status}")]
    Status { status: u16, body: String },

    /// A response body could not be decoded into the expected schema.
    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("operation timed out after {0}s")]
    Timeout(u64),

    // -- WebSocket errors --
    #[error("websocket handshake failed: {0}")]
    Handshake(String),

    #[error("{0}")]
    WebSocket(String),

    // -- Fixture errors --
    #[error("fixture generation failed: {0}")]
    Fixture(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    /// HTTP status carried by the error, if the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BridgeError>;
