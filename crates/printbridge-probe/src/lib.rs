// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PrintBridge Probe: endpoint probes for the PrintBridge printing service.
// An HTTP client for the REST endpoints, a minimal WebSocket client for the
// streaming endpoint, the four probes built on them, and the runner that
// sequences a full smoke run behind a liveness check.

pub mod client;
pub mod close;
pub mod probes;
pub mod runner;
pub mod ws;

pub use client::BridgeClient;
pub use close::{CloseHandle, CloseReason};
pub use probes::{ProbeKind, ProbeResult};
pub use runner::{RunReport, SmokeRunner};
pub use ws::WsConnection;
