// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The four endpoint probes.
//
// Each probe makes one network interaction and returns the console lines
// describing it. Probes never fail: every error is caught here and turned
// into a `✗` line, so one broken endpoint cannot stop the others.

use std::time::Duration;

use tracing::{debug, info, warn};

use printbridge_core::error::BridgeError;
use printbridge_core::failure::failure_line;
use printbridge_core::types::{PrintRequest, recent_jobs};
use printbridge_fixture::LabelRenderer;

use crate::client::BridgeClient;
use crate::close::{CloseHandle, CloseReason};
use crate::ws::{CLOSE_NORMAL, Message, WsConnection};

/// Last line of every WebSocket round-trip, whether or not it connected.
const CLOSED_LINE: &str = "WebSocket connection closed";

/// How long the client close frame may take to go out.
const CLOSE_GRACE: Duration = Duration::from_millis(500);

/// The checks a smoke run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    /// `GET /`, run before everything else.
    Liveness,
    Printers,
    Print,
    Jobs,
    WebSocket,
}

impl ProbeKind {
    /// The probes, in the order a run executes them.
    pub const SEQUENCE: [ProbeKind; 4] = [Self::Printers, Self::Print, Self::Jobs, Self::WebSocket];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Liveness => "Liveness",
            Self::Printers => "List Printers",
            Self::Print => "Submit Print",
            Self::Jobs => "List Jobs",
            Self::WebSocket => "WebSocket Round-Trip",
        }
    }

    /// Heading line printed when the probe starts.
    pub fn heading(&self) -> &'static str {
        match self {
            Self::Liveness => "Checking server...",
            Self::Printers => "Testing GET /printers...",
            Self::Print => "Testing POST /print...",
            Self::Jobs => "Testing GET /jobs...",
            Self::WebSocket => "Testing WebSocket connection...",
        }
    }
}

/// Outcome of one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub kind: ProbeKind,
    pub passed: bool,
    /// Console output, in order, heading first.
    pub lines: Vec<String>,
}

impl ProbeResult {
    fn start(kind: ProbeKind) -> Self {
        Self {
            kind,
            passed: false,
            lines: vec![kind.heading().to_string()],
        }
    }

    fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn fail(mut self, err: &BridgeError) -> Self {
        warn!(probe = self.kind.name(), error = %err, "probe failed");
        self.line(failure_line(err));
        self.passed = false;
        self
    }
}

/// List Printers: `GET /printers`.
pub async fn probe_printers(client: &BridgeClient) -> ProbeResult {
    let mut result = ProbeResult::start(ProbeKind::Printers);
    match client.list_printers().await {
        Ok(printers) => {
            result.line(format!("✓ Found {} printers:", printers.len()));
            for printer in &printers {
                result.line(format!("  - {printer}"));
            }
            result.passed = true;
            result
        }
        Err(err) => result.fail(&err),
    }
}

/// Submit Print: `POST /print` with a fresh label.
pub async fn probe_print(
    client: &BridgeClient,
    renderer: &LabelRenderer,
    printer_name: Option<String>,
) -> ProbeResult {
    let mut result = ProbeResult::start(ProbeKind::Print);

    let fixture = match renderer.generate() {
        Ok(fixture) => fixture,
        Err(err) => return result.fail(&err),
    };
    let request = PrintRequest::new(fixture.base64, printer_name);

    match client.submit_print(&request).await {
        Ok(reply) => {
            result.line("✓ Print job submitted successfully");
            result.line(format!("  Printer: {}", reply.printer()));
            result.line(format!("  Success: {}", reply.succeeded()));
            if let Some(message) = reply.error() {
                result.line(format!("  Error: {message}"));
            }
            result.passed = true;
            result
        }
        Err(BridgeError::Status { status, body }) => {
            warn!(status, "print submission rejected");
            result.line(format!("✗ Error: {status}"));
            result.line(format!("  Response: {body}"));
            result
        }
        Err(err) => result.fail(&err),
    }
}

/// List Jobs: `GET /jobs`, showing at most `recent` entries.
pub async fn probe_jobs(client: &BridgeClient, recent: usize) -> ProbeResult {
    let mut result = ProbeResult::start(ProbeKind::Jobs);
    match client.list_jobs().await {
        Ok(jobs) => {
            result.line(format!("✓ Found {} print jobs:", jobs.len()));
            for job in recent_jobs(&jobs, recent) {
                result.line(format!("  {}", job.summary_line()));
            }
            result.passed = true;
            result
        }
        Err(err) => result.fail(&err),
    }
}

/// WebSocket Round-Trip; see [`websocket_round_trip`].
pub async fn probe_websocket(url: &str, renderer: &LabelRenderer, limit: Duration) -> ProbeResult {
    websocket_round_trip(url, renderer, limit).await.0
}

/// What the message path saw before anything closed the connection.
enum Exchange {
    Received(String),
    PeerClosed,
    Failed(BridgeError),
}

/// Connect, send one label as a text frame, print the first reply and close.
///
/// A timer armed when the connection opens closes it after `limit` whatever
/// happens. Returns the probe lines and which side closed first; the lines
/// are the same either way. Connecting is bounded by `limit` as well, and a
/// failed connect still ends with the closed line.
pub async fn websocket_round_trip(
    url: &str,
    renderer: &LabelRenderer,
    limit: Duration,
) -> (ProbeResult, Option<CloseReason>) {
    let mut result = ProbeResult::start(ProbeKind::WebSocket);

    let mut conn = match tokio::time::timeout(limit, WsConnection::connect(url)).await {
        Ok(Ok(conn)) => conn,
        Ok(Err(err)) => {
            warn!(url, error = %err, "WebSocket connect failed");
            result.line(format!("✗ WebSocket error: {err}"));
            result.line(CLOSED_LINE);
            return (result, None);
        }
        Err(_) => {
            let err = BridgeError::Timeout(limit.as_secs());
            warn!(url, error = %err, "WebSocket connect timed out");
            result.line(format!("✗ WebSocket error: connect {err}"));
            result.line(CLOSED_LINE);
            return (result, None);
        }
    };
    result.line("✓ WebSocket connected successfully");

    let handle = CloseHandle::new();
    let timer = handle.arm_timer(limit);

    let exchange = async {
        let fixture = match renderer.generate() {
            Ok(fixture) => fixture,
            Err(err) => return Exchange::Failed(err),
        };
        if let Err(err) = conn.send_text(&fixture.base64).await {
            return Exchange::Failed(err);
        }
        match conn.next_message().await {
            Ok(Message::Text(text)) => Exchange::Received(text),
            Ok(Message::Binary(bytes)) => {
                Exchange::Received(format!("<{} binary bytes>", bytes.len()))
            }
            Ok(Message::Close(code)) => {
                debug!(?code, "server closed before replying");
                Exchange::PeerClosed
            }
            Err(err) => Exchange::Failed(err),
        }
    };

    let outcome = tokio::select! {
        outcome = exchange => Some(outcome),
        _ = handle.closed() => None,
    };
    timer.abort();

    match outcome {
        Some(Exchange::Received(text)) => {
            handle.close(CloseReason::MessageReceived);
            result.line(format!("✓ WebSocket received: {text}"));
            result.passed = true;
        }
        Some(Exchange::PeerClosed) => {
            handle.close(CloseReason::PeerClosed);
        }
        Some(Exchange::Failed(err)) => {
            handle.close(CloseReason::Error);
            warn!(error = %err, "WebSocket exchange failed");
            result.line(format!("✗ WebSocket error: {err}"));
        }
        None => {}
    }

    if tokio::time::timeout(CLOSE_GRACE, conn.close(CLOSE_NORMAL)).await.is_err() {
        debug!("close frame did not go out in time, dropping connection");
    }
    drop(conn);
    result.line(CLOSED_LINE);

    let reason = handle.reason();
    info!(?reason, passed = result.passed, "WebSocket round-trip finished");
    (result, reason)
}
