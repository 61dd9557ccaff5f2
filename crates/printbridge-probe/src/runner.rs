// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Smoke-run sequencer.
//
// Checks that the service is alive, then runs the four probes in a fixed
// order. A failed liveness check aborts the run before any probe touches the
// service; after that, probe failures are reported and the run continues.

use chrono::{DateTime, Local};
use tracing::{info, warn};

use printbridge_core::SmokeConfig;
use printbridge_core::error::{BridgeError, Result};
use printbridge_fixture::LabelRenderer;

use crate::client::BridgeClient;
use crate::probes::{self, ProbeKind, ProbeResult};

/// Width of the `=` rule around the run.
const RULE_WIDTH: usize = 40;

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Local>,
    pub base_url: String,
    pub liveness: ProbeResult,
    /// Probe results in execution order; empty when the run was aborted.
    pub probes: Vec<ProbeResult>,
}

impl RunReport {
    /// `false` when the liveness check failed and no probe ran.
    pub fn completed(&self) -> bool {
        self.liveness.passed
    }

    pub fn failed_probes(&self) -> impl Iterator<Item = &ProbeResult> {
        self.probes.iter().filter(|p| !p.passed)
    }

    pub fn all_passed(&self) -> bool {
        self.completed() && self.failed_probes().next().is_none()
    }
}

/// Owns the client, the label renderer and the configuration for one run.
#[derive(Debug)]
pub struct SmokeRunner {
    config: SmokeConfig,
    client: BridgeClient,
    renderer: LabelRenderer,
}

impl SmokeRunner {
    /// Validate `config` and prepare a run. The label font is resolved here,
    /// once, and reused by every probe.
    pub fn new(config: SmokeConfig) -> Result<Self> {
        config.validate()?;
        let client = BridgeClient::new(config.base())?;
        let renderer = LabelRenderer::from_config(&config);
        Ok(Self {
            config,
            client,
            renderer,
        })
    }

    pub fn config(&self) -> &SmokeConfig {
        &self.config
    }

    /// `GET /` with the configured timeout.
    pub async fn check_liveness(&self) -> ProbeResult {
        let mut result = ProbeResult {
            kind: ProbeKind::Liveness,
            passed: false,
            lines: Vec::new(),
        };
        match self.client.check_liveness(self.config.liveness_timeout()).await {
            Ok(_) => {
                result.lines.push("✓ Server is running".into());
                result.passed = true;
            }
            Err(BridgeError::Status { status, .. }) => {
                result
                    .lines
                    .push(format!("✗ Server responded with status {status}"));
            }
            Err(err) => {
                result.lines.push(format!("✗ Cannot connect to server: {err}"));
                result.lines.push(format!(
                    "Make sure PrintBridge is running on {}",
                    self.config.base()
                ));
            }
        }
        result
    }

    /// Run a single probe.
    pub async fn run_probe(&self, kind: ProbeKind) -> ProbeResult {
        match kind {
            ProbeKind::Liveness => self.check_liveness().await,
            ProbeKind::Printers => probes::probe_printers(&self.client).await,
            ProbeKind::Print => {
                probes::probe_print(&self.client, &self.renderer, self.config.printer_name.clone())
                    .await
            }
            ProbeKind::Jobs => probes::probe_jobs(&self.client, self.config.recent_jobs).await,
            ProbeKind::WebSocket => {
                probes::probe_websocket(
                    &self.config.websocket_url(),
                    &self.renderer,
                    self.config.ws_timeout(),
                )
                .await
            }
        }
    }

    /// Full run without progress callbacks.
    pub async fn run(&self) -> RunReport {
        self.run_with(|_| {}).await
    }

    /// Full run; `on_result` sees the liveness result and then each probe
    /// result as soon as it is available.
    pub async fn run_with<F>(&self, mut on_result: F) -> RunReport
    where
        F: FnMut(&ProbeResult),
    {
        let started_at = Local::now();
        info!(base = self.config.base(), "starting smoke run");

        let liveness = self.check_liveness().await;
        on_result(&liveness);

        let mut report = RunReport {
            started_at,
            base_url: self.config.base().to_string(),
            liveness,
            probes: Vec::with_capacity(ProbeKind::SEQUENCE.len()),
        };

        if !report.liveness.passed {
            warn!("service not reachable, skipping all probes");
            return report;
        }

        for kind in ProbeKind::SEQUENCE {
            let result = self.run_probe(kind).await;
            info!(probe = kind.name(), passed = result.passed, "probe finished");
            on_result(&result);
            report.probes.push(result);
        }

        info!(
            failed = report.failed_probes().count(),
            "smoke run completed"
        );
        report
    }
}

/// Lines printed before the run.
pub fn opening_banner() -> Vec<String> {
    vec!["PrintBridge API Test Script".into(), "=".repeat(RULE_WIDTH)]
}

/// Lines printed after a completed run.
pub fn completion_banner(base_url: &str) -> Vec<String> {
    vec![
        String::new(),
        "=".repeat(RULE_WIDTH),
        "Test completed!".into(),
        format!("Visit {base_url} to see the dashboard"),
    ]
}

/// Plain-text recap of a run, suitable for pasting into a bug report.
pub fn generate_summary(report: &RunReport) -> String {
    let date = report.started_at.format("%d %b %Y, %H:%M:%S");
    let mut text = format!("PrintBridge Smoke Report\nDate: {date}\nTarget: {}\n", report.base_url);

    if !report.completed() {
        text.push_str("Liveness: FAILED (no probes were run)\n");
        return text;
    }
    text.push_str("Liveness: ok\n");

    for probe in &report.probes {
        let verdict = if probe.passed { "ok" } else { "FAILED" };
        text.push_str(&format!("{}: {verdict}\n", probe.kind.name()));
    }

    let failed = report.failed_probes().count();
    if failed == 0 {
        text.push_str("All probes passed.\n");
    } else {
        text.push_str(&format!("{failed} of {} probes failed.\n", report.probes.len()));
    }
    text
}
