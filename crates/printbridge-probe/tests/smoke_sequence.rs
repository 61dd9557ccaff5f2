// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end smoke runs against the in-process mock service.

mod common;

use std::time::{Duration, Instant};

use base64::Engine as _;
use serde_json::{Value, json};

use common::{MockBridge, MockSettings, WsBehavior, closed_port_url};
use printbridge_core::SmokeConfig;
use printbridge_core::types::LabelSpec;
use printbridge_fixture::{LabelFont, LabelRenderer};
use printbridge_probe::probes::{probe_print, websocket_round_trip};
use printbridge_probe::{BridgeClient, CloseReason, ProbeKind, SmokeRunner};

/// Width and height from a PNG's IHDR chunk.
fn png_dimensions(png: &[u8]) -> (u32, u32) {
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    let width = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
    let height = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
    (width, height)
}

fn default_renderer() -> LabelRenderer {
    LabelRenderer::new(LabelSpec::default(), "56x31mm")
}

#[tokio::test]
async fn full_run_passes_every_check() {
    let mock = MockBridge::start(MockSettings::default()).await;
    let runner = SmokeRunner::new(mock.config()).unwrap();

    let report = runner.run().await;

    assert!(report.all_passed(), "{report:#?}");
    assert_eq!(report.liveness.lines, ["✓ Server is running"]);
    let kinds: Vec<ProbeKind> = report.probes.iter().map(|p| p.kind).collect();
    assert_eq!(kinds, ProbeKind::SEQUENCE);

    assert_eq!(
        report.probes[0].lines,
        [
            "Testing GET /printers...",
            "✓ Found 2 printers:",
            "  - Zebra ZD420",
            "  - Brother QL-800",
        ]
    );
    assert_eq!(
        report.probes[1].lines,
        [
            "Testing POST /print...",
            "✓ Print job submitted successfully",
            "  Printer: Zebra ZD420",
            "  Success: true",
        ]
    );
    assert_eq!(
        report.probes[3].lines,
        [
            "Testing WebSocket connection...",
            "✓ WebSocket connected successfully",
            "✓ WebSocket received: Print job queued",
            "WebSocket connection closed",
        ]
    );

    for path in ["/", "/printers", "/print", "/jobs", "/ws"] {
        assert_eq!(mock.hits(path), 1, "{path}");
    }
}

#[tokio::test]
async fn liveness_failure_skips_all_checks() {
    let mock = MockBridge::start(MockSettings {
        root_status: 500,
        ..Default::default()
    })
    .await;
    let runner = SmokeRunner::new(mock.config()).unwrap();

    let report = runner.run().await;

    assert!(!report.completed());
    assert!(report.probes.is_empty());
    assert_eq!(report.liveness.lines, ["✗ Server responded with status 500"]);
    assert_eq!(mock.hits("/"), 1);
    for path in ["/printers", "/print", "/jobs", "/ws"] {
        assert_eq!(mock.hits(path), 0, "{path}");
    }
}

#[tokio::test]
async fn unreachable_service_reports_connection_failure() {
    let base = closed_port_url().await;
    let config = SmokeConfig {
        base_url: base.clone(),
        ..Default::default()
    };
    let runner = SmokeRunner::new(config).unwrap();

    let report = runner.run().await;

    assert!(report.probes.is_empty());
    assert_eq!(report.liveness.lines.len(), 2);
    assert!(report.liveness.lines[0].starts_with("✗ Cannot connect to server: "));
    assert_eq!(
        report.liveness.lines[1],
        format!("Make sure PrintBridge is running on {base}")
    );
}

#[tokio::test]
async fn print_request_carries_a_447_by_247_label() {
    let mock = MockBridge::start(MockSettings::default()).await;
    let runner = SmokeRunner::new(mock.config()).unwrap();

    let result = runner.run_probe(ProbeKind::Print).await;
    assert!(result.passed);

    let bodies = mock.print_bodies();
    assert_eq!(bodies.len(), 1);
    let body = &bodies[0];
    assert_eq!(body["printerName"], Value::Null);

    let encoded = body["base64Image"].as_str().unwrap();
    let png = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
    assert_eq!(png_dimensions(&png), (447, 247));
}

#[tokio::test]
async fn configured_printer_is_sent() {
    let mock = MockBridge::start(MockSettings::default()).await;
    let config = SmokeConfig {
        printer_name: Some("Brother QL-800".into()),
        ..mock.config()
    };
    let runner = SmokeRunner::new(config).unwrap();

    runner.run_probe(ProbeKind::Print).await;

    assert_eq!(mock.print_bodies()[0]["printerName"], "Brother QL-800");
}

#[tokio::test]
async fn print_error_shows_status_and_raw_body() {
    let mock = MockBridge::start(MockSettings {
        print_status: 500,
        print_body: "printer offline".into(),
        ..Default::default()
    })
    .await;
    let runner = SmokeRunner::new(mock.config()).unwrap();

    let report = runner.run().await;

    let print = &report.probes[1];
    assert!(!print.passed);
    assert_eq!(
        print.lines,
        ["Testing POST /print...", "✗ Error: 500", "  Response: printer offline"]
    );
    // The remaining probes still run.
    assert!(report.probes[2].passed);
    assert!(report.probes[3].passed);
}

#[tokio::test]
async fn print_reply_with_pascal_case_fields() {
    let mock = MockBridge::start(MockSettings {
        print_body: json!({
            "PrinterName": "Zebra ZD420",
            "Success": false,
            "ErrorMessage": "out of labels"
        })
        .to_string(),
        ..Default::default()
    })
    .await;
    let runner = SmokeRunner::new(mock.config()).unwrap();

    let result = runner.run_probe(ProbeKind::Print).await;

    assert_eq!(
        result.lines[1..],
        [
            "✓ Print job submitted successfully",
            "  Printer: Zebra ZD420",
            "  Success: false",
            "  Error: out of labels",
        ]
    );
}

#[tokio::test]
async fn job_listing_shows_the_three_most_recent() {
    let jobs: Vec<Value> = (1..=5)
        .map(|i| {
            json!({
                "timestamp": format!("2026-10-18T09:0{i}:00"),
                "printerName": format!("P{i}"),
                "success": i != 4,
                "errorMessage": null
            })
        })
        .collect();
    let mock = MockBridge::start(MockSettings {
        jobs: Value::Array(jobs),
        ..Default::default()
    })
    .await;
    let runner = SmokeRunner::new(mock.config()).unwrap();

    let result = runner.run_probe(ProbeKind::Jobs).await;

    assert_eq!(
        result.lines,
        [
            "Testing GET /jobs...",
            "✓ Found 5 print jobs:",
            "  2026-10-18T09:03:00 - P3 - ✓ Success",
            "  2026-10-18T09:04:00 - P4 - ✗ Error",
            "  2026-10-18T09:05:00 - P5 - ✓ Success",
        ]
    );
}

#[tokio::test]
async fn job_with_missing_fields_shows_unknown() {
    let mock = MockBridge::start(MockSettings {
        jobs: json!([{}]),
        ..Default::default()
    })
    .await;
    let runner = SmokeRunner::new(mock.config()).unwrap();

    let result = runner.run_probe(ProbeKind::Jobs).await;

    assert_eq!(result.lines[2], "  Unknown - Unknown - ✗ Error");
}

#[tokio::test]
async fn websocket_reply_closes_before_timer() {
    let mock = MockBridge::start(MockSettings::default()).await;
    let url = mock.config().websocket_url();

    let (result, reason) =
        websocket_round_trip(&url, &default_renderer(), Duration::from_secs(5)).await;

    assert!(result.passed);
    assert_eq!(reason, Some(CloseReason::MessageReceived));
    let sent = mock.ws_messages();
    assert_eq!(sent.len(), 1);
    assert!(base64::engine::general_purpose::STANDARD.decode(&sent[0]).is_ok());
}

#[tokio::test]
async fn silent_server_is_closed_by_the_timer() {
    let mock = MockBridge::start(MockSettings {
        ws: WsBehavior::Silent,
        ..Default::default()
    })
    .await;
    let url = mock.config().websocket_url();

    let started = Instant::now();
    let (result, reason) =
        websocket_round_trip(&url, &default_renderer(), Duration::from_secs(1)).await;
    let elapsed = started.elapsed();

    assert_eq!(reason, Some(CloseReason::Timeout));
    assert!(!result.passed);
    assert_eq!(
        result.lines,
        [
            "Testing WebSocket connection...",
            "✓ WebSocket connected successfully",
            "WebSocket connection closed",
        ]
    );
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
}

#[tokio::test]
async fn default_limit_ends_a_silent_run_within_six_seconds() {
    let mock = MockBridge::start(MockSettings {
        ws: WsBehavior::Silent,
        ..Default::default()
    })
    .await;
    let runner = SmokeRunner::new(mock.config()).unwrap();

    let started = Instant::now();
    let result = runner.run_probe(ProbeKind::WebSocket).await;

    assert!(started.elapsed() < Duration::from_secs(6));
    assert_eq!(result.lines.last().unwrap(), "WebSocket connection closed");
}

#[tokio::test]
async fn server_close_is_reported_as_peer_closed() {
    let mock = MockBridge::start(MockSettings {
        ws: WsBehavior::CloseImmediately,
        ..Default::default()
    })
    .await;
    let url = mock.config().websocket_url();

    let (result, reason) =
        websocket_round_trip(&url, &default_renderer(), Duration::from_secs(5)).await;

    assert_eq!(reason, Some(CloseReason::PeerClosed));
    assert!(!result.passed);
    assert_eq!(result.lines.last().unwrap(), "WebSocket connection closed");
}

#[tokio::test]
async fn rejected_upgrade_is_a_websocket_error() {
    let mock = MockBridge::start(MockSettings {
        ws: WsBehavior::RejectUpgrade,
        ..Default::default()
    })
    .await;
    let runner = SmokeRunner::new(mock.config()).unwrap();

    let result = runner.run_probe(ProbeKind::WebSocket).await;

    assert!(!result.passed);
    assert_eq!(result.lines.len(), 3);
    assert!(
        result.lines[1].starts_with("✗ WebSocket error: websocket handshake failed"),
        "{:?}",
        result.lines
    );
    assert_eq!(result.lines[2], "WebSocket connection closed");
}

#[tokio::test]
async fn unreachable_websocket_still_reports_closed() {
    let base = closed_port_url().await;
    let url = format!("{}/ws", base.replacen("http://", "ws://", 1));

    let (result, reason) =
        websocket_round_trip(&url, &default_renderer(), Duration::from_secs(5)).await;

    assert_eq!(reason, None);
    assert_eq!(result.lines.len(), 3);
    assert!(result.lines[1].starts_with("✗ WebSocket error: "));
    assert_eq!(result.lines[2], "WebSocket connection closed");
}

#[tokio::test]
async fn printers_error_status_is_reported_and_run_continues() {
    let mock = MockBridge::start(MockSettings {
        printers_status: 503,
        ..Default::default()
    })
    .await;
    let runner = SmokeRunner::new(mock.config()).unwrap();

    let report = runner.run().await;

    assert_eq!(report.probes[0].lines, ["Testing GET /printers...", "✗ Error: 503"]);
    assert!(!report.probes[0].passed);
    for later in &report.probes[1..] {
        assert!(later.passed, "{later:?}");
    }
    for path in ["/print", "/jobs", "/ws"] {
        assert_eq!(mock.hits(path), 1, "{path}");
    }
}

#[tokio::test]
async fn jobs_error_status_is_reported_and_run_continues() {
    let mock = MockBridge::start(MockSettings {
        jobs_status: 503,
        ..Default::default()
    })
    .await;
    let runner = SmokeRunner::new(mock.config()).unwrap();

    let report = runner.run().await;

    assert_eq!(report.probes[2].lines, ["Testing GET /jobs...", "✗ Error: 503"]);
    assert!(report.probes[3].passed);
    assert_eq!(report.failed_probes().count(), 1);
}

#[tokio::test]
async fn malformed_printer_list_is_a_connection_error() {
    let mock = MockBridge::start(MockSettings {
        printers_raw: Some("<html>not json</html>".into()),
        ..Default::default()
    })
    .await;
    let runner = SmokeRunner::new(mock.config()).unwrap();

    let report = runner.run().await;

    let printers = &report.probes[0];
    assert!(!printers.passed);
    assert_eq!(printers.lines.len(), 2);
    assert!(
        printers.lines[1].starts_with("✗ Connection error: invalid response body"),
        "{:?}",
        printers.lines
    );
    assert!(report.probes[1].passed);
}

#[tokio::test]
async fn malformed_job_list_is_a_connection_error() {
    let mock = MockBridge::start(MockSettings {
        jobs_raw: Some("{\"jobs\": []}".into()),
        ..Default::default()
    })
    .await;
    let runner = SmokeRunner::new(mock.config()).unwrap();

    let result = runner.run_probe(ProbeKind::Jobs).await;

    assert!(!result.passed);
    assert!(result.lines[1].starts_with("✗ Connection error: "));
}

#[tokio::test]
async fn oversized_label_fails_only_the_print_check() {
    let mock = MockBridge::start(MockSettings::default()).await;
    let client = BridgeClient::new(&mock.url()).unwrap();
    let renderer = LabelRenderer::with_font(LabelSpec::new(1e9, 1e9, 203), "x", LabelFont::Bitmap);

    let result = probe_print(&client, &renderer, None).await;

    assert!(!result.passed);
    assert_eq!(result.lines.len(), 2);
    assert!(result.lines[1].starts_with("✗ fixture generation failed"), "{:?}", result.lines);
    assert_eq!(mock.hits("/print"), 0);
}

#[tokio::test]
async fn config_file_controls_job_count() {
    use std::io::Write;

    let jobs: Vec<Value> = (1..=4)
        .map(|i| json!({"timestamp": i, "printerName": "Zebra ZD420", "success": true}))
        .collect();
    let mock = MockBridge::start(MockSettings {
        jobs: Value::Array(jobs),
        ..Default::default()
    })
    .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"base_url":"{}","recent_jobs":1}}"#, mock.url()).unwrap();
    let runner = SmokeRunner::new(SmokeConfig::load(file.path()).unwrap()).unwrap();

    let result = runner.run_probe(ProbeKind::Jobs).await;

    assert_eq!(
        result.lines[1..],
        ["✓ Found 4 print jobs:", "  4 - Zebra ZD420 - ✓ Success"]
    );
}
