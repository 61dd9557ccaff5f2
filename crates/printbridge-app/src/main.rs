// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printbridge-smoke: end-to-end smoke tester for PrintBridge.
//
// Entry point. Initialises logging, builds the run configuration from an
// optional file plus flags, and prints probe results to stdout.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use printbridge_core::SmokeConfig;
use printbridge_core::error::Result;
use printbridge_probe::runner::{completion_banner, generate_summary, opening_banner};
use printbridge_probe::{ProbeKind, ProbeResult, SmokeRunner};

/// Exit status when the service was not reachable.
const EXIT_UNREACHABLE: u8 = 1;
/// Exit status for an unusable configuration.
const EXIT_CONFIG: u8 = 2;

/// Smoke-test a running PrintBridge service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(long, env = "PRINTBRIDGE_SMOKE_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP base address of the service
    #[arg(long, env = "PRINTBRIDGE_URL")]
    base_url: Option<String>,

    /// WebSocket endpoint (default: <base-url>/ws)
    #[arg(long)]
    ws_url: Option<String>,

    /// Printer to send the test label to (default: the server's default)
    #[arg(long)]
    printer: Option<String>,

    /// TrueType/OpenType font for the label text
    #[arg(long)]
    font: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> Result<SmokeConfig> {
        let mut config = match &self.config {
            Some(path) => SmokeConfig::load(path)?,
            None => SmokeConfig::default(),
        };
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if self.ws_url.is_some() {
            config.ws_url = self.ws_url;
        }
        if self.printer.is_some() {
            config.printer_name = self.printer;
        }
        if self.font.is_some() {
            config.font_path = self.font;
        }
        Ok(config)
    }
}

fn print_result(result: &ProbeResult) {
    // The liveness line and the first probe run together; later probes are
    // separated by a blank line.
    if !matches!(result.kind, ProbeKind::Liveness | ProbeKind::Printers) {
        println!();
    }
    for line in &result.lines {
        println!("{line}");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let runner = match args.into_config().and_then(SmokeRunner::new) {
        Ok(runner) => runner,
        Err(e) => {
            error!(error = %e, "cannot start smoke run");
            eprintln!("✗ {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    info!("printbridge-smoke starting");
    for line in opening_banner() {
        println!("{line}");
    }

    let report = runner.run_with(print_result).await;

    if !report.completed() {
        return ExitCode::from(EXIT_UNREACHABLE);
    }

    for line in completion_banner(&report.base_url) {
        println!("{line}");
    }
    println!();
    print!("{}", generate_summary(&report));
    ExitCode::SUCCESS
}
