// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Smoke-run configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::types::{LabelSpec, MAX_LABEL_PIXELS};

/// Where PrintBridge listens out of the box.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Settings for one smoke run. Every field has a default, so a config file
/// only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmokeConfig {
    /// HTTP base address of the service.
    pub base_url: String,
    /// WebSocket endpoint. Derived from `base_url` when unset.
    pub ws_url: Option<String>,
    /// Timeout of the initial liveness request, in seconds.
    pub liveness_timeout_secs: u64,
    /// Hard limit on the WebSocket round-trip, in seconds.
    pub ws_timeout_secs: u64,
    /// Physical size of the generated test label.
    pub label: LabelSpec,
    /// Text drawn on the test label.
    pub label_text: String,
    /// Preferred TrueType/OpenType font for the label text.
    pub font_path: Option<PathBuf>,
    /// Printer to request; `None` uses the server's default printer.
    pub printer_name: Option<String>,
    /// How many of the most recent jobs the job listing shows.
    pub recent_jobs: usize,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            ws_url: None,
            liveness_timeout_secs: 5,
            ws_timeout_secs: 5,
            label: LabelSpec::default(),
            label_text: "56x31mm".into(),
            font_path: None,
            printer_name: None,
            recent_jobs: 3,
        }
    }
}

impl SmokeConfig {
    /// Read a JSON config file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Base URL without a trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Absolute URL of an HTTP endpoint, e.g. `endpoint("/printers")`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base(), path)
    }

    /// The configured WebSocket URL, or `/ws` on the base address with the
    /// scheme switched to `ws`/`wss`.
    pub fn websocket_url(&self) -> String {
        if let Some(url) = &self.ws_url {
            return url.clone();
        }
        let base = self.base();
        let swapped = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{swapped}/ws")
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_secs(self.liveness_timeout_secs)
    }

    pub fn ws_timeout(&self) -> Duration {
        Duration::from_secs(self.ws_timeout_secs)
    }

    /// Reject settings that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        let base = self.base();
        if base.is_empty() {
            return Err(BridgeError::Config("base_url is empty".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(BridgeError::Config(format!(
                "base_url must start with http:// or https://, got {base}"
            )));
        }
        let ws = self.websocket_url();
        if ws.starts_with("wss://") {
            return Err(BridgeError::Config(format!(
                "wss:// is not supported ({ws}); set ws_url to a ws:// address"
            )));
        }
        if !ws.starts_with("ws://") {
            return Err(BridgeError::Config(format!("ws_url must start with ws://, got {ws}")));
        }
        if self.label.dpi == 0 {
            return Err(BridgeError::Config("label dpi must be positive".into()));
        }
        let (w, h) = self.label.pixel_dimensions();
        if w == 0 || h == 0 {
            return Err(BridgeError::Config(format!(
                "label {}x{} mm renders to an empty image",
                self.label.width_mm, self.label.height_mm
            )));
        }
        if self.label.pixel_count() > MAX_LABEL_PIXELS {
            return Err(BridgeError::Config(format!(
                "label {}x{} mm at {} dpi exceeds {MAX_LABEL_PIXELS} pixels",
                self.label.width_mm, self.label.height_mm, self.label.dpi
            )));
        }
        if self.ws_timeout_secs == 0 {
            return Err(BridgeError::Config("ws_timeout_secs must be positive".into()));
        }
        Ok(())
    }
}
