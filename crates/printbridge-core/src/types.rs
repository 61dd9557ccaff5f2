// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types: label geometry and the PrintBridge wire schemas.
//
// Response schemas are deliberately lenient. Every field is optional on the
// wire and falls back to "Unknown"/false, and the PascalCase names produced by
// the service's default JSON naming are accepted alongside camelCase.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Largest label canvas, in pixels, that will be rendered (32 Mpx, about
/// 96 MiB of RGB). A 4 × 6 inch label at 600 DPI is under 9 Mpx.
pub const MAX_LABEL_PIXELS: u64 = 32 * 1024 * 1024;

/// Placeholder shown for any field the server left out.
pub const UNKNOWN: &str = "Unknown";

/// Physical label dimensions and the resolution they are rendered at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelSpec {
    pub width_mm: f64,
    pub height_mm: f64,
    /// Dots per inch of the target thermal printer.
    pub dpi: u32,
}

impl Default for LabelSpec {
    /// 56 × 31 mm shipping label on a 203 DPI printer.
    fn default() -> Self {
        Self {
            width_mm: 56.0,
            height_mm: 31.0,
            dpi: 203,
        }
    }
}

impl LabelSpec {
    pub fn new(width_mm: f64, height_mm: f64, dpi: u32) -> Self {
        Self {
            width_mm,
            height_mm,
            dpi,
        }
    }

    /// Pixels per millimetre at this resolution.
    pub fn pixels_per_mm(&self) -> f64 {
        f64::from(self.dpi) / MM_PER_INCH
    }

    /// Pixel size (width, height), truncated toward zero.
    pub fn pixel_dimensions(&self) -> (u32, u32) {
        (
            mm_to_pixels(self.width_mm, self.dpi),
            mm_to_pixels(self.height_mm, self.dpi),
        )
    }

    /// Total pixel count of the rendered canvas.
    pub fn pixel_count(&self) -> u64 {
        let (w, h) = self.pixel_dimensions();
        u64::from(w) * u64::from(h)
    }

    /// Real-world size in inches of an image of the given pixel size when
    /// printed at this resolution.
    pub fn physical_size_inches(&self, width_px: u32, height_px: u32) -> (f64, f64) {
        let dpi = f64::from(self.dpi.max(1));
        (f64::from(width_px) / dpi, f64::from(height_px) / dpi)
    }
}

fn mm_to_pixels(mm: f64, dpi: u32) -> u32 {
    let px = (mm * f64::from(dpi) / MM_PER_INCH).floor();
    if px.is_finite() && px > 0.0 {
        px.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// Body of `POST /print`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintRequest {
    pub base64_image: String,
    /// `None` asks the server for its default printer; serialised as `null`.
    pub printer_name: Option<String>,
}

impl PrintRequest {
    pub fn new(base64_image: String, printer_name: Option<String>) -> Self {
        Self {
            base64_image,
            printer_name,
        }
    }
}

/// Response of `POST /print`, and the payload the WebSocket endpoint echoes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintResult {
    #[serde(default, rename = "printerName", alias = "PrinterName")]
    pub printer_name: Option<String>,
    #[serde(default, alias = "Success")]
    pub success: Option<bool>,
    #[serde(default, rename = "errorMessage", alias = "ErrorMessage")]
    pub error_message: Option<String>,
}

impl PrintResult {
    pub fn printer(&self) -> &str {
        self.printer_name.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn succeeded(&self) -> bool {
        self.success.unwrap_or(false)
    }

    /// The error message, ignoring empty strings.
    pub fn error(&self) -> Option<&str> {
        self.error_message.as_deref().filter(|m| !m.is_empty())
    }
}

/// One entry of `GET /jobs`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Kept as raw JSON: the server decides the timestamp format.
    #[serde(default, alias = "Timestamp")]
    pub timestamp: Option<Value>,
    #[serde(default, rename = "printerName", alias = "PrinterName")]
    pub printer_name: Option<String>,
    #[serde(default, alias = "Success")]
    pub success: Option<bool>,
    #[serde(default, rename = "errorMessage", alias = "ErrorMessage")]
    pub error_message: Option<String>,
}

impl JobRecord {
    pub fn timestamp(&self) -> String {
        match &self.timestamp {
            None | Some(Value::Null) => UNKNOWN.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    pub fn printer(&self) -> &str {
        self.printer_name.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn succeeded(&self) -> bool {
        self.success.unwrap_or(false)
    }

    pub fn status_glyph(&self) -> &'static str {
        if self.succeeded() {
            "✓ Success"
        } else {
            "✗ Error"
        }
    }

    /// `<timestamp> - <printer> - <status>` as shown in the job listing.
    pub fn summary_line(&self) -> String {
        format!(
            "{} - {} - {}",
            self.timestamp(),
            self.printer(),
            self.status_glyph()
        )
    }
}

/// The `count` most recent jobs, oldest first. The server appends new jobs
/// to the end of its log.
pub fn recent_jobs(jobs: &[JobRecord], count: usize) -> &[JobRecord] {
    &jobs[jobs.len().saturating_sub(count)..]
}
