// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test label renderer.
//
// The label is a white canvas at printer resolution with a short text roughly
// a quarter across and a third down, and a one-pixel border inset by two
// pixels. The result is PNG-encoded, then base64-encoded for transport.

use std::path::Path;

use base64::Engine as _;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use printbridge_core::error::{BridgeError, Result};
use printbridge_core::{LabelSpec, MAX_LABEL_PIXELS, SmokeConfig};

use crate::font::LabelFont;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([0, 0, 0]);

/// Border inset from each edge, in pixels.
const BORDER_INSET: u32 = 2;

/// Text height as a fraction of the label height.
const TEXT_HEIGHT_RATIO: f32 = 0.1;

/// An encoded label ready to send.
#[derive(Debug, Clone)]
pub struct Fixture {
    /// PNG bytes.
    pub png: Vec<u8>,
    /// Standard, padded base64 of `png`.
    pub base64: String,
    pub width: u32,
    pub height: u32,
    /// SHA-256 of `png`, hex-encoded.
    pub sha256: String,
}

/// Renders test labels of a fixed physical size.
#[derive(Debug)]
pub struct LabelRenderer {
    spec: LabelSpec,
    text: String,
    font: LabelFont,
}

impl LabelRenderer {
    /// Renderer using the best font available on this machine.
    pub fn new(spec: LabelSpec, text: impl Into<String>) -> Self {
        Self::with_font(spec, text, LabelFont::load(None))
    }

    /// Renderer that tries `font_path` before the system fonts.
    pub fn with_font_path(
        spec: LabelSpec,
        text: impl Into<String>,
        font_path: Option<&Path>,
    ) -> Self {
        Self::with_font(spec, text, LabelFont::load(font_path))
    }

    pub fn with_font(spec: LabelSpec, text: impl Into<String>, font: LabelFont) -> Self {
        Self {
            spec,
            text: text.into(),
            font,
        }
    }

    pub fn from_config(config: &SmokeConfig) -> Self {
        Self::with_font_path(config.label, config.label_text.clone(), config.font_path.as_deref())
    }

    pub fn spec(&self) -> &LabelSpec {
        &self.spec
    }

    pub fn font(&self) -> &LabelFont {
        &self.font
    }

    /// Draw the label.
    #[instrument(skip(self), fields(text = %self.text))]
    pub fn render(&self) -> Result<RgbImage> {
        let (width, height) = self.spec.pixel_dimensions();
        if width == 0 || height == 0 {
            return Err(BridgeError::Fixture(format!(
                "{}x{} mm at {} dpi is an empty image",
                self.spec.width_mm, self.spec.height_mm, self.spec.dpi
            )));
        }
        if self.spec.pixel_count() > MAX_LABEL_PIXELS {
            return Err(BridgeError::Fixture(format!(
                "{width}x{height} px label exceeds the {MAX_LABEL_PIXELS} pixel limit"
            )));
        }
        debug!(
            width,
            height,
            px_per_mm = self.spec.pixels_per_mm(),
            outline_font = self.font.is_outline(),
            "rendering label"
        );

        let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);

        let (text_x, text_y) = text_origin(width, height);
        let text_px = (height as f32 * TEXT_HEIGHT_RATIO).max(1.0);
        self.font.draw(&mut canvas, INK, text_x, text_y, text_px, &self.text);

        if let Some(border) = border_rect(width, height) {
            draw_hollow_rect_mut(&mut canvas, border, INK);
        }

        Ok(canvas)
    }

    /// Render, encode as PNG and base64.
    pub fn generate(&self) -> Result<Fixture> {
        let canvas = self.render()?;
        let (width, height) = canvas.dimensions();
        let png = encode_png(canvas)?;
        let base64 = base64::engine::general_purpose::STANDARD.encode(&png);
        let sha256 = hex::encode(Sha256::digest(&png));

        let (w_in, h_in) = self.spec.physical_size_inches(width, height);
        info!(
            width,
            height,
            bytes = png.len(),
            sha256 = %sha256,
            "test label generated ({w_in:.2}\" x {h_in:.2}\")"
        );

        Ok(Fixture {
            png,
            base64,
            width,
            height,
            sha256,
        })
    }
}

/// Where the label text starts: a quarter across, a third down.
pub fn text_origin(width: u32, height: u32) -> (i32, i32) {
    let x = i32::try_from(width / 4).unwrap_or(i32::MAX);
    let y = i32::try_from(height / 3).unwrap_or(i32::MAX);
    (x, y)
}

/// Border from (2, 2) to (width - 2, height - 2) inclusive, or `None` when the
/// image is too small to hold one.
pub fn border_rect(width: u32, height: u32) -> Option<Rect> {
    let span = 2 * BORDER_INSET;
    if width <= span || height <= span {
        return None;
    }
    let inset = BORDER_INSET as i32;
    Some(Rect::at(inset, inset).of_size(width - span + 1, height - span + 1))
}

fn encode_png(canvas: RgbImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    DynamicImage::ImageRgb8(canvas)
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|err| BridgeError::Fixture(format!("PNG encoding failed: {err}")))?;
    Ok(buffer)
}
