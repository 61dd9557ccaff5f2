// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Best-effort font resolution for label text.
//
// An outline font is tried first (configured path, then common system
// locations). If none loads, a built-in 5x7 bitmap face is used instead, so
// a label can always be drawn.

use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use tracing::debug;

/// Well-known system font locations, tried in order.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Glyph cell of the built-in face.
const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;

/// Horizontal advance per character, in glyph cells.
const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;

/// The face used to draw label text.
pub enum LabelFont {
    /// A TrueType/OpenType font loaded from disk.
    Outline(FontVec),
    /// The built-in 5x7 bitmap face.
    Bitmap,
}

impl std::fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outline(_) => f.write_str("LabelFont::Outline"),
            Self::Bitmap => f.write_str("LabelFont::Bitmap"),
        }
    }
}

impl LabelFont {
    /// Resolve a font: `preferred` first, then the system candidates, then the
    /// bitmap face. Never fails.
    pub fn load(preferred: Option<&Path>) -> Self {
        let mut candidates: Vec<PathBuf> = preferred.map(Path::to_path_buf).into_iter().collect();
        candidates.extend(SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from));
        Self::load_first(&candidates)
    }

    /// The first candidate that loads as an outline font, else the bitmap face.
    pub fn load_first(candidates: &[PathBuf]) -> Self {
        for path in candidates {
            match try_load(path) {
                Ok(font) => {
                    debug!(path = %path.display(), "label font loaded");
                    return Self::Outline(font);
                }
                Err(reason) => {
                    debug!(path = %path.display(), %reason, "label font unavailable");
                }
            }
        }
        debug!("no outline font found, using built-in bitmap face");
        Self::Bitmap
    }

    pub fn is_outline(&self) -> bool {
        matches!(self, Self::Outline(_))
    }

    /// Draw `text` with its top-left corner at (`x`, `y`). Pixels falling
    /// outside the canvas are clipped.
    pub fn draw(
        &self,
        canvas: &mut RgbImage,
        color: Rgb<u8>,
        x: i32,
        y: i32,
        px_height: f32,
        text: &str,
    ) {
        match self {
            Self::Outline(font) => {
                imageproc::drawing::draw_text_mut(
                    canvas,
                    color,
                    x,
                    y,
                    PxScale::from(px_height),
                    font,
                    text,
                );
            }
            Self::Bitmap => draw_bitmap_text(canvas, color, x, y, bitmap_scale(px_height), text),
        }
    }
}

fn try_load(path: &Path) -> Result<FontVec, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    FontVec::try_from_vec(bytes).map_err(|e| e.to_string())
}

/// Integer magnification giving roughly `px_height` tall glyphs.
fn bitmap_scale(px_height: f32) -> u32 {
    if px_height.is_finite() && px_height >= GLYPH_HEIGHT as f32 {
        (px_height / GLYPH_HEIGHT as f32) as u32
    } else {
        1
    }
}

fn draw_bitmap_text(canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, scale: u32, text: &str) {
    let (width, height) = canvas.dimensions();
    let scale_i = scale as i64;
    let mut pen_x = i64::from(x);

    for ch in text.chars() {
        let rows = glyph(ch);
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                let x0 = pen_x + i64::from(col) * scale_i;
                let y0 = i64::from(y) + row as i64 * scale_i;
                for dy in 0..scale_i {
                    for dx in 0..scale_i {
                        let (px, py) = (x0 + dx, y0 + dy);
                        if px >= 0 && py >= 0 && px < i64::from(width) && py < i64::from(height) {
                            canvas.put_pixel(px as u32, py as u32, color);
                        }
                    }
                }
            }
        }
        pen_x += i64::from(GLYPH_ADVANCE) * scale_i;
    }
}

/// Row bitmaps (MSB of the low five bits is the leftmost column).
/// Lowercase letters share the uppercase shapes.
fn glyph(ch: char) -> [u8; 7] {
    match ch.to_ascii_uppercase() {
        ' ' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '/' => [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00],
        _ => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04], // '?'
    }
}
