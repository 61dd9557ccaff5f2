// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printbridge-fixture: Test label generation for the PrintBridge smoke tester.
//
// Renders a fixed-size label (text plus border) at printer resolution, encodes
// it as PNG and then as base64 text ready to be sent to the print endpoints.

pub mod font;
pub mod label;

pub use font::LabelFont;
pub use label::{Fixture, LabelRenderer};
