//! Environment capability probing.
//!
//! All environment inputs are read here: color depth from `COLORTERM`
//! and `TERM`, the fallback column count from `COLUMNS`, and CI
//! detection. The frame driver asks once at mount time.

use crate::ansi::ColorMode;
use std::env;

/// Detect the color mode from the environment.
///
/// 24-bit emission requires an explicit marker: `COLORTERM` set to
/// `truecolor`/`24bit`, or a `TERM` value containing `256color`,
/// `24bit`, or `truecolor`. Everything else downconverts RGB colors to
/// the 256-color palette.
#[must_use]
pub fn detect_color_mode() -> ColorMode {
    let term = env::var("TERM").unwrap_or_default();
    let colorterm = env::var("COLORTERM").unwrap_or_default();
    detect_color_mode_from(&term, &colorterm)
}

/// Capability decision from explicit variable values.
#[must_use]
pub fn detect_color_mode_from(term: &str, colorterm: &str) -> ColorMode {
    if colorterm.eq_ignore_ascii_case("truecolor") || colorterm.eq_ignore_ascii_case("24bit") {
        return ColorMode::TrueColor;
    }
    if term.contains("256color") || term.contains("24bit") || term.contains("truecolor") {
        return ColorMode::TrueColor;
    }
    ColorMode::Ansi256
}

/// Column count from the `COLUMNS` variable, when set and sane.
#[must_use]
pub fn env_columns() -> Option<u16> {
    let value = env::var("COLUMNS").ok()?;
    let parsed = value.trim().parse::<u16>().ok()?;
    (parsed > 0).then_some(parsed)
}

/// Whether the process runs under a CI environment.
#[must_use]
pub fn is_ci() -> bool {
    env::var("CI").is_ok_and(|v| !v.is_empty() && v != "false")
}
