//! Terminal color type with lenient parsing and palette mapping.
//!
//! This module provides the [`Color`] type used by text and border styles:
//!
//! - **Named colors**: the 16 basic ANSI colors (8 normal + 8 bright)
//! - **24-bit colors**: parsed from `#rrggbb`, `#rgb`, `rgb(r,g,b)`, and
//!   `hsl(h,s%,l%)` strings
//! - **Palette mapping**: nearest 256-color index via the 6x6x6 cube or
//!   grayscale ramp, for terminals without true-color support
//!
//! Parsing is deliberately lenient: colors arrive as user input through
//! component props, so a malformed string yields `None` rather than an
//! error and the caller keeps its previous value.
//!
//! # Examples
//!
//! ```
//! use imprint::Color;
//!
//! assert_eq!(Color::parse("green"), Some(Color::Green));
//! assert_eq!(Color::parse("brightBlue"), Some(Color::BrightBlue));
//! assert_eq!(Color::parse("#ff8800"), Some(Color::Rgb(255, 136, 0)));
//! assert_eq!(Color::parse("rgb(1, 2, 3)"), Some(Color::Rgb(1, 2, 3)));
//! assert_eq!(Color::parse("not-a-color"), None);
//! ```

use std::fmt;

/// A terminal color.
///
/// Named variants always emit their dedicated 16-color SGR codes; `Rgb`
/// emits 24-bit codes when the terminal supports them and downconverts to
/// the nearest 256-color palette entry otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    /// Bright black. Accepted under the names `gray` and `grey` as well.
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
    /// 24-bit RGB color.
    Rgb(u8, u8, u8),
}

impl Color {
    /// Parse a color specification string.
    ///
    /// Accepts color names (`"red"`, `"brightRed"`, `"bright-red"`,
    /// `"redBright"`, `"gray"`), hex strings (`#rgb`, `#rrggbb`),
    /// `rgb(r,g,b)`, and `hsl(h,s%,l%)`. Returns `None` for anything it
    /// does not recognize.
    #[must_use]
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return None;
        }
        if let Some(hex) = spec.strip_prefix('#') {
            return Self::parse_hex(hex);
        }
        let lower = spec.to_ascii_lowercase();
        if let Some(body) = lower.strip_prefix("rgb(") {
            return Self::parse_rgb_call(body.strip_suffix(')')?);
        }
        if let Some(body) = lower.strip_prefix("hsl(") {
            return Self::parse_hsl_call(body.strip_suffix(')')?);
        }
        Self::parse_named(&lower)
    }

    fn parse_named(lower: &str) -> Option<Self> {
        // Normalize "bright-red", "bright_red", "brightred", and the
        // chalk-style suffix form "redbright" down to one spelling.
        let flat: String = lower.chars().filter(|c| *c != '-' && *c != '_').collect();
        let (bright, base) = if let Some(rest) = flat.strip_prefix("bright") {
            (true, rest)
        } else if let Some(rest) = flat.strip_suffix("bright") {
            (true, rest)
        } else {
            (false, flat.as_str())
        };

        let normal = match base {
            "black" => Self::Black,
            "red" => Self::Red,
            "green" => Self::Green,
            "yellow" => Self::Yellow,
            "blue" => Self::Blue,
            "magenta" => Self::Magenta,
            "cyan" => Self::Cyan,
            "white" => Self::White,
            "gray" | "grey" => return Some(Self::BrightBlack),
            _ => return None,
        };

        Some(if bright { normal.brighten() } else { normal })
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        if !hex.is_ascii() {
            return None;
        }
        match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1], 16).ok()?;
                let g = u8::from_str_radix(&hex[1..2], 16).ok()?;
                let b = u8::from_str_radix(&hex[2..3], 16).ok()?;
                Some(Self::Rgb(r * 17, g * 17, b * 17))
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some(Self::Rgb(r, g, b))
            }
            _ => None,
        }
    }

    fn parse_rgb_call(body: &str) -> Option<Self> {
        let mut parts = body.split(',');
        let r = parts.next()?.trim().parse::<u8>().ok()?;
        let g = parts.next()?.trim().parse::<u8>().ok()?;
        let b = parts.next()?.trim().parse::<u8>().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::Rgb(r, g, b))
    }

    fn parse_hsl_call(body: &str) -> Option<Self> {
        let mut parts = body.split(',');
        let h = parts.next()?.trim().parse::<f32>().ok()?;
        let s = parts.next()?.trim().strip_suffix('%')?.parse::<f32>().ok()?;
        let l = parts.next()?.trim().strip_suffix('%')?.parse::<f32>().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::from_hsl(h, s / 100.0, l / 100.0))
    }

    /// Create a color from HSL values.
    ///
    /// - h: Hue in degrees [0, 360)
    /// - s: Saturation [0, 1]
    /// - l: Lightness [0, 1]
    #[must_use]
    pub fn from_hsl(h: f32, s: f32, l: f32) -> Self {
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);
        if s <= 0.0 {
            let v = (l * 255.0).round() as u8;
            return Self::Rgb(v, v, v);
        }

        let h = h.rem_euclid(360.0) / 360.0;
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;

        let channel = |t: f32| -> u8 {
            let t = t.rem_euclid(1.0);
            let v = if t < 1.0 / 6.0 {
                p + (q - p) * 6.0 * t
            } else if t < 0.5 {
                q
            } else if t < 2.0 / 3.0 {
                p + (q - p) * (2.0 / 3.0 - t) * 6.0
            } else {
                p
            };
            (v * 255.0).round().clamp(0.0, 255.0) as u8
        };

        Self::Rgb(channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0))
    }

    /// Return the bright variant of a basic color. Already-bright colors
    /// and RGB colors are returned unchanged.
    #[must_use]
    pub const fn brighten(self) -> Self {
        match self {
            Self::Black => Self::BrightBlack,
            Self::Red => Self::BrightRed,
            Self::Green => Self::BrightGreen,
            Self::Yellow => Self::BrightYellow,
            Self::Blue => Self::BrightBlue,
            Self::Magenta => Self::BrightMagenta,
            Self::Cyan => Self::BrightCyan,
            Self::White => Self::BrightWhite,
            other => other,
        }
    }

    /// SGR foreground code for a named color (30-37 normal, 90-97 bright).
    ///
    /// Returns `None` for `Rgb`, which needs a multi-parameter sequence.
    #[must_use]
    pub const fn named_fg_code(self) -> Option<u8> {
        Some(match self {
            Self::Black => 30,
            Self::Red => 31,
            Self::Green => 32,
            Self::Yellow => 33,
            Self::Blue => 34,
            Self::Magenta => 35,
            Self::Cyan => 36,
            Self::White => 37,
            Self::BrightBlack => 90,
            Self::BrightRed => 91,
            Self::BrightGreen => 92,
            Self::BrightYellow => 93,
            Self::BrightBlue => 94,
            Self::BrightMagenta => 95,
            Self::BrightCyan => 96,
            Self::BrightWhite => 97,
            Self::Rgb(..) => return None,
        })
    }

    /// SGR background code for a named color (40-47 normal, 100-107 bright).
    #[must_use]
    pub const fn named_bg_code(self) -> Option<u8> {
        match self.named_fg_code() {
            Some(code) => Some(code + 10),
            None => None,
        }
    }

    /// Convert an RGB triple to the nearest 256-color palette index.
    ///
    /// Uses the 6x6x6 color cube (colors 16-231) or the grayscale ramp
    /// (232-255), whichever is the closer match.
    #[must_use]
    pub fn rgb_to_256(r: u8, g: u8, b: u8) -> u8 {
        // Near-gray colors map better onto the 24-step grayscale ramp.
        let gray = ((u16::from(r) + u16::from(g) + u16::from(b)) / 3) as u8;
        let is_grayscale = (i16::from(r) - i16::from(gray)).abs() < 10
            && (i16::from(g) - i16::from(gray)).abs() < 10
            && (i16::from(b) - i16::from(gray)).abs() < 10;

        if is_grayscale {
            // Ramp levels sit at 8, 18, 28, ..., 238.
            let gray_idx = (u16::from(gray) * 24 / 256) as u8;
            return 232 + gray_idx.min(23);
        }

        let cube_values: [u8; 6] = [0, 95, 135, 175, 215, 255];
        let ri = nearest_cube_index(r, cube_values);
        let gi = nearest_cube_index(g, cube_values);
        let bi = nearest_cube_index(b, cube_values);

        16 + 36 * ri + 6 * gi + bi
    }
}

/// Find the nearest index in the 6x6x6 cube for a component value.
fn nearest_cube_index(val: u8, cube_values: [u8; 6]) -> u8 {
    let mut best = 0;
    let mut best_dist = u16::MAX;
    for (i, &cv) in cube_values.iter().enumerate() {
        let dist = (i16::from(val) - i16::from(cv)).unsigned_abs();
        if dist < best_dist {
            best_dist = dist;
            best = i as u8;
        }
    }
    best
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rgb(r, g, b) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
            named => write!(f, "{}", name_of(*named)),
        }
    }
}

fn name_of(color: Color) -> &'static str {
    match color {
        Color::Black => "black",
        Color::Red => "red",
        Color::Green => "green",
        Color::Yellow => "yellow",
        Color::Blue => "blue",
        Color::Magenta => "magenta",
        Color::Cyan => "cyan",
        Color::White => "white",
        Color::BrightBlack => "brightBlack",
        Color::BrightRed => "brightRed",
        Color::BrightGreen => "brightGreen",
        Color::BrightYellow => "brightYellow",
        Color::BrightBlue => "brightBlue",
        Color::BrightMagenta => "brightMagenta",
        Color::BrightCyan => "brightCyan",
        Color::BrightWhite => "brightWhite",
        Color::Rgb(..) => unreachable!(),
    }
}
