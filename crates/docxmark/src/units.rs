//! Length conversions to EMUs
//!
//! OOXML measures drawings in EMUs (English Metric Units):
//! - 9525 EMUs = 1 pixel (at 96 DPI)
//! - 360000 EMUs = 1 centimeter
//!
//! Image descriptors express sizes as strings such as `"5cm"` or `"120px"`,
//! parsed here into a [`Length`].

use std::sync::OnceLock;

use regex::Regex;

/// EMUs per pixel at 96 DPI (9525)
pub const EMU_PER_PIXEL: i64 = 9525;

/// EMUs per centimeter (360000)
pub const EMU_PER_CM: i64 = 360_000;

/// Convert pixels to EMUs at 96 DPI
pub fn px_to_emu(px: f64) -> i64 {
    (px * EMU_PER_PIXEL as f64).round() as i64
}

/// Convert centimeters to EMUs
pub fn cm_to_emu(cm: f64) -> i64 {
    (cm * EMU_PER_CM as f64).round() as i64
}

/// Unit of a [`Length`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
    Px,
    Cm,
}

/// A length with its unit, as written in an image descriptor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Length {
    pub value: f64,
    pub unit: LengthUnit,
}

impl Length {
    /// Create a pixel length
    pub fn px(value: f64) -> Self {
        Self {
            value,
            unit: LengthUnit::Px,
        }
    }

    /// Create a centimeter length
    pub fn cm(value: f64) -> Self {
        Self {
            value,
            unit: LengthUnit::Cm,
        }
    }

    /// Parse `"<number>cm"` or `"<number>px"`
    ///
    /// Anything else (negative numbers, spaces, other units) yields `None`.
    pub fn parse(input: &str) -> Option<Self> {
        static LENGTH_RE: OnceLock<Regex> = OnceLock::new();
        let re = LENGTH_RE.get_or_init(|| Regex::new(r"^(\d+(?:\.\d+)?)(cm|px)$").unwrap());

        let caps = re.captures(input)?;
        let value: f64 = caps[1].parse().ok()?;
        let unit = match &caps[2] {
            "cm" => LengthUnit::Cm,
            _ => LengthUnit::Px,
        };
        Some(Self { value, unit })
    }

    /// Convert to EMUs according to the unit
    pub fn to_emu(self) -> i64 {
        match self.unit {
            LengthUnit::Px => px_to_emu(self.value),
            LengthUnit::Cm => cm_to_emu(self.value),
        }
    }
}
