use std::f64::consts::PI;

use crate::error::{ConversionError, Result};

/// Converts a magnitude tagged with a unit string into SI base units
/// (metres for lengths, radians for angles).
pub trait UnitNormalizer {
    fn to_si(&self, magnitude: f64, unit: &str) -> Result<f64>;

    fn scale_to_si(&self, unit: &str) -> Result<f64> {
        self.to_si(1.0, unit)
    }
}

/// Table driven normalizer covering the length and angle units found in
/// instrument metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct SiUnits;

const UNIT_TABLE: &[(&[&str], f64)] = &[
    // Dimensionless
    (&["", "1", "dimensionless"], 1.0),
    // Lengths
    (&["m", "meter", "meters", "metre", "metres"], 1.0),
    (&["km", "kilometer", "kilometers", "kilometre"], 1e3),
    (&["cm", "centimeter", "centimeters", "centimetre"], 1e-2),
    (&["mm", "millimeter", "millimeters", "millimetre"], 1e-3),
    (
        &["um", "µm", "μm", "micrometer", "micrometers", "micrometre", "micron"],
        1e-6,
    ),
    (&["nm", "nanometer", "nanometers", "nanometre"], 1e-9),
    (&["pm", "picometer", "picometers", "picometre"], 1e-12),
    (&["\u{212B}", "\u{00C5}", "angstrom", "angstroms"], 1e-10),
    (&["in", "inch", "inches"], 0.0254),
    (&["ft", "foot", "feet"], 0.3048),
    // Angles
    (&["rad", "radian", "radians"], 1.0),
    (&["mrad", "milliradian", "milliradians"], 1e-3),
    (&["urad", "µrad", "μrad", "microradian", "microradians"], 1e-6),
    (&["deg", "degree", "degrees", "°"], PI / 180.0),
    (&["turn", "turns", "revolution", "revolutions"], 2.0 * PI),
];

impl SiUnits {
    pub fn factor(unit: &str) -> Option<f64> {
        let unit = unit.trim();

        UNIT_TABLE
            .iter()
            .find(|(names, _)| names.contains(&unit))
            .map(|(_, factor)| *factor)
    }
}

impl UnitNormalizer for SiUnits {
    fn to_si(&self, magnitude: f64, unit: &str) -> Result<f64> {
        let factor = Self::factor(unit).ok_or_else(|| ConversionError::UnknownUnit {
            unit: unit.to_string(),
        })?;

        Ok(magnitude * factor)
    }
}
