//! Table-driven conversion between the units stations report in and the units
//! the dashboards display.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("Conversion from '{from}' to '{to}' is not implemented")]
    Unsupported { from: String, to: String },
}

type Conversion = fn(f64) -> f64;

/// Every supported `from -> to` pair. Units are matched case-sensitively, as they
/// appear in the station configuration.
const CONVERSIONS: &[(&str, &str, Conversion)] = &[
    ("c", "f", celsius_to_fahrenheit),
    ("f", "c", fahrenheit_to_celsius),
    ("m", "ft", meters_to_feet),
    ("ft", "m", feet_to_meters),
    // Both turbidity scales read the same for the sensors in use.
    ("fnu", "ntu", unchanged),
    ("ntu", "fnu", unchanged),
    ("m/s", "mph", meters_per_second_to_mph),
    ("mph", "m/s", mph_to_meters_per_second),
];

const FEET_PER_METER: f64 = 3.28084;
const MPH_PER_METER_PER_SECOND: f64 = 2.2369;

fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

fn meters_to_feet(m: f64) -> f64 {
    m * FEET_PER_METER
}

fn feet_to_meters(ft: f64) -> f64 {
    ft / FEET_PER_METER
}

fn meters_per_second_to_mph(m_s: f64) -> f64 {
    m_s * MPH_PER_METER_PER_SECOND
}

fn mph_to_meters_per_second(mph: f64) -> f64 {
    mph / MPH_PER_METER_PER_SECOND
}

fn unchanged(value: f64) -> f64 {
    value
}

pub struct UnitConverter;

impl UnitConverter {
    /// Converts `value` from `from` into `to`. Equal units are returned untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::Unsupported`] if the pair is not in the conversion table.
    ///
    /// # Examples
    ///
    /// ```
    /// use lakestat::UnitConverter;
    ///
    /// assert_eq!(UnitConverter::convert(100.0, "c", "f").unwrap(), 212.0);
    /// assert_eq!(UnitConverter::convert(3.0, "knots", "knots").unwrap(), 3.0);
    /// assert!(UnitConverter::convert(3.0, "knots", "mph").is_err());
    /// ```
    pub fn convert(value: f64, from: &str, to: &str) -> Result<f64, ConversionError> {
        if from == to {
            return Ok(value);
        }
        Self::lookup(from, to)
            .map(|conversion| conversion(value))
            .ok_or_else(|| ConversionError::Unsupported {
                from: from.to_string(),
                to: to.to_string(),
            })
    }

    /// `true` if [`Self::convert`] would succeed for this pair.
    pub fn supports(from: &str, to: &str) -> bool {
        from == to || Self::lookup(from, to).is_some()
    }

    fn lookup(from: &str, to: &str) -> Option<Conversion> {
        CONVERSIONS
            .iter()
            .find(|(f, t, _)| *f == from && *t == to)
            .map(|(_, _, conversion)| *conversion)
    }
}
